//! Plain-text rendering of window starts for chat replies

use crate::models::Sample;

/// One line per sample, each terminated by a newline. Empty input gives an empty string.
#[must_use]
pub fn render_report(samples: &[Sample]) -> String {
    samples
        .iter()
        .map(|sample| sample.report_line() + "\n")
        .collect()
}
