//! MarkdownV2 helpers

const RESERVED: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape every MarkdownV2 reserved character with a backslash
#[must_use]
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Monospaced MarkdownV2 span around escaped text
#[must_use]
pub fn mono(text: &str) -> String {
    format!("`{}`", escape_markdown_v2(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plain text", "plain text")]
    #[case("Не розумію...", "Не розумію\\.\\.\\.")]
    #[case("25% | 12.5 | Mon - 03 23h", "25% \\| 12\\.5 \\| Mon \\- 03 23h")]
    #[case("a_b*c`d\\e", "a\\_b\\*c\\`d\\\\e")]
    #[case("(x) [y] {z} ~#+=!>", "\\(x\\) \\[y\\] \\{z\\} \\~\\#\\+\\=\\!\\>")]
    fn test_escape_markdown_v2(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_markdown_v2(input), expected);
    }

    #[test]
    fn test_mono_wraps_in_backticks() {
        assert_eq!(mono("Хороша погода сьогодні! 🥳"), "`Хороша погода сьогодні\\! 🥳`");
        assert_eq!(mono(""), "``");
    }
}
