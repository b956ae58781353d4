//! Data models for the noclouds service

pub mod sample;

pub use sample::Sample;
