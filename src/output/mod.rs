//! Output formatting module
//!
//! Provides console output formats for run results.

mod formatter;

pub use formatter::{OutputFormat, ResultFormatter};
