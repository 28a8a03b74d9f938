//! Spreadsheet and JSON output.

pub mod json;
pub mod xlsx;

pub use json::write_report;
pub use xlsx::{write_template, write_testcases};
