//! Rendering of the aggregate report
//!
//! - **layout**: where the output files of a benchmark live
//! - **log**: results dumped through the logger
//! - **json**: machine-readable report
//! - **csv**: spreadsheet, optionally appended to a daily file

pub mod csv;
pub mod json;
pub mod layout;
pub mod log;

pub use csv::{render_sheet, write_sheet};
pub use json::{render_json, write_json};
pub use layout::{test_name, OutputLayout};
pub use log::log_report;

pub(crate) fn banner(title: &str) -> String {
    format!("{} {} {}", "=".repeat(39), title, "=".repeat(39))
}
