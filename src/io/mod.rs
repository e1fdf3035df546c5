//! CSV adapters for input and output tables.
//!
//! - [`reader`]: module, rankings, group-preference and prior-assignment tables
//! - [`writer`]: report tables as a directory of CSV files or a zip archive

pub mod reader;
pub mod writer;

pub use reader::{
    check_group_capacity, prior_from_reader, read_modules, read_modules_from_reader, read_prior,
    read_students, students_from_readers,
};
pub use writer::{render, report_to_zip, write_report_dir, write_report_zip};
