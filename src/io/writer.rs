//! Writers for the output tables.
//!
//! A report is rendered once into named CSV files, which are then either
//! written into a directory or packed into a zip archive.

use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use zip::write::{FileOptions, ZipWriter};

use crate::error::{AllocationError, Result};
use crate::report::{AllocationReport, Table};

pub const ASSIGNMENT_SUMMARY_FILE: &str = "assignment_summary.csv";
pub const EXCESS_REQUESTS_FILE: &str = "excess_requests.csv";
pub const MODULE_STATE_FILE: &str = "module_state.csv";
pub const CONSTRAINT_SUMMARY_FILE: &str = "constraint_summary.csv";
pub const ROSTER_DIR: &str = "rosters";

/// Serializes rows with a header taken from the row type.
fn rows_to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    into_bytes(writer)
}

/// Writes a table with explicit headers.
pub fn table_to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| AllocationError::Io(e.into_error()))
}

/// Keeps roster file names portable.
fn file_stem(module_id: &str) -> String {
    module_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Roster file names, one per roster, distinct even when sanitizing maps
/// two module ids to the same stem. Later duplicates get `_2`, `_3`, ...
fn roster_file_names<'a>(module_ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    module_ids
        .map(|id| {
            let stem = file_stem(id);
            let mut name = stem.clone();
            let mut suffix = 2;
            while !used.insert(name.to_ascii_lowercase()) {
                name = format!("{stem}_{suffix}");
                suffix += 1;
            }
            format!("{ROSTER_DIR}/{name}.csv")
        })
        .collect()
}

/// Renders every table as `(relative path, CSV bytes)`.
pub fn render(report: &AllocationReport) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = vec![
        (
            ASSIGNMENT_SUMMARY_FILE.to_string(),
            table_to_csv(&report.assignment_summary)?,
        ),
        (EXCESS_REQUESTS_FILE.to_string(), rows_to_csv(&report.excess_requests)?),
        (MODULE_STATE_FILE.to_string(), rows_to_csv(&report.module_state)?),
        (
            CONSTRAINT_SUMMARY_FILE.to_string(),
            table_to_csv(&report.constraint_summary)?,
        ),
    ];
    let names = roster_file_names(report.rosters.iter().map(|r| r.module_id.as_str()));
    for (roster, name) in report.rosters.iter().zip(names) {
        let table = Table {
            headers: vec!["student_name".to_string(), "student_id".to_string()],
            rows: roster
                .students
                .iter()
                .map(|(name, id)| vec![name.clone(), id.clone()])
                .collect(),
        };
        files.push((name, table_to_csv(&table)?));
    }
    Ok(files)
}

/// Writes the report as CSV files under `dir`, creating it if needed.
///
/// Returns the paths written.
pub fn write_report_dir<P: AsRef<Path>>(report: &AllocationReport, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let files = render(report)?;
    fs::create_dir_all(dir.join(ROSTER_DIR))?;

    let mut written = Vec::with_capacity(files.len());
    for (name, bytes) in files {
        let path = dir.join(&name);
        fs::write(&path, bytes)?;
        written.push(path);
    }
    tracing::info!(dir = %dir.display(), files = written.len(), "report written");
    Ok(written)
}

/// Packs the report into a zip archive in memory.
pub fn report_to_zip(report: &AllocationReport) -> Result<Vec<u8>> {
    let files = render(report)?;
    tracing::debug!("Creating ZIP archive with {} files", files.len());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in &files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(bytes)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Writes the report as a zip archive at `path`.
pub fn write_report_zip<P: AsRef<Path>>(report: &AllocationReport, path: P) -> Result<()> {
    let bytes = report_to_zip(report)?;
    fs::write(path.as_ref(), &bytes)?;
    tracing::info!(path = %path.as_ref().display(), bytes = bytes.len(), "report archive written");
    Ok(())
}
