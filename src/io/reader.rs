//! CSV readers for the input tables.
//!
//! Each table has a path-based reader and a `_from_reader` variant. Field
//! problems (missing columns, bad numbers, missing or duplicate student
//! IDs, U+FFFD replacement characters) are collected and returned together
//! as [`AllocationError::Validation`](crate::AllocationError::Validation).
//! Cells are decoded lossily, so text in the wrong encoding surfaces as
//! replacement characters rather than a parse failure.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::models::{Catalogue, Module, PriorAssignments, Student};
use crate::validation::{ValidationError, ValidationErrorKind, ValidationErrors};

/// Columns of the module table.
pub const MODULE_COLUMNS: [&str; 9] = [
    "module_id",
    "module_name",
    "module_group",
    "semester",
    "credits",
    "capacity",
    "available_spaces",
    "required_modules",
    "mutually_excluded_modules",
];

const STUDENT_COLUMNS: [&str; 2] = ["student_name", "student_id"];
const EXCLUDED_COLUMN: &str = "excluded_modules";

/// A parsed CSV file with string cells.
#[derive(Debug)]
struct RawTable {
    name: &'static str,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: HashMap<String, usize>,
}

impl RawTable {
    fn read<R: Read>(name: &'static str, reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut rows = Vec::new();
        for record in csv_reader.byte_records() {
            let record = record?;
            let mut row: Vec<String> = record
                .iter()
                .map(|cell| String::from_utf8_lossy(cell).into_owned())
                .collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        Ok(Self {
            name,
            headers,
            rows,
            columns,
        })
    }

    /// Reports every required column that is absent.
    fn require(&self, required: &[&str], errors: &mut Vec<ValidationError>) -> bool {
        let mut ok = true;
        for column in required {
            if !self.columns.contains_key(*column) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MissingColumn,
                    format!("Column '{column}' was not found in the {} file", self.name),
                ));
                ok = false;
            }
        }
        ok
    }

    /// Reports cells containing U+FFFD, with 1-based row and column.
    fn check_encoding(&self, errors: &mut Vec<ValidationError>) {
        for (r, row) in self.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.contains('\u{fffd}') {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::EncodingArtifact,
                        format!(
                            "The item in row {}, column {} of the {} file contains unrecognised characters: '{cell}'",
                            r + 1,
                            c + 1,
                            self.name
                        ),
                    ));
                }
            }
        }
    }

    fn cell<'a>(&self, row: &'a [String], column: &str) -> &'a str {
        self.columns
            .get(column)
            .map_or("", |&i| row[i].as_str())
    }

    /// Student IDs by row, reporting blanks and duplicates.
    fn student_ids(&self, errors: &mut Vec<ValidationError>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        self.rows
            .iter()
            .map(|row| {
                let id = self.cell(row, "student_id").to_string();
                if id.is_empty() {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::EmptyId,
                        format!(
                            "Student {} has no listed student ID in the {} file",
                            self.cell(row, "student_name"),
                            self.name
                        ),
                    ));
                } else if !seen.insert(id.clone()) && reported.insert(id.clone()) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::DuplicateId,
                        format!("Student ID '{id}' is used more than once in the {} file", self.name),
                    ));
                }
                id
            })
            .collect()
    }
}

/// Parses a non-negative whole number, accepting spreadsheet forms like `10.0`.
fn parse_count(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
            .map(|v| v as u32)
    })
}

fn split_ids(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn invalid_value(table: &str, row: usize, column: &str, value: &str) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::InvalidValue,
        format!("Row {row} of the {table} file has an invalid '{column}' value: '{value}'"),
    )
}

/// Reads the module table from a file.
pub fn read_modules<P: AsRef<Path>>(path: P) -> Result<Vec<Module>> {
    read_modules_from_reader(File::open(path)?)
}

/// Reads the module table.
///
/// A blank `available_spaces` means the module is entirely free.
pub fn read_modules_from_reader<R: Read>(reader: R) -> Result<Vec<Module>> {
    let table = RawTable::read("module data", reader)?;
    let mut errors = Vec::new();
    if !table.require(&MODULE_COLUMNS, &mut errors) {
        return Err(ValidationErrors::new(errors).into());
    }
    table.check_encoding(&mut errors);

    let mut modules = Vec::with_capacity(table.rows.len());
    for (r, row) in table.rows.iter().enumerate() {
        let mut number = |column: &str| {
            let value = table.cell(row, column);
            parse_count(value).or_else(|| {
                errors.push(invalid_value(table.name, r + 1, column, value));
                None
            })
        };
        let credits = number("credits").unwrap_or_default();
        let capacity = number("capacity").unwrap_or_default();
        let available = match table.cell(row, "available_spaces") {
            "" => capacity,
            _ => number("available_spaces").unwrap_or_default(),
        };

        let mut module = Module::new(table.cell(row, "module_id"))
            .with_name(table.cell(row, "module_name"))
            .with_group(table.cell(row, "module_group"))
            .with_semester(table.cell(row, "semester"))
            .with_credits(credits)
            .with_capacity(capacity)
            .with_available_spaces(available);
        for id in split_ids(table.cell(row, "required_modules")) {
            module = module.with_requirement(id);
        }
        for id in split_ids(table.cell(row, "mutually_excluded_modules")) {
            module = module.with_exclusion(id);
        }
        modules.push(module);
    }

    ValidationErrors::new(errors).into_result()?;
    tracing::debug!(modules = modules.len(), "module table loaded");
    Ok(modules)
}

/// Reads students from the rankings and group-preference files.
pub fn read_students<P: AsRef<Path>, Q: AsRef<Path>>(
    rankings: P,
    group_preferences: Q,
    modules: &[Module],
) -> Result<Vec<Student>> {
    students_from_readers(File::open(rankings)?, File::open(group_preferences)?, modules)
}

/// Builds students from the rankings and group-preference tables.
///
/// Rankings columns that name no module are ignored with a warning. A blank
/// rank leaves the module unranked. Students must appear in both tables.
pub fn students_from_readers<R: Read, S: Read>(
    rankings: R,
    group_preferences: S,
    modules: &[Module],
) -> Result<Vec<Student>> {
    let ranks = RawTable::read("rankings", rankings)?;
    let groups = RawTable::read("group preferences", group_preferences)?;

    let mut errors = Vec::new();
    let ranks_ok = ranks.require(&STUDENT_COLUMNS, &mut errors);
    let groups_ok = groups.require(&STUDENT_COLUMNS, &mut errors);
    if !(ranks_ok && groups_ok) {
        return Err(ValidationErrors::new(errors).into());
    }
    ranks.check_encoding(&mut errors);
    groups.check_encoding(&mut errors);
    let rank_ids = ranks.student_ids(&mut errors);
    let group_ids = groups.student_ids(&mut errors);

    let module_ids: HashSet<&str> = modules.iter().map(|m| m.id.as_str()).collect();
    let ranked_columns: Vec<&String> = ranks
        .headers
        .iter()
        .filter(|h| !STUDENT_COLUMNS.contains(&h.as_str()) && h.as_str() != EXCLUDED_COLUMN)
        .filter(|h| {
            let known = module_ids.contains(h.as_str());
            if !known {
                tracing::warn!(column = %h, "rankings column names no module; ignored");
            }
            known
        })
        .collect();
    for module in modules {
        if !ranks.columns.contains_key(&module.id) {
            tracing::warn!(module = %module.id, "module has no column in the rankings file");
        }
    }

    let group_columns: Vec<&String> = groups
        .headers
        .iter()
        .filter(|h| !STUDENT_COLUMNS.contains(&h.as_str()))
        .collect();
    let mut desired_by_id: BTreeMap<&str, Vec<(&String, u32)>> = BTreeMap::new();
    for (r, (row, id)) in groups.rows.iter().zip(&group_ids).enumerate() {
        let desired = group_columns
            .iter()
            .filter_map(|&group| {
                let value = groups.cell(row, group);
                if value.is_empty() {
                    return Some((group, 0));
                }
                match parse_count(value) {
                    Some(v) => Some((group, v)),
                    None => {
                        errors.push(invalid_value(groups.name, r + 1, group, value));
                        None
                    }
                }
            })
            .collect();
        desired_by_id.insert(id.as_str(), desired);
    }

    let rank_id_set: HashSet<&str> = rank_ids.iter().map(String::as_str).collect();
    for id in desired_by_id.keys().filter(|id| !id.is_empty()) {
        if !rank_id_set.contains(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnmatchedStudent,
                format!("Student ID '{id}' is in the group preferences file but not the rankings file"),
            ));
        }
    }

    let mut students = Vec::with_capacity(ranks.rows.len());
    for (r, (row, id)) in ranks.rows.iter().zip(&rank_ids).enumerate() {
        if id.is_empty() {
            continue;
        }
        let Some(desired) = desired_by_id.get(id.as_str()) else {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnmatchedStudent,
                format!("Student ID '{id}' is in the rankings file but not the group preferences file"),
            ));
            continue;
        };

        let mut student = Student::new(id.as_str()).with_name(ranks.cell(row, "student_name"));
        for (group, credits) in desired {
            student = student.with_desired(group.as_str(), *credits);
        }

        let mut unranked = 0usize;
        for &column in &ranked_columns {
            let value = ranks.cell(row, column);
            if value.is_empty() {
                unranked += 1;
                continue;
            }
            match parse_count(value) {
                Some(rank) => student = student.with_rank(column.as_str(), rank),
                None => errors.push(invalid_value(ranks.name, r + 1, column, value)),
            }
        }
        if unranked > 0 {
            tracing::warn!(student = %id, unranked, "student did not rank every module");
        }

        for excluded in split_ids(ranks.cell(row, EXCLUDED_COLUMN)) {
            if module_ids.contains(excluded) {
                student = student.with_excluded(excluded);
            } else {
                tracing::warn!(student = %id, module = excluded, "excluded module is not in the catalogue; ignored");
            }
        }
        students.push(student);
    }

    ValidationErrors::new(errors).into_result()?;
    tracing::debug!(students = students.len(), "student tables loaded");
    Ok(students)
}

/// Reads a prior-assignment table from a file.
pub fn read_prior<P: AsRef<Path>>(path: P) -> Result<PriorAssignments> {
    prior_from_reader(File::open(path)?)
}

/// Reads a prior-assignment table: one column per module, non-zero = held.
pub fn prior_from_reader<R: Read>(reader: R) -> Result<PriorAssignments> {
    let table = RawTable::read("module assignments", reader)?;
    let mut errors = Vec::new();
    if !table.require(&STUDENT_COLUMNS, &mut errors) {
        return Err(ValidationErrors::new(errors).into());
    }
    table.check_encoding(&mut errors);
    let ids = table.student_ids(&mut errors);

    let module_columns: Vec<&String> = table
        .headers
        .iter()
        .filter(|h| !STUDENT_COLUMNS.contains(&h.as_str()))
        .collect();

    let mut prior = PriorAssignments::new();
    for (r, (row, id)) in table.rows.iter().zip(&ids).enumerate() {
        if id.is_empty() {
            continue;
        }
        prior.insert_student(id.as_str());
        for &column in &module_columns {
            let value = table.cell(row, column);
            if value.is_empty() {
                continue;
            }
            match value.parse::<f64>() {
                Ok(v) if v != 0.0 => prior.insert(id.as_str(), column.as_str()),
                Ok(_) => {}
                Err(_) => errors.push(invalid_value(table.name, r + 1, column, value)),
            }
        }
    }

    ValidationErrors::new(errors).into_result()?;
    Ok(prior)
}

/// Logs groups whose requested credits exceed the credits on offer.
///
/// Returns `(group, requested, offered)` for every group, in catalogue order.
pub fn check_group_capacity(catalogue: &Catalogue) -> Vec<(String, u64, u64)> {
    catalogue
        .groups()
        .iter()
        .enumerate()
        .map(|(g, label)| {
            let requested: u64 = (0..catalogue.student_count())
                .map(|s| u64::from(catalogue.desired(s, g)))
                .sum();
            let offered: u64 = catalogue
                .modules_in_group(g)
                .iter()
                .map(|&m| {
                    let module = catalogue.module(m);
                    u64::from(module.capacity) * u64::from(module.credits)
                })
                .sum();
            if requested > offered {
                tracing::warn!(
                    group = %label,
                    requested,
                    offered,
                    "students request more credits than the group offers"
                );
            }
            (label.clone(), requested, offered)
        })
        .collect()
}
