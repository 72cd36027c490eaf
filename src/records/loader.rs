//! Tabular source loader
//!
//! Sources are newline-delimited rows where an export step sometimes wraps a
//! whole line in one extra pair of quotes. That wrapper is removed first, then
//! each line is parsed with ordinary CSV rules (quoted fields may contain commas).

use crate::errors::{DiagError, Result};
use crate::records::types::{IssueRecord, StepRecord};
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// A parsed tabular source: header columns plus data rows in file order
#[derive(Debug, Clone)]
pub struct Table {
    columns: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

/// Remove a quote pair enclosing the entire line
fn unwrap_line(line: &str) -> &str {
    if line.len() >= 2 && line.starts_with('"') && line.ends_with('"') {
        &line[1..line.len() - 1]
    } else {
        line
    }
}

/// Parse a single line as one delimited record
fn parse_line(line: &str) -> std::result::Result<StringRecord, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record)
}

impl Table {
    /// Read and parse a source file
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DiagError::SourceMissing {
                path: path.to_path_buf(),
            },
            _ => DiagError::Io(e),
        })?;

        Self::parse(path, &text)
    }

    /// Parse source text; `path` is only used in error messages and logs
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let header_line = lines.next().ok_or_else(|| DiagError::HeaderUnreadable {
            path: path.to_path_buf(),
            reason: "source has no header row".to_string(),
        })?;

        let header = parse_line(unwrap_line(header_line)).map_err(|e| {
            DiagError::HeaderUnreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        // Later duplicates win
        let columns: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();

        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            match parse_line(unwrap_line(line)) {
                Ok(record) => rows.push(record),
                Err(e) => {
                    warn!(source = %path.display(), row = index + 1, error = %e, "malformed row, using defaults");
                    rows.push(StringRecord::new());
                }
            }
        }

        debug!(source = %path.display(), rows = rows.len(), "tabular source parsed");
        Ok(Self { columns, rows })
    }

    /// Field value by column name; missing columns and short rows give ""
    pub fn field<'a>(&self, row: &'a StringRecord, column: &str) -> &'a str {
        self.columns
            .get(column)
            .and_then(|&i| row.get(i))
            .unwrap_or("")
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn issues(&self) -> Vec<IssueRecord> {
        self.rows
            .iter()
            .map(|row| IssueRecord::from_row(self, row))
            .collect()
    }

    pub fn steps(&self) -> Vec<StepRecord> {
        self.rows
            .iter()
            .map(|row| StepRecord::from_row(self, row))
            .collect()
    }
}

/// Serialize issue records back into the issue source shape
pub fn write_issues<W: Write>(records: &[IssueRecord], out: W) -> Result<()> {
    write_records(records, out)
}

/// Serialize step records back into the step source shape
pub fn write_steps<W: Write>(records: &[StepRecord], out: W) -> Result<()> {
    write_records(records, out)
}

/// Every emitted line, header included, gets the whole-line quote wrapper so
/// that reading strips exactly that layer and per-field quoting survives.
fn write_records<T: serde::Serialize, W: Write>(records: &[T], mut out: W) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }

    let text = writer
        .into_inner()
        .map_err(|e| DiagError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))?;

    for line in text.split(|&b| b == b'\n').filter(|line| !line.is_empty()) {
        out.write_all(b"\"")?;
        out.write_all(line)?;
        out.write_all(b"\"\n")?;
    }
    out.flush()?;
    Ok(())
}
