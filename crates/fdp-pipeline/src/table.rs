//! Tabular data model and CSV loading
//!
//! A [`Table`] is a column-major snapshot of one extracted CSV file.
//! Column types are inferred on load: `int64` when every present value
//! parses as a 64-bit integer, `float64` when every present value parses
//! as a float, otherwise free `text`. Empty cells are missing values.
//!
//! `string` (the canonical string kind) is only ever produced by the
//! cleaner; the warehouse schema mapper accepts `text`, `string` and
//! `int64` and rejects everything else.

use anyhow::Result;
use fdp_common::FdpError;
use std::path::Path;
use tracing::debug;

/// Native column kind, mirroring the source dataset's inferred dtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free text as read from the source, not yet canonicalized
    Text,
    /// Canonical string, produced by the cleaner
    Str,
    /// 64-bit signed integer
    Int64,
    /// 64-bit float; present in the native model but has no warehouse mapping
    Float64,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Str => "string",
            ColumnKind::Int64 => "int64",
            ColumnKind::Float64 => "float64",
        }
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed column values; `None` marks a missing entry
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<Option<String>>),
    Str(Vec<Option<String>>),
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Text(_) => ColumnKind::Text,
            ColumnData::Str(_) => ColumnKind::Str,
            ColumnData::Int64(_) => ColumnKind::Int64,
            ColumnData::Float64(_) => ColumnKind::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) | ColumnData::Str(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// One tabular dataset, named after its source file stem
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Load a table from a CSV file, inferring column types
    pub fn from_csv(path: &Path) -> Result<Table> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| FdpError::Csv {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| FdpError::Csv {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record.map_err(|e| FdpError::Csv {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            for (i, cells) in raw.iter_mut().enumerate() {
                let value = record.get(i).unwrap_or("");
                if value.is_empty() {
                    cells.push(None);
                } else {
                    cells.push(Some(value.to_string()));
                }
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| {
                let data = infer_column(cells);
                debug!(column = %name, kind = %data.kind(), "inferred column type");
                Column { name, data }
            })
            .collect();

        let table = Table { name, columns };
        debug!(
            table = %table.name,
            rows = table.num_rows(),
            columns = table.num_columns(),
            "loaded csv"
        );
        Ok(table)
    }
}

/// Pick the narrowest kind that fits every present value
fn infer_column(cells: Vec<Option<String>>) -> ColumnData {
    let present = cells.iter().flatten();

    if present.clone().count() > 0 {
        if present.clone().all(|v| v.parse::<i64>().is_ok()) {
            let values = cells
                .iter()
                .map(|c| c.as_ref().and_then(|v| v.parse().ok()))
                .collect();
            return ColumnData::Int64(values);
        }
        if present.clone().all(|v| v.parse::<f64>().is_ok()) {
            let values = cells
                .iter()
                .map(|c| c.as_ref().and_then(|v| v.parse().ok()))
                .collect();
            return ColumnData::Float64(values);
        }
    }

    ColumnData::Text(cells)
}

/// Derive a valid warehouse table id from a file stem by dropping every
/// non-alphanumeric character
pub fn sanitize_table_id(stem: &str) -> String {
    stem.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}
