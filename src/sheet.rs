//! In-memory spreadsheet grid shared by every pipeline stage.
//!
//! A [`SourceSheet`] is loaded once and read-only afterwards. Cell positions
//! are absolute: a workbook whose used range starts after `A1` is padded back
//! to `A1`, so configured column offsets mean the same thing for every source.

use std::{fmt, path::Path};

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    error::ExtractError,
    io_utils::{self, SourceKind},
};

pub const DEFAULT_SHEET_NAME: &str = "Database";

static EMPTY_CELL: Cell = Cell::Empty;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Classifies one field of a delimited file. Anything whose trimmed text
    /// parses as a finite float is numeric, mirroring what a workbook would
    /// have stored. Quoting does not matter: the csv reader has already
    /// stripped quotes, so `"12.5"` loads as a number too.
    pub fn from_text(raw: &str) -> Self {
        if raw.is_empty() {
            return Cell::Empty;
        }
        match raw.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Cell::Number(number),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Cell::Empty => "empty",
            Cell::Text(_) => "text",
            Cell::Number(_) => "number",
            Cell::Bool(_) => "bool",
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(text) => Cell::Text(text.clone()),
            Data::Float(number) => Cell::Number(*number),
            Data::Int(number) => Cell::Number(*number as f64),
            Data::Bool(flag) => Cell::Bool(*flag),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(number) => write!(f, "{number}"),
            Cell::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

/// Returns the cell at `index`, treating positions past the end of a short
/// row as empty.
pub fn cell_at(row: &[Cell], index: usize) -> &Cell {
    row.get(index).unwrap_or(&EMPTY_CELL)
}

#[derive(Debug, Clone)]
pub struct SourceOptions<'a> {
    pub sheet: &'a str,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSheet {
    name: String,
    rows: Vec<Vec<Cell>>,
}

impl SourceSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn load(path: &Path, options: &SourceOptions<'_>) -> Result<Self> {
        match SourceKind::from_path(path) {
            SourceKind::Workbook => Self::from_workbook(path, options.sheet),
            SourceKind::Delimited => {
                let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
                Self::from_delimited(path, delimiter, options.encoding)
            }
        }
    }

    pub fn from_workbook(path: &Path, sheet: &str) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("Opening workbook {path:?}"))?;
        let available = workbook.sheet_names();
        if !available.iter().any(|name| name == sheet) {
            return Err(ExtractError::MissingSheet {
                name: sheet.to_string(),
                available,
            }
            .into());
        }
        let range = workbook
            .worksheet_range(sheet)
            .with_context(|| format!("Reading sheet '{sheet}' from {path:?}"))?;
        Ok(Self::from_range(sheet, &range))
    }

    pub fn from_range(name: &str, range: &Range<Data>) -> Self {
        let (row_offset, col_offset) = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));
        debug!(
            "Sheet '{name}' used range starts at row {} column {}",
            row_offset + 1,
            col_offset + 1
        );
        let mut rows = vec![Vec::new(); row_offset];
        for source_row in range.rows() {
            let mut row = vec![Cell::Empty; col_offset];
            row.extend(source_row.iter().map(Cell::from));
            rows.push(row);
        }
        Self::new(name, rows)
    }

    pub fn from_delimited(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let mut rows = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {} of {path:?}", idx + 1))?;
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {} of {path:?}", idx + 1))?;
            rows.push(decoded.iter().map(|field| Cell::from_text(field)).collect());
        }
        let name = if io_utils::is_dash(path) {
            "stdin"
        } else {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("stdin")
        };
        Ok(Self::new(name, rows))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> Option<&[Cell]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Data rows paired with their 1-based spreadsheet row number.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, row)| (idx + 1, row.as_slice()))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}
