//! Cell-grid access for every input container
//!
//! Readers only see [`CellGrid`]: `get_cell(row, col)` plus `dimensions()`.
//! Workbooks (`.xlsx`/`.xlsm` through the XML adapter, `.xls` through the
//! legacy adapter) and delimited text tables all implement it, so reader
//! logic never branches on the file format.

pub mod text;

use crate::error::{PackError, PackResult};
use calamine::{open_workbook, Data, Range, Reader, Xls, Xlsx};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A single cell value, independent of the container it came from
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel date serial
    Date(f64),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed display text: integral numbers without decimals, dates as `YYYY/MM/DD`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => text::normalize_numeric_text(s),
            Cell::Number(n) => text::format_number(*n),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(serial) => text::excel_serial_to_date(*serial)
                .map(text::format_date)
                .unwrap_or_else(|| text::format_number(*serial)),
        }
    }

    /// Non-blank trimmed text
    pub fn as_opt_text(&self) -> Option<String> {
        let value = self.as_text();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Quantity value: fractional parts truncate, negatives and anything
    /// non-numeric become 0.
    pub fn as_quantity(&self) -> i64 {
        let value = match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        };
        match value {
            Some(n) if n.is_finite() && n > 0.0 => n.trunc() as i64,
            _ => 0,
        }
    }

    /// Like [`Cell::as_quantity`] but distinguishes a blank/garbage cell
    pub fn as_opt_number(&self) -> Option<i64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Cell::Text(s) => s
                .trim()
                .replace(',', "")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|n| n.trunc() as i64),
            _ => None,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Date(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

/// Read-only access to a rectangular grid of cells
pub trait CellGrid {
    /// Cell at an absolute 0-based position; out-of-range reads are empty
    fn get_cell(&self, row: u32, col: u32) -> Cell;

    /// `(rows, cols)`: one past the last used row and column
    fn dimensions(&self) -> (u32, u32);

    fn text(&self, row: u32, col: u32) -> String {
        self.get_cell(row, col).as_text()
    }

    fn row_count(&self) -> u32 {
        self.dimensions().0
    }

    fn col_count(&self) -> u32 {
        self.dimensions().1
    }
}

//==============================================================================
// Workbook adapters
//==============================================================================

/// One worksheet loaded from either workbook container
#[derive(Debug, Clone)]
pub struct WorkbookSheet {
    pub name: String,
    range: Range<Data>,
}

impl WorkbookSheet {
    pub fn new(name: impl Into<String>, range: Range<Data>) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

impl CellGrid for WorkbookSheet {
    fn get_cell(&self, row: u32, col: u32) -> Cell {
        self.range
            .get_value((row, col))
            .map(Cell::from)
            .unwrap_or(Cell::Empty)
    }

    fn dimensions(&self) -> (u32, u32) {
        match self.range.end() {
            Some((row, col)) => (row + 1, col + 1),
            None => (0, 0),
        }
    }
}

enum Container {
    Xml(Xlsx<BufReader<File>>),
    Legacy(Xls<BufReader<File>>),
}

/// A workbook opened through the adapter that matches its extension
pub struct Workbook {
    path: PathBuf,
    container: Container,
}

impl Workbook {
    pub fn open(path: &Path) -> PackResult<Self> {
        let container = match extension_of(path).as_str() {
            "xlsx" | "xlsm" => Container::Xml(
                open_workbook(path).map_err(|e: calamine::XlsxError| PackError::workbook(path, e))?,
            ),
            "xls" => Container::Legacy(
                open_workbook(path).map_err(|e: calamine::XlsError| PackError::workbook(path, e))?,
            ),
            other => {
                return Err(PackError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    extension: other.to_string(),
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            container,
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        match &self.container {
            Container::Xml(wb) => wb.sheet_names(),
            Container::Legacy(wb) => wb.sheet_names(),
        }
    }

    pub fn sheet(&mut self, name: &str) -> PackResult<WorkbookSheet> {
        let range = match &mut self.container {
            Container::Xml(wb) => wb
                .worksheet_range(name)
                .map_err(|e| PackError::workbook(&self.path, e))?,
            Container::Legacy(wb) => wb
                .worksheet_range(name)
                .map_err(|e| PackError::workbook(&self.path, e))?,
        };
        Ok(WorkbookSheet::new(name, range))
    }

    /// Every worksheet, in workbook order
    pub fn sheets(&mut self) -> PackResult<Vec<WorkbookSheet>> {
        let names = self.sheet_names();
        names.iter().map(|name| self.sheet(name)).collect()
    }
}

/// Lower-cased file extension, empty when there is none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

//==============================================================================
// Delimited text adapter
//==============================================================================

/// A delimited text table held as rows of strings
#[derive(Debug, Clone, Default)]
pub struct DelimitedSheet {
    rows: Vec<Vec<String>>,
    width: u32,
}

impl DelimitedSheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        Self { rows, width }
    }

    /// Parse already decoded text
    pub fn parse(content: &str, delimiter: u8) -> PackResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(content.as_bytes());
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(Self::new(rows))
    }
}

impl CellGrid for DelimitedSheet {
    fn get_cell(&self, row: u32, col: u32) -> Cell {
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .map(|s| {
                if s.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(s.clone())
                }
            })
            .unwrap_or(Cell::Empty)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.rows.len() as u32, self.width)
    }
}
