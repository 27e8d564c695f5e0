//! Template workbooks as declarative sheet chrome
//!
//! A template is never edited. Its static cells above the data region are
//! read once and written into every generated sheet, so concurrent runs can
//! share one template file.

use crate::error::{PackError, PackResult};
use crate::sheet::{extension_of, Cell, CellGrid, Workbook};
use rust_xlsxwriter::{Format, Worksheet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pick the workbook a writer can use for `path`.
///
/// `.xlsx`/`.xlsm` are used as is. A legacy `.xls` template is swapped for a
/// same-named `.xlsx` next to it; without one the template is rejected
/// rather than producing a broken output.
pub fn resolve_template(path: &Path) -> PackResult<PathBuf> {
    match extension_of(path).as_str() {
        "xlsx" | "xlsm" => Ok(path.to_path_buf()),
        "xls" => {
            let sibling = path.with_extension("xlsx");
            if sibling.is_file() {
                debug!("Using {} in place of {}", sibling.display(), path.display());
                Ok(sibling)
            } else {
                Err(PackError::UnsupportedTemplate {
                    path: path.to_path_buf(),
                })
            }
        }
        _ => Err(PackError::UnsupportedTemplate {
            path: path.to_path_buf(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ChromeValue {
    Text(String),
    Number(f64),
}

/// Static cells copied from a template sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetChrome {
    cells: Vec<(u32, u16, ChromeValue)>,
}

impl SheetChrome {
    /// Read the cells above `data_row` from `sheet` (or the first sheet).
    /// A missing sheet yields empty chrome.
    pub fn load(path: &Path, sheet: Option<&str>, data_row: u32) -> PackResult<Self> {
        let resolved = resolve_template(path)?;
        let mut workbook = Workbook::open(&resolved)?;
        let names = workbook.sheet_names();
        let name = match sheet {
            Some(wanted) => names.into_iter().find(|n| n == wanted),
            None => names.into_iter().next(),
        };
        let Some(name) = name else {
            debug!("Template {} has no sheet {:?}", resolved.display(), sheet);
            return Ok(Self::default());
        };
        let grid = workbook.sheet(&name)?;
        Ok(Self::from_grid(&grid, data_row))
    }

    pub fn from_grid(grid: &dyn CellGrid, data_row: u32) -> Self {
        let (rows, cols) = grid.dimensions();
        let mut cells = Vec::new();
        for row in 0..rows.min(data_row) {
            for col in 0..cols.min(u16::MAX as u32) {
                let value = match grid.get_cell(row, col) {
                    Cell::Number(n) => ChromeValue::Number(n),
                    other if !other.is_blank() => ChromeValue::Text(other.as_text()),
                    _ => continue,
                };
                cells.push((row, col as u16, value));
            }
        }
        Self { cells }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Write the chrome into `worksheet`; later writes overwrite it.
    pub fn replay(&self, worksheet: &mut Worksheet, format: &Format) -> PackResult<()> {
        for (row, col, value) in &self.cells {
            match value {
                ChromeValue::Text(text) => {
                    worksheet.write_string_with_format(*row, *col, text, format)?;
                }
                ChromeValue::Number(n) => {
                    worksheet.write_number_with_format(*row, *col, *n, format)?;
                }
            }
        }
        Ok(())
    }
}

/// Chrome from an optional template, empty when there is none.
pub fn optional_chrome(template: Option<&Path>, sheet: Option<&str>, data_row: u32) -> PackResult<SheetChrome> {
    match template {
        Some(path) => SheetChrome::load(path, sheet, data_row),
        None => Ok(SheetChrome::default()),
    }
}
