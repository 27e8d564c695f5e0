//! JAN detail table (明細表) reader

use crate::config::JanTableLayout;
use crate::error::{PackError, PackResult};
use crate::sheet::text::{normalize_part, normalize_product_code};
use crate::sheet::{extension_of, CellGrid, DelimitedSheet, Workbook};
use crate::types::{RunLog, SkuKey};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const STAGE: &str = "jan table";

/// `(product_code, color, size) -> jan_code`, keys normalised like SKU keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JanMap {
    entries: HashMap<SkuKey, String>,
}

impl JanMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already present; returns whether it was inserted.
    pub fn insert_first(&mut self, key: SkuKey, jan: String) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, jan);
        true
    }

    pub fn get(&self, key: &SkuKey) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<((K, K, K), V)> for JanMap {
    fn from_iter<I: IntoIterator<Item = ((K, K, K), V)>>(iter: I) -> Self {
        let mut map = JanMap::new();
        for ((p, c, s), jan) in iter {
            map.insert_first(
                SkuKey::new(
                    normalize_product_code(&p.into()),
                    normalize_part(&c.into()),
                    normalize_part(&s.into()),
                ),
                jan.into(),
            );
        }
        map
    }
}

pub struct JanTableReader<'a> {
    layout: &'a JanTableLayout,
}

impl<'a> JanTableReader<'a> {
    pub fn new(layout: &'a JanTableLayout) -> Self {
        Self { layout }
    }

    /// Load a workbook (`.xlsx`, `.xlsm`, `.xls`) or delimited (`.csv`,
    /// `.tsv`, `.txt`) table.
    pub fn read(&self, path: &Path, log: &mut RunLog) -> PackResult<JanMap> {
        let map = match extension_of(path).as_str() {
            "xlsx" | "xlsm" | "xls" => {
                let mut workbook = Workbook::open(path)?;
                let first = workbook.sheet_names().into_iter().next().ok_or_else(|| {
                    PackError::workbook(path, "workbook has no sheets")
                })?;
                let sheet = workbook.sheet(&first)?;
                self.read_grid(&sheet, path, log)?
            }
            "csv" => self.read_grid(&read_delimited(path, b',')?, path, log)?,
            "tsv" | "txt" => self.read_grid(&read_delimited(path, b'\t')?, path, log)?,
            other => {
                return Err(PackError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    extension: other.to_string(),
                })
            }
        };
        log.info(
            STAGE,
            format!("Loaded {} JAN entries from {}", map.len(), path.display()),
        );
        Ok(map)
    }

    /// Build the map from a grid whose first non-empty row is the header.
    pub fn read_grid(&self, grid: &dyn CellGrid, path: &Path, log: &mut RunLog) -> PackResult<JanMap> {
        let (rows, cols) = grid.dimensions();
        let header_row = (0..rows)
            .find(|&r| (0..cols).any(|c| !grid.get_cell(r, c).is_blank()))
            .unwrap_or(0);

        let headers: Vec<String> = (0..cols).map(|c| grid.text(header_row, c)).collect();
        let column = |name: &str| -> PackResult<u32> {
            headers
                .iter()
                .position(|h| h == name)
                .map(|i| i as u32)
                .ok_or_else(|| PackError::MissingColumn {
                    column: name.to_string(),
                    path: path.to_path_buf(),
                })
        };
        let col_code = column(&self.layout.product_code_header)?;
        let col_color = column(&self.layout.color_header)?;
        let col_size = column(&self.layout.size_header)?;
        let col_jan = column(&self.layout.jan_header)?;

        let mut map = JanMap::new();
        let mut duplicates = 0usize;
        for row in header_row + 1..rows {
            let jan = grid.text(row, col_jan);
            if jan.is_empty() {
                continue;
            }
            let key = SkuKey::new(
                normalize_product_code(&grid.text(row, col_code)),
                normalize_part(&grid.text(row, col_color)),
                normalize_part(&grid.text(row, col_size)),
            );
            if !map.insert_first(key.clone(), jan) {
                duplicates += 1;
                log.debug(STAGE, format!("Duplicate JAN key {}, keeping first", key));
            }
        }
        if duplicates > 0 {
            log.info(STAGE, format!("{} duplicate keys ignored", duplicates));
        }
        Ok(map)
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> PackResult<DelimitedSheet> {
    let bytes = fs::read(path)?;
    let content = decode_text(&bytes).ok_or_else(|| PackError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: "undecodable text (tried UTF-8, Shift-JIS, GBK)".to_string(),
    })?;
    DelimitedSheet::parse(&content, delimiter)
}

/// UTF-8 (BOM tolerated), then Shift-JIS, then GBK.
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(body) {
        return Some(text.to_string());
    }
    [encoding_rs::SHIFT_JIS, encoding_rs::GBK]
        .iter()
        .find_map(|enc| enc.decode_without_bom_handling_and_without_replacement(bytes))
        .map(|text| text.into_owned())
}
