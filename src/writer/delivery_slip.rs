//! Delivery slip (受渡伝票): one flat row per box and SKU

use crate::config::SlipLayout;
use crate::error::PackResult;
use crate::types::{BoxRecord, RunLog};
use crate::writer::style::Styles;
use crate::writer::template::{optional_chrome, SheetChrome};
use crate::writer::{write_slip_rows, SlipNumbering, SlipRow};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::info;

const STAGE: &str = "delivery slip";

pub struct DeliverySlipWriter<'a> {
    layout: &'a SlipLayout,
    numbering: SlipNumbering,
    styles: Styles,
    chrome: SheetChrome,
}

impl<'a> DeliverySlipWriter<'a> {
    pub fn new(layout: &'a SlipLayout, numbering: SlipNumbering) -> Self {
        Self {
            layout,
            numbering,
            styles: Styles::default(),
            chrome: SheetChrome::default(),
        }
    }

    /// Use the first sheet of `template` as static chrome.
    pub fn with_template(mut self, template: Option<&Path>) -> PackResult<Self> {
        self.chrome = optional_chrome(template, None, self.layout.write_start_row)?;
        Ok(self)
    }

    /// Flatten boxes into slip rows. Boxes whose carton cannot be numbered
    /// are skipped with a warning.
    pub fn rows(&self, boxes: &[BoxRecord], log: &mut RunLog) -> Vec<SlipRow> {
        let mut rows = Vec::new();
        for record in boxes {
            let Some(slip_no) = self.numbering.slip_no(record) else {
                log.warn(
                    STAGE,
                    format!(
                        "Cannot number carton '{}' for store {} on {}",
                        record.carton, record.store_code, record.pattern
                    ),
                );
                continue;
            };
            let brand = record.brand();
            rows.extend(record.items.iter().filter(|i| i.qty > 0).map(|item| SlipRow {
                slip_no: slip_no.clone(),
                brand: brand.clone(),
                store_code: record.store_code.clone(),
                product_code: item.key.product_code.clone(),
                size: item.key.size.clone(),
                color: item.key.color.clone(),
                qty: item.qty,
            }));
        }
        rows
    }

    pub fn write(&self, boxes: &[BoxRecord], path: &Path, log: &mut RunLog) -> PackResult<usize> {
        let rows = self.rows(boxes, log);
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        self.chrome.replay(sheet, &self.styles.plain)?;
        write_slip_rows(sheet, self.layout, &rows, &self.styles)?;
        workbook.save(path)?;
        info!("Delivery slip written to {} ({} rows)", path.display(), rows.len());
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{CellGrid, Workbook as Input};
    use crate::types::{BoxItem, SkuKey};

    fn boxes() -> Vec<BoxRecord> {
        let record = |carton: &str, store: &str| BoxRecord {
            pattern: "PT-1".to_string(),
            store_code: store.to_string(),
            store_name: String::new(),
            store_type: String::new(),
            rank: None,
            carton: carton.to_string(),
            kanri_no: "ABC2401".to_string(),
            store_date: String::new(),
            items: vec![
                BoxItem {
                    key: SkuKey::new("100", "RED", "M"),
                    jan_code: String::new(),
                    qty: 3,
                },
                BoxItem {
                    key: SkuKey::new("100", "RED", "S"),
                    jan_code: String::new(),
                    qty: 2,
                },
            ],
            total_qty: 5,
            stated_total: None,
        };
        vec![record("1", "S01"), record("", "S02"), record("2", "S03")]
    }

    #[test]
    fn test_rows_skip_unnumbered_cartons() {
        let layout = SlipLayout::default();
        let writer = DeliverySlipWriter::new(&layout, SlipNumbering::default());
        let mut log = RunLog::new();
        let rows = writer.rows(&boxes(), &mut log);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].slip_no, "810001");
        assert_eq!(rows[0].brand, "ABC");
        assert_eq!(rows[3].store_code, "S03");
        assert!(log.has_warnings());
    }

    #[test]
    fn test_start_overflow_skips_the_box() {
        let layout = SlipLayout::default();
        let numbering = SlipNumbering::Offset {
            prefix: "81".to_string(),
            start: Some(u32::MAX),
        };
        let mut log = RunLog::new();
        let rows = DeliverySlipWriter::new(&layout, numbering).rows(&boxes(), &mut log);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.store_code == "S01"));
        assert_eq!(log.warnings().count(), 2);
    }

    #[test]
    fn test_write_starts_at_row_eight() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slip.xlsx");
        let layout = SlipLayout::default();
        let numbering = SlipNumbering::Offset {
            prefix: "81".to_string(),
            start: Some(500),
        };
        let mut log = RunLog::new();
        let written = DeliverySlipWriter::new(&layout, numbering)
            .write(&boxes(), &path, &mut log)
            .unwrap();
        assert_eq!(written, 4);

        let mut wb = Input::open(&path).unwrap();
        let names = wb.sheet_names();
        let sheet = wb.sheet(&names[0]).unwrap();
        assert_eq!(sheet.text(7, 1), "810500");
        assert_eq!(sheet.text(7, 5), "M");
        assert_eq!(sheet.text(7, 6), "RED");
        assert_eq!(sheet.text(7, 7), "3");
        assert_eq!(sheet.text(9, 1), "810501");
    }
}
