//! Per-store detail (各店舗明細): one sheet per store code

use crate::config::StoreDetailLayout;
use crate::error::PackResult;
use crate::transform::TransformOutput;
use crate::writer::style::Styles;
use crate::writer::template::{optional_chrome, SheetChrome};
use crate::writer::{write_slip_rows, SlipRow};
use rust_xlsxwriter::Workbook;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Everything one store's sheet shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDetail {
    pub store_code: String,
    pub store_name: String,
    pub rows: Vec<SlipRow>,
}

impl StoreDetail {
    pub fn total_qty(&self) -> i64 {
        self.rows.iter().map(|r| r.qty).sum()
    }

    /// `{code}_{name}` without characters Excel rejects, capped in length
    pub fn sheet_title(&self, max_chars: usize) -> String {
        format!("{}_{}", self.store_code, self.store_name)
            .chars()
            .take(max_chars)
            .filter(|c| !matches!(c, '\\' | '/' | '*' | '[' | ']' | ':' | '?'))
            .collect()
    }
}

pub struct StoreDetailWriter<'a> {
    layout: &'a StoreDetailLayout,
    styles: Styles,
    chrome: SheetChrome,
}

impl<'a> StoreDetailWriter<'a> {
    pub fn new(layout: &'a StoreDetailLayout) -> Self {
        Self {
            layout,
            styles: Styles::default(),
            chrome: SheetChrome::default(),
        }
    }

    pub fn with_template(mut self, template: Option<&Path>) -> PackResult<Self> {
        self.chrome = optional_chrome(template, None, self.layout.rows.write_start_row)?;
        Ok(self)
    }

    /// Re-key the transformation by store code. Slip numbers come from the
    /// box numbers the transformer assigned.
    pub fn details(&self, output: &TransformOutput) -> Vec<StoreDetail> {
        let brand = output.metadata.brand();
        let prefix = &self.layout.rows.slip_prefix;
        let mut stores: BTreeMap<String, StoreDetail> = BTreeMap::new();

        for group in &output.groups {
            for assigned in &group.stores {
                let store = &assigned.store;
                let slip_no = format!("{}{:04}", prefix, assigned.box_no);
                let detail = stores
                    .entry(store.store_code.clone())
                    .or_insert_with(|| StoreDetail {
                        store_code: store.store_code.clone(),
                        store_name: store.store_name.clone(),
                        rows: Vec::new(),
                    });
                for (sku, &qty) in output.skus.iter().zip(&store.pattern_vector) {
                    if qty > 0 {
                        detail.rows.push(SlipRow {
                            slip_no: slip_no.clone(),
                            brand: brand.clone(),
                            store_code: store.store_code.clone(),
                            product_code: sku.key.product_code.clone(),
                            size: sku.key.size.clone(),
                            color: sku.key.color.clone(),
                            qty,
                        });
                    }
                }
            }
        }

        stores.into_values().filter(|d| !d.rows.is_empty()).collect()
    }

    pub fn write(&self, output: &TransformOutput, path: &Path) -> PackResult<usize> {
        let layout = self.layout;
        let styles = &self.styles;
        let details = self.details(output);
        let mut workbook = Workbook::new();

        for detail in &details {
            let sheet = workbook.add_worksheet();
            sheet.set_name(detail.sheet_title(layout.sheet_title_max_chars))?;
            self.chrome.replay(sheet, &styles.plain)?;
            sheet.write_number_with_format(
                layout.total_qty.row,
                layout.total_qty.col as u16,
                detail.total_qty() as f64,
                &styles.plain,
            )?;
            sheet.write_string_with_format(
                layout.kanri_no.row,
                layout.kanri_no.col as u16,
                output.metadata.kanri_no(),
                &styles.plain,
            )?;
            sheet.write_string_with_format(
                layout.store_name.row,
                layout.store_name.col as u16,
                &detail.store_name,
                &styles.plain,
            )?;
            write_slip_rows(sheet, &layout.rows, &detail.rows, styles)?;
        }
        if details.is_empty() {
            // A workbook needs at least one sheet
            workbook.add_worksheet();
        }

        workbook.save(path)?;
        info!("Store detail written to {} ({} stores)", path.display(), details.len());
        Ok(details.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Policy;
    use crate::reader::JanMap;
    use crate::sheet::{CellGrid, Workbook as Input};
    use crate::transform::Transformer;
    use crate::types::{AllocationData, Metadata, ProductSheet, ShortKey, SkuColumn, StoreRow};

    fn output() -> TransformOutput {
        let row = |code: &str, name: &str, qty: i64| StoreRow {
            no: String::new(),
            store_type: "1".to_string(),
            store_code: code.to_string(),
            store_name: name.to_string(),
            rank: None,
            carton: None,
            quantities: [(ShortKey::new("RED", "S"), qty)].into_iter().collect(),
        };
        let data = AllocationData {
            metadata: Metadata {
                kanri_no: Some("ABC2401".to_string()),
                ..Default::default()
            },
            products: vec![ProductSheet {
                sheet_name: "100".to_string(),
                product_code: "100".to_string(),
                metadata: Metadata::default(),
                sku_columns: vec![SkuColumn { col: 7, key: ShortKey::new("RED", "S") }],
                stores: vec![row("S02", "Ginza/East", 4), row("S01", "Shibuya", 2)],
            }],
        };
        Transformer::new(&data, &JanMap::new(), &Policy::default()).transform()
    }

    #[test]
    fn test_details_sorted_by_store_with_box_slip_numbers() {
        let layout = StoreDetailLayout::default();
        let details = StoreDetailWriter::new(&layout).details(&output());
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].store_code, "S01");
        // S02 came first, so it holds box 1
        assert_eq!(details[0].rows[0].slip_no, "810002");
        assert_eq!(details[1].rows[0].slip_no, "810001");
        assert_eq!(details[1].sheet_title(30), "S02_GinzaEast");
    }

    #[test]
    fn test_sheet_title_is_capped() {
        let detail = StoreDetail {
            store_code: "S0001".to_string(),
            store_name: "A very long store name that keeps going".to_string(),
            rows: vec![],
        };
        assert_eq!(detail.sheet_title(30).chars().count(), 30);
    }

    #[test]
    fn test_written_sheet_header_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detail.xlsx");
        let layout = StoreDetailLayout::default();
        let written = StoreDetailWriter::new(&layout).write(&output(), &path).unwrap();
        assert_eq!(written, 2);

        let mut wb = Input::open(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["S01_Shibuya", "S02_GinzaEast"]);
        let sheet = wb.sheet("S01_Shibuya").unwrap();
        assert_eq!(sheet.text(3, 2), "2");
        assert_eq!(sheet.text(4, 2), "ABC2401");
        assert_eq!(sheet.text(4, 6), "Shibuya");
        assert_eq!(sheet.text(7, 1), "810002");
        assert_eq!(sheet.text(7, 7), "2");
    }
}
