//! Assortment detail (アソート明細): per box and SKU, keyed by week slip number

use crate::config::AssortmentLayout;
use crate::error::PackResult;
use crate::types::{BoxRecord, RunLog};
use crate::writer::style::Styles;
use crate::writer::template::{optional_chrome, SheetChrome};
use crate::writer::SlipNumbering;
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use std::path::Path;
use tracing::info;

const STAGE: &str = "assortment";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssortmentRow {
    pub delivery_code: String,
    pub delivery_name: String,
    pub slip_no: String,
    pub jan_code: String,
    pub manufacturer_code: String,
    pub qty: i64,
}

pub struct AssortmentWriter<'a> {
    layout: &'a AssortmentLayout,
    week: Option<String>,
    styles: Styles,
    chrome: SheetChrome,
}

impl<'a> AssortmentWriter<'a> {
    pub fn new(layout: &'a AssortmentLayout) -> Self {
        Self {
            layout,
            week: None,
            styles: Styles::default(),
            chrome: SheetChrome::default(),
        }
    }

    /// Force the week prefix instead of deriving it from the store date.
    pub fn with_week(mut self, week: Option<String>) -> Self {
        self.week = week;
        self
    }

    pub fn with_template(mut self, template: Option<&Path>) -> PackResult<Self> {
        self.chrome = optional_chrome(template, None, self.layout.write_start_row)?;
        Ok(self)
    }

    pub fn rows(&self, boxes: &[BoxRecord], log: &mut RunLog) -> Vec<AssortmentRow> {
        let numbering = SlipNumbering::week(self.week.as_deref());
        let mut rows = Vec::new();
        for record in boxes {
            let Some(slip_no) = numbering.slip_no(record) else {
                log.warn(
                    STAGE,
                    format!("Box for store {} on {} has no carton", record.store_code, record.pattern),
                );
                continue;
            };
            let brand = record.brand();
            for item in record.items.iter().filter(|i| i.qty > 0) {
                rows.push(AssortmentRow {
                    delivery_code: record.store_code.clone(),
                    delivery_name: record.store_name.clone(),
                    slip_no: slip_no.clone(),
                    jan_code: item.jan_code.clone(),
                    manufacturer_code: item.manufacturer_code(&brand),
                    qty: item.qty,
                });
            }
        }
        rows
    }

    pub fn write(&self, boxes: &[BoxRecord], path: &Path, log: &mut RunLog) -> PackResult<usize> {
        let layout = self.layout;
        let styles = &self.styles;
        let rows = self.rows(boxes, log);

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        self.chrome.replay(sheet, &styles.plain)?;

        for (i, line) in rows.iter().enumerate() {
            let row = layout.write_start_row + i as u32;
            sheet.write_string_with_format(row, layout.col_delivery_code, &line.delivery_code, &styles.cell)?;
            sheet.write_string_with_format(row, layout.col_delivery_name, &line.delivery_name, &styles.cell)?;
            sheet.write_string_with_format(row, layout.col_slip_no, &line.slip_no, &styles.cell)?;
            sheet.write_string_with_format(row, layout.col_jan, &line.jan_code, &styles.cell)?;
            sheet.write_string_with_format(
                row,
                layout.col_manufacturer_code,
                &line.manufacturer_code,
                &styles.cell,
            )?;
            sheet.write_number_with_format(row, layout.col_qty, line.qty as f64, &styles.number)?;
        }

        let total_row = layout.write_start_row + rows.len() as u32;
        let total: i64 = rows.iter().map(|r| r.qty).sum();
        sheet.write_string_with_format(total_row, layout.col_manufacturer_code, &layout.total_label, &styles.total)?;
        sheet.write_number_with_format(total_row, layout.col_qty, total as f64, &styles.total_number)?;

        workbook.save(path)?;
        info!("Assortment detail written to {} ({} rows, {} pcs)", path.display(), rows.len(), total);
        Ok(rows.len())
    }
}
