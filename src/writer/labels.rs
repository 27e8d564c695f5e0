//! Box labels
//!
//! Boxes are turned into [`LabelSheet`] view models and placed four to a
//! page. Drawing is behind [`LabelRenderer`]; the bundled renderer lays the
//! labels out as printable worksheet blocks. Nothing here changes a quantity
//! or code handed in.

use crate::config::LabelLayout;
use crate::error::PackResult;
use crate::types::{BoxRecord, RunLog};
use crate::writer::style::Styles;
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

const STAGE: &str = "labels";
const ITEM_HEADERS: [&str; 4] = ["部門", "メーカー品番", "品名", "数量"];

/// One item line on a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelLine {
    pub department: String,
    pub manufacturer_code: String,
    pub product_name: String,
    pub qty: i64,
}

/// Everything printed on one box label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSheet {
    pub store_line: String,
    pub store_date: String,
    pub box_id: String,
    pub items: Vec<LabelLine>,
    /// More items than fit; a `...` row is printed after the last one
    pub overflow: bool,
    pub carton: String,
    pub total_qty: i64,
    /// 1-based position among all labels of the run
    pub index: usize,
    pub count: usize,
}

impl LabelSheet {
    pub fn from_boxes(boxes: &[BoxRecord], max_item_rows: usize) -> Vec<Self> {
        let count = boxes.len();
        boxes
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let brand = record.brand();
                let items = record
                    .items
                    .iter()
                    .take(max_item_rows)
                    .map(|item| LabelLine {
                        department: String::new(),
                        manufacturer_code: item.manufacturer_code(&brand),
                        product_name: item.key.product_code.clone(),
                        qty: item.qty,
                    })
                    .collect();
                LabelSheet {
                    store_line: format!("{}   {}", record.store_code, record.store_name),
                    store_date: record.store_date.clone(),
                    box_id: record.box_id(),
                    items,
                    overflow: record.items.len() > max_item_rows,
                    carton: record.carton.clone(),
                    total_qty: record.total_qty,
                    index: i + 1,
                    count,
                }
            })
            .collect()
    }

    pub fn date_line(&self) -> String {
        format!("店着日: {}", self.store_date)
    }

    pub fn box_id_line(&self) -> String {
        format!("箱ID: {}", self.box_id)
    }

    pub fn carton_line(&self) -> String {
        format!("C/No. {}", self.carton)
    }

    pub fn qty_line(&self) -> String {
        format!("入数  {} PCS", self.total_qty)
    }

    pub fn counter_line(&self) -> String {
        format!("{} / {}", self.index, self.count)
    }
}

/// Labels on one A4 page, as a 2×2 grid
pub const LABELS_PER_PAGE: usize = 4;

/// Where a label lands, in millimetres from the top-left page corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub page: usize,
    pub slot: usize,
    pub x_mm: f64,
    pub y_mm: f64,
}

/// 2×2 grid centred on the page, filled top-left, top-right, bottom-left,
/// bottom-right.
pub fn place_labels(layout: &LabelLayout, count: usize) -> Vec<LabelPlacement> {
    let block_w = 2.0 * layout.label_width_mm + layout.gap_mm;
    let block_h = 2.0 * layout.label_height_mm + layout.gap_mm;
    let start_x = (layout.page_width_mm - block_w) / 2.0;
    let start_y = (layout.page_height_mm - block_h) / 2.0;

    (0..count)
        .map(|i| {
            let slot = i % LABELS_PER_PAGE;
            let (col, row) = ((slot % 2) as f64, ((slot / 2) % 2) as f64);
            LabelPlacement {
                page: i / LABELS_PER_PAGE,
                slot,
                x_mm: start_x + col * (layout.label_width_mm + layout.gap_mm),
                y_mm: start_y + row * (layout.label_height_mm + layout.gap_mm),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelStats {
    pub box_count: usize,
    pub store_count: usize,
    pub total_qty: i64,
    pub pt_count: usize,
    /// Distinct manufacturer codes across all boxes
    pub sku_count: usize,
}

impl LabelStats {
    pub fn from_boxes(boxes: &[BoxRecord]) -> Self {
        let stores: HashSet<&str> = boxes.iter().map(|b| b.store_code.as_str()).collect();
        let patterns: HashSet<&str> = boxes.iter().map(|b| b.pattern.as_str()).collect();
        let skus: HashSet<String> = boxes
            .iter()
            .flat_map(|b| {
                let brand = b.brand();
                b.items.iter().map(move |item| item.manufacturer_code(&brand))
            })
            .collect();
        Self {
            box_count: boxes.len(),
            store_count: stores.len(),
            total_qty: boxes.iter().map(|b| b.total_qty).sum(),
            pt_count: patterns.len(),
            sku_count: skus.len(),
        }
    }
}

/// Draws label view models into an output file
pub trait LabelRenderer {
    fn render(&self, labels: &[LabelSheet], path: &Path) -> PackResult<()>;
}

/// Build labels for `boxes` and hand them to `renderer`.
///
/// No boxes means no file; the empty statistics are returned with a warning.
pub fn render_labels(
    boxes: &[BoxRecord],
    layout: &LabelLayout,
    renderer: &dyn LabelRenderer,
    path: &Path,
    log: &mut RunLog,
) -> PackResult<LabelStats> {
    if boxes.is_empty() {
        log.warn(STAGE, "No boxes to label");
        return Ok(LabelStats::default());
    }
    let labels = LabelSheet::from_boxes(boxes, layout.max_item_rows);
    renderer.render(&labels, path)?;
    let stats = LabelStats::from_boxes(boxes);
    log.info(
        STAGE,
        format!("{} labels on {} pages", stats.box_count, labels.len().div_ceil(LABELS_PER_PAGE)),
    );
    Ok(stats)
}

/// Lays each label out as a bordered block of cells, 2×2 blocks per
/// printed page.
pub struct XlsxLabelRenderer {
    layout: LabelLayout,
    styles: Styles,
}

impl XlsxLabelRenderer {
    const BLOCK_COLS: u16 = 4;

    pub fn new(layout: LabelLayout) -> Self {
        Self {
            layout,
            styles: Styles::default(),
        }
    }

    /// Rows per label: store, date, box id, item header, items, overflow,
    /// carton/qty footer, counter
    fn block_rows(&self) -> u32 {
        self.layout.max_item_rows as u32 + 7
    }

    fn write_block(&self, sheet: &mut Worksheet, top: u32, left: u16, label: &LabelSheet) -> PackResult<()> {
        let styles = &self.styles;
        let right = left + Self::BLOCK_COLS - 1;
        let centred = styles.plain.clone().set_align(FormatAlign::Center);
        let right_aligned = styles.plain.clone().set_align(FormatAlign::Right);

        sheet.merge_range(top, left, top, right, &label.store_line, &styles.plain)?;
        sheet.merge_range(top + 1, left, top + 1, right, &label.date_line(), &right_aligned)?;
        sheet.merge_range(top + 2, left, top + 2, right, &label.box_id_line(), &styles.plain)?;

        let header_row = top + 3;
        for (i, title) in ITEM_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(header_row, left + i as u16, *title, &styles.header)?;
        }
        for (i, line) in label.items.iter().enumerate() {
            let row = header_row + 1 + i as u32;
            self.write_line(
                sheet,
                row,
                left,
                [
                    line.department.as_str(),
                    line.manufacturer_code.as_str(),
                    line.product_name.as_str(),
                ],
                &styles.cell,
            )?;
            sheet.write_number_with_format(row, left + 3, line.qty as f64, &styles.number)?;
        }
        if label.overflow {
            let row = header_row + 1 + label.items.len() as u32;
            self.write_line(sheet, row, left, ["...", "...", "..."], &styles.cell)?;
            sheet.write_string_with_format(row, left + 3, "...", &styles.cell)?;
        }

        let footer = top + self.block_rows() - 2;
        sheet.merge_range(footer, left, footer, left + 1, &label.carton_line(), &styles.plain)?;
        sheet.merge_range(footer, left + 2, footer, right, &label.qty_line(), &right_aligned)?;
        sheet.merge_range(footer + 1, left, footer + 1, right, &label.counter_line(), &centred)?;
        Ok(())
    }

    fn write_line(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        left: u16,
        values: [&str; 3],
        format: &Format,
    ) -> PackResult<()> {
        for (i, value) in values.iter().enumerate() {
            sheet.write_string_with_format(row, left + i as u16, *value, format)?;
        }
        Ok(())
    }
}

impl LabelRenderer for XlsxLabelRenderer {
    fn render(&self, labels: &[LabelSheet], path: &Path) -> PackResult<()> {
        // Two block rows plus one spacer row per page
        let page_rows = 2 * self.block_rows() + 1;
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Labels")?;
        sheet.set_paper_size(9);

        for (label, placement) in labels.iter().zip(place_labels(&self.layout, labels.len())) {
            let block_row = (placement.slot / 2) as u32;
            let block_col = (placement.slot % 2) as u16;
            let top = placement.page as u32 * page_rows + block_row * (self.block_rows() + 1);
            let left = block_col * (Self::BLOCK_COLS + 1);
            self.write_block(sheet, top, left, label)?;
        }

        for block in 0..2 {
            let left = block * (Self::BLOCK_COLS + 1);
            sheet.set_column_width(left, 6)?;
            sheet.set_column_width(left + 1, 22)?;
            sheet.set_column_width(left + 2, 16)?;
            sheet.set_column_width(left + 3, 6)?;
        }

        let pages = labels.len().div_ceil(LABELS_PER_PAGE);
        let breaks: Vec<u32> = (1..pages).map(|p| p as u32 * page_rows).collect();
        if !breaks.is_empty() {
            sheet.set_page_breaks(&breaks)?;
        }

        workbook.save(path)?;
        info!("Labels written to {} ({} labels, {} pages)", path.display(), labels.len(), pages);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{CellGrid, Workbook as Input};
    use crate::types::{BoxItem, SkuKey};

    fn record(store: &str, carton: &str, pattern: &str, items: usize) -> BoxRecord {
        BoxRecord {
            pattern: pattern.to_string(),
            store_code: store.to_string(),
            store_name: "Shinjuku".to_string(),
            store_type: "1".to_string(),
            rank: None,
            carton: carton.to_string(),
            kanri_no: "ABC2401".to_string(),
            store_date: "2024/05/01".to_string(),
            items: (0..items)
                .map(|i| BoxItem {
                    key: SkuKey::new("100", "RED", format!("{}", i + 1)),
                    jan_code: String::new(),
                    qty: 1,
                })
                .collect(),
            total_qty: items as i64,
            stated_total: None,
        }
    }

    #[test]
    fn test_label_lines() {
        let labels = LabelSheet::from_boxes(&[record("S01", "C-012", "PT-1", 2)], 14);
        let label = &labels[0];
        assert_eq!(label.store_line, "S01   Shinjuku");
        assert_eq!(label.box_id, "★E-ABC2401-00012");
        assert_eq!(label.items[0].manufacturer_code, "ABC-100-1-RED");
        assert_eq!(label.carton_line(), "C/No. C-012");
        assert_eq!(label.qty_line(), "入数  2 PCS");
        assert_eq!(label.counter_line(), "1 / 1");
        assert!(!label.overflow);
    }

    #[test]
    fn test_items_capped_with_overflow_marker() {
        let labels = LabelSheet::from_boxes(&[record("S01", "1", "PT-1", 20)], 14);
        assert_eq!(labels[0].items.len(), 14);
        assert!(labels[0].overflow);
        // quantities are never rewritten
        assert_eq!(labels[0].total_qty, 20);
    }

    #[test]
    fn test_placements_are_centred_two_by_two() {
        let layout = LabelLayout::default();
        let placements = place_labels(&layout, 5);
        assert_eq!(placements[0].x_mm, 3.0);
        assert_eq!(placements[0].y_mm, 26.5);
        assert_eq!(placements[1].x_mm, 107.0);
        assert_eq!(placements[2].y_mm, 150.5);
        assert_eq!(placements[4].page, 1);
        assert_eq!(placements[4].slot, 0);
    }

    #[test]
    fn test_pages_hold_four_labels_whatever_the_layout_says() {
        let layout = crate::config::Layout::from_yaml("labels:\n  labels_per_page: 8\n")
            .unwrap()
            .labels;
        let placements = place_labels(&layout, 9);
        let pages: Vec<usize> = placements.iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![0, 0, 0, 0, 1, 1, 1, 1, 2]);
        assert!(placements.iter().all(|p| p.slot < LABELS_PER_PAGE));
    }

    #[test]
    fn test_stats() {
        let boxes = vec![
            record("S01", "1", "PT-1", 3),
            record("S01", "2", "PT-2", 2),
            record("S02", "3", "PT-2", 1),
        ];
        let stats = LabelStats::from_boxes(&boxes);
        assert_eq!(
            stats,
            LabelStats {
                box_count: 3,
                store_count: 2,
                total_qty: 6,
                pt_count: 2,
                sku_count: 3,
            }
        );
    }

    #[test]
    fn test_xlsx_renderer_writes_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.xlsx");
        let layout = LabelLayout::default();
        let boxes: Vec<BoxRecord> = (1..=5).map(|n| record("S01", &n.to_string(), "PT-1", 2)).collect();
        let mut log = RunLog::new();
        let stats = render_labels(&boxes, &layout, &XlsxLabelRenderer::new(layout.clone()), &path, &mut log).unwrap();
        assert_eq!(stats.box_count, 5);

        let mut wb = Input::open(&path).unwrap();
        let sheet = wb.sheet("Labels").unwrap();
        assert_eq!(sheet.text(0, 0), "S01   Shinjuku");
        assert_eq!(sheet.text(2, 5), "箱ID: ★E-ABC2401-00002");
        // 21 rows per block, 43 rows per page
        assert_eq!(sheet.text(43 + 20, 0), "5 / 5");
    }

    #[test]
    fn test_no_boxes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.xlsx");
        let layout = LabelLayout::default();
        let mut log = RunLog::new();
        let stats = render_labels(&[], &layout, &XlsxLabelRenderer::new(layout.clone()), &path, &mut log).unwrap();
        assert_eq!(stats, LabelStats::default());
        assert!(!path.exists());
        assert!(log.has_warnings());
    }
}
