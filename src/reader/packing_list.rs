//! Read a packing list back after the factory filled in carton numbers

use crate::config::PackingListLayout;
use crate::error::PackResult;
use crate::fill_down::FillDown;
use crate::sheet::text::{normalize_part, normalize_product_code};
use crate::sheet::{CellGrid, Workbook};
use crate::types::{BoxItem, BoxRecord, RunLog, SkuKey};
use std::path::Path;

const STAGE: &str = "box setting";
/// Consecutive empty rows that end a sheet's data region
const MAX_EMPTY_ROWS: u32 = 10;

struct AxisColumn {
    col: u32,
    key: SkuKey,
    jan_code: String,
}

pub struct PackingListReader<'a> {
    layout: &'a PackingListLayout,
}

impl<'a> PackingListReader<'a> {
    pub fn new(layout: &'a PackingListLayout) -> Self {
        Self { layout }
    }

    /// Read every `PT-` sheet of the workbook into boxes, in sheet order.
    pub fn read(&self, path: &Path, log: &mut RunLog) -> PackResult<Vec<BoxRecord>> {
        let mut workbook = Workbook::open(path)?;
        let mut boxes = Vec::new();
        for name in workbook.sheet_names() {
            if !name.contains("PT-") {
                continue;
            }
            let sheet = workbook.sheet(&name)?;
            boxes.extend(self.read_grid(&name, &sheet, log));
        }
        log.info(
            STAGE,
            format!("Read {} boxes from {}", boxes.len(), path.display()),
        );
        Ok(boxes)
    }

    fn read_axis(&self, grid: &dyn CellGrid) -> Vec<AxisColumn> {
        let layout = self.layout;
        let mut axis = Vec::new();
        let mut col = layout.first_sku_col as u32;
        loop {
            let product = grid.text(layout.product_code_row, col);
            if product.is_empty() {
                break;
            }
            axis.push(AxisColumn {
                col,
                key: SkuKey::new(
                    normalize_product_code(&product),
                    normalize_part(&grid.text(layout.color_row, col)),
                    normalize_part(&grid.text(layout.size_row, col)),
                ),
                jan_code: grid.text(layout.jan_row, col),
            });
            col += 1;
        }
        axis
    }

    fn is_empty_row(&self, grid: &dyn CellGrid, row: u32, axis: &[AxisColumn]) -> bool {
        (0..self.layout.first_sku_col as u32).all(|c| grid.get_cell(row, c).is_blank())
            && axis.iter().all(|a| grid.get_cell(row, a.col).is_blank())
    }

    /// Read one pattern sheet.
    pub fn read_grid(&self, sheet: &str, grid: &dyn CellGrid, log: &mut RunLog) -> Vec<BoxRecord> {
        let layout = self.layout;
        let value_col = layout.header_value_col as u32;
        let kanri_no = grid.text(layout.jan_row, value_col);
        let store_date = grid.text(layout.size_row, value_col);
        let axis = self.read_axis(grid);

        let mut boxes: Vec<BoxRecord> = Vec::new();
        let mut fill = FillDown::new();
        let mut empty_run = 0u32;

        for row in layout.data_start_row..grid.row_count() {
            let first = grid.text(row, layout.col_no as u32);
            if layout.total_markers.iter().any(|m| first.contains(m.as_str())) {
                break;
            }
            if self.is_empty_row(grid, row, &axis) {
                empty_run += 1;
                if empty_run > MAX_EMPTY_ROWS {
                    break;
                }
                continue;
            }
            empty_run = 0;

            let resolved = fill.resolve(
                grid.get_cell(row, layout.col_store_code as u32).as_opt_text(),
                grid.get_cell(row, layout.col_store_name as u32).as_opt_text(),
                grid.get_cell(row, layout.col_carton as u32).as_opt_text(),
            );
            let Some(ctx) = resolved.context() else {
                continue;
            };
            let Some(carton) = ctx.carton.clone() else {
                continue;
            };

            let items: Vec<BoxItem> = axis
                .iter()
                .filter_map(|a| {
                    let qty = grid.get_cell(row, a.col).as_quantity();
                    (qty > 0).then(|| BoxItem {
                        key: a.key.clone(),
                        jan_code: a.jan_code.clone(),
                        qty,
                    })
                })
                .collect();
            let computed: i64 = items.iter().map(|i| i.qty).sum();
            let stated = grid.get_cell(row, layout.col_total as u32).as_opt_number();
            if let Some(stated) = stated {
                if stated != computed {
                    log.warn(
                        STAGE,
                        format!(
                            "{} row {}: store {} carton {} states {} but items sum to {}",
                            sheet,
                            row + 1,
                            ctx.store_code,
                            carton,
                            stated,
                            computed
                        ),
                    );
                }
            }

            // Continuation rows of the same carton add to the open box
            if let Some(open) = boxes.last_mut() {
                if open.store_code == ctx.store_code && open.carton == carton {
                    open.items.extend(items);
                    open.total_qty += computed;
                    open.stated_total = match (open.stated_total, stated) {
                        (Some(a), Some(b)) => Some(a + b),
                        (a, b) => a.or(b),
                    };
                    continue;
                }
            }

            boxes.push(BoxRecord {
                pattern: sheet.to_string(),
                store_code: ctx.store_code.clone(),
                store_name: ctx.store_name.clone(),
                store_type: grid.text(row, layout.col_type as u32),
                rank: grid.get_cell(row, layout.col_rank as u32).as_opt_text(),
                carton,
                kanri_no: kanri_no.clone(),
                store_date: store_date.clone(),
                items,
                total_qty: computed,
                stated_total: stated,
            });
        }

        boxes
    }
}
