//! Allocation table (配分表) reader

use crate::config::{AllocationLayout, CellPos};
use crate::error::PackResult;
use crate::fill_down::{FillDown, Resolved};
use crate::sheet::text::{normalize_part, normalize_product_code};
use crate::sheet::{CellGrid, Workbook};
use crate::types::{AllocationData, Metadata, ProductSheet, RunLog, ShortKey, SkuColumn, StoreRow};
use std::collections::BTreeMap;
use std::path::Path;

const STAGE: &str = "allocation";

/// Reads product sheets out of an allocation workbook
pub struct AllocationReader<'a> {
    layout: &'a AllocationLayout,
}

impl<'a> AllocationReader<'a> {
    pub fn new(layout: &'a AllocationLayout) -> Self {
        Self { layout }
    }

    /// Read every qualifying sheet of the workbook at `path`.
    pub fn read(&self, path: &Path, log: &mut RunLog) -> PackResult<AllocationData> {
        let mut workbook = Workbook::open(path)?;
        let sheets = workbook.sheets()?;
        log.info(
            STAGE,
            format!("Opened {} ({} sheets)", path.display(), sheets.len()),
        );
        let grids: Vec<(&str, &dyn CellGrid)> = sheets
            .iter()
            .map(|s| (s.name.as_str(), s as &dyn CellGrid))
            .collect();
        Ok(self.read_sheets(&grids, log))
    }

    /// Read already opened sheets, in workbook order.
    pub fn read_sheets(&self, sheets: &[(&str, &dyn CellGrid)], log: &mut RunLog) -> AllocationData {
        let mut data = AllocationData::default();
        let mut first = true;

        for (name, grid) in sheets {
            let rows = grid.row_count();
            if rows < self.layout.min_sheet_rows {
                log.debug(
                    STAGE,
                    format!("Skipping sheet '{}' ({} rows)", name, rows),
                );
                continue;
            }

            let product = self.read_sheet(name, *grid, log);
            if first {
                data.metadata = product.metadata.clone();
                first = false;
            }
            log.info(
                STAGE,
                format!(
                    "Sheet '{}': {} SKU columns, {} stores",
                    name,
                    product.sku_columns.len(),
                    product.stores.len()
                ),
            );
            data.products.push(product);
        }

        data
    }

    /// Read one product sheet.
    pub fn read_sheet(&self, name: &str, grid: &dyn CellGrid, log: &mut RunLog) -> ProductSheet {
        let metadata = self.read_metadata(grid);
        let sku_columns = self.read_sku_columns(grid);
        let stores = self.read_stores(name, grid, &sku_columns, log);
        ProductSheet {
            sheet_name: name.to_string(),
            product_code: normalize_product_code(name),
            metadata,
            sku_columns,
            stores,
        }
    }

    fn read_metadata(&self, grid: &dyn CellGrid) -> Metadata {
        let at = |pos: CellPos| grid.get_cell(pos.row, pos.col).as_opt_text();
        Metadata {
            company: at(self.layout.company),
            delivery_date: at(self.layout.delivery_date),
            product_code: at(self.layout.product_code),
            kanri_no: at(self.layout.kanri_no),
            store_date: at(self.layout.store_date),
        }
    }

    /// Scan the color/size header rows left to right. A color value opens a
    /// run; each valid size under the current run is one SKU column.
    fn read_sku_columns(&self, grid: &dyn CellGrid) -> Vec<SkuColumn> {
        let mut columns = Vec::new();
        let mut current_color: Option<String> = None;

        for col in self.layout.col_first_color..grid.col_count() {
            let color = grid.text(self.layout.color_row, col);
            if !color.is_empty() && color != self.layout.color_label {
                current_color = Some(normalize_part(&color));
            }

            let size = grid.text(self.layout.size_row, col);
            if size.is_empty() || self.layout.placeholder_sizes.iter().any(|p| *p == size) {
                continue;
            }

            if let Some(color) = &current_color {
                columns.push(SkuColumn {
                    col,
                    key: ShortKey::new(color.clone(), normalize_part(&size)),
                });
            }
        }

        columns
    }

    /// A summary row carries a marker as the whole No or type cell, or as
    /// the whole name cell of a row without a store code. Store names that
    /// merely contain a marker are real stores.
    fn is_total_row(&self, grid: &dyn CellGrid, row: u32) -> bool {
        let is_marker = |col: u32| {
            let value = grid.text(row, col);
            let value = value.trim();
            self.layout.total_markers.iter().any(|m| value == m.as_str())
        };
        is_marker(self.layout.col_no)
            || is_marker(self.layout.col_type)
            || (grid.get_cell(row, self.layout.col_store_code).is_blank()
                && is_marker(self.layout.col_store_name))
    }

    fn read_stores(
        &self,
        sheet: &str,
        grid: &dyn CellGrid,
        sku_columns: &[SkuColumn],
        log: &mut RunLog,
    ) -> Vec<StoreRow> {
        let layout = self.layout;
        let mut stores = Vec::new();
        let mut fill = FillDown::new();

        for row in layout.data_start_row..grid.row_count() {
            if self.is_total_row(grid, row) {
                fill.reset();
                continue;
            }

            let code = grid.get_cell(row, layout.col_store_code).as_opt_text();
            let name = grid.get_cell(row, layout.col_store_name).as_opt_text();
            let carton = layout
                .col_carton
                .and_then(|col| grid.get_cell(row, col).as_opt_text());

            let ctx = match fill.resolve(code, name, carton) {
                Resolved::Explicit(ctx) | Resolved::Inherited(ctx) => ctx,
                Resolved::Orphan => {
                    if sku_columns
                        .iter()
                        .any(|c| grid.get_cell(row, c.col).as_quantity() > 0)
                    {
                        log.debug(
                            STAGE,
                            format!("'{}' row {}: quantities without a store, dropped", sheet, row + 1),
                        );
                    }
                    continue;
                }
            };
            if ctx.store_name.is_empty() {
                continue;
            }

            let mut quantities: BTreeMap<ShortKey, i64> = BTreeMap::new();
            for column in sku_columns {
                let qty = grid.get_cell(row, column.col).as_quantity();
                *quantities.entry(column.key.clone()).or_insert(0) += qty;
            }
            if !quantities.values().any(|&q| q > 0) {
                continue;
            }

            stores.push(StoreRow {
                no: grid.text(row, layout.col_no),
                store_type: grid.text(row, layout.col_type),
                store_code: ctx.store_code,
                store_name: ctx.store_name,
                rank: grid.get_cell(row, layout.col_rank).as_opt_text(),
                carton: ctx.carton,
                quantities,
            });
        }

        stores
    }
}
