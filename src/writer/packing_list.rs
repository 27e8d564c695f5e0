//! Packing list (箱設定) workbook: master SKU sheet plus one sheet per pattern

use crate::config::PackingListLayout;
use crate::error::{PackError, PackResult};
use crate::transform::TransformOutput;
use crate::types::PatternGroup;
use crate::writer::style::Styles;
use crate::writer::template::{optional_chrome, SheetChrome};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;
use tracing::{debug, info};

pub struct PackingListWriter<'a> {
    layout: &'a PackingListLayout,
    styles: Styles,
    product_chrome: SheetChrome,
    pattern_chrome: SheetChrome,
}

impl<'a> PackingListWriter<'a> {
    pub fn new(layout: &'a PackingListLayout) -> Self {
        Self {
            styles: Styles::new(&layout.font_name, layout.font_size),
            layout,
            product_chrome: SheetChrome::default(),
            pattern_chrome: SheetChrome::default(),
        }
    }

    /// Replay the static cells of a template's master and pattern sheets.
    pub fn with_template(mut self, template: Option<&Path>) -> PackResult<Self> {
        self.product_chrome = optional_chrome(
            template,
            Some(&self.layout.product_list_sheet),
            self.layout.product_list_data_start,
        )?;
        self.pattern_chrome = optional_chrome(
            template,
            Some(&self.layout.pattern_template_sheet),
            self.layout.data_start_row,
        )?;
        if template.is_some() {
            debug!(
                "Template chrome: {} master cells, {} pattern cells",
                self.product_chrome.len(),
                self.pattern_chrome.len()
            );
        }
        Ok(self)
    }

    pub fn write(&self, output: &TransformOutput, path: &Path) -> PackResult<()> {
        let mut workbook = Workbook::new();
        self.write_product_list(&mut workbook, output)?;
        for group in &output.groups {
            self.write_pattern_sheet(&mut workbook, output, group)?;
        }
        workbook.save(path)?;
        info!(
            "Packing list written to {} ({} pattern sheets)",
            path.display(),
            output.groups.len()
        );
        Ok(())
    }

    fn write_product_list(&self, workbook: &mut Workbook, output: &TransformOutput) -> PackResult<()> {
        let layout = self.layout;
        let styles = &self.styles;
        let sheet = workbook.add_worksheet();
        sheet.set_name(&layout.product_list_sheet)?;
        self.product_chrome.replay(sheet, &styles.plain)?;

        let kanri = layout.product_list_kanri_no;
        sheet.write_string_with_format(
            kanri.row,
            kanri.col as u16,
            output.metadata.kanri_no(),
            &styles.plain,
        )?;

        for (i, header) in layout.product_list_headers.iter().enumerate() {
            sheet.write_string_with_format(
                layout.product_list_header_row,
                layout.product_list_col_no + i as u16,
                header,
                &styles.header,
            )?;
        }

        let mut row = layout.product_list_data_start;
        let mut grand_total = 0i64;
        for (i, sku) in output.skus.iter().enumerate() {
            // Border every column of the row, then fill the known ones
            for col in layout.product_list_col_no..=layout.product_list_last_col {
                sheet.write_blank(row, col, &styles.cell)?;
            }
            sheet.write_number_with_format(row, layout.product_list_col_no, (i + 1) as f64, &styles.number)?;
            sheet.write_string_with_format(row, layout.product_list_col_code, &sku.key.product_code, &styles.cell)?;
            sheet.write_string_with_format(row, layout.product_list_col_color, &sku.key.color, &styles.cell)?;
            sheet.write_string_with_format(row, layout.product_list_col_size, &sku.key.size, &styles.cell)?;
            sheet.write_string_with_format(row, layout.product_list_col_jan, &sku.jan_code, &styles.cell)?;
            if sku.total_qty != 0 {
                sheet.write_number_with_format(
                    row,
                    layout.product_list_col_ship_qty,
                    sku.total_qty as f64,
                    &styles.number,
                )?;
            }
            grand_total += sku.total_qty;
            row += 1;
        }

        for col in layout.product_list_col_no..=layout.product_list_last_col {
            sheet.write_blank(row, col, &styles.total)?;
        }
        sheet.write_string_with_format(row, layout.product_list_col_jan, &layout.total_label, &styles.total)?;
        sheet.write_number_with_format(
            row,
            layout.product_list_col_ship_qty,
            grand_total as f64,
            &styles.total_number,
        )?;
        sheet.set_column_width(layout.product_list_col_jan, 16)?;
        Ok(())
    }

    fn write_pattern_header(
        &self,
        sheet: &mut Worksheet,
        output: &TransformOutput,
        group: &PatternGroup,
    ) -> PackResult<()> {
        let layout = self.layout;
        let styles = &self.styles;
        let value_col = layout.header_value_col;

        let values = [
            output.metadata.kanri_no().to_string(),
            group.name.clone(),
            group.total_qty.to_string(),
            output.metadata.ship_date().to_string(),
        ];
        let axis_rows = [layout.jan_row, layout.product_code_row, layout.color_row, layout.size_row];

        for (i, &row) in axis_rows.iter().enumerate() {
            let label = layout.header_labels.get(i).map(String::as_str).unwrap_or("");
            sheet.merge_range(row, 0, row, layout.header_label_last_col, label, &styles.label)?;
            if i == 2 {
                sheet.write_number_with_format(row, value_col, group.total_qty as f64, &styles.cell)?;
            } else {
                sheet.write_string_with_format(row, value_col, &values[i], &styles.cell)?;
            }
            let axis_label = layout.axis_labels.get(i).map(String::as_str).unwrap_or("");
            sheet.write_string_with_format(row, layout.axis_label_col, axis_label, &styles.cell)?;
        }

        for (i, sku) in output.skus.iter().enumerate() {
            let col = layout.first_sku_col + i as u16;
            sheet.write_string_with_format(layout.jan_row, col, &sku.jan_code, &styles.label)?;
            sheet.write_string_with_format(layout.product_code_row, col, &sku.key.product_code, &styles.header)?;
            sheet.write_string_with_format(layout.color_row, col, &sku.key.color, &styles.header)?;
            sheet.write_string_with_format(layout.size_row, col, &sku.key.size, &styles.header)?;
            sheet.write_blank(layout.data_header_row, col, &styles.header)?;
        }

        for (i, header) in layout.data_headers.iter().enumerate() {
            sheet.write_string_with_format(layout.data_header_row, i as u16, header, &styles.header)?;
        }
        Ok(())
    }

    fn write_pattern_sheet(
        &self,
        workbook: &mut Workbook,
        output: &TransformOutput,
        group: &PatternGroup,
    ) -> PackResult<()> {
        let layout = self.layout;
        let styles = &self.styles;
        let sheet = workbook.add_worksheet();
        sheet.set_name(&group.name)?;
        self.pattern_chrome.replay(sheet, &styles.plain)?;
        self.write_pattern_header(sheet, output, group)?;

        let mut row = layout.data_start_row;
        let mut sku_totals = vec![0i64; output.skus.len()];
        let mut grand_total = 0i64;

        for assigned in &group.stores {
            let store = &assigned.store;
            sheet.write_string_with_format(
                row,
                layout.col_no,
                group.sequence_id(assigned.local_index),
                &styles.cell,
            )?;
            sheet.write_string_with_format(row, layout.col_type, &store.store_type, &styles.cell)?;
            sheet.write_string_with_format(
                row,
                layout.col_rank,
                store.rank.as_deref().unwrap_or(""),
                &styles.cell,
            )?;
            sheet.write_string_with_format(row, layout.col_store_code, &store.store_code, &styles.cell)?;
            sheet.write_string_with_format(row, layout.col_store_name, &store.store_name, &styles.cell)?;
            // Filled in by the factory
            sheet.write_blank(row, layout.col_carton, &styles.cell)?;
            sheet.write_string_with_format(
                row,
                layout.col_sequence,
                format!("{:04}", assigned.box_no),
                &styles.cell,
            )?;
            sheet.write_number_with_format(row, layout.col_total, assigned.total_qty as f64, &styles.number)?;
            grand_total += assigned.total_qty;

            for (i, &qty) in store.pattern_vector.iter().enumerate() {
                let col = layout.first_sku_col + i as u16;
                sku_totals[i] += qty;
                if qty > 0 {
                    sheet.write_number_with_format(row, col, qty as f64, &styles.number)?;
                } else {
                    sheet.write_blank(row, col, &styles.cell)?;
                }
            }
            row += 1;
        }

        let column_sum: i64 = sku_totals.iter().sum();
        if column_sum != grand_total {
            return Err(PackError::Validation(format!(
                "{}: SKU columns sum to {} but store totals sum to {}",
                group.name, column_sum, grand_total
            )));
        }

        for col in 0..layout.first_sku_col {
            sheet.write_blank(row, col, &styles.total)?;
        }
        sheet.write_string_with_format(row, layout.col_no, &layout.total_label, &styles.total)?;
        sheet.write_number_with_format(row, layout.col_total, grand_total as f64, &styles.total_number)?;
        for (i, total) in sku_totals.iter().enumerate() {
            sheet.write_number_with_format(
                row,
                layout.first_sku_col + i as u16,
                *total as f64,
                &styles.total_number,
            )?;
        }

        for col in 0..=layout.header_label_last_col {
            sheet.set_column_width(col, 5)?;
        }
        sheet.set_column_width(layout.header_value_col, 27)?;
        Ok(())
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
        let row = |code: &str, s: i64, m: i64| StoreRow {
            no: String::new(),
            store_type: "1".to_string(),
            store_code: code.to_string(),
            store_name: format!("Store {}", code),
            rank: Some("A".to_string()),
            carton: None,
            quantities: [(ShortKey::new("RED", "S"), s), (ShortKey::new("RED", "M"), m)]
                .into_iter()
                .collect(),
        };
        let data = AllocationData {
            metadata: Metadata {
                kanri_no: Some("ABC2401".to_string()),
                delivery_date: Some("2024/05/01".to_string()),
                ..Default::default()
            },
            products: vec![ProductSheet {
                sheet_name: "100".to_string(),
                product_code: "100".to_string(),
                metadata: Metadata::default(),
                sku_columns: vec![
                    SkuColumn { col: 7, key: ShortKey::new("RED", "S") },
                    SkuColumn { col: 8, key: ShortKey::new("RED", "M") },
                ],
                stores: vec![row("S01", 2, 3), row("S02", 2, 3), row("S03", 1, 0)],
            }],
        };
        let jan: JanMap = [(("100", "RED", "M"), "4900000000002")].into_iter().collect();
        Transformer::new(&data, &jan, &Policy::default()).transform()
    }

    #[test]
    fn test_written_workbook_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packing.xlsx");
        let layout = PackingListLayout::default();
        let out = output();
        PackingListWriter::new(&layout).write(&out, &path).unwrap();

        let mut wb = Input::open(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["商品一覧", "PT-1", "PT-2"]);

        let master = wb.sheet("商品一覧").unwrap();
        assert_eq!(master.text(0, 2), "ABC2401");
        assert_eq!(master.text(2, 1), "100");
        assert_eq!(master.text(2, 3), "M");
        assert_eq!(master.text(2, 4), "4900000000002");
        assert_eq!(master.text(4, 4), "合計");
        assert_eq!(master.text(4, 6), "11");

        let pt = wb.sheet("PT-1").unwrap();
        assert_eq!(pt.text(0, 0), "管理No");
        assert_eq!(pt.text(0, 4), "ABC2401");
        assert_eq!(pt.text(2, 4), "5");
        assert_eq!(pt.text(3, 4), "2024/05/01");
        assert_eq!(pt.text(1, 8), "100");
        assert_eq!(pt.text(4, 5), "CTN_NO");
        assert_eq!(pt.text(5, 0), "1001");
        assert_eq!(pt.text(6, 0), "1002");
        assert_eq!(pt.text(6, 6), "0002");
        assert_eq!(pt.text(5, 5), "");
        assert_eq!(pt.text(7, 0), "合計");
        assert_eq!(pt.text(7, 7), "10");

        let pt2 = wb.sheet("PT-2").unwrap();
        assert_eq!(pt2.text(5, 0), "2001");
        assert_eq!(pt2.text(5, 6), "0003");
        // Zero quantities stay blank
        assert_eq!(pt2.text(5, 8), "");
    }
}
