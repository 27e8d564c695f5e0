//! Fixture workbooks for the integration tests
#![allow(dead_code)]

use autopack::sheet::{Cell, CellGrid, Workbook as Input};
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// One store row of an allocation sheet. An empty code means "same store as
/// above".
pub struct StoreLine {
    pub no: String,
    pub store_type: String,
    pub code: String,
    pub name: String,
    pub qty: Vec<f64>,
}

pub fn line(no: &str, store_type: &str, code: &str, name: &str, qty: &[f64]) -> StoreLine {
    StoreLine {
        no: no.to_string(),
        store_type: store_type.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        qty: qty.to_vec(),
    }
}

/// One product sheet: its name, the (color, size) columns in order and the
/// store rows.
pub struct ProductFixture {
    pub sheet: String,
    pub columns: Vec<(String, String)>,
    pub rows: Vec<StoreLine>,
}

pub fn product(sheet: &str, columns: &[(&str, &str)], rows: Vec<StoreLine>) -> ProductFixture {
    ProductFixture {
        sheet: sheet.to_string(),
        columns: columns
            .iter()
            .map(|(c, s)| (c.to_string(), s.to_string()))
            .collect(),
        rows,
    }
}

/// Write an allocation table with the default layout: metadata in rows 3
/// and 5, colors in row 7, sizes in row 8, stores from row 9, a 合計 row
/// at the end.
pub fn write_allocation(path: &Path, kanri_no: &str, store_date: &str, products: &[ProductFixture]) {
    let mut workbook = Workbook::new();
    for product in products {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&product.sheet).unwrap();
        sheet.write_string(3, 7, "Test Apparel Co.").unwrap();
        sheet.write_string(3, 15, "2024/04/28").unwrap();
        sheet.write_string(3, 34, kanri_no).unwrap();
        sheet.write_string(5, 34, store_date).unwrap();

        sheet.write_string(7, 6, "カラー").unwrap();
        sheet.write_string(8, 6, "サイズ").unwrap();
        let mut last_color = String::new();
        for (i, (color, size)) in product.columns.iter().enumerate() {
            let col = 7 + i as u16;
            if *color != last_color {
                sheet.write_string(7, col, color).unwrap();
                last_color = color.clone();
            }
            sheet.write_string(8, col, size).unwrap();
        }
        let total_col = 7 + product.columns.len() as u16;
        sheet.write_string(8, total_col, "合計").unwrap();

        for (r, store) in product.rows.iter().enumerate() {
            let row = 9 + r as u32;
            sheet.write_string(row, 0, &store.no).unwrap();
            sheet.write_string(row, 1, &store.store_type).unwrap();
            if !store.code.is_empty() {
                sheet.write_string(row, 2, &store.code).unwrap();
                sheet.write_string(row, 5, &store.name).unwrap();
            }
            sheet.write_string(row, 3, "A").unwrap();
            for (i, qty) in store.qty.iter().enumerate() {
                sheet.write_number(row, 7 + i as u16, *qty).unwrap();
            }
            sheet.write_number(row, total_col, store.qty.iter().sum::<f64>()).unwrap();
        }
        let total_row = 9 + product.rows.len() as u32;
        sheet.write_string(total_row, 0, "合計").unwrap();
    }
    workbook.save(path).unwrap();
}

pub fn write_jan_csv(path: &Path, rows: &[(&str, &str, &str, &str)]) {
    let mut content = String::from("品番,カラー,サイズ,JAN\n");
    for (product, color, size, jan) in rows {
        content.push_str(&format!("{},{},{},{}\n", product, color, size, jan));
    }
    std::fs::write(path, content).unwrap();
}

/// Copy a generated packing list, filling each store's CTN_NO with its box
/// number the way the factory does.
pub fn fill_cartons(packing_list: &Path, returned: &Path) {
    let mut input = Input::open(packing_list).unwrap();
    let mut output = Workbook::new();
    for name in input.sheet_names() {
        let grid = input.sheet(&name).unwrap();
        let sheet = output.add_worksheet();
        sheet.set_name(&name).unwrap();
        let (rows, cols) = grid.dimensions();
        for row in 0..rows {
            for col in 0..cols {
                match grid.get_cell(row, col) {
                    Cell::Empty => {}
                    Cell::Number(n) => {
                        sheet.write_number(row, col as u16, n).unwrap();
                    }
                    other => {
                        sheet.write_string(row, col as u16, other.as_text()).unwrap();
                    }
                }
            }
            let is_store_row = name.starts_with("PT-")
                && row >= 5
                && !grid.text(row, 6).is_empty()
                && grid.text(row, 0) != "合計";
            if is_store_row {
                sheet.write_string(row, 5, grid.text(row, 6)).unwrap();
            }
        }
    }
    output.save(returned).unwrap();
}
