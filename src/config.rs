//! Layout coordinates and run policies
//!
//! Every cell coordinate the readers and writers touch lives here. The
//! defaults match the legacy allocation table and packing templates; a YAML
//! file can override any subset of them (`autopack layout` prints the full
//! default document).
//!
//! All row/column indexes are 0-based.

use crate::error::PackResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Full layout configuration for one conversion run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub allocation: AllocationLayout,
    pub jan_table: JanTableLayout,
    pub packing_list: PackingListLayout,
    pub delivery_slip: SlipLayout,
    pub store_detail: StoreDetailLayout,
    pub assortment: AssortmentLayout,
    pub labels: LabelLayout,
    pub policy: Policy,
}

impl Layout {
    /// Load a layout from a YAML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> PackResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> PackResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> PackResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// A fixed (row, col) cell position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPos {
    pub row: u32,
    pub col: u32,
}

impl CellPos {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Allocation table (配分表) structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationLayout {
    /// Sheets with fewer rows than this are decorative and skipped
    pub min_sheet_rows: u32,
    pub color_row: u32,
    pub size_row: u32,
    pub data_start_row: u32,

    pub col_no: u32,
    pub col_type: u32,
    pub col_store_code: u32,
    pub col_rank: u32,
    pub col_store_name: u32,
    pub col_first_color: u32,
    /// Carton column, when the sheet carries one (carried by fill-down)
    pub col_carton: Option<u32>,

    pub company: CellPos,
    pub delivery_date: CellPos,
    pub product_code: CellPos,
    pub kanri_no: CellPos,
    pub store_date: CellPos,

    /// Header text that labels the color row instead of naming a color
    pub color_label: String,
    /// Size-row values that mark non-SKU columns
    pub placeholder_sizes: Vec<String>,
    /// Markers that identify summary rows
    pub total_markers: Vec<String>,
}

impl Default for AllocationLayout {
    fn default() -> Self {
        Self {
            min_sheet_rows: 9,
            color_row: 7,
            size_row: 8,
            data_start_row: 9,
            col_no: 0,
            col_type: 1,
            col_store_code: 2,
            col_rank: 3,
            col_store_name: 5,
            col_first_color: 6,
            col_carton: None,
            company: CellPos::new(3, 7),
            delivery_date: CellPos::new(3, 15),
            product_code: CellPos::new(5, 18),
            kanri_no: CellPos::new(3, 34),
            store_date: CellPos::new(5, 34),
            color_label: "カラー".to_string(),
            placeholder_sizes: ["サイズ", "合計", "合计", "小計", "Total"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            total_markers: default_total_markers(),
        }
    }
}

fn default_total_markers() -> Vec<String> {
    ["合計", "合计", "Total"].iter().map(|s| s.to_string()).collect()
}

/// JAN detail table (明細表) header names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JanTableLayout {
    pub product_code_header: String,
    pub color_header: String,
    pub size_header: String,
    pub jan_header: String,
}

impl Default for JanTableLayout {
    fn default() -> Self {
        Self {
            product_code_header: "品番".to_string(),
            color_header: "カラー".to_string(),
            size_header: "サイズ".to_string(),
            jan_header: "JAN".to_string(),
        }
    }
}

/// Packing list (箱設定) workbook structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingListLayout {
    pub product_list_sheet: String,
    pub pattern_template_sheet: String,
    pub font_name: String,
    pub font_size: f64,

    // 商品一覧
    pub product_list_kanri_no: CellPos,
    pub product_list_header_row: u32,
    pub product_list_data_start: u32,
    pub product_list_col_no: u16,
    pub product_list_col_code: u16,
    pub product_list_col_color: u16,
    pub product_list_col_size: u16,
    pub product_list_col_jan: u16,
    pub product_list_col_ship_qty: u16,
    pub product_list_last_col: u16,
    pub product_list_headers: Vec<String>,

    // PT-n
    pub header_label_last_col: u16,
    pub header_value_col: u16,
    pub axis_label_col: u16,
    pub jan_row: u32,
    pub product_code_row: u32,
    pub color_row: u32,
    pub size_row: u32,
    pub data_header_row: u32,
    pub data_start_row: u32,
    pub col_no: u16,
    pub col_type: u16,
    pub col_rank: u16,
    pub col_store_code: u16,
    pub col_store_name: u16,
    pub col_carton: u16,
    pub col_sequence: u16,
    pub col_total: u16,
    pub first_sku_col: u16,
    pub data_headers: Vec<String>,
    pub header_labels: Vec<String>,
    pub axis_labels: Vec<String>,
    pub total_label: String,
    pub total_markers: Vec<String>,
}

impl Default for PackingListLayout {
    fn default() -> Self {
        Self {
            product_list_sheet: "商品一覧".to_string(),
            pattern_template_sheet: "PT-1".to_string(),
            font_name: "ＭＳ Ｐゴシック".to_string(),
            font_size: 9.0,
            product_list_kanri_no: CellPos::new(0, 2),
            product_list_header_row: 1,
            product_list_data_start: 2,
            product_list_col_no: 0,
            product_list_col_code: 1,
            product_list_col_color: 2,
            product_list_col_size: 3,
            product_list_col_jan: 4,
            product_list_col_ship_qty: 6,
            product_list_last_col: 8,
            product_list_headers: [
                "No", "商品コード", "カラー", "サイズ", "JAN", "発注数", "出荷数", "減産数", "増産数",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            header_label_last_col: 3,
            header_value_col: 4,
            axis_label_col: 5,
            jan_row: 0,
            product_code_row: 1,
            color_row: 2,
            size_row: 3,
            data_header_row: 4,
            data_start_row: 5,
            col_no: 0,
            col_type: 1,
            col_rank: 2,
            col_store_code: 3,
            col_store_name: 4,
            col_carton: 5,
            col_sequence: 6,
            col_total: 7,
            first_sku_col: 8,
            data_headers: [
                "No.", "タイプ", "ランク", "コード", "店舗名", "CTN_NO", "パターン", "合計",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            header_labels: ["管理No", "パターン", "枚数", "納期"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            axis_labels: ["Jan", "品番", "カラー", "サイズ"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            total_label: "合計".to_string(),
            total_markers: default_total_markers(),
        }
    }
}

/// Delivery slip (受渡伝票) structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlipLayout {
    pub write_start_row: u32,
    pub col_slip_no: u16,
    pub col_brand: u16,
    pub col_store_code: u16,
    pub col_product_code: u16,
    pub col_size: u16,
    pub col_color: u16,
    pub col_qty: u16,
    pub slip_prefix: String,
}

impl Default for SlipLayout {
    fn default() -> Self {
        Self {
            write_start_row: 7,
            col_slip_no: 1,
            col_brand: 2,
            col_store_code: 3,
            col_product_code: 4,
            col_size: 5,
            col_color: 6,
            col_qty: 7,
            slip_prefix: "81".to_string(),
        }
    }
}

/// Per-store detail (各店舗明細) structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreDetailLayout {
    pub rows: SlipLayout,
    pub total_qty: CellPos,
    pub kanri_no: CellPos,
    pub store_name: CellPos,
    pub sheet_title_max_chars: usize,
}

impl Default for StoreDetailLayout {
    fn default() -> Self {
        Self {
            rows: SlipLayout::default(),
            total_qty: CellPos::new(3, 2),
            kanri_no: CellPos::new(4, 2),
            store_name: CellPos::new(4, 6),
            sheet_title_max_chars: 30,
        }
    }
}

/// Assortment detail (アソート明細) structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssortmentLayout {
    pub write_start_row: u32,
    pub col_delivery_code: u16,
    pub col_delivery_name: u16,
    pub col_slip_no: u16,
    pub col_jan: u16,
    pub col_manufacturer_code: u16,
    pub col_qty: u16,
    pub total_label: String,
}

impl Default for AssortmentLayout {
    fn default() -> Self {
        Self {
            write_start_row: 2,
            col_delivery_code: 1,
            col_delivery_name: 2,
            col_slip_no: 3,
            col_jan: 4,
            col_manufacturer_code: 5,
            col_qty: 6,
            total_label: "合計".to_string(),
        }
    }
}

/// Box label page geometry, in millimetres. Pages always hold a 2×2 grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelLayout {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub label_width_mm: f64,
    pub label_height_mm: f64,
    pub gap_mm: f64,
    pub max_item_rows: usize,
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            label_width_mm: 100.0,
            label_height_mm: 120.0,
            gap_mm: 4.0,
            max_item_rows: 14,
        }
    }
}

/// What to do when one store code shows up with different タイプ values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeConflictPolicy {
    /// Keep the first-seen type silently
    Ignore,
    /// Keep the first-seen type and record a warning
    #[default]
    Warn,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub type_conflict: TypeConflictPolicy,
}
