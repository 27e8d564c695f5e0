//! Output writers
//!
//! All workbooks are generated fresh with `rust_xlsxwriter`; optional
//! templates only contribute their static cells (see [`template`]).

pub mod assortment;
pub mod delivery_slip;
pub mod labels;
pub mod packing_list;
pub mod store_detail;
pub mod style;
pub mod template;

pub use assortment::AssortmentWriter;
pub use delivery_slip::DeliverySlipWriter;
pub use labels::{LabelRenderer, LabelSheet, LabelStats, XlsxLabelRenderer};
pub use packing_list::PackingListWriter;
pub use store_detail::StoreDetailWriter;
pub use template::resolve_template;

use crate::config::SlipLayout;
use crate::error::PackResult;
use crate::sheet::text::iso_week;
use crate::types::BoxRecord;
use rust_xlsxwriter::Worksheet;
use serde::{Deserialize, Serialize};
use style::Styles;

/// How a carton number turns into a slip number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlipNumbering {
    /// `{prefix}{start + carton - 1:04}`, or `{prefix}{carton:04}` without a start
    Offset { prefix: String, start: Option<u32> },
    /// `{week}W81{carton:04}`; without a week, the ISO week of the box's
    /// store date
    Week {
        #[serde(default)]
        week: Option<String>,
    },
}

impl Default for SlipNumbering {
    fn default() -> Self {
        SlipNumbering::Offset {
            prefix: "81".to_string(),
            start: None,
        }
    }
}

impl SlipNumbering {
    /// Week numbering; a blank week counts as none.
    pub fn week(week: Option<&str>) -> Self {
        SlipNumbering::Week {
            week: week.map(str::trim).filter(|w| !w.is_empty()).map(str::to_string),
        }
    }

    /// Slip number for a box. Offset numbering needs a numeric carton and a
    /// sequence that fits in `u32`; week numbering keeps a non-numeric carton
    /// verbatim.
    pub fn slip_no(&self, record: &BoxRecord) -> Option<String> {
        match self {
            SlipNumbering::Offset { prefix, start } => {
                let carton = record.carton_no()?;
                let seq = match start {
                    Some(start) => start.checked_add(carton.saturating_sub(1))?,
                    None => carton,
                };
                Some(format!("{}{:04}", prefix, seq))
            }
            SlipNumbering::Week { week } => {
                let week = match week {
                    Some(week) => week.clone(),
                    None => iso_week(&record.store_date),
                };
                let carton = match record.carton_no() {
                    Some(n) => format!("{:04}", n),
                    None => record.carton.trim().to_string(),
                };
                if carton.is_empty() {
                    None
                } else {
                    Some(format!("{}W81{}", week, carton))
                }
            }
        }
    }
}

/// One flat slip line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlipRow {
    pub slip_no: String,
    pub brand: String,
    pub store_code: String,
    pub product_code: String,
    pub size: String,
    pub color: String,
    pub qty: i64,
}

/// Write slip rows from `layout.write_start_row` down.
pub(crate) fn write_slip_rows(
    sheet: &mut Worksheet,
    layout: &SlipLayout,
    rows: &[SlipRow],
    styles: &Styles,
) -> PackResult<()> {
    for (i, line) in rows.iter().enumerate() {
        let row = layout.write_start_row + i as u32;
        sheet.write_string_with_format(row, layout.col_slip_no, &line.slip_no, &styles.cell)?;
        sheet.write_string_with_format(row, layout.col_brand, &line.brand, &styles.cell)?;
        sheet.write_string_with_format(row, layout.col_store_code, &line.store_code, &styles.cell)?;
        sheet.write_string_with_format(row, layout.col_product_code, &line.product_code, &styles.cell)?;
        sheet.write_string_with_format(row, layout.col_size, &line.size, &styles.cell)?;
        sheet.write_string_with_format(row, layout.col_color, &line.color, &styles.cell)?;
        sheet.write_number_with_format(row, layout.col_qty, line.qty as f64, &styles.number)?;
    }
    Ok(())
}
