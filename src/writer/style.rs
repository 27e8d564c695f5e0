//! Cell formats shared by the workbook writers

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder};

const HEADER_GRAY: u32 = 0xD3D3D3;

/// The handful of formats every generated sheet uses
#[derive(Debug, Clone)]
pub struct Styles {
    pub cell: Format,
    pub number: Format,
    pub header: Format,
    pub total: Format,
    pub total_number: Format,
    pub label: Format,
    pub plain: Format,
}

impl Styles {
    pub fn new(font_name: &str, font_size: f64) -> Self {
        let base = Format::new().set_font_name(font_name).set_font_size(font_size);
        let cell = base.clone().set_border(FormatBorder::Thin);
        let header = cell
            .clone()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_background_color(Color::RGB(HEADER_GRAY));
        let total = header.clone().set_align(FormatAlign::Left);

        Self {
            number: cell.clone().set_align(FormatAlign::Right),
            total_number: total.clone().set_align(FormatAlign::Right),
            label: header.clone().set_text_wrap(),
            header,
            total,
            cell,
            plain: base,
        }
    }
}

impl Default for Styles {
    fn default() -> Self {
        Self::new("ＭＳ Ｐゴシック", 9.0)
    }
}
