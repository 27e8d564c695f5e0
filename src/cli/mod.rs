//! CLI command handlers

pub mod commands;

pub use commands::{assortment, convert, delivery_slip, labels, layout, ConvertOptions, DocumentOptions};
