//! Input readers
//!
//! - [`AllocationReader`]: allocation workbook -> product sheets
//! - [`JanTableReader`]: detail table -> [`JanMap`]
//! - [`PackingListReader`]: factory-returned packing list -> boxes

pub mod allocation;
pub mod jan;
pub mod packing_list;

pub use allocation::AllocationReader;
pub use jan::{JanMap, JanTableReader};
pub use packing_list::PackingListReader;
