//! AutoPack - allocation table to packing list converter
//!
//! Reads a multi-sheet allocation table (配分表), groups stores that need
//! exactly the same SKU quantities into pack patterns, numbers every box and
//! renders the packing list (箱設定). A packing list returned with carton
//! numbers filled in drives the delivery slip, assortment detail and box
//! labels.
//!
//! # Example
//!
//! ```no_run
//! use autopack::pipeline::{run_conversion, ConversionJob};
//!
//! let mut job = ConversionJob::new("配分表(12345).xlsx");
//! job.jan_table = Some("jan.csv".into());
//!
//! let report = run_conversion(&job)?;
//! println!("Patterns: {}", report.stats.pattern_count);
//! for warning in report.log.warnings() {
//!     println!("warning: {}", warning);
//! }
//! # Ok::<(), autopack::error::PackError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod fill_down;
pub mod pipeline;
pub mod reader;
pub mod sheet;
pub mod transform;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use config::Layout;
pub use error::{PackError, PackResult};
pub use transform::{TransformOutput, Transformer};
pub use types::{BoxRecord, PatternGroup, RunLog, Sku, SkuKey};
