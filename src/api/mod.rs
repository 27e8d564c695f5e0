//! AutoPack API server module
//!
//! HTTP REST boundary over the conversion pipeline.
//! Run with `autopack-server`.

pub mod handlers;
pub mod server;

pub use server::{run_api_server, ApiConfig};
