//! Mapa Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging and error handling for the electoral map workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`MapaError`] and the crate [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by environment variables
//! - **Types**: typed rows of the application tables (municipalities,
//!   candidates, polling locations, zone results)
//!
//! # Example
//!
//! ```no_run
//! use mapa_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> mapa_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("Logging ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{MapaError, Result};
