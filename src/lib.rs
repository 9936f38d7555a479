//! # mp-rester
//!
//! A typed client for the Materials Project REST API.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Documents, query criteria and domain records (structures, entries, surfaces)
//! - [`client`]: Session, per-resource client and the chunked query executor
//! - [`resters`]: One client per API resource, with a registry keyed by name
//! - [`mprester`]: The [`MpRester`] facade with convenience methods
//! - [`symmetry`]: The symmetry analysis boundary used by some facade methods
//! - [`utils`]: HTTP transport, retry with backoff and terminal display
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use mp_rester::config::Config;
//! use mp_rester::MpRester;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rester = MpRester::new(&Config::from_env())?;
//! let ids = rester.get_materials_ids("Fe-O").await?;
//! println!("{} materials", ids.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod models;
pub mod mprester;
pub mod resters;
pub mod symmetry;
pub mod utils;

// Re-export commonly used types
pub use models::{Document, MaterialId, SearchRequest};
pub use mprester::MpRester;
pub use resters::{Rester, ResterError, ResterRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
