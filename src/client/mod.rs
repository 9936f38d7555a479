//! Generic REST client machinery shared by every resource.
//!
//! - [`Session`]: the shared transport and credentials
//! - [`ResourceSpec`]: static description of one resource (suffix, id field, fields)
//! - [`ResourceClient`]: `search` / `get_by_id` / `count` against one resource
//! - [`partition`]: splits an identifier list into [`Chunk`]s for the chunked executor
//! - [`MockTransport`] and [`InMemoryResource`]: scripted backends for tests

mod chunked;
pub mod mock;
mod resource;
mod session;

pub use chunked::{partition, Chunk};
pub use mock::{json_response, InMemoryResource, MockTransport};
pub use resource::ResourceClient;
pub use session::Session;

pub(crate) use session::check_status;

use crate::utils::RetryConfig;

/// Static description of a resource endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Endpoint suffix, e.g. `materials` or `electronic_structure/dos`
    pub suffix: &'static str,

    /// Field holding the document identifier
    pub id_field: &'static str,

    /// Query parameter used to restrict a search to a list of identifiers
    pub id_param: &'static str,

    /// Pattern every identifier must match
    pub id_pattern: &'static str,

    /// Whether `id_field` is unique per document. Chunking is only possible
    /// when it is.
    pub unique_ids: bool,

    /// Fields that may be filtered on or projected
    pub available_fields: &'static [&'static str],
}

impl ResourceSpec {
    /// Stable resource name: the suffix with `/` replaced by `_`
    pub fn name(&self) -> String {
        self.suffix.replace('/', "_")
    }

    /// Path of the search endpoint
    pub fn search_path(&self) -> String {
        format!("{}/", self.suffix)
    }

    /// Path of a single document
    pub fn document_path(&self, id: &str) -> String {
        format!("{}/{}/", self.suffix, urlencoding::encode(id))
    }
}

/// Tuning for searches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuerySettings {
    /// Default identifiers per chunk (0 disables chunking)
    pub chunk_size: usize,

    /// Total attempts per chunk before giving up
    pub max_tries_per_chunk: u32,

    /// Page size used when collecting the identifier list
    pub id_page_size: usize,

    /// Backoff between attempts
    pub retry: RetryConfig,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            max_tries_per_chunk: 3,
            id_page_size: 10_000,
            retry: RetryConfig::default(),
        }
    }
}

impl QuerySettings {
    /// Retry policy for one chunk
    pub fn chunk_retry(&self) -> RetryConfig {
        self.retry.max_attempts(self.max_tries_per_chunk)
    }
}
