//! Resource-specific clients ("resters") built on [`ResourceClient`].
//!
//! Every resource implements the [`Rester`] trait. The trait supplies `search`,
//! `get_by_id` and `count` on top of the resource's [`ResourceClient`], so a
//! rester only adds its typed helpers. Resters are created once per facade by
//! the [`ResterRegistry`] and share the facade's session.
//!
//! # Adding a resource
//!
//! 1. Declare a `static` [`ResourceSpec`] with the suffix, id field and fields
//! 2. Create a struct wrapping a [`ResourceClient`] and implement [`Rester`]
//!    and [`BuiltinRester`] for it
//! 3. Add it to the constructor table in `registry.rs`

mod charge_density;
mod electronic_structure;
mod grain_boundary;
mod materials;
mod phonon;
mod registry;
mod substrates;
mod surface_properties;
mod tasks;
mod thermo;
mod xas;

pub use charge_density::ChargeDensityRester;
pub use electronic_structure::{BandStructureRester, DosRester};
pub use grain_boundary::{GrainBoundaryFilter, GrainBoundaryRester};
pub use materials::{FindStructureOptions, MaterialsRester};
pub use phonon::PhononRester;
pub use registry::{BuiltinRester, ResterCapabilities, ResterRegistry};
pub use substrates::{SubstratesFilter, SubstratesRester};
pub use surface_properties::SurfacePropertiesRester;
pub use tasks::TasksRester;
pub use thermo::ThermoRester;
pub use xas::{Edge, XasFilter, XasRester, XasType};

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use crate::client::{ResourceClient, ResourceSpec};
use crate::models::{
    Criteria, Document, DocumentError, EnvelopeError, Fields, IdParseError, SearchRequest,
};
use crate::utils::TransportError;

/// Identifier pattern shared by material- and task-keyed resources
pub(crate) const MATERIAL_ID_PATTERN: &str = r"^(mp|mvc)-\d+$";

/// The Rester trait defines the query surface of one resource.
///
/// Implementors only provide [`Rester::client`] and [`Rester::into_any`];
/// everything else has defaults driven by the resource's [`ResourceSpec`].
#[async_trait]
pub trait Rester: Send + Sync + std::fmt::Debug {
    /// The client for this resource
    fn client(&self) -> &ResourceClient;

    /// Upcast for typed access through the registry
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Stable name (suffix with `/` replaced by `_`)
    fn name(&self) -> &str {
        self.client().name()
    }

    /// Endpoint suffix
    fn suffix(&self) -> &'static str {
        self.client().spec().suffix
    }

    /// Static description of the resource
    fn spec(&self) -> &'static ResourceSpec {
        self.client().spec()
    }

    /// Fields that may be filtered on or projected
    fn available_fields(&self) -> &'static [&'static str] {
        self.client().available_fields()
    }

    /// Describe the capabilities of this resource
    fn capabilities(&self) -> ResterCapabilities {
        ResterCapabilities::SEARCH | ResterCapabilities::GET_BY_ID | ResterCapabilities::COUNT
    }

    /// Whether this resource supports search
    fn supports_search(&self) -> bool {
        self.capabilities().contains(ResterCapabilities::SEARCH)
    }

    /// Whether documents can be fetched by identifier
    fn supports_get_by_id(&self) -> bool {
        self.capabilities().contains(ResterCapabilities::GET_BY_ID)
    }

    /// Search for documents matching the request
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ResterError> {
        if !self.supports_search() {
            return Err(ResterError::NotImplemented(format!("search on {}", self.name())));
        }
        self.client().search(request).await
    }

    /// Get a single document by identifier
    async fn get_by_id(&self, id: &str, fields: &Fields) -> Result<Document, ResterError> {
        if !self.supports_get_by_id() {
            return Err(ResterError::NotImplemented(format!("get_by_id on {}", self.name())));
        }
        self.client().get_by_id(id, fields).await
    }

    /// Count documents matching the criteria
    async fn count(&self, criteria: &Criteria) -> Result<u64, ResterError> {
        if !self.capabilities().contains(ResterCapabilities::COUNT) {
            return Err(ResterError::NotImplemented(format!("count on {}", self.name())));
        }
        self.client().count(criteria).await
    }
}

/// Errors that can occur when talking to a resource
#[derive(Debug, thiserror::Error)]
pub enum ResterError {
    /// The request was rejected locally or by the server; never retried
    #[error("Invalid request to {resource}: {message}")]
    Validation { resource: String, message: String },

    /// No document matched
    #[error("No {resource} document found for {id}")]
    NotFound { resource: String, id: String },

    /// Missing or rejected credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A failure that may succeed on retry (5xx, 429, timeout, connection reset)
    #[error("Transient server error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    TransientServer {
        status: Option<u16>,
        timeout: bool,
        message: String,
    },

    /// A chunk kept failing transiently; partial results are discarded
    #[error("Chunk {index} of {resource} failed after {attempts} attempts ({} ids, starting at {})", .ids.len(), .ids.first().map(String::as_str).unwrap_or("-"))]
    ChunkRetrieval {
        resource: String,
        index: usize,
        ids: Vec<String>,
        attempts: u32,
        #[source]
        source: Box<ResterError>,
    },

    /// A non-transient server failure
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Network failure that is not worth retrying
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response was well-formed but not what the operation expected
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The requested operation is not implemented
    #[error("Operation not implemented: {0}")]
    NotImplemented(String),

    /// Symmetry analysis failed or is unavailable
    #[error("Symmetry analysis error: {0}")]
    Symmetry(String),

    /// The session was already closed
    #[error("Session is closed")]
    Closed,

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResterError {
    /// Whether retrying could help
    pub fn is_transient(&self) -> bool {
        matches!(self, ResterError::TransientServer { .. })
    }
}

impl From<TransportError> for ResterError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(message) => ResterError::TransientServer {
                status: None,
                timeout: true,
                message,
            },
            TransportError::Connect(message) | TransportError::ConnectionLost(message) => {
                ResterError::TransientServer {
                    status: None,
                    timeout: false,
                    message,
                }
            }
            TransportError::Other(message) => ResterError::Transport(message),
        }
    }
}

impl From<reqwest::Error> for ResterError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::from(err).into()
    }
}

impl From<serde_json::Error> for ResterError {
    fn from(err: serde_json::Error) -> Self {
        ResterError::Parse(format!("JSON: {}", err))
    }
}

impl From<DocumentError> for ResterError {
    fn from(err: DocumentError) -> Self {
        ResterError::Parse(err.to_string())
    }
}

impl From<IdParseError> for ResterError {
    fn from(err: IdParseError) -> Self {
        ResterError::Parse(err.to_string())
    }
}

impl From<EnvelopeError> for ResterError {
    fn from(err: EnvelopeError) -> Self {
        ResterError::UnexpectedResponse(err.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rester_capabilities() {
        let caps = ResterCapabilities::SEARCH | ResterCapabilities::COUNT;

        assert!(caps.contains(ResterCapabilities::SEARCH));
        assert!(!caps.contains(ResterCapabilities::GET_BY_ID));
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: ResterError = TransportError::Timeout("slow".to_string()).into();
        assert!(err.is_transient());

        let err: ResterError = TransportError::ConnectionLost("reset by peer".to_string()).into();
        assert!(matches!(err, ResterError::TransientServer { timeout: false, .. }));

        let err: ResterError = TransportError::Other("bad url".to_string()).into();
        assert!(!err.is_transient());
        assert!(matches!(err, ResterError::Transport(_)));
    }

    #[test]
    fn test_chunk_error_message_names_ids() {
        let err = ResterError::ChunkRetrieval {
            resource: "materials".to_string(),
            index: 2,
            ids: vec!["mp-2001".to_string(), "mp-2002".to_string()],
            attempts: 3,
            source: Box::new(ResterError::TransientServer {
                status: Some(502),
                timeout: false,
                message: "Bad Gateway".to_string(),
            }),
        };

        let message = err.to_string();
        assert!(message.contains("Chunk 2 of materials"));
        assert!(message.contains("mp-2001"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
