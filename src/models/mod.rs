//! Core data models: documents, queries and the domain records built from them.

mod document;
mod entry;
mod grain_boundary;
mod ids;
mod query;
mod structure;
mod surface;
mod task_type;

pub use document::{ApiError, Document, DocumentError, EnvelopeError, Meta, ResponseEnvelope};
pub use entry::ComputedEntry;
pub use grain_boundary::{GrainBoundaryDoc, SubstrateDoc};
pub use ids::{IdParseError, MaterialId};
pub use query::{
    chemsys_formula_criteria, join_ints, Constraint, Criteria, Fields, SearchRequest, SortSpec,
    ALL_FIELDS_PARAM, FIELDS_PARAM, LIMIT_PARAM, SKIP_PARAM, SORT_PARAM,
};
pub use structure::{Lattice, Site, SpeciesOccupancy, Structure};
pub use surface::{Surface, SurfacePropertiesDoc, WulffInput, EV_PER_ANG2_TO_J_PER_M2};
pub use task_type::TaskType;
