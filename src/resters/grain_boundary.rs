//! Grain boundary energies and works of separation.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterError, MATERIAL_ID_PATTERN};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::{join_ints, Criteria, GrainBoundaryDoc, SearchRequest};

static SPEC: ResourceSpec = ResourceSpec {
    suffix: "grain_boundary",
    id_field: "material_id",
    id_param: "material_ids",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: false,
    available_fields: &[
        "material_id",
        "sigma",
        "type",
        "chemsys",
        "pretty_formula",
        "gb_plane",
        "rotation_axis",
        "rotation_angle",
        "gb_energy",
        "w_sep",
        "initial_structure",
        "final_structure",
        "task_id",
        "last_updated",
    ],
};

/// Filter for grain boundary searches. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrainBoundaryFilter {
    pub material_ids: Vec<String>,
    /// Formula of the metal, e.g. `Fe`
    pub pretty_formula: Option<String>,
    /// Dash delimited elements
    pub chemsys: Option<String>,
    pub sigma: Option<u32>,
    /// Miller index of the boundary plane
    pub gb_plane: Option<Vec<i32>>,
    /// Miller index of the rotation axis
    pub rotation_axis: Option<Vec<i32>>,
}

impl GrainBoundaryFilter {
    pub fn to_criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if !self.material_ids.is_empty() {
            criteria = criteria.one_of("material_id", &self.material_ids);
        }
        if let Some(formula) = &self.pretty_formula {
            criteria = criteria.equals("pretty_formula", formula);
        }
        if let Some(chemsys) = &self.chemsys {
            criteria = criteria.equals("chemsys", chemsys);
        }
        if let Some(sigma) = self.sigma {
            criteria = criteria.equals("sigma", sigma);
        }
        if let Some(plane) = &self.gb_plane {
            criteria = criteria.equals("gb_plane", join_ints(plane));
        }
        if let Some(axis) = &self.rotation_axis {
            criteria = criteria.equals("rotation_axis", join_ints(axis));
        }
        criteria
    }
}

/// Client for the `grain_boundary` resource
#[derive(Debug, Clone)]
pub struct GrainBoundaryRester {
    client: ResourceClient,
}

impl GrainBoundaryRester {
    /// Grain boundaries matching the filter. Energies are in J/m².
    pub async fn search_grain_boundary_docs(
        &self,
        filter: &GrainBoundaryFilter,
    ) -> Result<Vec<GrainBoundaryDoc>, ResterError> {
        let docs = self.search(&SearchRequest::new(filter.to_criteria())).await?;
        docs.iter()
            .map(|doc| doc.decode::<GrainBoundaryDoc>().map_err(ResterError::from))
            .collect()
    }
}

#[async_trait]
impl Rester for GrainBoundaryRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for GrainBoundaryRester {
    fn resource_spec() -> &'static ResourceSpec {
        &SPEC
    }

    fn from_client(client: ResourceClient) -> Self {
        Self { client }
    }
}
