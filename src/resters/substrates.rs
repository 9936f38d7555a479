//! Film/substrate lattice matches.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterError, MATERIAL_ID_PATTERN};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::{Criteria, SearchRequest, SubstrateDoc};

static SPEC: ResourceSpec = ResourceSpec {
    suffix: "substrates",
    id_field: "film_id",
    id_param: "film_id",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: false,
    available_fields: &[
        "film_id",
        "sub_id",
        "sub_form",
        "film_orient",
        "orient",
        "area",
        "energy",
        "norients",
    ],
};

/// Filter for substrate searches. Orientations are Miller indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstratesFilter {
    pub film_id: Option<String>,
    pub substrate_id: Option<String>,
    pub substrate_formula: Option<String>,
    pub film_orientation: Option<Vec<i32>>,
    pub substrate_orientation: Option<Vec<i32>>,
    pub area: Option<(f64, f64)>,
    pub energy: Option<(f64, f64)>,
}

impl SubstratesFilter {
    /// Matches for one film
    pub fn film(film_id: impl Into<String>) -> Self {
        Self {
            film_id: Some(film_id.into()),
            ..Default::default()
        }
    }

    /// Restrict the substrate orientation
    pub fn substrate_orientation(mut self, orientation: &[i32]) -> Self {
        self.substrate_orientation = Some(orientation.to_vec());
        self
    }

    /// Encode using the API's abbreviated field names. Orientations are
    /// space separated, as stored in the documents.
    pub fn to_criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if let Some(id) = &self.film_id {
            criteria = criteria.equals("film_id", id);
        }
        if let Some(id) = &self.substrate_id {
            criteria = criteria.equals("sub_id", id);
        }
        if let Some(formula) = &self.substrate_formula {
            criteria = criteria.equals("sub_form", formula);
        }
        if let Some(orientation) = &self.film_orientation {
            criteria = criteria.equals("film_orient", orientation_string(orientation));
        }
        if let Some(orientation) = &self.substrate_orientation {
            criteria = criteria.equals("orient", orientation_string(orientation));
        }
        if let Some((min, max)) = self.area {
            criteria = criteria.range("area", Some(min), Some(max));
        }
        if let Some((min, max)) = self.energy {
            criteria = criteria.range("energy", Some(min), Some(max));
        }
        criteria
    }
}

fn orientation_string(orientation: &[i32]) -> String {
    orientation
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Client for the `substrates` resource
#[derive(Debug, Clone)]
pub struct SubstratesRester {
    client: ResourceClient,
}

impl SubstratesRester {
    /// Substrate matches in order of increasing elastic energy
    pub async fn search_substrates_docs(
        &self,
        filter: &SubstratesFilter,
    ) -> Result<Vec<SubstrateDoc>, ResterError> {
        let request = SearchRequest::new(filter.to_criteria()).sort_by("energy", true);
        let docs = self.search(&request).await?;

        docs.iter()
            .map(|doc| doc.decode::<SubstrateDoc>().map_err(ResterError::from))
            .collect()
    }
}

#[async_trait]
impl Rester for SubstratesRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for SubstratesRester {
    fn resource_spec() -> &'static ResourceSpec {
        &SPEC
    }

    fn from_client(client: ResourceClient) -> Self {
        Self { client }
    }
}
