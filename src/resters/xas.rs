//! X-ray absorption spectra.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterError};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::{Criteria, Document, Fields, SearchRequest};

static SPEC: ResourceSpec = ResourceSpec {
    suffix: "xas",
    id_field: "xas_id",
    id_param: "xas_ids",
    id_pattern: r"^(mp|mvc)-\d+-(XANES|EXAFS|XAFS)-[A-Z][a-z]?-(K|L2|L3|L2,3)$",
    unique_ids: true,
    available_fields: &[
        "xas_id",
        "material_id",
        "task_id",
        "edge",
        "absorbing_element",
        "spectrum_type",
        "spectrum",
        "formula_pretty",
        "chemsys",
        "elements",
        "nelements",
        "last_updated",
    ],
};

/// Absorption edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    K,
    L2,
    L3,
    #[serde(rename = "L2,3")]
    L23,
}

impl Edge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edge::K => "K",
            Edge::L2 => "L2",
            Edge::L3 => "L3",
            Edge::L23 => "L2,3",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Edge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "K" => Ok(Edge::K),
            "L2" => Ok(Edge::L2),
            "L3" => Ok(Edge::L3),
            "L2,3" | "L23" => Ok(Edge::L23),
            _ => Err(format!("Unknown absorption edge: {}", s)),
        }
    }
}

/// Spectrum type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum XasType {
    Xanes,
    Exafs,
    Xafs,
}

impl XasType {
    pub fn as_str(&self) -> &'static str {
        match self {
            XasType::Xanes => "XANES",
            XasType::Exafs => "EXAFS",
            XasType::Xafs => "XAFS",
        }
    }
}

impl fmt::Display for XasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XasType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "XANES" => Ok(XasType::Xanes),
            "EXAFS" => Ok(XasType::Exafs),
            "XAFS" => Ok(XasType::Xafs),
            _ => Err(format!("Unknown spectrum type: {}", s)),
        }
    }
}

/// Filter for spectrum searches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XasFilter {
    pub edge: Option<Edge>,
    pub spectrum_type: Option<XasType>,
    pub absorbing_element: Option<String>,
    /// Elements the material must contain
    pub required_elements: Vec<String>,
    pub formula: Option<String>,
}

impl XasFilter {
    pub fn to_criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if let Some(edge) = self.edge {
            criteria = criteria.equals("edge", edge);
        }
        if let Some(spectrum_type) = self.spectrum_type {
            criteria = criteria.equals("spectrum_type", spectrum_type);
        }
        if let Some(element) = &self.absorbing_element {
            criteria = criteria.equals("absorbing_element", element);
        }
        if !self.required_elements.is_empty() {
            criteria = criteria.one_of("elements", &self.required_elements);
        }
        if let Some(formula) = &self.formula {
            criteria = criteria.equals("formula_pretty", formula);
        }
        criteria
    }
}

/// Client for the `xas` resource
#[derive(Debug, Clone)]
pub struct XasRester {
    client: ResourceClient,
}

impl XasRester {
    /// Spectra matching the filter
    pub async fn search_xas_docs(
        &self,
        filter: &XasFilter,
        fields: Fields,
    ) -> Result<Vec<Document>, ResterError> {
        self.search(&SearchRequest::new(filter.to_criteria()).projection(fields))
            .await
    }

    /// Number of spectra matching the filter
    pub async fn count_xas_docs(&self, filter: &XasFilter) -> Result<u64, ResterError> {
        self.count(&filter.to_criteria()).await
    }
}

#[async_trait]
impl Rester for XasRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for XasRester {
    fn resource_spec() -> &'static ResourceSpec {
        &SPEC
    }

    fn from_client(client: ResourceClient) -> Self {
        Self { client }
    }
}
