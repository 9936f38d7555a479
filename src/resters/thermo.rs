//! Thermodynamic stability documents and their computed entries.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterError, MATERIAL_ID_PATTERN};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::{chemsys_formula_criteria, ComputedEntry, Document, Fields, SearchRequest};

static SPEC: ResourceSpec = ResourceSpec {
    suffix: "thermo",
    id_field: "material_id",
    id_param: "material_ids",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: true,
    available_fields: &[
        "material_id",
        "chemsys",
        "formula_pretty",
        "elements",
        "nelements",
        "energy_per_atom",
        "uncorrected_energy_per_atom",
        "formation_energy_per_atom",
        "energy_above_hull",
        "equilibrium_reaction_energy_per_atom",
        "is_stable",
        "decomposes_to",
        "entries",
        "last_updated",
    ],
};

/// Client for the `thermo` resource
#[derive(Debug, Clone)]
pub struct ThermoRester {
    client: ResourceClient,
}

impl ThermoRester {
    /// Search by chemical system or formula, optionally sorted by energy above
    /// hull (most stable first)
    pub async fn search_thermo_docs(
        &self,
        chemsys_formula: &str,
        fields: Fields,
        sort_by_e_above_hull: bool,
    ) -> Result<Vec<Document>, ResterError> {
        let mut request =
            SearchRequest::new(chemsys_formula_criteria(chemsys_formula)).projection(fields);
        if sort_by_e_above_hull {
            request = request.sort_by("energy_above_hull", true);
        }
        self.search(&request).await
    }

    /// Computed entries for a chemical system or formula
    pub async fn get_entries(
        &self,
        chemsys_formula: &str,
        sort_by_e_above_hull: bool,
    ) -> Result<Vec<ComputedEntry>, ResterError> {
        let docs = self
            .search_thermo_docs(chemsys_formula, Fields::only(["entries"]), sort_by_e_above_hull)
            .await?;

        let mut entries = Vec::new();
        for doc in &docs {
            entries.extend(entries_of(doc)?);
        }
        Ok(entries)
    }

    /// Computed entries of one material
    pub async fn get_entries_by_material_id(
        &self,
        material_id: &str,
    ) -> Result<Vec<ComputedEntry>, ResterError> {
        let doc = self.get_by_id(material_id, &Fields::only(["entries"])).await?;
        entries_of(&doc)
    }
}

/// Entries are stored as a map keyed by functional (e.g. `GGA`, `GGA_U`)
fn entries_of(doc: &Document) -> Result<Vec<ComputedEntry>, ResterError> {
    match doc.get("entries") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => map
            .values()
            .map(|value| ComputedEntry::deserialize(value).map_err(ResterError::from))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|value| ComputedEntry::deserialize(value).map_err(ResterError::from))
            .collect(),
        Some(other) => Err(ResterError::UnexpectedResponse(format!(
            "entries should be a map, got {}",
            other
        ))),
    }
}

#[async_trait]
impl Rester for ThermoRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for ThermoRester {
    fn resource_spec() -> &'static ResourceSpec {
        &SPEC
    }

    fn from_client(client: ResourceClient) -> Self {
        Self { client }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemoryResource, MockTransport};
    use crate::resters::test_support::client;
    use serde_json::json;

    fn entry(id: &str, energy: f64) -> Value {
        json!({"entry_id": id, "composition": {"Fe": 2.0, "O": 3.0}, "energy": energy})
    }

    fn rester() -> (ThermoRester, Arc<MockTransport>) {
        let backend = InMemoryResource::new(
            "thermo",
            "material_id",
            "material_ids",
            vec![
                json!({
                    "material_id": "mp-24972",
                    "chemsys": "Fe-O",
                    "energy_above_hull": 0.12,
                    "entries": {"GGA_U": entry("mp-24972-GGA_U", -60.0)}
                }),
                json!({
                    "material_id": "mp-19770",
                    "chemsys": "Fe-O",
                    "energy_above_hull": 0.0,
                    "entries": {"GGA": entry("mp-19770-GGA", -65.0), "GGA_U": entry("mp-19770-GGA_U", -67.5)}
                }),
            ],
        );
        let transport = Arc::new(MockTransport::serving(vec![backend]));
        (ThermoRester::from_client(client(&SPEC, transport.clone())), transport)
    }

    #[tokio::test]
    async fn test_entries_sorted_by_e_above_hull() {
        let (rester, transport) = rester();

        let entries = rester.get_entries("Fe-O", true).await.unwrap();

        let ids: Vec<&str> = entries.iter().filter_map(|e| e.entry_id.as_deref()).collect();
        assert_eq!(ids, vec!["mp-19770-GGA", "mp-19770-GGA_U", "mp-24972-GGA_U"]);
        assert!(transport
            .requests()
            .iter()
            .all(|r| r.query_value("_sort_fields") == Some("energy_above_hull")));
    }

    #[tokio::test]
    async fn test_entries_by_material_id() {
        let (rester, _) = rester();

        let entries = rester.get_entries_by_material_id("mp-24972").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].energy, -60.0);
    }

    #[test]
    fn test_entries_accepts_list() {
        let doc = Document::from_value("thermo", json!({"entries": [entry("a", -1.0)]}));
        assert_eq!(entries_of(&doc).unwrap().len(), 1);

        let doc = Document::from_value("thermo", json!({"entries": 3}));
        assert!(entries_of(&doc).is_err());
    }
}
