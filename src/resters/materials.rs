//! Core materials documents: structures, compositions and task links.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterError, MATERIAL_ID_PATTERN};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::{chemsys_formula_criteria, Criteria, Document, Fields, SearchRequest, Structure};

static SPEC: ResourceSpec = ResourceSpec {
    suffix: "materials",
    id_field: "material_id",
    id_param: "material_ids",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: true,
    available_fields: &[
        "material_id",
        "formula_pretty",
        "formula_anonymous",
        "chemsys",
        "elements",
        "nelements",
        "nsites",
        "composition",
        "composition_reduced",
        "volume",
        "density",
        "density_atomic",
        "symmetry",
        "structure",
        "initial_structures",
        "task_ids",
        "calc_types",
        "deprecated",
        "origins",
        "last_updated",
    ],
};

/// Tolerances for matching a structure against the database
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FindStructureOptions {
    /// Fractional length tolerance
    pub ltol: f64,
    /// Site tolerance
    pub stol: f64,
    /// Angle tolerance (degrees)
    pub angle_tol: f64,
    /// Return every match instead of the best one
    pub allow_multiple_results: bool,
}

impl Default for FindStructureOptions {
    fn default() -> Self {
        Self {
            ltol: 0.2,
            stol: 0.3,
            angle_tol: 5.0,
            allow_multiple_results: false,
        }
    }
}

/// Client for the `materials` resource
#[derive(Debug, Clone)]
pub struct MaterialsRester {
    client: ResourceClient,
}

impl MaterialsRester {
    /// Search by chemical system or formula and/or by task ids
    pub async fn search_material_docs(
        &self,
        chemsys_formula: Option<&str>,
        task_ids: Option<&[String]>,
        fields: Fields,
    ) -> Result<Vec<Document>, ResterError> {
        let mut criteria = chemsys_formula
            .map(chemsys_formula_criteria)
            .unwrap_or_default();
        if let Some(task_ids) = task_ids {
            criteria = criteria.one_of("task_ids", task_ids);
        }

        self.search(&SearchRequest::new(criteria).projection(fields))
            .await
    }

    /// Final structure of a material
    pub async fn get_structure_by_material_id(
        &self,
        material_id: &str,
    ) -> Result<Structure, ResterError> {
        let doc = self
            .get_by_id(material_id, &Fields::only(["structure"]))
            .await?;
        Ok(doc.field("structure")?)
    }

    /// Initial (pre-relaxation) structures of a material
    pub async fn get_initial_structures_by_material_id(
        &self,
        material_id: &str,
    ) -> Result<Vec<Structure>, ResterError> {
        let doc = self
            .get_by_id(material_id, &Fields::only(["initial_structures"]))
            .await?;
        Ok(doc.field("initial_structures")?)
    }

    /// Material ids whose task list contains `task_id`
    pub async fn material_ids_for_task(&self, task_id: &str) -> Result<Vec<String>, ResterError> {
        let request = SearchRequest::new(Criteria::new().one_of("task_ids", [task_id]))
            .fields(["material_id"]);

        let docs = self.search(&request).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| doc.get_str("material_id").map(str::to_string))
            .collect())
    }

    /// Calculation ids keyed by calculation type
    pub async fn get_calc_types(
        &self,
        material_id: &str,
    ) -> Result<serde_json::Map<String, Value>, ResterError> {
        let doc = self
            .get_by_id(material_id, &Fields::only(["calc_types"]))
            .await?;
        Ok(doc.field("calc_types")?)
    }

    /// Find materials matching a structure. Returns material ids, best match
    /// first.
    pub async fn find_structure(
        &self,
        structure: &Structure,
        options: FindStructureOptions,
    ) -> Result<Vec<String>, ResterError> {
        let body = json!({
            "structure": structure,
            "ltol": options.ltol,
            "stol": options.stol,
            "angle_tol": options.angle_tol,
            "allow_multiple_results": options.allow_multiple_results,
        });

        let data = self.client.post_action("find_structure", body).await?;
        let mut ids: Vec<String> = data
            .iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(id.clone()),
                other => other
                    .get("material_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
            .collect();

        if !options.allow_multiple_results {
            ids.truncate(1);
        }
        Ok(ids)
    }
}

#[async_trait]
impl Rester for MaterialsRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for MaterialsRester {
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
    use crate::utils::TransportRequest;

    fn si_structure() -> Value {
        json!({
            "lattice": {"matrix": [[3.8, 0.0, 0.0], [1.9, 3.3, 0.0], [1.9, 1.1, 3.1]]},
            "sites": [
                {"species": [{"element": "Si", "occu": 1.0}], "abc": [0.0, 0.0, 0.0]},
                {"species": [{"element": "Si", "occu": 1.0}], "abc": [0.25, 0.25, 0.25]}
            ]
        })
    }

    fn rester() -> (MaterialsRester, Arc<MockTransport>) {
        let backend = InMemoryResource::new(
            "materials",
            "material_id",
            "material_ids",
            vec![
                json!({
                    "material_id": "mp-149",
                    "formula_pretty": "Si",
                    "chemsys": "Si",
                    "task_ids": ["mp-149", "mp-1791788"],
                    "structure": si_structure(),
                    "initial_structures": [si_structure(), si_structure()]
                }),
                json!({
                    "material_id": "mp-19770",
                    "formula_pretty": "Fe2O3",
                    "chemsys": "Fe-O",
                    "task_ids": ["mp-19770"]
                }),
            ],
        );
        let transport = Arc::new(MockTransport::serving(vec![backend]));
        (MaterialsRester::from_client(client(&SPEC, transport.clone())), transport)
    }

    #[tokio::test]
    async fn test_structure_by_material_id() {
        let (rester, transport) = rester();

        let structure = rester.get_structure_by_material_id("mp-149").await.unwrap();
        assert_eq!(structure.num_sites(), 2);
        assert_eq!(structure.chemsys(), "Si");
        assert_eq!(transport.requests()[0].query_value("_fields"), Some("structure"));

        let initial = rester
            .get_initial_structures_by_material_id("mp-149")
            .await
            .unwrap();
        assert_eq!(initial.len(), 2);
    }

    #[tokio::test]
    async fn test_search_by_chemsys_sorts_elements() {
        let (rester, _) = rester();

        let docs = rester
            .search_material_docs(Some("O-Fe"), None, Fields::only(["material_id"]))
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_str("material_id"), Some("mp-19770"));
    }

    #[tokio::test]
    async fn test_material_ids_for_task() {
        let (rester, _) = rester();

        let ids = rester.material_ids_for_task("mp-1791788").await.unwrap();
        assert_eq!(ids, vec!["mp-149"]);

        let none = rester.material_ids_for_task("mp-0").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_find_structure_posts_structure() {
        let transport = Arc::new(MockTransport::new(|request: &TransportRequest| {
            let body = request.body.clone().unwrap_or_default();
            assert_eq!(body["ltol"], json!(0.2));
            assert!(body["structure"]["sites"].is_array());
            crate::client::json_response(200, json!({"data": ["mp-149", "mp-165"]}))
        }));
        let rester = MaterialsRester::from_client(client(&SPEC, transport.clone()));
        let structure: Structure = serde_json::from_value(si_structure()).unwrap();

        let best = rester
            .find_structure(&structure, FindStructureOptions::default())
            .await
            .unwrap();
        assert_eq!(best, vec!["mp-149"]);

        let all = rester
            .find_structure(
                &structure,
                FindStructureOptions {
                    allow_multiple_results: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(transport.requests()[0].path, "materials/find_structure/");
    }
}
