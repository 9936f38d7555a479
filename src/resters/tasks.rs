//! Individual calculation tasks.

use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterError, MATERIAL_ID_PATTERN};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::{chemsys_formula_criteria, Document, Fields, SearchRequest, TaskType};

static SPEC: ResourceSpec = ResourceSpec {
    suffix: "tasks",
    id_field: "task_id",
    id_param: "task_ids",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: true,
    available_fields: &[
        "task_id",
        "task_type",
        "calc_type",
        "run_type",
        "formula_pretty",
        "chemsys",
        "elements",
        "nelements",
        "structure",
        "orig_inputs",
        "input",
        "output",
        "calcs_reversed",
        "last_updated",
    ],
};

/// Client for the `tasks` resource
#[derive(Debug, Clone)]
pub struct TasksRester {
    client: ResourceClient,
}

impl TasksRester {
    /// Tasks of one type, optionally restricted to a chemical system or formula
    pub async fn search_task_docs(
        &self,
        task_type: TaskType,
        chemsys_formula: Option<&str>,
        fields: Fields,
    ) -> Result<Vec<Document>, ResterError> {
        let criteria = chemsys_formula
            .map(chemsys_formula_criteria)
            .unwrap_or_default()
            .equals("task_type", task_type);

        self.search(&SearchRequest::new(criteria).projection(fields))
            .await
    }

    /// INCAR, POSCAR and KPOINTS of a calculation
    pub async fn get_calculation_inputs(&self, task_id: &str) -> Result<Value, ResterError> {
        let fields = Fields::only([
            "orig_inputs.incar",
            "orig_inputs.poscar",
            "orig_inputs.kpoints",
        ]);
        let doc = self.get_by_id(task_id, &fields).await?;

        doc.get("orig_inputs").cloned().ok_or_else(|| ResterError::NotFound {
            resource: self.name().to_string(),
            id: format!("{} (orig_inputs)", task_id),
        })
    }
}

#[async_trait]
impl Rester for TasksRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for TasksRester {
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

    fn rester() -> (TasksRester, Arc<MockTransport>) {
        let backend = InMemoryResource::new(
            "tasks",
            "task_id",
            "task_ids",
            vec![
                json!({"task_id": "mp-1791788", "task_type": "GGA Static", "formula_pretty": "Si",
                       "orig_inputs": {"incar": {"ENCUT": 520}, "kpoints": {"nkpoints": 64}}}),
                json!({"task_id": "mp-1791790", "task_type": "GGA Structure Optimization", "formula_pretty": "Si"}),
                json!({"task_id": "mp-2034", "task_type": "GGA Static", "formula_pretty": "Fe2O3"}),
            ],
        );
        let transport = Arc::new(MockTransport::serving(vec![backend]));
        (TasksRester::from_client(client(&SPEC, transport.clone())), transport)
    }

    #[tokio::test]
    async fn test_search_by_task_type() {
        let (rester, transport) = rester();

        let docs = rester
            .search_task_docs(TaskType::GgaStatic, Some("Si"), Fields::only(["task_id"]))
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_str("task_id"), Some("mp-1791788"));
        assert_eq!(transport.requests()[0].query_value("task_type"), Some("GGA Static"));
    }

    #[tokio::test]
    async fn test_calculation_inputs() {
        let (rester, transport) = rester();

        let inputs = rester.get_calculation_inputs("mp-1791788").await.unwrap();
        assert_eq!(inputs["incar"]["ENCUT"], json!(520));
        assert_eq!(
            transport.requests()[0].query_value("_fields"),
            Some("orig_inputs.incar,orig_inputs.poscar,orig_inputs.kpoints")
        );

        let missing = rester.get_calculation_inputs("mp-1791790").await;
        assert!(matches!(missing, Err(ResterError::NotFound { .. })));
    }
}
