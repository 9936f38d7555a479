//! Volumetric charge densities. Lookup only.

use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterCapabilities, ResterError, MATERIAL_ID_PATTERN};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::Fields;

static SPEC: ResourceSpec = ResourceSpec {
    suffix: "charge_density",
    id_field: "task_id",
    id_param: "task_ids",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: true,
    available_fields: &["task_id", "data", "last_updated"],
};

/// Client for the `charge_density` resource
#[derive(Debug, Clone)]
pub struct ChargeDensityRester {
    client: ResourceClient,
}

impl ChargeDensityRester {
    /// Serialized charge density of one calculation
    pub async fn get_charge_density_from_calculation_id(
        &self,
        task_id: &str,
    ) -> Result<Value, ResterError> {
        let doc = self.get_by_id(task_id, &Fields::only(["data"])).await?;

        match doc.get("data") {
            Some(Value::Null) | None => Err(ResterError::NotFound {
                resource: self.name().to_string(),
                id: task_id.to_string(),
            }),
            Some(data) => Ok(data.clone()),
        }
    }
}

#[async_trait]
impl Rester for ChargeDensityRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn capabilities(&self) -> ResterCapabilities {
        ResterCapabilities::GET_BY_ID
    }
}

impl BuiltinRester for ChargeDensityRester {
    fn resource_spec() -> &'static ResourceSpec {
        &SPEC
    }

    fn from_client(client: ResourceClient) -> Self {
        Self { client }
    }
}
