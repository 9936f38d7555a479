//! Phonon band structures.

use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterError, MATERIAL_ID_PATTERN};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::Fields;

static SPEC: ResourceSpec = ResourceSpec {
    suffix: "phonon",
    id_field: "material_id",
    id_param: "material_ids",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: true,
    available_fields: &["material_id", "ph_bs", "ph_dos", "last_updated"],
};

#[derive(Debug, Clone)]
pub struct PhononRester {
    client: ResourceClient,
}

impl PhononRester {
    /// Serialized phonon dispersion of a material
    pub async fn get_phonon_bandstructure(&self, material_id: &str) -> Result<Value, ResterError> {
        let doc = self.get_by_id(material_id, &Fields::only(["ph_bs"])).await?;

        doc.get("ph_bs")
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or_else(|| ResterError::NotFound {
                resource: self.name().to_string(),
                id: format!("{} (ph_bs)", material_id),
            })
    }
}

#[async_trait]
impl Rester for PhononRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for PhononRester {
    fn resource_spec() -> &'static ResourceSpec {
        &SPEC
    }

    fn from_client(client: ResourceClient) -> Self {
        Self { client }
    }
}
