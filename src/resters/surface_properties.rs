//! Surface energies of elemental crystals.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterError, MATERIAL_ID_PATTERN};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::{Fields, SurfacePropertiesDoc};

static SPEC: ResourceSpec = ResourceSpec {
    suffix: "surface_properties",
    id_field: "material_id",
    id_param: "material_ids",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: true,
    available_fields: &[
        "material_id",
        "pretty_formula",
        "surfaces",
        "weighted_surface_energy",
        "weighted_surface_energy_EV_PER_ANG2",
        "surface_anisotropy",
        "shape_factor",
        "weighted_work_function",
        "has_reconstructed",
        "task_id",
        "last_updated",
    ],
};

/// Client for the `surface_properties` resource
#[derive(Debug, Clone)]
pub struct SurfacePropertiesRester {
    client: ResourceClient,
}

impl SurfacePropertiesRester {
    /// Surface properties of a material with every energy in J/m²
    pub async fn get_surface_properties(
        &self,
        material_id: &str,
    ) -> Result<SurfacePropertiesDoc, ResterError> {
        let doc = self.get_by_id(material_id, &Fields::All).await?;

        let mut properties: SurfacePropertiesDoc = doc.decode()?;
        properties.normalize_units();
        Ok(properties)
    }
}

#[async_trait]
impl Rester for SurfacePropertiesRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for SurfacePropertiesRester {
    fn resource_spec() -> &'static ResourceSpec {
        &SPEC
    }

    fn from_client(client: ResourceClient) -> Self {
        Self { client }
    }
}
