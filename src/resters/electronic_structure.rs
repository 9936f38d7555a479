//! Electronic band structures and densities of states.
//!
//! Both resources are keyed by material id and return the serialized object
//! as an opaque JSON value; interpreting it is left to the caller.

use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use super::{BuiltinRester, Rester, ResterError, MATERIAL_ID_PATTERN};
use crate::client::{ResourceClient, ResourceSpec};
use crate::models::Fields;

static BANDSTRUCTURE_SPEC: ResourceSpec = ResourceSpec {
    suffix: "electronic_structure/bandstructure",
    id_field: "material_id",
    id_param: "material_ids",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: true,
    available_fields: &[
        "material_id",
        "task_id",
        "band_gap",
        "cbm",
        "vbm",
        "efermi",
        "is_gap_direct",
        "is_metal",
        "magnetic_ordering",
        "bandstructure",
        "last_updated",
    ],
};

static DOS_SPEC: ResourceSpec = ResourceSpec {
    suffix: "electronic_structure/dos",
    id_field: "material_id",
    id_param: "material_ids",
    id_pattern: MATERIAL_ID_PATTERN,
    unique_ids: true,
    available_fields: &[
        "material_id",
        "task_id",
        "band_gap",
        "cbm",
        "vbm",
        "efermi",
        "spin_polarization",
        "magnetic_ordering",
        "dos",
        "last_updated",
    ],
};

/// Fetch one opaque object field of a document, treating null as missing
async fn object_field<R: Rester + ?Sized>(
    rester: &R,
    material_id: &str,
    field: &str,
) -> Result<Value, ResterError> {
    let doc = rester.get_by_id(material_id, &Fields::only([field])).await?;

    match doc.get(field) {
        Some(Value::Null) | None => Err(ResterError::NotFound {
            resource: rester.name().to_string(),
            id: format!("{} ({})", material_id, field),
        }),
        Some(value) => Ok(value.clone()),
    }
}

/// Client for `electronic_structure/bandstructure`
#[derive(Debug, Clone)]
pub struct BandStructureRester {
    client: ResourceClient,
}

impl BandStructureRester {
    /// Serialized band structure of a material
    pub async fn get_bandstructure_from_material_id(
        &self,
        material_id: &str,
    ) -> Result<Value, ResterError> {
        object_field(self, material_id, "bandstructure").await
    }
}

#[async_trait]
impl Rester for BandStructureRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for BandStructureRester {
    fn resource_spec() -> &'static ResourceSpec {
        &BANDSTRUCTURE_SPEC
    }

    fn from_client(client: ResourceClient) -> Self {
        Self { client }
    }
}

/// Client for `electronic_structure/dos`
#[derive(Debug, Clone)]
pub struct DosRester {
    client: ResourceClient,
}

impl DosRester {
    /// Serialized density of states of a material
    pub async fn get_dos_from_material_id(&self, material_id: &str) -> Result<Value, ResterError> {
        object_field(self, material_id, "dos").await
    }
}

#[async_trait]
impl Rester for DosRester {
    fn client(&self) -> &ResourceClient {
        &self.client
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl BuiltinRester for DosRester {
    fn resource_spec() -> &'static ResourceSpec {
        &DOS_SPEC
    }

    fn from_client(client: ResourceClient) -> Self {
        Self { client }
    }
}
