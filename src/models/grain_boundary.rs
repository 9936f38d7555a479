//! Grain boundary and substrate matching records.

use serde::{Deserialize, Serialize};

/// A calculated grain boundary. Energies are in J/m².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrainBoundaryDoc {
    pub material_id: String,

    /// Sigma value of the coincidence site lattice
    pub sigma: u32,

    /// Miller index of the boundary plane
    pub gb_plane: Vec<i32>,

    /// Miller index of the rotation axis
    pub rotation_axis: Vec<i32>,

    /// Rotation angle (degrees)
    #[serde(default)]
    pub rotation_angle: Option<f64>,

    /// Grain boundary energy (J/m²)
    #[serde(default)]
    pub gb_energy: Option<f64>,

    /// Work of separation (J/m²)
    #[serde(default)]
    pub w_sep: Option<f64>,

    /// Tilt or twist
    #[serde(default, rename = "type")]
    pub gb_type: Option<String>,

    #[serde(default)]
    pub pretty_formula: Option<String>,

    #[serde(default)]
    pub chemsys: Option<String>,
}

/// A film/substrate match. The API abbreviates most field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateDoc {
    /// Material id of the film
    pub film_id: String,

    /// Material id of the substrate
    #[serde(rename = "sub_id")]
    pub substrate_id: String,

    #[serde(default, rename = "sub_form")]
    pub substrate_formula: Option<String>,

    #[serde(default, rename = "film_orient")]
    pub film_orientation: Option<String>,

    #[serde(default, rename = "orient")]
    pub substrate_orientation: Option<String>,

    /// Minimum coincident interface area (Å²)
    #[serde(default)]
    pub area: Option<f64>,

    /// Elastic energy (meV)
    #[serde(default)]
    pub energy: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substrate_field_aliases() {
        let doc: SubstrateDoc = serde_json::from_value(json!({
            "film_id": "mp-1046",
            "sub_id": "mp-804",
            "sub_form": "GaN",
            "film_orient": "1 0 0",
            "orient": "1 0 0",
            "energy": 12.5
        }))
        .unwrap();

        assert_eq!(doc.substrate_id, "mp-804");
        assert_eq!(doc.substrate_formula.as_deref(), Some("GaN"));
        assert_eq!(doc.substrate_orientation.as_deref(), Some("1 0 0"));
    }

    #[test]
    fn test_grain_boundary_doc() {
        let doc: GrainBoundaryDoc = serde_json::from_value(json!({
            "material_id": "mp-129",
            "sigma": 5,
            "gb_plane": [1, 0, 0],
            "rotation_axis": [1, 0, 0],
            "gb_energy": 1.9,
            "type": "twist"
        }))
        .unwrap();

        assert_eq!(doc.sigma, 5);
        assert_eq!(doc.gb_type.as_deref(), Some("twist"));
    }
}
