//! Surface energy documents and Wulff construction input.

use serde::{Deserialize, Serialize};

use super::Lattice;

/// 1 eV/Å² expressed in J/m²
pub const EV_PER_ANG2_TO_J_PER_M2: f64 = 16.021_766_34;

/// One calculated surface of a material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub miller_index: Vec<i32>,

    /// Surface energy (J/m²)
    #[serde(default)]
    pub surface_energy: Option<f64>,

    /// Surface energy (eV/Å²)
    #[serde(default, rename = "surface_energy_EV_PER_ANG2")]
    pub surface_energy_ev_per_ang2: Option<f64>,

    #[serde(default)]
    pub is_reconstructed: bool,

    #[serde(default)]
    pub area_fraction: Option<f64>,

    #[serde(default)]
    pub work_function: Option<f64>,

    /// Serialized slab structure, kept opaque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<serde_json::Value>,
}

impl Surface {
    /// Fill in the SI surface energy from the eV/Å² value when only the latter
    /// was returned.
    pub fn normalize_units(&mut self) {
        if self.surface_energy.is_none() {
            self.surface_energy = self
                .surface_energy_ev_per_ang2
                .map(|e| e * EV_PER_ANG2_TO_J_PER_M2);
        }
    }
}

/// Surface properties of one material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacePropertiesDoc {
    #[serde(default)]
    pub material_id: Option<String>,

    #[serde(default)]
    pub surfaces: Vec<Surface>,

    /// Area-weighted surface energy (J/m²)
    #[serde(default)]
    pub weighted_surface_energy: Option<f64>,

    #[serde(default, rename = "weighted_surface_energy_EV_PER_ANG2")]
    pub weighted_surface_energy_ev_per_ang2: Option<f64>,

    #[serde(default)]
    pub surface_anisotropy: Option<f64>,

    #[serde(default)]
    pub shape_factor: Option<f64>,

    #[serde(default)]
    pub weighted_work_function: Option<f64>,

    #[serde(default)]
    pub has_reconstructed: Option<bool>,

    #[serde(default)]
    pub pretty_formula: Option<String>,
}

impl SurfacePropertiesDoc {
    /// Express every energy in J/m²
    pub fn normalize_units(&mut self) {
        if self.weighted_surface_energy.is_none() {
            self.weighted_surface_energy = self
                .weighted_surface_energy_ev_per_ang2
                .map(|e| e * EV_PER_ANG2_TO_J_PER_M2);
        }
        self.surfaces.iter_mut().for_each(Surface::normalize_units);
    }
}

/// Everything needed to build a Wulff shape: the conventional lattice and one
/// surface energy (J/m²) per Miller index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WulffInput {
    pub lattice: Lattice,
    pub facets: Vec<(Vec<i32>, f64)>,
}

impl WulffInput {
    /// Pick one energy per Miller index from `surfaces`. Reconstructed surfaces
    /// win over unreconstructed ones for the same index; facet order follows
    /// first appearance.
    pub fn from_surfaces(lattice: Lattice, surfaces: &[Surface]) -> Self {
        let mut facets: Vec<(Vec<i32>, f64, bool)> = Vec::new();

        for surface in surfaces {
            let Some(energy) = surface.surface_energy else {
                continue;
            };
            match facets
                .iter_mut()
                .find(|(miller, _, _)| *miller == surface.miller_index)
            {
                Some(facet) if surface.is_reconstructed => {
                    facet.1 = energy;
                    facet.2 = true;
                }
                Some(_) => {}
                None => facets.push((surface.miller_index.clone(), energy, surface.is_reconstructed)),
            }
        }

        Self {
            lattice,
            facets: facets.into_iter().map(|(m, e, _)| (m, e)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn surface(miller: [i32; 3], energy: f64, reconstructed: bool) -> Surface {
        Surface {
            miller_index: miller.to_vec(),
            surface_energy: Some(energy),
            surface_energy_ev_per_ang2: None,
            is_reconstructed: reconstructed,
            area_fraction: None,
            work_function: None,
            structure: None,
        }
    }

    #[test]
    fn test_unit_conversion() {
        let mut doc: SurfacePropertiesDoc = serde_json::from_value(json!({
            "material_id": "mp-13",
            "weighted_surface_energy_EV_PER_ANG2": 0.1,
            "surfaces": [
                {"miller_index": [1, 0, 0], "surface_energy_EV_PER_ANG2": 0.2},
                {"miller_index": [1, 1, 0], "surface_energy": 2.5, "surface_energy_EV_PER_ANG2": 0.15}
            ]
        }))
        .unwrap();

        doc.normalize_units();

        let weighted = doc.weighted_surface_energy.unwrap();
        assert!((weighted - 1.602_176_634).abs() < 1e-9);
        assert!((doc.surfaces[0].surface_energy.unwrap() - 3.204_353_268).abs() < 1e-9);
        // SI values from the server are kept as is
        assert_eq!(doc.surfaces[1].surface_energy, Some(2.5));
    }

    #[test]
    fn test_wulff_prefers_reconstructed() {
        let lattice = Lattice {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        };
        let surfaces = vec![
            surface([1, 0, 0], 2.0, false),
            surface([1, 1, 0], 2.2, false),
            surface([1, 0, 0], 1.8, true),
            surface([1, 0, 0], 2.4, false),
        ];

        let wulff = WulffInput::from_surfaces(lattice, &surfaces);
        assert_eq!(
            wulff.facets,
            vec![(vec![1, 0, 0], 1.8), (vec![1, 1, 0], 2.2)]
        );
    }
}
