//! Crystal structures as serialized by the API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A lattice given by its three row vectors (Å)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// Lattice vector lengths a, b, c
    pub fn abc(&self) -> [f64; 3] {
        self.matrix
            .map(|row| row.iter().map(|x| x * x).sum::<f64>().sqrt())
    }

    /// Cell volume (Å³)
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.matrix;
        let cross = [
            b[1] * c[2] - b[2] * c[1],
            b[2] * c[0] - b[0] * c[2],
            b[0] * c[1] - b[1] * c[0],
        ];
        (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]).abs()
    }
}

/// Occupancy of one species on a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesOccupancy {
    pub element: String,

    #[serde(default = "default_occupancy")]
    pub occu: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxidation_state: Option<f64>,
}

fn default_occupancy() -> f64 {
    1.0
}

/// A site in fractional coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub species: Vec<SpeciesOccupancy>,

    /// Fractional coordinates
    pub abc: [f64; 3],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// A periodic crystal structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub lattice: Lattice,
    pub sites: Vec<Site>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<f64>,
}

impl Structure {
    /// Number of sites
    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    /// Element amounts summed over all sites
    pub fn composition(&self) -> BTreeMap<String, f64> {
        let mut composition = BTreeMap::new();
        for species in self.sites.iter().flat_map(|site| &site.species) {
            *composition.entry(species.element.clone()).or_insert(0.0) += species.occu;
        }
        composition
    }

    /// Sorted, deduplicated element symbols
    pub fn elements(&self) -> Vec<String> {
        self.composition().into_keys().collect()
    }

    /// Chemical system string, e.g. `Fe-O`
    pub fn chemsys(&self) -> String {
        self.elements().join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rock_salt() -> Structure {
        serde_json::from_value(json!({
            "@module": "pymatgen.core.structure",
            "@class": "Structure",
            "lattice": {"matrix": [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]], "a": 4.0},
            "sites": [
                {"species": [{"element": "Na", "occu": 1}], "abc": [0.0, 0.0, 0.0], "label": "Na"},
                {"species": [{"element": "Cl", "occu": 1}], "abc": [0.5, 0.5, 0.5], "label": "Cl"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_structure() {
        let structure = rock_salt();
        assert_eq!(structure.num_sites(), 2);
        assert_eq!(structure.chemsys(), "Cl-Na");
        assert_eq!(structure.composition().get("Na"), Some(&1.0));
    }

    #[test]
    fn test_lattice_geometry() {
        let lattice = rock_salt().lattice;
        assert_eq!(lattice.abc(), [4.0, 4.0, 4.0]);
        assert!((lattice.volume() - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_occupancy() {
        let structure: Structure = serde_json::from_value(json!({
            "lattice": {"matrix": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]},
            "sites": [
                {"species": [{"element": "Fe", "occu": 0.5}, {"element": "Ni", "occu": 0.5}], "abc": [0.0, 0.0, 0.0]}
            ]
        }))
        .unwrap();

        assert_eq!(structure.composition().get("Fe"), Some(&0.5));
        assert_eq!(structure.elements(), vec!["Fe".to_string(), "Ni".to_string()]);
    }
}
