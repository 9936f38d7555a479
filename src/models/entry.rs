//! Computed energy entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Structure;

/// A computed total energy for a composition, optionally with its structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedEntry {
    #[serde(default)]
    pub entry_id: Option<String>,

    /// Element amounts
    pub composition: BTreeMap<String, f64>,

    /// Uncorrected total energy (eV)
    pub energy: f64,

    /// Sum of energy corrections (eV)
    #[serde(default)]
    pub correction: f64,

    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,

    /// Present for structure entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Structure>,
}

impl ComputedEntry {
    /// Corrected total energy (eV)
    pub fn corrected_energy(&self) -> f64 {
        self.energy + self.correction
    }

    /// Number of atoms in the composition
    pub fn num_atoms(&self) -> f64 {
        self.composition.values().sum()
    }

    /// Corrected energy per atom (eV/atom)
    pub fn energy_per_atom(&self) -> f64 {
        let atoms = self.num_atoms();
        if atoms > 0.0 {
            self.corrected_energy() / atoms
        } else {
            0.0
        }
    }
}
