//! Calculation task types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task types available in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "GGA Structure Optimization")]
    GgaOpt,
    #[serde(rename = "GGA+U Structure Optimization")]
    GgauOpt,
    #[serde(rename = "SCAN Structure Optimization")]
    ScanOpt,
    #[serde(rename = "GGA NSCF Line")]
    GgaLine,
    #[serde(rename = "GGA+U NSCF Line")]
    GgauLine,
    #[serde(rename = "GGA NSCF Uniform")]
    GgaUniform,
    #[serde(rename = "GGA+U NSCF Uniform")]
    GgauUniform,
    #[serde(rename = "GGA Static")]
    GgaStatic,
    #[serde(rename = "GGA+U Static")]
    GgauStatic,
    #[serde(rename = "GGA Static Dielectric")]
    GgaStaticDiel,
    #[serde(rename = "GGA+U Static Dielectric")]
    GgauStaticDiel,
    #[serde(rename = "GGA Deformation")]
    GgaDef,
    #[serde(rename = "GGA+U Deformation")]
    GgauDef,
    #[serde(rename = "LDA Static Dielectric")]
    LdaStaticDiel,
}

impl TaskType {
    /// Every task type
    pub const ALL: [TaskType; 14] = [
        TaskType::GgaOpt,
        TaskType::GgauOpt,
        TaskType::ScanOpt,
        TaskType::GgaLine,
        TaskType::GgauLine,
        TaskType::GgaUniform,
        TaskType::GgauUniform,
        TaskType::GgaStatic,
        TaskType::GgauStatic,
        TaskType::GgaStaticDiel,
        TaskType::GgauStaticDiel,
        TaskType::GgaDef,
        TaskType::GgauDef,
        TaskType::LdaStaticDiel,
    ];

    /// The name used by the API
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::GgaOpt => "GGA Structure Optimization",
            TaskType::GgauOpt => "GGA+U Structure Optimization",
            TaskType::ScanOpt => "SCAN Structure Optimization",
            TaskType::GgaLine => "GGA NSCF Line",
            TaskType::GgauLine => "GGA+U NSCF Line",
            TaskType::GgaUniform => "GGA NSCF Uniform",
            TaskType::GgauUniform => "GGA+U NSCF Uniform",
            TaskType::GgaStatic => "GGA Static",
            TaskType::GgauStatic => "GGA+U Static",
            TaskType::GgaStaticDiel => "GGA Static Dielectric",
            TaskType::GgauStaticDiel => "GGA+U Static Dielectric",
            TaskType::GgaDef => "GGA Deformation",
            TaskType::GgauDef => "GGA+U Deformation",
            TaskType::LdaStaticDiel => "LDA Static Dielectric",
        }
    }

    /// Whether this is a static (single point) calculation
    pub fn is_static(&self) -> bool {
        self.as_str().contains("Static")
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown task type: {}", s))
    }
}
