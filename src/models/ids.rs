//! Materials Project identifiers.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Error returned when a string is not a well-formed identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed identifier '{0}': expected '<prefix>-<digits>', e.g. mp-149")]
pub struct IdParseError(pub String);

/// A material identifier such as `mp-149` or `mvc-12`.
///
/// Identifiers order by prefix first and then numerically, so `mp-9` sorts
/// before `mp-10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaterialId {
    raw: String,
    prefix_len: usize,
    number: u64,
}

impl MaterialId {
    /// Alphabetic prefix (`mp`, `mvc`, ...)
    pub fn prefix(&self) -> &str {
        &self.raw[..self.prefix_len]
    }

    /// Numeric part of the identifier
    pub fn number(&self) -> u64 {
        self.number
    }

    /// The identifier as it was given
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for MaterialId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (prefix, digits) = raw
            .split_once('-')
            .ok_or_else(|| IdParseError(s.to_string()))?;

        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(IdParseError(s.to_string()));
        }
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdParseError(s.to_string()));
        }

        let number = digits.parse().map_err(|_| IdParseError(s.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            prefix_len: prefix.len(),
            number,
        })
    }
}

impl TryFrom<String> for MaterialId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MaterialId> for String {
    fn from(id: MaterialId) -> Self {
        id.raw
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for MaterialId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix()
            .cmp(other.prefix())
            .then(self.number.cmp(&other.number))
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for MaterialId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
