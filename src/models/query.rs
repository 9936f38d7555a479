//! Query criteria, projections and search requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query parameter holding the field projection
pub const FIELDS_PARAM: &str = "_fields";
/// Query parameter requesting every field
pub const ALL_FIELDS_PARAM: &str = "_all_fields";
/// Query parameter holding the sort specification
pub const SORT_PARAM: &str = "_sort_fields";
/// Query parameter for page size
pub const LIMIT_PARAM: &str = "_limit";
/// Query parameter for page offset
pub const SKIP_PARAM: &str = "_skip";

/// A constraint on a single document field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Field equals the value
    Equals(String),
    /// Field is one of the values
    OneOf(Vec<String>),
    /// Field lies within an inclusive range (either bound optional)
    Range { min: Option<f64>, max: Option<f64> },
}

/// Field-to-constraint mapping used to filter documents.
///
/// Constraints are kept in field order so the generated query string is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    constraints: BTreeMap<String, Constraint>,
}

impl Criteria {
    /// Create empty criteria (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`
    pub fn equals(mut self, field: impl Into<String>, value: impl ToString) -> Self {
        self.constraints
            .insert(field.into(), Constraint::Equals(value.to_string()));
        self
    }

    /// Require `field` to be one of `values`
    pub fn one_of<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.constraints
            .insert(field.into(), Constraint::OneOf(values));
        self
    }

    /// Require `field` to lie within `[min, max]`. Does nothing when both
    /// bounds are missing.
    pub fn range(mut self, field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        if min.is_some() || max.is_some() {
            self.constraints
                .insert(field.into(), Constraint::Range { min, max });
        }
        self
    }

    /// Insert a constraint directly
    pub fn with(mut self, field: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.insert(field.into(), constraint);
        self
    }

    /// Get the constraint on a field
    pub fn get(&self, field: &str) -> Option<&Constraint> {
        self.constraints.get(field)
    }

    /// Fields referenced by these criteria
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.constraints.keys().map(|k| k.as_str())
    }

    /// Check if there are no constraints
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Number of constrained fields
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Intersect these criteria with "`id_field` is one of `ids`".
    ///
    /// An existing constraint on the identifier field is combined with the new
    /// restriction; the order of `ids` is kept.
    pub fn restrict_ids(&self, id_field: &str, ids: &[String]) -> Criteria {
        let restricted: Vec<String> = match self.constraints.get(id_field) {
            Some(Constraint::OneOf(existing)) => ids
                .iter()
                .filter(|id| existing.contains(id))
                .cloned()
                .collect(),
            Some(Constraint::Equals(existing)) => {
                ids.iter().filter(|id| *id == existing).cloned().collect()
            }
            _ => ids.to_vec(),
        };

        let mut criteria = self.clone();
        criteria
            .constraints
            .insert(id_field.to_string(), Constraint::OneOf(restricted));
        criteria
    }

    /// Encode as query parameters. A membership constraint on `id_field` is
    /// sent under `id_param`.
    pub fn to_query_params(&self, id_field: &str, id_param: &str) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.constraints.len());

        for (field, constraint) in &self.constraints {
            match constraint {
                Constraint::Equals(value) => params.push((field.clone(), value.clone())),
                Constraint::OneOf(values) => {
                    let key = if field == id_field { id_param } else { field.as_str() };
                    params.push((key.to_string(), values.join(",")));
                }
                Constraint::Range { min, max } => {
                    if let Some(min) = min {
                        params.push((format!("{}_min", field), min.to_string()));
                    }
                    if let Some(max) = max {
                        params.push((format!("{}_max", field), max.to_string()));
                    }
                }
            }
        }

        params
    }
}

/// Which document fields to return
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fields {
    /// Every field of the resource (more expensive)
    #[default]
    All,
    /// Only the listed fields (dotted paths allowed, e.g. `orig_inputs.incar`)
    Only(Vec<String>),
}

impl Fields {
    /// Project onto the given fields
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Fields::Only(fields.into_iter().map(Into::into).collect())
    }

    /// Encode as a query parameter
    pub fn to_query_param(&self) -> (String, String) {
        match self {
            Fields::All => (ALL_FIELDS_PARAM.to_string(), "true".to_string()),
            Fields::Only(fields) => (FIELDS_PARAM.to_string(), fields.join(",")),
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub ascending: bool,
}

impl SortSpec {
    /// Encode as the `_sort_fields` value (`field` or `-field`)
    pub fn to_query_value(&self) -> String {
        if self.ascending {
            self.field.clone()
        } else {
            format!("-{}", self.field)
        }
    }
}

/// A search against one resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Filter
    pub criteria: Criteria,

    /// Projection
    pub fields: Fields,

    /// Optional sort
    pub sort: Option<SortSpec>,

    /// Ids per chunk; `Some(0)` disables chunking, `None` uses the resource default
    pub chunk_size: Option<usize>,

    /// Only fetch the first `num_chunks` chunks
    pub num_chunks: Option<usize>,
}

impl SearchRequest {
    /// Create a search for the given criteria, returning all fields
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            ..Default::default()
        }
    }

    /// Project onto the given fields
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Fields::only(fields);
        self
    }

    /// Set the projection
    pub fn projection(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Sort by a field
    pub fn sort_by(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort = Some(SortSpec {
            field: field.into(),
            ascending,
        });
        self
    }

    /// Set chunk size (0 disables chunking)
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Cap the number of chunks fetched
    pub fn num_chunks(mut self, num_chunks: usize) -> Self {
        self.num_chunks = Some(num_chunks);
        self
    }
}

/// Build criteria for a chemical system (`Li-Fe-O`) or a formula (`Fe2O3`).
pub fn chemsys_formula_criteria(chemsys_formula: &str) -> Criteria {
    let value = chemsys_formula.trim();
    if value.contains('-') {
        let mut elements: Vec<&str> = value.split('-').map(str::trim).collect();
        elements.sort_unstable();
        Criteria::new().equals("chemsys", elements.join("-"))
    } else {
        Criteria::new().equals("formula_pretty", value)
    }
}

/// Join a Miller index or vector as a comma-separated query value
pub fn join_ints(values: &[i32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_query_params() {
        let criteria = Criteria::new()
            .equals("nelements", 2)
            .one_of("elements", ["Li", "O"])
            .range("band_gap", Some(1.0), None);

        let params = criteria.to_query_params("material_id", "material_ids");
        assert_eq!(
            params,
            vec![
                ("band_gap_min".to_string(), "1".to_string()),
                ("elements".to_string(), "Li,O".to_string()),
                ("nelements".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_range_is_ignored() {
        let criteria = Criteria::new().range("energy", None, None);
        assert!(criteria.is_empty());
    }

    #[test]
    fn test_restrict_ids_uses_id_param() {
        let criteria = Criteria::new().equals("chemsys", "Fe-O");
        let ids = vec!["mp-1".to_string(), "mp-2".to_string()];
        let restricted = criteria.restrict_ids("material_id", &ids);

        let params = restricted.to_query_params("material_id", "material_ids");
        assert!(params.contains(&("material_ids".to_string(), "mp-1,mp-2".to_string())));
        assert!(params.contains(&("chemsys".to_string(), "Fe-O".to_string())));
    }

    #[test]
    fn test_restrict_ids_intersects_existing_constraint() {
        let criteria = Criteria::new().one_of("material_id", ["mp-2", "mp-3"]);
        let ids = vec!["mp-1".to_string(), "mp-2".to_string(), "mp-3".to_string()];
        let restricted = criteria.restrict_ids("material_id", &ids);

        assert_eq!(
            restricted.get("material_id"),
            Some(&Constraint::OneOf(vec!["mp-2".to_string(), "mp-3".to_string()]))
        );
    }

    #[test]
    fn test_fields_and_sort_encoding() {
        assert_eq!(
            Fields::All.to_query_param(),
            ("_all_fields".to_string(), "true".to_string())
        );
        assert_eq!(
            Fields::only(["material_id", "structure"]).to_query_param(),
            ("_fields".to_string(), "material_id,structure".to_string())
        );

        let request = SearchRequest::new(Criteria::new()).sort_by("energy_above_hull", false);
        assert_eq!(request.sort.unwrap().to_query_value(), "-energy_above_hull");
    }

    #[test]
    fn test_chemsys_formula_criteria() {
        assert_eq!(
            chemsys_formula_criteria("O-Li-Fe").get("chemsys"),
            Some(&Constraint::Equals("Fe-Li-O".to_string()))
        );
        assert_eq!(
            chemsys_formula_criteria("Fe2O3").get("formula_pretty"),
            Some(&Constraint::Equals("Fe2O3".to_string()))
        );
    }
}
