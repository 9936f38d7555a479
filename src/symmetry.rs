//! Symmetry analysis boundary.
//!
//! The client does not analyse crystal symmetry itself. Facade operations that
//! need it (conventional cells, equivalent surfaces, Wulff input) take an
//! implementation of [`SymmetryAnalyzer`] supplied by the caller and fail with
//! [`ResterError::NotImplemented`] when none was configured.

use crate::models::Structure;
use crate::resters::ResterError;

/// Space group analysis needed by the facade
pub trait SymmetryAnalyzer: Send + Sync + std::fmt::Debug {
    /// The conventional standard cell of `structure`
    fn conventional_standard_structure(&self, structure: &Structure) -> Result<Structure, ResterError>;

    /// Every Miller index symmetrically equivalent to `miller_index`, including
    /// itself
    fn equivalent_miller_indices(
        &self,
        structure: &Structure,
        miller_index: &[i32],
    ) -> Result<Vec<Vec<i32>>, ResterError>;
}

/// Whether `candidate` is one of the indices equivalent to `miller_index`
pub fn is_equivalent(
    analyzer: &dyn SymmetryAnalyzer,
    structure: &Structure,
    miller_index: &[i32],
    candidate: &[i32],
) -> Result<bool, ResterError> {
    if miller_index == candidate {
        return Ok(true);
    }
    Ok(analyzer
        .equivalent_miller_indices(structure, miller_index)?
        .iter()
        .any(|index| index.as_slice() == candidate))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Treats every structure as cubic: the conventional cell is the input and
    /// equivalent indices are the signed permutations.
    #[derive(Debug, Default)]
    pub struct CubicAnalyzer;

    impl SymmetryAnalyzer for CubicAnalyzer {
        fn conventional_standard_structure(
            &self,
            structure: &Structure,
        ) -> Result<Structure, ResterError> {
            Ok(structure.clone())
        }

        fn equivalent_miller_indices(
            &self,
            _structure: &Structure,
            miller_index: &[i32],
        ) -> Result<Vec<Vec<i32>>, ResterError> {
            let [h, k, l] = <[i32; 3]>::try_from(miller_index)
                .map_err(|_| ResterError::Symmetry("expected three indices".to_string()))?;

            let mut indices = Vec::new();
            for [a, b, c] in [[h, k, l], [h, l, k], [k, h, l], [k, l, h], [l, h, k], [l, k, h]] {
                for signs in 0..8 {
                    let sign = |bit: i32, v: i32| if signs & bit == 0 { v } else { -v };
                    let index = vec![sign(1, a), sign(2, b), sign(4, c)];
                    if !indices.contains(&index) {
                        indices.push(index);
                    }
                }
            }
            Ok(indices)
        }
    }
}
