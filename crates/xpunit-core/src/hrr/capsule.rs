//! Role-filler store of a single unit
//!
//! Each role holds the superposition of every filler bound under it and the
//! accumulated weight. The unit's context vector is recomposed from the whole
//! store, so binding the same pair twice really does count twice.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{add_scaled, cosine_similarity, normalize, HrrSpace};
use crate::error::{ensure_dimension, Result};

/// Superposed filler and accumulated weight of one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Sum of every filler bound under this role
    pub vector: Vec<f32>,
    /// Sum of the weights of those bindings
    pub weight: f64,
}

/// HRR binding store, exclusively owned by one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryCapsule {
    dimension: usize,
    bindings: BTreeMap<String, Binding>,
}

impl MemoryCapsule {
    /// Empty capsule for vectors of `dimension` components
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            bindings: BTreeMap::new(),
        }
    }

    /// Dimensionality of every stored vector
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Bind `vector` under `role` with `weight`.
    ///
    /// An existing role is merged: the vector is added into the slot and the
    /// weights are summed.
    pub fn bind(&mut self, role: &str, vector: &[f32], weight: f64) -> Result<()> {
        ensure_dimension(self.dimension, vector.len())?;
        self.superpose(role, vector, weight);
        Ok(())
    }

    /// Merge without the dimension check. Callers guarantee the length.
    pub(crate) fn superpose(&mut self, role: &str, vector: &[f32], weight: f64) {
        let weight = if weight.is_finite() { weight } else { 0.0 };
        match self.bindings.get_mut(role) {
            Some(binding) => {
                add_scaled(&mut binding.vector, vector, 1.0);
                binding.weight += weight;
            }
            None => {
                self.bindings.insert(
                    role.to_string(),
                    Binding {
                        vector: vector.to_vec(),
                        weight,
                    },
                );
            }
        }
    }

    /// All bindings, ordered by role name
    pub fn bindings(&self) -> &BTreeMap<String, Binding> {
        &self.bindings
    }

    /// Binding of one role
    pub fn get(&self, role: &str) -> Option<&Binding> {
        self.bindings.get(role)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Compose the context vector: `normalize(Σ w_r · (role_r ⊛ unit(filler_r)))`.
    pub fn compose(&self, space: &HrrSpace) -> Vec<f32> {
        let mut context = space.zeros();
        for (role, binding) in &self.bindings {
            let mut filler = binding.vector.clone();
            normalize(&mut filler);
            let bound = space.convolve(&space.role(role), &filler);
            add_scaled(&mut context, &bound, binding.weight as f32);
        }
        normalize(&mut context);
        context
    }

    /// Approximate filler of `role`, recovered from the composed trace.
    ///
    /// `None` when the role was never bound.
    pub fn unbind(&self, space: &HrrSpace, role: &str) -> Option<Vec<f32>> {
        if !self.bindings.contains_key(role) {
            return None;
        }
        let trace = self.compose(space);
        Some(space.correlate(&space.role(role), &trace))
    }

    /// Clean-up memory: the candidate most similar to the filler of `role`.
    pub fn cleanup<'a>(
        &self,
        space: &HrrSpace,
        role: &str,
        candidates: &'a [(String, Vec<f32>)],
    ) -> Option<(&'a str, f32)> {
        let recovered = self.unbind(space, role)?;
        candidates
            .iter()
            .map(|(name, vector)| (name.as_str(), cosine_similarity(&recovered, vector)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Fold every binding of `other` into this capsule.
    pub(crate) fn absorb(&mut self, other: &MemoryCapsule) {
        for (role, binding) in &other.bindings {
            self.superpose(role, &binding.vector, binding.weight);
        }
    }

    /// Ensure every stored vector has the capsule's dimensionality.
    pub(crate) fn validate(&self) -> Result<()> {
        for binding in self.bindings.values() {
            ensure_dimension(self.dimension, binding.vector.len())?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
