//! Precomputed transition graph.
//!
//! Each node carries two kinds of transition tables:
//! - a **first-travel** distribution, used for the first step of a walk (no previous node yet)
//! - **second-order** distributions, keyed by the node the walk arrived from
//!
//! Candidates and weights are parallel lists: `weights[i]` is the probability of stepping to
//! `candidates[i]`. A missing or empty candidate list is a dead end, not an error.
//!
//! The graph is an ordered map, so node iteration order is stable; seeded generation relies
//! on that to reproduce batches exactly.

use crate::sampling::{check_distribution, DistributionDefect};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Transition tables for one node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound(
    serialize = "N: Ord + serde::Serialize",
    deserialize = "N: Ord + serde::Deserialize<'de>"
)))]
pub struct TransitionNode<N> {
    /// Previous node → candidate next nodes.
    #[cfg_attr(feature = "serde", serde(default))]
    pub neighbors: BTreeMap<N, Vec<N>>,
    /// Previous node → weights, parallel to `neighbors[previous]`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub probabilities: BTreeMap<N, Vec<f64>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub first_travel_neighbors: Vec<N>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub first_travel_probabilities: Vec<f64>,
}

impl<N> Default for TransitionNode<N> {
    fn default() -> Self {
        Self {
            neighbors: BTreeMap::new(),
            probabilities: BTreeMap::new(),
            first_travel_neighbors: Vec::new(),
            first_travel_probabilities: Vec::new(),
        }
    }
}

impl<N: Ord> TransitionNode<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first-step distribution.
    pub fn with_first_travel(mut self, candidates: Vec<N>, weights: Vec<f64>) -> Self {
        self.first_travel_neighbors = candidates;
        self.first_travel_probabilities = weights;
        self
    }

    /// Set the distribution used when the walk arrived here from `previous`.
    pub fn with_transitions(mut self, previous: N, candidates: Vec<N>, weights: Vec<f64>) -> Self
    where
        N: Clone,
    {
        self.neighbors.insert(previous.clone(), candidates);
        self.probabilities.insert(previous, weights);
        self
    }

    /// `(candidates, weights)` for the first step, or `None` on a dead end.
    pub fn first_travel(&self) -> Option<(&[N], &[f64])> {
        if self.first_travel_neighbors.is_empty() {
            return None;
        }
        Some((self.first_travel_neighbors.as_slice(), self.first_travel_probabilities.as_slice()))
    }

    /// `(candidates, weights)` conditioned on `previous`, or `None` on a dead end.
    pub fn transitions(&self, previous: &N) -> Option<(&[N], &[f64])> {
        let candidates = self.neighbors.get(previous)?;
        if candidates.is_empty() {
            return None;
        }
        let weights = self.probabilities.get(previous)?;
        Some((candidates.as_slice(), weights.as_slice()))
    }
}

/// Node identifier → transition tables. Read-only during generation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "serde", serde(bound(
    serialize = "N: Ord + serde::Serialize",
    deserialize = "N: Ord + serde::Deserialize<'de>"
)))]
pub struct TransitionGraph<N> {
    nodes: BTreeMap<N, TransitionNode<N>>,
}

impl<N> Default for TransitionGraph<N> {
    fn default() -> Self {
        Self { nodes: BTreeMap::new() }
    }
}

impl<N: Ord> TransitionGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: N, tables: TransitionNode<N>) -> Option<TransitionNode<N>> {
        self.nodes.insert(node, tables)
    }

    pub fn get(&self, node: &N) -> Option<&TransitionNode<N>> {
        self.nodes.get(node)
    }

    pub fn contains(&self, node: &N) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node identifiers in their stable (sorted) order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&N, &TransitionNode<N>)> {
        self.nodes.iter()
    }

    pub fn first_travel(&self, node: &N) -> Option<(&[N], &[f64])> {
        self.nodes.get(node)?.first_travel()
    }

    pub fn transitions(&self, node: &N, previous: &N) -> Option<(&[N], &[f64])> {
        self.nodes.get(node)?.transitions(previous)
    }
}

impl<N: Ord + Display> TransitionGraph<N> {
    /// Check every distribution in the graph.
    ///
    /// Fails on the first table whose weights are missing, mis-sized, negative, non-finite,
    /// or do not sum to one within [`crate::sampling::DISTRIBUTION_TOLERANCE`].
    /// Empty candidate lists are dead ends and need no weights.
    pub fn validate(&self) -> Result<()> {
        for (node, tables) in self.iter() {
            if !tables.first_travel_neighbors.is_empty() {
                check_distribution(
                    tables.first_travel_neighbors.len(),
                    &tables.first_travel_probabilities,
                )
                .map_err(|defect| Error::InvalidDistribution {
                    node: node.to_string(),
                    context: "first step".to_string(),
                    defect,
                })?;
            }

            for (previous, candidates) in &tables.neighbors {
                if candidates.is_empty() {
                    continue;
                }
                let weights = tables.probabilities.get(previous).map(Vec::as_slice);
                let checked = match weights {
                    Some(w) => check_distribution(candidates.len(), w),
                    None => Err(DistributionDefect::MissingWeights),
                };
                checked.map_err(|defect| Error::InvalidDistribution {
                    node: node.to_string(),
                    context: format!("arriving from {previous}"),
                    defect,
                })?;
            }
        }
        Ok(())
    }

    /// Check that every candidate named anywhere in the graph has its own entry.
    pub fn check_references(&self) -> Result<()> {
        for (node, tables) in self.iter() {
            let second_order = tables.neighbors.values().flatten();
            for candidate in tables.first_travel_neighbors.iter().chain(second_order) {
                if !self.nodes.contains_key(candidate) {
                    return Err(Error::MalformedGraph {
                        node: node.to_string(),
                        missing: candidate.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<N: Ord> FromIterator<(N, TransitionNode<N>)> for TransitionGraph<N> {
    fn from_iter<I: IntoIterator<Item = (N, TransitionNode<N>)>>(iter: I) -> Self {
        Self { nodes: iter.into_iter().collect() }
    }
}
