//! Binary decision trees in flat, index-linked form.
//!
//! ```json
//! { "nodes": [
//!     { "feature": 1, "threshold": 0.25, "left": 1, "right": 2 },
//!     { "leaf": [12.0, 3.0] },
//!     { "leaf": [0.0, 9.0] }
//! ] }
//! ```
//!
//! Node 0 is the root.  A split sends a row left when
//! `x[feature] <= threshold`.  Children must have a higher index than
//! their parent, which rules out cycles and bounds every walk by the
//! node count.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// One node: an internal split or a leaf carrying payload `L`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node<L> {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: L,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree<L> {
    nodes: Vec<Node<L>>,
}

/// Where a row landed: the leaf payload and the number of splits crossed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafHit<'a, L> {
    pub leaf: &'a L,
    pub depth: usize,
}

impl<L> Tree<L> {
    pub fn new(nodes: Vec<Node<L>>) -> Self {
        Self { nodes }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Structural checks: non-empty, forward in-range children,
    /// split features inside the input width, and `check_leaf` on every leaf.
    pub fn validate(
        &self,
        n_features: usize,
        mut check_leaf: impl FnMut(&L) -> Result<(), ModelError>,
    ) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidTree("tree has no nodes"));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ModelError::InvalidTree("split feature out of range"));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::InvalidTree("split threshold is NaN"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(ModelError::InvalidTree(
                                "child index must point forward and stay in range",
                            ));
                        }
                    }
                }
                Node::Leaf { leaf } => check_leaf(leaf)?,
            }
        }
        Ok(())
    }

    /// Route one row from the root to a leaf.
    pub fn route(&self, row: &[f64]) -> Result<LeafHit<'_, L>, ModelError> {
        let mut idx = 0;
        let mut depth = 0;
        // Each step strictly increases `idx`, so this bound is never hit
        // on a validated tree.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(Node::Leaf { leaf }) => return Ok(LeafHit { leaf, depth }),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().ok_or(ModelError::ShapeMismatch {
                        expected: feature + 1,
                        got: row.len(),
                    })?;
                    idx = if value <= *threshold { *left } else { *right };
                    depth += 1;
                }
                None => return Err(ModelError::InvalidTree("node index out of range")),
            }
        }
        Err(ModelError::InvalidTree("walk did not reach a leaf"))
    }
}
