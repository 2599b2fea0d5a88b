//! Fixed-depth MiMC Merkle tree rebuilt from the ordered commitment leaves.
//!
//! Missing right children are padded with the zero value of their level, never
//! with a copy of the left child, so roots agree with the on-chain tree.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WillError};
use crate::field::FieldElement;
use crate::hash::hash2;

/// Depth used by the deployed contract and circuit.
pub const DEFAULT_LEVELS: usize = 20;

/// Deepest tree supported; keeps `2^levels` inside a `u64`.
pub const MAX_LEVELS: usize = 32;

/// keccak256("tornado") % FIELD_SIZE
pub const ZERO_VALUE: &str =
    "21663839004416932945382355908790599225266501822907911457504978515578255421292";

pub fn zero_value() -> FieldElement {
    // ZERO_VALUE is a canonical decimal literal
    FieldElement::from_biguint(
        &num_bigint::BigUint::parse_bytes(ZERO_VALUE.as_bytes(), 10).unwrap_or_default(),
    )
}

/// Number of leaves a tree of `levels` can hold.
pub fn capacity(levels: usize) -> Result<u64> {
    check_levels(levels)?;
    Ok(1u64 << levels)
}

fn check_levels(levels: usize) -> Result<()> {
    if levels == 0 || levels > MAX_LEVELS {
        return Err(WillError::Validation(format!(
            "tree levels must be within 1..={MAX_LEVELS}, got {levels}"
        )));
    }
    Ok(())
}

/// Padding table of length `levels + 1`: `zeros[0] = ZERO_VALUE`,
/// `zeros[i] = H(zeros[i-1], zeros[i-1])`.
pub fn zeros(levels: usize) -> Vec<FieldElement> {
    let mut zeros = Vec::with_capacity(levels + 1);
    zeros.push(zero_value());
    for i in 1..=levels {
        let prev = zeros[i - 1];
        zeros.push(hash2(&prev, &prev));
    }
    zeros
}

#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: usize,
    zeros: Vec<FieldElement>,
    /// `layers[0]` are the leaves; `layers[levels]` holds at most the root.
    layers: Vec<Vec<FieldElement>>,
}

impl MerkleTree {
    /// Builds every layer from `leaves`, in the order given.
    ///
    /// Every call rehashes the whole leaf set, O(n) per claim. Fine for the
    /// anonymity sets seen so far; large deployments want an incrementally
    /// maintained tree instead.
    pub fn build(levels: usize, leaves: &[FieldElement]) -> Result<Self> {
        let capacity = capacity(levels)?;
        if leaves.len() as u64 > capacity {
            return Err(WillError::Capacity {
                leaves: leaves.len(),
                capacity,
            });
        }

        let zeros = zeros(levels);
        let mut layers = Vec::with_capacity(levels + 1);
        layers.push(leaves.to_vec());
        for level in 1..=levels {
            let prev = &layers[level - 1];
            let mut next = Vec::with_capacity(prev.len().div_ceil(2));
            for chunk in prev.chunks(2) {
                let left = chunk[0];
                let right = chunk.get(1).copied().unwrap_or(zeros[level - 1]);
                next.push(hash2(&left, &right));
            }
            layers.push(next);
        }

        debug!(levels, leaves = leaves.len(), "built merkle tree");
        Ok(Self {
            levels,
            zeros,
            layers,
        })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn zeros(&self) -> &[FieldElement] {
        &self.zeros
    }

    pub fn layers(&self) -> &[Vec<FieldElement>] {
        &self.layers
    }

    pub fn leaves(&self) -> &[FieldElement] {
        &self.layers[0]
    }

    /// Root of the tree. An empty tree reports `zeros[levels - 1]`, matching
    /// the deployed tree's initial root.
    pub fn root(&self) -> FieldElement {
        self.layers[self.levels]
            .first()
            .copied()
            .unwrap_or(self.zeros[self.levels - 1])
    }

    /// Index of the first leaf equal to `target`.
    pub fn position(&self, target: &FieldElement) -> Option<usize> {
        self.layers[0].iter().position(|leaf| leaf == target)
    }

    /// Sibling path for `target`, leaf to root.
    pub fn path(&self, target: &FieldElement) -> Result<MerklePath> {
        let leaf_index = self.position(target).ok_or(WillError::NotFound(*target))?;
        Ok(self.path_at(leaf_index))
    }

    fn path_at(&self, leaf_index: usize) -> MerklePath {
        let mut path_elements = Vec::with_capacity(self.levels);
        let mut path_indices = Vec::with_capacity(self.levels);
        let mut idx = leaf_index;
        for level in 0..self.levels {
            let row = &self.layers[level];
            path_indices.push((idx % 2) as u8);
            path_elements.push(row.get(idx ^ 1).copied().unwrap_or(self.zeros[level]));
            idx >>= 1;
        }
        MerklePath {
            leaf_index,
            path_elements,
            path_indices,
            root: self.root(),
        }
    }
}

/// Membership witness for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerklePath {
    pub leaf_index: usize,
    pub path_elements: Vec<FieldElement>,
    /// 0 when the tracked node is the left child at that level, 1 when right.
    pub path_indices: Vec<u8>,
    pub root: FieldElement,
}

impl MerklePath {
    /// Folds `leaf` up through the path.
    pub fn compute_root(&self, leaf: &FieldElement) -> FieldElement {
        let mut node = *leaf;
        for (sibling, bit) in self.path_elements.iter().zip(&self.path_indices) {
            node = if *bit == 0 {
                hash2(&node, sibling)
            } else {
                hash2(sibling, &node)
            };
        }
        node
    }

    pub fn verify(&self, leaf: &FieldElement) -> bool {
        self.path_elements.len() == self.path_indices.len() && self.compute_root(leaf) == self.root
    }
}

/// Rebuilds the tree from `leaves` and extracts the path of `target`.
pub fn extract_path(
    levels: usize,
    leaves: &[FieldElement],
    target: &FieldElement,
) -> Result<MerklePath> {
    MerkleTree::build(levels, leaves)?.path(target)
}
