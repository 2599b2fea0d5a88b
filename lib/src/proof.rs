//! Data exchanged with the proving backend and its reshaping for the verifier contract.

use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WillError};
use crate::field::FieldElement;
use crate::merkle::MerklePath;

/// Inputs of the will circuit, in the field names it expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitInputs {
    pub nullifier: FieldElement,
    pub secret: FieldElement,
    pub input_timestamp: FieldElement,
    pub path_elements: Vec<FieldElement>,
    pub path_indices: Vec<u8>,
}

impl CircuitInputs {
    pub fn new(
        nullifier: FieldElement,
        secret: FieldElement,
        input_timestamp: FieldElement,
        path: &MerklePath,
    ) -> Self {
        Self {
            nullifier,
            secret,
            input_timestamp,
            path_elements: path.path_elements.clone(),
            path_indices: path.path_indices.clone(),
        }
    }
}

/// Groth16 proof as snarkjs emits it: projective coordinates as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
}

/// What the proving backend returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProverOutput {
    pub proof: Groth16Proof,
    pub public_signals: Vec<String>,
}

/// `[nullifierHash, root, overrideFlag]`, in circuit output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicSignals {
    pub nullifier_hash: FieldElement,
    pub root: FieldElement,
    pub override_flag: FieldElement,
}

impl PublicSignals {
    pub fn parse(signals: &[String]) -> Result<Self> {
        if signals.len() != 3 {
            return Err(WillError::ExternalDependency(format!(
                "prover returned {} public signals, expected 3",
                signals.len()
            )));
        }
        let parse = |s: &String| {
            FieldElement::from_str(s).map_err(|e| {
                WillError::ExternalDependency(format!("bad public signal \"{s}\": {e}"))
            })
        };
        Ok(Self {
            nullifier_hash: parse(&signals[0])?,
            root: parse(&signals[1])?,
            override_flag: parse(&signals[2])?,
        })
    }

    pub fn override_set(&self) -> bool {
        self.override_flag.is_one()
    }

    pub fn to_u256(&self) -> [U256; 3] {
        [
            self.nullifier_hash.to_u256(),
            self.root.to_u256(),
            self.override_flag.to_u256(),
        ]
    }
}

/// Proof in the argument layout of the Solidity verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidityProof {
    pub a: [U256; 2],
    pub b: [[U256; 2]; 2],
    pub c: [U256; 2],
}

fn coord(values: &[String], i: usize, name: &str) -> Result<U256> {
    let raw = values.get(i).ok_or_else(|| {
        WillError::ExternalDependency(format!("proof {name} is missing coordinate {i}"))
    })?;
    U256::from_str(raw.trim()).map_err(|e| {
        WillError::ExternalDependency(format!("proof {name}[{i}] \"{raw}\" is not a number: {e}"))
    })
}

impl SolidityProof {
    /// Drops the projective `z` coordinates and swaps each `pi_b` pair, since
    /// the verifier takes G2 coordinates as `(c1, c0)`.
    pub fn from_groth16(proof: &Groth16Proof) -> Result<Self> {
        let b_row = |row: usize| -> Result<[U256; 2]> {
            let values = proof.pi_b.get(row).ok_or_else(|| {
                WillError::ExternalDependency(format!("proof pi_b is missing row {row}"))
            })?;
            Ok([coord(values, 1, "pi_b")?, coord(values, 0, "pi_b")?])
        };
        Ok(Self {
            a: [coord(&proof.pi_a, 0, "pi_a")?, coord(&proof.pi_a, 1, "pi_a")?],
            b: [b_row(0)?, b_row(1)?],
            c: [coord(&proof.pi_c, 0, "pi_c")?, coord(&proof.pi_c, 1, "pi_c")?],
        })
    }
}
