//! MiMC sponge over BN254, the `H` of every commitment and tree node.
//!
//! Matches circomlib's `MiMCSponge` with 220 rounds, key 0 and one output, so
//! commitments, nullifier hashes and roots agree with the deployed verifier
//! and the contract's tree.

use std::sync::OnceLock;

use alloy_primitives::keccak256;
use ark_bn254::Fr;
use ark_ff::{Field, PrimeField, Zero};

use crate::field::FieldElement;

const ROUNDS: usize = 220;
const SEED: &[u8] = b"mimcsponge";

/// `c[i] = keccak256^(i+1)(SEED) mod p`, with the first and last round
/// constants fixed to zero.
fn round_constants() -> &'static [Fr; ROUNDS] {
    static CONSTANTS: OnceLock<[Fr; ROUNDS]> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        let mut constants = [Fr::zero(); ROUNDS];
        let mut c = keccak256(SEED);
        for slot in constants.iter_mut().take(ROUNDS - 1).skip(1) {
            c = keccak256(c);
            *slot = Fr::from_be_bytes_mod_order(c.as_slice());
        }
        constants
    })
}

/// Feistel permutation with `x^5` rounds.
fn permute(mut xl: Fr, mut xr: Fr, key: Fr) -> (Fr, Fr) {
    for (i, c) in round_constants().iter().enumerate() {
        let t = xl + key + c;
        let t5 = t.square().square() * t;
        if i < ROUNDS - 1 {
            let next = xr + t5;
            xr = xl;
            xl = next;
        } else {
            xr += t5;
        }
    }
    (xl, xr)
}

/// Sponge over `inputs`: absorb each element into the rate lane and permute.
/// No inputs hash to zero.
pub fn hash(inputs: &[FieldElement]) -> FieldElement {
    let key = Fr::zero();
    let (mut r, mut c) = (Fr::zero(), Fr::zero());
    for x in inputs {
        r += x.into_fr();
        (r, c) = permute(r, c, key);
    }
    FieldElement::from_fr(r)
}

/// Nullifier hash
pub fn hash1(a: &FieldElement) -> FieldElement {
    hash(&[*a])
}

/// Tree nodes
pub fn hash2(a: &FieldElement, b: &FieldElement) -> FieldElement {
    hash(&[*a, *b])
}

/// Commitments
pub fn hash3(a: &FieldElement, b: &FieldElement, c: &FieldElement) -> FieldElement {
    hash(&[*a, *b, *c])
}
