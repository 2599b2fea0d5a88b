//! Owner and heir commitments.
//!
//! A will is a pair of commitments sharing one nullifier:
//!
//! ```text
//! owner = generate_commitment(rng, Role::Owner, None)
//! heir  = generate_commitment(rng, Role::Heir, Some(owner.nullifier))
//! ```
//!
//! Both carry the same `nullifier_hash`, which the ledger uses as the will's
//! key and as the one-time claim token. [`generate_linked_pair`] does exactly
//! the two calls above.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::field::FieldElement;
use crate::hash::{hash1, hash3};

/// Role tag folded into the commitment hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Heir = 0,
    Owner = 1,
}

impl Role {
    pub fn flag(self) -> FieldElement {
        FieldElement::from(self as u64)
    }
}

/// Preimage and public values of one commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    pub nullifier: FieldElement,
    pub secret: FieldElement,
    pub commitment: FieldElement,
    pub nullifier_hash: FieldElement,
    /// The role flag. Named `inputTimestamp` on the wire, as the circuit calls it.
    #[serde(rename = "inputTimestamp")]
    pub flag: FieldElement,
}

/// `H(nullifier, secret, flag)`
pub fn commitment_hash(
    nullifier: &FieldElement,
    secret: &FieldElement,
    flag: &FieldElement,
) -> FieldElement {
    hash3(nullifier, secret, flag)
}

/// `H(nullifier)`
pub fn nullifier_hash(nullifier: &FieldElement) -> FieldElement {
    hash1(nullifier)
}

impl Commitment {
    /// Derives the public values from a known preimage.
    pub fn from_preimage(
        nullifier: FieldElement,
        secret: FieldElement,
        flag: FieldElement,
    ) -> Self {
        Self {
            commitment: commitment_hash(&nullifier, &secret, &flag),
            nullifier_hash: nullifier_hash(&nullifier),
            nullifier,
            secret,
            flag,
        }
    }
}

/// Draws a fresh secret (and a fresh nullifier unless one is pinned) and
/// derives the commitment. Pinning the nullifier links the result to an
/// existing commitment.
pub fn generate_commitment<R: RngCore + CryptoRng>(
    rng: &mut R,
    role: Role,
    existing_nullifier: Option<FieldElement>,
) -> Commitment {
    let nullifier = match existing_nullifier {
        Some(n) => n,
        None => FieldElement::random(rng),
    };
    let secret = FieldElement::random(rng);
    Commitment::from_preimage(nullifier, secret, role.flag())
}

/// Owner commitment plus a heir commitment linked through the same nullifier.
pub fn generate_linked_pair<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> (Commitment, Commitment) {
    let owner = generate_commitment(rng, Role::Owner, None);
    let heir = generate_commitment(rng, Role::Heir, Some(owner.nullifier));
    (owner, heir)
}
