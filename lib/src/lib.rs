//! Commitment, Merkle and eligibility engine for zero-knowledge wills.
//!
//! A will is registered as two commitments sharing one nullifier ([`commitment`]).
//! To claim, the service rebuilds the commitment tree from ledger events
//! ([`ledger`], [`merkle`]), has the circuit proved ([`prover`]), checks the
//! expiry ([`eligibility`]) and returns the `withdrawWill` call ([`contract`]).
//! [`claim`] wires these steps together.

pub mod claim;
pub mod commitment;
pub mod contract;
pub mod eligibility;
pub mod error;
pub mod field;
pub mod hash;
pub mod ledger;
pub mod merkle;
pub mod proof;
pub mod prover;
pub mod utils;

pub use error::{Result, WillError};
pub use field::FieldElement;
