use thiserror::Error;

use crate::field::FieldElement;

/// Every failure the will engine can report to its caller.
#[derive(Debug, Error)]
pub enum WillError {
    /// Missing or malformed input. Not retryable.
    #[error("invalid input: {0}")]
    Validation(String),

    /// More leaves than the tree can hold; the anonymity set is exhausted.
    #[error("tree is full: {leaves} leaves exceed capacity {capacity}")]
    Capacity { leaves: usize, capacity: u64 },

    /// The commitment is not among the scanned leaves. Retry with a wider scan.
    #[error("commitment {0} not found in scanned leaves")]
    NotFound(FieldElement),

    /// The scan produced no leaves at all.
    #[error("no commitments found")]
    NoCommitments,

    /// Expiry not reached and no override. Carries the expiry for display.
    #[error("not yet expired (expires {expiry_date})")]
    NotYetEligible { expiry_date: String, raw_expiry: u64 },

    /// Ledger or prover failure, including timeouts.
    #[error("external dependency failed: {0}")]
    ExternalDependency(String),
}

impl WillError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WillError::NotFound(_) | WillError::NoCommitments | WillError::ExternalDependency(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WillError>;
