use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::error::WillError;
use crate::proof::{CircuitInputs, ProverOutput};

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("proof generation failed: {0}")]
    ProofFailed(String),

    #[error("invalid prover response: {0}")]
    InvalidResponse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<ProverError> for WillError {
    fn from(e: ProverError) -> Self {
        WillError::ExternalDependency(format!("prover: {e}"))
    }
}

/// Port for Groth16 proof generation of the will circuit.
///
/// Implementations:
/// - `HttpProver` in the server (remote snarkjs service)
/// - canned provers in tests
pub trait ProvingBackend: Send + Sync {
    fn prove(
        &self,
        inputs: &CircuitInputs,
    ) -> impl Future<Output = Result<ProverOutput, ProverError>> + Send;
}

/// Runs `prove` under `limit`.
pub async fn prove_with_timeout<P: ProvingBackend>(
    prover: &P,
    inputs: &CircuitInputs,
    limit: Duration,
) -> Result<ProverOutput, ProverError> {
    tokio::time::timeout(limit, prover.prove(inputs))
        .await
        .map_err(|_| ProverError::Timeout(limit))?
        .inspect_err(|e| warn!(error = %e, "proof generation failed"))
}
