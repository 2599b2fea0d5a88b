use will_lib::proof::{CircuitInputs, ProverOutput};
use will_lib::prover::{ProverError, ProvingBackend};

/// Remote Groth16 prover speaking the snarkjs `{proof, publicSignals}` format.
pub struct HttpProver {
    client: reqwest::Client,
    url: String,
}

impl HttpProver {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/prove", base_url.trim_end_matches('/')),
        }
    }
}

impl ProvingBackend for HttpProver {
    async fn prove(&self, inputs: &CircuitInputs) -> Result<ProverOutput, ProverError> {
        let resp = self
            .client
            .post(&self.url)
            .json(inputs)
            .send()
            .await
            .map_err(|e| ProverError::ProofFailed(format!("prover HTTP request failed: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProverError::InvalidResponse(format!("reading prover response failed: {e}")))?;
        if !status.is_success() {
            return Err(ProverError::ProofFailed(format!("{status}: {text}")));
        }
        serde_json::from_str(&text)
            .map_err(|e| ProverError::InvalidResponse(format!("invalid prover response JSON: {e}")))
    }
}
