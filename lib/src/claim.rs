//! The two requests the service answers: creating a will and claiming one.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commitment::{commitment_hash, generate_linked_pair, nullifier_hash, Commitment};
use crate::contract::{create_will_transaction, withdraw_will_transaction, TransactionRequest};
use crate::eligibility::{evaluate, TimeUnit, Timestamp};
use crate::error::{Result, WillError};
use crate::field::FieldElement;
use crate::ledger::{collect_leaves, with_timeout, Ledger, ScanPolicy};
use crate::merkle::{MerklePath, MerkleTree, DEFAULT_LEVELS};
use crate::proof::{CircuitInputs, PublicSignals, SolidityProof};
use crate::prover::{prove_with_timeout, ProvingBackend};

/// Deposit the registry requires with `createWill`, in wei.
pub const DEFAULT_CREATION_VALUE: u64 = 1_000_001;

#[derive(Debug, Clone)]
pub struct ClaimConfig {
    pub contract: Address,
    pub levels: usize,
    pub scan: ScanPolicy,
    /// Unit of the expiry the registry stores.
    pub expiry_unit: TimeUnit,
    pub creation_value: U256,
    pub ledger_timeout: Duration,
    pub prover_timeout: Duration,
}

impl ClaimConfig {
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            levels: DEFAULT_LEVELS,
            scan: ScanPolicy::default(),
            expiry_unit: TimeUnit::Milliseconds,
            creation_value: U256::from(DEFAULT_CREATION_VALUE),
            ledger_timeout: Duration::from_secs(30),
            prover_timeout: Duration::from_secs(300),
        }
    }
}

/// Everything the will owner must keep, plus the call that registers the will.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationBundle {
    pub owner: Commitment,
    pub heir: Commitment,
    pub transaction: TransactionRequest,
}

/// Generates the owner/heir pair and the `createWill` call for `identity`.
pub fn prepare_creation<R: RngCore + CryptoRng>(
    rng: &mut R,
    config: &ClaimConfig,
    identity: &str,
    timestamp: u64,
) -> Result<CreationBundle> {
    let identity = identity.trim();
    if identity.is_empty() {
        return Err(WillError::Validation("identity is required".into()));
    }
    if timestamp == 0 {
        return Err(WillError::Validation("timestamp is required".into()));
    }

    let (owner, heir) = generate_linked_pair(rng);
    let transaction = create_will_transaction(
        config.contract,
        identity,
        &owner,
        &heir,
        U256::from(timestamp),
        config.creation_value,
    );
    info!(nullifier_hash = %owner.nullifier_hash, timestamp, "prepared will creation");
    Ok(CreationBundle {
        owner,
        heir,
        transaction,
    })
}

/// What the claimant sends back: one of the two commitments with its preimage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPreimage {
    pub nullifier: FieldElement,
    pub secret: FieldElement,
    pub input_timestamp: FieldElement,
    pub commitment: FieldElement,
}

impl From<&Commitment> for ClaimPreimage {
    fn from(c: &Commitment) -> Self {
        Self {
            nullifier: c.nullifier,
            secret: c.secret,
            input_timestamp: c.flag,
            commitment: c.commitment,
        }
    }
}

impl ClaimPreimage {
    /// The stated commitment must be the hash of the stated preimage.
    pub fn verify_commitment(&self) -> Result<()> {
        let expected = commitment_hash(&self.nullifier, &self.secret, &self.input_timestamp);
        if expected != self.commitment {
            return Err(WillError::Validation(
                "commitment does not match nullifier, secret and inputTimestamp".into(),
            ));
        }
        Ok(())
    }
}

/// Rebuilds the tree from the ledger and assembles the circuit inputs for `preimage`.
pub async fn build_circuit_inputs<L: Ledger>(
    ledger: &L,
    config: &ClaimConfig,
    preimage: &ClaimPreimage,
) -> Result<(CircuitInputs, MerklePath)> {
    preimage.verify_commitment()?;

    let leaves = collect_leaves(ledger, &config.scan, config.ledger_timeout).await?;
    if leaves.is_empty() {
        return Err(WillError::NoCommitments);
    }

    let tree = MerkleTree::build(config.levels, &leaves)?;
    let path = tree.path(&preimage.commitment)?;
    debug_assert!(path.verify(&preimage.commitment));
    debug!(
        leaves = leaves.len(),
        leaf_index = path.leaf_index,
        root = %path.root,
        "extracted merkle path"
    );

    let inputs = CircuitInputs::new(
        preimage.nullifier,
        preimage.secret,
        preimage.input_timestamp,
        &path,
    );
    Ok((inputs, path))
}

/// Proves membership of `preimage`, checks eligibility at `now` and returns
/// the `withdrawWill` call.
///
/// A will that is neither expired nor overridden yields
/// [`WillError::NotYetEligible`] with the stored expiry.
pub async fn produce_claim<L: Ledger, P: ProvingBackend>(
    ledger: &L,
    prover: &P,
    config: &ClaimConfig,
    preimage: &ClaimPreimage,
    now: Timestamp,
) -> Result<TransactionRequest> {
    let (inputs, path) = build_circuit_inputs(ledger, config, preimage).await?;

    let output = prove_with_timeout(prover, &inputs, config.prover_timeout).await?;
    let signals = PublicSignals::parse(&output.public_signals)?;
    let expected_nullifier_hash = nullifier_hash(&preimage.nullifier);
    if signals.nullifier_hash != expected_nullifier_hash {
        warn!(
            got = %signals.nullifier_hash,
            expected = %expected_nullifier_hash,
            "prover returned a foreign nullifier hash"
        );
        return Err(WillError::ExternalDependency(
            "prover nullifier hash does not match the preimage".into(),
        ));
    }
    if signals.root != path.root {
        warn!(got = %signals.root, expected = %path.root, "prover root mismatch");
        return Err(WillError::ExternalDependency(format!(
            "prover root {} does not match rebuilt root {}",
            signals.root, path.root
        )));
    }
    let proof = SolidityProof::from_groth16(&output.proof)?;

    let raw_expiry = with_timeout(
        config.ledger_timeout,
        ledger.get_expiry_date(&signals.nullifier_hash),
    )
    .await?;
    let expiry = Timestamp::from_raw(raw_expiry, config.expiry_unit);
    let eligibility = evaluate(expiry, signals.override_set(), now);
    info!(
        nullifier_hash = %signals.nullifier_hash,
        expiry = expiry.as_secs(),
        now = now.as_secs(),
        override_flag = signals.override_set(),
        claimable = eligibility.is_claimable(),
        "evaluated claim"
    );
    eligibility.ensure_claimable(raw_expiry)?;

    Ok(withdraw_will_transaction(config.contract, &proof, &signals))
}
