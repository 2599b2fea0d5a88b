use std::time::Duration;

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use rand::rngs::StdRng;
use rand::SeedableRng;

use will_lib::claim::{
    build_circuit_inputs, prepare_creation, produce_claim, ClaimConfig, ClaimPreimage,
};
use will_lib::commitment::{commitment_hash, nullifier_hash, Commitment};
use will_lib::contract::IZkWill;
use will_lib::eligibility::Timestamp;
use will_lib::ledger::{CommitEvent, Ledger, LedgerError, ScanPolicy};
use will_lib::merkle::{MerklePath, MerkleTree};
use will_lib::proof::{CircuitInputs, Groth16Proof, ProverOutput};
use will_lib::prover::{ProverError, ProvingBackend};
use will_lib::{FieldElement, WillError};

const NOW: u64 = 1_700_000_000;

struct MemoryLedger {
    head: u64,
    events: Vec<CommitEvent>,
    /// milliseconds, like the deployed registry
    expiry_ms: u64,
    broken: bool,
}

impl MemoryLedger {
    fn new(head: u64, expiry_ms: u64) -> Self {
        Self {
            head,
            events: Vec::new(),
            expiry_ms,
            broken: false,
        }
    }

    fn push(&mut self, block_number: u64, log_index: u64, commitment: FieldElement) {
        self.events.push(CommitEvent {
            commitment,
            block_number,
            log_index,
        });
    }
}

impl Ledger for MemoryLedger {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        if self.broken {
            return Err(LedgerError::Rpc("connection refused".into()));
        }
        Ok(self.head)
    }

    async fn query_commit_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CommitEvent>, LedgerError> {
        // reversed to make sure the scanner orders by (block, log index)
        Ok(self
            .events
            .iter()
            .rev()
            .filter(|e| (from_block..=to_block).contains(&e.block_number))
            .copied()
            .collect())
    }

    async fn get_expiry_date(&self, _nullifier_hash: &FieldElement) -> Result<u64, LedgerError> {
        Ok(self.expiry_ms)
    }
}

/// Answers like the real circuit would, without proving anything.
struct EchoProver {
    override_flag: bool,
    wrong_root: bool,
    wrong_nullifier_hash: bool,
    delay: Option<Duration>,
}

impl EchoProver {
    fn new() -> Self {
        Self {
            override_flag: false,
            wrong_root: false,
            wrong_nullifier_hash: false,
            delay: None,
        }
    }
}

impl ProvingBackend for EchoProver {
    async fn prove(&self, inputs: &CircuitInputs) -> Result<ProverOutput, ProverError> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let leaf = commitment_hash(&inputs.nullifier, &inputs.secret, &inputs.input_timestamp);
        let path = MerklePath {
            leaf_index: 0,
            path_elements: inputs.path_elements.clone(),
            path_indices: inputs.path_indices.clone(),
            root: FieldElement::zero(),
        };
        let mut root = path.compute_root(&leaf);
        if self.wrong_root {
            root = FieldElement::from(1);
        }
        let mut nh = nullifier_hash(&inputs.nullifier);
        if self.wrong_nullifier_hash {
            nh = nullifier_hash(&FieldElement::from(7));
        }
        let s = |v: &str| v.to_string();
        Ok(ProverOutput {
            proof: Groth16Proof {
                pi_a: vec![s("1"), s("2"), s("1")],
                pi_b: vec![vec![s("3"), s("4")], vec![s("5"), s("6")], vec![s("1"), s("0")]],
                pi_c: vec![s("7"), s("8"), s("1")],
                protocol: Some(s("groth16")),
                curve: Some(s("bn128")),
            },
            public_signals: vec![
                nh.to_string(),
                root.to_string(),
                if self.override_flag { s("1") } else { s("0") },
            ],
        })
    }
}

fn config() -> ClaimConfig {
    let mut config = ClaimConfig::new(Address::repeat_byte(0xaa));
    config.ledger_timeout = Duration::from_secs(5);
    config.prover_timeout = Duration::from_secs(5);
    config
}

/// A registered will plus unrelated commitments around it.
fn setup(expiry_ms: u64) -> (MemoryLedger, Commitment, Commitment) {
    let mut rng = StdRng::seed_from_u64(42);
    let bundle = prepare_creation(&mut rng, &config(), "alice", NOW * 1000).unwrap();
    let mut ledger = MemoryLedger::new(5_000, expiry_ms);
    ledger.push(4_100, 0, FieldElement::from(111));
    ledger.push(4_500, 0, bundle.owner.commitment);
    ledger.push(4_500, 1, bundle.heir.commitment);
    ledger.push(4_900, 3, FieldElement::from(222));
    (ledger, bundle.owner, bundle.heir)
}

#[tokio::test]
async fn test_expired_will_is_claimable_by_heir() {
    let (ledger, _owner, heir) = setup((NOW - 60) * 1000);
    let tx = produce_claim(
        &ledger,
        &EchoProver::new(),
        &config(),
        &ClaimPreimage::from(&heir),
        Timestamp::from_secs(NOW),
    )
    .await
    .unwrap();

    assert_eq!(tx.value, "0");
    let data = hex::decode(tx.data.trim_start_matches("0x")).unwrap();
    assert_eq!(data[..4], IZkWill::withdrawWillCall::SELECTOR);
}

#[tokio::test]
async fn test_unexpired_will_is_rejected_with_expiry() {
    let expiry_ms = (NOW + 3_600) * 1000;
    let (ledger, owner, _heir) = setup(expiry_ms);
    let err = produce_claim(
        &ledger,
        &EchoProver::new(),
        &config(),
        &ClaimPreimage::from(&owner),
        Timestamp::from_secs(NOW),
    )
    .await
    .unwrap_err();

    match err {
        WillError::NotYetEligible {
            raw_expiry,
            expiry_date,
        } => {
            assert_eq!(raw_expiry, expiry_ms);
            assert_eq!(expiry_date, Timestamp::from_secs(NOW + 3_600).to_display());
        }
        other => panic!("expected NotYetEligible, got {other:?}"),
    }
}

#[tokio::test]
async fn test_override_flag_releases_early() {
    let (ledger, owner, _heir) = setup((NOW + 3_600) * 1000);
    let prover = EchoProver {
        override_flag: true,
        ..EchoProver::new()
    };
    let result = produce_claim(
        &ledger,
        &prover,
        &config(),
        &ClaimPreimage::from(&owner),
        Timestamp::from_secs(NOW),
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_circuit_inputs_follow_ledger_order() {
    let (ledger, owner, heir) = setup(0);
    let (inputs, path) = build_circuit_inputs(&ledger, &config(), &ClaimPreimage::from(&heir))
        .await
        .unwrap();

    // leaves: 111, owner, heir, 222
    assert_eq!(path.leaf_index, 2);
    assert_eq!(inputs.path_indices.len(), 20);
    assert_eq!(inputs.path_indices[..2], [0, 1]);
    assert_eq!(inputs.path_elements[0], FieldElement::from(222));
    assert_eq!(inputs.input_timestamp, FieldElement::zero());

    let tree = MerkleTree::build(
        20,
        &[FieldElement::from(111), owner.commitment, heir.commitment, FieldElement::from(222)],
    )
    .unwrap();
    assert_eq!(path.root, tree.root());
}

#[tokio::test]
async fn test_commitment_outside_scan_is_not_found() {
    let (mut ledger, owner, _heir) = setup(0);
    ledger.events.retain(|e| e.commitment != owner.commitment);
    ledger.push(100, 0, owner.commitment);

    let err = build_circuit_inputs(&ledger, &config(), &ClaimPreimage::from(&owner))
        .await
        .unwrap_err();
    assert!(matches!(err, WillError::NotFound(c) if c == owner.commitment));
    assert!(err.is_retryable());

    let mut wide = config();
    wide.scan = ScanPolicy::FromBlock {
        start_block: 0,
        window_size: 1_000,
    };
    let (_, path) = build_circuit_inputs(&ledger, &wide, &ClaimPreimage::from(&owner))
        .await
        .unwrap();
    assert_eq!(path.leaf_index, 0);
}

#[tokio::test]
async fn test_default_scan_reaches_oldest_lookback_block() {
    let (mut ledger, owner, _heir) = setup(0);
    ledger.events.retain(|e| e.commitment != owner.commitment);
    // head 5000, 10 windows of 100 blocks
    ledger.push(4_000, 0, owner.commitment);
    ledger.push(3_999, 0, FieldElement::from(333));

    let (_, path) = build_circuit_inputs(&ledger, &config(), &ClaimPreimage::from(&owner))
        .await
        .unwrap();
    assert_eq!(path.leaf_index, 0);
}

#[tokio::test]
async fn test_empty_ledger() {
    let (_, owner, _) = setup(0);
    let ledger = MemoryLedger::new(5_000, 0);
    let err = build_circuit_inputs(&ledger, &config(), &ClaimPreimage::from(&owner))
        .await
        .unwrap_err();
    assert!(matches!(err, WillError::NoCommitments));
}

#[tokio::test]
async fn test_anonymity_set_exhausted() {
    let (mut ledger, owner, _) = setup(0);
    for i in 0..8 {
        ledger.push(4_950, i, FieldElement::from(1_000 + i));
    }
    let mut small = config();
    small.levels = 3;
    let err = build_circuit_inputs(&ledger, &small, &ClaimPreimage::from(&owner))
        .await
        .unwrap_err();
    assert!(matches!(err, WillError::Capacity { leaves: 12, capacity: 8 }));
}

#[tokio::test]
async fn test_ledger_failure_is_external() {
    let (mut ledger, owner, _) = setup(0);
    ledger.broken = true;
    let err = build_circuit_inputs(&ledger, &config(), &ClaimPreimage::from(&owner))
        .await
        .unwrap_err();
    assert!(matches!(err, WillError::ExternalDependency(_)));
}

#[tokio::test]
async fn test_inconsistent_prover_output_rejected() {
    let (ledger, owner, _) = setup(0);
    let prover = EchoProver {
        wrong_root: true,
        ..EchoProver::new()
    };
    let err = produce_claim(
        &ledger,
        &prover,
        &config(),
        &ClaimPreimage::from(&owner),
        Timestamp::from_secs(NOW),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WillError::ExternalDependency(_)));
}

#[tokio::test]
async fn test_foreign_nullifier_hash_rejected() {
    let (ledger, owner, _) = setup((NOW - 60) * 1000);
    let prover = EchoProver {
        wrong_nullifier_hash: true,
        ..EchoProver::new()
    };
    let err = produce_claim(
        &ledger,
        &prover,
        &config(),
        &ClaimPreimage::from(&owner),
        Timestamp::from_secs(NOW),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WillError::ExternalDependency(ref m) if m.contains("nullifier hash")));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_prover_timeout() {
    let (ledger, owner, _) = setup(0);
    let prover = EchoProver {
        delay: Some(Duration::from_millis(500)),
        ..EchoProver::new()
    };
    let mut cfg = config();
    cfg.prover_timeout = Duration::from_millis(20);
    let err = produce_claim(
        &ledger,
        &prover,
        &cfg,
        &ClaimPreimage::from(&owner),
        Timestamp::from_secs(NOW),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WillError::ExternalDependency(ref m) if m.contains("timed out")));
}

#[tokio::test]
async fn test_forged_preimage_rejected_before_scan() {
    let (mut ledger, owner, _) = setup(0);
    ledger.broken = true;
    let mut preimage = ClaimPreimage::from(&owner);
    preimage.input_timestamp = FieldElement::zero();
    let err = build_circuit_inputs(&ledger, &config(), &preimage)
        .await
        .unwrap_err();
    assert!(matches!(err, WillError::Validation(_)));
}
