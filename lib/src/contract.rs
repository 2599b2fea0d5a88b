//! ABI of the will registry and the unsigned transactions handed back to the wallet.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::proof::{PublicSignals, SolidityProof};
use crate::utils::to_hex_prefixed;

sol! {
    interface IZkWill {
        function createWill(
            uint256 nullifierHash,
            string identity,
            bytes32 commitment1,
            bytes32 commitment2,
            uint256 timestamp
        ) external payable;

        function withdrawWill(
            uint256[2] a,
            uint256[2][2] b,
            uint256[2] c,
            uint256[3] input
        ) external;

        function getExpiryDate(uint256 nullifierHash) external view returns (uint256);

        event Commit(bytes32 indexed commitment, uint32 leafIndex, uint256 timestamp);
    }
}

/// Unsigned call for the wallet to sign and send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub to: String,
    /// `0x`-prefixed calldata
    pub data: String,
    /// Wei, base 10
    pub value: String,
}

impl TransactionRequest {
    fn new(to: Address, calldata: Vec<u8>, value: U256) -> Self {
        Self {
            to: to.to_checksum(None),
            data: to_hex_prefixed(&calldata),
            value: value.to_string(),
        }
    }
}

/// `createWill(nullifierHash, identity, owner, heir, timestamp)`, paying `value`.
pub fn create_will_transaction(
    contract: Address,
    identity: &str,
    owner: &Commitment,
    heir: &Commitment,
    timestamp: U256,
    value: U256,
) -> TransactionRequest {
    let call = IZkWill::createWillCall {
        nullifierHash: owner.nullifier_hash.to_u256(),
        identity: identity.to_string(),
        commitment1: B256::from(owner.commitment.to_be_bytes32()),
        commitment2: B256::from(heir.commitment.to_be_bytes32()),
        timestamp,
    };
    TransactionRequest::new(contract, call.abi_encode(), value)
}

/// `withdrawWill(a, b, c, publicSignals)` with no value attached.
pub fn withdraw_will_transaction(
    contract: Address,
    proof: &SolidityProof,
    signals: &PublicSignals,
) -> TransactionRequest {
    let call = IZkWill::withdrawWillCall {
        a: proof.a,
        b: proof.b,
        c: proof.c,
        input: signals.to_u256(),
    };
    TransactionRequest::new(contract, call.abi_encode(), U256::ZERO)
}

/// Calldata for the `getExpiryDate` view.
pub fn get_expiry_date_calldata(nullifier_hash: U256) -> Vec<u8> {
    IZkWill::getExpiryDateCall {
        nullifierHash: nullifier_hash,
    }
    .abi_encode()
}
