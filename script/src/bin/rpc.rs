//! Ethereum JSON-RPC implementation of the ledger port.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, U256};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use will_lib::contract::{get_expiry_date_calldata, IZkWill};
use will_lib::ledger::{CommitEvent, Ledger, LedgerError};
use will_lib::utils::{to_hex32, to_hex_prefixed};
use will_lib::FieldElement;

use alloy_sol_types::SolEvent;

pub struct JsonRpcLedger {
    client: reqwest::Client,
    url: String,
    contract: Address,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    topics: Vec<String>,
    block_number: Option<String>,
    log_index: Option<String>,
    #[serde(default)]
    removed: bool,
}

fn parse_quantity(s: &str) -> Result<u64, LedgerError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::InvalidResponse(format!("quantity without 0x: {s}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::InvalidResponse(format!("bad quantity {s}: {e}")))
}

fn decode_hex(s: &str) -> Result<Vec<u8>, LedgerError> {
    hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| LedgerError::InvalidResponse(format!("bad hex {s}: {e}")))
}

/// `Commit` log to event; reorged-out logs yield `None`.
fn decode_commit_log(log: RpcLog) -> Result<Option<CommitEvent>, LedgerError> {
    if log.removed {
        return Ok(None);
    }
    let topic = log
        .topics
        .get(1)
        .ok_or_else(|| LedgerError::InvalidResponse("Commit log without commitment topic".into()))?;
    let bytes = decode_hex(topic)?;
    if bytes.len() != 32 {
        return Err(LedgerError::InvalidResponse(format!(
            "commitment topic has {} bytes",
            bytes.len()
        )));
    }
    let quantity = |q: &Option<String>| q.as_deref().map(parse_quantity).transpose();
    Ok(Some(CommitEvent {
        commitment: FieldElement::from_be_bytes_mod_order(&bytes),
        block_number: quantity(&log.block_number)?.unwrap_or_default(),
        log_index: quantity(&log.log_index)?.unwrap_or_default(),
    }))
}

/// First return word of `getExpiryDate`.
fn decode_expiry(data: &str) -> Result<u64, LedgerError> {
    let bytes = decode_hex(data)?;
    if bytes.len() < 32 {
        return Err(LedgerError::InvalidResponse(format!(
            "getExpiryDate returned {} bytes",
            bytes.len()
        )));
    }
    let value = U256::from_be_slice(&bytes[..32]);
    u64::try_from(value)
        .map_err(|_| LedgerError::InvalidResponse(format!("expiry {value} does not fit in u64")))
}

impl JsonRpcLedger {
    pub fn new(url: impl Into<String>, contract: Address) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            contract,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(format!("{method}: {e}")))?;
        let envelope: RpcResponse<T> = resp
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))?;
        if let Some(err) = envelope.error {
            return Err(LedgerError::Rpc(format!(
                "{method}: {} (code {})",
                err.message, err.code
            )));
        }
        envelope
            .result
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{method}: missing result")))
    }
}

impl Ledger for JsonRpcLedger {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        let head: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&head)
    }

    async fn query_commit_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CommitEvent>, LedgerError> {
        let filter = json!({
            "address": self.contract.to_checksum(None),
            "fromBlock": format!("{from_block:#x}"),
            "toBlock": format!("{to_block:#x}"),
            "topics": [to_hex32(&IZkWill::Commit::SIGNATURE_HASH.0)],
        });
        let logs: Vec<RpcLog> = self.call("eth_getLogs", json!([filter])).await?;
        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            if let Some(event) = decode_commit_log(log)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn get_expiry_date(&self, nullifier_hash: &FieldElement) -> Result<u64, LedgerError> {
        let data = get_expiry_date_calldata(nullifier_hash.to_u256());
        let call = json!({
            "to": self.contract.to_checksum(None),
            "data": to_hex_prefixed(&data),
        });
        let out: String = self.call("eth_call", json!([call, "latest"])).await?;
        decode_expiry(&out)
    }
}
