use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{Result, WillError};
use crate::field::FieldElement;

/// One `Commit` event, as far as the tree is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitEvent {
    pub commitment: FieldElement,
    pub block_number: u64,
    pub log_index: u64,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<LedgerError> for WillError {
    fn from(e: LedgerError) -> Self {
        WillError::ExternalDependency(format!("ledger: {e}"))
    }
}

/// Read-only view of the will registry.
///
/// Implementations:
/// - `JsonRpcLedger` in the server (Ethereum JSON-RPC)
/// - in-memory ledgers in tests
pub trait Ledger: Send + Sync {
    /// Latest block number.
    fn block_number(&self) -> impl Future<Output = std::result::Result<u64, LedgerError>> + Send;

    /// `Commit` events in `[from_block, to_block]`, both inclusive.
    fn query_commit_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> impl Future<Output = std::result::Result<Vec<CommitEvent>, LedgerError>> + Send;

    /// Raw expiry stored for a will, in the registry's own unit.
    fn get_expiry_date(
        &self,
        nullifier_hash: &FieldElement,
    ) -> impl Future<Output = std::result::Result<u64, LedgerError>> + Send;
}

/// Which block ranges to scan for commitments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPolicy {
    /// `window_count` windows ending at the head, covering
    /// `head - window_size * window_count ..= head`.
    Lookback { window_size: u64, window_count: u64 },
    /// Everything from `start_block` to the head, `window_size` blocks at a time.
    FromBlock { start_block: u64, window_size: u64 },
}

impl Default for ScanPolicy {
    fn default() -> Self {
        ScanPolicy::Lookback {
            window_size: 100,
            window_count: 10,
        }
    }
}

impl ScanPolicy {
    fn validate(&self) -> Result<u64> {
        let size = match *self {
            ScanPolicy::Lookback { window_size, .. } => window_size,
            ScanPolicy::FromBlock { window_size, .. } => window_size,
        };
        if size == 0 {
            return Err(WillError::Validation("scan window size must be positive".into()));
        }
        Ok(size)
    }

    /// Inclusive, non-overlapping block ranges in increasing order, clipped at
    /// genesis and at `head`.
    ///
    /// Lookback windows end at `head`, `head - size`, `head - 2 * size`, ...;
    /// the oldest one also takes the block at `head - size * count`.
    pub fn windows(&self, head: u64) -> Result<Vec<(u64, u64)>> {
        let size = self.validate()?;
        let mut windows = Vec::new();
        match *self {
            ScanPolicy::Lookback { window_count, .. } => {
                if window_count == 0 {
                    return Ok(windows);
                }
                let mut from = head.saturating_sub(size.saturating_mul(window_count));
                // windows ending below genesis are dropped
                let oldest = (window_count - 1).min(head / size);
                for i in (0..=oldest).rev() {
                    let to = head - size * i;
                    windows.push((from, to));
                    from = to.saturating_add(1);
                }
            }
            ScanPolicy::FromBlock { start_block, .. } => {
                let mut from = start_block;
                while from <= head {
                    let to = from.saturating_add(size - 1).min(head);
                    windows.push((from, to));
                    if to == u64::MAX {
                        break;
                    }
                    from = to + 1;
                }
            }
        }
        Ok(windows)
    }
}

/// Awaits `fut`, turning an elapsed `limit` into [`LedgerError::Timeout`].
pub async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = std::result::Result<T, LedgerError>>,
) -> std::result::Result<T, LedgerError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| LedgerError::Timeout(limit))?
}

/// Collects commitments window by window, in ledger order. Leaf order fixes
/// every leaf's index, so windows are queried strictly in sequence.
pub async fn collect_leaves<L: Ledger>(
    ledger: &L,
    policy: &ScanPolicy,
    timeout: Duration,
) -> Result<Vec<FieldElement>> {
    let head = with_timeout(timeout, ledger.block_number())
        .await
        .inspect_err(|e| warn!(error = %e, "reading ledger head failed"))?;
    let mut leaves = Vec::new();
    for (from, to) in policy.windows(head)? {
        let mut events = with_timeout(timeout, ledger.query_commit_events(from, to))
            .await
            .inspect_err(|e| warn!(from, to, error = %e, "commit event query failed"))?;
        debug!(from, to, events = events.len(), "scanned commit window");
        if events.is_empty() {
            continue;
        }
        events.sort_by_key(|e| (e.block_number, e.log_index));
        leaves.extend(events.into_iter().map(|e| e.commitment));
    }
    Ok(leaves)
}
