use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use clap::Parser;

use will_lib::claim::{ClaimConfig, DEFAULT_CREATION_VALUE};
use will_lib::eligibility::TimeUnit;
use will_lib::ledger::ScanPolicy;
use will_lib::merkle::{DEFAULT_LEVELS, MAX_LEVELS};

/// Will commitment and claim server.
///
/// Every flag can also be set through the environment or a `.env` file.
#[derive(Debug, Clone, Parser)]
#[command(name = "will-server", version)]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Ethereum JSON-RPC endpoint of the chain hosting the registry
    #[arg(long, env = "RPC_URL", default_value = "https://testnet.sapphire.oasis.io")]
    pub rpc_url: String,

    #[arg(
        long,
        env = "WILL_CONTRACT_ADDRESS",
        default_value = "0xBd2c938B9F6Bfc1A66368D08CB44dC3EB2aE27bE",
        value_parser = parse_address
    )]
    pub contract_address: Address,

    /// Base URL of the proving service
    #[arg(long, env = "PROVER_URL", default_value = "http://localhost:3001")]
    pub prover_url: String,

    #[arg(long, env = "TREE_LEVELS", default_value_t = DEFAULT_LEVELS)]
    pub tree_levels: usize,

    #[arg(long, env = "SCAN_WINDOW_SIZE", default_value_t = 100)]
    pub scan_window_size: u64,

    #[arg(long, env = "SCAN_WINDOW_COUNT", default_value_t = 10)]
    pub scan_window_count: u64,

    /// Scan from this block to the head instead of the fixed lookback
    #[arg(long, env = "SCAN_START_BLOCK")]
    pub scan_start_block: Option<u64>,

    /// Unit of the expiry stored by the registry ("s" or "ms")
    #[arg(long, env = "EXPIRY_UNIT", default_value = "ms", value_parser = parse_time_unit)]
    pub expiry_unit: TimeUnit,

    /// Wei sent with `createWill`
    #[arg(long, env = "CREATION_VALUE_WEI", default_value_t = DEFAULT_CREATION_VALUE)]
    pub creation_value_wei: u64,

    #[arg(long, env = "LEDGER_TIMEOUT_SECS", default_value_t = 30)]
    pub ledger_timeout_secs: u64,

    #[arg(long, env = "PROVER_TIMEOUT_SECS", default_value_t = 300)]
    pub prover_timeout_secs: u64,

    /// Allowed browser origin, or "*"
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,
}

fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_str(s.trim()).map_err(|e| format!("invalid address \"{s}\": {e}"))
}

fn parse_time_unit(s: &str) -> Result<TimeUnit, String> {
    s.parse().map_err(|e: will_lib::WillError| e.to_string())
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scan_policy(&self) -> ScanPolicy {
        match self.scan_start_block {
            Some(start_block) => ScanPolicy::FromBlock {
                start_block,
                window_size: self.scan_window_size,
            },
            None => ScanPolicy::Lookback {
                window_size: self.scan_window_size,
                window_count: self.scan_window_count,
            },
        }
    }

    pub fn claim_config(&self) -> Result<ClaimConfig, String> {
        if self.tree_levels == 0 || self.tree_levels > MAX_LEVELS {
            return Err(format!(
                "TREE_LEVELS must be within 1..={MAX_LEVELS}, got {}",
                self.tree_levels
            ));
        }
        if self.scan_window_size == 0 {
            return Err("SCAN_WINDOW_SIZE must be positive".into());
        }
        Ok(ClaimConfig {
            contract: self.contract_address,
            levels: self.tree_levels,
            scan: self.scan_policy(),
            expiry_unit: self.expiry_unit,
            creation_value: U256::from(self.creation_value_wei),
            ledger_timeout: Duration::from_secs(self.ledger_timeout_secs),
            prover_timeout: Duration::from_secs(self.prover_timeout_secs),
        })
    }
}
