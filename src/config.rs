use crate::execution::{ComputeUnitBudgets, ConfirmationPolicy, RetryPolicy};
use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

/// Adresse par défaut du programme, surchargée par PROGRAM_ID.
pub const DEFAULT_PROGRAM_ID: &str = "4aeVqtWhrUh6wpX8acNj2hpWXKEQwxjA3PYb2sHhNyCn";

fn default_rpc_url() -> String {
    "http://127.0.0.1:8899".to_string()
}
fn default_program_id() -> String {
    DEFAULT_PROGRAM_ID.to_string()
}
fn default_rpc_max_retries() -> u8 {
    3
}
fn default_rpc_retry_delay_ms() -> u64 {
    500
}
fn default_max_send_attempts() -> u32 {
    5
}
fn default_send_retry_delay_ms() -> u64 {
    1_000
}
fn default_final_attempt_delay_ms() -> u64 {
    5_000
}
fn default_confirmation_polls() -> u32 {
    30
}
fn default_confirmation_poll_delay_ms() -> u64 {
    1_000
}
fn default_pool_store_path() -> String {
    "pools_store.json".to_string()
}

/// Lue une fois au démarrage, puis passée explicitement. Jamais modifiée ensuite.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_rpc_url")]
    pub solana_rpc_url: String,
    #[serde(default = "default_program_id")]
    pub program_id: String,
    #[serde(default)]
    pub payer_keypair_path: Option<String>,

    // Ré-essais des lectures RPC.
    #[serde(default = "default_rpc_max_retries")]
    pub rpc_max_retries: u8,
    #[serde(default = "default_rpc_retry_delay_ms")]
    pub rpc_retry_delay_ms: u64,

    // Calendrier d'envoi.
    #[serde(default = "default_max_send_attempts")]
    pub max_send_attempts: u32,
    #[serde(default = "default_send_retry_delay_ms")]
    pub send_retry_delay_ms: u64,
    #[serde(default = "default_final_attempt_delay_ms")]
    pub final_attempt_delay_ms: u64,

    #[serde(default = "default_confirmation_polls")]
    pub confirmation_polls: u32,
    #[serde(default = "default_confirmation_poll_delay_ms")]
    pub confirmation_poll_delay_ms: u64,

    /// Format `deposit=320000,swap=260000`.
    #[serde(default)]
    pub compute_unit_overrides: Option<String>,

    #[serde(default)]
    pub airdrop_fallback: bool,
    #[serde(default = "default_pool_store_path")]
    pub pool_store_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>().context("Configuration invalide dans l'environnement")?;
        config.program_id()?;
        Ok(config)
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.program_id)
            .with_context(|| format!("PROGRAM_ID invalide : '{}'", self.program_id))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_send_attempts,
            retry_delay: Duration::from_millis(self.send_retry_delay_ms),
            final_attempt_delay: Duration::from_millis(self.final_attempt_delay_ms),
        }
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            max_polls: self.confirmation_polls,
            poll_delay: Duration::from_millis(self.confirmation_poll_delay_ms),
        }
    }

    pub fn compute_budgets(&self) -> Result<ComputeUnitBudgets> {
        let budgets = ComputeUnitBudgets::default();
        match &self.compute_unit_overrides {
            Some(overrides) => Ok(budgets.with_overrides(overrides)?),
            None => Ok(budgets),
        }
    }
}
