// DANS : src/config.rs

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::{str::FromStr, time::Duration};

use crate::constants::{DEFAULT_POLL_INTERVAL_MS, SIGNATURE_POLL_INTERVAL_MS};
use crate::state::session::TokenOption;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub solana_rpc_url: String,
    /// Adresse du marchand qui reçoit les paiements (base58).
    pub recipient: String,
    /// Liste "SYMBOLE=MINT" séparée par des virgules. Vide = paiement en SOL uniquement.
    #[serde(default)]
    pub payment_tokens: Vec<String>,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_signature_poll_interval_ms")]
    pub signature_poll_interval_ms: u64,
    #[serde(default = "default_rpc_max_retries")]
    pub rpc_max_retries: u8,
    #[serde(default = "default_rpc_retry_delay_ms")]
    pub rpc_retry_delay_ms: u64,
    #[serde(default = "default_degraded_after_failures")]
    pub degraded_after_failures: u32,
    pub payment_amount: Option<String>,
    /// Nom du marchand affiché par le wallet.
    pub payment_label: Option<String>,
    pub payment_message: Option<String>,
    pub payment_memo: Option<String>,
}

fn default_native_symbol() -> String {
    "SOL".to_string()
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_signature_poll_interval_ms() -> u64 {
    SIGNATURE_POLL_INTERVAL_MS
}
fn default_rpc_max_retries() -> u8 {
    2
}
fn default_rpc_retry_delay_ms() -> u64 {
    250
}
fn default_degraded_after_failures() -> u32 {
    5
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()?;
        Ok(config)
    }

    pub fn recipient_pubkey(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.recipient)
            .with_context(|| format!("RECIPIENT invalide : '{}'", self.recipient))
    }

    /// Les options de paiement proposées, le token natif toujours en premier.
    pub fn token_options(&self) -> Result<Vec<TokenOption>> {
        let mut options = vec![TokenOption::native(&self.native_symbol)];
        for entry in &self.payment_tokens {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((symbol, mint)) = entry.split_once('=') else {
                bail!("PAYMENT_TOKENS : entrée '{}' attendue au format SYMBOLE=MINT", entry);
            };
            let mint = Pubkey::from_str(mint.trim())
                .with_context(|| format!("PAYMENT_TOKENS : mint invalide pour {}", symbol))?;
            options.push(TokenOption::spl(symbol.trim(), mint));
        }
        Ok(options)
    }

    pub fn payment_amount(&self) -> Result<Option<Decimal>> {
        self.payment_amount
            .as_deref()
            .map(|raw| {
                Decimal::from_str(raw.trim())
                    .with_context(|| format!("PAYMENT_AMOUNT invalide : '{}'", raw))
            })
            .transpose()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn signature_poll_interval(&self) -> Duration {
        Duration::from_millis(self.signature_poll_interval_ms)
    }
}
