// DANS : src/rpc/mod.rs

use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::payment::{ParsedTransaction, SignatureStatusRecord};

pub mod decoding;
pub mod resilient_client;

#[cfg(test)]
pub(crate) mod mock;

pub use resilient_client::ResilientRpcClient;

/// Les quatre lectures réseau dont le moteur de paiement a besoin.
#[async_trait]
pub trait PaymentRpc: Send + Sync {
    /// Signatures les plus récentes touchant `address` (commitment `confirmed`).
    async fn get_signatures_for_address(&self, address: &Pubkey, limit: usize) -> Result<Vec<String>>;

    /// Détail décodé de chaque signature, dans l'ordre. `None` si le nœud ne la connaît pas.
    async fn get_parsed_transactions(&self, signatures: &[String]) -> Result<Vec<Option<ParsedTransaction>>>;

    /// Statut de chaque signature, en cherchant dans tout l'historique.
    async fn get_signature_statuses(&self, signatures: &[String]) -> Result<Vec<Option<SignatureStatusRecord>>>;
}
