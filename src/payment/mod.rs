// DANS : src/payment/mod.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod classifier;
pub mod resolver;

#[cfg(test)]
pub(crate) mod fixtures;

pub use classifier::{MatchResult, RejectReason, classify};
pub use resolver::{DepositTarget, resolve_deposit_target};

/// Niveau de confiance du réseau pour une signature (`processed` < `confirmed` < `finalized`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Processed,
    Confirmed,
    Finalized,
}

/// Une instruction telle que renvoyée par l'encodage `jsonParsed`.
#[derive(Debug, Clone, PartialEq)]
pub enum InstructionRecord {
    /// Le nœud a reconnu le programme et décodé l'instruction.
    Parsed {
        program: String,
        program_id: String,
        parsed: Value,
    },
    /// Instruction brute ou partiellement décodée.
    Unparsed { program_id: String },
}

impl InstructionRecord {
    /// Le champ `parsed.type` (ex: "transfer", "transferChecked").
    pub fn instruction_type(&self) -> Option<&str> {
        match self {
            InstructionRecord::Parsed { parsed, .. } => parsed.get("type")?.as_str(),
            InstructionRecord::Unparsed { .. } => None,
        }
    }

    /// Un champ texte de `parsed.info` (ex: "source", "destination").
    pub fn info_str(&self, key: &str) -> Option<&str> {
        match self {
            InstructionRecord::Parsed { parsed, .. } => parsed.get("info")?.get(key)?.as_str(),
            InstructionRecord::Unparsed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: String,
    pub ui_amount_string: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionMeta {
    pub err: Option<Value>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Option<Vec<TokenBalance>>,
    pub post_token_balances: Option<Vec<TokenBalance>>,
}

/// Le détail d'une transaction, déjà extrait de la réponse RPC.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedTransaction {
    pub block_time: Option<i64>,
    pub account_keys: Vec<String>,
    pub instructions: Vec<InstructionRecord>,
    pub meta: Option<TransactionMeta>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureStatusRecord {
    pub confirmation_status: Option<ConfirmationStatus>,
    pub confirmations: Option<usize>,
    pub err: Option<Value>,
}

/// Tout ce que le réseau a renvoyé pour une signature lors d'un cycle.
/// Éphémère : reconstruit à chaque cycle, jamais mis en cache.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransactionRecord {
    pub signature: String,
    pub transaction: Option<ParsedTransaction>,
    pub status: Option<SignatureStatusRecord>,
}

/// Un paiement entrant reconnu, tel qu'exposé aux consommateurs du store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub fee_payer: String,
    pub signature: String,
    /// Quantité reçue, en unité "humaine" (SOL ou unité du token). Toujours >= 0.
    pub amount: Decimal,
    pub timestamp: i64,
    pub error: Option<Value>,
    pub status: ConfirmationStatus,
    pub confirmations: u64,
}

/// Les signatures les plus récentes du compte de dépôt, de la plus récente à la plus ancienne.
/// L'égalité est celle des séquences ordonnées.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureSet(Vec<String>);

impl SignatureSet {
    pub fn new(signatures: Vec<String>) -> Self {
        Self(signatures)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}
