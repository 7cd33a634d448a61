// DANS : src/state/session.rs

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tracing::info;
use url::{Url, form_urlencoded};

use crate::constants::MAX_CONFIRMATIONS;
use crate::payment::{ConfirmationStatus, Transaction};
use crate::watcher::WatchInputs;

/// Une devise proposée au client : le SOL natif (`mint == None`) ou un token SPL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOption {
    pub symbol: String,
    pub mint: Option<Pubkey>,
}

impl TokenOption {
    pub fn native(symbol: &str) -> Self {
        Self { symbol: symbol.to_string(), mint: None }
    }

    pub fn spl(symbol: &str, mint: Pubkey) -> Self {
        Self { symbol: symbol.to_string(), mint: Some(mint) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    New,
    Pending,
    Confirmed,
    Valid,
    Invalid,
    Finalized,
}

/// L'état d'une demande de paiement. Appartient à la racine de présentation ;
/// le moteur n'en lit que le destinataire, le token et l'intervalle, via `subscribe()`.
pub struct PaymentSession {
    recipient: Pubkey,
    options: Vec<TokenOption>,
    selected: usize,
    amount: Option<Decimal>,
    message: Option<String>,
    memo: Option<String>,
    /// Nom du marchand affiché par le wallet. Conservé par `reset()`.
    label: Option<String>,
    /// Clé unique ajoutée à la requête de transfert, tirée à chaque `generate()`.
    reference: Option<Pubkey>,
    status: PaymentStatus,
    signature: Option<String>,
    confirmations: u64,
    generated_at: Option<i64>,
    inputs: watch::Sender<WatchInputs>,
}

impl PaymentSession {
    pub fn new(recipient: Pubkey, mut options: Vec<TokenOption>, poll_interval: Duration) -> Self {
        if options.is_empty() {
            options.push(TokenOption::native("SOL"));
        }
        let (inputs, _) = watch::channel(WatchInputs {
            recipient,
            token: options[0].mint,
            poll_interval,
        });
        Self {
            recipient,
            options,
            selected: 0,
            amount: None,
            message: None,
            memo: None,
            label: None,
            reference: None,
            status: PaymentStatus::New,
            signature: None,
            confirmations: 0,
            generated_at: None,
            inputs,
        }
    }

    /// Le canal d'entrées du moteur de surveillance.
    pub fn subscribe(&self) -> watch::Receiver<WatchInputs> {
        self.inputs.subscribe()
    }

    pub fn recipient(&self) -> Pubkey {
        self.recipient
    }

    pub fn token(&self) -> Option<Pubkey> {
        self.options[self.selected].mint
    }

    pub fn symbol(&self) -> &str {
        &self.options[self.selected].symbol
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }

    pub fn set_amount(&mut self, amount: Option<Decimal>) {
        self.amount = amount;
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: Option<String>) {
        self.message = message;
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn set_memo(&mut self, memo: Option<String>) {
        self.memo = memo;
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn reference(&self) -> Option<Pubkey> {
        self.reference
    }

    /// La requête de transfert Solana Pay (`solana:<destinataire>?amount=..&spl-token=..`)
    /// à afficher en QR code. Les paramètres absents sont omis.
    pub fn url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("solana:{}", self.recipient))
            .with_context(|| format!("Destinataire inutilisable dans une URL : {}", self.recipient))?;

        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(amount) = self.amount {
            query.append_pair("amount", &amount.normalize().to_string());
        }
        if let Some(mint) = self.token() {
            query.append_pair("spl-token", &mint.to_string());
        }
        if let Some(reference) = self.reference {
            query.append_pair("reference", &reference.to_string());
        }
        for (key, value) in [("label", &self.label), ("message", &self.message), ("memo", &self.memo)] {
            if let Some(value) = value {
                query.append_pair(key, value);
            }
        }

        let query = query.finish();
        if !query.is_empty() {
            url.set_query(Some(&query));
        }
        Ok(url)
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    /// La transaction retenue comme paiement, une fois trouvée.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn confirmations(&self) -> u64 {
        self.confirmations
    }

    /// Avancement de la confirmation, entre 0 et 1.
    pub fn progress(&self) -> f64 {
        (self.confirmations.min(MAX_CONFIRMATIONS) as f64) / (MAX_CONFIRMATIONS as f64)
    }

    pub fn generated_at(&self) -> Option<i64> {
        self.generated_at
    }

    /// Passe à l'option de paiement suivante (token et symbole ensemble).
    /// Sans effet une fois la demande générée.
    pub fn change_token(&mut self) -> bool {
        if self.status != PaymentStatus::New || self.options.len() < 2 {
            return false;
        }
        self.selected = (self.selected + 1) % self.options.len();
        let token = self.token();
        self.inputs.send_modify(|inputs| inputs.token = token);
        info!(symbol = %self.symbol(), "[Session] Changement de devise.");
        true
    }

    pub fn poll_interval(&self) -> Duration {
        self.inputs.borrow().poll_interval
    }

    /// Le moteur redémarre une génération avec le nouvel intervalle.
    pub fn set_poll_interval(&mut self, poll_interval: Duration) {
        self.inputs.send_if_modified(|inputs| {
            let changed = inputs.poll_interval != poll_interval;
            inputs.poll_interval = poll_interval;
            changed
        });
    }

    /// `New -> Pending`, seulement si un montant strictement positif est fixé.
    pub fn generate(&mut self) -> bool {
        let ready = self.amount.is_some_and(|amount| amount > Decimal::ZERO);
        if self.status != PaymentStatus::New || !ready {
            return false;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or_default();
        self.generated_at = Some(now);
        self.reference = Some(Keypair::new().pubkey());
        self.status = PaymentStatus::Pending;
        info!(amount = ?self.amount, symbol = %self.symbol(), "[Session] Demande de paiement générée.");
        true
    }

    pub fn reset(&mut self) {
        self.amount = None;
        self.message = None;
        self.memo = None;
        self.reference = None;
        self.signature = None;
        self.confirmations = 0;
        self.generated_at = None;
        self.status = PaymentStatus::New;
    }

    /// Suit les transactions publiées par le store.
    ///
    /// `Pending` : adopte le plus ancien paiement réussi reçu depuis `generate()` -> `Confirmed`.
    /// `Valid` : passe à `Finalized` quand la transaction adoptée est finalisée.
    pub fn apply_transactions(&mut self, transactions: &[Transaction]) -> PaymentStatus {
        match self.status {
            PaymentStatus::Pending => {
                let since = self.generated_at.unwrap_or(i64::MIN);
                // Le store est trié du plus récent au plus ancien.
                let candidate = transactions
                    .iter()
                    .rev()
                    .find(|tx| tx.error.is_none() && tx.timestamp >= since);
                if let Some(tx) = candidate {
                    info!(signature = %tx.signature, amount = %tx.amount, "[Session] Paiement détecté.");
                    self.signature = Some(tx.signature.clone());
                    self.confirmations = tx.confirmations;
                    self.status = PaymentStatus::Confirmed;
                }
            }
            PaymentStatus::Confirmed | PaymentStatus::Valid => {
                if let Some(tx) = self.tracked(transactions) {
                    self.confirmations = tx.confirmations;
                    if self.status == PaymentStatus::Valid && tx.status == ConfirmationStatus::Finalized {
                        self.status = PaymentStatus::Finalized;
                    }
                }
            }
            PaymentStatus::New | PaymentStatus::Invalid | PaymentStatus::Finalized => {}
        }
        self.status
    }

    /// `Confirmed -> Valid | Invalid` selon le montant reçu.
    pub fn validate(&mut self, transactions: &[Transaction]) -> PaymentStatus {
        if self.status != PaymentStatus::Confirmed {
            return self.status;
        }
        let Some(tx) = self.tracked(transactions) else {
            return self.status;
        };
        let requested = self.amount.unwrap_or(Decimal::ZERO);
        self.status = if tx.amount >= requested {
            PaymentStatus::Valid
        } else {
            PaymentStatus::Invalid
        };
        let finalized = tx.status == ConfirmationStatus::Finalized;
        if self.status == PaymentStatus::Valid && finalized {
            self.status = PaymentStatus::Finalized;
        }
        self.status
    }

    fn tracked<'a>(&self, transactions: &'a [Transaction]) -> Option<&'a Transaction> {
        let signature = self.signature.as_deref()?;
        transactions.iter().find(|tx| tx.signature == signature)
    }
}
