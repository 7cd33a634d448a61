// DANS : src/watcher/transaction_fetcher.rs

use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::payment::{DepositTarget, MatchResult, RawTransactionRecord, SignatureSet, classify};
use crate::rpc::PaymentRpc;
use crate::state::{CycleKind, TransactionStore};

/// Résultat d'un cycle de récupération + classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Le store a reçu la liste classée (`changed == false` si identique à la précédente).
    Published { accepted: usize, changed: bool },
    /// Les entrées ont changé pendant le cycle : résultat jeté.
    Discarded,
    /// Erreur réseau : sortie précédente conservée, nouvel essai au prochain tick.
    Failed,
}

/// Récupère et classe périodiquement les transactions des signatures connues.
pub struct TransactionFetcher {
    rpc: Arc<dyn PaymentRpc>,
    store: TransactionStore,
    target: DepositTarget,
    interval: Duration,
    cancel: CancellationToken,
    signatures: watch::Receiver<SignatureSet>,
}

impl TransactionFetcher {
    pub fn new(
        rpc: Arc<dyn PaymentRpc>,
        store: TransactionStore,
        target: DepositTarget,
        interval: Duration,
        cancel: CancellationToken,
        signatures: watch::Receiver<SignatureSet>,
    ) -> Self {
        Self { rpc, store, target, interval, cancel, signatures }
    }

    /// Chaque nouvelle liste de signatures relance l'intervalle avec un cycle immédiat.
    /// Rien n'est fait tant que la liste est vide.
    pub async fn run(mut self) {
        loop {
            let signatures = self.signatures.borrow_and_update().clone();

            if signatures.is_empty() {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return,
                    changed = self.signatures.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        continue;
                    }
                }
            }

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return,
                    changed = self.signatures.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        break;
                    }
                    _ = ticker.tick() => {
                        self.fetch_cycle(&signatures).await;
                    }
                }
            }
        }
    }

    /// Les deux lots (détails + statuts) sont demandés ensemble et doivent réussir ensemble.
    pub async fn fetch_cycle(&self, signatures: &SignatureSet) -> CycleOutcome {
        let _loading = self.store.begin_cycle();

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return CycleOutcome::Discarded,
            fetched = async {
                tokio::try_join!(
                    self.rpc.get_parsed_transactions(signatures.as_slice()),
                    self.rpc.get_signature_statuses(signatures.as_slice()),
                )
            } => fetched,
        };

        if !self.is_current() {
            debug!("[Fetcher] Entrées modifiées pendant le cycle, résultat ignoré.");
            return CycleOutcome::Discarded;
        }

        let (transactions, statuses) = match fetched {
            Ok(batches) => batches,
            Err(e) => {
                let health = self.store.record_failure(CycleKind::Transactions);
                warn!(error = %e, ?health, "[Fetcher] Échec de la récupération des transactions, on réessaie au prochain tick.");
                return CycleOutcome::Failed;
            }
        };
        self.store.record_success(CycleKind::Transactions);

        let mut transactions = transactions.into_iter();
        let mut statuses = statuses.into_iter();
        let mut accepted = Vec::with_capacity(signatures.len());

        for signature in signatures.iter() {
            let record = RawTransactionRecord {
                signature: signature.clone(),
                transaction: transactions.next().flatten(),
                status: statuses.next().flatten(),
            };
            match classify(&record, &self.target) {
                MatchResult::Accepted(transaction) => accepted.push(transaction),
                MatchResult::Rejected(reason) => {
                    debug!(signature = %signature, ?reason, "[Fetcher] Signature ignorée.");
                }
            }
        }

        let count = accepted.len();
        let changed = self.store.publish(accepted);
        if changed {
            info!(accepted = count, "[Fetcher] Liste des paiements mise à jour.");
        }
        CycleOutcome::Published { accepted: count, changed }
    }

    /// Faux dès que la génération est annulée ou qu'une nouvelle liste de signatures est arrivée.
    fn is_current(&self) -> bool {
        !self.cancel.is_cancelled() && !self.signatures.has_changed().unwrap_or(true)
    }
}
