// DANS : src/watcher/mod.rs

use solana_sdk::pubkey::Pubkey;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::constants::{SIGNATURE_POLL_INTERVAL_MS, SIGNATURE_WINDOW};
use crate::payment::{DepositTarget, SignatureSet, resolve_deposit_target};
use crate::rpc::PaymentRpc;
use crate::state::TransactionStore;

pub mod signature_poller;
pub mod transaction_fetcher;


pub use signature_poller::SignaturePoller;
pub use transaction_fetcher::{CycleOutcome, TransactionFetcher};

/// Ce que le moteur lit de la session de paiement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchInputs {
    pub recipient: Pubkey,
    pub token: Option<Pubkey>,
    /// Intervalle entre deux cycles de classification.
    pub poll_interval: Duration,
}

/// Superviseur des deux tâches périodiques (signatures puis transactions).
///
/// Chaque changement d'entrées ouvre une nouvelle "génération" : jeton d'annulation
/// enfant, nouvelle cible de dépôt, nouveau canal de signatures. La génération
/// précédente est annulée et attendue avant de démarrer la suivante.
pub struct PaymentWatcher {
    rpc: Arc<dyn PaymentRpc>,
    store: TransactionStore,
    signature_poll_interval: Duration,
}

impl PaymentWatcher {
    pub fn new(rpc: Arc<dyn PaymentRpc>, store: TransactionStore) -> Self {
        Self {
            rpc,
            store,
            signature_poll_interval: Duration::from_millis(SIGNATURE_POLL_INTERVAL_MS),
        }
    }

    pub fn with_signature_poll_interval(mut self, interval: Duration) -> Self {
        self.signature_poll_interval = interval;
        self
    }

    /// Démarre la boucle du superviseur dans une nouvelle tâche Tokio.
    pub fn spawn(self, inputs: watch::Receiver<WatchInputs>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("[Watcher] Démarrage de la surveillance des paiements.");
            self.run(inputs, shutdown).await;
            info!("[Watcher] Surveillance arrêtée.");
        })
    }

    pub async fn run(self, mut inputs: watch::Receiver<WatchInputs>, shutdown: CancellationToken) {
        let mut last_target: Option<DepositTarget> = None;

        loop {
            let current = inputs.borrow_and_update().clone();
            let generation = shutdown.child_token();

            let target = match resolve_deposit_target(&current.recipient, current.token.as_ref()) {
                Ok(target) => Some(target),
                Err(e) => {
                    warn!(error = %e, "[Watcher] Dérivation de la cible impossible, surveillance suspendue.");
                    None
                }
            };

            if target != last_target {
                self.store.clear();
                last_target = target;
            }

            let tasks = match target {
                Some(target) => self.start_generation(target, &current, &generation),
                None => Vec::new(),
            };

            let keep_running = tokio::select! {
                _ = shutdown.cancelled() => false,
                changed = inputs.changed() => changed.is_ok(),
            };

            generation.cancel();
            for task in tasks {
                if let Err(e) = task.await {
                    error!(error = %e, "[Watcher] Une tâche de surveillance a paniqué.");
                }
            }

            if !keep_running {
                break;
            }
        }
    }

    fn start_generation(
        &self,
        target: DepositTarget,
        inputs: &WatchInputs,
        generation: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        info!(
            deposit = %target.address(),
            mint = ?target.mint(),
            poll_interval_ms = inputs.poll_interval.as_millis() as u64,
            "[Watcher] Nouvelle cible de dépôt."
        );

        let (signatures_tx, signatures_rx) = watch::channel(SignatureSet::default());

        let poller = SignaturePoller::new(
            self.rpc.clone(),
            self.store.clone(),
            target.address(),
            self.signature_poll_interval,
            SIGNATURE_WINDOW,
            generation.clone(),
            signatures_tx,
        );
        let fetcher = TransactionFetcher::new(
            self.rpc.clone(),
            self.store.clone(),
            target,
            inputs.poll_interval,
            generation.clone(),
            signatures_rx,
        );

        vec![tokio::spawn(poller.run()), tokio::spawn(fetcher.run())]
    }
}
