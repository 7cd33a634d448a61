// DANS : src/watcher/signature_poller.rs

use solana_sdk::pubkey::Pubkey;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::payment::SignatureSet;
use crate::rpc::PaymentRpc;
use crate::state::{CycleKind, TransactionStore};

/// Tient à jour les signatures les plus récentes du compte de dépôt.
pub struct SignaturePoller {
    rpc: Arc<dyn PaymentRpc>,
    store: TransactionStore,
    address: Pubkey,
    interval: Duration,
    window: usize,
    cancel: CancellationToken,
    signatures: watch::Sender<SignatureSet>,
}

impl SignaturePoller {
    pub fn new(
        rpc: Arc<dyn PaymentRpc>,
        store: TransactionStore,
        address: Pubkey,
        interval: Duration,
        window: usize,
        cancel: CancellationToken,
        signatures: watch::Sender<SignatureSet>,
    ) -> Self {
        Self { rpc, store, address, interval, window, cancel, signatures }
    }

    /// Interroge immédiatement puis à chaque tick, jusqu'à l'annulation.
    /// Un tick manqué pendant un appel lent est sauté : jamais deux appels simultanés.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.poll_once().await;
        }

        self.signatures.send_replace(SignatureSet::default());
        debug!(deposit = %self.address, "[SignaturePoller] Arrêt, liste de signatures vidée.");
    }

    /// Un cycle. Retourne `true` si la liste publiée a changé.
    pub async fn poll_once(&self) -> bool {
        let _loading = self.store.begin_cycle();

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            result = self.rpc.get_signatures_for_address(&self.address, self.window) => result,
        };
        if self.cancel.is_cancelled() {
            return false;
        }

        match result {
            Ok(signatures) => {
                self.store.record_success(CycleKind::Signatures);
                let next = SignatureSet::new(signatures);
                // Même séquence : on garde la valeur actuelle, pas de notification.
                self.signatures.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    debug!(deposit = %self.address, count = next.len(), "[SignaturePoller] Nouvelles signatures.");
                    *current = next;
                    true
                })
            }
            Err(e) => {
                let health = self.store.record_failure(CycleKind::Signatures);
                warn!(deposit = %self.address, error = %e, ?health, "[SignaturePoller] Échec de getSignaturesForAddress, on réessaie au prochain tick.");
                false
            }
        }
    }
}
