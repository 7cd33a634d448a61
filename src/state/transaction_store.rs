// DANS : src/state/transaction_store.rs

use arc_swap::ArcSwap;
use std::sync::{
    Arc,
    atomic::{AtomicU32, AtomicUsize, Ordering},
};
use tokio::sync::watch;
use tracing::{error, info};

use crate::payment::Transaction;

/// Les deux tâches périodiques du moteur. Chacune tient son propre compteur d'échecs :
/// un poll de signatures réussi ne masque pas un fetch de transactions en panne.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Signatures,
    Transactions,
}

impl CycleKind {
    fn index(self) -> usize {
        match self {
            CycleKind::Signatures => 0,
            CycleKind::Transactions => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreHealth {
    Healthy,
    /// Les derniers cycles d'une des tâches ont tous échoué : les données affichées sont périmées.
    /// `consecutive_failures` est le plus grand des deux compteurs.
    Degraded { consecutive_failures: u32 },
}

/// Ce que voit la couche de présentation à un instant donné.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub transactions: Arc<Vec<Transaction>>,
    pub loading: bool,
    pub health: StoreHealth,
}

struct StoreInner {
    transactions: ArcSwap<Vec<Transaction>>,
    in_flight: AtomicUsize,
    consecutive_failures: [AtomicU32; 2],
    degraded_after: u32,
    revision: watch::Sender<u64>,
}

/// Dernière liste de paiements reconnus + indicateur de chargement.
/// Un seul écrivain (le moteur), des lecteurs sans verrou.
#[derive(Clone)]
pub struct TransactionStore {
    inner: Arc<StoreInner>,
}

impl TransactionStore {
    /// `degraded_after` : nombre d'échecs consécutifs avant de passer en `Degraded` (0 = jamais).
    pub fn new(degraded_after: u32) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                transactions: ArcSwap::from_pointee(Vec::new()),
                in_flight: AtomicUsize::new(0),
                consecutive_failures: [AtomicU32::new(0), AtomicU32::new(0)],
                degraded_after,
                revision,
            }),
        }
    }

    pub fn transactions(&self) -> Arc<Vec<Transaction>> {
        self.inner.transactions.load_full()
    }

    pub fn loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn health(&self) -> StoreHealth {
        let failures = self.worst_failures();
        if self.is_degraded(failures) {
            StoreHealth::Degraded { consecutive_failures: failures }
        } else {
            StoreHealth::Healthy
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            transactions: self.transactions(),
            loading: self.loading(),
            health: self.health(),
        }
    }

    /// La révision change à chaque modification visible (liste, chargement, santé).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Marque un cycle comme en cours jusqu'à la destruction du guard.
    pub(crate) fn begin_cycle(&self) -> LoadingGuard {
        if self.inner.in_flight.fetch_add(1, Ordering::AcqRel) == 0 {
            self.bump();
        }
        LoadingGuard { store: self.clone() }
    }

    /// Remplace la liste. Ne notifie que si elle a réellement changé.
    pub(crate) fn publish(&self, transactions: Vec<Transaction>) -> bool {
        if **self.inner.transactions.load() == transactions {
            return false;
        }
        self.inner.transactions.store(Arc::new(transactions));
        self.bump();
        true
    }

    pub(crate) fn clear(&self) -> bool {
        self.publish(Vec::new())
    }

    /// Remet à zéro le compteur de `kind` seulement.
    pub(crate) fn record_success(&self, kind: CycleKind) {
        let was_degraded = self.is_degraded(self.worst_failures());
        let previous = self.inner.consecutive_failures[kind.index()].swap(0, Ordering::AcqRel);
        if was_degraded && !self.is_degraded(self.worst_failures()) {
            info!(cycle = ?kind, previous_failures = previous, "[Store] Le RPC répond à nouveau.");
            self.bump();
        }
    }

    pub(crate) fn record_failure(&self, kind: CycleKind) -> StoreHealth {
        let was_degraded = self.is_degraded(self.worst_failures());
        let failures = self.inner.consecutive_failures[kind.index()].fetch_add(1, Ordering::AcqRel) + 1;
        let health = self.health();
        if !was_degraded && health != StoreHealth::Healthy {
            error!(cycle = ?kind, consecutive_failures = failures, "[Store] Trop d'échecs RPC consécutifs, données dégradées.");
            self.bump();
        }
        health
    }

    fn worst_failures(&self) -> u32 {
        self.inner
            .consecutive_failures
            .iter()
            .map(|counter| counter.load(Ordering::Acquire))
            .max()
            .unwrap_or(0)
    }

    fn is_degraded(&self, failures: u32) -> bool {
        self.inner.degraded_after > 0 && failures >= self.inner.degraded_after
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }
}

pub(crate) struct LoadingGuard {
    store: TransactionStore,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.store.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.store.bump();
        }
    }
}
