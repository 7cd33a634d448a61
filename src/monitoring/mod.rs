pub mod logging;

use crate::state::transaction_store::StoreHealth;

/// Libellé court de l'état de santé du store, pour les champs de log.
pub fn health_label(health: StoreHealth) -> &'static str {
    match health {
        StoreHealth::Healthy => "healthy",
        StoreHealth::Degraded { .. } => "degraded",
    }
}
