// DANS : src/bin/checkout_watcher.rs
//
// Caisse en ligne de commande : génère une demande de paiement à partir du .env,
// surveille la chaîne et s'arrête quand le paiement est finalisé ou refusé.

use anyhow::{Result, bail};
use paywatch::{
    config::Config,
    monitoring::{health_label, logging},
    rpc::ResilientRpcClient,
    state::{PaymentSession, PaymentStatus, TransactionStore},
    watcher::PaymentWatcher,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

async fn run_checkout(config: Config) -> Result<PaymentStatus> {
    let recipient = config.recipient_pubkey()?;
    let Some(amount) = config.payment_amount()? else {
        bail!("PAYMENT_AMOUNT doit être défini pour générer une demande de paiement");
    };

    let rpc_client = Arc::new(ResilientRpcClient::new(
        config.solana_rpc_url.clone(),
        config.rpc_max_retries,
        config.rpc_retry_delay_ms,
    ));
    let store = TransactionStore::new(config.degraded_after_failures);

    let mut session = PaymentSession::new(recipient, config.token_options()?, config.poll_interval());
    session.set_amount(Some(amount));
    session.set_label(config.payment_label.clone());
    session.set_message(config.payment_message.clone());
    session.set_memo(config.payment_memo.clone());
    if !session.generate() {
        bail!("Montant invalide : {}", amount);
    }
    info!(
        recipient = %recipient,
        amount = %amount,
        symbol = %session.symbol(),
        url = %session.url()?,
        "[Checkout] En attente du paiement..."
    );

    let shutdown = CancellationToken::new();
    let watcher = PaymentWatcher::new(rpc_client, store.clone())
        .with_signature_poll_interval(config.signature_poll_interval());
    let handle = watcher.spawn(session.subscribe(), shutdown.clone());

    let mut revisions = store.subscribe();
    let mut last_status = session.status();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("[Checkout] Interruption demandée, arrêt.");
                break;
            }
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let snapshot = store.snapshot();
        debug!(
            transactions = snapshot.transactions.len(),
            loading = snapshot.loading,
            health = health_label(snapshot.health),
            "[Checkout] Store mis à jour."
        );
        session.apply_transactions(&snapshot.transactions);
        let status = session.validate(&snapshot.transactions);

        if status != last_status {
            info!(
                from = ?last_status,
                to = ?status,
                signature = ?session.signature(),
                confirmations = session.confirmations(),
                progress = session.progress(),
                health = health_label(snapshot.health),
                "[Checkout] Changement d'état du paiement."
            );
            last_status = status;
        }

        if matches!(status, PaymentStatus::Finalized | PaymentStatus::Invalid) {
            break;
        }
    }

    shutdown.cancel();
    if let Err(e) = handle.await {
        error!("[Checkout] La surveillance s'est arrêtée sur une erreur : {:?}", e);
    }
    Ok(session.status())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup_logging();
    let config = Config::load()?;

    match run_checkout(config).await {
        Ok(PaymentStatus::Finalized) => {
            info!("[Checkout] Paiement reçu et finalisé.");
            Ok(())
        }
        Ok(status) => {
            warn!(?status, "[Checkout] Terminé sans paiement valide.");
            std::process::exit(2);
        }
        Err(e) => {
            error!("[Checkout] Échec : {:?}", e);
            std::process::exit(1);
        }
    }
}
