// DANS : src/monitoring/logging.rs
use tracing_subscriber::EnvFilter;

/// Nos cycles de surveillance en "debug" (signatures ignorées, cycles jetés),
/// le bruit des clients HTTP/RPC coupé à "warn".
const DEFAULT_DIRECTIVES: &str = "info,paywatch=debug,checkout_watcher=debug,solana_client=warn,reqwest=warn,hyper=warn";

fn env_filter() -> EnvFilter {
    // RUST_LOG prime sur les directives par défaut.
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn setup_logging() {
    // Un objet JSON plat par événement : `deposit`, `signature`, `reason`... au premier niveau.
    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_env_filter(env_filter())
        .with_target(true)
        .init();
}
