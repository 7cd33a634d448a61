// src/lib.rs

// On déclare tous nos modules principaux pour les rendre publics et
// utilisables par le binaire (checkout_watcher.rs).
pub mod config;
pub mod constants;
pub mod payment;
pub mod rpc;
pub mod state;
pub mod watcher;
pub mod monitoring;
