// DANS : src/constants.rs

/// Valeur rapportée pour une transaction finalisée, quel que soit le compteur RPC.
pub const MAX_CONFIRMATIONS: u64 = 32;

/// Nombre de signatures récentes surveillées sur le compte de dépôt.
pub const SIGNATURE_WINDOW: usize = 10;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
pub const SIGNATURE_POLL_INTERVAL_MS: u64 = 5_000;

/// 1 SOL = 10^9 lamports.
pub const LAMPORTS_DECIMALS: u32 = 9;

pub const SYSTEM_PROGRAM_NAME: &str = "system";
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM_NAME: &str = "spl-token";
