// DANS : src/payment/resolver.rs

use anyhow::{Result, bail};
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

/// L'adresse surveillée pour détecter un paiement entrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositTarget {
    /// Paiement en SOL : on surveille directement le compte du destinataire.
    Native { recipient: Pubkey },
    /// Paiement en token SPL : on surveille l'ATA du destinataire pour ce mint.
    Token {
        recipient: Pubkey,
        mint: Pubkey,
        account: Pubkey,
    },
}

impl DepositTarget {
    pub fn address(&self) -> Pubkey {
        match self {
            DepositTarget::Native { recipient } => *recipient,
            DepositTarget::Token { account, .. } => *account,
        }
    }

    pub fn recipient(&self) -> Pubkey {
        match self {
            DepositTarget::Native { recipient } | DepositTarget::Token { recipient, .. } => *recipient,
        }
    }

    pub fn mint(&self) -> Option<Pubkey> {
        match self {
            DepositTarget::Native { .. } => None,
            DepositTarget::Token { mint, .. } => Some(*mint),
        }
    }
}

/// Calcule la cible de dépôt pour `(destinataire, token?)`. Fonction pure.
///
/// Comme pour une ATA classique, le propriétaire doit être sur la courbe ed25519 :
/// un PDA comme destinataire d'un paiement en token est refusé.
pub fn resolve_deposit_target(recipient: &Pubkey, token: Option<&Pubkey>) -> Result<DepositTarget> {
    let Some(mint) = token else {
        return Ok(DepositTarget::Native { recipient: *recipient });
    };

    if !recipient.is_on_curve() {
        bail!("Le destinataire {} n'est pas sur la courbe, impossible de dériver son ATA", recipient);
    }

    Ok(DepositTarget::Token {
        recipient: *recipient,
        mint: *mint,
        account: get_associated_token_address(recipient, mint),
    })
}
