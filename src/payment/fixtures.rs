// DANS : src/payment/fixtures.rs
//
// Transactions "jsonParsed" déjà décodées, pour les tests.

use serde_json::json;
use solana_sdk::pubkey::Pubkey;

use super::{
    ConfirmationStatus, InstructionRecord, ParsedTransaction, SignatureStatusRecord, TokenBalance,
    TransactionMeta,
};
use crate::constants::{SYSTEM_PROGRAM_ID, SYSTEM_PROGRAM_NAME, TOKEN_PROGRAM_NAME};

pub const BLOCK_TIME: i64 = 1_700_000_000;

/// `SystemProgram.transfer` de `source` vers `destination`, le destinataire à l'index 1.
pub fn native_transfer(source: &Pubkey, destination: &Pubkey, pre: u64, post: u64) -> ParsedTransaction {
    ParsedTransaction {
        block_time: Some(BLOCK_TIME),
        account_keys: vec![source.to_string(), destination.to_string(), SYSTEM_PROGRAM_ID.to_string()],
        instructions: vec![InstructionRecord::Parsed {
            program: SYSTEM_PROGRAM_NAME.to_string(),
            program_id: SYSTEM_PROGRAM_ID.to_string(),
            parsed: json!({
                "type": "transfer",
                "info": {
                    "source": source.to_string(),
                    "destination": destination.to_string(),
                    "lamports": post.saturating_sub(pre),
                }
            }),
        }],
        meta: Some(TransactionMeta {
            err: None,
            pre_balances: vec![50_000_000_000, pre, 1],
            post_balances: vec![50_000_000_000 - post.saturating_sub(pre) - 5_000, post, 1],
            pre_token_balances: Some(vec![]),
            post_token_balances: Some(vec![]),
        }),
    }
}

/// Transfert SPL de `source` (une ATA) vers `destination` (une ATA), celle-ci à l'index 2.
pub fn token_transfer(
    source: &Pubkey,
    destination: &Pubkey,
    mint: &Pubkey,
    kind: &str,
    pre: &str,
    post: &str,
) -> ParsedTransaction {
    let fee_payer = Pubkey::new_unique();
    let balance = |amount: &str| TokenBalance {
        account_index: 2,
        mint: mint.to_string(),
        ui_amount_string: Some(amount.to_string()),
    };

    ParsedTransaction {
        block_time: Some(BLOCK_TIME),
        account_keys: vec![
            fee_payer.to_string(),
            source.to_string(),
            destination.to_string(),
            spl_token::ID.to_string(),
        ],
        instructions: vec![InstructionRecord::Parsed {
            program: TOKEN_PROGRAM_NAME.to_string(),
            program_id: spl_token::ID.to_string(),
            parsed: json!({
                "type": kind,
                "info": {
                    "source": source.to_string(),
                    "destination": destination.to_string(),
                    "authority": fee_payer.to_string(),
                    "mint": mint.to_string(),
                }
            }),
        }],
        meta: Some(TransactionMeta {
            err: None,
            pre_balances: vec![5_000_000_000, 2_039_280, 2_039_280, 1],
            post_balances: vec![4_999_995_000, 2_039_280, 2_039_280, 1],
            pre_token_balances: Some(vec![balance(pre)]),
            post_token_balances: Some(vec![balance(post)]),
        }),
    }
}

pub fn status(level: ConfirmationStatus, confirmations: Option<usize>) -> SignatureStatusRecord {
    SignatureStatusRecord {
        confirmation_status: Some(level),
        confirmations,
        err: None,
    }
}

pub fn confirmed(confirmations: usize) -> SignatureStatusRecord {
    status(ConfirmationStatus::Confirmed, Some(confirmations))
}
