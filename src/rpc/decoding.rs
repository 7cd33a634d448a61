// DANS : src/rpc/decoding.rs
//
// Conversion des types "wire" de solana-transaction-status vers les
// enregistrements manipulés par le classifieur.

use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, TransactionConfirmationStatus,
    TransactionStatus, UiInstruction, UiMessage, UiParsedInstruction, UiTransactionStatusMeta,
    UiTransactionTokenBalance,
};

use crate::payment::{
    ConfirmationStatus, InstructionRecord, ParsedTransaction, SignatureStatusRecord, TokenBalance,
    TransactionMeta,
};

pub fn parsed_transaction(encoded: EncodedConfirmedTransactionWithStatusMeta) -> ParsedTransaction {
    let (account_keys, instructions) = match encoded.transaction.transaction {
        EncodedTransaction::Json(ui_transaction) => match ui_transaction.message {
            UiMessage::Parsed(message) => {
                let keys = message.account_keys.into_iter().map(|account| account.pubkey).collect::<Vec<_>>();
                let instructions = message
                    .instructions
                    .into_iter()
                    .map(|instruction| instruction_record(instruction, &keys))
                    .collect();
                (keys, instructions)
            }
            UiMessage::Raw(message) => {
                let instructions = message
                    .instructions
                    .into_iter()
                    .map(|compiled| InstructionRecord::Unparsed {
                        program_id: program_id_at(&message.account_keys, compiled.program_id_index),
                    })
                    .collect();
                (message.account_keys, instructions)
            }
        },
        // On demande toujours `jsonParsed` ; un encodage binaire ne contient rien d'exploitable.
        _ => (Vec::new(), Vec::new()),
    };

    ParsedTransaction {
        block_time: encoded.block_time,
        account_keys,
        instructions,
        meta: encoded.transaction.meta.map(transaction_meta),
    }
}

pub fn signature_status(status: TransactionStatus) -> SignatureStatusRecord {
    SignatureStatusRecord {
        confirmation_status: status.confirmation_status.map(|level| match level {
            TransactionConfirmationStatus::Processed => ConfirmationStatus::Processed,
            TransactionConfirmationStatus::Confirmed => ConfirmationStatus::Confirmed,
            TransactionConfirmationStatus::Finalized => ConfirmationStatus::Finalized,
        }),
        confirmations: status.confirmations,
        err: status.err.as_ref().and_then(|err| serde_json::to_value(err).ok()),
    }
}

fn instruction_record(instruction: UiInstruction, account_keys: &[String]) -> InstructionRecord {
    match instruction {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => InstructionRecord::Parsed {
            program: parsed.program,
            program_id: parsed.program_id,
            parsed: parsed.parsed,
        },
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(partial)) => {
            InstructionRecord::Unparsed { program_id: partial.program_id }
        }
        UiInstruction::Compiled(compiled) => InstructionRecord::Unparsed {
            program_id: program_id_at(account_keys, compiled.program_id_index),
        },
    }
}

fn program_id_at(account_keys: &[String], index: u8) -> String {
    account_keys.get(usize::from(index)).cloned().unwrap_or_default()
}

fn transaction_meta(meta: UiTransactionStatusMeta) -> TransactionMeta {
    let err = meta.err.as_ref().and_then(|err| serde_json::to_value(err).ok());
    let pre_token_balances: Option<Vec<UiTransactionTokenBalance>> = meta.pre_token_balances.into();
    let post_token_balances: Option<Vec<UiTransactionTokenBalance>> = meta.post_token_balances.into();

    TransactionMeta {
        err,
        pre_balances: meta.pre_balances,
        post_balances: meta.post_balances,
        pre_token_balances: pre_token_balances.map(token_balances),
        post_token_balances: post_token_balances.map(token_balances),
    }
}

fn token_balances(balances: Vec<UiTransactionTokenBalance>) -> Vec<TokenBalance> {
    balances
        .into_iter()
        .map(|balance| TokenBalance {
            account_index: balance.account_index,
            mint: balance.mint,
            ui_amount_string: Some(balance.ui_token_amount.ui_amount_string).filter(|s| !s.is_empty()),
        })
        .collect()
}
