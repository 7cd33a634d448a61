// DANS : src/payment/classifier.rs

use rust_decimal::Decimal;
use std::str::FromStr;

use super::{
    ConfirmationStatus, DepositTarget, InstructionRecord, ParsedTransaction, RawTransactionRecord,
    TokenBalance, Transaction,
};
use crate::constants::{
    LAMPORTS_DECIMALS, MAX_CONFIRMATIONS, SYSTEM_PROGRAM_ID, SYSTEM_PROGRAM_NAME, TOKEN_PROGRAM_NAME,
};

/// Verdict de la chaîne de règles pour une signature.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Accepted(Transaction),
    Rejected(RejectReason),
}

impl MatchResult {
    pub fn accepted(self) -> Option<Transaction> {
        match self {
            MatchResult::Accepted(transaction) => Some(transaction),
            MatchResult::Rejected(_) => None,
        }
    }
}

/// Pourquoi une signature n'est pas un paiement valide. Ce n'est pas une erreur :
/// la plupart des signatures observées sont du trafic sans rapport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingTransaction,
    MissingMeta,
    MissingStatus,
    MissingFeePayer,
    MissingBlockTime,
    MissingConfirmationStatus,
    InstructionCount(usize),
    UnparsedInstruction,
    WrongProgram,
    WrongInstructionType,
    WrongDestination,
    SelfTransfer,
    AccountNotFound,
    MissingBalance,
    InvalidAmount,
    NegativeAmount,
    UnconfirmedStatus,
}

macro_rules! reject {
    ($reason:expr) => {
        return MatchResult::Rejected($reason)
    };
}

/// Applique la chaîne de règles à un enregistrement brut. S'arrête à la première règle violée.
pub fn classify(record: &RawTransactionRecord, target: &DepositTarget) -> MatchResult {
    // 1. Le détail, ses métadonnées et le statut doivent exister.
    let Some(parsed) = &record.transaction else { reject!(RejectReason::MissingTransaction) };
    let Some(meta) = &parsed.meta else { reject!(RejectReason::MissingMeta) };
    let Some(status) = &record.status else { reject!(RejectReason::MissingStatus) };

    let Some(fee_payer) = parsed.account_keys.first() else { reject!(RejectReason::MissingFeePayer) };

    // 2. Heure de bloc et niveau de confirmation obligatoires.
    let Some(timestamp) = parsed.block_time else { reject!(RejectReason::MissingBlockTime) };
    let Some(confirmation_status) = status.confirmation_status else {
        reject!(RejectReason::MissingConfirmationStatus)
    };

    // 3. Exactement une instruction : on ne cherche pas un transfert au milieu d'autre chose.
    if parsed.instructions.len() != 1 {
        reject!(RejectReason::InstructionCount(parsed.instructions.len()));
    }
    let instruction = &parsed.instructions[0];

    // 4. L'instruction doit avoir été décodée par le nœud.
    let InstructionRecord::Parsed { program, program_id, .. } = instruction else {
        reject!(RejectReason::UnparsedInstruction)
    };

    // 5. Transfert vers la cible de dépôt, en SOL ou en token.
    let (pre_amount, post_amount) = match target {
        DepositTarget::Native { recipient } => {
            if program != SYSTEM_PROGRAM_NAME || program_id != SYSTEM_PROGRAM_ID {
                reject!(RejectReason::WrongProgram);
            }
            if instruction.instruction_type() != Some("transfer") {
                reject!(RejectReason::WrongInstructionType);
            }
            let recipient = recipient.to_string();
            match native_amounts(instruction, parsed, &recipient) {
                Ok(amounts) => amounts,
                Err(reason) => reject!(reason),
            }
        }
        DepositTarget::Token { account, .. } => {
            if program != TOKEN_PROGRAM_NAME || *program_id != spl_token::ID.to_string() {
                reject!(RejectReason::WrongProgram);
            }
            if !matches!(instruction.instruction_type(), Some("transfer" | "transferChecked")) {
                reject!(RejectReason::WrongInstructionType);
            }
            let account = account.to_string();
            match token_amounts(instruction, parsed, &account) {
                Ok(amounts) => amounts,
                Err(reason) => reject!(reason),
            }
        }
    };

    // 6. Un delta négatif (transfert sortant mal attribué) n'est pas un paiement.
    if post_amount < pre_amount {
        reject!(RejectReason::NegativeAmount);
    }

    // 7. Seuls `confirmed` et `finalized` sont exposés.
    let confirmations = match confirmation_status {
        ConfirmationStatus::Finalized => MAX_CONFIRMATIONS,
        ConfirmationStatus::Confirmed => status.confirmations.unwrap_or(0) as u64,
        ConfirmationStatus::Processed => reject!(RejectReason::UnconfirmedStatus),
    };

    MatchResult::Accepted(Transaction {
        fee_payer: fee_payer.clone(),
        signature: record.signature.clone(),
        amount: (post_amount - pre_amount).normalize(),
        timestamp,
        error: meta.err.clone(),
        status: confirmation_status,
        confirmations,
    })
}

/// Vérifie source/destination et retrouve l'index du compte surveillé.
fn check_transfer(
    instruction: &InstructionRecord,
    parsed: &ParsedTransaction,
    watched: &str,
) -> Result<usize, RejectReason> {
    if instruction.info_str("destination") != Some(watched) {
        return Err(RejectReason::WrongDestination);
    }
    if instruction.info_str("source") == Some(watched) {
        return Err(RejectReason::SelfTransfer);
    }
    parsed
        .account_keys
        .iter()
        .position(|key| key == watched)
        .ok_or(RejectReason::AccountNotFound)
}

fn native_amounts(
    instruction: &InstructionRecord,
    parsed: &ParsedTransaction,
    recipient: &str,
) -> Result<(Decimal, Decimal), RejectReason> {
    let index = check_transfer(instruction, parsed, recipient)?;
    let meta = parsed.meta.as_ref().ok_or(RejectReason::MissingMeta)?;

    let pre = meta.pre_balances.get(index).ok_or(RejectReason::MissingBalance)?;
    let post = meta.post_balances.get(index).ok_or(RejectReason::MissingBalance)?;

    Ok((lamports_to_sol(*pre), lamports_to_sol(*post)))
}

fn token_amounts(
    instruction: &InstructionRecord,
    parsed: &ParsedTransaction,
    account: &str,
) -> Result<(Decimal, Decimal), RejectReason> {
    let index = check_transfer(instruction, parsed, account)?;
    let meta = parsed.meta.as_ref().ok_or(RejectReason::MissingMeta)?;

    let pre = ui_amount_at(meta.pre_token_balances.as_deref(), index)?;
    let post = ui_amount_at(meta.post_token_balances.as_deref(), index)?;
    Ok((pre, post))
}

fn ui_amount_at(balances: Option<&[TokenBalance]>, index: usize) -> Result<Decimal, RejectReason> {
    let raw = balances
        .and_then(|balances| balances.iter().find(|b| usize::from(b.account_index) == index))
        .and_then(|balance| balance.ui_amount_string.as_deref())
        .filter(|raw| !raw.is_empty())
        .ok_or(RejectReason::MissingBalance)?;
    Decimal::from_str(raw).map_err(|_| RejectReason::InvalidAmount)
}

fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(lamports), LAMPORTS_DECIMALS)
}
