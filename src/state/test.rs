use rust_decimal_macros::dec;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

use super::{PaymentSession, PaymentStatus, TokenOption};
use crate::constants::MAX_CONFIRMATIONS;
use crate::payment::{ConfirmationStatus, Transaction};

fn session_with_usdc() -> (PaymentSession, Pubkey) {
    let mint = Pubkey::new_unique();
    let session = PaymentSession::new(
        Pubkey::new_unique(),
        vec![TokenOption::native("SOL"), TokenOption::spl("USDC", mint)],
        Duration::from_secs(10),
    );
    (session, mint)
}

fn payment(signature: &str, amount: rust_decimal::Decimal, timestamp: i64, status: ConfirmationStatus) -> Transaction {
    Transaction {
        fee_payer: "payer".to_string(),
        signature: signature.to_string(),
        amount,
        timestamp,
        error: None,
        status,
        confirmations: if status == ConfirmationStatus::Finalized { MAX_CONFIRMATIONS } else { 3 },
    }
}

#[test]
fn change_token_cycles_options_and_notifies_the_watcher() {
    let (mut session, mint) = session_with_usdc();
    let mut inputs = session.subscribe();
    assert_eq!(session.symbol(), "SOL");
    assert_eq!(inputs.borrow_and_update().token, None);

    assert!(session.change_token());
    assert_eq!(session.symbol(), "USDC");
    assert_eq!(session.token(), Some(mint));
    assert!(inputs.has_changed().unwrap());
    assert_eq!(inputs.borrow_and_update().token, Some(mint));

    assert!(session.change_token());
    assert_eq!(session.symbol(), "SOL");
    assert_eq!(session.token(), None);
}

#[test]
fn generate_requires_a_positive_amount() {
    let (mut session, _) = session_with_usdc();
    assert!(!session.generate());
    assert_eq!(session.status(), PaymentStatus::New);

    session.set_amount(Some(dec!(0)));
    assert!(!session.generate());

    session.set_amount(Some(dec!(1.5)));
    assert!(session.generate());
    assert_eq!(session.status(), PaymentStatus::Pending);
    assert!(session.generated_at().is_some());

    // Plus de changement de devise une fois la demande affichée.
    assert!(!session.change_token());
}

#[test]
fn reset_returns_to_new() {
    let (mut session, _) = session_with_usdc();
    session.set_amount(Some(dec!(2)));
    session.set_message(Some("Café".to_string()));
    session.set_memo(Some("table 4".to_string()));
    session.generate();

    session.reset();
    assert_eq!(session.status(), PaymentStatus::New);
    assert_eq!(session.amount(), None);
    assert_eq!(session.message(), None);
    assert_eq!(session.memo(), None);
    assert_eq!(session.signature(), None);
    assert_eq!(session.generated_at(), None);
}

#[test]
fn pending_payment_goes_through_confirmed_valid_finalized() {
    let (mut session, _) = session_with_usdc();
    session.set_amount(Some(dec!(2)));
    session.generate();
    let since = session.generated_at().unwrap();

    let old = payment("OLD", dec!(2), since - 600, ConfirmationStatus::Finalized);
    let new = payment("NEW", dec!(2), since + 5, ConfirmationStatus::Confirmed);
    let list = vec![new.clone(), old.clone()];

    assert_eq!(session.apply_transactions(&list), PaymentStatus::Confirmed);
    assert_eq!(session.signature(), Some("NEW"));
    assert_eq!(session.confirmations(), 3);

    assert_eq!(session.validate(&list), PaymentStatus::Valid);

    let finalized = vec![payment("NEW", dec!(2), since + 5, ConfirmationStatus::Finalized), old];
    assert_eq!(session.apply_transactions(&finalized), PaymentStatus::Finalized);
    assert_eq!(session.confirmations(), MAX_CONFIRMATIONS);
    assert_eq!(session.progress(), 1.0);
}

#[test]
fn underpayment_is_invalid() {
    let (mut session, _) = session_with_usdc();
    session.set_amount(Some(dec!(5)));
    session.generate();
    let since = session.generated_at().unwrap();

    let list = vec![payment("LOW", dec!(4.99), since + 1, ConfirmationStatus::Confirmed)];
    session.apply_transactions(&list);
    assert_eq!(session.validate(&list), PaymentStatus::Invalid);

    // Terminal.
    let more = vec![payment("LOW", dec!(4.99), since + 1, ConfirmationStatus::Finalized)];
    assert_eq!(session.apply_transactions(&more), PaymentStatus::Invalid);
}

#[test]
fn failed_transactions_are_not_adopted() {
    let (mut session, _) = session_with_usdc();
    session.set_amount(Some(dec!(1)));
    session.generate();
    let since = session.generated_at().unwrap();

    let mut failed = payment("FAIL", dec!(1), since + 1, ConfirmationStatus::Confirmed);
    failed.error = Some(serde_json::json!({ "InstructionError": [0, "Custom"] }));

    assert_eq!(session.apply_transactions(&[failed]), PaymentStatus::Pending);
    assert_eq!(session.signature(), None);
}

#[test]
fn oldest_qualifying_payment_is_adopted() {
    let (mut session, _) = session_with_usdc();
    session.set_amount(Some(dec!(1)));
    session.generate();
    let since = session.generated_at().unwrap();

    let list = vec![
        payment("SECOND", dec!(1), since + 20, ConfirmationStatus::Confirmed),
        payment("FIRST", dec!(1), since + 10, ConfirmationStatus::Confirmed),
    ];
    session.apply_transactions(&list);
    assert_eq!(session.signature(), Some("FIRST"));
}

// --- Requête de transfert ---

#[test]
fn native_url_carries_amount_reference_and_encoded_texts() {
    let recipient = Pubkey::new_unique();
    let mut session = PaymentSession::new(recipient, vec![TokenOption::native("SOL")], Duration::from_secs(10));
    session.set_amount(Some(dec!(1.50)));
    session.set_label(Some("Boutique".to_string()));
    session.set_message(Some("Merci beaucoup !".to_string()));
    session.set_memo(Some("commande#42".to_string()));

    // Pas de référence avant la génération.
    assert_eq!(
        session.url().unwrap().as_str(),
        format!("solana:{recipient}?amount=1.5&label=Boutique&message=Merci+beaucoup+%21&memo=commande%2342")
    );

    session.generate();
    let reference = session.reference().unwrap();
    assert_eq!(
        session.url().unwrap().as_str(),
        format!(
            "solana:{recipient}?amount=1.5&reference={reference}&label=Boutique&message=Merci+beaucoup+%21&memo=commande%2342"
        )
    );
}

#[test]
fn token_url_names_the_mint() {
    let (mut session, mint) = session_with_usdc();
    let recipient = session.recipient();
    session.change_token();
    session.set_amount(Some(dec!(5.25)));
    session.generate();
    let reference = session.reference().unwrap();

    let url = session.url().unwrap();
    assert_eq!(url.scheme(), "solana");
    assert_eq!(
        url.as_str(),
        format!("solana:{recipient}?amount=5.25&spl-token={mint}&reference={reference}")
    );
}

#[test]
fn reset_drops_the_reference_and_generate_draws_a_new_one() {
    let (mut session, _) = session_with_usdc();
    let recipient = session.recipient();
    session.set_label(Some("Café du coin".to_string()));
    session.set_amount(Some(dec!(2)));
    session.set_memo(Some("table 4".to_string()));
    session.generate();
    let first = session.reference().unwrap();

    session.reset();
    assert_eq!(session.reference(), None);
    // Le libellé du marchand survit au reset.
    assert_eq!(session.url().unwrap().as_str(), format!("solana:{recipient}?label=Caf%C3%A9+du+coin"));

    session.set_amount(Some(dec!(2)));
    session.generate();
    assert_ne!(session.reference(), Some(first));
}

#[test]
fn set_poll_interval_notifies_only_on_change() {
    let (mut session, _) = session_with_usdc();
    let mut inputs = session.subscribe();
    inputs.borrow_and_update();

    session.set_poll_interval(Duration::from_secs(10));
    assert!(!inputs.has_changed().unwrap());

    session.set_poll_interval(Duration::from_secs(30));
    assert!(inputs.has_changed().unwrap());
    assert_eq!(inputs.borrow_and_update().poll_interval, Duration::from_secs(30));
    assert_eq!(session.poll_interval(), Duration::from_secs(30));
}
