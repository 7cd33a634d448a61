// DANS : src/rpc/mock.rs
//
// Faux nœud RPC scriptable pour les tests du moteur.

use anyhow::{Result, bail};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::{collections::HashMap, sync::Mutex, time::Duration};

use super::PaymentRpc;
use crate::payment::{ParsedTransaction, SignatureStatusRecord};

#[derive(Default)]
struct MockState {
    signatures: HashMap<Pubkey, Vec<String>>,
    transactions: HashMap<String, ParsedTransaction>,
    statuses: HashMap<String, SignatureStatusRecord>,
    fail_signatures: bool,
    fail_statuses: bool,
    signatures_delay: Option<Duration>,
    fetch_delay: Option<Duration>,
    signature_calls: usize,
    signatures_in_flight: usize,
    max_signatures_in_flight: usize,
    transaction_calls: usize,
    fetch_in_flight: usize,
    max_fetch_in_flight: usize,
    polled: Vec<Pubkey>,
}

#[derive(Default)]
pub(crate) struct MockRpc {
    state: Mutex<MockState>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_signatures(&self, address: Pubkey, signatures: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.signatures.insert(address, signatures.iter().map(|s| s.to_string()).collect());
    }

    pub fn insert(&self, signature: &str, transaction: ParsedTransaction, status: SignatureStatusRecord) {
        let mut state = self.state.lock().unwrap();
        state.transactions.insert(signature.to_string(), transaction);
        state.statuses.insert(signature.to_string(), status);
    }

    pub fn set_status(&self, signature: &str, status: SignatureStatusRecord) {
        self.state.lock().unwrap().statuses.insert(signature.to_string(), status);
    }

    pub fn fail_signatures(&self, fail: bool) {
        self.state.lock().unwrap().fail_signatures = fail;
    }

    pub fn fail_statuses(&self, fail: bool) {
        self.state.lock().unwrap().fail_statuses = fail;
    }

    pub fn set_signatures_delay(&self, delay: Duration) {
        self.state.lock().unwrap().signatures_delay = Some(delay);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.state.lock().unwrap().fetch_delay = Some(delay);
    }

    pub fn signature_calls(&self) -> usize {
        self.state.lock().unwrap().signature_calls
    }

    pub fn max_signatures_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_signatures_in_flight
    }

    pub fn transaction_calls(&self) -> usize {
        self.state.lock().unwrap().transaction_calls
    }

    pub fn max_fetch_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_fetch_in_flight
    }

    pub fn polled_addresses(&self) -> Vec<Pubkey> {
        self.state.lock().unwrap().polled.clone()
    }
}

#[async_trait]
impl PaymentRpc for MockRpc {
    async fn get_signatures_for_address(&self, address: &Pubkey, limit: usize) -> Result<Vec<String>> {
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.signature_calls += 1;
            state.signatures_in_flight += 1;
            state.max_signatures_in_flight = state.max_signatures_in_flight.max(state.signatures_in_flight);
            state.polled.push(*address);
            let result = if state.fail_signatures {
                None
            } else {
                let mut signatures = state.signatures.get(address).cloned().unwrap_or_default();
                signatures.truncate(limit);
                Some(signatures)
            };
            (state.signatures_delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().unwrap().signatures_in_flight -= 1;
        match result {
            Some(signatures) => Ok(signatures),
            None => bail!("getSignaturesForAddress: connexion refusée"),
        }
    }

    async fn get_parsed_transactions(&self, signatures: &[String]) -> Result<Vec<Option<ParsedTransaction>>> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.transaction_calls += 1;
            state.fetch_in_flight += 1;
            state.max_fetch_in_flight = state.max_fetch_in_flight.max(state.fetch_in_flight);
            state.fetch_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.fetch_in_flight -= 1;
        Ok(signatures.iter().map(|s| state.transactions.get(s).cloned()).collect())
    }

    async fn get_signature_statuses(&self, signatures: &[String]) -> Result<Vec<Option<SignatureStatusRecord>>> {
        let state = self.state.lock().unwrap();
        if state.fail_statuses {
            bail!("getSignatureStatuses: 503 Service Unavailable");
        }
        Ok(signatures.iter().map(|s| state.statuses.get(s).cloned()).collect())
    }
}
