use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_client::GetConfirmedSignaturesForAddress2Config,
    rpc_request::RpcRequest,
};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta;
use std::{future::Future, str::FromStr, sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::debug;

use super::{PaymentRpc, decoding};
use crate::payment::{ParsedTransaction, SignatureStatusRecord};

/// Un "wrapper" autour du RpcClient de Solana qui ajoute une logique de
/// ré-essai automatique pour les appels RPC qui échouent à cause d'erreurs réseau temporaires.
#[derive(Clone)]
pub struct ResilientRpcClient {
    client: Arc<RpcClient>,
    max_retries: u8,
    delay_ms: u64,
}

impl ResilientRpcClient {
    /// Construit un nouveau client RPC résilient, au commitment `confirmed`.
    pub fn new(rpc_url: String, max_retries: u8, delay_ms: u64) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed())),
            max_retries,
            delay_ms,
        }
    }

    /// Détermine si une erreur du client est temporaire et si une nouvelle tentative doit être effectuée.
    fn is_retryable(error: &ClientError) -> bool {
        matches!(
            error.kind(),
            ClientErrorKind::Reqwest(_) | ClientErrorKind::RpcError(_) | ClientErrorKind::Io(_)
        )
    }

    async fn with_retries<T, F, Fut>(&self, method: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ClientError>>,
    {
        let mut attempt = 0u8;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(method, attempt, error = %e, "[RPC] Erreur temporaire, nouvelle tentative.");
                    sleep(Duration::from_millis(self.delay_ms)).await;
                }
                Err(e) => return Err(e).with_context(|| format!("Échec final de {}", method)),
            }
        }
    }

    /// Détail `jsonParsed` d'une transaction. `None` si le nœud ne la connaît pas (encore).
    pub async fn get_parsed_transaction(&self, signature: &str) -> Result<Option<ParsedTransaction>> {
        let params = json!([
            signature,
            {
                "encoding": "jsonParsed",
                "commitment": "confirmed",
                "maxSupportedTransactionVersion": 0
            }
        ]);
        let encoded: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .with_retries("getTransaction", || self.client.send(RpcRequest::GetTransaction, params.clone()))
            .await
            .with_context(|| format!("getTransaction pour {}", signature))?;

        Ok(encoded.map(decoding::parsed_transaction))
    }
}

#[async_trait]
impl PaymentRpc for ResilientRpcClient {
    async fn get_signatures_for_address(&self, address: &Pubkey, limit: usize) -> Result<Vec<String>> {
        let infos = self
            .with_retries("getSignaturesForAddress", || {
                self.client.get_signatures_for_address_with_config(
                    address,
                    GetConfirmedSignaturesForAddress2Config {
                        before: None,
                        until: None,
                        limit: Some(limit),
                        commitment: Some(CommitmentConfig::confirmed()),
                    },
                )
            })
            .await
            .with_context(|| format!("getSignaturesForAddress pour {}", address))?;

        Ok(infos.into_iter().map(|info| info.signature).collect())
    }

    async fn get_parsed_transactions(&self, signatures: &[String]) -> Result<Vec<Option<ParsedTransaction>>> {
        let requests = signatures.iter().map(|signature| self.get_parsed_transaction(signature));
        futures_util::future::try_join_all(requests).await
    }

    async fn get_signature_statuses(&self, signatures: &[String]) -> Result<Vec<Option<SignatureStatusRecord>>> {
        let signatures = signatures
            .iter()
            .map(|s| Signature::from_str(s).with_context(|| format!("Signature invalide : {}", s)))
            .collect::<Result<Vec<_>>>()?;

        let response = self
            .with_retries("getSignatureStatuses", || {
                self.client.get_signature_statuses_with_history(&signatures)
            })
            .await?;

        Ok(response
            .value
            .into_iter()
            .map(|status| status.map(decoding::signature_status))
            .collect())
    }
}
