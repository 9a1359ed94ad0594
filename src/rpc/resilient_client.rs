use super::transport::{ConfirmationLevel, RpcTransport, SignatureStatusView, SimulationReport, TransportError};
use async_trait::async_trait;
use solana_client::{
    client_error::{ClientError, ClientErrorKind, Result as ClientResult},
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSimulateTransactionConfig,
};
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::{Transaction, TransactionError},
};
use solana_transaction_status::{TransactionConfirmationStatus, UiTransactionEncoding};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Un "wrapper" autour du RpcClient de Solana qui ajoute une logique de
/// ré-essai automatique pour les lectures qui échouent à cause d'erreurs réseau temporaires.
/// L'envoi de transaction, lui, n'est jamais ré-essayé ici (voir `SubmissionEngine`).
#[derive(Clone)]
pub struct ResilientRpcClient {
    client: Arc<RpcClient>,
    max_retries: u8,
    delay_ms: u64,
}

impl ResilientRpcClient {
    /// Construit un nouveau client RPC résilient (commitment `confirmed`).
    pub fn new(rpc_url: String, max_retries: u8, delay_ms: u64) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed())),
            max_retries,
            delay_ms,
        }
    }

    /// Méthode "passe-plat" pour accéder à la configuration de commitment du client sous-jacent.
    pub fn commitment(&self) -> CommitmentConfig {
        self.client.commitment()
    }

    /// Détermine si une erreur du client est temporaire et si une nouvelle tentative doit être effectuée.
    fn is_retryable(error: &ClientError) -> bool {
        matches!(
            error.kind(),
            ClientErrorKind::Reqwest(_) | ClientErrorKind::RpcError(_) | ClientErrorKind::Io(_)
        )
    }

    /// Traduit une erreur du client en erreur de transport.
    /// Seules les erreurs réseau/I/O sont des erreurs de connexion.
    fn classify(error: ClientError) -> TransportError {
        match error.kind() {
            ClientErrorKind::Reqwest(_) | ClientErrorKind::Io(_) => TransportError::Connection(error.to_string()),
            _ => TransportError::Rejected(error.to_string()),
        }
    }

    /// Boucle de ré-essai bornée commune à toutes les lectures.
    async fn with_retries<T, F, Fut>(&self, method: &'static str, mut call: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if Self::is_retryable(&e) && attempt < self.max_retries {
                        attempt += 1;
                        debug!(method, attempt, error = %e, "Erreur RPC temporaire, nouvelle tentative.");
                        sleep(Duration::from_millis(self.delay_ms)).await;
                    } else {
                        warn!(method, attempts = attempt + 1, error = %e, "Échec final de l'appel RPC.");
                        return Err(Self::classify(e));
                    }
                }
            }
        }
    }
}

#[async_trait]
impl RpcTransport for ResilientRpcClient {
    async fn latest_blockhash(&self) -> Result<Hash, TransportError> {
        self.with_retries("get_latest_blockhash", || self.client.get_latest_blockhash())
            .await
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, TransportError> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(Self::classify)
    }

    async fn simulate_transaction(&self, transaction: &Transaction) -> Result<SimulationReport, TransportError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(self.client.commitment()),
            encoding: Some(UiTransactionEncoding::Base64),
            ..Default::default()
        };
        let response = self
            .with_retries("simulate_transaction", || {
                self.client.simulate_transaction_with_config(transaction, config.clone())
            })
            .await?;
        let value = response.value;
        Ok(SimulationReport {
            err: value.err.map(TransactionError::from),
            logs: value.logs.unwrap_or_default(),
            units_consumed: value.units_consumed,
        })
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<Account>, TransportError> {
        let commitment = self.client.commitment();
        let response = self
            .with_retries("get_account", || self.client.get_account_with_commitment(address, commitment))
            .await?;
        Ok(response.value)
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64, TransportError> {
        self.with_retries("get_balance", || self.client.get_balance(address))
            .await
    }

    async fn token_account_balance(&self, address: &Pubkey) -> Result<u64, TransportError> {
        let amount = self
            .with_retries("get_token_account_balance", || self.client.get_token_account_balance(address))
            .await?;
        amount
            .amount
            .parse::<u64>()
            .map_err(|e| TransportError::Rejected(format!("Montant de token illisible '{}' : {}", amount.amount, e)))
    }

    async fn signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatusView>>, TransportError> {
        let response = self
            .with_retries("get_signature_statuses", || self.client.get_signature_statuses(signatures))
            .await?;

        Ok(response
            .value
            .into_iter()
            .map(|status_opt| {
                status_opt.map(|status| {
                    let level = match status.confirmation_status {
                        Some(TransactionConfirmationStatus::Processed) => ConfirmationLevel::Processed,
                        Some(TransactionConfirmationStatus::Confirmed) => ConfirmationLevel::Confirmed,
                        Some(TransactionConfirmationStatus::Finalized) => ConfirmationLevel::Finalized,
                        // Anciens nœuds : pas de statut mais `confirmations == None` signifie "rooted".
                        None if status.confirmations.is_none() => ConfirmationLevel::Finalized,
                        None => ConfirmationLevel::Processed,
                    };
                    SignatureStatusView {
                        level,
                        err: status.err.map(TransactionError::from),
                    }
                })
            })
            .collect())
    }

    async fn program_accounts(&self, program_id: &Pubkey) -> Result<Vec<(Pubkey, Account)>, TransportError> {
        self.with_retries("get_program_accounts", || self.client.get_program_accounts(program_id))
            .await
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, TransportError> {
        self.with_retries("request_airdrop", || self.client.request_airdrop(to, lamports))
            .await
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, TransportError> {
        self.with_retries("get_minimum_balance_for_rent_exemption", || {
            self.client.get_minimum_balance_for_rent_exemption(data_len)
        })
        .await
    }
}
