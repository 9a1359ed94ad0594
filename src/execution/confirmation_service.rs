// DANS : src/execution/confirmation_service.rs

use crate::error::{EngineError, EngineResult};
use crate::protocol::{contract_error_code, describe_transaction_error};
use crate::rpc::{ConfirmationLevel, RpcTransport};
use solana_sdk::{signature::Signature, transaction::TransactionError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub max_polls: u32,
    pub poll_delay: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            max_polls: 30,
            poll_delay: Duration::from_millis(1_000),
        }
    }
}

/// L'état final observé d'une signature. L'inclusion (`status`) et l'erreur d'exécution
/// sont suivies séparément : une transaction peut être dans un bloc ET avoir échoué.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRecord {
    pub signature: Signature,
    pub status: ConfirmationLevel,
    pub execution_error: Option<TransactionError>,
    pub polls: u32,
}

impl ConfirmationRecord {
    pub fn succeeded(&self) -> bool {
        self.status.is_landed() && self.execution_error.is_none()
    }

    /// Transforme un atterrissage en échec d'exécution en erreur typée.
    pub fn into_result(self) -> EngineResult<Self> {
        match &self.execution_error {
            None => Ok(self),
            Some(err) => Err(EngineError::ExecutionFailed {
                signature: self.signature,
                code: contract_error_code(err),
                reason: describe_transaction_error(err),
            }),
        }
    }
}

/// Suivi des signatures envoyées jusqu'à `confirmed` ou `finalized`.
pub struct ConfirmationService {
    transport: Arc<dyn RpcTransport>,
    policy: ConfirmationPolicy,
}

impl ConfirmationService {
    pub fn new(transport: Arc<dyn RpcTransport>, policy: ConfirmationPolicy) -> Self {
        Self { transport, policy }
    }

    /// Interroge le statut jusqu'à atterrissage, sans juger l'exécution.
    /// Une erreur RPC pendant une vérification consomme la vérification, sans plus.
    pub async fn poll_until_landed(&self, signature: Signature) -> EngineResult<ConfirmationRecord> {
        let max_polls = self.policy.max_polls.max(1);
        let mut last_status = ConfirmationLevel::None;

        for poll in 1..=max_polls {
            match self.transport.signature_statuses(&[signature]).await {
                Ok(statuses) => {
                    if let Some(view) = statuses.into_iter().next().flatten() {
                        last_status = view.level;
                        if view.level.is_landed() {
                            return Ok(ConfirmationRecord {
                                signature,
                                status: view.level,
                                execution_error: view.err,
                                polls: poll,
                            });
                        }
                    }
                    debug!(signature = %signature, poll, status = ?last_status, "Pas encore confirmée.");
                }
                Err(e) => warn!(signature = %signature, poll, error = %e, "Lecture du statut impossible."),
            }

            if poll < max_polls {
                tokio::time::sleep(self.policy.poll_delay).await;
            }
        }

        warn!(signature = %signature, polls = max_polls, status = ?last_status, "Transaction considérée comme perdue (timeout).");
        Err(EngineError::ConfirmationTimeout {
            signature,
            polls: max_polls,
            last_status,
        })
    }

    /// Atterrissage ET succès d'exécution. Un atterrissage en échec remonte en `ExecutionFailed`.
    pub async fn await_landing(&self, signature: Signature) -> EngineResult<ConfirmationRecord> {
        let record = self.poll_until_landed(signature).await?;
        if let Some(err) = &record.execution_error {
            warn!(signature = %signature, error = %describe_transaction_error(err), "Transaction incluse mais ÉCHOUÉE.");
        } else {
            info!(signature = %signature, status = ?record.status, polls = record.polls, "Transaction confirmée.");
        }
        record.into_result()
    }
}
