// DANS : src/execution/sender.rs

use crate::error::{EngineError, EngineResult};
use crate::execution::simulator::Simulator;
use crate::execution::transaction_builder::serialize_transaction;
use crate::protocol::errors::{contract_error_code_from_logs, describe_code, simulation_error_code};
use crate::rpc::{RpcTransport, TransportError};
use solana_sdk::{signature::Signature, transaction::Transaction};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Calendrier des tentatives d'envoi. Borné : jamais de boucle infinie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause entre les premières tentatives.
    pub retry_delay: Duration,
    /// Pause, plus longue, avant la dernière tentative.
    pub final_attempt_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(1_000),
            final_attempt_delay: Duration::from_millis(5_000),
        }
    }
}

impl RetryPolicy {
    /// Nombre effectif de tentatives (au moins une).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Pause à observer avant la tentative `attempt` (1-indexée).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else if attempt == self.attempts() {
            self.final_attempt_delay
        } else {
            self.retry_delay
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    AcceptedPending,
    /// Le nœud a répondu par un refus.
    Rejected(String),
    /// Pas de réponse exploitable (connexion, reconstruction impossible).
    Exception(String),
}

/// Une tentative d'envoi. `transaction_bytes` est vide si la reconstruction a échoué.
#[derive(Debug, Clone)]
pub struct SubmissionAttempt {
    pub attempt: u32,
    pub transaction_bytes: Vec<u8>,
    pub outcome: AttemptOutcome,
    pub signature: Option<Signature>,
}

/// Une transaction acceptée par le nœud. Acceptée ne veut pas dire atterrie.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub signature: Signature,
    pub attempts: u32,
    pub history: Vec<SubmissionAttempt>,
}

pub struct SubmissionEngine {
    transport: Arc<dyn RpcTransport>,
    simulator: Simulator,
    policy: RetryPolicy,
}

impl SubmissionEngine {
    pub fn new(transport: Arc<dyn RpcTransport>, policy: RetryPolicy) -> Self {
        Self {
            simulator: Simulator::new(transport.clone()),
            transport,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Envoie une transaction en la RECONSTRUISANT à chaque tentative (`rebuild(n)` doit aller
    /// chercher un blockhash frais et l'état courant des comptes). On ne renvoie jamais d'octets périmés.
    ///
    /// - erreur de construction pendant `rebuild` : échec immédiat, sans consommer de tentative ;
    /// - erreur de transport pendant `rebuild` ou l'envoi : la tentative est comptée ;
    /// - après un refus, une simulation de diagnostic capture les logs du programme et le code
    ///   d'erreur du contrat, rapporté avec la formulation de la table.
    pub async fn submit_with_rebuild<F, Fut>(&self, label: &str, mut rebuild: F) -> EngineResult<SubmissionOutcome>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = EngineResult<Transaction>>,
    {
        let max_attempts = self.policy.attempts();
        let mut history = Vec::with_capacity(max_attempts as usize);
        let mut last_reason = String::new();
        let mut last_logs = Vec::new();
        let mut last_code = None;

        for attempt in 1..=max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let transaction = match rebuild(attempt).await {
                Ok(transaction) => transaction,
                Err(e) if e.is_retryable() => {
                    warn!(operation = label, attempt, error = %e, "Reconstruction impossible, tentative perdue.");
                    last_reason = e.to_string();
                    history.push(SubmissionAttempt {
                        attempt,
                        transaction_bytes: Vec::new(),
                        outcome: AttemptOutcome::Exception(last_reason.clone()),
                        signature: None,
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };
            let transaction_bytes = serialize_transaction(&transaction)?;

            match self.transport.send_transaction(&transaction).await {
                Ok(signature) => {
                    info!(operation = label, attempt, signature = %signature, "Transaction acceptée par le nœud.");
                    history.push(SubmissionAttempt {
                        attempt,
                        transaction_bytes,
                        outcome: AttemptOutcome::AcceptedPending,
                        signature: Some(signature),
                    });
                    return Ok(SubmissionOutcome { signature, attempts: attempt, history });
                }
                Err(e) => {
                    warn!(operation = label, attempt, max_attempts, error = %e, "Envoi refusé.");
                    last_reason = e.to_string();
                    let report = self.simulator.diagnose(&transaction).await;
                    last_code = report
                        .as_ref()
                        .and_then(|r| simulation_error_code(r.err.as_ref(), &r.logs))
                        .or_else(|| contract_error_code_from_logs(std::slice::from_ref(&last_reason)));
                    last_logs = report.map(|r| r.logs).unwrap_or_default();
                    let outcome = match e {
                        TransportError::Rejected(reason) => AttemptOutcome::Rejected(reason),
                        TransportError::Connection(reason) => AttemptOutcome::Exception(reason),
                    };
                    history.push(SubmissionAttempt { attempt, transaction_bytes, outcome, signature: None });
                }
            }
        }

        if let Some(code) = last_code {
            last_reason = format!("{} | {}", last_reason, describe_code(code));
        }
        Err(EngineError::SubmissionExhausted {
            attempts: max_attempts,
            last_reason,
            code: last_code,
            logs: last_logs,
        })
    }
}
