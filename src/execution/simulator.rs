// DANS: src/execution/simulator.rs

use crate::error::EngineResult;
use crate::protocol::errors::contract_error_code;
use crate::rpc::{RpcTransport, SimulationReport};
use solana_sdk::{
    instruction::InstructionError,
    transaction::{Transaction, TransactionError},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Code contrat "Insufficient funds" : attendu lors d'une sonde lancée avec un compte vide.
const INSUFFICIENT_FUNDS_CODE: u32 = 1003;

const VERSION_LOG_PREFIX: &str = "Program log: Contract Version: ";

/// Issue d'une simulation "sonde" (lecture de version, vérification de format, etc.).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Succeeded(SimulationReport),
    /// Le programme a bien été atteint mais a échoué pour une raison attendue
    /// (compte de frais vide, fonds insuffisants). Les logs restent exploitables.
    ExpectedProbeFailure(SimulationReport),
    Failed(SimulationReport),
}

impl ProbeOutcome {
    pub fn report(&self) -> &SimulationReport {
        match self {
            ProbeOutcome::Succeeded(report)
            | ProbeOutcome::ExpectedProbeFailure(report)
            | ProbeOutcome::Failed(report) => report,
        }
    }

    pub fn is_usable(&self) -> bool {
        !matches!(self, ProbeOutcome::Failed(_))
    }
}

/// Les erreurs qu'une sonde sans fonds provoque forcément.
pub fn is_expected_probe_error(error: &TransactionError) -> bool {
    match error {
        TransactionError::AccountNotFound | TransactionError::InsufficientFundsForFee => true,
        TransactionError::InstructionError(_, InstructionError::InsufficientFunds) => true,
        other => contract_error_code(other) == Some(INSUFFICIENT_FUNDS_CODE),
    }
}

/// Cherche la ligne de version émise par GetVersion.
pub fn parse_contract_version(logs: &[String]) -> Option<String> {
    logs.iter()
        .find_map(|log| log.strip_prefix(VERSION_LOG_PREFIX))
        .map(|version| version.trim().to_string())
        .filter(|version| !version.is_empty())
}

pub struct Simulator {
    transport: Arc<dyn RpcTransport>,
}

impl Simulator {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Simulation de diagnostic après un envoi refusé. Ne fait jamais échouer l'appelant :
    /// une simulation qui plante donne simplement `None`.
    pub async fn diagnose(&self, transaction: &Transaction) -> Option<SimulationReport> {
        match self.transport.simulate_transaction(transaction).await {
            Ok(report) => {
                if let Some(err) = &report.err {
                    warn!(error = ?err, units = ?report.units_consumed, "[Diagnostic] La simulation échoue aussi.");
                } else {
                    info!(units = ?report.units_consumed, "[Diagnostic] La simulation passe ; le refus venait du nœud.");
                }
                for log in &report.logs {
                    debug!("       {}", log);
                }
                Some(report)
            }
            Err(e) => {
                warn!(error = %e, "[Diagnostic] Simulation impossible, on continue sans logs.");
                None
            }
        }
    }

    /// Simulation "sonde" : classe le résultat au lieu de le transformer en erreur.
    /// Seule une erreur de transport remonte.
    pub async fn probe(&self, transaction: &Transaction) -> EngineResult<ProbeOutcome> {
        let report = self.transport.simulate_transaction(transaction).await?;
        let outcome = match &report.err {
            None => ProbeOutcome::Succeeded(report),
            Some(err) if is_expected_probe_error(err) => {
                debug!(error = ?err, "[Sonde] Échec attendu, logs conservés.");
                ProbeOutcome::ExpectedProbeFailure(report)
            }
            Some(err) => {
                warn!(error = ?err, "[Sonde] Échec inattendu.");
                ProbeOutcome::Failed(report)
            }
        };
        Ok(outcome)
    }
}
