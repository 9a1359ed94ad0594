// DANS : src/rpc/transport.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::{Transaction, TransactionError},
};
use thiserror::Error;

/// Les erreurs remontées par le transport RPC.
/// `Connection` = le nœud n'a pas répondu (réseau, I/O). `Rejected` = le nœud a répondu par un refus.
/// La distinction compte : une erreur de connexion ne prouve jamais qu'un compte n'existe pas.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connexion au nœud RPC impossible : {0}")]
    Connection(String),
    #[error("Requête refusée par le nœud RPC : {0}")]
    Rejected(String),
}

/// Niveau de finalité d'une signature, du plus faible au plus fort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfirmationLevel {
    None,
    Processed,
    Confirmed,
    Finalized,
}

impl ConfirmationLevel {
    /// Une transaction n'est considérée "atterrie" qu'à partir de `Confirmed`.
    pub fn is_landed(self) -> bool {
        matches!(self, ConfirmationLevel::Confirmed | ConfirmationLevel::Finalized)
    }
}

/// Le statut d'une signature tel que vu par le nœud.
/// L'inclusion dans un bloc (`level`) et l'erreur d'exécution (`err`) sont indépendantes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatusView {
    pub level: ConfirmationLevel,
    pub err: Option<TransactionError>,
}

/// Le résultat brut d'une simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub err: Option<TransactionError>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

/// Les primitives consommées depuis le nœud. Le moteur ne parle au réseau qu'à travers ce trait,
/// ce qui permet de le brancher sur un vrai `RpcClient` ou sur un stub en test.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash, TransportError>;

    /// Envoie une transaction signée. Un seul essai : le ré-essai appartient au moteur d'envoi,
    /// qui reconstruit la transaction au lieu de renvoyer des octets périmés.
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, TransportError>;

    /// Simule sans vérification de signature et avec un blockhash frais.
    async fn simulate_transaction(&self, transaction: &Transaction) -> Result<SimulationReport, TransportError>;

    /// `Ok(None)` signifie que le nœud a répondu proprement "compte introuvable".
    async fn account(&self, address: &Pubkey) -> Result<Option<Account>, TransportError>;

    async fn balance(&self, address: &Pubkey) -> Result<u64, TransportError>;

    async fn token_account_balance(&self, address: &Pubkey) -> Result<u64, TransportError>;

    async fn signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatusView>>, TransportError>;

    async fn program_accounts(&self, program_id: &Pubkey) -> Result<Vec<(Pubkey, Account)>, TransportError>;

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, TransportError>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_confirmed_and_finalized_are_landed() {
        assert!(!ConfirmationLevel::None.is_landed());
        assert!(!ConfirmationLevel::Processed.is_landed());
        assert!(ConfirmationLevel::Confirmed.is_landed());
        assert!(ConfirmationLevel::Finalized.is_landed());
        assert!(ConfirmationLevel::Processed < ConfirmationLevel::Finalized);
    }
}
