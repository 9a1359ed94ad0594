// DANS : src/error.rs

use crate::rpc::{ConfirmationLevel, TransportError};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;

/// Les erreurs du moteur, classées selon leur traitement :
/// - construction : non ré-essayable, levée avant tout appel réseau ;
/// - transport : ré-essayable selon le calendrier d'envoi ;
/// - exécution on-chain : la transaction a atterri mais le programme l'a rejetée ;
/// - timeout de confirmation : fatal pour l'opération concernée.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Erreur de construction : {0}")]
    Construction(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Envoi abandonné après {attempts} tentative(s). Dernière raison : {last_reason}")]
    SubmissionExhausted {
        attempts: u32,
        last_reason: String,
        /// Code d'erreur du contrat relevé par la dernière simulation de diagnostic.
        code: Option<u32>,
        /// Logs du programme capturés par la simulation de diagnostic (peut être vide).
        logs: Vec<String>,
    },

    #[error("Transaction {signature} incluse dans un bloc mais échouée : {reason}")]
    ExecutionFailed {
        signature: Signature,
        /// Code d'erreur du contrat (1001..=1042) si l'erreur en vient.
        code: Option<u32>,
        reason: String,
    },

    #[error("Transaction {signature} non confirmée après {polls} vérification(s) (dernier statut : {last_status:?})")]
    ConfirmationTimeout {
        signature: Signature,
        polls: u32,
        last_status: ConfirmationLevel,
    },

    #[error("Pool inconnu : {0}")]
    PoolNotFound(Pubkey),

    #[error("Aucune autorité de mint en cache pour {0}")]
    UnknownMintAuthority(Pubkey),

    #[error("Erreur de stockage : {0}")]
    Store(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Seules les erreurs de transport justifient une nouvelle tentative.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Transport(_))
    }

    /// Vrai si l'erreur vient d'un problème de connexion au nœud (et non d'une réponse).
    pub fn is_connection_error(&self) -> bool {
        matches!(self, EngineError::Transport(TransportError::Connection(_)))
    }

    pub fn construction(message: impl Into<String>) -> Self {
        EngineError::Construction(message.into())
    }
}
