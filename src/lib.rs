// src/lib.rs

// Moteur de transactions pour le programme fixed-ratio-trading : dérivation des PDA,
// normalisation des ratios, encodage des instructions, envoi/confirmation et cycle
// de vie des pools. Le binaire `pool_probe` et l'orchestrateur de stress externe
// consomment ces modules.
pub mod config;
pub mod error;
pub mod execution;
pub mod monitoring;
pub mod pda;
pub mod protocol;
pub mod ratio;
pub mod rpc;
pub mod state;

pub use error::{EngineError, EngineResult};
