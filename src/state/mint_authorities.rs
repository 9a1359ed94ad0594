// DANS : src/state/mint_authorities.rs

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

/// Un mint de test créé par le moteur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMint {
    pub address: Pubkey,
    pub decimals: u8,
    pub authority: Pubkey,
}

/// mint -> (description, clé de l'autorité). Écrit à la création, lu à chaque mint_to.
#[derive(Default)]
pub struct MintAuthorities {
    mints: RwLock<HashMap<Pubkey, (TokenMint, Arc<Keypair>)>>,
}

impl MintAuthorities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, mint: TokenMint, authority: Arc<Keypair>) {
        let mut writer = self.mints.write().unwrap_or_else(PoisonError::into_inner);
        writer.insert(mint.address, (mint, authority));
    }

    pub fn token_mint(&self, mint: &Pubkey) -> Option<TokenMint> {
        let reader = self.mints.read().unwrap_or_else(PoisonError::into_inner);
        reader.get(mint).map(|(token_mint, _)| *token_mint)
    }

    pub fn authority(&self, mint: &Pubkey) -> EngineResult<Arc<Keypair>> {
        let reader = self.mints.read().unwrap_or_else(PoisonError::into_inner);
        reader
            .get(mint)
            .map(|(_, authority)| authority.clone())
            .ok_or(EngineError::UnknownMintAuthority(*mint))
    }

    pub fn len(&self) -> usize {
        self.mints.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
