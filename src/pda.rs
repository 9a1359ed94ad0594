// DANS : src/pda.rs

//! Dérivation déterministe des adresses de programme (PDA).
//!
//! Le programme on-chain recalcule ces adresses de son côté et rejette toute
//! divergence : les seeds ci-dessous et leur ordre font partie du contrat.

use crate::error::{EngineError, EngineResult};
use crate::ratio::{OrderedTokenPair, RatioSpec};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::{Pubkey, MAX_SEEDS, MAX_SEED_LEN};
use std::cmp::Ordering;
use tracing::debug;

pub const SYSTEM_STATE_SEED: &[u8] = b"system_state";
pub const POOL_STATE_SEED: &[u8] = b"pool_state";
pub const TOKEN_A_VAULT_SEED: &[u8] = b"token_a_vault";
pub const TOKEN_B_VAULT_SEED: &[u8] = b"token_b_vault";
pub const LP_TOKEN_A_MINT_SEED: &[u8] = b"lp_token_a_mint";
pub const LP_TOKEN_B_MINT_SEED: &[u8] = b"lp_token_b_mint";
pub const MAIN_TREASURY_SEED: &[u8] = b"main_treasury";
pub const POOL_TREASURY_SEED: &[u8] = b"pool_treasury";

/// Le loader "upgradeable" qui détient le compte program-data de notre programme.
pub const BPF_LOADER_UPGRADEABLE_ID: Pubkey = solana_sdk::pubkey!("BPFLoaderUpgradeab1e11111111111111111111111");

/// Une adresse dérivée et le "bump" qui l'a fait sortir de la courbe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Dérive l'adresse pour `seeds` et `program_id`.
///
/// Bump de 255 vers 0 : sha256(seeds ‖ bump ‖ program_id ‖ "ProgramDerivedAddress"),
/// le premier hash hors de la courbe ed25519 gagne. C'est exactement l'algorithme du runtime,
/// d'où l'appel direct à `Pubkey::try_find_program_address`.
pub fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> EngineResult<ProgramAddress> {
    // Le bump occupe lui-même un slot de seed.
    if seeds.len() >= MAX_SEEDS {
        return Err(EngineError::construction(format!(
            "Trop de seeds pour une PDA : {} (max {})",
            seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(EngineError::construction(format!(
            "Seed trop longue pour une PDA : {} octets (max {}) : {}",
            seed.len(),
            MAX_SEED_LEN,
            hex::encode(seed)
        )));
    }

    let (address, bump) = Pubkey::try_find_program_address(seeds, program_id).ok_or_else(|| {
        EngineError::construction(format!(
            "Aucun bump valide sur 256 essais pour le programme {}",
            program_id
        ))
    })?;

    debug!(
        %address,
        bump,
        seeds = ?seeds.iter().map(hex::encode).collect::<Vec<_>>(),
        "PDA dérivée."
    );
    Ok(ProgramAddress { address, bump })
}

/// Ordre canonique de deux adresses : comparaison lexicographique des octets bruts.
pub fn compare_addresses(left: &Pubkey, right: &Pubkey) -> Ordering {
    left.to_bytes().cmp(&right.to_bytes())
}

pub fn system_state(program_id: &Pubkey) -> EngineResult<ProgramAddress> {
    derive(&[SYSTEM_STATE_SEED], program_id)
}

pub fn main_treasury(program_id: &Pubkey) -> EngineResult<ProgramAddress> {
    derive(&[MAIN_TREASURY_SEED], program_id)
}

/// La PDA d'état du pool. Le ratio fait partie des seeds : deux ratios différents
/// pour la même paire donnent deux pools distincts.
pub fn pool_state(
    token_a: &Pubkey,
    token_b: &Pubkey,
    ratio_numerator: u64,
    ratio_denominator: u64,
    program_id: &Pubkey,
) -> EngineResult<ProgramAddress> {
    let numerator_le = ratio_numerator.to_le_bytes();
    let denominator_le = ratio_denominator.to_le_bytes();
    derive(
        &[
            POOL_STATE_SEED,
            token_a.as_ref(),
            token_b.as_ref(),
            &numerator_le,
            &denominator_le,
        ],
        program_id,
    )
}

pub fn token_a_vault(pool_state: &Pubkey, program_id: &Pubkey) -> EngineResult<ProgramAddress> {
    derive(&[TOKEN_A_VAULT_SEED, pool_state.as_ref()], program_id)
}

pub fn token_b_vault(pool_state: &Pubkey, program_id: &Pubkey) -> EngineResult<ProgramAddress> {
    derive(&[TOKEN_B_VAULT_SEED, pool_state.as_ref()], program_id)
}

pub fn lp_token_a_mint(pool_state: &Pubkey, program_id: &Pubkey) -> EngineResult<ProgramAddress> {
    derive(&[LP_TOKEN_A_MINT_SEED, pool_state.as_ref()], program_id)
}

pub fn lp_token_b_mint(pool_state: &Pubkey, program_id: &Pubkey) -> EngineResult<ProgramAddress> {
    derive(&[LP_TOKEN_B_MINT_SEED, pool_state.as_ref()], program_id)
}

pub fn pool_treasury(pool_state: &Pubkey, program_id: &Pubkey) -> EngineResult<ProgramAddress> {
    derive(&[POOL_TREASURY_SEED, pool_state.as_ref()], program_id)
}

/// Le compte program-data du loader upgradeable (utilisé par InitializeProgram).
pub fn program_data_address(program_id: &Pubkey) -> EngineResult<ProgramAddress> {
    derive(&[program_id.as_ref()], &BPF_LOADER_UPGRADEABLE_ID)
}

/// Côté d'un pool : A ou B dans l'ordre canonique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolSide {
    A,
    B,
}

impl PoolSide {
    pub fn opposite(self) -> Self {
        match self {
            PoolSide::A => PoolSide::B,
            PoolSide::B => PoolSide::A,
        }
    }
}

/// Toutes les adresses d'un pool, dérivées du même tuple canonique
/// (tokenA, tokenB, ratioNumerator, ratioDenominator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAddresses {
    pub token_a_mint: Pubkey,
    pub token_b_mint: Pubkey,
    pub system_state: Pubkey,
    pub pool_state: Pubkey,
    pub pool_state_bump: u8,
    pub token_a_vault: Pubkey,
    pub token_b_vault: Pubkey,
    pub lp_token_a_mint: Pubkey,
    pub lp_token_b_mint: Pubkey,
    pub main_treasury: Pubkey,
    pub pool_treasury: Pubkey,
}

impl PoolAddresses {
    pub fn derive(program_id: &Pubkey, pair: &OrderedTokenPair, ratio: &RatioSpec) -> EngineResult<Self> {
        let pool = pool_state(
            &pair.token_a(),
            &pair.token_b(),
            ratio.ratio_numerator(),
            ratio.ratio_denominator(),
            program_id,
        )?;
        Ok(Self {
            token_a_mint: pair.token_a(),
            token_b_mint: pair.token_b(),
            system_state: system_state(program_id)?.address,
            pool_state: pool.address,
            pool_state_bump: pool.bump,
            token_a_vault: token_a_vault(&pool.address, program_id)?.address,
            token_b_vault: token_b_vault(&pool.address, program_id)?.address,
            lp_token_a_mint: lp_token_a_mint(&pool.address, program_id)?.address,
            lp_token_b_mint: lp_token_b_mint(&pool.address, program_id)?.address,
            main_treasury: main_treasury(program_id)?.address,
            pool_treasury: pool_treasury(&pool.address, program_id)?.address,
        })
    }

    /// Le côté du pool correspondant à un mint, ou `None` si le mint n'appartient pas au pool.
    pub fn side_of(&self, mint: &Pubkey) -> Option<PoolSide> {
        if *mint == self.token_a_mint {
            Some(PoolSide::A)
        } else if *mint == self.token_b_mint {
            Some(PoolSide::B)
        } else {
            None
        }
    }

    pub fn mint(&self, side: PoolSide) -> Pubkey {
        match side {
            PoolSide::A => self.token_a_mint,
            PoolSide::B => self.token_b_mint,
        }
    }

    pub fn vault(&self, side: PoolSide) -> Pubkey {
        match side {
            PoolSide::A => self.token_a_vault,
            PoolSide::B => self.token_b_vault,
        }
    }

    pub fn lp_mint(&self, side: PoolSide) -> Pubkey {
        match side {
            PoolSide::A => self.lp_token_a_mint,
            PoolSide::B => self.lp_token_b_mint,
        }
    }
}
