// DANS : src/state/pool_manager.rs

//! Cycle de vie des pools : création (mints, normalisation, PoolInitialize), lecture à trois
//! niveaux (cache, stockage revalidé, chaîne), nettoyage des pools disparus.

use crate::error::{EngineError, EngineResult};
use crate::execution::{
    operations::{OperationReceipt, TransactionEngine},
    simulator::parse_contract_version,
    transaction_builder,
};
use crate::pda::PoolAddresses;
use crate::protocol::FixedRatioInstruction;
use crate::ratio::{normalize, Direction, NormalizedPool};
use crate::state::{
    mint_authorities::{MintAuthorities, TokenMint},
    pool_cache::PoolCache,
    store::PoolStore,
};
use serde::{Deserialize, Serialize};
use solana_program_pack::Pack;
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use spl_token::state::Mint;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolOrigin {
    /// PoolInitialize a atterri et réussi.
    Confirmed,
    /// L'envoi a échoué ; enregistrement local pour continuer les tests. Rien ne prouve
    /// que le pool existe on-chain.
    FallbackSimulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub addresses: PoolAddresses,
    pub ratio_numerator: u64,
    pub ratio_denominator: u64,
    pub decimals_a: u8,
    pub decimals_b: u8,
    pub inverted: bool,
    pub paused: bool,
    pub swaps_paused: bool,
    pub creation_signature: Option<String>,
    /// Secondes Unix.
    pub created_at: u64,
    pub origin: PoolOrigin,
    pub is_valid: bool,
}

impl PoolRecord {
    pub fn pool_id(&self) -> Pubkey {
        self.addresses.pool_state
    }

    fn new(normalized: &NormalizedPool, addresses: PoolAddresses, origin: PoolOrigin, signature: Option<String>) -> Self {
        Self {
            addresses,
            ratio_numerator: normalized.ratio.ratio_numerator(),
            ratio_denominator: normalized.ratio.ratio_denominator(),
            decimals_a: normalized.decimals_a,
            decimals_b: normalized.decimals_b,
            inverted: normalized.inverted,
            paused: false,
            swaps_paused: false,
            creation_signature: signature,
            created_at: unix_now(),
            origin,
            is_valid: origin == PoolOrigin::Confirmed,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Paramètres d'une création de pool. Sans `existing_mints`, deux mints neufs sont créés
/// avec `decimals_a` / `decimals_b` (dans l'ordre de l'appelant, pas l'ordre canonique).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCreationRequest {
    pub decimals_a: u8,
    pub decimals_b: u8,
    pub ratio_whole: u64,
    pub direction: Direction,
    pub existing_mints: Option<(Pubkey, Pubkey)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolLookup {
    Cached(PoolRecord),
    /// Relu depuis le stockage et confirmé on-chain.
    Hydrated(PoolRecord),
    /// Connu de la chaîne seulement : pas d'enregistrement local.
    OnChainOnly(Pubkey),
    NotFound,
}

/// Réponse CONCLUANTE du nœud. Une erreur de connexion n'est jamais un `Missing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolValidation {
    Exists,
    Missing,
}

pub struct PoolManager {
    engine: Arc<TransactionEngine>,
    cache: PoolCache,
    authorities: MintAuthorities,
    store: Arc<dyn PoolStore>,
}

impl PoolManager {
    pub fn new(engine: Arc<TransactionEngine>, store: Arc<dyn PoolStore>) -> Self {
        Self {
            engine,
            cache: PoolCache::new(),
            authorities: MintAuthorities::new(),
            store,
        }
    }

    pub fn engine(&self) -> &Arc<TransactionEngine> {
        &self.engine
    }

    pub fn cache(&self) -> &PoolCache {
        &self.cache
    }

    pub fn mint_authorities(&self) -> &MintAuthorities {
        &self.authorities
    }

    /// Crée un mint SPL de test. L'autorité est une clé neuve, gardée en mémoire pour les mints suivants.
    pub async fn create_token_mint(&self, payer: &Keypair, decimals: u8) -> EngineResult<TokenMint> {
        let mint = Keypair::new();
        let authority = Arc::new(Keypair::new());
        let rent = self
            .engine
            .transport()
            .minimum_balance_for_rent_exemption(Mint::LEN)
            .await?;

        let instructions = vec![
            solana_system_interface::instruction::create_account(
                &payer.pubkey(),
                &mint.pubkey(),
                rent,
                Mint::LEN as u64,
                &spl_token::id(),
            ),
            spl_token::instruction::initialize_mint2(&spl_token::id(), &mint.pubkey(), &authority.pubkey(), None, decimals)
                .map_err(|e| EngineError::construction(format!("Instruction initialize_mint invalide : {}", e)))?,
        ];

        let mint_signer = &mint;
        self.engine
            .execute("create_mint", move |_attempt| {
                let instructions = instructions.clone();
                async move { self.engine.build_signed("create_mint", &instructions, payer, &[mint_signer]).await }
            })
            .await?;

        let token_mint = TokenMint {
            address: mint.pubkey(),
            decimals,
            authority: authority.pubkey(),
        };
        self.authorities.insert(token_mint, authority);
        info!(mint = %token_mint.address, decimals, "Mint de test créé.");
        Ok(token_mint)
    }

    /// Mint vers `owner` avec l'autorité mise en cache à la création du mint.
    pub async fn mint_tokens(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        owner: &Pubkey,
        amount: u64,
    ) -> EngineResult<OperationReceipt> {
        let authority = self.authorities.authority(mint)?;
        self.engine.mint_to(payer, mint, &authority, owner, amount).await
    }

    /// Création de bout en bout. Si l'envoi de PoolInitialize échoue, un enregistrement
    /// `FallbackSimulated` (non valide) est créé à la place pour ne pas bloquer les tests.
    pub async fn create_pool(&self, payer: &Keypair, request: PoolCreationRequest) -> EngineResult<PoolRecord> {
        let (first_mint, second_mint) = match request.existing_mints {
            Some(mints) => mints,
            None => {
                let first = self.create_token_mint(payer, request.decimals_a).await?;
                let second = self.create_token_mint(payer, request.decimals_b).await?;
                (first.address, second.address)
            }
        };

        // Les adresses des mints ne sont connues qu'ici : l'ordre canonique est recalculé maintenant.
        let normalized = normalize(
            first_mint,
            second_mint,
            request.decimals_a,
            request.decimals_b,
            request.ratio_whole,
            request.direction,
        )?;
        let addresses = PoolAddresses::derive(self.engine.program_id(), &normalized.pair, &normalized.ratio)?;
        let instruction = FixedRatioInstruction::PoolInitialize {
            ratio_numerator: normalized.ratio.ratio_numerator(),
            ratio_denominator: normalized.ratio.ratio_denominator(),
        };
        let program_instruction = transaction_builder::program_instruction(
            self.engine.program_id(),
            &instruction,
            transaction_builder::pool_initialize_accounts(&payer.pubkey(), &addresses),
        )?;

        info!(
            pool = %addresses.pool_state,
            token_a = %addresses.token_a_mint,
            token_b = %addresses.token_b_mint,
            ratio_numerator = normalized.ratio.ratio_numerator(),
            ratio_denominator = normalized.ratio.ratio_denominator(),
            inverted = normalized.inverted,
            "Création du pool..."
        );

        let submitted = self
            .engine
            .execute("pool_initialize", move |_attempt| {
                let program_instruction = program_instruction.clone();
                async move {
                    self.engine
                        .build_signed("pool_initialize", &[program_instruction], payer, &[])
                        .await
                }
            })
            .await;

        let record = match submitted {
            Ok(receipt) => PoolRecord::new(
                &normalized,
                addresses,
                PoolOrigin::Confirmed,
                Some(receipt.signature.to_string()),
            ),
            Err(e) => {
                error!(pool = %addresses.pool_state, error = %e, "PoolInitialize a échoué, enregistrement de repli.");
                PoolRecord::new(&normalized, addresses, PoolOrigin::FallbackSimulated, None)
            }
        };

        self.cache.put(record.clone());
        self.store.save_pool(&record)?;
        Ok(record)
    }

    /// Interroge la chaîne. `Ok(None)` sur la lecture directe n'est pas concluant (retard
    /// d'indexation du nœud) : on repasse par l'énumération des comptes du programme.
    pub async fn validate_on_chain(&self, pool_id: &Pubkey) -> EngineResult<PoolValidation> {
        let program_id = *self.engine.program_id();
        match self.engine.transport().account(pool_id).await? {
            Some(account) if account.owner == program_id => return Ok(PoolValidation::Exists),
            Some(account) => {
                warn!(pool = %pool_id, owner = %account.owner, "Le compte existe mais n'appartient pas au programme.");
                return Ok(PoolValidation::Missing);
            }
            None => {}
        }

        let accounts = self.engine.transport().program_accounts(&program_id).await?;
        if accounts.iter().any(|(address, _)| address == pool_id) {
            info!(pool = %pool_id, "Pool trouvé par énumération (lecture directe en retard).");
            Ok(PoolValidation::Exists)
        } else {
            Ok(PoolValidation::Missing)
        }
    }

    /// Évince le pool du cache et du stockage, puis supprime les threads qui en dépendent.
    /// À n'appeler qu'après une validation concluante.
    pub fn cleanup_invalid(&self, pool_id: &Pubkey) -> EngineResult<usize> {
        self.cache.remove(pool_id);
        self.store.delete_pool(pool_id)?;
        let threads = self.store.delete_threads_for_pool(pool_id)?;
        warn!(pool = %pool_id, threads, "Pool absent on-chain : évincé.");
        Ok(threads)
    }

    /// Revalide un pool connu. Une erreur de transport remonte SANS toucher aux données.
    pub async fn revalidate_pool(&self, pool_id: &Pubkey) -> EngineResult<PoolValidation> {
        let validation = self.validate_on_chain(pool_id).await?;
        match validation {
            PoolValidation::Exists => {
                if let Some(record) = self.cache.update(pool_id, |r| r.is_valid = true) {
                    self.store.save_pool(&record)?;
                }
            }
            PoolValidation::Missing => {
                self.cleanup_invalid(pool_id)?;
            }
        }
        Ok(validation)
    }

    /// Lecture à trois niveaux : cache, stockage revalidé on-chain, chaîne seule.
    pub async fn get_pool(&self, pool_id: &Pubkey) -> EngineResult<PoolLookup> {
        if let Some(record) = self.cache.get(pool_id) {
            return Ok(PoolLookup::Cached(record));
        }

        if let Some(mut record) = self.store.load_pool(pool_id)? {
            return match self.validate_on_chain(pool_id).await {
                Ok(PoolValidation::Exists) => {
                    record.is_valid = true;
                    self.cache.put(record.clone());
                    Ok(PoolLookup::Hydrated(record))
                }
                Ok(PoolValidation::Missing) => {
                    self.cleanup_invalid(pool_id)?;
                    Ok(PoolLookup::NotFound)
                }
                Err(e) => {
                    warn!(pool = %pool_id, error = %e, "Validation impossible, enregistrement conservé.");
                    Err(e)
                }
            };
        }

        match self.validate_on_chain(pool_id).await? {
            PoolValidation::Exists => Ok(PoolLookup::OnChainOnly(*pool_id)),
            PoolValidation::Missing => Ok(PoolLookup::NotFound),
        }
    }

    /// Ne modifie que les drapeaux de pause.
    pub fn set_pause_flags(&self, pool_id: &Pubkey, paused: bool, swaps_paused: bool) -> EngineResult<PoolRecord> {
        let record = match self.cache.update(pool_id, |r| {
            r.paused = paused;
            r.swaps_paused = swaps_paused;
        }) {
            Some(record) => record,
            None => {
                let mut record = self.store.load_pool(pool_id)?.ok_or(EngineError::PoolNotFound(*pool_id))?;
                record.paused = paused;
                record.swaps_paused = swaps_paused;
                record
            }
        };
        self.store.save_pool(&record)?;
        Ok(record)
    }

    /// InitializeProgram : crée system_state et la trésorerie principale. `authority` doit être
    /// l'autorité d'upgrade du programme.
    pub async fn initialize_program(&self, authority: &Keypair) -> EngineResult<OperationReceipt> {
        let accounts = transaction_builder::initialize_program_accounts(self.engine.program_id(), &authority.pubkey())?;
        let instruction = transaction_builder::program_instruction(
            self.engine.program_id(),
            &FixedRatioInstruction::InitializeProgram,
            accounts,
        )?;
        self.engine
            .execute("initialize_program", move |_attempt| {
                let instruction = instruction.clone();
                async move {
                    self.engine
                        .build_signed("initialize_program", &[instruction], authority, &[])
                        .await
                }
            })
            .await
    }

    /// Lit la version du contrat par simulation de GetVersion. `None` si la sonde échoue
    /// ou si les logs ne contiennent pas de version.
    pub async fn program_version(&self, payer: &Keypair) -> EngineResult<Option<String>> {
        let instruction = transaction_builder::program_instruction(
            self.engine.program_id(),
            &FixedRatioInstruction::GetVersion,
            vec![],
        )?;
        let transaction = self.engine.build_signed("get_version", &[instruction], payer, &[]).await?;
        let outcome = self.engine.simulator().probe(&transaction).await?;
        if !outcome.is_usable() {
            warn!(error = ?outcome.report().err, "Lecture de la version impossible.");
            return Ok(None);
        }
        let version = parse_contract_version(&outcome.report().logs);
        info!(version = ?version, "Version du contrat.");
        Ok(version)
    }
}
