// DANS : src/state/pool_cache.rs

use crate::state::pool_manager::PoolRecord;
use solana_sdk::pubkey::Pubkey;
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

/// Vue mémoire des pools connus (pool_state -> PoolRecord).
/// Simple optimisation : la chaîne reste la source de vérité.
/// Les verrous ne sont jamais tenus pendant un appel réseau : on clone en sortie.
pub struct PoolCache {
    pools: RwLock<HashMap<Pubkey, PoolRecord>>,
}

impl Default for PoolCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolCache {
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, pool_id: &Pubkey) -> Option<PoolRecord> {
        let reader = self.pools.read().unwrap_or_else(PoisonError::into_inner);
        reader.get(pool_id).cloned()
    }

    pub fn put(&self, record: PoolRecord) {
        let mut writer = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        writer.insert(record.pool_id(), record);
    }

    pub fn remove(&self, pool_id: &Pubkey) -> Option<PoolRecord> {
        let mut writer = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        writer.remove(pool_id)
    }

    /// Applique `mutate` à l'entrée en place et retourne la version modifiée.
    pub fn update<F>(&self, pool_id: &Pubkey, mutate: F) -> Option<PoolRecord>
    where
        F: FnOnce(&mut PoolRecord),
    {
        let mut writer = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        writer.get_mut(pool_id).map(|record| {
            mutate(record);
            record.clone()
        })
    }

    pub fn pool_ids(&self) -> Vec<Pubkey> {
        let reader = self.pools.read().unwrap_or_else(PoisonError::into_inner);
        reader.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.pools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
