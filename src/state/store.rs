// DANS : src/state/store.rs

use crate::error::{EngineError, EngineResult};
use crate::state::pool_manager::PoolRecord;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::{debug, info};

/// Le stockage durable des pools et des threads qui en dépendent.
/// Aussi consultatif que le cache mémoire : la chaîne tranche.
pub trait PoolStore: Send + Sync {
    fn load_pool(&self, pool_id: &Pubkey) -> EngineResult<Option<PoolRecord>>;
    fn save_pool(&self, record: &PoolRecord) -> EngineResult<()>;
    /// Retourne vrai si un enregistrement a été supprimé.
    fn delete_pool(&self, pool_id: &Pubkey) -> EngineResult<bool>;
    /// Supprime l'état des threads rattachés au pool. Retourne le nombre supprimé.
    fn delete_threads_for_pool(&self, pool_id: &Pubkey) -> EngineResult<usize>;
}

/// Un thread de charge rattaché à un pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadBinding {
    pub thread_id: String,
    pub pool_id: Pubkey,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    pools: Vec<PoolRecord>,
    #[serde(default)]
    threads: Vec<ThreadBinding>,
}

/// Stockage dans un unique fichier JSON, réécrit à chaque modification.
pub struct JsonPoolStore {
    path: PathBuf,
    // Sérialise les cycles lecture-modification-écriture.
    lock: Mutex<()>,
}

impl JsonPoolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> EngineResult<StoreFile> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Fichier de stockage absent, démarrage à vide.");
            return Ok(StoreFile::default());
        }
        let file = File::open(&self.path).map_err(|e| {
            EngineError::Store(format!("Impossible d'ouvrir '{}' : {}", self.path.display(), e))
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            EngineError::Store(format!("Erreur de désérialisation de '{}' : {}", self.path.display(), e))
        })
    }

    fn write(&self, contents: &StoreFile) -> EngineResult<()> {
        let file = File::create(&self.path).map_err(|e| {
            EngineError::Store(format!("Impossible de créer '{}' : {}", self.path.display(), e))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, contents).map_err(|e| {
            EngineError::Store(format!("Erreur de sérialisation vers '{}' : {}", self.path.display(), e))
        })?;
        writer.flush().map_err(|e| {
            EngineError::Store(format!("Écriture incomplète de '{}' : {}", self.path.display(), e))
        })
    }

    fn modify<T>(&self, change: impl FnOnce(&mut StoreFile) -> T) -> EngineResult<T> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut contents = self.read()?;
        let result = change(&mut contents);
        self.write(&contents)?;
        Ok(result)
    }

    pub fn load_all(&self) -> EngineResult<Vec<PoolRecord>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.pools)
    }

    /// Rattache un thread à un pool (remplace un rattachement existant du même thread).
    pub fn bind_thread(&self, thread_id: &str, pool_id: Pubkey) -> EngineResult<()> {
        self.modify(|contents| {
            contents.threads.retain(|t| t.thread_id != thread_id);
            contents.threads.push(ThreadBinding {
                thread_id: thread_id.to_string(),
                pool_id,
            });
        })
    }

    pub fn threads_for_pool(&self, pool_id: &Pubkey) -> EngineResult<Vec<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self
            .read()?
            .threads
            .into_iter()
            .filter(|t| t.pool_id == *pool_id)
            .map(|t| t.thread_id)
            .collect())
    }
}

impl PoolStore for JsonPoolStore {
    fn load_pool(&self, pool_id: &Pubkey) -> EngineResult<Option<PoolRecord>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.pools.into_iter().find(|p| p.pool_id() == *pool_id))
    }

    fn save_pool(&self, record: &PoolRecord) -> EngineResult<()> {
        self.modify(|contents| {
            contents.pools.retain(|p| p.pool_id() != record.pool_id());
            contents.pools.push(record.clone());
        })?;
        debug!(pool = %record.pool_id(), path = %self.path.display(), "Pool sauvegardé.");
        Ok(())
    }

    fn delete_pool(&self, pool_id: &Pubkey) -> EngineResult<bool> {
        self.modify(|contents| {
            let before = contents.pools.len();
            contents.pools.retain(|p| p.pool_id() != *pool_id);
            before != contents.pools.len()
        })
    }

    fn delete_threads_for_pool(&self, pool_id: &Pubkey) -> EngineResult<usize> {
        let removed = self.modify(|contents| {
            let before = contents.threads.len();
            contents.threads.retain(|t| t.pool_id != *pool_id);
            before - contents.threads.len()
        })?;
        if removed > 0 {
            info!(pool = %pool_id, removed, "Threads rattachés au pool supprimés.");
        }
        Ok(removed)
    }
}
