// Transport en mémoire pour les tests d'intégration.
#![allow(dead_code)]

use async_trait::async_trait;
use frt_load::execution::{ComputeUnitBudgets, ConfirmationPolicy, RetryPolicy, TransactionEngine};
use frt_load::rpc::{ConfirmationLevel, RpcTransport, SignatureStatusView, SimulationReport, TransportError};
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
    transaction::TransactionError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn program_id() -> Pubkey {
    Pubkey::new_from_array([42u8; 32])
}

#[derive(Default)]
pub struct StubTransport {
    /// Réponses scriptées aux envois, consommées dans l'ordre. Vide = accepté.
    pub send_script: Mutex<VecDeque<TransportError>>,
    pub always_reject: AtomicBool,
    pub sends: AtomicUsize,
    pub simulations: AtomicUsize,
    pub blockhashes: AtomicUsize,
    /// Statut renvoyé pour toute signature ; `None` = jamais vue.
    pub status: Mutex<Option<SignatureStatusView>>,
    pub accounts: Mutex<HashMap<Pubkey, Account>>,
    /// Comptes visibles uniquement par énumération (retard d'indexation).
    pub indexed_only: Mutex<Vec<Pubkey>>,
    pub connection_down: AtomicBool,
    pub simulation_logs: Mutex<Vec<String>>,
    /// La simulation répond par une erreur de transport, l'envoi n'est pas affecté.
    pub simulate_fails: AtomicBool,
}

impl StubTransport {
    /// Accepte tout et confirme tout.
    pub fn healthy() -> Arc<Self> {
        let stub = Self::default();
        stub.set_status(ConfirmationLevel::Confirmed, None);
        Arc::new(stub)
    }

    pub fn reject_next(&self, count: usize) {
        let mut script = self.send_script.lock().unwrap();
        for i in 0..count {
            script.push_back(TransportError::Rejected(format!("Blockhash not found ({})", i + 1)));
        }
    }

    pub fn set_status(&self, level: ConfirmationLevel, err: Option<TransactionError>) {
        *self.status.lock().unwrap() = Some(SignatureStatusView { level, err });
    }

    pub fn clear_status(&self) {
        *self.status.lock().unwrap() = None;
    }

    pub fn add_program_account(&self, address: Pubkey) {
        self.accounts.lock().unwrap().insert(
            address,
            Account {
                lamports: 1_000_000,
                data: vec![0u8; 64],
                owner: program_id(),
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    fn check_connection(&self) -> Result<(), TransportError> {
        if self.connection_down.load(Ordering::SeqCst) {
            Err(TransportError::Connection("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RpcTransport for StubTransport {
    async fn latest_blockhash(&self) -> Result<Hash, TransportError> {
        self.check_connection()?;
        self.blockhashes.fetch_add(1, Ordering::SeqCst);
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, TransportError> {
        self.check_connection()?;
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.always_reject.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("Transaction simulation failed".to_string()));
        }
        if let Some(err) = self.send_script.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(transaction.signatures[0])
    }

    async fn simulate_transaction(&self, _transaction: &Transaction) -> Result<SimulationReport, TransportError> {
        self.check_connection()?;
        self.simulations.fetch_add(1, Ordering::SeqCst);
        if self.simulate_fails.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("simulation unavailable".to_string()));
        }
        Ok(SimulationReport {
            err: None,
            logs: self.simulation_logs.lock().unwrap().clone(),
            units_consumed: Some(1_234),
        })
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<Account>, TransportError> {
        self.check_connection()?;
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64, TransportError> {
        self.check_connection()?;
        Ok(self.accounts.lock().unwrap().get(address).map(|a| a.lamports).unwrap_or(0))
    }

    async fn token_account_balance(&self, _address: &Pubkey) -> Result<u64, TransportError> {
        self.check_connection()?;
        Ok(0)
    }

    async fn signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatusView>>, TransportError> {
        self.check_connection()?;
        let status = self.status.lock().unwrap().clone();
        Ok(signatures.iter().map(|_| status.clone()).collect())
    }

    async fn program_accounts(&self, program: &Pubkey) -> Result<Vec<(Pubkey, Account)>, TransportError> {
        self.check_connection()?;
        let mut found: Vec<(Pubkey, Account)> = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, account)| account.owner == *program)
            .map(|(address, account)| (*address, account.clone()))
            .collect();
        for address in self.indexed_only.lock().unwrap().iter() {
            found.push((*address, Account { owner: *program, ..Account::default() }));
        }
        Ok(found)
    }

    async fn request_airdrop(&self, _to: &Pubkey, _lamports: u64) -> Result<Signature, TransportError> {
        self.check_connection()?;
        Ok(Signature::new_unique())
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, TransportError> {
        self.check_connection()?;
        Ok(890_880 + data_len as u64 * 7)
    }
}

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        retry_delay: Duration::from_millis(1),
        final_attempt_delay: Duration::from_millis(5),
    }
}

pub fn fast_confirmation(max_polls: u32) -> ConfirmationPolicy {
    ConfirmationPolicy {
        max_polls,
        poll_delay: Duration::from_millis(1),
    }
}

pub fn engine(stub: &Arc<StubTransport>, max_attempts: u32) -> TransactionEngine {
    TransactionEngine::new(
        stub.clone(),
        program_id(),
        ComputeUnitBudgets::default(),
        fast_retry(max_attempts),
        fast_confirmation(5),
    )
}
