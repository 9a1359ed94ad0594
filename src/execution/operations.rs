// DANS : src/execution/operations.rs

//! Les opérations "de charge" sur un pool connu : dépôt, retrait, swap, financement, mint.
//! Chaque opération passe par `execute`, qui reconstruit la transaction à chaque tentative.

use crate::error::{EngineError, EngineResult};
use crate::execution::confirmation_service::{ConfirmationPolicy, ConfirmationRecord, ConfirmationService};
use crate::execution::cu_manager::ComputeUnitBudgets;
use crate::execution::sender::{RetryPolicy, SubmissionEngine};
use crate::execution::simulator::Simulator;
use crate::execution::transaction_builder::{self, build_transaction};
use crate::pda::PoolAddresses;
use crate::protocol::FixedRatioInstruction;
use crate::rpc::RpcTransport;
use solana_sdk::{
    instruction::{AccountMeta, Instruction}, pubkey::Pubkey, signature::{Keypair, Signature}, signer::Signer,
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Le résultat d'une opération qui a atterri ET réussi.
#[derive(Debug, Clone)]
pub struct OperationReceipt {
    pub signature: Signature,
    pub attempts: u32,
    pub confirmation: ConfirmationRecord,
}

pub struct TransactionEngine {
    transport: Arc<dyn RpcTransport>,
    program_id: Pubkey,
    budgets: ComputeUnitBudgets,
    sender: SubmissionEngine,
    confirmations: ConfirmationService,
    simulator: Simulator,
    airdrop_fallback: bool,
}

impl TransactionEngine {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        program_id: Pubkey,
        budgets: ComputeUnitBudgets,
        retry_policy: RetryPolicy,
        confirmation_policy: ConfirmationPolicy,
    ) -> Self {
        Self {
            sender: SubmissionEngine::new(transport.clone(), retry_policy),
            confirmations: ConfirmationService::new(transport.clone(), confirmation_policy),
            simulator: Simulator::new(transport.clone()),
            transport,
            program_id,
            budgets,
            airdrop_fallback: false,
        }
    }

    /// Autorise `fund_wallet` à demander un airdrop quand le transfert depuis le payeur échoue.
    pub fn with_airdrop_fallback(mut self, enabled: bool) -> Self {
        self.airdrop_fallback = enabled;
        self
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn transport(&self) -> &Arc<dyn RpcTransport> {
        &self.transport
    }

    pub fn budgets(&self) -> &ComputeUnitBudgets {
        &self.budgets
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    /// Envoi avec reconstruction puis attente de l'atterrissage.
    pub async fn execute<F, Fut>(&self, label: &str, rebuild: F) -> EngineResult<OperationReceipt>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = EngineResult<Transaction>>,
    {
        let submitted = self.sender.submit_with_rebuild(label, rebuild).await?;
        let confirmation = self.confirmations.await_landing(submitted.signature).await?;
        info!(
            operation = label,
            signature = %submitted.signature,
            attempts = submitted.attempts,
            status = ?confirmation.status,
            "Opération réussie."
        );
        Ok(OperationReceipt {
            signature: submitted.signature,
            attempts: submitted.attempts,
            confirmation,
        })
    }

    /// Construit une transaction signée avec un blockhash frais et le budget de l'opération.
    pub async fn build_signed(
        &self,
        operation: &str,
        instructions: &[Instruction],
        payer: &Keypair,
        extra_signers: &[&Keypair],
    ) -> EngineResult<Transaction> {
        let blockhash = self.transport.latest_blockhash().await?;
        let mut signers = Vec::with_capacity(extra_signers.len() + 1);
        signers.push(payer);
        signers.extend_from_slice(extra_signers);
        build_transaction(
            instructions,
            &payer.pubkey(),
            &signers,
            blockhash,
            self.budgets.units_for(operation),
        )
    }

    /// Relit le compte pool-state. Un pool disparu n'est pas ré-essayable.
    async fn require_pool_account(&self, pool: &PoolAddresses) -> EngineResult<()> {
        match self.transport.account(&pool.pool_state).await? {
            Some(_) => Ok(()),
            None => Err(EngineError::PoolNotFound(pool.pool_state)),
        }
    }

    /// Construit une opération de programme sur un pool existant, avec ses ATA préalables.
    async fn build_pool_operation(
        &self,
        user: &Keypair,
        pool: &PoolAddresses,
        instruction: FixedRatioInstruction,
        accounts: Vec<AccountMeta>,
        ensure_token_accounts: &[Pubkey],
    ) -> EngineResult<Transaction> {
        self.require_pool_account(pool).await?;
        let owner = user.pubkey();
        let mut instructions: Vec<Instruction> = ensure_token_accounts
            .iter()
            .map(|mint| create_associated_token_account_idempotent(&owner, &owner, mint, &spl_token::id()))
            .collect();
        instructions.push(transaction_builder::program_instruction(&self.program_id, &instruction, accounts)?);
        self.build_signed(instruction.operation_name(), &instructions, user, &[]).await
    }

    pub async fn deposit(
        &self,
        user: &Keypair,
        pool: &PoolAddresses,
        deposit_mint: &Pubkey,
        amount: u64,
    ) -> EngineResult<OperationReceipt> {
        let side = pool.side_of(deposit_mint).ok_or_else(|| {
            EngineError::construction(format!("Le mint {} n'appartient pas au pool {}", deposit_mint, pool.pool_state))
        })?;
        let lp_mint = pool.lp_mint(side);
        let accounts = transaction_builder::liquidity_accounts(&user.pubkey(), pool, deposit_mint)?;
        let instruction = FixedRatioInstruction::Deposit { amount };

        info!(pool = %pool.pool_state, mint = %deposit_mint, amount, "Dépôt...");
        self.execute("deposit", move |_attempt| {
            let accounts = accounts.clone();
            async move { self.build_pool_operation(user, pool, instruction, accounts, &[lp_mint]).await }
        })
        .await
    }

    pub async fn withdraw(
        &self,
        user: &Keypair,
        pool: &PoolAddresses,
        withdraw_mint: &Pubkey,
        lp_amount: u64,
    ) -> EngineResult<OperationReceipt> {
        let accounts = transaction_builder::liquidity_accounts(&user.pubkey(), pool, withdraw_mint)?;
        let instruction = FixedRatioInstruction::Withdraw { amount: lp_amount };
        let withdraw_mint = *withdraw_mint;

        info!(pool = %pool.pool_state, mint = %withdraw_mint, lp_amount, "Retrait...");
        self.execute("withdraw", move |_attempt| {
            let accounts = accounts.clone();
            async move { self.build_pool_operation(user, pool, instruction, accounts, &[withdraw_mint]).await }
        })
        .await
    }

    pub async fn swap(
        &self,
        user: &Keypair,
        pool: &PoolAddresses,
        input_mint: &Pubkey,
        input_amount: u64,
        minimum_output: u64,
    ) -> EngineResult<OperationReceipt> {
        let accounts = transaction_builder::swap_accounts(&user.pubkey(), pool, input_mint)?;
        let output_mint = pool
            .side_of(input_mint)
            .map(|side| pool.mint(side.opposite()))
            .ok_or_else(|| EngineError::construction(format!("Mint d'entrée étranger au pool : {}", input_mint)))?;
        let instruction = FixedRatioInstruction::Swap { input_amount, minimum_output };

        info!(pool = %pool.pool_state, input = %input_mint, output = %output_mint, input_amount, minimum_output, "Swap...");
        self.execute("swap", move |_attempt| {
            let accounts = accounts.clone();
            async move { self.build_pool_operation(user, pool, instruction, accounts, &[output_mint]).await }
        })
        .await
    }

    /// Transfert de SOL depuis le payeur. Si le transfert échoue et que le fallback est actif,
    /// on tente un airdrop à la place.
    pub async fn fund_wallet(&self, payer: &Keypair, to: &Pubkey, lamports: u64) -> EngineResult<OperationReceipt> {
        let transfer = solana_system_interface::instruction::transfer(&payer.pubkey(), to, lamports);
        let result = self
            .execute("transfer", move |_attempt| {
                let transfer = transfer.clone();
                async move { self.build_signed("transfer", &[transfer], payer, &[]).await }
            })
            .await;

        match result {
            Err(e) if self.airdrop_fallback => {
                warn!(to = %to, lamports, error = %e, "Transfert impossible, repli sur un airdrop.");
                self.airdrop(to, lamports).await
            }
            other => other,
        }
    }

    /// Un seul essai : un airdrop refusé est presque toujours une limite du faucet.
    pub async fn airdrop(&self, to: &Pubkey, lamports: u64) -> EngineResult<OperationReceipt> {
        let signature = self.transport.request_airdrop(to, lamports).await?;
        let confirmation = self.confirmations.await_landing(signature).await?;
        info!(to = %to, lamports, signature = %signature, "Airdrop reçu.");
        Ok(OperationReceipt { signature, attempts: 1, confirmation })
    }

    /// Mint vers l'ATA de `owner` (créé si besoin). `authority` doit être l'autorité du mint.
    pub async fn mint_to(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        authority: &Keypair,
        owner: &Pubkey,
        amount: u64,
    ) -> EngineResult<OperationReceipt> {
        let destination = get_associated_token_address(owner, mint);
        let instructions = vec![
            create_associated_token_account_idempotent(&payer.pubkey(), owner, mint, &spl_token::id()),
            spl_token::instruction::mint_to(&spl_token::id(), mint, &destination, &authority.pubkey(), &[], amount)
                .map_err(|e| EngineError::construction(format!("Instruction mint_to invalide : {}", e)))?,
        ];

        info!(mint = %mint, owner = %owner, amount, "Mint de tokens...");
        self.execute("mint_tokens", move |_attempt| {
            let instructions = instructions.clone();
            async move { self.build_signed("mint_tokens", &instructions, payer, &[authority]).await }
        })
        .await
    }

    pub async fn sol_balance(&self, owner: &Pubkey) -> EngineResult<u64> {
        Ok(self.transport.balance(owner).await?)
    }

    /// Solde de l'ATA de `owner` pour `mint`.
    pub async fn token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> EngineResult<u64> {
        let account = get_associated_token_address(owner, mint);
        Ok(self.transport.token_account_balance(&account).await?)
    }
}
