// DANS : src/execution/transaction_builder.rs

//! Assemblage des transactions : instruction de compute budget, instruction du programme,
//! comptes dans l'ordre positionnel attendu par le programme.
//!
//! ATTENTION : le programme lit le compte N par son index. Réordonner une liste ci-dessous
//! ne casse pas la compilation, ça casse la transaction on-chain.

use crate::error::{EngineError, EngineResult};
use crate::pda::{self, PoolAddresses};
use crate::protocol::FixedRatioInstruction;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    packet::PACKET_DATA_SIZE,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    sysvar,
    transaction::Transaction,
};
use spl_associated_token_account::get_associated_token_address;

/// Discriminant `SetComputeUnitLimit` du programme ComputeBudget.
pub const SET_COMPUTE_UNIT_LIMIT: u8 = 0x02;

/// `[0x02, unités en u32 LE]` adressée au programme ComputeBudget.
pub fn compute_budget_instruction(units: u32) -> Instruction {
    let mut data = Vec::with_capacity(5);
    data.push(SET_COMPUTE_UNIT_LIMIT);
    data.extend_from_slice(&units.to_le_bytes());
    Instruction {
        program_id: solana_sdk::compute_budget::ID,
        accounts: vec![],
        data,
    }
}

/// Comptes de InitializeProgram.
pub fn initialize_program_accounts(program_id: &Pubkey, authority: &Pubkey) -> EngineResult<Vec<AccountMeta>> {
    Ok(vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new_readonly(solana_system_interface::program::ID, false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new(pda::system_state(program_id)?.address, false),
        AccountMeta::new(pda::main_treasury(program_id)?.address, false),
        AccountMeta::new_readonly(pda::program_data_address(program_id)?.address, false),
    ])
}

/// Comptes de PoolInitialize.
pub fn pool_initialize_accounts(payer: &Pubkey, addresses: &PoolAddresses) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(solana_system_interface::program::ID, false),
        AccountMeta::new_readonly(addresses.system_state, false),
        AccountMeta::new(addresses.pool_state, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(addresses.main_treasury, false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(addresses.token_a_mint, false),
        AccountMeta::new_readonly(addresses.token_b_mint, false),
        AccountMeta::new(addresses.token_a_vault, false),
        AccountMeta::new(addresses.token_b_vault, false),
        AccountMeta::new(addresses.lp_token_a_mint, false),
        AccountMeta::new(addresses.lp_token_b_mint, false),
    ]
}

/// Comptes de Deposit et Withdraw (même forme). `mint` choisit le côté du pool.
pub fn liquidity_accounts(user: &Pubkey, addresses: &PoolAddresses, mint: &Pubkey) -> EngineResult<Vec<AccountMeta>> {
    let side = addresses.side_of(mint).ok_or_else(|| {
        EngineError::construction(format!("Le mint {} n'appartient pas au pool {}", mint, addresses.pool_state))
    })?;
    let lp_mint = addresses.lp_mint(side);

    Ok(vec![
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(solana_system_interface::program::ID, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(addresses.system_state, false),
        AccountMeta::new(addresses.pool_state, false),
        AccountMeta::new_readonly(*mint, false),
        AccountMeta::new(addresses.vault(side), false),
        AccountMeta::new(get_associated_token_address(user, mint), false),
        AccountMeta::new(lp_mint, false),
        AccountMeta::new(get_associated_token_address(user, &lp_mint), false),
        AccountMeta::new(addresses.main_treasury, false),
        AccountMeta::new(addresses.pool_treasury, false),
    ])
}

/// Comptes de Swap. `input_mint` fixe le sens ; la sortie est l'autre côté du pool.
pub fn swap_accounts(user: &Pubkey, addresses: &PoolAddresses, input_mint: &Pubkey) -> EngineResult<Vec<AccountMeta>> {
    let input_side = addresses.side_of(input_mint).ok_or_else(|| {
        EngineError::construction(format!(
            "Le mint d'entrée {} n'appartient pas au pool {}",
            input_mint, addresses.pool_state
        ))
    })?;
    let output_side = input_side.opposite();
    let output_mint = addresses.mint(output_side);

    Ok(vec![
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(solana_system_interface::program::ID, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(addresses.system_state, false),
        AccountMeta::new(addresses.pool_state, false),
        AccountMeta::new(get_associated_token_address(user, input_mint), false),
        AccountMeta::new(get_associated_token_address(user, &output_mint), false),
        AccountMeta::new(addresses.vault(input_side), false),
        AccountMeta::new(addresses.vault(output_side), false),
        AccountMeta::new(addresses.main_treasury, false),
        AccountMeta::new(addresses.pool_treasury, false),
    ])
}

/// L'instruction du programme : données encodées + comptes positionnels.
pub fn program_instruction(
    program_id: &Pubkey,
    instruction: &FixedRatioInstruction,
    accounts: Vec<AccountMeta>,
) -> EngineResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: instruction.encode()?,
    })
}

/// Construit et signe une transaction legacy. L'instruction de compute budget passe toujours
/// en premier. `signers` doit contenir le payeur ; l'ordre n'a pas d'importance.
pub fn build_transaction(
    instructions: &[Instruction],
    payer: &Pubkey,
    signers: &[&Keypair],
    recent_blockhash: Hash,
    compute_units: u32,
) -> EngineResult<Transaction> {
    let mut all_instructions = Vec::with_capacity(instructions.len() + 1);
    all_instructions.push(compute_budget_instruction(compute_units));
    all_instructions.extend_from_slice(instructions);

    let mut transaction = Transaction::new_with_payer(&all_instructions, Some(payer));
    transaction
        .try_sign(signers, recent_blockhash)
        .map_err(|e| EngineError::construction(format!("Signature de la transaction impossible : {}", e)))?;
    Ok(transaction)
}

/// Les octets "wire" de la transaction.
pub fn serialize_transaction(transaction: &Transaction) -> EngineResult<Vec<u8>> {
    bincode::serialize(transaction)
        .map_err(|e| EngineError::construction(format!("Sérialisation de la transaction impossible : {}", e)))
}

/// Blockhash factice. Réservé à la validation de format : une transaction signée avec
/// ce blockhash ne doit jamais être envoyée.
pub fn placeholder_blockhash() -> Hash {
    Hash::default()
}

/// Construit la transaction avec un blockhash factice et vérifie qu'elle tient dans un paquet.
/// Retourne la taille en octets.
pub fn validate_format(instructions: &[Instruction], payer: &Keypair, compute_units: u32) -> EngineResult<usize> {
    let transaction = build_transaction(
        instructions,
        &payer.pubkey(),
        &[payer],
        placeholder_blockhash(),
        compute_units,
    )?;
    let size = serialize_transaction(&transaction)?.len();
    if size > PACKET_DATA_SIZE {
        return Err(EngineError::construction(format!(
            "Transaction trop grande : {} octets (max {})",
            size, PACKET_DATA_SIZE
        )));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratio::{normalize, Direction};

    fn program() -> Pubkey {
        Pubkey::new_from_array([42u8; 32])
    }

    fn pool() -> PoolAddresses {
        let normalized = normalize(
            Pubkey::new_from_array([5u8; 32]),
            Pubkey::new_from_array([6u8; 32]),
            9,
            6,
            1000,
            Direction::AToB,
        )
        .unwrap();
        PoolAddresses::derive(&program(), &normalized.pair, &normalized.ratio).unwrap()
    }

    fn keys(accounts: &[AccountMeta]) -> Vec<Pubkey> {
        accounts.iter().map(|a| a.pubkey).collect()
    }

    #[test]
    fn compute_budget_is_discriminator_two_then_le_u32() {
        let ix = compute_budget_instruction(310_000);
        assert_eq!(ix.program_id, solana_sdk::compute_budget::ID);
        assert_eq!(ix.data, vec![0x02, 0xF0, 0xBA, 0x04, 0x00]);
        assert!(ix.accounts.is_empty());
    }

    #[test]
    fn pool_initialize_accounts_follow_the_abi_order() {
        let payer = Pubkey::new_unique();
        let addresses = pool();
        let accounts = pool_initialize_accounts(&payer, &addresses);
        assert_eq!(
            keys(&accounts),
            vec![
                payer,
                solana_system_interface::program::ID,
                addresses.system_state,
                addresses.pool_state,
                spl_token::id(),
                addresses.main_treasury,
                sysvar::rent::id(),
                addresses.token_a_mint,
                addresses.token_b_mint,
                addresses.token_a_vault,
                addresses.token_b_vault,
                addresses.lp_token_a_mint,
                addresses.lp_token_b_mint,
            ]
        );
        assert!(accounts[0].is_signer && accounts[0].is_writable);
        assert!(accounts[3].is_writable);
        assert!(!accounts[7].is_writable);
    }

    #[test]
    fn deposit_accounts_pick_the_side_of_the_deposit_mint() {
        let user = Pubkey::new_unique();
        let addresses = pool();
        let mint_b = addresses.token_b_mint;
        let accounts = liquidity_accounts(&user, &addresses, &mint_b).unwrap();

        assert_eq!(accounts.len(), 12);
        assert_eq!(accounts[0].pubkey, user);
        assert_eq!(accounts[4].pubkey, addresses.pool_state);
        assert!(accounts[4].is_writable);
        assert_eq!(accounts[5].pubkey, mint_b);
        assert_eq!(accounts[6].pubkey, addresses.token_b_vault);
        assert_eq!(accounts[7].pubkey, get_associated_token_address(&user, &mint_b));
        assert_eq!(accounts[8].pubkey, addresses.lp_token_b_mint);
        assert_eq!(accounts[9].pubkey, get_associated_token_address(&user, &addresses.lp_token_b_mint));
        assert_eq!(accounts[10].pubkey, addresses.main_treasury);
        assert_eq!(accounts[11].pubkey, addresses.pool_treasury);
    }

    #[test]
    fn foreign_mint_is_a_construction_error() {
        let addresses = pool();
        let err = liquidity_accounts(&Pubkey::new_unique(), &addresses, &Pubkey::new_unique()).unwrap_err();
        assert!(matches!(err, EngineError::Construction(_)));
        assert!(swap_accounts(&Pubkey::new_unique(), &addresses, &Pubkey::new_unique()).is_err());
    }

    #[test]
    fn swap_accounts_route_input_to_output_vault() {
        let user = Pubkey::new_unique();
        let addresses = pool();
        let accounts = swap_accounts(&user, &addresses, &addresses.token_a_mint).unwrap();

        assert_eq!(accounts.len(), 11);
        assert_eq!(accounts[1].pubkey, solana_system_interface::program::ID);
        assert_eq!(accounts[2].pubkey, spl_token::id());
        assert_eq!(accounts[5].pubkey, get_associated_token_address(&user, &addresses.token_a_mint));
        assert_eq!(accounts[6].pubkey, get_associated_token_address(&user, &addresses.token_b_mint));
        assert_eq!(accounts[7].pubkey, addresses.token_a_vault);
        assert_eq!(accounts[8].pubkey, addresses.token_b_vault);
    }

    #[test]
    fn initialize_program_targets_the_program_data_account() {
        let authority = Pubkey::new_unique();
        let accounts = initialize_program_accounts(&program(), &authority).unwrap();
        assert_eq!(accounts.len(), 6);
        assert_eq!(accounts[3].pubkey, pda::system_state(&program()).unwrap().address);
        assert_eq!(accounts[4].pubkey, pda::main_treasury(&program()).unwrap().address);
        assert_eq!(accounts[5].pubkey, pda::program_data_address(&program()).unwrap().address);
    }

    #[test]
    fn compute_budget_precedes_the_program_instruction() {
        let payer = Keypair::new();
        let addresses = pool();
        let ix = program_instruction(
            &program(),
            &FixedRatioInstruction::Deposit { amount: 1_000 },
            liquidity_accounts(&payer.pubkey(), &addresses, &addresses.token_a_mint).unwrap(),
        )
        .unwrap();

        let tx = build_transaction(&[ix], &payer.pubkey(), &[&payer], Hash::new_unique(), 310_000).unwrap();
        let message = &tx.message;
        assert_eq!(message.instructions.len(), 2);
        let first_program = message.account_keys[message.instructions[0].program_id_index as usize];
        let second_program = message.account_keys[message.instructions[1].program_id_index as usize];
        assert_eq!(first_program, solana_sdk::compute_budget::ID);
        assert_eq!(second_program, program());
        assert_eq!(message.instructions[1].data, vec![6, 0xE8, 0x03, 0, 0, 0, 0, 0, 0]);
        assert_eq!(message.account_keys[0], payer.pubkey());
        assert!(tx.is_signed());
    }

    #[test]
    fn missing_signer_is_reported_not_panicked() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let ix = program_instruction(
            &program(),
            &FixedRatioInstruction::GetVersion,
            vec![AccountMeta::new(other.pubkey(), true)],
        )
        .unwrap();
        let err = build_transaction(&[ix], &payer.pubkey(), &[&payer], Hash::new_unique(), 10_000).unwrap_err();
        assert!(matches!(err, EngineError::Construction(_)));
    }

    #[test]
    fn format_validation_uses_the_placeholder_blockhash() {
        let payer = Keypair::new();
        let addresses = pool();
        let ix = program_instruction(
            &program(),
            &FixedRatioInstruction::PoolInitialize { ratio_numerator: 1, ratio_denominator: 1 },
            pool_initialize_accounts(&payer.pubkey(), &addresses),
        )
        .unwrap();
        let size = validate_format(&[ix], &payer, 195_000).unwrap();
        assert!(size > 0 && size <= PACKET_DATA_SIZE);
        assert_eq!(placeholder_blockhash(), Hash::default());
    }
}
