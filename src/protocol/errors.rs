// DANS : src/protocol/errors.rs

//! Le vocabulaire d'erreurs du contrat (codes 1001 à 1042).
//! Les diagnostics du moteur passent par cette table au lieu d'inventer leur propre formulation.

use solana_sdk::{instruction::InstructionError, transaction::TransactionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorGroup {
    SystemConfig,
    PoolState,
    Fee,
    Liquidity,
    Swap,
    AccountPda,
    Program,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractError {
    pub code: u32,
    pub group: ErrorGroup,
    pub message: &'static str,
}

pub const FIRST_ERROR_CODE: u32 = 1001;
pub const LAST_ERROR_CODE: u32 = 1042;

/// Message des codes que le contrat ne définit pas.
pub const RESERVED_MESSAGE: &str = "Reserved contract error";

const fn entry(code: u32, group: ErrorGroup, message: &'static str) -> ContractError {
    ContractError { code, group, message }
}

const fn reserved(code: u32) -> ContractError {
    entry(code, ErrorGroup::Program, RESERVED_MESSAGE)
}

use ErrorGroup::*;

/// Indexée par `code - 1001`.
pub const CONTRACT_ERRORS: [ContractError; 42] = [
    entry(1001, PoolState, "Invalid token pair"),
    entry(1002, PoolState, "Invalid ratio"),
    entry(1003, Liquidity, "Insufficient funds"),
    entry(1004, AccountPda, "Invalid token account"),
    entry(1005, Swap, "Invalid swap amount"),
    entry(1006, AccountPda, "Rent exemption requirement not met"),
    entry(1007, PoolState, "Pool is paused"),
    reserved(1008),
    reserved(1009),
    reserved(1010),
    reserved(1011),
    entry(1012, Program, "Unauthorized"),
    reserved(1013),
    reserved(1014),
    reserved(1015),
    reserved(1016),
    reserved(1017),
    reserved(1018),
    entry(1019, Program, "Arithmetic overflow"),
    reserved(1020),
    reserved(1021),
    reserved(1022),
    entry(1023, SystemConfig, "System is paused - all operations blocked except unpause"),
    entry(1024, SystemConfig, "System is already paused"),
    entry(1025, SystemConfig, "System is not paused"),
    entry(1026, SystemConfig, "Unauthorized access to system controls"),
    entry(1027, Swap, "Pool swaps are currently paused by owner"),
    entry(1028, Swap, "Pool swaps are already paused"),
    entry(1029, Swap, "Pool swaps are not currently paused"),
    entry(1030, Fee, "Insufficient balance for fee payment"),
    entry(1031, Fee, "Fee collection failed"),
    entry(1032, Fee, "Fee validation failed"),
    entry(1033, AccountPda, "Treasury account validation failed"),
    entry(1034, SystemConfig, "Invalid SystemState PDA provided"),
    entry(1035, SystemConfig, "SystemState deserialization failed"),
    entry(1036, Fee, "Consolidation failed"),
    entry(1037, Fee, "Invalid consolidation batch"),
    entry(1038, Fee, "Pool not eligible for consolidation"),
    entry(1039, Fee, "Consolidation race condition detected"),
    entry(1040, Fee, "No pools eligible for consolidation"),
    reserved(1041),
    reserved(1042),
];

/// Cherche un code dans la table.
pub fn describe(code: u32) -> Option<&'static ContractError> {
    if !(FIRST_ERROR_CODE..=LAST_ERROR_CODE).contains(&code) {
        return None;
    }
    CONTRACT_ERRORS.get((code - FIRST_ERROR_CODE) as usize)
}

/// Extrait le code `Custom(n)` d'une erreur de transaction, s'il y en a un.
pub fn contract_error_code(error: &TransactionError) -> Option<u32> {
    match error {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
        _ => None,
    }
}

/// Cherche "custom program error: 0x3f1" dans les logs (sortie du runtime).
pub fn contract_error_code_from_logs(logs: &[String]) -> Option<u32> {
    const MARKER: &str = "custom program error: 0x";
    logs.iter().rev().find_map(|line| {
        let start = line.find(MARKER)? + MARKER.len();
        let hex_digits: String = line[start..].chars().take_while(|c| c.is_ascii_hexdigit()).collect();
        u32::from_str_radix(&hex_digits, 16).ok()
    })
}

/// Code contrat d'une simulation : l'erreur structurée d'abord, les logs du runtime sinon.
pub fn simulation_error_code(error: Option<&TransactionError>, logs: &[String]) -> Option<u32> {
    error
        .and_then(contract_error_code)
        .or_else(|| contract_error_code_from_logs(logs))
}

/// Formulation du contrat pour un code de programme.
pub fn describe_code(code: u32) -> String {
    match describe(code) {
        Some(known) => format!("[{}] {} ({:?})", known.code, known.message, known.group),
        None => format!("Code de programme inconnu {}", code),
    }
}

/// Le message à présenter pour une erreur d'exécution : formulation du contrat si le code
/// est connu, sinon la forme brute du runtime.
pub fn describe_transaction_error(error: &TransactionError) -> String {
    match contract_error_code(error) {
        Some(code) if describe(code).is_some() => describe_code(code),
        Some(code) => format!("Code de programme inconnu {} : {:?}", code, error),
        None => format!("{:?}", error),
    }
}
