// DANS : src/protocol/mod.rs

// Le contrat "wire" avec le programme on-chain : format des instructions et table des erreurs.
// Rien ici ne parle au réseau.
pub mod errors;
pub mod instruction;

pub use errors::{contract_error_code, describe_transaction_error, ContractError, ErrorGroup};
pub use instruction::FixedRatioInstruction;
