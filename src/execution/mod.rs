pub mod confirmation_service; // Suivi des signatures jusqu'à confirmed/finalized.
pub mod cu_manager;           // Budgets de compute units par opération.
pub mod operations;           // Dépôt, retrait, swap, financement.
pub mod sender;               // Envoi avec reconstruction à chaque tentative.
pub mod simulator;            // Simulations de diagnostic et sondes.
pub mod transaction_builder;

pub use confirmation_service::{ConfirmationPolicy, ConfirmationRecord, ConfirmationService};
pub use cu_manager::ComputeUnitBudgets;
pub use operations::{OperationReceipt, TransactionEngine};
pub use sender::{AttemptOutcome, RetryPolicy, SubmissionAttempt, SubmissionEngine, SubmissionOutcome};
pub use simulator::{ProbeOutcome, Simulator};
