// DANS : src/execution/cu_manager.rs

use crate::error::{EngineError, EngineResult};
use std::collections::HashMap;

// Valeur par défaut sûre si l'opération est inconnue.
pub const DEFAULT_COMPUTE_UNITS: u32 = 200_000;

// NOTRE BASE DE DONNÉES DE COMPUTE UNITS
// Mesurées sur le programme déployé, avec une marge. Surchargées par la config si besoin.
const DEFAULT_BUDGETS: &[(&str, u32)] = &[
    ("initialize_program", 150_000),
    ("pool_initialize", 195_000),
    ("deposit", 310_000),
    ("withdraw", 290_000),
    ("swap", 250_000),
    ("get_version", 10_000),
    // Transactions auxiliaires (hors programme) : création de mint, mint_to, transferts.
    ("create_mint", 50_000),
    ("mint_tokens", 60_000),
    ("transfer", 5_000),
];

/// Budgets de compute units par nom d'opération. Immuable une fois construit.
#[derive(Debug, Clone)]
pub struct ComputeUnitBudgets {
    budgets: HashMap<String, u32>,
}

impl Default for ComputeUnitBudgets {
    fn default() -> Self {
        Self {
            budgets: DEFAULT_BUDGETS
                .iter()
                .map(|(name, units)| (name.to_string(), *units))
                .collect(),
        }
    }
}

impl ComputeUnitBudgets {
    /// Applique des surcharges au format `deposit=320000,swap=260000`.
    pub fn with_overrides(mut self, overrides: &str) -> EngineResult<Self> {
        for pair in overrides.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, units) = pair.split_once('=').ok_or_else(|| {
                EngineError::construction(format!("Surcharge de compute units mal formée : '{}'", pair))
            })?;
            let units: u32 = units.trim().parse().map_err(|e| {
                EngineError::construction(format!("Compute units invalides pour '{}' : {}", name, e))
            })?;
            self.budgets.insert(name.trim().to_string(), units);
        }
        Ok(self)
    }

    /// Le budget pour une opération, ou la valeur par défaut si elle est inconnue.
    pub fn units_for(&self, operation: &str) -> u32 {
        self.budgets.get(operation).copied().unwrap_or(DEFAULT_COMPUTE_UNITS)
    }
}
