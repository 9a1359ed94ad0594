// DANS : src/protocol/instruction.rs

use crate::error::{EngineError, EngineResult};
use borsh::BorshDeserialize;

pub const INITIALIZE_PROGRAM: u8 = 0;
pub const POOL_INITIALIZE: u8 = 1;
pub const DEPOSIT: u8 = 6;
pub const WITHDRAW: u8 = 7;
pub const SWAP: u8 = 8;
pub const GET_VERSION: u8 = 14;

/// Les opérations du programme fixed-ratio-trading.
/// Format : un octet discriminant suivi de champs u64 little-endian, sans padding.
/// Le discriminant n'est PAS l'index de variante borsh, d'où l'encodage manuel de l'octet de tête.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedRatioInstruction {
    InitializeProgram,
    PoolInitialize { ratio_numerator: u64, ratio_denominator: u64 },
    Deposit { amount: u64 },
    Withdraw { amount: u64 },
    Swap { input_amount: u64, minimum_output: u64 },
    GetVersion,
}

impl FixedRatioInstruction {
    pub fn discriminator(&self) -> u8 {
        match self {
            FixedRatioInstruction::InitializeProgram => INITIALIZE_PROGRAM,
            FixedRatioInstruction::PoolInitialize { .. } => POOL_INITIALIZE,
            FixedRatioInstruction::Deposit { .. } => DEPOSIT,
            FixedRatioInstruction::Withdraw { .. } => WITHDRAW,
            FixedRatioInstruction::Swap { .. } => SWAP,
            FixedRatioInstruction::GetVersion => GET_VERSION,
        }
    }

    /// Nom de l'opération, utilisé comme clé pour les budgets de compute units.
    pub fn operation_name(&self) -> &'static str {
        match self {
            FixedRatioInstruction::InitializeProgram => "initialize_program",
            FixedRatioInstruction::PoolInitialize { .. } => "pool_initialize",
            FixedRatioInstruction::Deposit { .. } => "deposit",
            FixedRatioInstruction::Withdraw { .. } => "withdraw",
            FixedRatioInstruction::Swap { .. } => "swap",
            FixedRatioInstruction::GetVersion => "get_version",
        }
    }

    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        let mut data = vec![self.discriminator()];
        let payload = match *self {
            FixedRatioInstruction::InitializeProgram | FixedRatioInstruction::GetVersion => Vec::new(),
            FixedRatioInstruction::PoolInitialize { ratio_numerator, ratio_denominator } => {
                borsh::to_vec(&(ratio_numerator, ratio_denominator)).map_err(serialization_error)?
            }
            FixedRatioInstruction::Deposit { amount } | FixedRatioInstruction::Withdraw { amount } => {
                borsh::to_vec(&amount).map_err(serialization_error)?
            }
            FixedRatioInstruction::Swap { input_amount, minimum_output } => {
                borsh::to_vec(&(input_amount, minimum_output)).map_err(serialization_error)?
            }
        };
        data.extend_from_slice(&payload);
        Ok(data)
    }

    /// Inverse strict de `encode` : discriminant inconnu ou octets en trop sont des erreurs.
    pub fn decode(data: &[u8]) -> EngineResult<Self> {
        let (&discriminator, payload) = data
            .split_first()
            .ok_or_else(|| EngineError::construction("Instruction vide"))?;

        let instruction = match discriminator {
            INITIALIZE_PROGRAM => {
                expect_empty(payload)?;
                FixedRatioInstruction::InitializeProgram
            }
            POOL_INITIALIZE => {
                let (ratio_numerator, ratio_denominator) = decode_payload::<(u64, u64)>(payload)?;
                FixedRatioInstruction::PoolInitialize { ratio_numerator, ratio_denominator }
            }
            DEPOSIT => FixedRatioInstruction::Deposit { amount: decode_payload(payload)? },
            WITHDRAW => FixedRatioInstruction::Withdraw { amount: decode_payload(payload)? },
            SWAP => {
                let (input_amount, minimum_output) = decode_payload::<(u64, u64)>(payload)?;
                FixedRatioInstruction::Swap { input_amount, minimum_output }
            }
            GET_VERSION => {
                expect_empty(payload)?;
                FixedRatioInstruction::GetVersion
            }
            other => {
                return Err(EngineError::construction(format!("Discriminant inconnu : {}", other)));
            }
        };
        Ok(instruction)
    }
}

fn serialization_error(e: std::io::Error) -> EngineError {
    EngineError::construction(format!("Sérialisation de l'instruction impossible : {}", e))
}

fn decode_payload<T: BorshDeserialize>(payload: &[u8]) -> EngineResult<T> {
    borsh::from_slice(payload)
        .map_err(|e| EngineError::construction(format!("Payload d'instruction invalide : {}", e)))
}

fn expect_empty(payload: &[u8]) -> EngineResult<()> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(EngineError::construction(format!(
            "Payload inattendu de {} octet(s) pour une instruction sans champ",
            payload.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_initialize_layout_is_discriminator_then_two_le_u64() {
        let data = FixedRatioInstruction::PoolInitialize {
            ratio_numerator: 1_000_000_000,
            ratio_denominator: 0x0102_0304_0506_0708,
        }
        .encode()
        .unwrap();

        assert_eq!(data.len(), 17);
        assert_eq!(data[0], 1);
        assert_eq!(&data[1..9], &1_000_000_000u64.to_le_bytes());
        assert_eq!(&data[9..17], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn swap_fields_keep_their_order() {
        let data = FixedRatioInstruction::Swap { input_amount: 5, minimum_output: 9 }
            .encode()
            .unwrap();
        assert_eq!(data, vec![8, 5, 0, 0, 0, 0, 0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn payload_free_operations_are_a_single_byte() {
        assert_eq!(FixedRatioInstruction::InitializeProgram.encode().unwrap(), vec![0]);
        assert_eq!(FixedRatioInstruction::GetVersion.encode().unwrap(), vec![14]);
    }

    #[test]
    fn decoding_recovers_every_operation() {
        let all = [
            FixedRatioInstruction::InitializeProgram,
            FixedRatioInstruction::PoolInitialize { ratio_numerator: 1_000_000, ratio_denominator: 42_000_000_000 },
            FixedRatioInstruction::Deposit { amount: 310_000 },
            FixedRatioInstruction::Withdraw { amount: u64::MAX },
            FixedRatioInstruction::Swap { input_amount: 1, minimum_output: 0 },
            FixedRatioInstruction::GetVersion,
        ];
        for instruction in all {
            let encoded = instruction.encode().unwrap();
            assert_eq!(encoded[0], instruction.discriminator());
            assert_eq!(FixedRatioInstruction::decode(&encoded).unwrap(), instruction);
        }
    }

    #[test]
    fn deposit_and_withdraw_differ_only_by_discriminator() {
        let deposit = FixedRatioInstruction::Deposit { amount: 77 }.encode().unwrap();
        let withdraw = FixedRatioInstruction::Withdraw { amount: 77 }.encode().unwrap();
        assert_eq!(deposit[0], 6);
        assert_eq!(withdraw[0], 7);
        assert_eq!(deposit[1..], withdraw[1..]);
    }

    #[test]
    fn malformed_data_is_rejected() {
        assert!(FixedRatioInstruction::decode(&[]).is_err());
        assert!(FixedRatioInstruction::decode(&[2]).is_err());
        assert!(FixedRatioInstruction::decode(&[6, 1, 2, 3]).is_err());
        assert!(FixedRatioInstruction::decode(&[14, 0]).is_err());

        let mut trailing = FixedRatioInstruction::Deposit { amount: 1 }.encode().unwrap();
        trailing.push(0);
        assert!(FixedRatioInstruction::decode(&trailing).is_err());
    }
}
