// DANS : src/ratio.rs

//! Normalisation des paires et des ratios en "basis points" (unités de base 10^decimals).
//!
//! Règle du contrat : un côté du ratio vaut exactement 1.0 unité d'affichage,
//! c'est-à-dire `10^decimals` de son token. On ancre toujours le tokenA canonique.

use crate::error::{EngineError, EngineResult};
use crate::pda::compare_addresses;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::{cmp::Ordering, fmt, str::FromStr};
use tracing::warn;

/// Au-delà, 10^decimals ne tient plus dans un u64.
pub const MAX_DECIMALS: u8 = 19;

/// Bornes du ratio d'affichage au-delà desquelles on émet un avertissement.
pub const MAX_SANE_DISPLAY_RATIO: f64 = 1e6;
pub const MIN_SANE_DISPLAY_RATIO: f64 = 1e-6;

/// Sens demandé par l'appelant pour le ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    AToB,
    BToA,
}

impl FromStr for Direction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a_to_b" => Ok(Direction::AToB),
            "b_to_a" => Ok(Direction::BToA),
            other => Err(EngineError::construction(format!("Direction inconnue : '{}'", other))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AToB => write!(f, "a_to_b"),
            Direction::BToA => write!(f, "b_to_a"),
        }
    }
}

/// Trie deux mints par octets bruts. Retourne `(tokenA, tokenB, inverted)` où `inverted`
/// indique que le premier argument est devenu le tokenB canonique.
pub fn derive_ordered_tokens(first: Pubkey, second: Pubkey) -> (Pubkey, Pubkey, bool) {
    match compare_addresses(&first, &second) {
        Ordering::Greater => (second, first, true),
        _ => (first, second, false),
    }
}

/// Une paire de tokens dans l'ordre canonique. L'ordre est recalculé à chaque construction,
/// jamais supposé à partir de l'ordre de l'appelant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderedTokenPair {
    token_a: Pubkey,
    token_b: Pubkey,
}

impl OrderedTokenPair {
    pub fn new(first: Pubkey, second: Pubkey) -> EngineResult<Self> {
        if first == second {
            return Err(EngineError::construction(format!(
                "Paire invalide : les deux tokens sont identiques ({})",
                first
            )));
        }
        let (token_a, token_b, _) = derive_ordered_tokens(first, second);
        Ok(Self { token_a, token_b })
    }

    pub fn token_a(&self) -> Pubkey {
        self.token_a
    }

    pub fn token_b(&self) -> Pubkey {
        self.token_b
    }

    pub fn contains(&self, mint: &Pubkey) -> bool {
        *mint == self.token_a || *mint == self.token_b
    }

    /// L'autre token de la paire.
    pub fn other(&self, mint: &Pubkey) -> Option<Pubkey> {
        if *mint == self.token_a {
            Some(self.token_b)
        } else if *mint == self.token_b {
            Some(self.token_a)
        } else {
            None
        }
    }
}

/// `10^decimals`, vérifié.
pub fn decimal_factor(decimals: u8) -> EngineResult<u64> {
    if decimals > MAX_DECIMALS {
        return Err(EngineError::construction(format!(
            "Décimales hors limites : {} (max {})",
            decimals, MAX_DECIMALS
        )));
    }
    Ok(10u64.pow(decimals as u32))
}

/// Le ratio d'un pool en basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RatioSpec {
    ratio_numerator: u64,
    ratio_denominator: u64,
}

impl RatioSpec {
    /// Construit un ratio en vérifiant la règle "ancré à 1" : au moins un côté doit valoir
    /// exactement `10^decimals` de son token. Un ratio 1:1 ancre les deux côtés.
    pub fn new(ratio_numerator: u64, ratio_denominator: u64, decimals_a: u8, decimals_b: u8) -> EngineResult<Self> {
        if ratio_numerator == 0 || ratio_denominator == 0 {
            return Err(EngineError::construction(format!(
                "Ratio nul interdit : {}:{}",
                ratio_numerator, ratio_denominator
            )));
        }
        let spec = Self { ratio_numerator, ratio_denominator };
        let (anchored_a, anchored_b) = spec.anchors(decimals_a, decimals_b)?;
        if !anchored_a && !anchored_b {
            return Err(EngineError::construction(format!(
                "Ratio {}:{} non ancré à 1 (attendu {} ou {})",
                ratio_numerator,
                ratio_denominator,
                decimal_factor(decimals_a)?,
                decimal_factor(decimals_b)?
            )));
        }
        Ok(spec)
    }

    pub fn ratio_numerator(&self) -> u64 {
        self.ratio_numerator
    }

    pub fn ratio_denominator(&self) -> u64 {
        self.ratio_denominator
    }

    /// `(numérateur == 10^decA, dénominateur == 10^decB)`.
    pub fn anchors(&self, decimals_a: u8, decimals_b: u8) -> EngineResult<(bool, bool)> {
        Ok((
            self.ratio_numerator == decimal_factor(decimals_a)?,
            self.ratio_denominator == decimal_factor(decimals_b)?,
        ))
    }

    /// Combien d'unités d'affichage de tokenB pour une unité de tokenA.
    pub fn display_ratio(&self, decimals_a: u8, decimals_b: u8) -> EngineResult<f64> {
        let a = self.ratio_numerator as f64 / decimal_factor(decimals_a)? as f64;
        let b = self.ratio_denominator as f64 / decimal_factor(decimals_b)? as f64;
        Ok(b / a)
    }
}

/// Résultat de la normalisation : ce qui part on-chain et ce qui sert à dériver les PDA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedPool {
    pub pair: OrderedTokenPair,
    pub ratio: RatioSpec,
    /// Décimales du tokenA canonique.
    pub decimals_a: u8,
    /// Décimales du tokenB canonique.
    pub decimals_b: u8,
    /// Vrai si le "A" de l'appelant est devenu le B canonique (après prise en compte de la direction).
    pub inverted: bool,
}

/// Canonicalise la paire et calcule le ratio : `10^decA` contre `ratio * 10^decB`.
///
/// La direction n'est absorbée que dans `inverted` ; il n'existe pas de branche "ancrer B".
pub fn normalize(
    token_a_mint: Pubkey,
    token_b_mint: Pubkey,
    decimals_a: u8,
    decimals_b: u8,
    whole_ratio: u64,
    direction: Direction,
) -> EngineResult<NormalizedPool> {
    if whole_ratio == 0 {
        return Err(EngineError::construction("Le ratio entier doit être strictement positif"));
    }
    let pair = OrderedTokenPair::new(token_a_mint, token_b_mint)?;

    let caller_order_inverted = pair.token_a() != token_a_mint;
    let inverted = match direction {
        Direction::AToB => caller_order_inverted,
        Direction::BToA => !caller_order_inverted,
    };

    let (canonical_decimals_a, canonical_decimals_b) = if caller_order_inverted {
        (decimals_b, decimals_a)
    } else {
        (decimals_a, decimals_b)
    };

    let ratio_numerator = decimal_factor(canonical_decimals_a)?;
    let ratio_denominator = whole_ratio
        .checked_mul(decimal_factor(canonical_decimals_b)?)
        .ok_or_else(|| {
            EngineError::construction(format!(
                "Dépassement u64 : {} * 10^{}",
                whole_ratio, canonical_decimals_b
            ))
        })?;

    let ratio = RatioSpec::new(ratio_numerator, ratio_denominator, canonical_decimals_a, canonical_decimals_b)?;

    let display_value = ratio.display_ratio(canonical_decimals_a, canonical_decimals_b)?;
    if !(MIN_SANE_DISPLAY_RATIO..=MAX_SANE_DISPLAY_RATIO).contains(&display_value) {
        warn!(
            display_ratio = display_value,
            ratio_numerator,
            ratio_denominator,
            "Ratio d'affichage hors de la plage habituelle, le contrat reste seul juge."
        );
    }

    Ok(NormalizedPool {
        pair,
        ratio,
        decimals_a: canonical_decimals_a,
        decimals_b: canonical_decimals_b,
        inverted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn low_mint() -> Pubkey {
        Pubkey::new_from_array([1u8; 32])
    }

    fn high_mint() -> Pubkey {
        Pubkey::new_from_array([250u8; 32])
    }

    #[test]
    fn one_token_a_for_a_thousand_token_b() {
        let normalized = normalize(low_mint(), high_mint(), 9, 6, 1000, Direction::AToB).unwrap();
        assert_eq!(normalized.pair.token_a(), low_mint());
        assert_eq!(normalized.ratio.ratio_numerator(), 1_000_000_000);
        assert_eq!(normalized.ratio.ratio_denominator(), 1_000_000_000);
        assert!(!normalized.inverted);

        // tokenA ancré à 1 ; tokenB vaut 1000 unités d'affichage, donc pas ancré.
        assert_eq!(normalized.ratio.anchors(9, 6).unwrap(), (true, false));
        assert_eq!(normalized.ratio.display_ratio(9, 6).unwrap(), 1000.0);
    }

    #[test]
    fn caller_order_is_recomputed_from_raw_bytes() {
        let normalized = normalize(high_mint(), low_mint(), 9, 6, 1000, Direction::AToB).unwrap();
        assert_eq!(normalized.pair.token_a(), low_mint());
        assert_eq!(normalized.pair.token_b(), high_mint());
        assert!(normalized.inverted);
        // Les décimales suivent leur token : le A canonique a 6 décimales.
        assert_eq!(normalized.decimals_a, 6);
        assert_eq!(normalized.ratio.ratio_numerator(), 1_000_000);
        assert_eq!(normalized.ratio.ratio_denominator(), 1000 * 1_000_000_000);
    }

    #[test]
    fn b_to_a_flips_the_inversion_flag_only() {
        let forward = normalize(low_mint(), high_mint(), 6, 6, 50, Direction::AToB).unwrap();
        let reverse = normalize(low_mint(), high_mint(), 6, 6, 50, Direction::BToA).unwrap();
        assert_eq!(forward.ratio, reverse.ratio);
        assert_eq!(forward.pair, reverse.pair);
        assert!(!forward.inverted);
        assert!(reverse.inverted);
    }

    #[test]
    fn one_to_one_anchors_both_sides() {
        let normalized = normalize(low_mint(), high_mint(), 9, 6, 1, Direction::AToB).unwrap();
        assert_eq!(normalized.ratio.anchors(9, 6).unwrap(), (true, true));
    }

    #[test]
    fn out_of_range_display_ratio_only_warns() {
        let normalized = normalize(low_mint(), high_mint(), 0, 0, 10_000_000, Direction::AToB).unwrap();
        let display_value = normalized.ratio.display_ratio(0, 0).unwrap();
        assert!(display_value > MAX_SANE_DISPLAY_RATIO);
        assert_eq!(normalized.ratio.ratio_denominator(), 10_000_000);
    }

    #[test]
    fn construction_errors_fail_fast() {
        assert!(matches!(
            normalize(low_mint(), high_mint(), 9, 6, 0, Direction::AToB),
            Err(EngineError::Construction(_))
        ));
        assert!(matches!(
            normalize(low_mint(), low_mint(), 9, 6, 10, Direction::AToB),
            Err(EngineError::Construction(_))
        ));
        assert!(matches!(
            normalize(low_mint(), high_mint(), 9, 18, u64::MAX / 2, Direction::AToB),
            Err(EngineError::Construction(_))
        ));
        assert!(matches!(
            normalize(low_mint(), high_mint(), 20, 6, 10, Direction::AToB),
            Err(EngineError::Construction(_))
        ));
    }

    #[test]
    fn unanchored_ratio_is_rejected() {
        // 2.5 A contre 3.7 B : aucun côté ne vaut 1.
        assert!(RatioSpec::new(2_500_000_000, 3_700_000, 9, 6).is_err());
        assert!(RatioSpec::new(1_000_000_000, 3_700_000, 9, 6).is_ok());
        assert!(RatioSpec::new(2_000_000_000, 1_000_000, 9, 6).is_ok());
    }

    #[test]
    fn direction_parses_from_wire_names() {
        assert_eq!("a_to_b".parse::<Direction>().unwrap(), Direction::AToB);
        assert_eq!("b_to_a".parse::<Direction>().unwrap(), Direction::BToA);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::BToA.to_string(), "b_to_a");
    }

    fn arb_pubkey() -> impl Strategy<Value = Pubkey> {
        any::<[u8; 32]>().prop_map(Pubkey::new_from_array)
    }

    proptest! {
        #[test]
        fn normalize_is_order_independent(
            x in arb_pubkey(),
            y in arb_pubkey(),
            dec_x in 0u8..=9,
            dec_y in 0u8..=9,
            whole in 1u64..=1_000_000,
        ) {
            prop_assume!(x != y);
            let forward = normalize(x, y, dec_x, dec_y, whole, Direction::AToB).unwrap();
            let swapped = normalize(y, x, dec_y, dec_x, whole, Direction::AToB).unwrap();
            prop_assert_eq!(forward.pair, swapped.pair);
            prop_assert_eq!(forward.ratio, swapped.ratio);
            prop_assert_eq!(forward.decimals_a, swapped.decimals_a);
            prop_assert_eq!(forward.inverted, !swapped.inverted);

            // Inverser l'ordre ET la direction revient au même drapeau.
            let swapped_reversed = normalize(y, x, dec_y, dec_x, whole, Direction::BToA).unwrap();
            prop_assert_eq!(forward.inverted, swapped_reversed.inverted);
        }

        #[test]
        fn ordering_is_idempotent(x in arb_pubkey(), y in arb_pubkey()) {
            let (a, b, _) = derive_ordered_tokens(x, y);
            let (a2, b2, inverted_again) = derive_ordered_tokens(a, b);
            prop_assert_eq!((a, b), (a2, b2));
            prop_assert!(!inverted_again);
            prop_assert!(a.to_bytes() <= b.to_bytes());
        }

        #[test]
        fn exactly_one_side_is_anchored_above_one_to_one(
            x in arb_pubkey(),
            y in arb_pubkey(),
            dec_x in 0u8..=9,
            dec_y in 0u8..=9,
            whole in 2u64..=1_000_000,
        ) {
            prop_assume!(x != y);
            let normalized = normalize(x, y, dec_x, dec_y, whole, Direction::AToB).unwrap();
            let (anchored_a, anchored_b) = normalized
                .ratio
                .anchors(normalized.decimals_a, normalized.decimals_b)
                .unwrap();
            prop_assert!(anchored_a ^ anchored_b);
        }
    }
}
