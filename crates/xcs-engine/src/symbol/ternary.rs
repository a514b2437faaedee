use std::{fmt, mem, str::FromStr};

use rand::Rng;

use crate::config::RepresentationConfig;

use super::{ParseSymbolError, Symbol};

/// Ternary gene over a boolean input: `0`, `1` or `#` (don't care).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::IsVariant)]
pub enum Ternary {
    DontCare,
    Bit(bool),
}

impl Symbol for Ternary {
    type Value = bool;

    const DELIMITER: &'static str = "";
    const ALLELES: usize = 1;

    #[inline]
    fn matches(&self, value: bool) -> bool {
        match *self {
            Ternary::DontCare => true,
            Ternary::Bit(bit) => bit == value,
        }
    }

    fn cover<R>(value: bool, config: &RepresentationConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        if rng.random_bool(config.dont_care_probability) {
            Ternary::DontCare
        } else {
            Ternary::Bit(value)
        }
    }

    fn mutate<R>(&mut self, value: bool, _config: &RepresentationConfig, _rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        // niche mutation: the mutated gene still matches `value`
        *self = match *self {
            Ternary::DontCare => Ternary::Bit(value),
            Ternary::Bit(_) => Ternary::DontCare,
        };
    }

    fn generality(&self) -> f64 {
        if self.is_dont_care() { 1.0 } else { 0.0 }
    }

    fn is_at_least_as_general(&self, other: &Self, _tolerance: f64) -> bool {
        self.is_dont_care() || self == other
    }

    fn swap_allele(&mut self, other: &mut Self, allele: usize) {
        debug_assert_eq!(allele, 0);
        mem::swap(self, other);
    }
}

impl fmt::Display for Ternary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ch = match self {
            Ternary::DontCare => '#',
            Ternary::Bit(false) => '0',
            Ternary::Bit(true) => '1',
        };
        write!(f, "{ch}")
    }
}

impl FromStr for Ternary {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "#" => Ok(Ternary::DontCare),
            "0" => Ok(Ternary::Bit(false)),
            "1" => Ok(Ternary::Bit(true)),
            _ => Err(ParseSymbolError::new(s, "expected `0`, `1` or `#`")),
        }
    }
}
