//! Gene representations.
//!
//! A [`Symbol`] is one gene of a [`Condition`](crate::Condition): it decides
//! whether a single input value is matched, knows how to generalize itself
//! around a value when covering, and how the genetic operators perturb and
//! recombine it.
//!
//! Two families are provided:
//!
//! - [`Ternary`] - `0`, `1` or `#` (don't care) over boolean inputs
//! - [`Interval`] - a half-open real interval `[lower, upper)` over `f64` inputs,
//!   parameterized by an [`IntervalEncoding`]:
//!   - [`CenterSpread`] - `center ± spread`
//!   - [`OrderedBound`] - `(lower, upper)`, kept in order
//!   - [`UnorderedBound`] - `(p, q)`, bounds are `min(p, q)` and `max(p, q)`
//!
//! New representations only have to implement [`Symbol`]; the rest of the
//! engine is generic over it.

use std::{fmt, str::FromStr};

use rand::Rng;

use crate::config::RepresentationConfig;

pub use self::{interval::*, ternary::*};

mod interval;
mod ternary;

/// Error returned when parsing the text form of a symbol fails.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid symbol `{text}`: {reason}")]
pub struct ParseSymbolError {
    text: String,
    reason: &'static str,
}

impl ParseSymbolError {
    pub(crate) fn new(text: &str, reason: &'static str) -> Self {
        Self {
            text: text.to_owned(),
            reason,
        }
    }
}

/// One gene of a condition.
pub trait Symbol:
    Clone + PartialEq + fmt::Debug + fmt::Display + FromStr<Err = ParseSymbolError>
{
    /// Input value matched by this gene.
    type Value: Copy + fmt::Debug;

    /// Separator placed between genes in the text form of a condition.
    ///
    /// An empty delimiter means every gene is exactly one character wide.
    const DELIMITER: &'static str;

    /// Number of independently addressable components.
    ///
    /// Crossover points are placed between components, so interval genes
    /// (two components) can be split in the middle.
    const ALLELES: usize;

    /// Returns `true` if `value` is matched by this gene.
    fn matches(&self, value: Self::Value) -> bool;

    /// Creates a gene that matches `value`, generalized at random.
    ///
    /// The result is expected to match `value`; the caller verifies it.
    fn cover<R>(value: Self::Value, config: &RepresentationConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized;

    /// Applies one mutation step. `value` is the input currently presented at
    /// this position.
    fn mutate<R>(&mut self, value: Self::Value, config: &RepresentationConfig, rng: &mut R)
    where
        R: Rng + ?Sized;

    /// Scalar generality used to rank subsumers (larger is more general).
    fn generality(&self) -> f64;

    /// Returns `true` if this gene matches at least every value `other`
    /// matches, allowing `tolerance` slack on interval bounds.
    fn is_at_least_as_general(&self, other: &Self, tolerance: f64) -> bool;

    /// Exchanges component `allele` (`< Self::ALLELES`) with `other`.
    fn swap_allele(&mut self, other: &mut Self, allele: usize);
}
