use std::{fmt, marker::PhantomData, mem, str::FromStr};

use rand::Rng;

use crate::config::{RepresentationConfig, ValueRange};

use super::{ParseSymbolError, Symbol};

/// How the two stored components of an [`Interval`] map to its bounds.
pub trait IntervalEncoding: fmt::Debug + Clone + Copy + PartialEq + Default {
    /// Returns `(lower, upper)` for the stored components `(a, b)`.
    fn bounds(a: f64, b: f64) -> (f64, f64);

    /// Draws the components of a gene matching `value`.
    fn cover<R>(value: f64, config: &RepresentationConfig, rng: &mut R) -> (f64, f64)
    where
        R: Rng + ?Sized;

    /// Clips component `allele` into the admissible range.
    fn restrict(_allele: usize, x: f64, range: &ValueRange) -> f64 {
        range.clamp(x)
    }

    /// Restores the encoding invariant after a component changed.
    fn normalize(_a: &mut f64, _b: &mut f64) {}
}

/// Draws `(lower, upper)` around `value` with each side at most `max_spread`
/// wide, `lower <= value < upper`.
fn draw_bounds<R>(value: f64, config: &RepresentationConfig, rng: &mut R) -> (f64, f64)
where
    R: Rng + ?Sized,
{
    let mut lower = value - config.max_spread * rng.random::<f64>();
    let mut upper = value + config.max_spread * (1.0 - rng.random::<f64>());
    if config.truncate_covering {
        lower = lower.max(config.value_range.min);
        upper = upper.min(config.value_range.max);
    }
    (lower, upper)
}

/// `a` is the center, `b` the (non-negative) spread.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CenterSpreadEncoding;

impl IntervalEncoding for CenterSpreadEncoding {
    fn bounds(center: f64, spread: f64) -> (f64, f64) {
        (center - spread, center + spread)
    }

    fn cover<R>(value: f64, config: &RepresentationConfig, rng: &mut R) -> (f64, f64)
    where
        R: Rng + ?Sized,
    {
        let mut spread = config.max_spread * (1.0 - rng.random::<f64>());
        if config.truncate_covering {
            let room = f64::min(
                value - config.value_range.min,
                config.value_range.max - value,
            );
            // a value on the range boundary keeps its untruncated spread
            if room > 0.0 {
                spread = spread.min(room);
            }
        }
        (value, spread)
    }

    fn restrict(allele: usize, x: f64, range: &ValueRange) -> f64 {
        match allele {
            0 => range.clamp(x),
            _ => x.clamp(0.0, range.width()),
        }
    }

    fn normalize(_center: &mut f64, spread: &mut f64) {
        *spread = spread.abs();
    }
}

/// `a` is the lower bound, `b` the upper bound; `a <= b` is maintained.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrderedBoundEncoding;

impl IntervalEncoding for OrderedBoundEncoding {
    fn bounds(lower: f64, upper: f64) -> (f64, f64) {
        (lower, upper)
    }

    fn cover<R>(value: f64, config: &RepresentationConfig, rng: &mut R) -> (f64, f64)
    where
        R: Rng + ?Sized,
    {
        draw_bounds(value, config, rng)
    }

    fn normalize(lower: &mut f64, upper: &mut f64) {
        if lower > upper {
            mem::swap(lower, upper);
        }
    }
}

/// `a` and `b` are bounds in either order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnorderedBoundEncoding;

impl IntervalEncoding for UnorderedBoundEncoding {
    fn bounds(p: f64, q: f64) -> (f64, f64) {
        (p.min(q), p.max(q))
    }

    fn cover<R>(value: f64, config: &RepresentationConfig, rng: &mut R) -> (f64, f64)
    where
        R: Rng + ?Sized,
    {
        let (lower, upper) = draw_bounds(value, config, rng);
        if rng.random_bool(0.5) {
            (upper, lower)
        } else {
            (lower, upper)
        }
    }
}

/// Half-open real interval gene, matching `lower <= value < upper`.
///
/// The text form is the two raw components separated by a colon (`a:b`), so
/// a dumped gene parses back to exactly the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval<E> {
    a: f64,
    b: f64,
    encoding: PhantomData<E>,
}

pub type CenterSpread = Interval<CenterSpreadEncoding>;
pub type OrderedBound = Interval<OrderedBoundEncoding>;
pub type UnorderedBound = Interval<UnorderedBoundEncoding>;

impl<E> Interval<E>
where
    E: IntervalEncoding,
{
    /// Creates a gene from its raw components, restoring the encoding invariant.
    #[must_use]
    pub fn new(mut a: f64, mut b: f64) -> Self {
        E::normalize(&mut a, &mut b);
        Self {
            a,
            b,
            encoding: PhantomData,
        }
    }

    /// Returns the raw components `(a, b)`.
    #[must_use]
    pub fn components(&self) -> (f64, f64) {
        (self.a, self.b)
    }

    #[must_use]
    pub fn lower(&self) -> f64 {
        E::bounds(self.a, self.b).0
    }

    #[must_use]
    pub fn upper(&self) -> f64 {
        E::bounds(self.a, self.b).1
    }

    fn component_mut(&mut self, allele: usize) -> &mut f64 {
        match allele {
            0 => &mut self.a,
            1 => &mut self.b,
            _ => panic!("interval allele out of range: {allele}"),
        }
    }
}

impl<E> Symbol for Interval<E>
where
    E: IntervalEncoding,
{
    type Value = f64;

    const DELIMITER: &'static str = " ";
    const ALLELES: usize = 2;

    #[inline]
    fn matches(&self, value: f64) -> bool {
        let (lower, upper) = E::bounds(self.a, self.b);
        lower <= value && value < upper
    }

    fn cover<R>(value: f64, config: &RepresentationConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let (a, b) = E::cover(value, config, rng);
        Self::new(a, b)
    }

    fn mutate<R>(&mut self, _value: f64, config: &RepresentationConfig, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let allele = rng.random_range(0..Self::ALLELES);
        let delta = rng.random_range(-config.max_mutation..=config.max_mutation);
        let component = self.component_mut(allele);
        *component += delta;
        if config.restrict_range {
            *component = E::restrict(allele, *component, &config.value_range);
        }
        E::normalize(&mut self.a, &mut self.b);
    }

    fn generality(&self) -> f64 {
        let (lower, upper) = E::bounds(self.a, self.b);
        upper - lower
    }

    fn is_at_least_as_general(&self, other: &Self, tolerance: f64) -> bool {
        let (lower, upper) = E::bounds(self.a, self.b);
        let (other_lower, other_upper) = E::bounds(other.a, other.b);
        lower <= other_lower + tolerance && upper >= other_upper - tolerance
    }

    fn swap_allele(&mut self, other: &mut Self, allele: usize) {
        mem::swap(self.component_mut(allele), other.component_mut(allele));
        E::normalize(&mut self.a, &mut self.b);
        E::normalize(&mut other.a, &mut other.b);
    }
}

impl<E> fmt::Display for Interval<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.a, self.b)
    }
}

impl<E> FromStr for Interval<E>
where
    E: IntervalEncoding,
{
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| ParseSymbolError::new(s, "expected `a:b`"))?;
        let a = a
            .trim()
            .parse()
            .map_err(|_| ParseSymbolError::new(s, "invalid first component"))?;
        let b = b
            .trim()
            .parse()
            .map_err(|_| ParseSymbolError::new(s, "invalid second component"))?;
        Ok(Self::new(a, b))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn covering_config() -> RepresentationConfig {
        RepresentationConfig {
            max_spread: 0.3,
            value_range: ValueRange { min: 0.0, max: 1.0 },
            truncate_covering: true,
            ..RepresentationConfig::default()
        }
    }

    fn assert_cover_matches<E>()
    where
        E: IntervalEncoding,
    {
        let mut rng = Pcg32::seed_from_u64(42);
        let config = covering_config();
        for _ in 0..1000 {
            let value: f64 = rng.random();
            let gene = Interval::<E>::cover(value, &config, &mut rng);
            assert!(gene.matches(value), "{gene} does not match {value}");
            assert!(gene.lower() >= 0.0 || !config.truncate_covering);
        }
        // boundary value on the lower edge of the range
        let gene = Interval::<E>::cover(0.0, &config, &mut rng);
        assert!(gene.matches(0.0));
    }

    #[test]
    fn test_cover_matches_every_encoding() {
        assert_cover_matches::<CenterSpreadEncoding>();
        assert_cover_matches::<OrderedBoundEncoding>();
        assert_cover_matches::<UnorderedBoundEncoding>();
    }

    #[test]
    fn test_half_open_matching() {
        let gene = OrderedBound::new(0.2, 0.4);
        assert!(gene.matches(0.2));
        assert!(gene.matches(0.3));
        assert!(!gene.matches(0.4));
        assert!(!gene.matches(0.1));

        let gene = CenterSpread::new(0.5, 0.25);
        assert_eq!((gene.lower(), gene.upper()), (0.25, 0.75));
        assert!(gene.matches(0.25));
        assert!(!gene.matches(0.75));
    }

    #[test]
    fn test_unordered_bounds() {
        let gene = UnorderedBound::new(0.7, 0.1);
        assert_eq!(gene.components(), (0.7, 0.1));
        assert_eq!((gene.lower(), gene.upper()), (0.1, 0.7));
        assert!(gene.matches(0.5));
    }

    #[test]
    fn test_ordered_bound_stays_ordered() {
        let gene = OrderedBound::new(0.9, 0.1);
        assert_eq!(gene.components(), (0.1, 0.9));

        let mut rng = Pcg32::seed_from_u64(3);
        let config = RepresentationConfig {
            max_mutation: 0.5,
            ..covering_config()
        };
        let mut gene = OrderedBound::new(0.45, 0.5);
        for _ in 0..500 {
            gene.mutate(0.0, &config, &mut rng);
            let (lower, upper) = gene.components();
            assert!(lower <= upper);
            assert!((0.0..=1.0).contains(&lower));
            assert!((0.0..=1.0).contains(&upper));
        }
    }

    #[test]
    fn test_center_spread_mutation_keeps_spread_non_negative() {
        let mut rng = Pcg32::seed_from_u64(5);
        let config = RepresentationConfig {
            max_mutation: 0.5,
            restrict_range: false,
            ..covering_config()
        };
        let mut gene = CenterSpread::new(0.5, 0.01);
        for _ in 0..500 {
            gene.mutate(0.0, &config, &mut rng);
            assert!(gene.components().1 >= 0.0);
        }
    }

    #[test]
    fn test_generality_with_tolerance() {
        let wide = OrderedBound::new(0.1, 0.9);
        let narrow = OrderedBound::new(0.2, 0.8);
        let shifted = OrderedBound::new(0.05, 0.85);
        assert!(wide.is_at_least_as_general(&narrow, 0.0));
        assert!(!narrow.is_at_least_as_general(&wide, 0.0));
        assert!(!wide.is_at_least_as_general(&shifted, 0.0));
        assert!(wide.is_at_least_as_general(&shifted, 0.06));
        assert!(wide.generality() > narrow.generality());
    }

    #[test]
    fn test_swap_allele_reorders() {
        let mut first = OrderedBound::new(0.1, 0.2);
        let mut second = OrderedBound::new(0.5, 0.6);
        first.swap_allele(&mut second, 0);
        // first received lower 0.5 above its upper 0.2 and was re-sorted
        assert_eq!(first.components(), (0.2, 0.5));
        assert_eq!(second.components(), (0.1, 0.6));
    }

    #[test]
    fn test_text_form_is_exact() {
        let gene = CenterSpread::new(0.1 + 0.2, 1.0 / 3.0);
        let parsed: CenterSpread = gene.to_string().parse().unwrap();
        assert_eq!(parsed, gene);
        assert!("0.5".parse::<CenterSpread>().is_err());
        assert!("x:0.5".parse::<OrderedBound>().is_err());
    }
}
