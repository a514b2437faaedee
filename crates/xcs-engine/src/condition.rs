use std::{fmt, iter, str::FromStr};

use rand::Rng;

use crate::{
    config::{CrossoverMethod, RepresentationConfig},
    symbol::{ParseSymbolError, Symbol, Ternary},
};

/// Ordered sequence of genes, one per input dimension.
///
/// A condition matches a situation when every gene matches the input at the
/// same position.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition<S> {
    genes: Vec<S>,
}

impl<S> Condition<S>
where
    S: Symbol,
{
    #[must_use]
    pub fn new(genes: Vec<S>) -> Self {
        Self { genes }
    }

    /// Builds a condition matching `situation`, generalized gene by gene.
    pub fn cover<R>(situation: &[S::Value], config: &RepresentationConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let genes = situation
            .iter()
            .map(|&value| S::cover(value, config, rng))
            .collect();
        Self { genes }
    }

    #[must_use]
    pub fn genes(&self) -> &[S] {
        &self.genes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Returns `true` if every gene matches the input at its position.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the lengths differ.
    #[must_use]
    pub fn matches(&self, situation: &[S::Value]) -> bool {
        debug_assert_eq!(self.genes.len(), situation.len());
        iter::zip(&self.genes, situation).all(|(gene, &value)| gene.matches(value))
    }

    /// Returns `true` if this condition matches everything `other` matches
    /// (within `tolerance`) and the two differ.
    #[must_use]
    pub fn is_more_general(&self, other: &Self, tolerance: f64) -> bool {
        self != other
            && iter::zip(&self.genes, &other.genes)
                .all(|(gene, other)| gene.is_at_least_as_general(other, tolerance))
    }

    /// Sum of the per-gene generality.
    #[must_use]
    pub fn generality(&self) -> f64 {
        self.genes.iter().map(Symbol::generality).sum()
    }

    /// Number of crossover-addressable components.
    #[must_use]
    pub fn allele_count(&self) -> usize {
        self.genes.len() * S::ALLELES
    }

    /// Exchanges allele `index` (in `0..allele_count()`) with `other`.
    pub fn swap_allele(&mut self, other: &mut Self, index: usize) {
        let (gene, allele) = (index / S::ALLELES, index % S::ALLELES);
        self.genes[gene].swap_allele(&mut other.genes[gene], allele);
    }

    /// Recombines two conditions in place and returns whether either changed.
    ///
    /// One- and two-point crossover address alleles rather than genes, so a
    /// point may fall between the two components of an interval gene.
    pub fn crossover<R>(&mut self, other: &mut Self, method: CrossoverMethod, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        assert_eq!(self.len(), other.len());
        let before = (self.clone(), other.clone());
        let count = self.allele_count();
        match method {
            CrossoverMethod::Uniform => {
                for gene in 0..self.len() {
                    if rng.random_bool(0.5) {
                        for allele in 0..S::ALLELES {
                            self.swap_allele(other, gene * S::ALLELES + allele);
                        }
                    }
                }
            }
            CrossoverMethod::OnePoint => {
                let point = rng.random_range(0..=count);
                for index in point..count {
                    self.swap_allele(other, index);
                }
            }
            CrossoverMethod::TwoPoint => {
                let mut first = rng.random_range(0..=count);
                let mut second = rng.random_range(0..=count);
                if first > second {
                    (first, second) = (second, first);
                }
                for index in first..second {
                    self.swap_allele(other, index);
                }
            }
        }
        *self != before.0 || *other != before.1
    }

    /// Mutates each gene with `probability`, returning whether any gene was
    /// touched.
    pub fn mutate<R>(
        &mut self,
        situation: &[S::Value],
        probability: f64,
        config: &RepresentationConfig,
        rng: &mut R,
    ) -> bool
    where
        R: Rng + ?Sized,
    {
        let mut mutated = false;
        for (gene, &value) in iter::zip(&mut self.genes, situation) {
            if rng.random_bool(probability) {
                gene.mutate(value, config, rng);
                mutated = true;
            }
        }
        mutated
    }
}

impl Condition<Ternary> {
    #[must_use]
    pub fn dont_care_count(&self) -> usize {
        self.genes.iter().filter(|gene| gene.is_dont_care()).count()
    }
}

impl<S> fmt::Display for Condition<S>
where
    S: Symbol,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, gene) in self.genes.iter().enumerate() {
            if i > 0 {
                f.write_str(S::DELIMITER)?;
            }
            write!(f, "{gene}")?;
        }
        Ok(())
    }
}

impl<S> FromStr for Condition<S>
where
    S: Symbol,
{
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseSymbolError::new(s, "empty condition"));
        }
        let genes = if S::DELIMITER.is_empty() {
            s.char_indices()
                .map(|(i, ch)| s[i..i + ch.len_utf8()].parse())
                .collect::<Result<_, _>>()?
        } else {
            s.split(S::DELIMITER)
                .filter(|token| !token.is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()?
        };
        Ok(Self { genes })
    }
}
