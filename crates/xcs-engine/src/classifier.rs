use std::fmt;

use rand::Rng;

use crate::{condition::Condition, config::XcsConfig, symbol::Symbol};

/// Upper bound on the factor a low fitness multiplies the deletion vote by.
const MAX_VOTE_INFLATION: f64 = 1.0e6;

/// Values usable as actions: compared by equality and cloned into rules.
pub trait Action: Clone + PartialEq + fmt::Debug {}

impl<T> Action for T where T: Clone + PartialEq + fmt::Debug {}

/// A condition-action rule with its learned statistics.
///
/// A classifier with `numerosity > 1` is a macro-classifier standing in for
/// that many identical micro-classifiers. Fitness is stored for the whole
/// macro-classifier; prediction, error, experience and action set size are
/// shared by its micro-classifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier<S, A> {
    pub(crate) condition: Condition<S>,
    pub(crate) action: A,
    pub(crate) prediction: f64,
    pub(crate) error: f64,
    pub(crate) fitness: f64,
    pub(crate) experience: u64,
    pub(crate) time_stamp: u64,
    pub(crate) action_set_size: f64,
    pub(crate) numerosity: u32,
}

impl<S, A> Classifier<S, A>
where
    S: Symbol,
    A: Action,
{
    /// Creates a classifier with the configured initial statistics.
    #[must_use]
    pub fn new(condition: Condition<S>, action: A, time_stamp: u64, config: &XcsConfig) -> Self {
        Self {
            condition,
            action,
            prediction: config.initial_prediction,
            error: config.initial_error,
            fitness: config.initial_fitness,
            experience: 0,
            time_stamp,
            action_set_size: 1.0,
            numerosity: 1,
        }
    }

    /// Creates a covering classifier for `situation` advocating `action`.
    pub fn cover<R>(
        situation: &[S::Value],
        action: A,
        time_stamp: u64,
        config: &XcsConfig,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let condition = Condition::cover(situation, &config.representation, rng);
        Self::new(condition, action, time_stamp, config)
    }

    #[must_use]
    pub fn condition(&self) -> &Condition<S> {
        &self.condition
    }

    #[must_use]
    pub fn action(&self) -> &A {
        &self.action
    }

    #[must_use]
    pub fn prediction(&self) -> f64 {
        self.prediction
    }

    #[must_use]
    pub fn error(&self) -> f64 {
        self.error
    }

    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    #[must_use]
    pub fn experience(&self) -> u64 {
        self.experience
    }

    #[must_use]
    pub fn time_stamp(&self) -> u64 {
        self.time_stamp
    }

    #[must_use]
    pub fn action_set_size(&self) -> f64 {
        self.action_set_size
    }

    #[must_use]
    pub fn numerosity(&self) -> u32 {
        self.numerosity
    }

    /// Fitness of one micro-classifier.
    #[must_use]
    pub fn micro_fitness(&self) -> f64 {
        self.fitness / f64::from(self.numerosity)
    }

    /// Accuracy κ: 1 below the error threshold, then a power-law fall-off.
    #[must_use]
    pub fn accuracy(&self, config: &XcsConfig) -> f64 {
        if self.error < config.error_threshold {
            1.0
        } else {
            config.accuracy_falloff
                * (self.error / config.error_threshold).powf(-config.accuracy_exponent)
        }
    }

    /// Returns `true` if the classifier is experienced and accurate enough to
    /// subsume others.
    #[must_use]
    pub fn is_subsumer(&self, config: &XcsConfig) -> bool {
        self.experience > config.subsumption_threshold && self.error < config.error_threshold
    }

    /// Returns `true` if this classifier may absorb `other`: it is a subsumer,
    /// advocates the same action and is more general.
    #[must_use]
    pub fn could_subsume(&self, other: &Self, config: &XcsConfig) -> bool {
        self.is_subsumer(config)
            && self.action == other.action
            && self
                .condition
                .is_more_general(&other.condition, config.subsumption_tolerance)
    }

    /// Deletion vote: proportional to the niche size, inflated for mature
    /// classifiers whose micro-fitness is well below `mean_fitness`.
    ///
    /// The inflation is capped, so a mature classifier with zero fitness gets
    /// the largest vote its niche size allows.
    pub(crate) fn deletion_vote(&self, mean_fitness: f64, config: &XcsConfig) -> f64 {
        let numerosity = f64::from(self.numerosity);
        let vote = self.action_set_size * numerosity;
        let micro_fitness = self.fitness / numerosity;
        if self.experience > config.deletion_threshold
            && micro_fitness < config.deletion_fitness_fraction * mean_fitness
        {
            let inflation = if micro_fitness > 0.0 {
                (mean_fitness / micro_fitness).min(MAX_VOTE_INFLATION)
            } else {
                MAX_VOTE_INFLATION
            };
            vote * inflation
        } else {
            vote
        }
    }

    /// Moves error, prediction and action set size toward their targets.
    ///
    /// The error target uses the prediction from before this update.
    #[expect(clippy::cast_precision_loss)]
    pub(crate) fn update_statistics(&mut self, payoff: f64, set_numerosity: f64, config: &XcsConfig) {
        self.experience += 1;
        let experience = self.experience as f64;
        let rate = if config.use_mam && experience < 1.0 / config.learning_rate {
            1.0 / experience
        } else {
            config.learning_rate
        };
        self.error += rate * ((payoff - self.prediction).abs() - self.error);
        self.prediction += rate * (payoff - self.prediction);
        self.action_set_size += rate * (set_numerosity - self.action_set_size);
    }

    /// Resets the learned statistics to their initial values, keeping the
    /// condition, action and numerosity.
    pub(crate) fn reset_statistics(&mut self, time_stamp: u64, config: &XcsConfig) {
        self.prediction = config.initial_prediction;
        self.error = config.initial_error;
        self.fitness = config.initial_fitness;
        self.experience = 0;
        self.time_stamp = time_stamp;
        self.action_set_size = 1.0;
    }
}

impl<S, A> fmt::Display for Classifier<S, A>
where
    S: Symbol,
    A: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : {:?} (p={:.3}, e={:.3}, F={:.4}, exp={}, n={})",
            self.condition,
            self.action,
            self.prediction,
            self.error,
            self.fitness,
            self.experience,
            self.numerosity
        )
    }
}
