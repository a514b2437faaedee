//! Learning parameters.
//!
//! [`XcsConfig`] holds every tunable constant of the system. It is owned by the
//! [`Xcs`](crate::Xcs) instance and lent by reference to each component on every
//! call, so a change made through [`Xcs::set_config`](crate::Xcs::set_config)
//! (for example switching to condensation) is seen by all of them at once.
//!
//! Configurations are plain serde structs. Missing fields take their default
//! values, so a JSON file only needs to list what it changes:
//!
//! ```
//! use xcs_engine::XcsConfig;
//!
//! let config = XcsConfig::from_json_str(r#"{ "max_population": 400 }"#).unwrap();
//! assert_eq!(config.max_population, 400);
//! assert_eq!(config.learning_rate, 0.2);
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

/// Error returned when a configuration cannot be loaded or is inconsistent.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ConfigError {
    #[display("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[display("failed to parse configuration: {_0}")]
    #[from]
    Parse(serde_json::Error),
    #[display("invalid value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Crossover operator applied to the genes of two offspring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverMethod {
    /// Every gene is swapped independently with probability 0.5.
    Uniform,
    /// All alleles after one random point are swapped.
    OnePoint,
    /// All alleles between two random points are swapped.
    #[default]
    TwoPoint,
}

/// Strategy used to pick parents in the GA and victims in deletion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SelectionMethod {
    /// Fitness-proportionate (deletion-vote-proportionate) roulette wheel.
    #[default]
    Roulette,
    /// Every candidate takes part with probability `participation` (τ); the
    /// best participant wins, and a uniform draw is made if nobody takes part.
    Tournament { participation: f64 },
}

/// Admissible input range `[min, max)` for interval representations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ValueRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl ValueRange {
    #[must_use]
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Parameters of the gene representation used by covering and mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepresentationConfig {
    /// Probability of a don't-care gene when covering (P#, ternary only).
    pub dont_care_probability: f64,
    /// Maximum distance from the covered value to a bound (s₀, intervals only).
    pub max_spread: f64,
    /// Maximum change of one component per mutation (m₀, intervals only).
    pub max_mutation: f64,
    /// Input range used for clipping and truncation.
    pub value_range: ValueRange,
    /// Clip mutated components into `value_range`.
    pub restrict_range: bool,
    /// Truncate covering bounds to `value_range`.
    pub truncate_covering: bool,
}

impl Default for RepresentationConfig {
    fn default() -> Self {
        Self {
            dont_care_probability: 0.33,
            max_spread: 0.5,
            max_mutation: 0.1,
            value_range: ValueRange::default(),
            restrict_range: true,
            truncate_covering: true,
        }
    }
}

/// Learning parameters of an XCS instance.
///
/// Greek letters in the field documentation refer to the usual names of the
/// parameters in the XCS literature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct XcsConfig {
    /// Maximum population size in micro-classifiers (N).
    pub max_population: u64,
    /// Learning rate (β).
    pub learning_rate: f64,
    /// Accuracy fall-off (α).
    pub accuracy_falloff: f64,
    /// Accuracy exponent (ν).
    pub accuracy_exponent: f64,
    /// Error below which a classifier is considered accurate (ε₀).
    pub error_threshold: f64,
    /// Discount factor for multi-step payoff (γ).
    pub discount: f64,
    /// Mean time since the last GA above which an action set is evolved (θ_GA).
    pub ga_threshold: u64,
    /// Crossover probability (χ).
    pub crossover_probability: f64,
    pub crossover_method: CrossoverMethod,
    /// Per-gene mutation probability (μ).
    pub mutation_probability: f64,
    /// Experience above which a low fitness inflates the deletion vote (θ_del).
    pub deletion_threshold: u64,
    /// Fraction of the mean fitness considered low for deletion (δ).
    pub deletion_fitness_fraction: f64,
    /// Experience above which an accurate classifier may subsume (θ_sub).
    pub subsumption_threshold: u64,
    /// Slack on interval bounds when testing generality.
    pub subsumption_tolerance: f64,
    /// Minimum number of actions in a match set before covering stops (θ_mna).
    ///
    /// `None` requires every available action.
    pub min_actions: Option<usize>,
    /// Prediction of a newly covered classifier (p_I).
    pub initial_prediction: f64,
    /// Prediction error of a newly covered classifier (ε_I).
    pub initial_error: f64,
    /// Fitness of a newly covered classifier (F_I).
    pub initial_fitness: f64,
    /// Probability of a random action while exploring.
    pub explore_probability: f64,
    pub selection: SelectionMethod,
    /// Weight roulette selection of parents by numerosity.
    pub numerosity_weighted_selection: bool,
    pub ga_subsumption: bool,
    pub action_set_subsumption: bool,
    pub mutate_action: bool,
    /// Use the exact running average for the first `1/β` updates.
    pub use_mam: bool,
    pub representation: RepresentationConfig,
}

impl Default for XcsConfig {
    fn default() -> Self {
        Self {
            max_population: 800,
            learning_rate: 0.2,
            accuracy_falloff: 0.1,
            accuracy_exponent: 5.0,
            error_threshold: 10.0,
            discount: 0.71,
            ga_threshold: 25,
            crossover_probability: 0.8,
            crossover_method: CrossoverMethod::default(),
            mutation_probability: 0.04,
            deletion_threshold: 20,
            deletion_fitness_fraction: 0.1,
            subsumption_threshold: 20,
            subsumption_tolerance: 0.0,
            min_actions: None,
            initial_prediction: 10.0,
            initial_error: 0.0,
            initial_fitness: 0.01,
            explore_probability: 1.0,
            selection: SelectionMethod::default(),
            numerosity_weighted_selection: false,
            ga_subsumption: true,
            action_set_subsumption: false,
            mutate_action: true,
            use_mam: true,
            representation: RepresentationConfig::default(),
        }
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be a probability in [0, 1]",
        })
    }
}

fn check(field: &'static str, ok: bool, reason: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, reason })
    }
}

impl XcsConfig {
    /// Parses a JSON configuration and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file and validates it.
    pub fn load_json<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Checks that every parameter lies in its admissible range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            "max_population",
            self.max_population > 0,
            "must be positive",
        )?;
        check(
            "learning_rate",
            self.learning_rate > 0.0 && self.learning_rate <= 1.0,
            "must be in (0, 1]",
        )?;
        check(
            "accuracy_falloff",
            self.accuracy_falloff > 0.0 && self.accuracy_falloff <= 1.0,
            "must be in (0, 1]",
        )?;
        check(
            "accuracy_exponent",
            self.accuracy_exponent > 0.0,
            "must be positive",
        )?;
        check(
            "error_threshold",
            self.error_threshold > 0.0,
            "must be positive",
        )?;
        check(
            "discount",
            (0.0..=1.0).contains(&self.discount),
            "must be in [0, 1]",
        )?;
        check_probability("crossover_probability", self.crossover_probability)?;
        check_probability("mutation_probability", self.mutation_probability)?;
        check_probability("deletion_fitness_fraction", self.deletion_fitness_fraction)?;
        check_probability("explore_probability", self.explore_probability)?;
        check(
            "subsumption_tolerance",
            self.subsumption_tolerance >= 0.0,
            "must not be negative",
        )?;
        check(
            "initial_fitness",
            self.initial_fitness > 0.0,
            "must be positive",
        )?;
        check(
            "initial_error",
            self.initial_error >= 0.0,
            "must not be negative",
        )?;
        if let SelectionMethod::Tournament { participation } = self.selection {
            check_probability("selection.participation", participation)?;
        }

        let repr = &self.representation;
        check_probability(
            "representation.dont_care_probability",
            repr.dont_care_probability,
        )?;
        check(
            "representation.max_spread",
            repr.max_spread > 0.0,
            "must be positive",
        )?;
        check(
            "representation.max_mutation",
            repr.max_mutation >= 0.0,
            "must not be negative",
        )?;
        check(
            "representation.value_range",
            repr.value_range.min < repr.value_range.max,
            "min must be below max",
        )?;
        Ok(())
    }

    /// Number of distinct actions the match set must advocate when the
    /// learner knows `action_count` actions.
    ///
    /// Fails if `min_actions` is outside `1..=action_count`, or if the
    /// population cannot hold one classifier per required action.
    pub fn required_actions(&self, action_count: usize) -> Result<usize, ConfigError> {
        let required = match self.min_actions {
            Some(n) => {
                check(
                    "min_actions",
                    (1..=action_count).contains(&n),
                    "must be between 1 and the number of actions",
                )?;
                n
            }
            None => action_count,
        };
        check(
            "max_population",
            self.max_population >= u64::try_from(required).unwrap_or(u64::MAX),
            "must hold one classifier per required action",
        )?;
        Ok(required)
    }

    /// Turns rule discovery off so that only subsumption and deletion reshape
    /// the population.
    pub fn condense(&mut self) {
        self.crossover_probability = 0.0;
        self.mutation_probability = 0.0;
    }
}
