//! Accuracy-based learning classifier system (XCS).
//!
//! The learner keeps a population of condition-action rules. For every
//! situation it builds the set of matching rules, predicts the payoff of each
//! action, acts, and reinforces the rules that advocated the chosen action. A
//! niche genetic algorithm discovers new rules, and deletion keeps the
//! population within a fixed size.
//!
//! The engine is generic over the gene representation ([`Symbol`]):
//! [`Ternary`] genes give classic XCS over bit strings, [`Interval`] genes give
//! XCSR over real-valued inputs.
//!
//! # Entry Points
//!
//! - [`Xcs`] - the decision cycle (`explore` / `exploit` / `reward`)
//! - [`XcsConfig`] - learning parameters, loadable from JSON
//! - [`Environment`] and [`Xcs::run_problem`] - driving whole problems
//! - [`run_seeds`] - independent runs on scoped threads
//!
//! The crate logs through [`tracing`] and installs no subscriber.

pub use self::{
    action_set::ActionSet,
    classifier::{Action, Classifier},
    condition::Condition,
    config::{
        ConfigError, CrossoverMethod, RepresentationConfig, SelectionMethod, ValueRange, XcsConfig,
    },
    environment::Environment,
    genetic::{GeneticAlgorithm, Offspring},
    match_set::{CoveringError, MatchSet},
    population::{ClassifierId, Population},
    prediction_array::{ActionPolicy, PredictionArray},
    record::{ClassifierRecord, LoadMode, PersistenceError},
    seed::{ParseSeedError, Seed},
    selection::SelectionError,
    symbol::*,
    trial::{ProblemOutcome, TrialMode, run_seeds},
    xcs::Xcs,
};

pub mod action_set;
pub mod classifier;
pub mod condition;
pub mod config;
pub mod environment;
pub mod genetic;
pub mod match_set;
pub mod population;
pub mod prediction_array;
pub mod record;
pub mod seed;
pub mod selection;
pub mod symbol;
pub mod trial;
pub mod xcs;

/// Error returned by the decision cycle of [`Xcs`].
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum XcsError {
    #[display("invalid configuration: {_0}")]
    #[from]
    Config(ConfigError),
    #[display("no decision is waiting for a reward")]
    NoPendingDecision,
    #[display("the previous decision is still waiting for its reward")]
    DecisionPending,
    #[display("situation has {actual} inputs, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[display("at least one action is required")]
    EmptyActions,
    #[display("actions must be distinct")]
    DuplicateAction,
    #[display("{_0}")]
    #[from]
    Covering(CoveringError),
    #[display("selection failed: {_0}")]
    #[from]
    Selection(SelectionError),
}
