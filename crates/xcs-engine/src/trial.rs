use std::{iter, thread};

use tracing::trace;

use crate::{
    XcsError, classifier::Action, environment::Environment, seed::Seed, symbol::Symbol, xcs::Xcs,
};

/// How one problem is run by [`Xcs::run_problem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum TrialMode {
    /// Exploring decisions with learning and rule discovery.
    Explore,
    /// Greedy decisions leaving the learner untouched.
    Exploit,
    /// Greedy decisions with reinforcement but without rule discovery.
    ExploitWithUpdate,
}

/// Result of one problem.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProblemOutcome {
    /// Number of actions taken.
    pub steps: usize,
    pub total_reward: f64,
    pub last_reward: f64,
    /// `true` if the environment ended the problem before the step limit.
    pub solved: bool,
}

impl<S, A> Xcs<S, A>
where
    S: Symbol,
    A: Action,
{
    /// Resets `env` and runs one problem of at most `max_steps` actions.
    ///
    /// A problem cut off by the step limit is abandoned: its last action set
    /// keeps its pending payoff unused.
    pub fn run_problem<E>(
        &mut self,
        env: &mut E,
        mode: TrialMode,
        max_steps: usize,
    ) -> Result<ProblemOutcome, XcsError>
    where
        E: Environment<Value = S::Value, Action = A>,
    {
        env.reset();
        let mut outcome = ProblemOutcome::default();
        while outcome.steps < max_steps {
            let action = match mode {
                TrialMode::Explore => self.explore(env.situation())?,
                TrialMode::Exploit => self.exploit(env.situation(), false)?,
                TrialMode::ExploitWithUpdate => self.exploit(env.situation(), true)?,
            };
            let reward = env.execute_action(&action);
            let end_of_problem = env.is_end_of_problem();
            outcome.steps += 1;
            outcome.total_reward += reward;
            outcome.last_reward = reward;
            trace!(?action, reward, end_of_problem, "step");
            if !mode.is_exploit() {
                self.reward(reward, end_of_problem)?;
            }
            if end_of_problem {
                outcome.solved = true;
                return Ok(outcome);
            }
        }
        self.abandon_problem();
        Ok(outcome)
    }
}

/// Runs `f` once per seed on scoped threads and returns the results in seed
/// order.
///
/// # Panics
///
/// Propagates a panic from any of the runs.
pub fn run_seeds<T, F>(seeds: &[Seed], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(Seed) -> T + Sync,
{
    let f = &f;
    let mut results: Vec<Option<T>> = iter::repeat_with(|| None).take(seeds.len()).collect();
    thread::scope(|s| {
        for (seed, slot) in iter::zip(seeds, &mut results) {
            s.spawn(move || *slot = Some(f(*seed)));
        }
    });
    results
        .into_iter()
        .map(|result| result.expect("every seed run stores its result"))
        .collect()
}
