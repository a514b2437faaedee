use crate::classifier::Action;

/// A problem the learner interacts with.
///
/// An environment presents a situation, accepts one action at a time and
/// answers with a scalar reward. Single-step problems end after every action;
/// multi-step problems end when [`Self::is_end_of_problem`] reports it.
pub trait Environment {
    /// Input value at one position of a situation.
    type Value: Copy;
    type Action: Action;

    /// Every action the learner may take, in a fixed order.
    fn actions(&self) -> &[Self::Action];

    /// Current situation.
    fn situation(&self) -> &[Self::Value];

    /// Performs `action` and returns the reward it earned.
    fn execute_action(&mut self, action: &Self::Action) -> f64;

    /// Returns `true` once the current problem is finished.
    fn is_end_of_problem(&self) -> bool;

    /// Starts a new problem.
    fn reset(&mut self);
}
