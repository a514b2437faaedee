//! Benchmark problems for the `xcs-engine` learner.
//!
//! - [`Multiplexer`] and [`RealMultiplexer`] - single-step boolean functions
//! - [`Checkerboard`] - single-step real-valued classification
//! - [`Corridor`] - multi-step navigation with a delayed reward
//!
//! Every environment owns a generator seeded from a [`Seed`](xcs_engine::Seed),
//! so a run is reproducible end to end.

pub use self::{
    checkerboard::Checkerboard,
    corridor::{Corridor, Move},
    multiplexer::{Multiplexer, RealMultiplexer},
};

mod checkerboard;
mod corridor;
mod multiplexer;
