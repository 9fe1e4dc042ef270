//! Execution engine for compiled sparse recurrent network plans
//!
//! The engine evaluates a compiled [`Solution`](srnn_model::Solution) one
//! input vector per time step: the activation ring buffer advances, every
//! tile row executes with its tiles fanned out over a fixed fork-join
//! worker group, and the trailing output slice of the current activations
//! is returned. For fixed weights and inputs the result is bit-identical
//! across runs and thread counts.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod engine;
pub mod error;
pub mod partial_solver;
pub mod ringbuffer;
pub mod thread_group;
pub mod weight_updater;

// Re-export essential types
pub use engine::SolutionEngine;
pub use error::{Result, SolveError};
pub use partial_solver::PartialSolver;
pub use ringbuffer::ActivationRingbuffer;
pub use thread_group::ThreadGroup;
pub use weight_updater::WeightUpdater;
