//! # BFS Host Runtime
//!
//! Runs the classic fairness experiment on the simulated kernel: `init`
//! forks a CPU-bound child per niceness, goes to sleep, and the children
//! compete for the CPU under the deadline scheduler for a fixed number of
//! ticks.
//!
//! The report lists how often each child was dispatched and how many ticks
//! it ran. The opt-in snapshot feed shows the process table at every
//! dispatch inside its window.

pub mod runtime;

pub use runtime::{HostRuntime, HostRuntimeConfig, HostRuntimeError, RunReport, TaskReport};
