//! # Core Types
//!
//! This crate defines the task-level types shared by the ready queue, the
//! dispatcher and the simulated kernel.
//!
//! ## Philosophy
//!
//! - **Copied, not aliased**: the ready queue stores `(deadline, pid)` by
//!   value, so mutating a task record never invalidates queue structure.
//! - **Bounded by type**: niceness is range-checked once, at construction.
//!
//! ## Key Types
//!
//! - [`Pid`]: Stable integer identity of a task
//! - [`Nice`]: Bounded scheduling bias
//! - [`VirtualDeadline`]: Synthetic ready time, smaller runs sooner
//! - [`RunState`]: Task run state as seen by the scheduler
//! - [`TaskRecord`]: The minimal record the scheduler reads and updates

pub mod ids;
pub mod task;

pub use ids::{Nice, NiceError, Pid, VirtualDeadline, NICE_MAX, NICE_MIN};
pub use task::{ProcName, RunState, TaskRecord, PROC_NAME_LEN};
