//! # Deadline Queue
//!
//! The ready queue of an earliest-virtual-deadline-first scheduler.
//!
//! ## Philosophy
//!
//! - **One key, one tower**: entries are keyed by `(deadline, pid)`, so two
//!   tasks sharing a deadline still order deterministically and removal is
//!   never ambiguous.
//! - **Indices, not pointers**: nodes live in an arena addressed by stable
//!   integer handles. Tower completeness is checked mechanically by
//!   [`DeadlineSkipList::verify`].
//! - **Randomness is owned**: the tower-height generator is a seeded
//!   component of each queue instance, so tests are reproducible.
//!
//! ## Key Types
//!
//! - [`DeadlineClock`]: Maps `(niceness, tick)` to a virtual deadline
//! - [`DeadlineSkipList`]: Multi-level ordered ready queue
//! - [`TowerHeights`]: Geometric height draw with promotion probability 1/4
//! - [`XorShift32`]: Default seeded generator behind [`TowerHeights`]

pub mod clock;
pub mod error;
pub mod rng;
pub mod skiplist;

pub use clock::{ClockConfig, DeadlineClock, DEFAULT_QUANTUM_TICKS};
pub use error::{InvariantViolation, QueueError};
pub use rng::{TowerHeights, XorShift32, PROMOTION_DRAW_RANGE};
pub use skiplist::{DeadlineSkipList, EntryKey, SkipListConfig, DEFAULT_LEVELS, MAX_LEVELS};
