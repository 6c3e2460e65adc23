//! # Hardware Abstraction Layer (HAL)
//!
//! This crate defines the traits through which the scheduler core reaches
//! its external collaborators.
//!
//! ## Philosophy
//!
//! **The scheduler core owns no hardware and no allocator.**
//!
//! Time and node storage are capabilities handed in from outside. The
//! simulated kernel implements them deterministically for tests; a real
//! kernel would back them with the tick interrupt and its page allocator.
//!
//! ## Design Principles
//!
//! 1. **Trait-based**: collaborators are reached only through traits
//! 2. **Non-blocking**: every call returns immediately
//! 3. **Testable**: every trait can be mocked

pub mod memory;
pub mod timer;

pub use memory::{AllocError, NodeAllocator, UnboundedAllocator};
pub use timer::TimerDevice;
