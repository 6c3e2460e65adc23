//! Virtual deadline computation

use core_types::{Nice, VirtualDeadline, NICE_MIN};
use hal::TimerDevice;
use serde::{Deserialize, Serialize};

/// Ticks granted to a task per dispatch unless configured otherwise
pub const DEFAULT_QUANTUM_TICKS: u64 = 5;

/// Deadline clock configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Length of one scheduling quantum, in ticks
    pub quantum_ticks: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            quantum_ticks: DEFAULT_QUANTUM_TICKS,
        }
    }
}

/// Maps niceness and the current tick to a virtual deadline
///
/// `deadline = tick + quantum * (nice - NICE_MIN + 1)`
///
/// The most favoured niceness lands one quantum in the future; every step
/// up adds another quantum. Stateless apart from its configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeadlineClock {
    config: ClockConfig,
}

impl DeadlineClock {
    pub fn new(config: ClockConfig) -> Self {
        Self { config }
    }

    /// Returns the configured quantum
    pub fn quantum_ticks(&self) -> u64 {
        self.config.quantum_ticks
    }

    /// Computes the virtual deadline for `nice` at `current_tick`
    ///
    /// Saturates at `u64::MAX` instead of wrapping.
    pub fn compute_deadline(&self, nice: Nice, current_tick: u64) -> VirtualDeadline {
        // Nice is range-checked, so the ratio is always in 1..=40.
        let ratio = (nice.get() - NICE_MIN as i32 + 1) as u64;
        let offset = self.config.quantum_ticks.saturating_mul(ratio);
        VirtualDeadline::new(current_tick.saturating_add(offset))
    }

    /// Computes the deadline using the tick counter of `timer`
    pub fn deadline_now<T: TimerDevice>(&self, nice: Nice, timer: &mut T) -> VirtualDeadline {
        self.compute_deadline(nice, timer.poll_ticks())
    }
}
