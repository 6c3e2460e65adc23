//! # Simulated tick counter
//!
//! Time only moves when the kernel says so, which keeps every schedule
//! reproducible.

use hal::TimerDevice;

/// Monotonic tick counter advanced explicitly
///
/// # Examples
///
/// ```
/// use sim_kernel::timer::SimTimerDevice;
/// use hal::TimerDevice;
///
/// let mut timer = SimTimerDevice::new();
/// assert_eq!(timer.poll_ticks(), 0);
///
/// assert_eq!(timer.advance_ticks(5), 5);
/// assert_eq!(timer.poll_ticks(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimTimerDevice {
    ticks: u64,
}

impl SimTimerDevice {
    pub fn new() -> Self {
        Self { ticks: 0 }
    }

    /// Creates a timer that starts at `ticks`
    pub fn with_initial_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Advances time by `delta` ticks and returns the new tick
    ///
    /// Saturates at `u64::MAX`.
    pub fn advance_ticks(&mut self, delta: u64) -> u64 {
        self.ticks = self.ticks.saturating_add(delta);
        self.ticks
    }

    /// Current tick, readable through a shared reference
    pub fn current_ticks(&self) -> u64 {
        self.ticks
    }
}

impl TimerDevice for SimTimerDevice {
    fn poll_ticks(&mut self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_where_told() {
        let mut timer = SimTimerDevice::with_initial_ticks(1000);
        assert_eq!(timer.poll_ticks(), 1000);
        assert_eq!(timer.current_ticks(), 1000);
    }

    #[test]
    fn test_only_moves_on_advance() {
        let mut timer = SimTimerDevice::new();
        assert_eq!(timer.poll_ticks(), 0);
        assert_eq!(timer.poll_ticks(), 0);
        timer.advance_ticks(3);
        timer.advance_ticks(4);
        assert_eq!(timer.poll_ticks(), 7);
    }

    #[test]
    fn test_saturates() {
        let mut timer = SimTimerDevice::with_initial_ticks(u64::MAX - 1);
        assert_eq!(timer.advance_ticks(10), u64::MAX);
    }
}
