//! # Timer Device
//!
//! Abstraction for the global scheduler tick counter.
//!
//! ## Philosophy
//!
//! **Time is a service, not a global variable.**
//!
//! The deadline clock reads ticks through this trait. Advancing the counter
//! is the business of whoever owns the device (the tick interrupt, or a
//! test), never of the scheduler core.
//!
//! ## Design Principles
//!
//! 1. **Monotonic**: Ticks never go backwards
//! 2. **Non-blocking**: Always returns immediately
//! 3. **Cumulative**: Returns total ticks since boot

/// Monotonic tick source
///
/// # Examples
///
/// ```
/// use hal::TimerDevice;
///
/// fn ticks_since<T: TimerDevice>(timer: &mut T, start: u64) -> u64 {
///     timer.poll_ticks() - start
/// }
/// ```
pub trait TimerDevice {
    /// Returns the current tick count
    ///
    /// Never smaller than a previously returned value.
    fn poll_ticks(&mut self) -> u64;
}

impl<T: TimerDevice + ?Sized> TimerDevice for &mut T {
    fn poll_ticks(&mut self) -> u64 {
        (**self).poll_ticks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTimer(u64);

    impl TimerDevice for FixedTimer {
        fn poll_ticks(&mut self) -> u64 {
            self.0
        }
    }

    fn read<T: TimerDevice>(mut timer: T) -> u64 {
        timer.poll_ticks()
    }

    #[test]
    fn test_timer_through_mut_reference() {
        let mut timer = FixedTimer(42);
        assert_eq!(read(&mut timer), 42);
        timer.0 = 43;
        assert_eq!(read(&mut timer), 43);
    }
}
