//! Identifiers and scalar scheduling quantities

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lowest (most favoured) niceness value
pub const NICE_MIN: i8 = -20;

/// Highest (least favoured) niceness value
pub const NICE_MAX: i8 = 19;

/// Stable identity of a task
///
/// Pids are handed out by the process table and never reused while the
/// task record is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(u32);

impl Pid {
    /// Creates a pid from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for Pid {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Error returned for an out-of-range niceness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("niceness {0} outside {}..={}", NICE_MIN, NICE_MAX)]
pub struct NiceError(pub i32);

/// Scheduling bias of a task
///
/// Higher niceness yields a later virtual deadline and therefore a smaller
/// share of the CPU.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i32", into = "i32")]
pub struct Nice(i8);

impl Nice {
    /// Niceness assigned to tasks created without an explicit bias
    pub const DEFAULT: Nice = Nice(0);

    /// Creates a niceness value, rejecting anything outside
    /// `NICE_MIN..=NICE_MAX`
    pub fn new(value: i32) -> Result<Self, NiceError> {
        if (NICE_MIN as i32..=NICE_MAX as i32).contains(&value) {
            Ok(Self(value as i8))
        } else {
            Err(NiceError(value))
        }
    }

    /// Returns the raw value
    pub const fn get(self) -> i32 {
        self.0 as i32
    }
}

impl TryFrom<i32> for Nice {
    type Error = NiceError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Nice> for i32 {
    fn from(nice: Nice) -> Self {
        nice.get()
    }
}

impl fmt::Display for Nice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Virtual deadline in scheduler ticks
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VirtualDeadline(u64);

impl VirtualDeadline {
    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(self) -> u64 {
        self.0
    }
}

impl From<u64> for VirtualDeadline {
    fn from(ticks: u64) -> Self {
        Self(ticks)
    }
}

impl fmt::Display for VirtualDeadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
