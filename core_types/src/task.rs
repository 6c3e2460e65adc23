//! Task record as seen by the scheduler

use crate::ids::{Nice, Pid, VirtualDeadline};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a task display name, in bytes
pub const PROC_NAME_LEN: usize = 16;

/// Run state of a task
///
/// Only transitions that change ready-queue membership matter to the
/// scheduler. The numeric codes match the classic process-state table and
/// are what the schedlog feed prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// Slot is free
    Unused,
    /// Blocked on a wait channel
    Sleeping,
    /// Runnable and queued
    Ready,
    /// Currently dispatched
    Running,
    /// Terminated, waiting to be reaped
    Zombie,
}

impl RunState {
    /// Numeric code used in diagnostic output
    pub const fn code(self) -> u8 {
        match self {
            RunState::Unused => 0,
            RunState::Sleeping => 2,
            RunState::Ready => 3,
            RunState::Running => 4,
            RunState::Zombie => 5,
        }
    }

    /// Inverse of [`RunState::code`]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RunState::Unused),
            2 => Some(RunState::Sleeping),
            3 => Some(RunState::Ready),
            4 => Some(RunState::Running),
            5 => Some(RunState::Zombie),
            _ => None,
        }
    }

    /// Returns true if a task in this state belongs in the ready queue
    pub const fn is_queued(self) -> bool {
        matches!(self, RunState::Ready | RunState::Running)
    }
}

/// Fixed-capacity display name
///
/// Longer names are truncated on a character boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcName(String);

impl ProcName {
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(PROC_NAME_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        Self(name[..end].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scheduler-visible part of a process table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub pid: Pid,
    pub name: ProcName,
    pub nice: Nice,
    pub deadline: VirtualDeadline,
    pub state: RunState,
    /// Tower height chosen at the task's last insertion into the ready queue
    pub tower_height: u8,
    /// Ticks left in the current quantum
    pub ticks_left: u64,
    /// Set by `kill`; the task exits the next time it runs
    pub killed: bool,
}

impl TaskRecord {
    /// Creates a record that has not been admitted to the ready queue yet
    pub fn new(pid: Pid, name: &str, nice: Nice) -> Self {
        Self {
            pid,
            name: ProcName::new(name),
            nice,
            deadline: VirtualDeadline::default(),
            state: RunState::Unused,
            tower_height: 0,
            ticks_left: 0,
            killed: false,
        }
    }

    /// Returns true if the task used up its whole quantum
    pub fn quantum_exhausted(&self) -> bool {
        self.ticks_left == 0
    }
}
