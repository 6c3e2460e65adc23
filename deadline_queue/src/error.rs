//! Ready queue errors

use crate::skiplist::{EntryKey, MAX_LEVELS};
use core_types::{Pid, VirtualDeadline};
use hal::AllocError;
use thiserror::Error;

/// Recoverable ready-queue errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// `remove` target is not queued; the queue was not touched
    #[error("No entry for pid {pid} at deadline {deadline}")]
    NotFound { pid: Pid, deadline: VirtualDeadline },

    /// The exact `(deadline, pid)` key is already queued
    #[error("Pid {pid} already queued at deadline {deadline}")]
    Duplicate { pid: Pid, deadline: VirtualDeadline },

    /// Node allocation failed before any link was made; retryable
    #[error("Node allocation failed: {0}")]
    AllocationFailed(#[from] AllocError),

    #[error("Level count {levels} outside 1..={}", MAX_LEVELS)]
    InvalidLevels { levels: usize },

    /// Allocators can only be swapped while the queue is empty
    #[error("Allocator still backs {live} live nodes")]
    AllocatorInUse { live: usize },
}

impl QueueError {
    /// Returns true if retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::AllocationFailed(_))
    }
}

/// Structural defect found by `DeadlineSkipList::verify`
///
/// These never arise from bad input. A queue that reports one cannot be
/// trusted to schedule anything and callers should halt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("Level {level}: {next} follows {prev} out of order")]
    Unsorted {
        level: usize,
        prev: EntryKey,
        next: EntryKey,
    },

    #[error("Level {level}: back link of {key} does not point at its predecessor")]
    BrokenBackLink { level: usize, key: EntryKey },

    #[error("Level {level}: node {key} is tagged for level {tagged}")]
    WrongLevel {
        level: usize,
        tagged: usize,
        key: EntryKey,
    },

    #[error("Level {level}: tower of {key} has no member on the level below")]
    TowerGap { level: usize, key: EntryKey },

    #[error("Level {level}: link points at a freed slot or a header")]
    DanglingLink { level: usize },

    #[error("Level {level}: header is damaged")]
    DamagedHeader { level: usize },

    #[error("Level 0 holds {found} entries, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("{live} live nodes but only {linked} linked")]
    LeakedNodes { live: usize, linked: usize },
}
