//! Deadline dispatcher
//!
//! The dispatcher is the per-tick policy sitting between the process table
//! and the ready queue. It never owns task records; the caller hands it the
//! record of the task concerned together with the queue, always under the
//! process-table lock.
//!
//! ## Flow
//!
//! 1. [`Dispatcher::select_next`] asks the queue for its minimum.
//! 2. [`Dispatcher::dispatch`] marks that task Running and grants it a quantum.
//! 3. The task runs outside the lock until it yields, blocks or exits.
//! 4. [`Dispatcher::on_return`] requeues, keeps or evicts it depending on the
//!    state it came back in.
//!
//! Creation and wake go through [`Dispatcher::admit`], which always computes
//! a fresh deadline.
//!
//! Every decision is appended to an audit trail so tests can replay the
//! schedule without scraping logs. The trail keeps only the most recent
//! events; older ones are dropped once it reaches its capacity.

use core_types::{Pid, RunState, TaskRecord, VirtualDeadline};
use deadline_queue::{DeadlineClock, DeadlineSkipList, QueueError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Number of audit events a dispatcher keeps by default
pub const DEFAULT_AUDIT_CAPACITY: usize = 4096;

/// Errors reported by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Ready queue: {0}")]
    Queue(#[from] QueueError),

    /// The task was handed over in a state the operation does not accept
    #[error("Task {pid} is in state {state:?}")]
    InvalidState { pid: Pid, state: RunState },
}

impl SchedulerError {
    /// Returns true if the operation may succeed when retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulerError::Queue(err) if err.is_retryable())
    }
}

/// What `on_return` did with a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// Quantum used up; the task moved to a later deadline
    Requeued {
        old: VirtualDeadline,
        new: VirtualDeadline,
        height: u8,
    },
    /// Quantum left; the task keeps its place
    Kept,
    /// The task left the ready set
    Evicted { height: u8 },
}

/// Scheduling event for the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// Task entered the ready queue on creation or wake
    TaskAdmitted {
        pid: Pid,
        deadline: VirtualDeadline,
        height: u8,
        timestamp_ticks: u64,
    },
    /// Task was picked to run
    TaskSelected { pid: Pid, timestamp_ticks: u64 },
    /// Task came back with its quantum used up
    TaskRequeued {
        pid: Pid,
        old: VirtualDeadline,
        new: VirtualDeadline,
        timestamp_ticks: u64,
    },
    /// Task came back with quantum left
    TaskKept { pid: Pid, timestamp_ticks: u64 },
    /// Task left the ready queue
    TaskEvicted {
        pid: Pid,
        state: RunState,
        timestamp_ticks: u64,
    },
    /// Nothing was runnable
    Idle { timestamp_ticks: u64 },
}

impl ScheduleEvent {
    /// Pid the event concerns, if any
    pub fn pid(&self) -> Option<Pid> {
        match self {
            ScheduleEvent::TaskAdmitted { pid, .. }
            | ScheduleEvent::TaskSelected { pid, .. }
            | ScheduleEvent::TaskRequeued { pid, .. }
            | ScheduleEvent::TaskKept { pid, .. }
            | ScheduleEvent::TaskEvicted { pid, .. } => Some(*pid),
            ScheduleEvent::Idle { .. } => None,
        }
    }

    pub fn timestamp_ticks(&self) -> u64 {
        match self {
            ScheduleEvent::TaskAdmitted {
                timestamp_ticks, ..
            }
            | ScheduleEvent::TaskSelected {
                timestamp_ticks, ..
            }
            | ScheduleEvent::TaskRequeued {
                timestamp_ticks, ..
            }
            | ScheduleEvent::TaskKept {
                timestamp_ticks, ..
            }
            | ScheduleEvent::TaskEvicted {
                timestamp_ticks, ..
            }
            | ScheduleEvent::Idle { timestamp_ticks } => *timestamp_ticks,
        }
    }
}

/// Earliest-virtual-deadline-first dispatcher
#[derive(Debug)]
pub struct Dispatcher {
    clock: DeadlineClock,
    audit_log: VecDeque<ScheduleEvent>,
    audit_capacity: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DeadlineClock::default())
    }
}

impl Dispatcher {
    pub fn new(clock: DeadlineClock) -> Self {
        Self {
            clock,
            audit_log: VecDeque::new(),
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }

    /// Keeps at most `capacity` audit events; 0 turns the trail off
    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity;
        self.trim_audit_log();
        self
    }

    pub fn audit_capacity(&self) -> usize {
        self.audit_capacity
    }

    pub fn clock(&self) -> &DeadlineClock {
        &self.clock
    }

    /// Returns the task with the earliest deadline, or `None` for an idle tick
    pub fn select_next<R>(&mut self, queue: &DeadlineSkipList<R>, now: u64) -> Option<Pid> {
        match queue.peek_min() {
            Some(pid) => {
                debug!("select|[{}] at tick {}", pid, now);
                self.record(ScheduleEvent::TaskSelected {
                    pid,
                    timestamp_ticks: now,
                });
                Some(pid)
            }
            None => {
                self.record(ScheduleEvent::Idle {
                    timestamp_ticks: now,
                });
                None
            }
        }
    }

    /// Marks a selected task Running and grants it a full quantum
    ///
    /// The task stays queued while it runs; `on_return` settles its place.
    pub fn dispatch(&self, task: &mut TaskRecord) -> Result<(), SchedulerError> {
        if task.state != RunState::Ready {
            return Err(SchedulerError::InvalidState {
                pid: task.pid,
                state: task.state,
            });
        }
        task.state = RunState::Running;
        task.ticks_left = self.clock.quantum_ticks();
        Ok(())
    }

    /// Inserts a created or woken task at a freshly computed deadline
    ///
    /// On success the task is Ready and its record carries the new deadline
    /// and tower height. On failure the record is left untouched.
    pub fn admit(
        &mut self,
        task: &mut TaskRecord,
        queue: &mut DeadlineSkipList,
        now: u64,
    ) -> Result<u8, SchedulerError> {
        if task.state.is_queued() || task.state == RunState::Zombie {
            return Err(SchedulerError::InvalidState {
                pid: task.pid,
                state: task.state,
            });
        }

        let deadline = self.clock.compute_deadline(task.nice, now);
        let height = queue.insert(task.pid, deadline)?;

        task.deadline = deadline;
        task.tower_height = height;
        task.state = RunState::Ready;
        self.record(ScheduleEvent::TaskAdmitted {
            pid: task.pid,
            deadline,
            height,
            timestamp_ticks: now,
        });
        Ok(height)
    }

    /// Removes a task's tower from the queue
    ///
    /// The caller sets the state the task leaves in; the record is only
    /// read here.
    pub fn evict(
        &mut self,
        task: &TaskRecord,
        queue: &mut DeadlineSkipList,
        now: u64,
    ) -> Result<u8, SchedulerError> {
        let height = queue.remove(task.pid, task.deadline)?;
        self.record(ScheduleEvent::TaskEvicted {
            pid: task.pid,
            state: task.state,
            timestamp_ticks: now,
        });
        Ok(height)
    }

    /// Settles a task that came back from running
    pub fn on_return(
        &mut self,
        task: &mut TaskRecord,
        queue: &mut DeadlineSkipList,
        now: u64,
    ) -> Result<Disposition, SchedulerError> {
        match task.state {
            RunState::Ready if task.quantum_exhausted() => self.requeue(task, queue, now),
            RunState::Ready => {
                self.record(ScheduleEvent::TaskKept {
                    pid: task.pid,
                    timestamp_ticks: now,
                });
                Ok(Disposition::Kept)
            }
            RunState::Sleeping | RunState::Zombie => {
                let height = self.evict(task, queue, now)?;
                Ok(Disposition::Evicted { height })
            }
            RunState::Running | RunState::Unused => {
                warn!(
                    "task {} returned to the dispatcher in state {:?}",
                    task.pid, task.state
                );
                Err(SchedulerError::InvalidState {
                    pid: task.pid,
                    state: task.state,
                })
            }
        }
    }

    /// Moves an expired task to its new deadline
    ///
    /// The new tower is built before the old one is torn down, so an
    /// allocation failure leaves the task queued at its old deadline.
    fn requeue(
        &mut self,
        task: &mut TaskRecord,
        queue: &mut DeadlineSkipList,
        now: u64,
    ) -> Result<Disposition, SchedulerError> {
        let old = task.deadline;
        if !queue.contains(task.pid, old) {
            warn!("expired task {} is not queued at {}", task.pid, old);
            return Err(QueueError::NotFound {
                pid: task.pid,
                deadline: old,
            }
            .into());
        }

        let new = self.clock.compute_deadline(task.nice, now);
        if new != old {
            let height = queue.insert(task.pid, new)?;
            queue.remove(task.pid, old)?;
            task.deadline = new;
            task.tower_height = height;
        }

        debug!("requeue|[{}] {} -> {}", task.pid, old, new);
        self.record(ScheduleEvent::TaskRequeued {
            pid: task.pid,
            old,
            new,
            timestamp_ticks: now,
        });
        Ok(Disposition::Requeued {
            old,
            new,
            height: task.tower_height,
        })
    }

    fn record(&mut self, event: ScheduleEvent) {
        self.audit_log.push_back(event);
        self.trim_audit_log();
    }

    fn trim_audit_log(&mut self) {
        while self.audit_log.len() > self.audit_capacity {
            self.audit_log.pop_front();
        }
    }

    /// Returns the retained audit trail, oldest event first
    pub fn audit_log(&self) -> &VecDeque<ScheduleEvent> {
        &self.audit_log
    }

    /// Takes the audit trail, leaving it empty
    pub fn take_audit_log(&mut self) -> Vec<ScheduleEvent> {
        std::mem::take(&mut self.audit_log).into()
    }
}
