//! # Simulated Kernel
//!
//! A deterministic stand-in for everything around the ready queue: a fixed
//! size process table, a tick counter, and simulated user programs. It
//! drives the [`Dispatcher`](scheduler::Dispatcher) exactly the way a real
//! kernel would, so the queue can be tested under realistic lifecycles.
//!
//! ## Locking
//!
//! The process table, the ready queue, the dispatcher and the snapshot feed
//! share one `spin::Mutex`. Every queue mutation happens under that lock
//! together with the state transition it reflects, so no caller can see a
//! sleeping or dead task still reachable through the queue. The tick
//! counter sits behind its own lock; when both are held the process table
//! is taken first.
//!
//! A dispatched task runs outside the process-table lock, one tick at a
//! time, and the lock is taken again before the dispatcher looks at the
//! state the task came back in.
//!
//! All operations take `&self`, so a kernel can be shared through an `Arc`.

pub mod fault_injection;
pub mod schedlog;
pub mod scheduler;
pub mod test_utils;
pub mod timer;
pub mod workload;

use core_types::{Nice, NiceError, Pid, ProcName, RunState, TaskRecord};
use deadline_queue::{
    ClockConfig, DeadlineClock, DeadlineSkipList, EntryKey, InvariantViolation, QueueError,
    SkipListConfig,
};
use fault_injection::{FaultPlan, FaultyAllocator};
use hal::NodeAllocator;
use log::{debug, error, warn};
use schedlog::{SchedLog, SnapshotLine, SnapshotParseError};
use scheduler::{Disposition, Dispatcher, ScheduleEvent, SchedulerError, DEFAULT_AUDIT_CAPACITY};
use serde::{Deserialize, Serialize};
use spin::Mutex;
use std::collections::BTreeMap;
use thiserror::Error;
use timer::SimTimerDevice;
pub use workload::{CpuBound, FnWorkload, Scripted, TaskAction, WaitChannel, Workload};

/// Default number of process-table slots
pub const NPROC: usize = 64;

/// Kernel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub clock: ClockConfig,
    pub skiplist: SkipListConfig,
    /// Number of process-table slots
    pub nproc: usize,
    /// Check queue structure and membership after every mutation and halt
    /// on the first defect
    pub verify_after_mutation: bool,
    /// Most recent scheduling events the dispatcher keeps; 0 keeps none
    pub audit_capacity: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            skiplist: SkipListConfig::default(),
            nproc: NPROC,
            verify_after_mutation: cfg!(debug_assertions),
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

/// Errors returned by kernel operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("Process table full ({capacity} slots)")]
    ProcessTableFull { capacity: usize },

    #[error("No such process: {0}")]
    NoSuchProcess(Pid),

    #[error("Process {pid} is in state {state:?}")]
    InvalidState { pid: Pid, state: RunState },

    #[error("Ready queue: {0}")]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Nice(#[from] NiceError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl KernelError {
    /// Returns true if the operation may succeed when retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, KernelError::Queue(err) if err.is_retryable())
    }
}

impl From<SchedulerError> for KernelError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Queue(err) => KernelError::Queue(err),
            SchedulerError::InvalidState { pid, state } => KernelError::InvalidState { pid, state },
        }
    }
}

/// Disagreement between the process table and the ready queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("Queue structure: {0}")]
    Structure(#[from] InvariantViolation),

    #[error("Task {pid} is {state:?} but not queued at its deadline")]
    NotQueued { pid: Pid, state: RunState },

    #[error("Queue entry {key} has no runnable task")]
    StrayEntry { key: EntryKey },

    #[error("Dispatched task {pid} is in state {state:?}")]
    BadRunning { pid: Pid, state: RunState },
}

/// Why a dispatched task stopped running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnReason {
    QuantumExpired,
    Yielded,
    Slept,
    Exited,
    Killed,
}

/// Result of one scheduling round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The queue was empty; one tick passed
    Idle { tick: u64 },
    Ran {
        pid: Pid,
        started_at: u64,
        ticks: u64,
        reason: ReturnReason,
        disposition: Disposition,
    },
}

/// Totals of a multi-round run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Rounds each task was dispatched in
    pub dispatches: BTreeMap<Pid, u64>,
    /// Ticks each task ran for
    pub cpu_ticks: BTreeMap<Pid, u64>,
    pub idle_ticks: u64,
    /// Rounds whose requeue hit a retryable allocation failure
    pub retried: u64,
}

impl RunSummary {
    pub fn dispatches_of(&self, pid: Pid) -> u64 {
        self.dispatches.get(&pid).copied().unwrap_or(0)
    }

    pub fn cpu_ticks_of(&self, pid: Pid) -> u64 {
        self.cpu_ticks.get(&pid).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    task: TaskRecord,
    chan: Option<WaitChannel>,
}

fn records(slots: &[Option<Slot>]) -> impl Iterator<Item = Option<&TaskRecord>> + '_ {
    slots.iter().map(|slot| slot.as_ref().map(|s| &s.task))
}

struct ProcessTable {
    slots: Vec<Option<Slot>>,
    queue: DeadlineSkipList,
    dispatcher: Dispatcher,
    schedlog: SchedLog,
    next_pid: u32,
    running: Option<Pid>,
    verify: bool,
}

impl ProcessTable {
    fn index_of(&self, pid: Pid) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(slot) if slot.task.pid == pid))
    }

    fn slot(&self, pid: Pid) -> Result<&Slot, KernelError> {
        self.index_of(pid)
            .and_then(|i| self.slots[i].as_ref())
            .ok_or(KernelError::NoSuchProcess(pid))
    }

    fn slot_mut(&mut self, pid: Pid) -> Result<&mut Slot, KernelError> {
        let index = self.index_of(pid).ok_or(KernelError::NoSuchProcess(pid))?;
        self.slots[index]
            .as_mut()
            .ok_or(KernelError::NoSuchProcess(pid))
    }

    fn records(&self) -> impl Iterator<Item = Option<&TaskRecord>> + '_ {
        records(&self.slots)
    }

    /// Allocates a slot and admits a new task; the table is untouched on
    /// failure
    fn create(&mut self, name: &str, nice: Nice, now: u64) -> Result<Pid, KernelError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(KernelError::ProcessTableFull {
                capacity: self.slots.len(),
            })?;

        let pid = Pid::new(self.next_pid);
        let mut task = TaskRecord::new(pid, name, nice);
        self.dispatcher.admit(&mut task, &mut self.queue, now)?;

        debug!("create|[{}]{} nice {} deadline {}", pid, task.name, nice, task.deadline);
        self.next_pid += 1;
        self.slots[index] = Some(Slot { task, chan: None });
        Ok(pid)
    }

    /// Applies one tick of a dispatched task; returns why it stopped, if it did
    fn apply_step(
        &mut self,
        pid: Pid,
        action: TaskAction,
    ) -> Result<Option<ReturnReason>, KernelError> {
        let Slot { task, chan } = self.slot_mut(pid)?;

        match task.state {
            RunState::Running => {}
            // exit() or sleep() reached the task while it was running
            RunState::Zombie => return Ok(Some(ReturnReason::Exited)),
            RunState::Sleeping => return Ok(Some(ReturnReason::Slept)),
            state => return Err(KernelError::InvalidState { pid, state }),
        }

        task.ticks_left = task.ticks_left.saturating_sub(1);
        if task.killed {
            task.state = RunState::Zombie;
            return Ok(Some(ReturnReason::Killed));
        }

        let reason = match action {
            TaskAction::Continue if task.ticks_left == 0 => {
                task.state = RunState::Ready;
                ReturnReason::QuantumExpired
            }
            TaskAction::Continue => return Ok(None),
            TaskAction::Yield => {
                task.state = RunState::Ready;
                ReturnReason::Yielded
            }
            TaskAction::Sleep(channel) => {
                task.state = RunState::Sleeping;
                *chan = Some(channel);
                ReturnReason::Slept
            }
            TaskAction::Exit => {
                task.state = RunState::Zombie;
                ReturnReason::Exited
            }
        };
        Ok(Some(reason))
    }

    fn check(&self) -> Result<(), ConsistencyError> {
        self.queue.verify()?;

        let mut queued = 0;
        for task in self.records().flatten() {
            if task.state.is_queued() {
                if !self.queue.contains(task.pid, task.deadline) {
                    return Err(ConsistencyError::NotQueued {
                        pid: task.pid,
                        state: task.state,
                    });
                }
                queued += 1;
            }
        }

        if queued != self.queue.len() {
            for key in self.queue.iter() {
                // A running task put to sleep or exited keeps its entry
                // until it returns to the dispatcher.
                let owned = self.records().flatten().any(|task| {
                    task.pid == key.pid
                        && task.deadline == key.deadline
                        && (task.state.is_queued() || self.running == Some(task.pid))
                });
                if !owned {
                    return Err(ConsistencyError::StrayEntry { key });
                }
            }
        }

        if let Some(pid) = self.running {
            if let Some(task) = self.records().flatten().find(|task| task.pid == pid) {
                if !matches!(
                    task.state,
                    RunState::Running | RunState::Sleeping | RunState::Zombie
                ) {
                    return Err(ConsistencyError::BadRunning {
                        pid,
                        state: task.state,
                    });
                }
            }
        }
        Ok(())
    }

    fn after_mutation(&self) {
        if !self.verify {
            return;
        }
        if let Err(err) = self.check() {
            error!(
                "process table and ready queue disagree: {}\n{}",
                err,
                self.queue.render()
            );
            panic!("process table and ready queue disagree: {}", err);
        }
    }
}

/// Simulated kernel
pub struct SimulatedKernel {
    ptable: Mutex<ProcessTable>,
    timer: Mutex<SimTimerDevice>,
    config: KernelConfig,
}

impl SimulatedKernel {
    /// Creates a kernel with an empty process table at tick 0
    pub fn new(config: KernelConfig) -> Result<Self, KernelError> {
        if config.nproc == 0 {
            return Err(KernelError::InvalidConfig("nproc must be at least 1"));
        }
        if config.clock.quantum_ticks == 0 {
            return Err(KernelError::InvalidConfig("quantum_ticks must be at least 1"));
        }
        let queue = DeadlineSkipList::with_config(config.skiplist)?;

        Ok(Self {
            ptable: Mutex::new(ProcessTable {
                slots: vec![None; config.nproc],
                queue,
                dispatcher: Dispatcher::new(DeadlineClock::new(config.clock))
                    .with_audit_capacity(config.audit_capacity),
                schedlog: SchedLog::new(),
                next_pid: 1,
                running: None,
                verify: config.verify_after_mutation,
            }),
            timer: Mutex::new(SimTimerDevice::new()),
            config,
        })
    }

    /// Replaces the ready-queue node allocator
    ///
    /// Fails once any task has been queued.
    pub fn with_allocator(
        mut self,
        allocator: Box<dyn NodeAllocator + Send>,
    ) -> Result<Self, KernelError> {
        self.ptable.get_mut().queue.set_allocator(allocator)?;
        Ok(self)
    }

    /// Routes node allocation through a fault-injecting allocator
    pub fn with_fault_plan(self, plan: &FaultPlan) -> Result<Self, KernelError> {
        self.with_allocator(Box::new(FaultyAllocator::new(plan)))
    }

    /// Starts the clock at `ticks` instead of 0
    pub fn with_initial_ticks(mut self, ticks: u64) -> Self {
        *self.timer.get_mut() = SimTimerDevice::with_initial_ticks(ticks);
        self
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Current tick
    pub fn now(&self) -> u64 {
        self.timer.lock().current_ticks()
    }

    /// Moves time forward without running anything
    pub fn advance(&self, ticks: u64) -> u64 {
        self.timer.lock().advance_ticks(ticks)
    }

    /// Creates the first process, at default niceness
    pub fn userinit(&self, name: &str) -> Result<Pid, KernelError> {
        self.spawn(name, Nice::DEFAULT)
    }

    /// Creates a parentless task and admits it to the ready queue
    pub fn spawn(&self, name: &str, nice: Nice) -> Result<Pid, KernelError> {
        let mut pt = self.ptable.lock();
        let now = self.now();
        let result = pt.create(name, nice, now);
        pt.after_mutation();
        result
    }

    /// Forks `parent` into a child with its own niceness
    ///
    /// The child inherits the parent's name and is admitted at a freshly
    /// computed deadline.
    pub fn nicefork(&self, parent: Pid, nice: Nice) -> Result<Pid, KernelError> {
        let mut pt = self.ptable.lock();
        let now = self.now();

        let parent_task = &pt.slot(parent)?.task;
        if parent_task.state == RunState::Zombie {
            return Err(KernelError::InvalidState {
                pid: parent,
                state: parent_task.state,
            });
        }
        let name = parent_task.name.clone();

        let result = pt.create(name.as_str(), nice, now);
        pt.after_mutation();
        result
    }

    /// Forks `parent` at default niceness
    pub fn fork(&self, parent: Pid) -> Result<Pid, KernelError> {
        self.nicefork(parent, Nice::DEFAULT)
    }

    /// Replaces the program a task runs; only its name is visible here
    pub fn exec(&self, pid: Pid, name: &str) -> Result<(), KernelError> {
        let mut pt = self.ptable.lock();
        let slot = pt.slot_mut(pid)?;
        if slot.task.state == RunState::Zombie {
            return Err(KernelError::InvalidState {
                pid,
                state: slot.task.state,
            });
        }
        slot.task.name = ProcName::new(name);
        Ok(())
    }

    /// Puts a task to sleep on `chan`
    ///
    /// A ready task leaves the queue immediately. A running task is marked
    /// and leaves the queue when it returns to the dispatcher.
    pub fn sleep(&self, pid: Pid, chan: WaitChannel) -> Result<(), KernelError> {
        let mut guard = self.ptable.lock();
        let now = self.now();
        let pt = &mut *guard;
        let index = pt.index_of(pid).ok_or(KernelError::NoSuchProcess(pid))?;
        let slot = pt.slots[index]
            .as_mut()
            .ok_or(KernelError::NoSuchProcess(pid))?;

        match slot.task.state {
            RunState::Running => slot.task.state = RunState::Sleeping,
            RunState::Ready => {
                slot.task.state = RunState::Sleeping;
                if let Err(err) = pt.dispatcher.evict(&slot.task, &mut pt.queue, now) {
                    slot.task.state = RunState::Ready;
                    pt.after_mutation();
                    return Err(err.into());
                }
            }
            state => return Err(KernelError::InvalidState { pid, state }),
        }
        slot.chan = Some(chan);
        debug!("sleep|[{}] on {}", pid, chan);

        pt.after_mutation();
        Ok(())
    }

    /// Wakes every task sleeping on `chan`; returns how many woke
    ///
    /// Each woken task is admitted at a fresh deadline. If an admission
    /// fails, the tasks woken before it stay awake and the rest keep
    /// sleeping.
    pub fn wakeup(&self, chan: WaitChannel) -> Result<usize, KernelError> {
        let mut guard = self.ptable.lock();
        let now = self.now();
        let pt = &mut *guard;

        let running = pt.running;
        let mut woken = 0;
        let mut result = Ok(());
        for slot in pt.slots.iter_mut().flatten() {
            if slot.task.state != RunState::Sleeping || slot.chan != Some(chan) {
                continue;
            }
            if running == Some(slot.task.pid) {
                // Never left the CPU, so it still holds its queue entry.
                slot.task.state = RunState::Running;
                slot.chan = None;
                woken += 1;
                continue;
            }
            if let Err(err) = pt.dispatcher.admit(&mut slot.task, &mut pt.queue, now) {
                warn!("wakeup of {} on {} failed: {}", slot.task.pid, chan, err);
                result = Err(err.into());
                break;
            }
            slot.chan = None;
            woken += 1;
            debug!("wakeup|[{}] deadline {}", slot.task.pid, slot.task.deadline);
        }

        pt.after_mutation();
        result.map(|()| woken)
    }

    /// Marks a task killed; it exits the next time it runs
    ///
    /// A sleeping victim is woken so that it gets to run.
    pub fn kill(&self, pid: Pid) -> Result<(), KernelError> {
        let mut guard = self.ptable.lock();
        let now = self.now();
        let pt = &mut *guard;
        let index = pt.index_of(pid).ok_or(KernelError::NoSuchProcess(pid))?;
        let slot = pt.slots[index]
            .as_mut()
            .ok_or(KernelError::NoSuchProcess(pid))?;

        if slot.task.state == RunState::Zombie {
            return Err(KernelError::InvalidState {
                pid,
                state: slot.task.state,
            });
        }
        slot.task.killed = true;

        let mut result = Ok(());
        if slot.task.state == RunState::Sleeping && pt.running == Some(pid) {
            slot.task.state = RunState::Running;
            slot.chan = None;
        } else if slot.task.state == RunState::Sleeping {
            match pt.dispatcher.admit(&mut slot.task, &mut pt.queue, now) {
                Ok(_) => slot.chan = None,
                Err(err) => result = Err(err.into()),
            }
        }
        debug!("kill|[{}]", pid);

        pt.after_mutation();
        result
    }

    /// Terminates a task; it stays a zombie until reaped
    pub fn exit(&self, pid: Pid) -> Result<(), KernelError> {
        let mut guard = self.ptable.lock();
        let now = self.now();
        let pt = &mut *guard;
        let index = pt.index_of(pid).ok_or(KernelError::NoSuchProcess(pid))?;
        let slot = pt.slots[index]
            .as_mut()
            .ok_or(KernelError::NoSuchProcess(pid))?;

        match slot.task.state {
            // Evicted when it returns to the dispatcher
            RunState::Running => slot.task.state = RunState::Zombie,
            RunState::Ready => {
                slot.task.state = RunState::Zombie;
                if let Err(err) = pt.dispatcher.evict(&slot.task, &mut pt.queue, now) {
                    slot.task.state = RunState::Ready;
                    pt.after_mutation();
                    return Err(err.into());
                }
            }
            RunState::Sleeping => {
                slot.task.state = RunState::Zombie;
                slot.chan = None;
            }
            state => return Err(KernelError::InvalidState { pid, state }),
        }
        debug!("exit|[{}]", pid);

        pt.after_mutation();
        Ok(())
    }

    /// Frees the slot of a zombie and returns its final record
    pub fn reap(&self, pid: Pid) -> Result<TaskRecord, KernelError> {
        let mut pt = self.ptable.lock();
        let index = pt.index_of(pid).ok_or(KernelError::NoSuchProcess(pid))?;
        let state = pt.slot(pid)?.task.state;
        if state != RunState::Zombie || pt.running == Some(pid) {
            return Err(KernelError::InvalidState { pid, state });
        }

        let slot = pt.slots[index]
            .take()
            .ok_or(KernelError::NoSuchProcess(pid))?;
        pt.after_mutation();
        Ok(slot.task)
    }

    /// Opens the snapshot feed for the next `ticks` ticks
    pub fn schedlog(&self, ticks: u64) {
        let mut pt = self.ptable.lock();
        let now = self.now();
        pt.schedlog.activate(now, ticks);
    }

    /// Runs one scheduling round
    ///
    /// Selects the task with the earliest deadline, runs it tick by tick
    /// until it stops, then lets the dispatcher settle it. With an empty
    /// queue one idle tick passes instead.
    pub fn schedule_once(
        &self,
        workload: &mut dyn Workload,
    ) -> Result<DispatchOutcome, KernelError> {
        let (pid, started_at) = {
            let mut guard = self.ptable.lock();
            let now = self.now();
            let pt = &mut *guard;

            let pid = match pt.dispatcher.select_next(&pt.queue, now) {
                Some(pid) => pid,
                None => {
                    drop(guard);
                    self.advance(1);
                    return Ok(DispatchOutcome::Idle { tick: now });
                }
            };

            let index = pt.index_of(pid).ok_or(KernelError::NoSuchProcess(pid))?;
            let slot = pt.slots[index]
                .as_mut()
                .ok_or(KernelError::NoSuchProcess(pid))?;
            pt.dispatcher.dispatch(&mut slot.task)?;
            pt.running = Some(pid);
            pt.schedlog.record(now, records(&pt.slots));
            (pid, now)
        };

        let mut ticks = 0;
        let (mut guard, reason) = loop {
            let action = workload.step(pid, self.now());
            self.advance(1);
            ticks += 1;

            let mut guard = self.ptable.lock();
            match guard.apply_step(pid, action) {
                Ok(Some(reason)) => break (guard, reason),
                Ok(None) => {}
                Err(err) => {
                    guard.running = None;
                    return Err(err);
                }
            }
        };

        let now = self.now();
        let pt = &mut *guard;
        pt.running = None;
        let index = pt.index_of(pid).ok_or(KernelError::NoSuchProcess(pid))?;
        let slot = pt.slots[index]
            .as_mut()
            .ok_or(KernelError::NoSuchProcess(pid))?;
        let result = pt.dispatcher.on_return(&mut slot.task, &mut pt.queue, now);
        if slot.task.state != RunState::Sleeping {
            slot.chan = None;
        }
        pt.after_mutation();

        let disposition = result?;
        debug!("return|[{}] {:?} after {} tick(s): {:?}", pid, reason, ticks, disposition);
        Ok(DispatchOutcome::Ran {
            pid,
            started_at,
            ticks,
            reason,
            disposition,
        })
    }

    /// Runs scheduling rounds until the clock reaches `tick`
    ///
    /// The last round may overshoot by up to one quantum. Retryable
    /// allocation failures are counted and the run goes on; anything else
    /// stops it.
    pub fn run_until(
        &self,
        tick: u64,
        workload: &mut dyn Workload,
    ) -> Result<RunSummary, KernelError> {
        let mut summary = RunSummary::default();
        while self.now() < tick {
            match self.schedule_once(workload) {
                Ok(DispatchOutcome::Idle { .. }) => summary.idle_ticks += 1,
                Ok(DispatchOutcome::Ran { pid, ticks, .. }) => {
                    *summary.dispatches.entry(pid).or_default() += 1;
                    *summary.cpu_ticks.entry(pid).or_default() += ticks;
                }
                Err(err) if err.is_retryable() => {
                    warn!("scheduling round at tick {} will be retried: {}", self.now(), err);
                    summary.retried += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(summary)
    }

    /// Runs scheduling rounds for `ticks` ticks from now
    pub fn run_for(
        &self,
        ticks: u64,
        workload: &mut dyn Workload,
    ) -> Result<RunSummary, KernelError> {
        let until = self.now().saturating_add(ticks);
        self.run_until(until, workload)
    }

    /// Copy of a task's record
    pub fn task(&self, pid: Pid) -> Option<TaskRecord> {
        let pt = self.ptable.lock();
        pt.slot(pid).ok().map(|slot| slot.task.clone())
    }

    /// Copies of all live task records, in slot order
    pub fn tasks(&self) -> Vec<TaskRecord> {
        let pt = self.ptable.lock();
        pt.records().flatten().cloned().collect()
    }

    /// Channel a task sleeps on
    pub fn wait_channel(&self, pid: Pid) -> Option<WaitChannel> {
        let pt = self.ptable.lock();
        pt.slot(pid).ok().and_then(|slot| slot.chan)
    }

    /// Task currently dispatched, if any
    pub fn running(&self) -> Option<Pid> {
        self.ptable.lock().running
    }

    pub fn peek_min(&self) -> Option<Pid> {
        self.ptable.lock().queue.peek_min()
    }

    pub fn queue_len(&self) -> usize {
        self.ptable.lock().queue.len()
    }

    /// Per-level queue contents, top level first
    pub fn queue_dump(&self) -> Vec<Vec<EntryKey>> {
        self.ptable.lock().queue.dump()
    }

    /// Text rendering of the queue
    pub fn render_queue(&self) -> String {
        self.ptable.lock().queue.render()
    }

    /// Retained scheduling events, oldest first
    pub fn audit_log(&self) -> Vec<ScheduleEvent> {
        self.ptable.lock().dispatcher.audit_log().iter().cloned().collect()
    }

    pub fn take_audit_log(&self) -> Vec<ScheduleEvent> {
        self.ptable.lock().dispatcher.take_audit_log()
    }

    /// Snapshot lines recorded so far
    pub fn schedlog_lines(&self) -> Vec<String> {
        self.ptable.lock().schedlog.lines().to_vec()
    }

    pub fn take_schedlog_lines(&self) -> Vec<String> {
        self.ptable.lock().schedlog.take_lines()
    }

    /// Snapshot lines recorded so far, parsed
    pub fn snapshots(&self) -> Result<Vec<SnapshotLine>, SnapshotParseError> {
        self.schedlog_lines().iter().map(|line| line.parse()).collect()
    }

    /// Cross-checks the process table against the ready queue
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        self.ptable.lock().check()
    }
}
