//! Simulated user programs
//!
//! A workload decides what a dispatched task does with each tick it is
//! given. The kernel calls [`Workload::step`] once per tick, outside the
//! process-table lock, and applies the returned action.

use core_types::Pid;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Opaque rendezvous key for `sleep` and `wakeup`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WaitChannel(pub u64);

impl fmt::Display for WaitChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chan#{}", self.0)
    }
}

/// What a task does with the tick it was just given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskAction {
    /// Keep computing; the quantum runs down
    Continue,
    /// Give the CPU back, keeping any quantum left
    Yield,
    /// Block on a channel until woken
    Sleep(WaitChannel),
    /// Terminate
    Exit,
}

/// Behaviour of the tasks in a simulation
pub trait Workload {
    /// Runs `pid` for one tick at `tick` and reports what it did
    fn step(&mut self, pid: Pid, tick: u64) -> TaskAction;
}

impl<W: Workload + ?Sized> Workload for &mut W {
    fn step(&mut self, pid: Pid, tick: u64) -> TaskAction {
        (**self).step(pid, tick)
    }
}

/// Tasks that never block, like a busy loop
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBound;

impl Workload for CpuBound {
    fn step(&mut self, _pid: Pid, _tick: u64) -> TaskAction {
        TaskAction::Continue
    }
}

/// Per-task action lists
///
/// Each dispatched tick pops the next action of that task's script. Tasks
/// without a script, or whose script ran out, perform the fallback action.
#[derive(Debug, Clone)]
pub struct Scripted {
    scripts: BTreeMap<Pid, VecDeque<TaskAction>>,
    fallback: TaskAction,
}

impl Scripted {
    pub fn new() -> Self {
        Self {
            scripts: BTreeMap::new(),
            fallback: TaskAction::Continue,
        }
    }

    pub fn with_script(mut self, pid: Pid, actions: impl IntoIterator<Item = TaskAction>) -> Self {
        self.scripts.entry(pid).or_default().extend(actions);
        self
    }

    pub fn with_fallback(mut self, fallback: TaskAction) -> Self {
        self.fallback = fallback;
        self
    }

    /// Actions not yet consumed by `pid`
    pub fn remaining(&self, pid: Pid) -> usize {
        self.scripts.get(&pid).map_or(0, VecDeque::len)
    }
}

impl Default for Scripted {
    fn default() -> Self {
        Self::new()
    }
}

impl Workload for Scripted {
    fn step(&mut self, pid: Pid, _tick: u64) -> TaskAction {
        self.scripts
            .get_mut(&pid)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.fallback)
    }
}

/// Adapts a closure into a workload
pub struct FnWorkload<F>(pub F);

impl<F> Workload for FnWorkload<F>
where
    F: FnMut(Pid, u64) -> TaskAction,
{
    fn step(&mut self, pid: Pid, tick: u64) -> TaskAction {
        (self.0)(pid, tick)
    }
}
