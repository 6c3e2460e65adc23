//! Per-dispatch process table snapshots
//!
//! Once activated for a window of ticks, every dispatch inside the window
//! produces one line describing each process-table slot up to the highest
//! slot in use:
//!
//! ```text
//! 12|[1]init:2:0(0)(105)(0),[-]---:0:-(-)(-)(-),[3]loop:4:-5(1)(87)(5)
//! ```
//!
//! A used slot reads `[pid]name:state:nice(height)(deadline)(ticks_left)`
//! where `state` is the numeric run-state code. The feed switches itself
//! off at the first dispatch past the window. Lines are kept in memory and
//! logged at info level under the `schedlog` target. They parse back with
//! [`SnapshotLine::from_str`](std::str::FromStr).

use core_types::{Pid, RunState, TaskRecord};
use log::info;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const UNUSED_SLOT: &str = "[-]---:0:-(-)(-)(-)";

/// One slot of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSnapshot {
    Unused,
    Task {
        pid: Pid,
        name: String,
        state: RunState,
        nice: i32,
        height: u8,
        deadline: u64,
        ticks_left: u64,
    },
}

impl SlotSnapshot {
    pub fn capture(record: Option<&TaskRecord>) -> Self {
        match record {
            Some(task) if task.state != RunState::Unused => SlotSnapshot::Task {
                pid: task.pid,
                name: sanitize(task.name.as_str()),
                state: task.state,
                nice: task.nice.get(),
                height: task.tower_height,
                deadline: task.deadline.ticks(),
                ticks_left: task.ticks_left,
            },
            _ => SlotSnapshot::Unused,
        }
    }

    pub fn pid(&self) -> Option<Pid> {
        match self {
            SlotSnapshot::Task { pid, .. } => Some(*pid),
            SlotSnapshot::Unused => None,
        }
    }

    pub fn state(&self) -> RunState {
        match self {
            SlotSnapshot::Task { state, .. } => *state,
            SlotSnapshot::Unused => RunState::Unused,
        }
    }
}

/// Separator characters cannot appear in names
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ',' | ':' | '|' | '[' | ']' | '(' | ')' => '_',
            c => c,
        })
        .collect()
}

impl fmt::Display for SlotSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotSnapshot::Unused => f.write_str(UNUSED_SLOT),
            SlotSnapshot::Task {
                pid,
                name,
                state,
                nice,
                height,
                deadline,
                ticks_left,
            } => write!(
                f,
                "[{}]{}:{}:{}({})({})({})",
                pid,
                name,
                state.code(),
                nice,
                height,
                deadline,
                ticks_left
            ),
        }
    }
}

/// One line of the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLine {
    pub tick: u64,
    pub slots: Vec<SlotSnapshot>,
}

impl SnapshotLine {
    /// Captures a process table, trailing unused slots left out
    pub fn capture<'a>(tick: u64, table: impl IntoIterator<Item = Option<&'a TaskRecord>>) -> Self {
        let mut slots: Vec<SlotSnapshot> = table.into_iter().map(SlotSnapshot::capture).collect();
        while slots.last() == Some(&SlotSnapshot::Unused) {
            slots.pop();
        }
        Self { tick, slots }
    }

    /// Slot describing `pid`, if it is in the snapshot
    pub fn task(&self, pid: Pid) -> Option<&SlotSnapshot> {
        self.slots.iter().find(|slot| slot.pid() == Some(pid))
    }
}

impl fmt::Display for SnapshotLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|", self.tick)?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", slot)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotParseError {
    #[error("Missing '|' after the tick")]
    MissingTick,

    #[error("Bad tick {0:?}")]
    BadTick(String),

    #[error("Slot {index} is malformed: {text:?}")]
    MalformedSlot { index: usize, text: String },
}

impl FromStr for SnapshotLine {
    type Err = SnapshotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tick, rest) = s.trim_end().split_once('|').ok_or(SnapshotParseError::MissingTick)?;
        let tick = tick
            .parse()
            .map_err(|_| SnapshotParseError::BadTick(tick.to_string()))?;

        let mut slots = Vec::new();
        if !rest.is_empty() {
            for (index, text) in rest.split(',').enumerate() {
                let slot = parse_slot(text).ok_or_else(|| SnapshotParseError::MalformedSlot {
                    index,
                    text: text.to_string(),
                })?;
                slots.push(slot);
            }
        }
        Ok(Self { tick, slots })
    }
}

fn parse_slot(text: &str) -> Option<SlotSnapshot> {
    if text == UNUSED_SLOT {
        return Some(SlotSnapshot::Unused);
    }

    let (pid, rest) = text.strip_prefix('[')?.split_once(']')?;
    let mut fields = rest.splitn(3, ':');
    let name = fields.next()?;
    let state = RunState::from_code(fields.next()?.parse().ok()?)?;
    let (nice, numbers) = fields.next()?.split_once('(')?;

    let mut numbers = numbers.strip_suffix(')')?.split(")(");
    let height = numbers.next()?.parse().ok()?;
    let deadline = numbers.next()?.parse().ok()?;
    let ticks_left = numbers.next()?.parse().ok()?;
    if numbers.next().is_some() {
        return None;
    }

    Some(SlotSnapshot::Task {
        pid: Pid::new(pid.parse().ok()?),
        name: name.to_string(),
        state,
        nice: nice.parse().ok()?,
        height,
        deadline,
        ticks_left,
    })
}

/// Time-bounded snapshot feed
#[derive(Debug, Default)]
pub struct SchedLog {
    active_until: Option<u64>,
    lines: Vec<String>,
}

impl SchedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every dispatch from `now` through `now + ticks`
    pub fn activate(&mut self, now: u64, ticks: u64) {
        self.active_until = Some(now.saturating_add(ticks));
    }

    pub fn is_active(&self) -> bool {
        self.active_until.is_some()
    }

    /// Records a snapshot at `tick` if the window is open
    ///
    /// Returns true if a line was produced.
    pub fn record<'a>(
        &mut self,
        tick: u64,
        table: impl IntoIterator<Item = Option<&'a TaskRecord>>,
    ) -> bool {
        match self.active_until {
            Some(last) if tick <= last => {
                let line = SnapshotLine::capture(tick, table).to_string();
                info!(target: "schedlog", "{}", line);
                self.lines.push(line);
                true
            }
            Some(_) => {
                self.active_until = None;
                false
            }
            None => false,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}
