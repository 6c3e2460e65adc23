//! Deadline-ordered skip list
//!
//! ```text
//! level 2:  H ──────────────────────────────────────────► 1008(7)
//!           │                                               │
//! level 1:  H ──────────► 1000(3) ────────────────────────► 1008(7)
//!           │               │                               │
//! level 0:  H ─► 100(6) ─► 1000(3) ─► 1001(5) ─► 1002(4) ─► 1008(7)
//! ```
//!
//! Every level is a doubly linked list hanging off a permanent header.
//! A tower is the set of nodes inserted together for one entry; its `down`
//! links only ever point at the same tower's node one level below.
//!
//! Invariants, checked by [`DeadlineSkipList::verify`]:
//! 1. Every level is strictly ascending by `(deadline, pid)`
//! 2. A tower reaching level k has a member on every level 0..k
//! 3. Level 0 holds exactly the queued entries
//! 4. Headers are never linked into a tower and never freed

use crate::error::{InvariantViolation, QueueError};
use crate::rng::{TowerHeights, XorShift32};
use core_types::{Pid, VirtualDeadline};
use hal::{NodeAllocator, UnboundedAllocator};
use log::{error, trace, warn};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Level count used when none is configured
pub const DEFAULT_LEVELS: usize = 4;

/// Upper bound on the level count
pub const MAX_LEVELS: usize = 16;

type NodeIndex = u32;

/// Ordering key of a queued entry
///
/// Deadline first, pid as tie-break, so the order is total and every
/// queued task has exactly one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub deadline: VirtualDeadline,
    pub pid: Pid,
}

impl EntryKey {
    pub const fn new(pid: Pid, deadline: VirtualDeadline) -> Self {
        Self { deadline, pid }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.deadline, self.pid)
    }
}

/// Skip list configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipListConfig {
    /// Number of levels, headers included
    pub levels: usize,
    /// Seed of the tower-height generator
    pub seed: u32,
}

impl Default for SkipListConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS,
            seed: XorShift32::DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone)]
struct SkipNode {
    /// `None` marks a header
    key: Option<EntryKey>,
    level: u8,
    next: Option<NodeIndex>,
    /// `None` only for headers
    prev: Option<NodeIndex>,
    down: Option<NodeIndex>,
}

#[cold]
fn corrupted(what: fmt::Arguments<'_>) -> ! {
    error!("ready queue corrupted: {}", what);
    panic!("ready queue corrupted: {}", what);
}

/// Ready queue ordered by virtual deadline
///
/// Nodes live in an arena; slots `0..levels` hold the level headers.
/// Freed slots are recycled through a free list.
pub struct DeadlineSkipList<R = XorShift32> {
    levels: usize,
    nodes: Vec<Option<SkipNode>>,
    free: Vec<NodeIndex>,
    len: usize,
    heights: TowerHeights<R>,
    allocator: Box<dyn NodeAllocator + Send>,
}

impl DeadlineSkipList<XorShift32> {
    /// Creates a queue with [`DEFAULT_LEVELS`] levels and the default seed
    pub fn new() -> Self {
        Self::from_parts(DEFAULT_LEVELS, XorShift32::default())
    }

    /// Creates a queue from configuration
    pub fn with_config(config: SkipListConfig) -> Result<Self, QueueError> {
        Self::with_rng(config.levels, XorShift32::new(config.seed))
    }
}

impl Default for DeadlineSkipList<XorShift32> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> DeadlineSkipList<R> {
    /// Creates a queue whose tower heights are drawn from `rng`
    pub fn with_rng(levels: usize, rng: R) -> Result<Self, QueueError> {
        if levels == 0 || levels > MAX_LEVELS {
            return Err(QueueError::InvalidLevels { levels });
        }
        Ok(Self::from_parts(levels, rng))
    }

    fn from_parts(levels: usize, rng: R) -> Self {
        let nodes = (0..levels)
            .map(|level| {
                Some(SkipNode {
                    key: None,
                    level: level as u8,
                    next: None,
                    prev: None,
                    down: level.checked_sub(1).map(|below| below as NodeIndex),
                })
            })
            .collect();

        Self {
            levels,
            nodes,
            free: Vec::new(),
            len: 0,
            heights: TowerHeights::new(rng, levels),
            allocator: Box::new(UnboundedAllocator),
        }
    }

    /// Inserts `pid` at `deadline`
    ///
    /// Returns the height of the new tower (0 = level 0 only). Every node
    /// of the tower is reserved from the allocator before the first link is
    /// made, so a failed insert leaves the queue untouched.
    pub fn insert(&mut self, pid: Pid, deadline: VirtualDeadline) -> Result<u8, QueueError> {
        let key = EntryKey::new(pid, deadline);
        let preds = self.predecessors(key);
        if self.node(preds[0]).key == Some(key) {
            warn!("insert of {} rejected: already queued", key);
            return Err(QueueError::Duplicate { pid, deadline });
        }

        let height = self.heights.next_height();
        if let Err(err) = self.allocator.reserve(height as usize + 1) {
            warn!("insert of {} failed: {}", key, err);
            return Err(err.into());
        }

        let mut below = None;
        for (level, &pred) in preds.iter().enumerate().take(height as usize + 1) {
            let idx = self.alloc_node(SkipNode {
                key: Some(key),
                level: level as u8,
                next: None,
                prev: None,
                down: below,
            });
            self.link_after(pred, idx);
            below = Some(idx);
        }
        self.len += 1;

        trace!("inserted|[{}]{}", pid, height);
        Ok(height)
    }

    /// Replaces the node allocator
    pub fn with_allocator(
        mut self,
        allocator: Box<dyn NodeAllocator + Send>,
    ) -> Result<Self, QueueError> {
        self.set_allocator(allocator)?;
        Ok(self)
    }

    /// Replaces the node allocator in place
    ///
    /// Only an empty queue can switch allocators: every live node must be
    /// released to the allocator that reserved it.
    pub fn set_allocator(
        &mut self,
        allocator: Box<dyn NodeAllocator + Send>,
    ) -> Result<(), QueueError> {
        if !self.is_empty() {
            warn!("allocator swap refused with {} nodes live", self.node_count());
            return Err(QueueError::AllocatorInUse {
                live: self.node_count(),
            });
        }
        self.allocator = allocator;
        Ok(())
    }

    /// Last node with key <= `key` on every level, top-down descent
    fn predecessors(&self, key: EntryKey) -> [NodeIndex; MAX_LEVELS] {
        let mut preds = [0; MAX_LEVELS];
        let mut cursor = self.header(self.levels - 1);
        for level in (0..self.levels).rev() {
            while let Some(next) = self.node(cursor).next {
                if self.key_of(next) <= key {
                    cursor = next;
                } else {
                    break;
                }
            }
            preds[level] = cursor;
            if level > 0 {
                cursor = self.down_of(cursor);
            }
        }
        preds
    }

    fn alloc_node(&mut self, node: SkipNode) -> NodeIndex {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx as usize] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                (self.nodes.len() - 1) as NodeIndex
            }
        }
    }

    fn link_after(&mut self, pred: NodeIndex, idx: NodeIndex) {
        let next = self.node(pred).next;
        {
            let node = self.node_mut(idx);
            node.prev = Some(pred);
            node.next = next;
        }
        self.node_mut(pred).next = Some(idx);
        if let Some(next) = next {
            self.node_mut(next).prev = Some(idx);
        }
    }
}

impl<R> DeadlineSkipList<R> {
    /// Removes the tower of `pid` at `deadline`
    ///
    /// Returns the height the tower had. If no such entry is queued the
    /// queue is left untouched and `NotFound` is returned.
    pub fn remove(&mut self, pid: Pid, deadline: VirtualDeadline) -> Result<u8, QueueError> {
        let key = EntryKey::new(pid, deadline);
        let Some(top) = self.find_tower(key) else {
            warn!("remove of {} ignored: not queued", key);
            return Err(QueueError::NotFound { pid, deadline });
        };

        let height = self.node(top).level;
        let mut current = Some(top);
        let mut released = 0;
        while let Some(idx) = current {
            let node = self.free_node(idx);
            let Some(prev) = node.prev else {
                corrupted(format_args!("tower node of {} has no predecessor", key));
            };
            self.node_mut(prev).next = node.next;
            if let Some(next) = node.next {
                self.node_mut(next).prev = Some(prev);
            }
            current = node.down;
            released += 1;
        }
        if released != height as usize + 1 {
            corrupted(format_args!(
                "tower of {} spans {} nodes, expected {}",
                key,
                released,
                height as usize + 1
            ));
        }
        self.allocator.release(released);
        self.len -= 1;

        trace!("removed|[{}]{}", pid, height);
        Ok(height)
    }

    /// Returns the pid with the smallest key, if any
    pub fn peek_min(&self) -> Option<Pid> {
        self.min_entry().map(|key| key.pid)
    }

    /// Returns the smallest key, if any
    pub fn min_entry(&self) -> Option<EntryKey> {
        self.node(self.header(0))
            .next
            .map(|idx| self.key_of(idx))
    }

    /// Returns true if `pid` is queued at exactly `deadline`
    pub fn contains(&self, pid: Pid, deadline: VirtualDeadline) -> bool {
        self.find_tower(EntryKey::new(pid, deadline)).is_some()
    }

    /// Returns the height of the tower of `pid` at `deadline`
    pub fn tower_height(&self, pid: Pid, deadline: VirtualDeadline) -> Option<u8> {
        self.find_tower(EntryKey::new(pid, deadline))
            .map(|idx| self.node(idx).level)
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Number of live nodes, headers excluded
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len() - self.levels
    }

    /// Queued keys in ascending order
    pub fn iter(&self) -> impl Iterator<Item = EntryKey> + '_ {
        let mut cursor = self.node(self.header(0)).next;
        std::iter::from_fn(move || {
            let idx = cursor?;
            cursor = self.node(idx).next;
            Some(self.key_of(idx))
        })
    }

    /// Keys on each level, top level first
    pub fn dump(&self) -> Vec<Vec<EntryKey>> {
        (0..self.levels)
            .rev()
            .map(|level| self.level_entries(level))
            .collect()
    }

    /// Textual trace of [`Self::dump`]: one line per level, top first,
    /// entries as `deadline(pid)` joined by ` -> `
    pub fn render(&self) -> String {
        self.dump()
            .iter()
            .map(|level| {
                level
                    .iter()
                    .map(EntryKey::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Checks every structural invariant
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let mut below: HashSet<NodeIndex> = HashSet::new();
        let mut linked = 0;

        for level in 0..self.levels {
            let header = self.header(level);
            let head = match self.nodes.get(header as usize) {
                Some(Some(head)) => head,
                _ => return Err(InvariantViolation::DamagedHeader { level }),
            };
            let expected_down = level.checked_sub(1).map(|l| l as NodeIndex);
            if head.key.is_some()
                || head.prev.is_some()
                || head.level as usize != level
                || head.down != expected_down
            {
                return Err(InvariantViolation::DamagedHeader { level });
            }

            let mut members = HashSet::new();
            let mut prev_idx = header;
            let mut prev_key: Option<EntryKey> = None;
            let mut cursor = head.next;
            while let Some(idx) = cursor {
                let node = match self.nodes.get(idx as usize) {
                    Some(Some(node)) => node,
                    _ => return Err(InvariantViolation::DanglingLink { level }),
                };
                let Some(key) = node.key else {
                    return Err(InvariantViolation::DanglingLink { level });
                };
                if let Some(prev) = prev_key {
                    if prev >= key {
                        return Err(InvariantViolation::Unsorted {
                            level,
                            prev,
                            next: key,
                        });
                    }
                }
                if node.prev != Some(prev_idx) {
                    return Err(InvariantViolation::BrokenBackLink { level, key });
                }
                if node.level as usize != level {
                    return Err(InvariantViolation::WrongLevel {
                        level,
                        tagged: node.level as usize,
                        key,
                    });
                }
                let tower_ok = match (level, node.down) {
                    (0, None) => true,
                    (0, Some(_)) | (_, None) => false,
                    (_, Some(down)) => {
                        below.contains(&down)
                            && matches!(self.nodes.get(down as usize), Some(Some(n)) if n.key == Some(key))
                    }
                };
                if !tower_ok {
                    return Err(InvariantViolation::TowerGap { level, key });
                }

                members.insert(idx);
                prev_idx = idx;
                prev_key = Some(key);
                cursor = node.next;
            }

            if level == 0 && members.len() != self.len {
                return Err(InvariantViolation::LengthMismatch {
                    expected: self.len,
                    found: members.len(),
                });
            }
            linked += members.len();
            below = members;
        }

        let live = self.node_count();
        if live != linked {
            return Err(InvariantViolation::LeakedNodes { live, linked });
        }
        Ok(())
    }

    /// Tower whose key equals `key`, found by top-down descent
    fn find_tower(&self, key: EntryKey) -> Option<NodeIndex> {
        let mut level = self.levels - 1;
        let mut cursor = self.header(level);
        loop {
            while let Some(next) = self.node(cursor).next {
                match self.key_of(next).cmp(&key) {
                    Ordering::Less => cursor = next,
                    Ordering::Equal => return Some(next),
                    Ordering::Greater => break,
                }
            }
            if level == 0 {
                return None;
            }
            cursor = self.down_of(cursor);
            level -= 1;
        }
    }

    fn level_entries(&self, level: usize) -> Vec<EntryKey> {
        let mut entries = Vec::new();
        let mut cursor = self.node(self.header(level)).next;
        while let Some(idx) = cursor {
            entries.push(self.key_of(idx));
            cursor = self.node(idx).next;
        }
        entries
    }

    fn header(&self, level: usize) -> NodeIndex {
        level as NodeIndex
    }

    fn node(&self, idx: NodeIndex) -> &SkipNode {
        match self.nodes.get(idx as usize) {
            Some(Some(node)) => node,
            _ => corrupted(format_args!("dangling node handle {}", idx)),
        }
    }

    fn node_mut(&mut self, idx: NodeIndex) -> &mut SkipNode {
        match self.nodes.get_mut(idx as usize) {
            Some(Some(node)) => node,
            _ => corrupted(format_args!("dangling node handle {}", idx)),
        }
    }

    fn key_of(&self, idx: NodeIndex) -> EntryKey {
        match self.node(idx).key {
            Some(key) => key,
            None => corrupted(format_args!("header {} linked as an entry", idx)),
        }
    }

    fn down_of(&self, idx: NodeIndex) -> NodeIndex {
        match self.node(idx).down {
            Some(down) => down,
            None => corrupted(format_args!("node {} above level 0 has no down link", idx)),
        }
    }

    fn free_node(&mut self, idx: NodeIndex) -> SkipNode {
        match self.nodes.get_mut(idx as usize).and_then(Option::take) {
            Some(node) => {
                self.free.push(idx);
                node
            }
            None => corrupted(format_args!("double free of node {}", idx)),
        }
    }
}

impl<R> fmt::Display for DeadlineSkipList<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl<R> fmt::Debug for DeadlineSkipList<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadlineSkipList")
            .field("levels", &self.levels)
            .field("len", &self.len)
            .field("nodes", &self.node_count())
            .finish()
    }
}
