//! Node allocation capability

use thiserror::Error;

/// Errors that can occur while reserving queue nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The allocator cannot hand out the requested number of nodes
    #[error("Out of memory: {requested} node(s) requested, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    /// Transient failure; the same request may succeed later
    #[error("Allocation temporarily unavailable")]
    Unavailable,
}

/// External allocation capability for ready-queue nodes
///
/// The ready queue reserves every node a tower needs before it links any
/// of them, and releases them when the tower is removed. Implementations
/// only account for capacity; node storage itself lives in the queue.
pub trait NodeAllocator {
    /// Reserves `count` nodes, all or nothing
    fn reserve(&mut self, count: usize) -> Result<(), AllocError>;

    /// Returns `count` previously reserved nodes
    fn release(&mut self, count: usize);
}

/// Allocator that never runs out
#[derive(Debug, Clone, Copy, Default)]
pub struct UnboundedAllocator;

impl NodeAllocator for UnboundedAllocator {
    fn reserve(&mut self, _count: usize) -> Result<(), AllocError> {
        Ok(())
    }

    fn release(&mut self, _count: usize) {}
}
