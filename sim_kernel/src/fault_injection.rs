//! Deterministic allocation fault injection
//!
//! Ready-queue nodes come from an external allocator. A [`FaultPlan`]
//! describes how that allocator should misbehave, and [`FaultyAllocator`]
//! realises the plan behind the `hal::NodeAllocator` seam.
//!
//! ## Example
//!
//! ```
//! use sim_kernel::fault_injection::{AllocFault, FaultPlan, FaultyAllocator};
//! use hal::NodeAllocator;
//!
//! let plan = FaultPlan::new()
//!     .with_alloc_fault(AllocFault::FailNext { count: 1 })
//!     .with_alloc_fault(AllocFault::NodeLimit { max_live: 8 });
//! let mut allocator = FaultyAllocator::new(&plan);
//!
//! assert!(allocator.reserve(1).is_err());
//! assert!(allocator.reserve(8).is_ok());
//! assert!(allocator.reserve(1).is_err());
//! ```

use hal::{AllocError, NodeAllocator};
use log::warn;

/// A fault to inject into node allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocFault {
    /// Fail the next `count` reservations, whatever their size
    FailNext { count: usize },

    /// Never let more than `max_live` nodes be reserved at once
    NodeLimit { max_live: usize },
}

/// A plan describing all allocation faults of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    alloc_faults: Vec<AllocFault>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alloc_fault(mut self, fault: AllocFault) -> Self {
        self.alloc_faults.push(fault);
        self
    }

    pub fn alloc_faults(&self) -> &[AllocFault] {
        &self.alloc_faults
    }

    pub fn is_empty(&self) -> bool {
        self.alloc_faults.is_empty()
    }
}

/// Node allocator that fails according to a [`FaultPlan`]
///
/// `FailNext` faults accumulate; of several `NodeLimit` faults the
/// tightest wins.
#[derive(Debug, Clone, Default)]
pub struct FaultyAllocator {
    fail_next: usize,
    max_live: Option<usize>,
    live: usize,
    injected: usize,
}

impl FaultyAllocator {
    pub fn new(plan: &FaultPlan) -> Self {
        let mut allocator = Self::default();
        for fault in plan.alloc_faults() {
            match *fault {
                AllocFault::FailNext { count } => allocator.fail_next += count,
                AllocFault::NodeLimit { max_live } => {
                    allocator.max_live = Some(
                        allocator
                            .max_live
                            .map_or(max_live, |limit| limit.min(max_live)),
                    );
                }
            }
        }
        allocator
    }

    /// Nodes currently reserved
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of reservations refused so far
    pub fn injected_failures(&self) -> usize {
        self.injected
    }
}

impl NodeAllocator for FaultyAllocator {
    fn reserve(&mut self, count: usize) -> Result<(), AllocError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            self.injected += 1;
            warn!("fault injection: refusing reservation of {} node(s)", count);
            return Err(AllocError::Unavailable);
        }

        if let Some(max_live) = self.max_live {
            let available = max_live.saturating_sub(self.live);
            if count > available {
                self.injected += 1;
                return Err(AllocError::OutOfMemory {
                    requested: count,
                    available,
                });
            }
        }

        self.live += count;
        Ok(())
    }

    fn release(&mut self, count: usize) {
        self.live = self.live.saturating_sub(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plan_never_fails() {
        let mut allocator = FaultyAllocator::new(&FaultPlan::new());
        for _ in 0..100 {
            allocator.reserve(4).unwrap();
        }
        assert_eq!(allocator.live(), 400);
        assert_eq!(allocator.injected_failures(), 0);
    }

    #[test]
    fn test_fail_next_counts_down() {
        let plan = FaultPlan::new().with_alloc_fault(AllocFault::FailNext { count: 2 });
        let mut allocator = FaultyAllocator::new(&plan);

        assert_eq!(allocator.reserve(1), Err(AllocError::Unavailable));
        assert_eq!(allocator.reserve(1), Err(AllocError::Unavailable));
        assert_eq!(allocator.reserve(1), Ok(()));
        assert_eq!(allocator.injected_failures(), 2);
        assert_eq!(allocator.live(), 1);
    }

    #[test]
    fn test_node_limit_is_all_or_nothing() {
        let plan = FaultPlan::new().with_alloc_fault(AllocFault::NodeLimit { max_live: 3 });
        let mut allocator = FaultyAllocator::new(&plan);

        allocator.reserve(2).unwrap();
        assert_eq!(
            allocator.reserve(2),
            Err(AllocError::OutOfMemory {
                requested: 2,
                available: 1
            })
        );
        assert_eq!(allocator.live(), 2);

        allocator.release(2);
        allocator.reserve(3).unwrap();
    }

    #[test]
    fn test_tightest_limit_wins() {
        let plan = FaultPlan::new()
            .with_alloc_fault(AllocFault::NodeLimit { max_live: 10 })
            .with_alloc_fault(AllocFault::NodeLimit { max_live: 2 });
        let mut allocator = FaultyAllocator::new(&plan);

        assert!(allocator.reserve(3).is_err());
        assert!(allocator.reserve(2).is_ok());
    }
}
