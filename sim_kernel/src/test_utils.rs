//! Helpers for scheduling tests
//!
//! Shared by the unit tests here and the integration tests of the
//! workspace.

use crate::scheduler::ScheduleEvent;
use crate::{KernelConfig, KernelError, SimulatedKernel};
use core_types::{Nice, Pid};
use std::collections::BTreeMap;

/// Kernel with the consistency check switched on regardless of build
/// profile
pub fn checked_kernel(config: KernelConfig) -> Result<SimulatedKernel, KernelError> {
    SimulatedKernel::new(KernelConfig {
        verify_after_mutation: true,
        ..config
    })
}

/// Spawns one task per niceness, in order, all named `name`
pub fn spawn_all(
    kernel: &SimulatedKernel,
    name: &str,
    nices: &[i32],
) -> Result<Vec<Pid>, KernelError> {
    nices
        .iter()
        .map(|&value| kernel.spawn(name, Nice::new(value)?))
        .collect()
}

/// Counts how often each task was selected in an audit trail
pub fn selection_counts(events: &[ScheduleEvent]) -> BTreeMap<Pid, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        if let ScheduleEvent::TaskSelected { pid, .. } = event {
            *counts.entry(*pid).or_insert(0) += 1;
        }
    }
    counts
}

/// Panics with the rendered queue if the process table and ready queue
/// disagree
pub fn assert_consistent(kernel: &SimulatedKernel) {
    if let Err(err) = kernel.check_consistency() {
        panic!("{}\n{}", err, kernel.render_queue());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBound;

    #[test]
    fn test_spawn_all_rejects_bad_niceness() {
        let kernel = checked_kernel(KernelConfig::default()).unwrap();
        let err = spawn_all(&kernel, "x", &[0, 40]).unwrap_err();
        assert!(matches!(err, KernelError::Nice(_)));
        // The first task was created before the bad value was seen.
        assert_eq!(kernel.tasks().len(), 1);
    }

    #[test]
    fn test_selection_counts_match_summary() {
        let kernel = checked_kernel(KernelConfig::default()).unwrap();
        let pids = spawn_all(&kernel, "loop", &[0, 3]).unwrap();

        let summary = kernel.run_for(200, &mut CpuBound).unwrap();
        let counts = selection_counts(&kernel.audit_log());

        for pid in pids {
            assert_eq!(counts[&pid] as u64, summary.dispatches_of(pid));
        }
        assert_consistent(&kernel);
    }
}
