//! Allocation failures leave the process table and ready queue consistent

use core_types::{Pid, RunState};
use deadline_queue::QueueError;
use hal::{AllocError, NodeAllocator};
use sim_kernel::fault_injection::{AllocFault, FaultPlan};
use sim_kernel::test_utils::{assert_consistent, checked_kernel, spawn_all};
use sim_kernel::{CpuBound, KernelConfig, KernelError, WaitChannel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Allocator whose failures a test can arm while the kernel owns it
#[derive(Clone, Default)]
struct Armed {
    failures: Arc<AtomicUsize>,
}

impl Armed {
    fn arm(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }
}

impl NodeAllocator for Armed {
    fn reserve(&mut self, _count: usize) -> Result<(), AllocError> {
        let armed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match armed {
            Ok(_) => Err(AllocError::Unavailable),
            Err(_) => Ok(()),
        }
    }

    fn release(&mut self, _count: usize) {}
}

fn single_level() -> KernelConfig {
    let mut config = KernelConfig::default();
    config.skiplist.levels = 1;
    config
}

#[test]
fn test_failed_requeue_keeps_task_at_old_deadline() {
    let armed = Armed::default();
    let kernel = checked_kernel(KernelConfig::default())
        .unwrap()
        .with_allocator(Box::new(armed.clone()))
        .unwrap();
    let pids = spawn_all(&kernel, "loop", &[0, 0]).unwrap();
    let before = kernel.task(pids[0]).unwrap().deadline;

    armed.arm(1);
    let err = kernel.schedule_once(&mut CpuBound).unwrap_err();
    assert!(err.is_retryable());

    let task = kernel.task(pids[0]).unwrap();
    assert_eq!(task.state, RunState::Ready);
    assert_eq!(task.deadline, before);
    assert_eq!(kernel.running(), None);
    assert_consistent(&kernel);

    // Still the minimum, so it runs again and this time moves on.
    kernel.schedule_once(&mut CpuBound).unwrap();
    assert_ne!(kernel.task(pids[0]).unwrap().deadline, before);
    assert_eq!(kernel.peek_min(), Some(pids[1]));
}

#[test]
fn test_run_counts_retried_rounds() {
    let armed = Armed::default();
    let kernel = checked_kernel(KernelConfig::default())
        .unwrap()
        .with_allocator(Box::new(armed.clone()))
        .unwrap();
    spawn_all(&kernel, "loop", &[-1, 0, 1]).unwrap();

    armed.arm(3);
    let summary = kernel.run_for(200, &mut CpuBound).unwrap();
    assert_eq!(summary.retried, 3);
    assert_consistent(&kernel);
}

#[test]
fn test_failed_wakeup_leaves_sleepers_asleep() {
    let armed = Armed::default();
    let kernel = checked_kernel(KernelConfig::default())
        .unwrap()
        .with_allocator(Box::new(armed.clone()))
        .unwrap();
    let pids = spawn_all(&kernel, "sh", &[0, 0]).unwrap();
    let chan = WaitChannel(3);
    for &pid in &pids {
        kernel.sleep(pid, chan).unwrap();
    }

    armed.arm(1);
    assert!(kernel.wakeup(chan).unwrap_err().is_retryable());
    for &pid in &pids {
        assert_eq!(kernel.task(pid).unwrap().state, RunState::Sleeping);
        assert_eq!(kernel.wait_channel(pid), Some(chan));
    }

    assert_eq!(kernel.wakeup(chan).unwrap(), 2);
    assert_consistent(&kernel);
}

#[test]
fn test_fail_next_plan_rejects_first_spawns() {
    let plan = FaultPlan::new().with_alloc_fault(AllocFault::FailNext { count: 2 });
    let kernel = checked_kernel(KernelConfig::default())
        .unwrap()
        .with_fault_plan(&plan)
        .unwrap();

    for _ in 0..2 {
        let err = kernel.userinit("init").unwrap_err();
        assert!(matches!(err, KernelError::Queue(_)));
        assert!(err.is_retryable());
    }
    assert!(kernel.tasks().is_empty());
    assert_eq!(kernel.userinit("init").unwrap(), Pid::new(1));
}

#[test]
fn test_allocator_cannot_change_under_queued_tasks() {
    let kernel = checked_kernel(KernelConfig::default()).unwrap();
    kernel.userinit("init").unwrap();

    let err = kernel.with_allocator(Box::new(Armed::default())).err();
    assert!(matches!(
        err,
        Some(KernelError::Queue(QueueError::AllocatorInUse { .. }))
    ));
}

#[test]
fn test_node_limit_caps_admissions() {
    let plan = FaultPlan::new().with_alloc_fault(AllocFault::NodeLimit { max_live: 3 });
    let kernel = checked_kernel(single_level()).unwrap().with_fault_plan(&plan).unwrap();

    let pids = spawn_all(&kernel, "loop", &[0, 0, 0]).unwrap();
    let err = kernel.userinit("extra").unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(kernel.tasks().len(), 3);

    kernel.exit(pids[2]).unwrap();
    kernel.reap(pids[2]).unwrap();
    kernel.userinit("extra").unwrap();
    assert_consistent(&kernel);
}

#[test]
fn test_spare_node_keeps_requeue_working() {
    // One level, so every tower is a single node; two tasks plus the new
    // tower built during a requeue fit exactly.
    let plan = FaultPlan::new().with_alloc_fault(AllocFault::NodeLimit { max_live: 3 });
    let kernel = checked_kernel(single_level()).unwrap().with_fault_plan(&plan).unwrap();
    spawn_all(&kernel, "loop", &[0, 4]).unwrap();

    let summary = kernel.run_for(500, &mut CpuBound).unwrap();
    assert_eq!(summary.retried, 0);
    assert_consistent(&kernel);
}
