//! Arbitrary lifecycle sequences keep the process table and ready queue in
//! agreement

use core_types::{Nice, Pid, RunState};
use proptest::prelude::*;
use sim_kernel::test_utils::checked_kernel;
use sim_kernel::{CpuBound, KernelConfig, KernelError, SimulatedKernel, WaitChannel};

#[derive(Debug, Clone)]
enum Op {
    Spawn(i32),
    Fork(usize, i32),
    Sleep(usize, u64),
    Wakeup(u64),
    Kill(usize),
    Exit(usize),
    Reap(usize),
    Run(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-20i32..=19).prop_map(Op::Spawn),
        (0usize..16, -20i32..=19).prop_map(|(i, n)| Op::Fork(i, n)),
        (0usize..16, 0u64..3).prop_map(|(i, c)| Op::Sleep(i, c)),
        (0u64..3).prop_map(Op::Wakeup),
        (0usize..16).prop_map(Op::Kill),
        (0usize..16).prop_map(Op::Exit),
        (0usize..16).prop_map(Op::Reap),
        (1u64..40).prop_map(Op::Run),
    ]
}

/// Errors a well-formed kernel may legitimately return for a random op
fn expected(result: Result<(), KernelError>) {
    match result {
        Ok(())
        | Err(KernelError::InvalidState { .. })
        | Err(KernelError::NoSuchProcess(_))
        | Err(KernelError::ProcessTableFull { .. }) => {}
        Err(err) => panic!("unexpected error: {}", err),
    }
}

fn pick(pids: &[Pid], index: usize) -> Pid {
    // Indices past the end name a pid that never existed.
    pids.get(index).copied().unwrap_or(Pid::new(1000))
}

fn apply(kernel: &SimulatedKernel, pids: &mut Vec<Pid>, op: &Op) {
    match *op {
        Op::Spawn(nice) => {
            expected(kernel.spawn("p", Nice::new(nice).unwrap()).map(|pid| pids.push(pid)))
        }
        Op::Fork(i, nice) => expected(
            kernel
                .nicefork(pick(pids, i), Nice::new(nice).unwrap())
                .map(|pid| pids.push(pid)),
        ),
        Op::Sleep(i, chan) => expected(kernel.sleep(pick(pids, i), WaitChannel(chan))),
        Op::Wakeup(chan) => expected(kernel.wakeup(WaitChannel(chan)).map(|_| ())),
        Op::Kill(i) => expected(kernel.kill(pick(pids, i))),
        Op::Exit(i) => expected(kernel.exit(pick(pids, i))),
        Op::Reap(i) => expected(kernel.reap(pick(pids, i)).map(|_| ())),
        Op::Run(ticks) => expected(kernel.run_for(ticks, &mut CpuBound).map(|_| ())),
    }
}

proptest! {
    #[test]
    fn lifecycle_keeps_queue_consistent(
        seed in any::<u32>(),
        ops in prop::collection::vec(op(), 1..80),
    ) {
        let mut config = KernelConfig::default();
        config.nproc = 8;
        config.skiplist.seed = seed;
        let kernel = checked_kernel(config).unwrap();
        let mut pids = Vec::new();

        for op in &ops {
            apply(&kernel, &mut pids, op);
            prop_assert!(kernel.check_consistency().is_ok());
            prop_assert_eq!(kernel.running(), None);
        }

        let queued = kernel
            .tasks()
            .iter()
            .filter(|task| matches!(task.state, RunState::Ready | RunState::Running))
            .count();
        prop_assert_eq!(queued, kernel.queue_len());
    }

    #[test]
    fn time_only_moves_forward(
        nices in prop::collection::vec(-20i32..=19, 1..6),
        rounds in 1usize..60,
    ) {
        let kernel = checked_kernel(KernelConfig::default()).unwrap();
        for nice in nices {
            kernel.spawn("p", Nice::new(nice).unwrap()).unwrap();
        }

        let mut last = kernel.now();
        for _ in 0..rounds {
            kernel.schedule_once(&mut CpuBound).unwrap();
            prop_assert!(kernel.now() > last);
            last = kernel.now();
        }
    }
}
