//! Log records emitted while scheduling
//!
//! The recorder is process-wide, so this binary holds a single test.

use log::LevelFilter;
use services_logger::{LogLevel, RecordingLogger};
use sim_kernel::schedlog::SnapshotLine;
use sim_kernel::{CpuBound, KernelConfig};
use tests_scheduling::test_bootstrap;

#[test]
fn test_scheduling_is_logged() {
    let recorder = RecordingLogger::global(LevelFilter::Trace);
    recorder.take();

    let boot = test_bootstrap(KernelConfig::default(), &[-1, 1]).unwrap();
    boot.kernel.schedlog(20);
    boot.kernel.run_for(60, &mut CpuBound).unwrap();

    let snapshots = recorder.entries_for_target("schedlog");
    assert!(!snapshots.is_empty());
    for entry in &snapshots {
        assert_eq!(entry.level, LogLevel::Info);
        let line: SnapshotLine = entry.message.parse().unwrap();
        assert!(line.tick <= 20);
    }
    assert_eq!(snapshots.len(), boot.kernel.schedlog_lines().len());

    let inserts: Vec<_> = recorder
        .entries()
        .into_iter()
        .filter(|entry| entry.message.starts_with("inserted|"))
        .collect();
    assert!(inserts.len() >= 3);
    assert!(inserts.iter().all(|entry| entry.source.is_some()));
    assert!(inserts.iter().all(|entry| entry.level == LogLevel::Trace));

    for &child in &boot.children {
        assert!(!recorder.entries_for(child).is_empty());
    }
}
