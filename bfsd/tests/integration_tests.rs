//! Integration tests for the bfsd host runtime

use bfsd::{HostRuntime, HostRuntimeConfig, HostRuntimeError};
use core_types::{Nice, RunState};
use sim_kernel::schedlog::SnapshotLine;
use std::io::Write;

#[test]
fn test_default_experiment_is_fair_by_niceness() {
    let config = HostRuntimeConfig {
        ticks: 3000,
        ..HostRuntimeConfig::default()
    };
    let mut runtime = HostRuntime::new(config).unwrap();
    let report = runtime.run().unwrap();

    assert_eq!(report.tasks.len(), 3);
    let favoured = &report.tasks[0];
    let neutral = &report.tasks[1];
    let penalised = &report.tasks[2];
    assert_eq!(favoured.nice.get(), -5);
    assert!(favoured.dispatches > neutral.dispatches);
    assert!(neutral.dispatches > penalised.dispatches);
    assert!(penalised.dispatches > 0);
    assert_eq!(report.idle_ticks, 0);
}

#[test]
fn test_schedlog_window() {
    let config = HostRuntimeConfig {
        ticks: 200,
        schedlog: Some(50),
        ..HostRuntimeConfig::default()
    };
    let mut runtime = HostRuntime::new(config).unwrap();
    let init = runtime.init();
    let report = runtime.run().unwrap();

    assert!(!report.schedlog.is_empty());
    for line in &report.schedlog {
        let snapshot: SnapshotLine = line.parse().unwrap();
        assert!(snapshot.tick <= 50);
        // init plus three children
        assert_eq!(snapshot.slots.len(), 4);
        assert_eq!(
            snapshot.task(init).unwrap().state(),
            RunState::Sleeping
        );
    }
}

#[test]
fn test_kernel_config_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "clock": {{ "quantum_ticks": 3 }}, "skiplist": {{ "levels": 6 }} }}"#
    )
    .unwrap();

    let kernel = HostRuntimeConfig::load_kernel_config(file.path()).unwrap();
    assert_eq!(kernel.clock.quantum_ticks, 3);
    assert_eq!(kernel.skiplist.levels, 6);
    assert_eq!(kernel.nproc, sim_kernel::NPROC);

    let config = HostRuntimeConfig {
        kernel,
        ticks: 30,
        dump: true,
        ..HostRuntimeConfig::default()
    };
    let mut runtime = HostRuntime::new(config).unwrap();
    let report = runtime.run().unwrap();
    // One line per level
    assert_eq!(report.queue_dump.unwrap().lines().count(), 6);
}

#[test]
fn test_bad_config_file_is_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();

    let err = HostRuntimeConfig::load_kernel_config(file.path()).unwrap_err();
    assert!(matches!(err, HostRuntimeError::Config { .. }));

    let missing = file.path().with_extension("missing");
    let err = HostRuntimeConfig::load_kernel_config(&missing).unwrap_err();
    assert!(matches!(err, HostRuntimeError::Io { .. }));
}

#[test]
fn test_too_many_children_fails_to_boot() {
    let mut config = HostRuntimeConfig::default();
    config.kernel.nproc = 2;
    config.nices = vec![Nice::DEFAULT; 3];

    let err = HostRuntime::new(config).err().unwrap();
    assert!(matches!(err, HostRuntimeError::Kernel(_)));
}

#[test]
fn test_zero_quantum_config_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "clock": {{ "quantum_ticks": 0 }} }}"#).unwrap();

    let kernel = HostRuntimeConfig::load_kernel_config(file.path()).unwrap();
    let config = HostRuntimeConfig {
        kernel,
        ..HostRuntimeConfig::default()
    };
    let err = HostRuntime::new(config).err();
    assert!(matches!(
        err,
        Some(HostRuntimeError::Kernel(sim_kernel::KernelError::InvalidConfig(_)))
    ));
}
