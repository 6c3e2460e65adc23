//! # Host Runtime
//!
//! Boots a simulated kernel, forks the experiment tasks and runs them.

use core_types::{Nice, Pid};
use log::info;
use serde::Serialize;
use sim_kernel::{CpuBound, KernelConfig, KernelError, SimulatedKernel, WaitChannel};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Channel `init` waits on while its children run
const INIT_WAIT: WaitChannel = WaitChannel(0);

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Host runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRuntimeConfig {
    pub kernel: KernelConfig,
    /// Ticks to simulate
    pub ticks: u64,
    /// Niceness of each CPU-bound child
    pub nices: Vec<Nice>,
    /// Open the snapshot feed for this many ticks
    pub schedlog: Option<u64>,
    /// Append the final ready queue to the report
    pub dump: bool,
}

impl Default for HostRuntimeConfig {
    fn default() -> Self {
        Self {
            kernel: KernelConfig::default(),
            ticks: 1000,
            nices: [-5, 0, 5]
                .into_iter()
                .filter_map(|value| Nice::new(value).ok())
                .collect(),
            schedlog: None,
            dump: false,
        }
    }
}

impl HostRuntimeConfig {
    /// Loads a kernel configuration from a JSON file
    ///
    /// Missing fields keep their defaults.
    pub fn load_kernel_config(path: &Path) -> Result<KernelConfig, HostRuntimeError> {
        let text = fs::read_to_string(path).map_err(|source| HostRuntimeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| HostRuntimeError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Per-task totals of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub pid: Pid,
    pub nice: Nice,
    pub dispatches: u64,
    pub cpu_ticks: u64,
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub final_tick: u64,
    pub idle_ticks: u64,
    pub retried: u64,
    pub tasks: Vec<TaskReport>,
    pub schedlog: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_dump: Option<String>,
}

impl RunReport {
    /// Human-readable report: snapshot lines, a totals table, then the
    /// queue dump if one was taken
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.schedlog {
            let _ = writeln!(out, "{}", line);
        }
        let _ = writeln!(out, "pid  nice  dispatches  cpu_ticks");
        for task in &self.tasks {
            let _ = writeln!(
                out,
                "{:<4} {:>4}  {:>10}  {:>9}",
                task.pid, task.nice, task.dispatches, task.cpu_ticks
            );
        }
        let _ = writeln!(
            out,
            "tick {}  idle {}  retried {}",
            self.final_tick, self.idle_ticks, self.retried
        );
        if let Some(dump) = &self.queue_dump {
            let _ = writeln!(out, "{}", dump);
        }
        out
    }

    pub fn to_json(&self) -> Result<String, HostRuntimeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Host runtime
pub struct HostRuntime {
    config: HostRuntimeConfig,
    kernel: SimulatedKernel,
    init: Pid,
    children: Vec<Pid>,
}

impl HostRuntime {
    /// Boots the kernel: `init` forks one `loop` child per niceness and
    /// goes to sleep
    pub fn new(config: HostRuntimeConfig) -> Result<Self, HostRuntimeError> {
        let kernel = SimulatedKernel::new(config.kernel)?;
        let init = kernel.userinit("init")?;

        let mut children = Vec::with_capacity(config.nices.len());
        for &nice in &config.nices {
            let child = kernel.nicefork(init, nice)?;
            kernel.exec(child, "loop")?;
            children.push(child);
        }
        kernel.sleep(init, INIT_WAIT)?;
        info!("booted with {} child task(s)", children.len());

        Ok(Self {
            config,
            kernel,
            init,
            children,
        })
    }

    pub fn kernel(&self) -> &SimulatedKernel {
        &self.kernel
    }

    pub fn init(&self) -> Pid {
        self.init
    }

    pub fn children(&self) -> &[Pid] {
        &self.children
    }

    /// Runs the configured number of ticks
    pub fn run(&mut self) -> Result<RunReport, HostRuntimeError> {
        if let Some(window) = self.config.schedlog {
            self.kernel.schedlog(window);
        }

        let summary = self.kernel.run_for(self.config.ticks, &mut CpuBound)?;

        let tasks = self
            .children
            .iter()
            .zip(&self.config.nices)
            .map(|(&pid, &nice)| TaskReport {
                pid,
                nice,
                dispatches: summary.dispatches_of(pid),
                cpu_ticks: summary.cpu_ticks_of(pid),
            })
            .collect();

        Ok(RunReport {
            final_tick: self.kernel.now(),
            idle_ticks: summary.idle_ticks,
            retried: summary.retried,
            tasks,
            schedlog: self.kernel.take_schedlog_lines(),
            queue_dump: self.config.dump.then(|| self.kernel.render_queue()),
        })
    }
}
