//! Scheduling Test Utilities
//!
//! Shared setup for the cross-crate scheduling tests.
//!
//! ## Test Philosophy
//!
//! - **Membership follows state**: a task is in the ready queue exactly when
//!   it is Ready or Running, checked after every mutation
//! - **Deterministic runs**: the same seed and workload give the same schedule
//! - **Faults are injected, not hoped for**: allocation failures come from a
//!   `FaultPlan`

use core_types::{Nice, Pid};
use sim_kernel::test_utils::checked_kernel;
use sim_kernel::{KernelConfig, KernelError, SimulatedKernel, WaitChannel};

/// Channel the bootstrap `init` task sleeps on
pub const INIT_CHANNEL: WaitChannel = WaitChannel(0);

/// A booted kernel: `init` asleep, one `loop` child per niceness
pub struct Bootstrap {
    pub kernel: SimulatedKernel,
    pub init: Pid,
    pub children: Vec<Pid>,
}

/// Boots a checked kernel the way the host daemon does
pub fn test_bootstrap(config: KernelConfig, nices: &[i32]) -> Result<Bootstrap, KernelError> {
    let kernel = checked_kernel(config)?;
    let init = kernel.userinit("init")?;

    let mut children = Vec::with_capacity(nices.len());
    for &value in nices {
        let child = kernel.nicefork(init, Nice::new(value)?)?;
        kernel.exec(child, "loop")?;
        children.push(child);
    }
    kernel.sleep(init, INIT_CHANNEL)?;

    Ok(Bootstrap {
        kernel,
        init,
        children,
    })
}
