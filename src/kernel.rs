//! Kernel orchestrator
//!
//! Owns the memory manager, the CPU and the scheduler, and brings them up
//! and down in a fixed order:
//!
//! 1. Validate configuration
//! 2. Initialize memory
//! 3. Power on the CPU
//! 4. Start the scheduler
//!
//! Shutdown stops the scheduler and then powers off the CPU. Memory
//! contents survive a shutdown and are reset by the next boot.

use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::KernelConfig;
use crate::cpu::{Cpu, CpuStatus, Program};
use crate::error::{BootStepError, KernelError, KernelResult};
use crate::sched::{
    PolicyKind, PolicyParams, Priority, ProcessCounts, ProcessSnapshot, RunExit, SchedStats,
    Scheduler, TickOutcome,
};
use crate::translate::translate;
use crate::types::ProcessId;
use crate::vm::{MemoryManager, MemoryStats};

// ============================================================================
// Boot State
// ============================================================================

/// Kernel startup state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StartupPhase {
    /// Never booted, or the last boot failed
    NotStarted,
    /// Validating configuration
    Config,
    /// Initializing the address space
    MemoryInit,
    /// Powering on the CPU
    CpuPowerOn,
    /// Starting the scheduler
    SchedulerStart,
    /// Fully running
    Running,
    /// Shut down after running
    Halted,
}

impl StartupPhase {
    pub const fn name(self) -> &'static str {
        match self {
            StartupPhase::NotStarted => "not started",
            StartupPhase::Config => "config",
            StartupPhase::MemoryInit => "memory init",
            StartupPhase::CpuPowerOn => "cpu power on",
            StartupPhase::SchedulerStart => "scheduler start",
            StartupPhase::Running => "running",
            StartupPhase::Halted => "halted",
        }
    }
}

/// Result of [`Kernel::boot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStatus {
    Booted,
    /// The kernel was already booted; nothing changed
    AlreadyBooted,
}

/// Result of [`Kernel::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStatus {
    ShutDown,
    /// The kernel was not booted; nothing changed
    NotBooted,
}

/// Whole-machine telemetry for a monitoring front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemStatus {
    pub booted: bool,
    pub phase: StartupPhase,
    pub boots: u64,
    pub policy: PolicyKind,
    pub cpu: CpuStatus,
    pub memory: MemoryStats,
    pub processes: ProcessCounts,
    pub scheduler: SchedStats,
}

// ============================================================================
// Kernel
// ============================================================================

/// The machine: memory, CPU and scheduler under one owner
#[derive(Debug)]
pub struct Kernel {
    config: KernelConfig,
    memory: MemoryManager,
    cpu: Cpu,
    scheduler: Scheduler,
    booted: bool,
    phase: StartupPhase,
    boots: u64,
}

impl Kernel {
    /// Create a not-booted kernel
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            memory: MemoryManager::new(),
            cpu: Cpu::new(),
            scheduler: Scheduler::from_config(&config),
            booted: false,
            phase: StartupPhase::NotStarted,
            boots: 0,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Replace the configuration of a kernel that is not booted
    ///
    /// The scheduler policy is rebuilt from the new configuration; submitted
    /// processes are kept. The configuration is validated by the next boot.
    pub fn reconfigure(&mut self, config: KernelConfig) -> KernelResult<()> {
        if self.booted {
            return Err(KernelError::Booted);
        }
        self.scheduler
            .set_policy(config.policy.build(PolicyParams::from(&config)));
        self.config = config;
        log::debug!("kernel reconfigured ({} scheduling)", config.policy);
        Ok(())
    }

    /// Bring the machine up
    ///
    /// A failing step aborts the remaining ones and leaves the kernel
    /// not booted; boot may be retried.
    pub fn boot(&mut self) -> KernelResult<BootStatus> {
        if self.booted {
            log::info!("boot requested while already booted");
            return Ok(BootStatus::AlreadyBooted);
        }

        if let Err(err) = self.bring_up() {
            let phase = self.phase;
            log::error!("boot failed during {}: {}", phase.name(), err);
            self.cpu.power_off();
            self.phase = StartupPhase::NotStarted;
            return Err(KernelError::Boot { phase, source: err });
        }

        self.set_phase(StartupPhase::Running);
        self.booted = true;
        self.boots += 1;
        log::info!(
            "kernel booted: {} bytes, {} scheduling",
            self.config.memory_size,
            self.scheduler.policy()
        );
        Ok(BootStatus::Booted)
    }

    fn bring_up(&mut self) -> Result<(), BootStepError> {
        self.set_phase(StartupPhase::Config);
        self.config.validate()?;

        self.set_phase(StartupPhase::MemoryInit);
        match self.config.resident_pages {
            Some(frames) => self
                .memory
                .initialize_with_capacity(self.config.memory_size, frames)?,
            None => self.memory.initialize(self.config.memory_size)?,
        }

        self.set_phase(StartupPhase::CpuPowerOn);
        self.cpu.power_on();

        self.set_phase(StartupPhase::SchedulerStart);
        self.scheduler.start();
        Ok(())
    }

    fn set_phase(&mut self, phase: StartupPhase) {
        log::debug!("startup phase: {}", phase.name());
        self.phase = phase;
    }

    /// Stop the scheduler, then power off the CPU
    pub fn shutdown(&mut self) -> ShutdownStatus {
        if !self.booted {
            log::info!("shutdown requested while not booted");
            return ShutdownStatus::NotBooted;
        }
        self.scheduler.stop();
        self.cpu.power_off();
        self.booted = false;
        self.phase = StartupPhase::Halted;
        log::info!("kernel shut down");
        ShutdownStatus::ShutDown
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    pub fn phase(&self) -> StartupPhase {
        self.phase
    }

    /// Translate `binary` and submit it at `priority`
    pub fn launch(&mut self, binary: &[u8], priority: Priority) -> KernelResult<ProcessId> {
        if !self.booted {
            return Err(KernelError::NotBooted);
        }
        let program = translate(binary)?;
        Ok(self.scheduler.submit_with_priority(program, priority))
    }

    /// Submit an already translated program at the default priority
    ///
    /// Does not require a booted kernel; the process runs once booted.
    pub fn submit(&mut self, program: Program) -> ProcessId {
        self.scheduler.submit(program)
    }

    /// Run the scheduler for at most `max_ticks` ticks
    pub fn run(&mut self, max_ticks: u64) -> RunExit {
        self.scheduler.run(&mut self.cpu, &self.memory, max_ticks)
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.scheduler.tick(&mut self.cpu, &self.memory)
    }

    pub fn wake(&mut self, pid: ProcessId) -> KernelResult<()> {
        Ok(self.scheduler.wake(pid)?)
    }

    pub fn kill(&mut self, pid: ProcessId) -> KernelResult<()> {
        Ok(self.scheduler.kill(pid)?)
    }

    pub fn list_processes(&self) -> Vec<ProcessSnapshot> {
        self.scheduler.list_processes()
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            booted: self.booted,
            phase: self.phase,
            boots: self.boots,
            policy: self.scheduler.policy(),
            cpu: self.cpu.status(),
            memory: self.memory.stats(),
            processes: self.scheduler.counts(),
            scheduler: self.scheduler.stats(),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}
