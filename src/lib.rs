//! Radiate Core - a simulated machine core
//!
//! A small software virtual machine: a paged memory manager with LRU
//! eviction, a translation layer from bytes to programs, a CPU execution
//! engine and a multi-level feedback-queue scheduler, wired together by a
//! kernel orchestrator with an explicit boot and shutdown sequence.
//!
//! ```
//! use radiate_core::{Kernel, Priority, RunExit};
//! use radiate_core::translate::opcode::OP_NOP;
//!
//! let mut kernel = Kernel::default();
//! kernel.boot().unwrap();
//! let pid = kernel.launch(&[OP_NOP; 16], Priority::default()).unwrap();
//! assert_eq!(kernel.run(1_000), RunExit::Idle);
//! assert_eq!(kernel.scheduler().process(pid).unwrap().cpu_time, 16);
//! kernel.shutdown();
//! ```

#![no_std]

extern crate alloc;

// Core types
pub mod config;
pub mod error;
pub mod types;

// Subsystems
pub mod cpu;
pub mod sched;
pub mod translate;
pub mod vm;

// Orchestration and output
pub mod console;
pub mod kernel;

pub use config::KernelConfig;
pub use cpu::{Cpu, CpuContext, CpuStatus, ExecutionResult, Instruction, Program, RunOutcome};
pub use error::{
    ConfigError, CpuError, KernelError, KernelResult, MemoryError, MemoryResult, SchedulerError,
    TranslationError,
};
pub use kernel::{BootStatus, Kernel, ShutdownStatus, StartupPhase, SystemStatus};
pub use sched::{
    PolicyKind, Priority, ProcessSnapshot, ProcessState, RunExit, Scheduler, TickOutcome,
};
pub use translate::translate;
pub use types::{PageNumber, ProcessId};
pub use vm::{MemoryManager, MemoryStats, Zone, PAGE_SIZE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
