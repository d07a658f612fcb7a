//! Unified error types for the machine core using thiserror

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kernel::StartupPhase;
use crate::sched::ProcessState;
use crate::types::{PageNumber, ProcessId};

/// Result type for memory manager operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Result type for execution engine operations
pub type CpuResult<T> = core::result::Result<T, CpuError>;

/// Result type for kernel operations
pub type KernelResult<T> = core::result::Result<T, KernelError>;

/// Memory manager errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemoryError {
    /// Size argument cannot be satisfied (zero, or larger than a page)
    #[error("invalid size: {0} bytes")]
    InvalidSize(usize),

    /// Memory manager has not been initialized
    #[error("memory manager not initialized")]
    NotInitialized,

    /// Capacity exhausted and every resident page is pinned
    #[error("out of memory")]
    OutOfMemory,

    /// Access to a page that is not resident
    #[error("page fault: {0} is not resident")]
    PageFault(PageNumber),

    /// Access or page number outside the addressable range
    #[error("out of bounds: {page} offset {offset} length {len}")]
    OutOfBounds {
        page: PageNumber,
        offset: usize,
        len: usize,
    },

    /// Allocation of a page that is already resident
    #[error("{0} is already resident")]
    AlreadyResident(PageNumber),
}

/// Detail of a decoding failure
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFault {
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    #[error("truncated operands: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("register r{0} out of range")]
    InvalidRegister(u8),
}

/// Translation layer errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationError {
    /// The byte stream could not be decoded at `offset`
    #[error("decoding error at byte offset {offset}: {fault}")]
    DecodingError { offset: usize, fault: DecodeFault },
}

impl TranslationError {
    /// Byte offset of the offending instruction
    pub fn offset(&self) -> usize {
        match self {
            TranslationError::DecodingError { offset, .. } => *offset,
        }
    }
}

/// Execution engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CpuError {
    /// Execution attempted while the engine is powered off
    #[error("CPU not ready: powered off")]
    NotReady,

    /// Branch or entry target outside the current program
    #[error("invalid jump to {target} (program length {len})")]
    InvalidJump { target: usize, len: usize },

    /// Instruction pointer ran past the end of the program without a halt
    #[error("instruction pointer {ip} out of bounds (program length {len})")]
    IpOutOfBounds { ip: usize, len: usize },

    /// Fault propagated from the memory manager
    #[error("memory fault: {0}")]
    Memory(#[from] MemoryError),
}

/// Configuration validation errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("memory size must be non-zero")]
    ZeroMemory,

    #[error("resident page limit must be non-zero")]
    ZeroResidentPages,

    #[error("base quantum must be non-zero")]
    ZeroQuantum,

    #[error("aging threshold must be non-zero")]
    ZeroAgingThreshold,

    #[error("demotion threshold must be non-zero")]
    ZeroDemotionThreshold,
}

/// Scheduler bookkeeping errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("unknown process: {0}")]
    UnknownProcess(ProcessId),

    #[error("{pid}: cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        pid: ProcessId,
        from: ProcessState,
        to: ProcessState,
    },

    /// Ready queues disagree with the process table
    #[error("{pid}: queue bookkeeping inconsistent with state {state:?}")]
    Inconsistent { pid: ProcessId, state: ProcessState },
}

/// The boot step that failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootStepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Kernel orchestrator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Boot aborted; the kernel remains not-booted
    #[error("boot aborted during {phase:?}: {source}")]
    Boot {
        phase: StartupPhase,
        #[source]
        source: BootStepError,
    },

    /// Operation requires a booted kernel
    #[error("kernel is not booted")]
    NotBooted,

    /// Operation requires the kernel to be shut down
    #[error("kernel is booted")]
    Booted,

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
