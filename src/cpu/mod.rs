//! Simulated processor: instruction set, programs and the execution engine

pub mod engine;
pub mod instruction;
pub mod program;

pub use engine::{Cpu, CpuContext, CpuStatus, ExecutionResult, RunOutcome};
pub use instruction::{AluOp, Instruction, Register, NUM_REGISTERS};
pub use program::Program;
