//! CPU Execution Engine
//!
//! Executes a [`Program`] one instruction at a time against a register file
//! and the memory manager. A run can be bounded by an instruction budget and
//! later resumed from its saved [`CpuContext`], which is how the scheduler
//! time-slices processes.
//!
//! Exclusive access (`&mut self`) guarantees a single run in flight per
//! engine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cpu::instruction::{Instruction, Register, NUM_REGISTERS};
use crate::cpu::program::Program;
use crate::error::{CpuError, CpuResult};
use crate::types::PageNumber;
use crate::vm::MemoryManager;

/// Saved execution state of one program
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CpuContext {
    ip: usize,
    regs: [u32; NUM_REGISTERS],
    /// Instructions retired over the context's lifetime
    retired: u64,
    started: bool,
}

impl CpuContext {
    /// Fresh context; the instruction pointer is set from the program's
    /// entry offset on the first run
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn retired(&self) -> u64 {
        self.retired
    }

    pub fn register(&self, reg: Register) -> u32 {
        self.regs[reg.index()]
    }

    pub fn registers(&self) -> &[u32; NUM_REGISTERS] {
        &self.regs
    }

    /// Whether execution has begun
    pub fn is_started(&self) -> bool {
        self.started
    }

    fn set(&mut self, reg: Register, value: u32) {
        self.regs[reg.index()] = value;
    }
}

/// Why a run stopped without faulting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunOutcome {
    /// A halt instruction was reached
    Halted,
    /// The instruction budget ran out
    SliceExpired,
    /// The program executed a wait
    Waiting,
}

/// Result of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExecutionResult {
    pub outcome: RunOutcome,
    /// Instructions retired during this run
    pub retired: u64,
}

/// Engine telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CpuStatus {
    pub powered: bool,
    pub retired_total: u64,
    pub runs: u64,
    pub faults: u64,
}

/// The simulated processor
#[derive(Debug, Default)]
pub struct Cpu {
    powered: bool,
    retired_total: u64,
    runs: u64,
    faults: u64,
}

impl Cpu {
    /// Create a powered-off engine
    pub fn new() -> Self {
        Self::default()
    }

    pub fn power_on(&mut self) {
        if !self.powered {
            self.powered = true;
            log::info!("cpu powered on");
        }
    }

    pub fn power_off(&mut self) {
        if self.powered {
            self.powered = false;
            log::info!("cpu powered off");
        }
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn status(&self) -> CpuStatus {
        CpuStatus {
            powered: self.powered,
            retired_total: self.retired_total,
            runs: self.runs,
            faults: self.faults,
        }
    }

    /// Run `program` from its entry offset until it halts or waits
    pub fn execute(
        &mut self,
        program: &Program,
        memory: &MemoryManager,
    ) -> CpuResult<ExecutionResult> {
        let mut context = CpuContext::new();
        self.run(program, memory, &mut context, None)
    }

    /// Resume `context` for at most `budget` instructions
    ///
    /// On a fault the context keeps the faulting instruction pointer and the
    /// instructions retired before it.
    pub fn run(
        &mut self,
        program: &Program,
        memory: &MemoryManager,
        context: &mut CpuContext,
        budget: Option<u64>,
    ) -> CpuResult<ExecutionResult> {
        if !self.powered {
            return Err(CpuError::NotReady);
        }

        self.runs += 1;
        let before = context.retired;
        let result = Self::step_until_stop(program, memory, context, budget);
        let retired = context.retired - before;
        self.retired_total += retired;

        match result {
            Ok(outcome) => Ok(ExecutionResult { outcome, retired }),
            Err(err) => {
                self.faults += 1;
                log::debug!("cpu fault at ip {}: {}", context.ip, err);
                Err(err)
            }
        }
    }

    fn step_until_stop(
        program: &Program,
        memory: &MemoryManager,
        ctx: &mut CpuContext,
        budget: Option<u64>,
    ) -> CpuResult<RunOutcome> {
        let len = program.len();
        if !ctx.started {
            let entry = program.entry();
            if entry >= len {
                return Err(CpuError::InvalidJump { target: entry, len });
            }
            ctx.ip = entry;
            ctx.started = true;
        }

        let mut executed: u64 = 0;
        loop {
            if budget.is_some_and(|limit| executed >= limit) {
                return Ok(RunOutcome::SliceExpired);
            }

            let ip = ctx.ip;
            let instruction = *program
                .get(ip)
                .ok_or(CpuError::IpOutOfBounds { ip, len })?;

            let mut next = ip + 1;
            match instruction {
                Instruction::Halt => return Ok(RunOutcome::Halted),
                Instruction::Nop => {}
                Instruction::LoadImm { rd, imm } => ctx.set(rd, imm),
                Instruction::Load { rd, page, offset } => {
                    let value = memory.read_u32(PageNumber::from(page), offset as usize)?;
                    ctx.set(rd, value);
                }
                Instruction::Store { rs, page, offset } => {
                    memory.write_u32(PageNumber::from(page), offset as usize, ctx.register(rs))?;
                }
                Instruction::Alu { op, rd, ra, rb } => {
                    let value = op.apply(ctx.register(ra), ctx.register(rb));
                    ctx.set(rd, value);
                }
                Instruction::Jump { target } => next = branch_target(target, len)?,
                Instruction::BranchZero { rs, target } => {
                    if ctx.register(rs) == 0 {
                        next = branch_target(target, len)?;
                    }
                }
                Instruction::BranchNonZero { rs, target } => {
                    if ctx.register(rs) != 0 {
                        next = branch_target(target, len)?;
                    }
                }
                Instruction::Wait => {
                    ctx.ip = next;
                    ctx.retired += 1;
                    return Ok(RunOutcome::Waiting);
                }
            }

            ctx.ip = next;
            ctx.retired += 1;
            executed += 1;
        }
    }
}

fn branch_target(target: u32, len: usize) -> CpuResult<usize> {
    let target = target as usize;
    if target < len {
        Ok(target)
    } else {
        Err(CpuError::InvalidJump { target, len })
    }
}
