//! Instruction set of the simulated processor
//!
//! A small closed set: data movement, three-register arithmetic, branches
//! on instruction indices, a wait hint and halt.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of general purpose registers
pub const NUM_REGISTERS: usize = 8;

/// A general purpose register index (r0 - r7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Register(u8);

impl Register {
    /// Register `index`, or `None` if it does not exist
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < NUM_REGISTERS {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Arithmetic and logic operations (all wrapping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
}

impl AluOp {
    pub const ALL: [AluOp; 6] = [
        AluOp::Add,
        AluOp::Sub,
        AluOp::Mul,
        AluOp::And,
        AluOp::Or,
        AluOp::Xor,
    ];

    /// Apply the operation
    pub const fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Mul => a.wrapping_mul(b),
            AluOp::And => a & b,
            AluOp::Or => a | b,
            AluOp::Xor => a ^ b,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Mul => "mul",
            AluOp::And => "and",
            AluOp::Or => "or",
            AluOp::Xor => "xor",
        }
    }
}

/// A decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Instruction {
    /// Do nothing
    Nop,
    /// rd = imm
    LoadImm { rd: Register, imm: u32 },
    /// rd = mem32[page:offset]
    Load { rd: Register, page: u16, offset: u16 },
    /// mem32[page:offset] = rs
    Store { rs: Register, page: u16, offset: u16 },
    /// rd = ra op rb
    Alu {
        op: AluOp,
        rd: Register,
        ra: Register,
        rb: Register,
    },
    /// Jump to instruction index
    Jump { target: u32 },
    /// Branch if rs == 0
    BranchZero { rs: Register, target: u32 },
    /// Branch if rs != 0
    BranchNonZero { rs: Register, target: u32 },
    /// Give up the processor and enter the waiting state
    Wait,
    /// Stop execution
    Halt,
}

impl Instruction {
    pub const fn is_halt(&self) -> bool {
        matches!(self, Instruction::Halt)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Nop => write!(f, "nop"),
            Instruction::LoadImm { rd, imm } => write!(f, "loadi {}, {:#x}", rd, imm),
            Instruction::Load { rd, page, offset } => {
                write!(f, "load {}, [{}:{:#x}]", rd, page, offset)
            }
            Instruction::Store { rs, page, offset } => {
                write!(f, "store {}, [{}:{:#x}]", rs, page, offset)
            }
            Instruction::Alu { op, rd, ra, rb } => {
                write!(f, "{} {}, {}, {}", op.mnemonic(), rd, ra, rb)
            }
            Instruction::Jump { target } => write!(f, "jmp {}", target),
            Instruction::BranchZero { rs, target } => write!(f, "beqz {}, {}", rs, target),
            Instruction::BranchNonZero { rs, target } => write!(f, "bnez {}, {}", rs, target),
            Instruction::Wait => write!(f, "wait"),
            Instruction::Halt => write!(f, "halt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_register_range() {
        assert_eq!(Register::new(7).map(Register::index), Some(7));
        assert_eq!(Register::new(8), None);
    }

    #[test]
    fn test_alu_wraps() {
        assert_eq!(AluOp::Add.apply(u32::MAX, 1), 0);
        assert_eq!(AluOp::Sub.apply(0, 1), u32::MAX);
        assert_eq!(AluOp::Mul.apply(0x8000_0000, 2), 0);
        assert_eq!(AluOp::Xor.apply(0b1100, 0b1010), 0b0110);
    }

    #[test]
    fn test_display() {
        let r1 = Register::new(1).unwrap();
        let r2 = Register::new(2).unwrap();
        let add = Instruction::Alu {
            op: AluOp::Add,
            rd: r1,
            ra: r1,
            rb: r2,
        };
        assert_eq!(add.to_string(), "add r1, r1, r2");
        assert_eq!(Instruction::BranchZero { rs: r2, target: 4 }.to_string(), "beqz r2, 4");
    }
}
