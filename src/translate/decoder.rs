//! Byte stream decoder

use crate::cpu::{Instruction, Register};
use crate::error::DecodeFault;
use crate::translate::opcode::*;

/// Decode the instruction at the start of `bytes`
///
/// Returns the instruction and the number of bytes it occupies.
pub fn decode(bytes: &[u8]) -> Result<(Instruction, usize), DecodeFault> {
    let opcode = *bytes.first().ok_or(DecodeFault::Truncated {
        needed: 1,
        available: 0,
    })?;
    let size = encoded_len(opcode).ok_or(DecodeFault::UnknownOpcode(opcode))?;
    if bytes.len() < size {
        return Err(DecodeFault::Truncated {
            needed: size,
            available: bytes.len(),
        });
    }
    let operands = Operands(&bytes[1..size]);

    let instruction = match opcode {
        OP_NOP => Instruction::Nop,
        OP_WAIT => Instruction::Wait,
        OP_HALT => Instruction::Halt,
        OP_LOADI => Instruction::LoadImm {
            rd: operands.register(0)?,
            imm: operands.u32_at(1),
        },
        OP_LOAD => Instruction::Load {
            rd: operands.register(0)?,
            page: operands.u16_at(1),
            offset: operands.u16_at(3),
        },
        OP_STORE => Instruction::Store {
            rs: operands.register(0)?,
            page: operands.u16_at(1),
            offset: operands.u16_at(3),
        },
        OP_JMP => Instruction::Jump {
            target: operands.u32_at(0),
        },
        OP_BEQZ => Instruction::BranchZero {
            rs: operands.register(0)?,
            target: operands.u32_at(1),
        },
        OP_BNEZ => Instruction::BranchNonZero {
            rs: operands.register(0)?,
            target: operands.u32_at(1),
        },
        _ => {
            let op = alu_op(opcode).ok_or(DecodeFault::UnknownOpcode(opcode))?;
            Instruction::Alu {
                op,
                rd: operands.register(0)?,
                ra: operands.register(1)?,
                rb: operands.register(2)?,
            }
        }
    };
    Ok((instruction, size))
}

/// Operand bytes of one instruction, already length checked
struct Operands<'a>(&'a [u8]);

impl Operands<'_> {
    fn register(&self, at: usize) -> Result<Register, DecodeFault> {
        let raw = self.0[at];
        Register::new(raw).ok_or(DecodeFault::InvalidRegister(raw))
    }

    fn u16_at(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.0[at], self.0[at + 1]])
    }

    fn u32_at(&self, at: usize) -> u32 {
        u32::from_le_bytes([self.0[at], self.0[at + 1], self.0[at + 2], self.0[at + 3]])
    }
}
