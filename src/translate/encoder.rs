//! Instruction encoder, the inverse of the decoder

use alloc::vec::Vec;

use crate::cpu::Instruction;
use crate::translate::opcode::*;

/// Append the byte form of `instruction` to `out`
pub fn encode_into(instruction: &Instruction, out: &mut Vec<u8>) {
    match *instruction {
        Instruction::Nop => out.push(OP_NOP),
        Instruction::Wait => out.push(OP_WAIT),
        Instruction::Halt => out.push(OP_HALT),
        Instruction::LoadImm { rd, imm } => {
            out.extend_from_slice(&[OP_LOADI, rd.raw()]);
            out.extend_from_slice(&imm.to_le_bytes());
        }
        Instruction::Load { rd, page, offset } => {
            out.extend_from_slice(&[OP_LOAD, rd.raw()]);
            out.extend_from_slice(&page.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
        }
        Instruction::Store { rs, page, offset } => {
            out.extend_from_slice(&[OP_STORE, rs.raw()]);
            out.extend_from_slice(&page.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
        }
        Instruction::Alu { op, rd, ra, rb } => {
            out.extend_from_slice(&[alu_opcode(op), rd.raw(), ra.raw(), rb.raw()]);
        }
        Instruction::Jump { target } => {
            out.push(OP_JMP);
            out.extend_from_slice(&target.to_le_bytes());
        }
        Instruction::BranchZero { rs, target } => {
            out.extend_from_slice(&[OP_BEQZ, rs.raw()]);
            out.extend_from_slice(&target.to_le_bytes());
        }
        Instruction::BranchNonZero { rs, target } => {
            out.extend_from_slice(&[OP_BNEZ, rs.raw()]);
            out.extend_from_slice(&target.to_le_bytes());
        }
    }
}

/// Encode a sequence of instructions
pub fn encode(instructions: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::with_capacity(instructions.len() * 2);
    for instruction in instructions {
        encode_into(instruction, &mut out);
    }
    out
}
