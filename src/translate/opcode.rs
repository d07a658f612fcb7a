//! Binary opcode table
//!
//! ```text
//! 0x00        nop                              1 byte
//! 0x01        loadi rd, imm32                  6 bytes
//! 0x02        load  rd, page16, off16          6 bytes
//! 0x03        store rs, page16, off16          6 bytes
//! 0x10-0x15   add/sub/mul/and/or/xor rd ra rb  4 bytes
//! 0x20        jmp target32                     5 bytes
//! 0x21        beqz rs, target32                6 bytes
//! 0x22        bnez rs, target32                6 bytes
//! 0x30        wait                             1 byte
//! 0xff        halt                             1 byte
//! ```
//!
//! Multi-byte operands are little-endian.

use crate::cpu::AluOp;

pub const OP_NOP: u8 = 0x00;
pub const OP_LOADI: u8 = 0x01;
pub const OP_LOAD: u8 = 0x02;
pub const OP_STORE: u8 = 0x03;
pub const OP_ADD: u8 = 0x10;
pub const OP_SUB: u8 = 0x11;
pub const OP_MUL: u8 = 0x12;
pub const OP_AND: u8 = 0x13;
pub const OP_OR: u8 = 0x14;
pub const OP_XOR: u8 = 0x15;
pub const OP_JMP: u8 = 0x20;
pub const OP_BEQZ: u8 = 0x21;
pub const OP_BNEZ: u8 = 0x22;
pub const OP_WAIT: u8 = 0x30;
pub const OP_HALT: u8 = 0xff;

/// Encoded size of an instruction with this opcode, operands included
pub const fn encoded_len(opcode: u8) -> Option<usize> {
    match opcode {
        OP_NOP | OP_WAIT | OP_HALT => Some(1),
        OP_ADD..=OP_XOR => Some(4),
        OP_JMP => Some(5),
        OP_LOADI | OP_LOAD | OP_STORE | OP_BEQZ | OP_BNEZ => Some(6),
        _ => None,
    }
}

pub const fn alu_op(opcode: u8) -> Option<AluOp> {
    match opcode {
        OP_ADD => Some(AluOp::Add),
        OP_SUB => Some(AluOp::Sub),
        OP_MUL => Some(AluOp::Mul),
        OP_AND => Some(AluOp::And),
        OP_OR => Some(AluOp::Or),
        OP_XOR => Some(AluOp::Xor),
        _ => None,
    }
}

pub const fn alu_opcode(op: AluOp) -> u8 {
    match op {
        AluOp::Add => OP_ADD,
        AluOp::Sub => OP_SUB,
        AluOp::Mul => OP_MUL,
        AluOp::And => OP_AND,
        AluOp::Or => OP_OR,
        AluOp::Xor => OP_XOR,
    }
}
