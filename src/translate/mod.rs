//! Translation Layer
//!
//! Turns an external byte stream into a validated [`Program`]. Translation is
//! pure: it holds no state, and the same bytes always produce the same
//! program. Any undecodable instruction rejects the whole stream.

use alloc::vec::Vec;

use crate::cpu::{Instruction, Program};
use crate::error::TranslationError;

pub mod decoder;
pub mod encoder;
pub mod opcode;

pub use decoder::decode;
pub use encoder::encode;

/// Translate `binary` into a program starting at instruction 0
///
/// A halt is appended when the stream does not already end with one, so an
/// empty stream becomes a single halt.
pub fn translate(binary: &[u8]) -> Result<Program, TranslationError> {
    let mut instructions = Vec::new();
    let mut offset = 0;

    while offset < binary.len() {
        let (instruction, size) = decode(&binary[offset..])
            .map_err(|fault| TranslationError::DecodingError { offset, fault })?;
        instructions.push(instruction);
        offset += size;
    }

    if !instructions.last().is_some_and(Instruction::is_halt) {
        instructions.push(Instruction::Halt);
    }

    log::trace!(
        "translated {} bytes into {} instructions",
        binary.len(),
        instructions.len()
    );
    Ok(Program::new(instructions))
}
