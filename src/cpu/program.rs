//! Translated programs
//!
//! A program is immutable once built. Cloning shares the instruction
//! storage, so one translation can back any number of processes.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::cpu::instruction::Instruction;

/// An immutable instruction sequence with an entry offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Arc<[Instruction]>,
    entry: usize,
}

impl Program {
    /// Build a program that starts at instruction 0
    ///
    /// No halt is appended here; the translator guarantees a trailing halt
    /// for decoded programs.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions: instructions.into(),
            entry: 0,
        }
    }

    /// Same instructions, different entry offset
    ///
    /// The offset is validated when the program is executed.
    pub fn with_entry(mut self, entry: usize) -> Self {
        self.entry = entry;
        self
    }

    pub fn entry(&self) -> usize {
        self.entry
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}
