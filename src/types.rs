//! Common types used across the machine core
//!
//! This module defines shared identifier types to avoid circular dependencies
//! between the memory, execution and scheduling subsystems.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Process identifier
///
/// Allocated by the scheduler on submission, starting at 1. Identifiers are
/// never reused within one scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProcessId(pub u64);

impl ProcessId {
    /// Raw numeric value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// The identifier that follows this one
    pub(crate) const fn next(self) -> Self {
        ProcessId(self.0 + 1)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// Page number within the simulated address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PageNumber(pub u32);

impl PageNumber {
    /// Raw numeric value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for PageNumber {
    fn from(value: u32) -> Self {
        PageNumber(value)
    }
}

impl From<u16> for PageNumber {
    fn from(value: u16) -> Self {
        PageNumber(value as u32)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_process_id_sequence() {
        let first = ProcessId(1);
        assert_eq!(first.next(), ProcessId(2));
        assert_eq!(first.raw(), 1);
        assert_eq!(first.to_string(), "pid 1");
    }

    #[test]
    fn test_page_number_conversions() {
        assert_eq!(PageNumber::from(7u16), PageNumber(7));
        assert_eq!(PageNumber::from(9u32).raw(), 9);
        assert!(PageNumber(1) < PageNumber(2));
    }
}
