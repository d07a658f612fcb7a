//! Kernel configuration
//!
//! Tunables for the memory manager, execution budget and scheduler. The
//! defaults describe a 1 MiB machine running round-robin scheduling.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sched::PolicyKind;

/// Default address space size (1 MiB)
pub const DEFAULT_MEMORY_SIZE: usize = 1024 * 1024;

/// Default instructions per slice at the highest level
pub const DEFAULT_BASE_QUANTUM: u32 = 64;

/// Default ticks a ready process may wait before it is promoted
pub const DEFAULT_AGING_THRESHOLD: u64 = 8;

/// Default consecutive slice expirations before demotion
pub const DEFAULT_DEMOTION_THRESHOLD: u32 = 3;

/// Machine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KernelConfig {
    /// Address space size in bytes
    pub memory_size: usize,
    /// Resident frame limit; `None` means every page may be resident
    pub resident_pages: Option<usize>,
    /// Scheduling policy selected at construction
    pub policy: PolicyKind,
    /// Instructions per slice at level 0
    pub base_quantum: u32,
    /// Ticks before a waiting ready process is promoted (aging policy)
    pub aging_threshold: u64,
    /// Consecutive slice expirations before demotion (aging policy)
    pub demotion_threshold: u32,
}

impl KernelConfig {
    pub const fn new() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            resident_pages: None,
            policy: PolicyKind::RoundRobin,
            base_quantum: DEFAULT_BASE_QUANTUM,
            aging_threshold: DEFAULT_AGING_THRESHOLD,
            demotion_threshold: DEFAULT_DEMOTION_THRESHOLD,
        }
    }

    pub fn with_memory_size(mut self, bytes: usize) -> Self {
        self.memory_size = bytes;
        self
    }

    pub fn with_resident_pages(mut self, pages: usize) -> Self {
        self.resident_pages = Some(pages);
        self
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_base_quantum(mut self, quantum: u32) -> Self {
        self.base_quantum = quantum;
        self
    }

    pub fn with_aging_threshold(mut self, ticks: u64) -> Self {
        self.aging_threshold = ticks;
        self
    }

    pub fn with_demotion_threshold(mut self, expirations: u32) -> Self {
        self.demotion_threshold = expirations;
        self
    }

    /// Check that every tunable is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_size == 0 {
            return Err(ConfigError::ZeroMemory);
        }
        if self.resident_pages == Some(0) {
            return Err(ConfigError::ZeroResidentPages);
        }
        if self.base_quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.aging_threshold == 0 {
            return Err(ConfigError::ZeroAgingThreshold);
        }
        if self.demotion_threshold == 0 {
            return Err(ConfigError::ZeroDemotionThreshold);
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = KernelConfig::default();
        assert_eq!(config.memory_size, DEFAULT_MEMORY_SIZE);
        assert_eq!(config.policy, PolicyKind::RoundRobin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = KernelConfig::new()
            .with_memory_size(8192)
            .with_resident_pages(1)
            .with_policy(PolicyKind::ShortestJobFirst)
            .with_base_quantum(4);
        assert_eq!(config.memory_size, 8192);
        assert_eq!(config.resident_pages, Some(1));
        assert_eq!(config.policy, PolicyKind::ShortestJobFirst);
        assert_eq!(config.base_quantum, 4);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let base = KernelConfig::new();
        assert_eq!(base.with_memory_size(0).validate(), Err(ConfigError::ZeroMemory));
        assert_eq!(
            base.with_resident_pages(0).validate(),
            Err(ConfigError::ZeroResidentPages)
        );
        assert_eq!(base.with_base_quantum(0).validate(), Err(ConfigError::ZeroQuantum));
        assert_eq!(
            base.with_aging_threshold(0).validate(),
            Err(ConfigError::ZeroAgingThreshold)
        );
        assert_eq!(
            base.with_demotion_threshold(0).validate(),
            Err(ConfigError::ZeroDemotionThreshold)
        );
    }
}
