//! VM Page - a resident page of simulated memory
//!
//! Pages are owned by the memory manager and never handed out; callers only
//! ever see copies of their bytes.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};
use crate::types::PageNumber;

// ============================================================================
// Constants
// ============================================================================

/// Page size (4KB)
pub const PAGE_SIZE: usize = 4096;

// ============================================================================
// Zones
// ============================================================================

/// Address space zone a page belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Zone {
    /// Kernel pages, implicitly pinned
    Kernel,
    /// User pages (the default zone)
    #[default]
    User,
    /// Device-mapped pages
    Device,
}

impl Zone {
    /// Whether pages in this zone can never be evicted
    pub const fn is_implicitly_pinned(self) -> bool {
        matches!(self, Zone::Kernel)
    }
}

// ============================================================================
// Page Flags
// ============================================================================

/// Page state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageFlags(u8);

impl PageFlags {
    /// Page was written since allocation
    pub const DIRTY: Self = Self(0x01);
    /// Page was explicitly pinned
    pub const PINNED: Self = Self(0x02);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

// ============================================================================
// Page
// ============================================================================

/// A resident page
#[derive(Debug)]
pub struct Page {
    number: PageNumber,
    zone: Zone,
    flags: PageFlags,
    /// Logical clock value of the most recent access
    last_access: u64,
    /// Size requested at allocation (informational; the full page is usable)
    requested: usize,
    data: Box<[u8]>,
}

impl Page {
    /// Create a zero-filled page
    pub fn new(number: PageNumber, zone: Zone, requested: usize, now: u64) -> Self {
        Self {
            number,
            zone,
            flags: PageFlags::empty(),
            last_access: now,
            requested,
            data: vec![0u8; PAGE_SIZE].into_boxed_slice(),
        }
    }

    pub fn number(&self) -> PageNumber {
        self.number
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.contains(PageFlags::DIRTY)
    }

    /// Pinned explicitly or by zone
    pub fn is_pinned(&self) -> bool {
        self.zone.is_implicitly_pinned() || self.flags.contains(PageFlags::PINNED)
    }

    pub fn pin(&mut self) {
        self.flags = self.flags.union(PageFlags::PINNED);
    }

    pub fn unpin(&mut self) {
        self.flags = self.flags.difference(PageFlags::PINNED);
    }

    /// Record an access at logical time `now`
    pub fn touch(&mut self, now: u64) {
        self.last_access = now;
    }

    /// Validate that `[offset, offset + len)` lies inside the page
    pub fn check_range(&self, offset: usize, len: usize) -> MemoryResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= PAGE_SIZE => Ok(()),
            _ => Err(MemoryError::OutOfBounds {
                page: self.number,
                offset,
                len,
            }),
        }
    }

    /// Copy `len` bytes out of the page
    pub fn read(&mut self, offset: usize, len: usize, now: u64) -> MemoryResult<Vec<u8>> {
        self.check_range(offset, len)?;
        self.touch(now);
        Ok(self.data[offset..offset + len].to_vec())
    }

    /// Copy `bytes` into the page and mark it dirty
    pub fn write(&mut self, offset: usize, bytes: &[u8], now: u64) -> MemoryResult<()> {
        self.check_range(offset, bytes.len())?;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.flags = self.flags.union(PageFlags::DIRTY);
        self.touch(now);
        Ok(())
    }

    /// Snapshot of the page's bookkeeping
    pub fn info(&self) -> PageInfo {
        PageInfo {
            number: self.number,
            zone: self.zone,
            dirty: self.is_dirty(),
            pinned: self.is_pinned(),
            last_access: self.last_access,
            requested: self.requested,
        }
    }
}

/// Read-only page description for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PageInfo {
    pub number: PageNumber,
    pub zone: Zone,
    pub dirty: bool,
    pub pinned: bool,
    pub last_access: u64,
    pub requested: usize,
}

/// Number of pages needed to hold `bytes`
pub const fn pages_for(bytes: usize) -> usize {
    bytes.div_ceil(PAGE_SIZE)
}
