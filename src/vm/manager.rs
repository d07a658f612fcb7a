//! Memory Manager - paged address space with LRU eviction
//!
//! All state sits behind a single lock so the execution path and telemetry
//! readers see a consistent view. Access times come from a logical clock that
//! advances on every successful access, which keeps eviction deterministic.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use spin::Mutex;

use crate::error::{MemoryError, MemoryResult};
use crate::types::PageNumber;
use crate::vm::page::{pages_for, Page, PageInfo, Zone, PAGE_SIZE};

/// Address space state guarded by the manager's lock
#[derive(Debug, Default)]
struct AddressSpace {
    /// Resident pages, keyed by page number
    pages: BTreeMap<PageNumber, Page>,
    /// Page numbers in the address space
    total_pages: usize,
    /// Maximum resident pages
    capacity: usize,
    initialized: bool,
    clock: u64,
    evictions: u64,
    writebacks: u64,
    faults: u64,
}

impl AddressSpace {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn ensure_initialized(&self) -> MemoryResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(MemoryError::NotInitialized)
        }
    }

    /// Resident page for an access, counting misses as faults
    fn resident(&mut self, page: PageNumber) -> MemoryResult<&mut Page> {
        self.ensure_initialized()?;
        if !self.pages.contains_key(&page) {
            self.faults += 1;
            return Err(MemoryError::PageFault(page));
        }
        self.pages.get_mut(&page).ok_or(MemoryError::PageFault(page))
    }

    /// Least recently used unpinned page
    fn select_victim(&self) -> Option<PageNumber> {
        self.pages
            .values()
            .filter(|p| !p.is_pinned())
            .min_by_key(|p| p.last_access())
            .map(|p| p.number())
    }

    fn evict(&mut self, victim: PageNumber) {
        if let Some(page) = self.pages.remove(&victim) {
            self.evictions += 1;
            if page.is_dirty() {
                // No backing store: dirty contents are discarded
                self.writebacks += 1;
            }
            log::debug!(
                "evicted {} ({:?}, dirty={}, last access {})",
                victim,
                page.zone(),
                page.is_dirty(),
                page.last_access()
            );
        }
    }
}

/// Memory usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryStats {
    pub total_pages: usize,
    pub capacity: usize,
    pub resident: usize,
    pub kernel_pages: usize,
    pub user_pages: usize,
    pub device_pages: usize,
    pub dirty_pages: usize,
    pub pinned_pages: usize,
    pub evictions: u64,
    pub writebacks: u64,
    pub faults: u64,
}

impl MemoryStats {
    /// Resident pages as a percentage of capacity
    pub fn usage_percent(&self) -> u32 {
        if self.capacity == 0 {
            0
        } else {
            ((self.resident * 100) / self.capacity) as u32
        }
    }
}

/// Paged memory manager
#[derive(Debug, Default)]
pub struct MemoryManager {
    inner: Mutex<AddressSpace>,
}

impl MemoryManager {
    /// Create an uninitialized manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the address space to `total_size` bytes, every page resident-capable
    pub fn initialize(&self, total_size: usize) -> MemoryResult<()> {
        self.reset(total_size, None)
    }

    /// Reset the address space with at most `resident_pages` pages resident
    pub fn initialize_with_capacity(
        &self,
        total_size: usize,
        resident_pages: usize,
    ) -> MemoryResult<()> {
        self.reset(total_size, Some(resident_pages))
    }

    fn reset(&self, total_size: usize, resident_pages: Option<usize>) -> MemoryResult<()> {
        if total_size == 0 {
            return Err(MemoryError::InvalidSize(total_size));
        }
        if resident_pages == Some(0) {
            return Err(MemoryError::InvalidSize(0));
        }
        let total_pages = pages_for(total_size);
        let capacity = resident_pages.map_or(total_pages, |n| n.min(total_pages));

        let mut space = self.inner.lock();
        *space = AddressSpace {
            total_pages,
            capacity,
            initialized: true,
            ..AddressSpace::default()
        };
        log::info!(
            "memory initialized: {} pages, {} resident frames",
            total_pages,
            capacity
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Reserve `page` in the user zone
    pub fn allocate(&self, page: PageNumber, size: usize) -> MemoryResult<()> {
        self.allocate_in(page, size, Zone::User)
    }

    /// Reserve `page` in `zone`, evicting the LRU unpinned page under pressure
    pub fn allocate_in(&self, page: PageNumber, size: usize, zone: Zone) -> MemoryResult<()> {
        let mut space = self.inner.lock();
        space.ensure_initialized()?;

        if size > PAGE_SIZE {
            return Err(MemoryError::InvalidSize(size));
        }
        if page.0 as usize >= space.total_pages {
            return Err(MemoryError::OutOfBounds {
                page,
                offset: 0,
                len: size,
            });
        }
        if space.pages.contains_key(&page) {
            return Err(MemoryError::AlreadyResident(page));
        }

        if space.pages.len() >= space.capacity {
            let victim = space.select_victim().ok_or_else(|| {
                log::warn!("allocation of {} failed: all resident pages pinned", page);
                MemoryError::OutOfMemory
            })?;
            space.evict(victim);
        }

        let now = space.tick();
        space.pages.insert(page, Page::new(page, zone, size, now));
        log::trace!("allocated {} in {:?} zone ({} bytes)", page, zone, size);
        Ok(())
    }

    /// Release a resident page
    pub fn free(&self, page: PageNumber) -> MemoryResult<()> {
        let mut space = self.inner.lock();
        space.resident(page)?;
        space.pages.remove(&page);
        Ok(())
    }

    /// Copy `bytes` into `page` at `offset`
    pub fn write(&self, page: PageNumber, offset: usize, bytes: &[u8]) -> MemoryResult<()> {
        let mut space = self.inner.lock();
        let now = space.clock + 1;
        space.resident(page)?.write(offset, bytes, now)?;
        space.clock = now;
        Ok(())
    }

    /// Copy `len` bytes out of `page` at `offset`
    pub fn read(&self, page: PageNumber, offset: usize, len: usize) -> MemoryResult<Vec<u8>> {
        let mut space = self.inner.lock();
        let now = space.clock + 1;
        let bytes = space.resident(page)?.read(offset, len, now)?;
        space.clock = now;
        Ok(bytes)
    }

    /// Read a little-endian word
    pub fn read_u32(&self, page: PageNumber, offset: usize) -> MemoryResult<u32> {
        let bytes = self.read(page, offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Write a little-endian word
    pub fn write_u32(&self, page: PageNumber, offset: usize, value: u32) -> MemoryResult<()> {
        self.write(page, offset, &value.to_le_bytes())
    }

    /// Exclude a resident page from eviction
    pub fn pin(&self, page: PageNumber) -> MemoryResult<()> {
        self.inner.lock().resident(page)?.pin();
        Ok(())
    }

    /// Make an explicitly pinned page evictable again (kernel pages stay pinned)
    pub fn unpin(&self, page: PageNumber) -> MemoryResult<()> {
        self.inner.lock().resident(page)?.unpin();
        Ok(())
    }

    pub fn is_resident(&self, page: PageNumber) -> bool {
        self.inner.lock().pages.contains_key(&page)
    }

    pub fn zone_of(&self, page: PageNumber) -> Option<Zone> {
        self.inner.lock().pages.get(&page).map(|p| p.zone())
    }

    pub fn is_dirty(&self, page: PageNumber) -> MemoryResult<bool> {
        Ok(self.inner.lock().resident(page)?.is_dirty())
    }

    /// Bookkeeping snapshot for one page, without counting as an access
    pub fn page_info(&self, page: PageNumber) -> Option<PageInfo> {
        self.inner.lock().pages.get(&page).map(|p| p.info())
    }

    /// Bookkeeping snapshots for every resident page, by page number
    pub fn list_pages(&self) -> Vec<PageInfo> {
        self.inner.lock().pages.values().map(|p| p.info()).collect()
    }

    /// Usage statistics
    pub fn stats(&self) -> MemoryStats {
        let space = self.inner.lock();
        let mut stats = MemoryStats {
            total_pages: space.total_pages,
            capacity: space.capacity,
            resident: space.pages.len(),
            evictions: space.evictions,
            writebacks: space.writebacks,
            faults: space.faults,
            ..MemoryStats::default()
        };
        for page in space.pages.values() {
            match page.zone() {
                Zone::Kernel => stats.kernel_pages += 1,
                Zone::User => stats.user_pages += 1,
                Zone::Device => stats.device_pages += 1,
            }
            if page.is_dirty() {
                stats.dirty_pages += 1;
            }
            if page.is_pinned() {
                stats.pinned_pages += 1;
            }
        }
        stats
    }
}
