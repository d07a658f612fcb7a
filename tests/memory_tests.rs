//! Memory manager integration tests

use radiate_core::error::MemoryError;
use radiate_core::{MemoryManager, PageNumber, Zone, PAGE_SIZE};

fn manager(pages: usize, frames: usize) -> MemoryManager {
    let mm = MemoryManager::new();
    mm.initialize_with_capacity(pages * PAGE_SIZE, frames)
        .expect("initialize");
    mm
}

#[test]
fn write_then_read_returns_written_bytes() {
    let mm = manager(16, 16);
    mm.allocate(PageNumber(3), PAGE_SIZE).unwrap();
    let data: Vec<u8> = (0..=255).collect();
    mm.write(PageNumber(3), 1000, &data).unwrap();
    assert_eq!(mm.read(PageNumber(3), 1000, data.len()).unwrap(), data);
}

#[test]
fn read_is_exact_length_and_does_not_dirty() {
    let mm = manager(4, 4);
    mm.allocate(PageNumber(0), 16).unwrap();
    assert_eq!(mm.read(PageNumber(0), 0, 7).unwrap().len(), 7);
    assert_eq!(mm.read(PageNumber(0), 0, 0).unwrap(), Vec::<u8>::new());
    assert!(!mm.is_dirty(PageNumber(0)).unwrap());
}

#[test]
fn access_past_page_end_is_out_of_bounds() {
    let mm = manager(4, 4);
    mm.allocate(PageNumber(1), 16).unwrap();
    assert_eq!(
        mm.write(PageNumber(1), PAGE_SIZE - 1, &[1, 2]),
        Err(MemoryError::OutOfBounds {
            page: PageNumber(1),
            offset: PAGE_SIZE - 1,
            len: 2
        })
    );
    assert!(matches!(
        mm.read(PageNumber(1), PAGE_SIZE, 1),
        Err(MemoryError::OutOfBounds { .. })
    ));
    // The failed write left nothing behind
    assert!(!mm.is_dirty(PageNumber(1)).unwrap());
}

#[test]
fn full_and_pinned_is_out_of_memory() {
    let mm = manager(8, 2);
    mm.allocate(PageNumber(0), 8).unwrap();
    mm.allocate(PageNumber(1), 8).unwrap();
    mm.pin(PageNumber(0)).unwrap();
    mm.pin(PageNumber(1)).unwrap();
    assert_eq!(mm.allocate(PageNumber(2), 8), Err(MemoryError::OutOfMemory));
    assert_eq!(mm.stats().resident, 2);
}

#[test]
fn kernel_pages_are_never_evicted() {
    let mm = manager(8, 2);
    mm.allocate_in(PageNumber(0), 8, Zone::Kernel).unwrap();
    mm.allocate_in(PageNumber(1), 8, Zone::Kernel).unwrap();
    assert_eq!(mm.allocate(PageNumber(2), 8), Err(MemoryError::OutOfMemory));
    mm.unpin(PageNumber(0)).unwrap();
    assert_eq!(mm.allocate(PageNumber(2), 8), Err(MemoryError::OutOfMemory));
}

#[test]
fn eviction_takes_least_recently_used_unpinned_page() {
    let mm = manager(8, 3);
    for page in 0..3 {
        mm.allocate(PageNumber(page), 8).unwrap();
    }
    // Access order now: 1, 2, 0 (0 most recent)
    mm.read(PageNumber(1), 0, 1).unwrap();
    mm.write(PageNumber(2), 0, &[1]).unwrap();
    mm.read(PageNumber(0), 0, 1).unwrap();

    mm.allocate(PageNumber(5), 8).unwrap();
    assert!(!mm.is_resident(PageNumber(1)));
    assert_eq!(
        mm.write(PageNumber(1), 0, &[9]),
        Err(MemoryError::PageFault(PageNumber(1)))
    );

    mm.allocate(PageNumber(6), 8).unwrap();
    assert!(!mm.is_resident(PageNumber(2)));
    let stats = mm.stats();
    assert_eq!(stats.evictions, 2);
    assert_eq!(stats.writebacks, 1);
    assert_eq!(stats.resident, 3);
}

#[test]
fn resident_pages_never_exceed_capacity() {
    let mm = manager(64, 5);
    for page in 0..64 {
        mm.allocate(PageNumber(page), 8).unwrap();
        assert!(mm.stats().resident <= 5);
    }
    assert_eq!(mm.stats().evictions, 59);
}

#[test]
fn page_outside_address_space() {
    let mm = manager(2, 2);
    assert!(matches!(
        mm.allocate(PageNumber(2), 8),
        Err(MemoryError::OutOfBounds { .. })
    ));
    assert_eq!(
        mm.read(PageNumber(1000), 0, 1),
        Err(MemoryError::PageFault(PageNumber(1000)))
    );
}

#[test]
fn reinitialize_discards_everything() {
    let mm = manager(4, 4);
    mm.allocate(PageNumber(0), 8).unwrap();
    mm.write(PageNumber(0), 0, &[1]).unwrap();
    mm.initialize(2 * PAGE_SIZE).unwrap();
    let stats = mm.stats();
    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.resident, 0);
    assert_eq!(stats.faults, 0);
}
