//! Virtual memory: pages and the memory manager that owns them

pub mod manager;
pub mod page;

pub use manager::{MemoryManager, MemoryStats};
pub use page::{Page, PageInfo, Zone, PAGE_SIZE};
