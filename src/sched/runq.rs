//! Ready Queues
//!
//! One FIFO queue per priority level. The queues only hold process ids;
//! the process table is the source of truth for everything else.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::sched::priority::{Priority, NUM_LEVELS};
use crate::types::ProcessId;

/// Queue of ready processes at a single level
#[derive(Debug, Default, Clone)]
pub struct LevelQueue {
    pids: VecDeque<ProcessId>,
}

impl LevelQueue {
    pub const fn new() -> Self {
        Self {
            pids: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn front(&self) -> Option<ProcessId> {
        self.pids.front().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.pids.iter().copied()
    }

    fn remove(&mut self, pid: ProcessId) -> bool {
        match self.pids.iter().position(|&p| p == pid) {
            Some(pos) => self.pids.remove(pos).is_some(),
            None => false,
        }
    }
}

/// Multi-level ready queues (level 0 first)
#[derive(Debug, Default, Clone)]
pub struct ReadyQueues {
    levels: [LevelQueue; NUM_LEVELS],
}

impl ReadyQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail of `priority`'s queue
    pub fn push_back(&mut self, priority: Priority, pid: ProcessId) {
        self.levels[priority.queue_index()].pids.push_back(pid);
    }

    /// Put back at the head of `priority`'s queue
    pub fn push_front(&mut self, priority: Priority, pid: ProcessId) {
        self.levels[priority.queue_index()].pids.push_front(pid);
    }

    /// Remove `pid` wherever it is queued, returning its level
    pub fn remove(&mut self, pid: ProcessId) -> Option<Priority> {
        self.levels
            .iter_mut()
            .position(|level| level.remove(pid))
            .map(|index| Priority::new(index as u8))
    }

    pub fn level(&self, priority: Priority) -> &LevelQueue {
        &self.levels[priority.queue_index()]
    }

    /// Highest non-empty level
    pub fn highest_nonempty(&self) -> Option<Priority> {
        self.levels
            .iter()
            .position(|level| !level.is_empty())
            .map(|index| Priority::new(index as u8))
    }

    /// Head of the highest non-empty level
    pub fn peek_highest(&self) -> Option<ProcessId> {
        self.highest_nonempty()
            .and_then(|priority| self.level(priority).front())
    }

    /// Every queued process with its level, highest level first, FIFO within
    pub fn iter(&self) -> impl Iterator<Item = (Priority, ProcessId)> + '_ {
        self.levels.iter().enumerate().flat_map(|(index, level)| {
            let priority = Priority::new(index as u8);
            level.iter().map(move |pid| (priority, pid))
        })
    }

    /// Number of times `pid` is queued (0 or 1 when consistent)
    pub fn occurrences(&self, pid: ProcessId) -> usize {
        self.iter().filter(|&(_, p)| p == pid).count()
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(LevelQueue::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(LevelQueue::is_empty)
    }

    /// Queue lengths per level
    pub fn lengths(&self) -> Vec<usize> {
        self.levels.iter().map(LevelQueue::len).collect()
    }
}
