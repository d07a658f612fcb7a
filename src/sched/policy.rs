//! Scheduling Policies
//!
//! Each policy decides three things: which ready process runs next, how
//! many instructions it may retire before its slice expires, and what
//! happens to its level afterwards. The scheduler owns the queues and the
//! process table and applies the policy's decisions.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{
    KernelConfig, DEFAULT_AGING_THRESHOLD, DEFAULT_BASE_QUANTUM, DEFAULT_DEMOTION_THRESHOLD,
};
use crate::sched::priority::Priority;
use crate::sched::process::Process;
use crate::sched::runq::ReadyQueues;
use crate::types::ProcessId;

/// Process table keyed by pid
pub type ProcessTable = BTreeMap<ProcessId, Process>;

/// Available policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PolicyKind {
    /// Fixed slice per level, FIFO within a level
    #[default]
    RoundRobin,
    /// Highest level first, with promotion on aging and demotion on repeated expiry
    PriorityAging,
    /// Shortest estimated remaining instruction count first
    ShortestJobFirst,
    /// Reserved level 0 keeps the CPU ahead of everything else until it halts or waits
    RealTime,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::RoundRobin,
        PolicyKind::PriorityAging,
        PolicyKind::ShortestJobFirst,
        PolicyKind::RealTime,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            PolicyKind::RoundRobin => "round-robin",
            PolicyKind::PriorityAging => "priority-aging",
            PolicyKind::ShortestJobFirst => "shortest-job-first",
            PolicyKind::RealTime => "real-time",
        }
    }

    /// Instantiate the policy
    pub fn build(self, params: PolicyParams) -> Box<dyn SchedulingPolicy> {
        match self {
            PolicyKind::RoundRobin => Box::new(RoundRobin::new(params)),
            PolicyKind::PriorityAging => Box::new(PriorityAging::new(params)),
            PolicyKind::ShortestJobFirst => Box::new(ShortestJobFirst::new(params)),
            PolicyKind::RealTime => Box::new(RealTime::new(params)),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tunables shared by the policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyParams {
    /// Instructions per slice at level 0
    pub base_quantum: u32,
    /// Ticks a ready process may wait before promotion
    pub aging_threshold: u64,
    /// Consecutive slice expirations before demotion
    pub demotion_threshold: u32,
}

impl PolicyParams {
    /// Slice that grows with the level: `base_quantum * (level + 1)`
    pub fn level_slice(&self, priority: Priority) -> u64 {
        u64::from(self.base_quantum) * (priority.queue_index() as u64 + 1)
    }

    /// Slice for the real-time band, the longest of any level
    pub fn realtime_slice(&self) -> u64 {
        self.level_slice(Priority::lowest())
    }
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self {
            base_quantum: DEFAULT_BASE_QUANTUM,
            aging_threshold: DEFAULT_AGING_THRESHOLD,
            demotion_threshold: DEFAULT_DEMOTION_THRESHOLD,
        }
    }
}

impl From<&KernelConfig> for PolicyParams {
    fn from(config: &KernelConfig) -> Self {
        Self {
            base_quantum: config.base_quantum,
            aging_threshold: config.aging_threshold,
            demotion_threshold: config.demotion_threshold,
        }
    }
}

/// A scheduling algorithm
pub trait SchedulingPolicy: fmt::Debug + Send {
    fn kind(&self) -> PolicyKind;

    /// Pick the next process to dispatch without dequeuing it
    fn select(&self, queues: &ReadyQueues, processes: &ProcessTable) -> Option<ProcessId>;

    /// Instruction budget for one dispatch
    fn time_slice(&self, process: &Process) -> u64;

    /// Level after the process's slice expired
    fn level_after_expiry(&self, process: &Process) -> Priority {
        process.priority()
    }

    /// Whether an expired process goes back to the head of its level
    fn requeue_at_head(&self, _process: &Process) -> bool {
        false
    }

    /// Promote long-waiting ready processes at tick `now`
    ///
    /// Returns the pids that were promoted.
    fn age(
        &self,
        _queues: &mut ReadyQueues,
        _processes: &mut ProcessTable,
        _now: u64,
    ) -> Vec<ProcessId> {
        Vec::new()
    }
}

// ============================================================================
// Round-Robin
// ============================================================================

/// Highest non-empty level, FIFO within it, slices growing with the level
#[derive(Debug, Clone, Copy)]
pub struct RoundRobin {
    params: PolicyParams,
}

impl RoundRobin {
    pub fn new(params: PolicyParams) -> Self {
        Self { params }
    }
}

impl SchedulingPolicy for RoundRobin {
    fn kind(&self) -> PolicyKind {
        PolicyKind::RoundRobin
    }

    fn select(&self, queues: &ReadyQueues, _processes: &ProcessTable) -> Option<ProcessId> {
        queues.peek_highest()
    }

    fn time_slice(&self, process: &Process) -> u64 {
        self.params.level_slice(process.priority())
    }
}

// ============================================================================
// Priority with aging
// ============================================================================

/// Multi-level feedback: demote CPU-bound processes, promote starved ones
#[derive(Debug, Clone, Copy)]
pub struct PriorityAging {
    params: PolicyParams,
}

impl PriorityAging {
    pub fn new(params: PolicyParams) -> Self {
        Self { params }
    }
}

impl SchedulingPolicy for PriorityAging {
    fn kind(&self) -> PolicyKind {
        PolicyKind::PriorityAging
    }

    fn select(&self, queues: &ReadyQueues, _processes: &ProcessTable) -> Option<ProcessId> {
        queues.peek_highest()
    }

    fn time_slice(&self, process: &Process) -> u64 {
        self.params.level_slice(process.priority())
    }

    fn level_after_expiry(&self, process: &Process) -> Priority {
        if process.consecutive_expirations() >= self.params.demotion_threshold {
            process.priority().lower()
        } else {
            process.priority()
        }
    }

    fn age(&self, queues: &mut ReadyQueues, processes: &mut ProcessTable, now: u64) -> Vec<ProcessId> {
        let starved: Vec<(Priority, ProcessId)> = queues
            .iter()
            .filter(|(priority, _)| *priority != Priority::highest())
            .filter(|(_, pid)| {
                processes
                    .get(pid)
                    .is_some_and(|p| now.saturating_sub(p.ready_since()) > self.params.aging_threshold)
            })
            .collect();

        let mut promoted = Vec::with_capacity(starved.len());
        for (priority, pid) in starved {
            let Some(process) = processes.get_mut(&pid) else {
                continue;
            };
            queues.remove(pid);
            let raised = priority.raise();
            process.priority = raised;
            process.ready_since = now;
            process.consecutive_expirations = 0;
            queues.push_back(raised, pid);
            promoted.push(pid);
        }
        promoted
    }
}

// ============================================================================
// Shortest-Job-First
// ============================================================================

/// Shortest remaining estimate across every level, ties by submission order
#[derive(Debug, Clone, Copy)]
pub struct ShortestJobFirst {
    params: PolicyParams,
}

impl ShortestJobFirst {
    pub fn new(params: PolicyParams) -> Self {
        Self { params }
    }
}

impl SchedulingPolicy for ShortestJobFirst {
    fn kind(&self) -> PolicyKind {
        PolicyKind::ShortestJobFirst
    }

    fn select(&self, queues: &ReadyQueues, processes: &ProcessTable) -> Option<ProcessId> {
        // Pids are allocated in submission order
        queues
            .iter()
            .filter_map(|(_, pid)| processes.get(&pid))
            .min_by_key(|p| (p.remaining_estimate(), p.pid()))
            .map(Process::pid)
    }

    fn time_slice(&self, _process: &Process) -> u64 {
        u64::from(self.params.base_quantum)
    }
}

// ============================================================================
// Real-time
// ============================================================================

/// Level 0 keeps the CPU until it halts or waits; other levels are round-robin
///
/// The real-time band still runs in bounded slices so that a tick always
/// completes, but an expired real-time process returns to the head of level 0
/// and is dispatched again before anything else.
#[derive(Debug, Clone, Copy)]
pub struct RealTime {
    params: PolicyParams,
}

impl RealTime {
    pub fn new(params: PolicyParams) -> Self {
        Self { params }
    }
}

impl SchedulingPolicy for RealTime {
    fn kind(&self) -> PolicyKind {
        PolicyKind::RealTime
    }

    fn select(&self, queues: &ReadyQueues, _processes: &ProcessTable) -> Option<ProcessId> {
        queues.peek_highest()
    }

    fn time_slice(&self, process: &Process) -> u64 {
        if process.priority().is_realtime() {
            self.params.realtime_slice()
        } else {
            self.params.level_slice(process.priority())
        }
    }

    fn requeue_at_head(&self, process: &Process) -> bool {
        process.priority().is_realtime()
    }
}
