//! Multi-level feedback-queue scheduler
//!
//! The scheduler owns the process table and one ready queue per priority
//! level. Each [`Scheduler::tick`] dispatches at most one process to the
//! CPU for at most one time slice, then files it back according to how
//! the run ended. A tick always completes before a stop is honored, so
//! between ticks no process is running and every ready process sits in
//! exactly one queue.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::KernelConfig;
use crate::cpu::{Cpu, Program, RunOutcome};
use crate::error::{CpuError, SchedulerError};
use crate::types::ProcessId;
use crate::vm::MemoryManager;

pub mod policy;
pub mod priority;
pub mod process;
pub mod runq;

pub use policy::{PolicyKind, PolicyParams, ProcessTable, SchedulingPolicy};
pub use priority::{Priority, NUM_LEVELS};
pub use process::{FaultReason, Process, ProcessCounts, ProcessSnapshot, ProcessState};
pub use runq::ReadyQueues;

/// Scheduler statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SchedStats {
    /// Ticks taken while started
    pub ticks: u64,
    /// Processes handed to the CPU
    pub dispatches: u64,
    /// Ticks with nothing ready
    pub idle_ticks: u64,
    pub promotions: u64,
    pub demotions: u64,
    /// Processes terminated by a CPU fault
    pub faults: u64,
    /// Processes terminated by `kill`
    pub kills: u64,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The scheduler is stopped; nothing happened
    Stopped,
    /// No process was ready
    Idle,
    /// The selected process was put back because the CPU is powered off
    CpuUnavailable { pid: ProcessId },
    /// A process was dispatched and left in `state`
    Ran {
        pid: ProcessId,
        retired: u64,
        state: ProcessState,
    },
}

/// Why [`Scheduler::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// Nothing left to run
    Idle,
    /// Stopped, by `stop()` or a [`StopHandle`]
    Stopped,
    /// The CPU was powered off
    CpuUnavailable,
    /// The tick budget ran out
    TickLimit,
}

/// Requests a stop from outside the scheduler's owner
///
/// The request is honored at the start of the next tick.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }

    fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

/// The process scheduler
#[derive(Debug)]
pub struct Scheduler {
    policy: Box<dyn SchedulingPolicy>,
    processes: ProcessTable,
    queues: ReadyQueues,
    running: Option<ProcessId>,
    next_pid: ProcessId,
    started: bool,
    stop_handle: StopHandle,
    /// Logical time in ticks
    clock: u64,
    stats: SchedStats,
}

impl Scheduler {
    /// Create a stopped scheduler using `policy`
    pub fn new(policy: Box<dyn SchedulingPolicy>) -> Self {
        Self {
            policy,
            processes: ProcessTable::new(),
            queues: ReadyQueues::new(),
            running: None,
            next_pid: ProcessId(1),
            started: false,
            stop_handle: StopHandle::default(),
            clock: 0,
            stats: SchedStats::default(),
        }
    }

    /// Create a stopped scheduler with the configured policy and tunables
    pub fn from_config(config: &KernelConfig) -> Self {
        Self::new(config.policy.build(PolicyParams::from(config)))
    }

    pub fn policy(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Replace the policy, keeping every process at its current level
    pub fn set_policy(&mut self, policy: Box<dyn SchedulingPolicy>) {
        log::debug!("policy {} -> {}", self.policy.kind(), policy.kind());
        self.policy = policy;
    }

    pub fn start(&mut self) {
        self.stop_handle.clear();
        if !self.started {
            self.started = true;
            log::info!("scheduler started ({})", self.policy.kind());
        }
    }

    pub fn stop(&mut self) {
        if self.started {
            self.started = false;
            log::info!("scheduler stopped after {} ticks", self.stats.ticks);
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Handle that can request a stop from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Submit `program` at the default priority
    pub fn submit(&mut self, program: Program) -> ProcessId {
        self.submit_with_priority(program, Priority::default())
    }

    /// Submit `program` as a new ready process at `priority`
    pub fn submit_with_priority(&mut self, program: Program, priority: Priority) -> ProcessId {
        let pid = self.next_pid;
        self.next_pid = pid.next();
        self.processes
            .insert(pid, Process::new(pid, program, priority, self.clock));
        self.queues.push_back(priority, pid);
        log::debug!("{} submitted at {}", pid, priority);
        pid
    }

    /// Move a waiting process back to ready
    pub fn wake(&mut self, pid: ProcessId) -> Result<(), SchedulerError> {
        let process = self
            .processes
            .get_mut(&pid)
            .ok_or(SchedulerError::UnknownProcess(pid))?;
        if process.state != ProcessState::Waiting {
            return Err(SchedulerError::InvalidTransition {
                pid,
                from: process.state,
                to: ProcessState::Ready,
            });
        }
        process.transition(ProcessState::Ready)?;
        process.ready_since = self.clock;
        self.queues.push_back(process.priority, pid);
        log::debug!("{} woken", pid);
        Ok(())
    }

    /// Terminate a process at its next dispatch
    ///
    /// A waiting process is made ready so that the dispatch happens. Killing a
    /// terminated process does nothing.
    pub fn kill(&mut self, pid: ProcessId) -> Result<(), SchedulerError> {
        let process = self
            .processes
            .get_mut(&pid)
            .ok_or(SchedulerError::UnknownProcess(pid))?;
        match process.state {
            ProcessState::Terminated => return Ok(()),
            ProcessState::Waiting => {
                process.transition(ProcessState::Ready)?;
                process.ready_since = self.clock;
                self.queues.push_back(process.priority, pid);
            }
            ProcessState::Ready | ProcessState::Running => {}
        }
        process.kill_requested = true;
        log::debug!("{} marked for termination", pid);
        Ok(())
    }

    /// Dispatch at most one process for at most one slice
    pub fn tick(&mut self, cpu: &mut Cpu, memory: &MemoryManager) -> TickOutcome {
        if self.stop_handle.take() {
            self.stop();
        }
        if !self.started {
            return TickOutcome::Stopped;
        }

        self.clock += 1;
        self.stats.ticks += 1;

        let promoted = self
            .policy
            .age(&mut self.queues, &mut self.processes, self.clock);
        for pid in &promoted {
            log::debug!("{} promoted by aging", pid);
        }
        self.stats.promotions += promoted.len() as u64;

        let Some(pid) = self.policy.select(&self.queues, &self.processes) else {
            self.stats.idle_ticks += 1;
            return TickOutcome::Idle;
        };

        match self.dispatch(pid, cpu, memory) {
            Ok(outcome) => outcome,
            Err(err) => {
                // Only reachable if the queues disagree with the table
                log::error!("dispatch of {} failed: {}", pid, err);
                self.queues.remove(pid);
                self.running = None;
                TickOutcome::Idle
            }
        }
    }

    fn dispatch(
        &mut self,
        pid: ProcessId,
        cpu: &mut Cpu,
        memory: &MemoryManager,
    ) -> Result<TickOutcome, SchedulerError> {
        let process = self
            .processes
            .get_mut(&pid)
            .ok_or(SchedulerError::UnknownProcess(pid))?;
        self.queues.remove(pid);
        process.transition(ProcessState::Running)?;
        self.running = Some(pid);

        if process.kill_requested {
            process.transition(ProcessState::Terminated)?;
            process.fault = Some(FaultReason::Killed);
            self.running = None;
            self.stats.kills += 1;
            log::info!("{} killed", pid);
            return Ok(TickOutcome::Ran {
                pid,
                retired: 0,
                state: ProcessState::Terminated,
            });
        }

        let slice = self.policy.time_slice(process);
        let program = process.program.clone();
        let before = process.context.retired();
        let result = cpu.run(&program, memory, &mut process.context, Some(slice));
        let retired = process.context.retired() - before;

        if result == Err(CpuError::NotReady) {
            process.transition(ProcessState::Ready)?;
            self.queues.push_front(process.priority, pid);
            self.running = None;
            log::warn!("{} not dispatched: cpu powered off", pid);
            return Ok(TickOutcome::CpuUnavailable { pid });
        }

        process.cpu_time += retired;
        process.dispatches += 1;
        self.stats.dispatches += 1;

        let state = match result {
            Ok(report) => match report.outcome {
                RunOutcome::Halted => {
                    process.transition(ProcessState::Terminated)?;
                    log::info!("{} halted after {} instructions", pid, process.cpu_time);
                    ProcessState::Terminated
                }
                RunOutcome::Waiting => {
                    process.consecutive_expirations = 0;
                    process.transition(ProcessState::Waiting)?;
                    ProcessState::Waiting
                }
                RunOutcome::SliceExpired => {
                    process.consecutive_expirations += 1;
                    let level = self.policy.level_after_expiry(process);
                    if level != process.priority {
                        log::debug!("{} demoted {} -> {}", pid, process.priority, level);
                        process.priority = level;
                        process.consecutive_expirations = 0;
                        self.stats.demotions += 1;
                    }
                    process.transition(ProcessState::Ready)?;
                    process.ready_since = self.clock;
                    if self.policy.requeue_at_head(process) {
                        self.queues.push_front(process.priority, pid);
                    } else {
                        self.queues.push_back(process.priority, pid);
                    }
                    ProcessState::Ready
                }
            },
            Err(err) => {
                process.transition(ProcessState::Terminated)?;
                log::warn!("{} terminated by fault: {}", pid, err);
                process.fault = Some(FaultReason::Cpu(err));
                self.stats.faults += 1;
                ProcessState::Terminated
            }
        };

        self.running = None;
        Ok(TickOutcome::Ran {
            pid,
            retired,
            state,
        })
    }

    /// Tick until idle, stopped, the CPU is unavailable or `max_ticks` ran out
    pub fn run(&mut self, cpu: &mut Cpu, memory: &MemoryManager, max_ticks: u64) -> RunExit {
        for _ in 0..max_ticks {
            match self.tick(cpu, memory) {
                TickOutcome::Stopped => return RunExit::Stopped,
                TickOutcome::Idle => return RunExit::Idle,
                TickOutcome::CpuUnavailable { .. } => return RunExit::CpuUnavailable,
                TickOutcome::Ran { .. } => {}
            }
        }
        RunExit::TickLimit
    }

    /// Snapshot of one process
    pub fn process(&self, pid: ProcessId) -> Option<ProcessSnapshot> {
        self.processes.get(&pid).map(Process::snapshot)
    }

    /// Snapshots of every process, by pid
    pub fn list_processes(&self) -> Vec<ProcessSnapshot> {
        self.processes.values().map(Process::snapshot).collect()
    }

    /// Remove terminated processes, returning their final snapshots
    pub fn reap(&mut self) -> Vec<ProcessSnapshot> {
        let done: Vec<ProcessId> = self
            .processes
            .values()
            .filter(|p| p.state == ProcessState::Terminated)
            .map(Process::pid)
            .collect();
        done.into_iter()
            .filter_map(|pid| self.processes.remove(&pid))
            .map(|p| p.snapshot())
            .collect()
    }

    pub fn counts(&self) -> ProcessCounts {
        let mut counts = ProcessCounts::default();
        for process in self.processes.values() {
            match process.state {
                ProcessState::Ready => counts.ready += 1,
                ProcessState::Running => counts.running += 1,
                ProcessState::Waiting => counts.waiting += 1,
                ProcessState::Terminated => counts.terminated += 1,
            }
        }
        counts
    }

    pub fn running(&self) -> Option<ProcessId> {
        self.running
    }

    pub fn ready_queues(&self) -> &ReadyQueues {
        &self.queues
    }

    pub fn stats(&self) -> SchedStats {
        self.stats
    }

    /// Verify that the queues and the process table agree
    ///
    /// Every ready process is queued exactly once at its own level, nothing
    /// else is queued, and nothing is running between ticks.
    pub fn check_invariants(&self) -> Result<(), SchedulerError> {
        for (level, pid) in self.queues.iter() {
            let process = self
                .processes
                .get(&pid)
                .ok_or(SchedulerError::UnknownProcess(pid))?;
            if process.state != ProcessState::Ready || process.priority != level {
                return Err(SchedulerError::Inconsistent {
                    pid,
                    state: process.state,
                });
            }
        }
        for process in self.processes.values() {
            let queued = self.queues.occurrences(process.pid);
            let consistent = match process.state {
                ProcessState::Ready => queued == 1,
                ProcessState::Running => self.running == Some(process.pid) && queued == 0,
                ProcessState::Waiting | ProcessState::Terminated => queued == 0,
            };
            if !consistent {
                return Err(SchedulerError::Inconsistent {
                    pid: process.pid,
                    state: process.state,
                });
            }
        }
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::from_config(&KernelConfig::default())
    }
}
