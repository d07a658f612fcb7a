//! Process records and their state machine
//!
//! ```text
//! Ready -> Running -> { Ready | Waiting | Terminated }
//! Waiting -> Ready
//! Terminated is absorbing
//! ```

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cpu::{CpuContext, Program};
use crate::error::{CpuError, SchedulerError};
use crate::sched::priority::Priority;
use crate::types::ProcessId;

/// Scheduling state of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProcessState {
    Ready,
    Running,
    Waiting,
    Terminated,
}

impl ProcessState {
    /// Whether the state machine allows `self -> to`
    pub const fn can_transition_to(self, to: ProcessState) -> bool {
        matches!(
            (self, to),
            (ProcessState::Ready, ProcessState::Running)
                | (ProcessState::Running, ProcessState::Ready)
                | (ProcessState::Running, ProcessState::Waiting)
                | (ProcessState::Running, ProcessState::Terminated)
                | (ProcessState::Waiting, ProcessState::Ready)
        )
    }
}

/// Why a process terminated abnormally
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FaultReason {
    /// The execution engine faulted while running the process
    Cpu(CpuError),
    /// Terminated by request before its next dispatch
    Killed,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultReason::Cpu(err) => write!(f, "{}", err),
            FaultReason::Killed => write!(f, "killed"),
        }
    }
}

/// A scheduled program instance
#[derive(Debug)]
pub struct Process {
    pub(crate) pid: ProcessId,
    /// Current queue level
    pub(crate) priority: Priority,
    /// Level at submission
    pub(crate) base_priority: Priority,
    pub(crate) state: ProcessState,
    pub(crate) program: Program,
    pub(crate) context: CpuContext,
    /// Instructions retired across all dispatches
    pub(crate) cpu_time: u64,
    pub(crate) dispatches: u64,
    /// Scheduler tick at which the process last became ready
    pub(crate) ready_since: u64,
    /// Slice expirations since the process last halted, waited or changed level
    pub(crate) consecutive_expirations: u32,
    pub(crate) kill_requested: bool,
    pub(crate) fault: Option<FaultReason>,
}

impl Process {
    pub(crate) fn new(pid: ProcessId, program: Program, priority: Priority, now: u64) -> Self {
        Self {
            pid,
            priority,
            base_priority: priority,
            state: ProcessState::Ready,
            program,
            context: CpuContext::new(),
            cpu_time: 0,
            dispatches: 0,
            ready_since: now,
            consecutive_expirations: 0,
            kill_requested: false,
            fault: None,
        }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn cpu_time(&self) -> u64 {
        self.cpu_time
    }

    pub fn consecutive_expirations(&self) -> u32 {
        self.consecutive_expirations
    }

    pub fn ready_since(&self) -> u64 {
        self.ready_since
    }

    /// Instructions between the current position and the end of the program
    pub fn remaining_estimate(&self) -> usize {
        let position = if self.context.is_started() {
            self.context.ip()
        } else {
            self.program.entry()
        };
        self.program.len().saturating_sub(position)
    }

    /// Move to `to`, enforcing the state machine
    pub(crate) fn transition(&mut self, to: ProcessState) -> Result<(), SchedulerError> {
        if !self.state.can_transition_to(to) {
            return Err(SchedulerError::InvalidTransition {
                pid: self.pid,
                from: self.state,
                to,
            });
        }
        log::trace!("{}: {:?} -> {:?}", self.pid, self.state, to);
        self.state = to;
        Ok(())
    }

    pub fn snapshot(&self) -> ProcessSnapshot {
        ProcessSnapshot {
            pid: self.pid,
            priority: self.priority,
            base_priority: self.base_priority,
            state: self.state,
            cpu_time: self.cpu_time,
            dispatches: self.dispatches,
            program_len: self.program.len(),
            ip: self.context.ip(),
            fault: self.fault.clone(),
        }
    }
}

/// Read-only view of a process for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProcessSnapshot {
    pub pid: ProcessId,
    pub priority: Priority,
    pub base_priority: Priority,
    pub state: ProcessState,
    /// Instructions retired
    pub cpu_time: u64,
    pub dispatches: u64,
    pub program_len: usize,
    pub ip: usize,
    pub fault: Option<FaultReason>,
}

/// Number of processes in each state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProcessCounts {
    pub ready: usize,
    pub running: usize,
    pub waiting: usize,
    pub terminated: usize,
}

impl ProcessCounts {
    pub fn total(&self) -> usize {
        self.ready + self.running + self.waiting + self.terminated
    }

    /// Processes that have not terminated
    pub fn live(&self) -> usize {
        self.ready + self.running + self.waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Instruction;
    use alloc::string::ToString;
    use alloc::vec;

    fn process() -> Process {
        let program = Program::new(vec![Instruction::Nop, Instruction::Nop, Instruction::Halt]);
        Process::new(ProcessId(1), program, Priority::default(), 0)
    }

    #[test]
    fn test_state_machine() {
        use ProcessState::*;
        assert!(Ready.can_transition_to(Running));
        assert!(Running.can_transition_to(Waiting));
        assert!(Waiting.can_transition_to(Ready));
        assert!(!Waiting.can_transition_to(Running));
        assert!(!Ready.can_transition_to(Terminated));
        for to in [Ready, Running, Waiting, Terminated] {
            assert!(!Terminated.can_transition_to(to));
        }
    }

    #[test]
    fn test_transition_rejects_invalid() {
        let mut p = process();
        assert_eq!(
            p.transition(ProcessState::Waiting),
            Err(SchedulerError::InvalidTransition {
                pid: ProcessId(1),
                from: ProcessState::Ready,
                to: ProcessState::Waiting,
            })
        );
        p.transition(ProcessState::Running).unwrap();
        p.transition(ProcessState::Terminated).unwrap();
        assert!(p.transition(ProcessState::Ready).is_err());
        assert_eq!(p.state(), ProcessState::Terminated);
    }

    #[test]
    fn test_remaining_estimate_uses_entry() {
        let p = process();
        assert_eq!(p.remaining_estimate(), 3);
        let program = p.program().clone().with_entry(2);
        let q = Process::new(ProcessId(2), program, Priority::default(), 0);
        assert_eq!(q.remaining_estimate(), 1);
    }

    #[test]
    fn test_snapshot() {
        let snap = process().snapshot();
        assert_eq!(snap.state, ProcessState::Ready);
        assert_eq!(snap.program_len, 3);
        assert_eq!(snap.fault, None);
        assert_eq!(FaultReason::Killed.to_string(), "killed");
    }
}
