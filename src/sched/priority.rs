//! Process Priority Levels
//!
//! Five feedback-queue levels, 0 (highest) to 4 (lowest). Level 0 doubles as
//! the reserved real-time band under the real-time policy.
//!
//! ```text
//! 0:    Real-time / highest
//! 1:    High
//! 2:    Normal (default for submitted programs)
//! 3:    Low
//! 4:    Background
//! ```

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of priority levels
pub const NUM_LEVELS: usize = 5;

/// Highest priority value
pub const MINPRI: u8 = 0;

/// Lowest priority value
pub const MAXPRI: u8 = (NUM_LEVELS - 1) as u8;

/// Default priority for submitted programs
pub const BASEPRI_DEFAULT: u8 = 2;

/// Real-time band
pub const BASEPRI_RT: u8 = 0;

/// A process priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct Priority(u8);

impl Priority {
    /// Create a priority, clamped to the valid range
    pub const fn new(value: u8) -> Self {
        if value > MAXPRI {
            Self(MAXPRI)
        } else {
            Self(value)
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn highest() -> Self {
        Self(MINPRI)
    }

    pub const fn lowest() -> Self {
        Self(MAXPRI)
    }

    pub const fn realtime() -> Self {
        Self(BASEPRI_RT)
    }

    pub const fn is_realtime(self) -> bool {
        self.0 == BASEPRI_RT
    }

    /// One level closer to 0, saturating
    pub const fn raise(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// One level further from 0, saturating
    pub const fn lower(self) -> Self {
        Self::new(self.0 + 1)
    }

    /// Index of this priority's ready queue
    pub const fn queue_index(self) -> usize {
        self.0 as usize
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(BASEPRI_DEFAULT)
    }
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}
