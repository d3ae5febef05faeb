//! Coordinator phase tracking.
//!
//! Transitions are driven exclusively by step-executor progress: the phase
//! advances when a step starts and lands on a terminal idle state when the
//! attempt seals. Stored in an atomic cell so the status endpoint can read
//! it without locking.

use crate::models::StepName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FailoverPhase {
    /// No attempt has run yet
    Idle = 0,
    Probing = 1,
    PromotingRelational = 2,
    FailingOverCache = 3,
    UpdatingRouting = 4,
    Validating = 5,
    /// Last attempt sealed successfully
    IdleSuccess = 6,
    /// Last attempt sealed failed
    IdleFailed = 7,
}

impl FailoverPhase {
    /// Whether an attempt is currently between trigger and seal.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Probing
                | Self::PromotingRelational
                | Self::FailingOverCache
                | Self::UpdatingRouting
                | Self::Validating
        )
    }

    pub fn for_step(name: StepName) -> Self {
        match name {
            StepName::HealthCheck => Self::Probing,
            StepName::PromoteRelational => Self::PromotingRelational,
            StepName::FailoverCache => Self::FailingOverCache,
            StepName::UpdateRouting => Self::UpdatingRouting,
            StepName::Validate => Self::Validating,
        }
    }
}

impl From<u8> for FailoverPhase {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Probing,
            2 => Self::PromotingRelational,
            3 => Self::FailingOverCache,
            4 => Self::UpdatingRouting,
            5 => Self::Validating,
            6 => Self::IdleSuccess,
            _ => Self::IdleFailed,
        }
    }
}

impl fmt::Display for FailoverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Probing => write!(f, "probing"),
            Self::PromotingRelational => write!(f, "promoting_relational"),
            Self::FailingOverCache => write!(f, "failing_over_cache"),
            Self::UpdatingRouting => write!(f, "updating_routing"),
            Self::Validating => write!(f, "validating"),
            Self::IdleSuccess => write!(f, "idle_success"),
            Self::IdleFailed => write!(f, "idle_failed"),
        }
    }
}

/// Lock-free cell holding the current phase.
#[derive(Debug)]
pub struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(FailoverPhase::Idle as u8))
    }

    pub fn load(&self) -> FailoverPhase {
        FailoverPhase::from(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, phase: FailoverPhase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}
