use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the scanner takes its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Camera,
    Upload,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Upload => "upload",
        }
    }
}

/// Identifier of one scan attempt.
///
/// Allocated by the controller, strictly increasing. Async results carry the
/// generation they were issued for; anything not matching the current one is
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Acquisition session state machine.
///
/// ```text
/// camera: idle → waiting_for_surface → acquiring → active → terminated
///              └──────────(surface already mounted)──┘
/// upload: idle ─────────(image supplied)──────────→ active → terminated
/// ```
///
/// `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    WaitingForSurface,
    Acquiring,
    Active,
    Terminated,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Whether `next` is a legal successor in `mode`.
    pub fn can_transition_to(&self, next: SessionState, mode: SessionMode) -> bool {
        use SessionState::*;
        match (self, next, mode) {
            (Terminated, _, _) => false,
            (_, Terminated, _) => true,
            (Idle, WaitingForSurface, SessionMode::Camera) => true,
            (Idle, Acquiring, SessionMode::Camera) => true,
            (WaitingForSurface, Acquiring, SessionMode::Camera) => true,
            (Acquiring, Active, SessionMode::Camera) => true,
            (Idle, Active, SessionMode::Upload) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitingForSurface => "waiting_for_surface",
            Self::Acquiring => "acquiring",
            Self::Active => "active",
            Self::Terminated => "terminated",
        }
    }
}
