//! Debounced background saving.
//!
//! The scheduler only tracks timing and arming. The session decides what a
//! due autosave does, see [`super::OnboardingSession::run_autosave`].

use std::fmt;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutosavePhase {
    #[default]
    Idle,
    /// Waiting for the quiet period after the last edit to elapse
    PendingDebounce,
    Saving,
}

/// Why a due autosave did not reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    Hydrating,
    NotArmed,
    Completed,
    EmptyDraft,
    EmptyExperience,
    IncompleteExperience,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SuppressReason::Hydrating => "progress is still loading",
            SuppressReason::NotArmed => "no edits since loading",
            SuppressReason::Completed => "onboarding is completed",
            SuppressReason::EmptyDraft => "nothing to save",
            SuppressReason::EmptyExperience => "an experience row is empty",
            SuppressReason::IncompleteExperience => "an experience row is incomplete",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveOutcome {
    /// No deadline, or the deadline has not passed yet
    NotDue,
    Suppressed(SuppressReason),
    Saved,
    /// Store failure; logged only, never surfaced as the session error
    Failed(String),
}

/// Single-shot timer that is pushed back on every edit.
#[derive(Debug)]
pub struct AutosaveScheduler {
    debounce: Duration,
    enabled: bool,
    armed: bool,
    deadline: Option<Instant>,
    phase: AutosavePhase,
}

impl AutosaveScheduler {
    pub fn new(debounce: Duration, enabled: bool) -> Self {
        Self {
            debounce,
            enabled,
            armed: false,
            deadline: None,
            phase: AutosavePhase::Idle,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn phase(&self) -> AutosavePhase {
        self.phase
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Record a user edit: arms the scheduler and restarts the quiet period.
    pub fn on_mutation(&mut self, now: Instant) {
        self.armed = true;
        if self.enabled {
            self.deadline = Some(now + self.debounce);
            self.phase = AutosavePhase::PendingDebounce;
        }
    }

    /// Drop the pending deadline, keeping the arming.
    pub fn cancel(&mut self) {
        self.deadline = None;
        if self.phase == AutosavePhase::PendingDebounce {
            self.phase = AutosavePhase::Idle;
        }
    }

    /// Back to the freshly constructed state: disarmed, nothing pending.
    pub fn reset(&mut self) {
        self.armed = false;
        self.deadline = None;
        self.phase = AutosavePhase::Idle;
    }

    /// Consume the deadline if it has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.phase = AutosavePhase::Idle;
                true
            }
            _ => false,
        }
    }

    pub(super) fn set_saving(&mut self, saving: bool) {
        self.phase = if saving {
            AutosavePhase::Saving
        } else if self.deadline.is_some() {
            AutosavePhase::PendingDebounce
        } else {
            AutosavePhase::Idle
        };
    }
}

/// Resolve at `deadline`, or never when there is none. Meant for a `select!` arm.
pub async fn sleep_until_due(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
