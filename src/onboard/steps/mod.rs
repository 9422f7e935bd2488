//! Wizard step identifiers and the translation between the wizard's
//! zero-based step index and the store's one-based step number.
//!
//! Every value that crosses the store boundary goes through [`to_persisted`]
//! or [`to_ui`]. Nothing else in the crate adds or subtracts one.

use serde::Serialize;

/// Unique identifier for each wizard step (zero-based, display order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Account,
    Experience,
    Review,
}

impl StepId {
    pub const ALL: [StepId; 3] = [StepId::Account, StepId::Experience, StepId::Review];

    /// Step for a zero-based index, clamped into range.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn index(self) -> usize {
        match self {
            StepId::Account => 0,
            StepId::Experience => 1,
            StepId::Review => 2,
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            StepId::Account => "Account",
            StepId::Experience => "Experience",
            StepId::Review => "Review",
        }
    }

    pub fn is_last(self) -> bool {
        self == StepId::Review
    }
}

/// One-based step number as understood by the progress store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PersistedStep(u8);

impl PersistedStep {
    pub const FIRST: PersistedStep = PersistedStep(1);
    pub const LAST: PersistedStep = PersistedStep(3);

    /// Wrap a raw store value, clamping it into `FIRST..=LAST`.
    pub fn clamped(raw: i64) -> Self {
        let raw = raw.clamp(i64::from(Self::FIRST.0), i64::from(Self::LAST.0));
        // in range 1..=3 after the clamp
        PersistedStep(raw as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The following step, saturating at [`PersistedStep::LAST`].
    pub fn next(self) -> Self {
        PersistedStep((self.0 + 1).min(Self::LAST.0))
    }

    /// The preceding step, saturating at [`PersistedStep::FIRST`].
    pub fn prev(self) -> Self {
        PersistedStep(self.0.saturating_sub(1).max(Self::FIRST.0))
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }
}

impl std::fmt::Display for PersistedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UI step to store step.
pub fn to_persisted(step: StepId) -> PersistedStep {
    // index() is at most 2
    PersistedStep(step.index() as u8 + 1)
}

/// Store step to UI step.
pub fn to_ui(step: PersistedStep) -> StepId {
    StepId::from_index(usize::from(step.0) - 1)
}

/// Result of a step's structural validation, shown by the stepper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepResult {
    #[default]
    Pending,
    Completed,
    /// Step has not been reached yet
    Locked,
}
