use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use thiserror::Error;

/// Authenticated user the wizard runs for. Both fields are read-only in the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub full_name: String,
    pub email: String,
}

/// A calendar month, the precision the wizard edits dates at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDate {
    year: i32,
    month: u32,
}

/// Years before this are treated as a backend placeholder rather than a real date
pub const MIN_PLAUSIBLE_YEAR: i32 = 1900;

impl MonthDate {
    /// Build a month, rejecting invalid months and placeholder years.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || year < MIN_PLAUSIBLE_YEAR || year > 9999 {
            return None;
        }
        Some(Self { year, month })
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Option<Self> {
        Self::new(dt.year(), dt.month())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Midnight UTC on the first day of the month.
    pub fn first_instant(&self) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0).single()
    }
}

impl fmt::Display for MonthDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid month '{0}', expected YYYY-MM")]
pub struct ParseMonthError(pub String);

impl FromStr for MonthDate {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| ParseMonthError(s.to_string()))?;
        let year: i32 = year.parse().map_err(|_| ParseMonthError(s.to_string()))?;
        let month: u32 = month.parse().map_err(|_| ParseMonthError(s.to_string()))?;
        MonthDate::new(year, month).ok_or_else(|| ParseMonthError(s.to_string()))
    }
}

/// One work-experience row. Identity is its position in [`Draft::experiences`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Experience {
    pub job_title: String,
    pub company: String,
    pub description: String,
    pub start_date: Option<MonthDate>,
    /// Always `None` while `is_current` is set
    pub end_date: Option<MonthDate>,
    pub is_current: bool,
}

impl Experience {
    /// No field filled at all. The `is_current` toggle alone is not content.
    pub fn is_empty(&self) -> bool {
        self.job_title.trim().is_empty()
            && self.company.trim().is_empty()
            && self.description.trim().is_empty()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    /// Some content present but a core field (title, company, start, description) missing.
    pub fn is_incomplete(&self) -> bool {
        !self.is_empty()
            && (self.job_title.trim().is_empty()
                || self.company.trim().is_empty()
                || self.start_date.is_none()
                || self.description.trim().is_empty())
    }

    /// Apply a partial update, then re-establish `is_current => end_date == None`.
    pub fn apply(&mut self, patch: ExperiencePatch) {
        if let Some(v) = patch.job_title {
            self.job_title = v;
        }
        if let Some(v) = patch.company {
            self.company = v;
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.start_date {
            self.start_date = v;
        }
        if let Some(v) = patch.end_date {
            self.end_date = v;
        }
        if let Some(v) = patch.is_current {
            self.is_current = v;
        }
        if self.is_current {
            self.end_date = None;
        }
    }
}

/// Partial experience update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperiencePatch {
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<Option<MonthDate>>,
    pub end_date: Option<Option<MonthDate>>,
    pub is_current: Option<bool>,
}

/// Education row. Carried through hydration and saves, never edited here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub start_date: Option<MonthDate>,
    pub graduation_date: Option<MonthDate>,
}

/// The editable onboarding progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub full_name: String,
    pub email: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub experiences: Vec<Experience>,
    pub educations: Vec<Education>,
}

impl Draft {
    /// Empty draft bound to an identity.
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            full_name: identity.full_name.clone(),
            email: identity.email.clone(),
            ..Self::default()
        }
    }

    /// Nothing the user could have typed: no summary, skills or experience content.
    pub fn is_blank(&self) -> bool {
        self.summary.trim().is_empty()
            && self.skills.is_empty()
            && self.experiences.iter().all(Experience::is_empty)
    }

    /// Drop rows with no content. Returns how many were removed.
    pub fn strip_empty_experiences(&mut self) -> usize {
        let before = self.experiences.len();
        self.experiences.retain(|e| !e.is_empty());
        before - self.experiences.len()
    }
}
