//! Field-level validation rules for the wizard.
//!
//! Rules return structured [`FieldError`] descriptors so the caller can point
//! at the exact field and reason instead of a generic failure.

use std::fmt;

use thiserror::Error;

use super::config::{AccountConfig, ExperienceConfig, SkillsConfig};
use super::model::{Draft, Experience};
use super::steps::StepId;

/// Field inside an experience row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceField {
    JobTitle,
    Company,
    StartDate,
    Description,
}

impl ExperienceField {
    pub fn name(&self) -> &'static str {
        match self {
            ExperienceField::JobTitle => "jobTitle",
            ExperienceField::Company => "company",
            ExperienceField::StartDate => "startDate",
            ExperienceField::Description => "description",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    FullName,
    Summary,
    Skill,
    /// At least one experience or skill
    ProfileContent,
    Experience { index: usize, field: ExperienceField },
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::FullName => write!(f, "fullName"),
            Field::Summary => write!(f, "summary"),
            Field::Skill => write!(f, "skill"),
            Field::ProfileContent => write!(f, "profile"),
            Field::Experience { index, field } => {
                write!(f, "experiences[{index}].{}", field.name())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    Required,
    TooShort { min: usize },
    TooLong { max: usize },
    ContainsEmoji,
    Duplicate,
    LimitReached { max: usize },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Required => write!(f, "is required"),
            Issue::TooShort { min } => write!(f, "must be at least {min} characters"),
            Issue::TooLong { max } => write!(f, "must be at most {max} characters"),
            Issue::ContainsEmoji => write!(f, "must not contain emoji"),
            Issue::Duplicate => write!(f, "was already added"),
            Issue::LimitReached { max } => write!(f, "limit of {max} reached"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} {issue}")]
pub struct FieldError {
    pub field: Field,
    pub issue: Issue,
}

impl FieldError {
    pub fn new(field: Field, issue: Issue) -> Self {
        Self { field, issue }
    }
}

/// One or more field errors collected from a validation pass.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("{}", joined(.0))]
pub struct ValidationErrors(Vec<FieldError>);

fn joined(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn has(&self, field: &Field) -> bool {
        self.0.iter().any(|e| &e.field == field)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

/// Emoji and pictograph ranges rejected in free-text fields.
pub fn contains_emoji(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c as u32,
            0x1F600..=0x1F64F
            | 0x1F300..=0x1F5FF
            | 0x1F680..=0x1F6FF
            | 0x1F700..=0x1F77F
            | 0x1F780..=0x1F7FF
            | 0x1F800..=0x1F8FF
            | 0x1F900..=0x1F9FF
            | 0x1FA00..=0x1FA6F
            | 0x1FA70..=0x1FAFF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
            | 0x2300..=0x23FF
            | 0x2B50
            | 0x2934
            | 0x2935
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0xFE0F
            | 0x1F004
            | 0x1F0CF
            | 0x1F170..=0x1F251)
    })
}

/// Required, length-bounded, emoji-free text. Length counts characters after trimming.
fn check_text(
    errors: &mut ValidationErrors,
    field: Field,
    value: &str,
    min: usize,
    max: Option<usize>,
) {
    let value = value.trim();
    let len = value.chars().count();
    let issue = if value.is_empty() {
        Some(Issue::Required)
    } else if len < min {
        Some(Issue::TooShort { min })
    } else if let Some(max) = max.filter(|max| len > *max) {
        Some(Issue::TooLong { max })
    } else if contains_emoji(value) {
        Some(Issue::ContainsEmoji)
    } else {
        None
    };
    if let Some(issue) = issue {
        errors.push(FieldError::new(field, issue));
    }
}

/// Step 0: the professional summary.
pub fn validate_account(draft: &Draft, rules: &AccountConfig) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_text(
        &mut errors,
        Field::Summary,
        &draft.summary,
        rules.min_summary_length,
        Some(rules.max_summary_length),
    );
    errors.into_result()
}

fn validate_experience(
    errors: &mut ValidationErrors,
    index: usize,
    exp: &Experience,
    rules: &ExperienceConfig,
) {
    let at = |field| Field::Experience { index, field };
    check_text(
        errors,
        at(ExperienceField::JobTitle),
        &exp.job_title,
        rules.min_job_title_length,
        None,
    );
    check_text(
        errors,
        at(ExperienceField::Company),
        &exp.company,
        rules.min_company_length,
        None,
    );
    if exp.start_date.is_none() {
        errors.push(FieldError::new(at(ExperienceField::StartDate), Issue::Required));
    }
    check_text(
        errors,
        at(ExperienceField::Description),
        &exp.description,
        rules.min_description_length,
        Some(rules.max_description_length),
    );
}

/// Step 1: every non-empty experience row. Empty rows are skipped, they are
/// stripped before saving.
pub fn validate_experiences(
    draft: &Draft,
    rules: &ExperienceConfig,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for (index, exp) in draft.experiences.iter().enumerate() {
        if !exp.is_empty() {
            validate_experience(&mut errors, index, exp, rules);
        }
    }
    errors.into_result()
}

/// Structural validation required before leaving `step` forwards.
pub fn validate_step(
    step: StepId,
    draft: &Draft,
    account: &AccountConfig,
    experience: &ExperienceConfig,
) -> Result<(), ValidationErrors> {
    match step {
        StepId::Account => validate_account(draft, account),
        StepId::Experience => validate_experiences(draft, experience),
        StepId::Review => Ok(()),
    }
}

/// Check a skill before adding it. Returns the trimmed value to store.
pub fn validate_skill(
    candidate: &str,
    existing: &[String],
    rules: &SkillsConfig,
) -> Result<String, FieldError> {
    let skill = candidate.trim();
    let len = skill.chars().count();
    let issue = if skill.is_empty() {
        Issue::Required
    } else if len < rules.min_length {
        Issue::TooShort {
            min: rules.min_length,
        }
    } else if len > rules.max_length {
        Issue::TooLong {
            max: rules.max_length,
        }
    } else if existing.iter().any(|s| s == skill) {
        Issue::Duplicate
    } else if existing.len() >= rules.max_count {
        Issue::LimitReached {
            max: rules.max_count,
        }
    } else {
        return Ok(skill.to_string());
    };
    Err(FieldError::new(Field::Skill, issue))
}
