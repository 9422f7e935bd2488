use super::model::Draft;
use super::validation::{Field, FieldError, Issue, ValidationErrors};

/// Identity plus at least one kind of content.
pub fn can_finish(draft: &Draft) -> bool {
    missing_for_finish(draft).is_none()
}

/// The first requirement `draft` fails before it can be completed.
pub fn missing_for_finish(draft: &Draft) -> Option<ValidationErrors> {
    if draft.full_name.trim().is_empty() {
        return Some(FieldError::new(Field::FullName, Issue::Required).into());
    }
    let has_experience = draft.experiences.iter().any(|e| !e.is_empty());
    let has_skill = draft.skills.iter().any(|s| !s.trim().is_empty());
    if has_experience || has_skill {
        None
    } else {
        Some(FieldError::new(Field::ProfileContent, Issue::Required).into())
    }
}

/// Work started but not finished. Used to offer resuming instead of starting over.
pub fn has_progress(draft: &Draft, is_completed: bool) -> bool {
    !is_completed
        && (!draft.skills.is_empty()
            || !draft.experiences.is_empty()
            || !draft.educations.is_empty()
            || !draft.summary.trim().is_empty())
}
