//! Conversion between the wizard [`Draft`] and the progress store's wire shapes.
//!
//! The store is not consistent about its payload shape, so all shape
//! tolerance lives in [`Snapshot::from_json`] and [`decode`]. Nothing else in
//! the crate inspects raw snapshot JSON.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::model::{Draft, Education, Experience, MonthDate};
use super::steps::PersistedStep;

/// Experience list keys, in priority order
const EXPERIENCE_KEYS: [&str; 2] = ["experience", "experiences"];
/// Skill list keys, in priority order
const SKILL_KEYS: [&str; 2] = ["skills", "jsonSkills"];
/// Role name keys, in priority order
const ROLE_KEYS: [&str; 3] = ["position", "role", "jobTitle"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("snapshot is not a JSON object")]
    NotAnObject,
}

/// Payload sent to the store on every save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgress {
    pub current_step: PersistedStep,
    pub is_completed: bool,
    pub data: ProgressData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressData {
    pub full_name: String,
    pub email: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub experiences: Vec<WorkEntry>,
    pub educations: Vec<EducationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkEntry {
    pub company: String,
    pub role: String,
    pub description: String,
    /// ISO timestamp, or empty when unknown
    pub start_date: String,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    pub start_date: String,
    pub graduation_date: Option<String>,
}

/// Progress as returned by the store's resume and save calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub current_step: PersistedStep,
    pub is_completed: bool,
    pub updated_at: Option<DateTime<Utc>>,
    /// Draft payload, normalized to an object; read it with [`decode`]
    pub data: Value,
}

impl Snapshot {
    /// Parse a raw snapshot. The draft payload is taken from `data` when
    /// present (an object, or a string holding JSON), otherwise the snapshot
    /// itself is treated as a flat payload.
    pub fn from_json(value: Value) -> Result<Self, CodecError> {
        let Value::Object(mut obj) = value else {
            return Err(CodecError::NotAnObject);
        };

        let current_step = PersistedStep::clamped(
            obj.get("currentStep").and_then(Value::as_i64).unwrap_or(1),
        );
        let is_completed = obj
            .get("isCompleted")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let updated_at = obj
            .get("updatedAt")
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        let data = match obj.remove("data") {
            Some(Value::Object(map)) => Value::Object(map),
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => Value::Object(map),
                Ok(_) | Err(_) => {
                    warn!("Snapshot data is not a JSON object string, ignoring it");
                    Value::Object(Map::new())
                }
            },
            Some(Value::Null) | None => Value::Object(obj),
            Some(_) => Value::Object(Map::new()),
        };

        Ok(Self {
            current_step,
            is_completed,
            updated_at,
            data,
        })
    }
}

/// Parse the timestamp spellings the store has been seen to emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

/// Month of a stored date. Placeholder dates (year before 1900) become `None`.
fn month_of(value: Option<&Value>) -> Option<MonthDate> {
    let raw = value?.as_str()?;
    let dt = parse_timestamp(raw)?;
    let month = MonthDate::from_datetime(&dt);
    if month.is_none() {
        warn!("Ignoring placeholder date {raw}");
    }
    month
}

fn text(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// First key holding a non-empty string.
fn first_text(obj: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
        .to_string()
}

/// First key holding a list. A string is accepted if it contains a JSON array.
fn first_list(obj: &Value, keys: &[&str]) -> Vec<Value> {
    for key in keys {
        match obj.get(*key) {
            Some(Value::Array(items)) => return items.clone(),
            Some(Value::String(raw)) => {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
                    return items;
                }
            }
            _ => {}
        }
    }
    Vec::new()
}

fn decode_experience(raw: &Value) -> Option<Experience> {
    if !raw.is_object() {
        return None;
    }
    let start_date = month_of(raw.get("startDate").or_else(|| raw.pointer("/dateRange/start")));
    let raw_end = raw.get("endDate").or_else(|| raw.pointer("/dateRange/end"));
    // current means the store sent no end date, not that the one it sent was a placeholder
    let has_end = raw_end
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    let end_date = month_of(raw_end);
    let is_current = raw
        .get("isCurrent")
        .and_then(Value::as_bool)
        .unwrap_or(!has_end);

    Some(Experience {
        job_title: first_text(raw, &ROLE_KEYS),
        company: text(raw, "company"),
        description: text(raw, "description"),
        start_date,
        end_date: if is_current { None } else { end_date },
        is_current,
    })
}

fn decode_education(raw: &Value) -> Option<Education> {
    if !raw.is_object() {
        return None;
    }
    Some(Education {
        institution: text(raw, "institution"),
        degree: text(raw, "degree"),
        start_date: month_of(raw.get("startDate")),
        graduation_date: month_of(raw.get("graduationDate").or_else(|| raw.get("endDate"))),
    })
}

/// Normalize a snapshot payload into a draft.
pub fn decode(data: &Value) -> Draft {
    let experiences: Vec<Experience> = first_list(data, &EXPERIENCE_KEYS)
        .iter()
        .filter_map(decode_experience)
        .collect();
    let mut skills: Vec<String> = Vec::new();
    for skill in first_list(data, &SKILL_KEYS).iter().filter_map(Value::as_str) {
        let skill = skill.trim();
        if skill.is_empty() || skills.iter().any(|s| s == skill) {
            debug!("Dropping blank or repeated skill {skill:?}");
            continue;
        }
        skills.push(skill.to_string());
    }
    let educations: Vec<Education> = first_list(data, &["educations"])
        .iter()
        .filter_map(decode_education)
        .collect();

    debug!(
        experiences = experiences.len(),
        skills = skills.len(),
        "Decoded snapshot payload"
    );

    Draft {
        full_name: text(data, "fullName"),
        email: text(data, "email"),
        summary: text(data, "summary"),
        skills,
        experiences,
        educations,
    }
}

/// `YYYY-MM` to `YYYY-MM-01T00:00:00Z`.
pub fn month_to_iso(month: &MonthDate) -> String {
    month
        .first_instant()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn encode_experience(exp: &Experience) -> WorkEntry {
    WorkEntry {
        company: exp.company.trim().to_string(),
        role: exp.job_title.trim().to_string(),
        description: exp.description.trim().to_string(),
        start_date: exp.start_date.as_ref().map(month_to_iso).unwrap_or_default(),
        end_date: if exp.is_current {
            None
        } else {
            exp.end_date.as_ref().map(month_to_iso)
        },
    }
}

fn encode_education(edu: &Education) -> EducationEntry {
    EducationEntry {
        institution: edu.institution.trim().to_string(),
        degree: edu.degree.trim().to_string(),
        start_date: edu.start_date.as_ref().map(month_to_iso).unwrap_or_default(),
        graduation_date: edu.graduation_date.as_ref().map(month_to_iso),
    }
}

/// Build the save payload for `step`. Rows with no content are left out.
/// `is_completed` is false; the caller decides whether the save completes the wizard.
pub fn encode(draft: &Draft, step: PersistedStep) -> SaveProgress {
    let experiences = draft
        .experiences
        .iter()
        .filter(|exp| !exp.is_empty())
        .map(encode_experience)
        .collect();

    SaveProgress {
        current_step: step,
        is_completed: false,
        data: ProgressData {
            full_name: draft.full_name.trim().to_string(),
            email: draft.email.trim().to_string(),
            summary: draft.summary.trim().to_string(),
            skills: draft.skills.iter().map(|s| s.trim().to_string()).collect(),
            experiences,
            educations: draft.educations.iter().map(encode_education).collect(),
        },
    }
}
