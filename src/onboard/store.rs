use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::codec::{CodecError, ProgressData, SaveProgress, Snapshot};
use super::config::OnboardConfig;
use super::steps::PersistedStep;

const PROFILE_FILE: &str = "profile.json";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No progress saved yet. Expected for first-time users.
    #[error("No onboarding progress found")]
    NotFound,

    /// The store refused the request; messages come from the store
    #[error("{}", .0.join(", "))]
    Rejected(Vec<String>),

    #[error("Progress store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt progress data: {0}")]
    Corrupt(String),
}

impl StoreError {
    fn rejected(message: &str) -> Self {
        StoreError::Rejected(vec![message.to_string()])
    }
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Permanent profile created from the draft when onboarding completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: String,
    pub full_name: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub experiences: Vec<WorkExperienceRecord>,
    pub educations: Vec<EducationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperienceRecord {
    pub id: String,
    pub company: String,
    pub position: String,
    pub description: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationRecord {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub start_date: String,
    pub end_date: Option<String>,
}

/// Durable home of onboarding progress for the signed-in user.
///
/// Implementations own transport concerns (timeouts, retries, auth). The
/// session only sees the outcome.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Resume snapshot, or [`StoreError::NotFound`] for a user with no progress.
    async fn load(&self) -> Result<Snapshot, StoreError>;

    /// Persist progress and return the store's view of it.
    async fn save(&self, progress: &SaveProgress) -> Result<Snapshot, StoreError>;

    /// Convert saved progress into a permanent profile.
    async fn complete(&self) -> Result<ProfileRecord, StoreError>;
}

/// Record kept by the local stores.
///
/// `is_completed` is only ever set by `complete()`. The flag carried by a
/// save means the user reached the last step and is kept as `final_step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProgress {
    current_step: u8,
    is_completed: bool,
    #[serde(default)]
    final_step: bool,
    updated_at: DateTime<Utc>,
    data: ProgressData,
}

impl StoredProgress {
    fn from_save(progress: &SaveProgress) -> Self {
        Self {
            current_step: progress.current_step.get(),
            is_completed: false,
            final_step: progress.is_completed,
            updated_at: Utc::now(),
            data: progress.data.clone(),
        }
    }

    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let data =
            serde_json::to_value(&self.data).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Snapshot {
            current_step: PersistedStep::clamped(i64::from(self.current_step)),
            is_completed: self.is_completed,
            updated_at: Some(self.updated_at),
            data,
        })
    }

    fn to_profile(&self) -> ProfileRecord {
        let data = &self.data;
        ProfileRecord {
            id: new_id(),
            full_name: data.full_name.clone(),
            summary: data.summary.clone(),
            skills: data.skills.clone(),
            experiences: data
                .experiences
                .iter()
                .map(|exp| WorkExperienceRecord {
                    id: new_id(),
                    company: exp.company.clone(),
                    position: exp.role.clone(),
                    description: exp.description.clone(),
                    start_date: exp.start_date.clone(),
                    end_date: exp.end_date.clone(),
                    is_current: exp.end_date.is_none(),
                })
                .collect(),
            educations: data
                .educations
                .iter()
                .map(|edu| EducationRecord {
                    id: new_id(),
                    institution: edu.institution.clone(),
                    degree: edu.degree.clone(),
                    start_date: edu.start_date.clone(),
                    end_date: edu.graduation_date.clone(),
                })
                .collect(),
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// In-memory store used for dry runs; progress lives as long as the process
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<StoredProgress>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        match self.state.lock().await.as_ref() {
            Some(stored) => stored.snapshot(),
            None => Err(StoreError::NotFound),
        }
    }

    async fn save(&self, progress: &SaveProgress) -> Result<Snapshot, StoreError> {
        let mut state = self.state.lock().await;
        if state.as_ref().is_some_and(|s| s.is_completed) {
            return Err(StoreError::rejected("Onboarding already completed"));
        }
        let stored = StoredProgress::from_save(progress);
        debug!("Dryrun: saved progress at step {}", progress.current_step);
        let snapshot = stored.snapshot();
        *state = Some(stored);
        snapshot
    }

    async fn complete(&self) -> Result<ProfileRecord, StoreError> {
        let mut state = self.state.lock().await;
        let stored = state
            .as_mut()
            .ok_or_else(|| StoreError::rejected("No onboarding progress to complete"))?;
        if stored.is_completed {
            return Err(StoreError::rejected("Onboarding already completed"));
        }
        stored.is_completed = true;
        stored.updated_at = Utc::now();
        Ok(stored.to_profile())
    }
}

/// Store that keeps progress in a JSON file and writes the completed profile beside it
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`ProgressStore::complete`] writes the profile.
    pub fn profile_path(&self) -> PathBuf {
        self.path.with_file_name(PROFILE_FILE)
    }

    async fn read_value(&self) -> Result<serde_json::Value, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(StoreError::Unavailable(e.to_string())),
        };
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn read_stored(&self) -> Result<StoredProgress, StoreError> {
        let value = self.read_value().await?;
        serde_json::from_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// Replace `path` atomically: write a sibling temp file, then rename over it.
    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        let unavailable = |e: std::io::Error| StoreError::Unavailable(e.to_string());

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(unavailable)?;
        }
        let body =
            serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, body).await.map_err(unavailable)?;
        tokio::fs::rename(&tmp, path).await.map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for FileStore {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        let value = self.read_value().await?;
        Ok(Snapshot::from_json(value)?)
    }

    async fn save(&self, progress: &SaveProgress) -> Result<Snapshot, StoreError> {
        match self.read_stored().await {
            Ok(existing) if existing.is_completed => {
                return Err(StoreError::rejected("Onboarding already completed"));
            }
            Ok(_) | Err(StoreError::NotFound) => {}
            // an unreadable file is overwritten by fresh progress
            Err(StoreError::Corrupt(reason)) => {
                info!("Replacing unreadable progress file: {reason}");
            }
            Err(e) => return Err(e),
        }

        let stored = StoredProgress::from_save(progress);
        Self::write_json(&self.path, &stored).await?;
        debug!("Saved progress to {:?} at step {}", self.path, progress.current_step);
        stored.snapshot()
    }

    async fn complete(&self) -> Result<ProfileRecord, StoreError> {
        let mut stored = match self.read_stored().await {
            Ok(stored) => stored,
            Err(StoreError::NotFound) => {
                return Err(StoreError::rejected("No onboarding progress to complete"));
            }
            Err(e) => return Err(e),
        };
        if stored.is_completed {
            return Err(StoreError::rejected("Onboarding already completed"));
        }

        let profile = stored.to_profile();
        Self::write_json(&self.profile_path(), &profile).await?;

        stored.is_completed = true;
        stored.updated_at = Utc::now();
        Self::write_json(&self.path, &stored).await?;
        info!("Profile written to {:?}", self.profile_path());
        Ok(profile)
    }
}

/// Create the appropriate store based on dryrun mode
pub fn create_store(config: &OnboardConfig) -> Arc<dyn ProgressStore> {
    if config.general.dryrun {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(config.store.resolved_path()))
    }
}
