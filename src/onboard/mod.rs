mod autosave;
pub mod codec;
mod completion;
mod config;
mod error;
pub mod model;
pub mod steps;
pub mod store;
pub mod validation;

pub use autosave::{
    AutosaveOutcome, AutosavePhase, AutosaveScheduler, SuppressReason, sleep_until_due,
};
pub use completion::{can_finish, has_progress, missing_for_finish};
pub use config::OnboardConfig;
pub use error::{OnboardError, Result};
pub use model::{Draft, Experience, ExperiencePatch, Identity, MonthDate};
pub use steps::{PersistedStep, StepId, StepResult};
pub use store::{FileStore, MemoryStore, ProfileRecord, ProgressStore, StoreError, create_store};

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use codec::{SaveProgress, Snapshot, decode, encode};
use steps::{to_persisted, to_ui};
use validation::{ValidationErrors, validate_skill, validate_step};

/// Lifecycle of a session. Saving and error state are flags on top of `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Hydrating,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

/// Top-level draft fields addressable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    FullName,
    Email,
    Summary,
}

impl AccountField {
    pub fn name(&self) -> &'static str {
        match self {
            AccountField::FullName => "fullName",
            AccountField::Email => "email",
            AccountField::Summary => "summary",
        }
    }
}

impl FromStr for AccountField {
    type Err = OnboardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fullName" | "full_name" | "name" => Ok(AccountField::FullName),
            "email" => Ok(AccountField::Email),
            "summary" => Ok(AccountField::Summary),
            other => Err(OnboardError::UnknownField(other.to_string())),
        }
    }
}

/// Everything the UI can ask the session to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    EditField { field: AccountField, value: String },
    AddExperience,
    UpdateExperience { index: usize, patch: ExperiencePatch },
    RemoveExperience(usize),
    AddSkill(String),
    RemoveSkill(String),
    GoNext,
    GoBack,
    Finish,
}

/// Message displayed to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Saved progress was found and hydrated
    Resumed,
    /// No progress yet, starting from an empty draft
    Fresh,
    /// The store failed; the draft is empty and `error` is set
    Failed,
}

/// Read-only projection handed to the UI
#[derive(Debug, Clone)]
pub struct SessionView<'a> {
    pub current_step_index: usize,
    pub step: StepId,
    pub steps: Vec<(StepId, StepResult)>,
    pub draft: &'a Draft,
    pub loading: bool,
    pub saving: bool,
    pub error: Option<&'a str>,
    pub last_saved_display: Option<String>,
    pub can_finish: bool,
    pub is_completed: bool,
    pub has_progress: bool,
    pub autosave: AutosavePhase,
}

/// `dd/mm/YYYY HH:MM` in local time
pub fn format_saved_at(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

/// Onboarding state for one signed-in user.
///
/// The draft is owned here and only changes through these operations. Every
/// store call goes through `&mut self`, so a session never has two requests
/// in flight.
pub struct OnboardingSession {
    config: OnboardConfig,
    identity: Identity,
    store: Arc<dyn ProgressStore>,

    phase: Phase,
    draft: Draft,
    current_step: PersistedStep,
    is_completed: bool,
    last_saved_at: Option<DateTime<Utc>>,
    error: Option<String>,
    saving: bool,
    // edits not yet acknowledged by the store
    dirty: bool,

    autosave: AutosaveScheduler,
    message: Option<Message>,
    profile: Option<ProfileRecord>,
}

impl OnboardingSession {
    pub fn new(config: OnboardConfig, identity: Identity, store: Arc<dyn ProgressStore>) -> Self {
        let autosave = AutosaveScheduler::new(config.autosave.debounce(), config.autosave.enabled);
        Self {
            draft: Draft::for_identity(&identity),
            config,
            identity,
            store,
            phase: Phase::Uninitialized,
            current_step: PersistedStep::FIRST,
            is_completed: false,
            last_saved_at: None,
            error: None,
            saving: false,
            dirty: false,
            autosave,
            message: None,
            profile: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_hydrating(&self) -> bool {
        self.phase == Phase::Hydrating
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn autosave_armed(&self) -> bool {
        self.autosave.is_armed()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn current_step(&self) -> StepId {
        to_ui(self.current_step)
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn config(&self) -> &OnboardConfig {
        &self.config
    }

    /// Profile created by a successful [`finish`](Self::finish)
    pub fn profile(&self) -> Option<&ProfileRecord> {
        self.profile.as_ref()
    }

    pub fn can_finish(&self) -> bool {
        can_finish(&self.draft)
    }

    pub fn has_progress(&self) -> bool {
        has_progress(&self.draft, self.is_completed)
    }

    pub fn set_error(&mut self, text: String) {
        self.message = Some(Message {
            text,
            is_error: true,
        });
    }

    pub fn set_info(&mut self, text: String) {
        self.message = Some(Message {
            text,
            is_error: false,
        });
    }

    /// Pop the pending user message, if any.
    pub fn take_message(&mut self) -> Option<Message> {
        self.message.take()
    }

    /// Fetch saved progress and hydrate the draft from it.
    ///
    /// Never fails: a missing snapshot starts a fresh draft and any other
    /// store failure is recorded in [`error`](Self::error).
    pub async fn load(&mut self) -> LoadOutcome {
        self.phase = Phase::Hydrating;
        self.autosave.reset();
        self.error = None;
        self.dirty = false;

        let outcome = match self.store.load().await {
            Ok(snapshot) => {
                self.hydrate(snapshot);
                LoadOutcome::Resumed
            }
            Err(StoreError::NotFound) => {
                info!("No saved onboarding progress, starting fresh");
                self.start_fresh();
                LoadOutcome::Fresh
            }
            Err(e) => {
                warn!("Failed to load onboarding progress: {e}");
                self.start_fresh();
                self.error = Some(e.to_string());
                LoadOutcome::Failed
            }
        };

        self.phase = Phase::Ready;
        outcome
    }

    fn start_fresh(&mut self) {
        self.draft = Draft::for_identity(&self.identity);
        self.current_step = PersistedStep::FIRST;
        self.is_completed = false;
        self.last_saved_at = None;
    }

    fn hydrate(&mut self, snapshot: Snapshot) {
        let mut draft = decode(&snapshot.data);
        if !self.identity.full_name.trim().is_empty() {
            draft.full_name = self.identity.full_name.clone();
        }
        if !self.identity.email.trim().is_empty() {
            draft.email = self.identity.email.clone();
        }
        if draft.skills.len() > self.config.skills.max_count {
            // kept as saved; add_skill stays blocked until enough are removed
            warn!(
                "Saved progress has {} skills, more than the limit of {}",
                draft.skills.len(),
                self.config.skills.max_count
            );
        }

        info!(
            "Resuming onboarding at step {} ({} experiences, {} skills, completed: {})",
            snapshot.current_step,
            draft.experiences.len(),
            draft.skills.len(),
            snapshot.is_completed
        );

        self.draft = draft;
        self.current_step = snapshot.current_step;
        self.is_completed = snapshot.is_completed;
        self.last_saved_at = snapshot.updated_at;
    }

    fn ensure_editable(&self) -> Result<()> {
        match self.phase {
            Phase::Uninitialized => Err(OnboardError::NotReady),
            Phase::Hydrating => Err(OnboardError::Hydrating),
            Phase::Ready if self.is_completed => Err(OnboardError::Completed),
            Phase::Ready => Ok(()),
        }
    }

    /// A user edit landed: arm autosave and restart its quiet period.
    fn touched(&mut self) {
        self.dirty = true;
        self.autosave.on_mutation(Instant::now());
    }

    /// An explicit save that cancelled the autosave failed: put the autosave back.
    fn restore_autosave(&mut self) {
        if self.dirty {
            self.autosave.on_mutation(Instant::now());
        }
    }

    /// Report a rejected operation to the user and hand the error back.
    fn reject<T>(&mut self, err: OnboardError) -> Result<T> {
        self.set_error(err.to_string());
        Err(err)
    }

    pub fn edit_field(&mut self, field: AccountField, value: impl Into<String>) -> Result<()> {
        self.ensure_editable()?;
        let value = value.into();
        match field {
            AccountField::Summary => self.draft.summary = value,
            // identity fields are only editable when the identity left them blank
            AccountField::FullName if self.identity.full_name.trim().is_empty() => {
                self.draft.full_name = value;
            }
            AccountField::Email if self.identity.email.trim().is_empty() => {
                self.draft.email = value;
            }
            AccountField::FullName | AccountField::Email => {
                return self.reject(OnboardError::ReadOnlyField(field.name()));
            }
        }
        self.touched();
        Ok(())
    }

    /// Edit a field by its wire name.
    pub fn edit(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let field = match name.parse::<AccountField>() {
            Ok(field) => field,
            Err(e) => return self.reject(e),
        };
        self.edit_field(field, value)
    }

    /// Append an empty experience row and return its index.
    pub fn add_experience(&mut self) -> Result<usize> {
        self.ensure_editable()?;
        self.draft.experiences.push(Experience::default());
        self.touched();
        Ok(self.draft.experiences.len() - 1)
    }

    pub fn update_experience(&mut self, index: usize, patch: ExperiencePatch) -> Result<()> {
        self.ensure_editable()?;
        let Some(exp) = self.draft.experiences.get_mut(index) else {
            return self.reject(OnboardError::NoSuchExperience(index));
        };
        exp.apply(patch);
        self.touched();
        Ok(())
    }

    pub fn remove_experience(&mut self, index: usize) -> Result<Experience> {
        self.ensure_editable()?;
        if index >= self.draft.experiences.len() {
            return self.reject(OnboardError::NoSuchExperience(index));
        }
        let removed = self.draft.experiences.remove(index);
        self.touched();
        self.set_info("Experience removed".to_string());
        Ok(removed)
    }

    pub fn add_skill(&mut self, text: &str) -> Result<()> {
        self.ensure_editable()?;
        match validate_skill(text, &self.draft.skills, &self.config.skills) {
            Ok(skill) => {
                self.set_info(format!("Skill \"{skill}\" added"));
                self.draft.skills.push(skill);
                self.touched();
                Ok(())
            }
            Err(e) => self.reject(ValidationErrors::from(e).into()),
        }
    }

    /// Remove a skill by exact value. Returns whether it was present.
    pub fn remove_skill(&mut self, value: &str) -> Result<bool> {
        self.ensure_editable()?;
        let before = self.draft.skills.len();
        self.draft.skills.retain(|s| s != value);
        let removed = self.draft.skills.len() != before;
        if removed {
            self.touched();
        }
        Ok(removed)
    }

    /// Send `payload` to the store. On success the store's step and timestamp win.
    async fn save(&mut self, payload: SaveProgress) -> std::result::Result<(), StoreError> {
        debug!(
            "Saving progress at step {} (completed flag: {})",
            payload.current_step, payload.is_completed
        );
        self.saving = true;
        let result = self.store.save(&payload).await;
        self.saving = false;

        let snapshot = result?;
        self.current_step = snapshot.current_step;
        self.last_saved_at = Some(snapshot.updated_at.unwrap_or_else(Utc::now));
        self.dirty = false;
        Ok(())
    }

    /// Move one step forward or back, saving the draft at the target step.
    ///
    /// The step only changes once the store has accepted the save.
    pub async fn navigate(&mut self, direction: Direction) -> Result<StepId> {
        self.ensure_editable()?;

        let stripped = self.draft.strip_empty_experiences();
        if stripped > 0 {
            debug!("Dropped {stripped} empty experience rows before saving");
        }

        let step = self.current_step();
        if direction == Direction::Forward && !step.is_last() {
            if let Err(errors) = validate_step(
                step,
                &self.draft,
                &self.config.account,
                &self.config.experience,
            ) {
                debug!("Step {} failed validation: {errors}", step.short_name());
                return self.reject(errors.into());
            }
        }

        // the navigation save carries everything a pending autosave would
        self.autosave.cancel();

        let target = match direction {
            Direction::Forward => self.current_step.next(),
            Direction::Back => self.current_step.prev(),
        };
        let mut payload = encode(&self.draft, target);
        payload.is_completed = target.is_last();

        match self.save(payload).await {
            Ok(()) => {
                self.error = None;
                let now = self.current_step();
                info!("Moved to step {} ({})", now.index(), now.short_name());
                self.set_info("Progress saved".to_string());
                Ok(now)
            }
            Err(e) => {
                warn!("Failed to save progress: {e}");
                self.error = Some(e.to_string());
                self.restore_autosave();
                self.reject(e.into())
            }
        }
    }

    pub async fn go_next(&mut self) -> Result<StepId> {
        self.navigate(Direction::Forward).await
    }

    pub async fn go_back(&mut self) -> Result<StepId> {
        self.navigate(Direction::Back).await
    }

    /// Turn the draft into a permanent profile. The session is read-only afterwards.
    pub async fn finish(&mut self) -> Result<ProfileRecord> {
        self.ensure_editable()?;
        if let Some(errors) = missing_for_finish(&self.draft) {
            return self.reject(errors.into());
        }

        self.autosave.cancel();
        if self.dirty {
            // the store completes what it has, so unsaved edits go first
            let mut payload = encode(&self.draft, self.current_step);
            payload.is_completed = self.current_step.is_last();
            if let Err(e) = self.save(payload).await {
                warn!("Failed to save progress before completing: {e}");
                self.error = Some(e.to_string());
                self.restore_autosave();
                return self.reject(e.into());
            }
        }

        self.saving = true;
        let result = self.store.complete().await;
        self.saving = false;

        match result {
            Ok(profile) => {
                info!("Onboarding completed, profile {}", profile.id);
                self.is_completed = true;
                self.error = None;
                self.profile = Some(profile.clone());
                self.set_info("Profile completed".to_string());
                Ok(profile)
            }
            Err(e) => {
                warn!("Failed to complete onboarding: {e}");
                self.error = Some(e.to_string());
                self.reject(e.into())
            }
        }
    }

    /// Back to the state right after construction, e.g. on sign-out.
    pub fn reset(&mut self) {
        debug!("Resetting onboarding session");
        self.phase = Phase::Uninitialized;
        self.draft = Draft::for_identity(&self.identity);
        self.current_step = PersistedStep::FIRST;
        self.is_completed = false;
        self.last_saved_at = None;
        self.error = None;
        self.saving = false;
        self.dirty = false;
        self.autosave.reset();
        self.message = None;
        self.profile = None;
    }

    /// When the pending autosave is due, if one is pending.
    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    fn autosave_blocker(&self) -> Option<SuppressReason> {
        if self.phase != Phase::Ready {
            return Some(SuppressReason::Hydrating);
        }
        if !self.autosave.is_armed() {
            return Some(SuppressReason::NotArmed);
        }
        if self.is_completed {
            return Some(SuppressReason::Completed);
        }
        if self.draft.is_blank() {
            return Some(SuppressReason::EmptyDraft);
        }
        if self.draft.experiences.iter().any(Experience::is_empty) {
            return Some(SuppressReason::EmptyExperience);
        }
        if self.draft.experiences.iter().any(Experience::is_incomplete) {
            return Some(SuppressReason::IncompleteExperience);
        }
        None
    }

    /// Run the autosave if its quiet period has elapsed.
    ///
    /// Saves at the current step and never moves it. Failures are logged
    /// and reported in the outcome only.
    pub async fn run_autosave(&mut self) -> AutosaveOutcome {
        if !self.autosave.take_due(Instant::now()) {
            return AutosaveOutcome::NotDue;
        }
        if let Some(reason) = self.autosave_blocker() {
            debug!("Autosave skipped: {reason}");
            return AutosaveOutcome::Suppressed(reason);
        }

        let payload = encode(&self.draft, self.current_step);
        self.autosave.set_saving(true);
        let result = self.save(payload).await;
        self.autosave.set_saving(false);

        match result {
            Ok(()) => {
                debug!("Autosaved progress");
                AutosaveOutcome::Saved
            }
            Err(e) => {
                warn!("Autosave failed: {e}");
                AutosaveOutcome::Failed(e.to_string())
            }
        }
    }

    /// Apply a UI intent.
    pub async fn dispatch(&mut self, intent: Intent) -> Result<()> {
        match intent {
            Intent::EditField { field, value } => self.edit_field(field, value),
            Intent::AddExperience => self.add_experience().map(|_| ()),
            Intent::UpdateExperience { index, patch } => self.update_experience(index, patch),
            Intent::RemoveExperience(index) => self.remove_experience(index).map(|_| ()),
            Intent::AddSkill(text) => self.add_skill(&text),
            Intent::RemoveSkill(text) => self.remove_skill(&text).map(|_| ()),
            Intent::GoNext => self.go_next().await.map(|_| ()),
            Intent::GoBack => self.go_back().await.map(|_| ()),
            Intent::Finish => self.finish().await.map(|_| ()),
        }
    }

    fn step_results(&self) -> Vec<(StepId, StepResult)> {
        let current = self.current_step();
        StepId::ALL
            .iter()
            .map(|&step| {
                let result = if self.is_completed || step.index() < current.index() {
                    StepResult::Completed
                } else if step == current {
                    StepResult::Pending
                } else {
                    StepResult::Locked
                };
                (step, result)
            })
            .collect()
    }

    pub fn view(&self) -> SessionView<'_> {
        let step = self.current_step();
        SessionView {
            current_step_index: step.index(),
            step,
            steps: self.step_results(),
            draft: &self.draft,
            loading: self.phase == Phase::Hydrating,
            saving: self.saving,
            error: self.error.as_deref(),
            last_saved_display: self.last_saved_at.as_ref().map(format_saved_at),
            can_finish: self.can_finish(),
            is_completed: self.is_completed,
            has_progress: self.has_progress(),
            autosave: self.autosave.phase(),
        }
    }

    /// Persisted step the next save would be written at.
    pub fn persisted_step(&self) -> PersistedStep {
        to_persisted(self.current_step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboard::validation::Field;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Store double that records calls and replays queued responses
    #[derive(Default)]
    struct ScriptedStore {
        snapshot: Mutex<Option<Value>>,
        load_error: Mutex<Option<StoreError>>,
        save_errors: Mutex<VecDeque<StoreError>>,
        complete_error: Mutex<Option<StoreError>>,
        saves: Mutex<Vec<SaveProgress>>,
        completes: Mutex<usize>,
    }

    impl ScriptedStore {
        fn with_snapshot(value: Value) -> Arc<Self> {
            let store = Self::default();
            *store.snapshot.lock().unwrap() = Some(value);
            Arc::new(store)
        }

        fn saves(&self) -> Vec<SaveProgress> {
            self.saves.lock().unwrap().clone()
        }

        fn completes(&self) -> usize {
            *self.completes.lock().unwrap()
        }

        fn fail_next_save(&self, err: StoreError) {
            self.save_errors.lock().unwrap().push_back(err);
        }
    }

    #[async_trait]
    impl ProgressStore for ScriptedStore {
        async fn load(&self) -> std::result::Result<Snapshot, StoreError> {
            if let Some(err) = self.load_error.lock().unwrap().take() {
                return Err(err);
            }
            match self.snapshot.lock().unwrap().clone() {
                Some(value) => Ok(Snapshot::from_json(value)?),
                None => Err(StoreError::NotFound),
            }
        }

        async fn save(&self, progress: &SaveProgress) -> std::result::Result<Snapshot, StoreError> {
            self.saves.lock().unwrap().push(progress.clone());
            if let Some(err) = self.save_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(Snapshot {
                current_step: progress.current_step,
                is_completed: false,
                updated_at: Some(Utc::now()),
                data: serde_json::to_value(&progress.data).unwrap(),
            })
        }

        async fn complete(&self) -> std::result::Result<ProfileRecord, StoreError> {
            *self.completes.lock().unwrap() += 1;
            if let Some(err) = self.complete_error.lock().unwrap().take() {
                return Err(err);
            }
            Ok(ProfileRecord {
                id: "profile-1".into(),
                full_name: "Ana".into(),
                summary: String::new(),
                skills: vec![],
                experiences: vec![],
                educations: vec![],
            })
        }
    }

    fn identity() -> Identity {
        Identity {
            full_name: "Ana".into(),
            email: "ana@example.com".into(),
        }
    }

    fn session_with(store: Arc<ScriptedStore>) -> OnboardingSession {
        OnboardingSession::new(OnboardConfig::default(), identity(), store)
    }

    async fn fresh_session() -> (OnboardingSession, Arc<ScriptedStore>) {
        let store = Arc::new(ScriptedStore::default());
        let mut session = session_with(store.clone());
        assert_eq!(session.load().await, LoadOutcome::Fresh);
        (session, store)
    }

    fn complete_experience(session: &mut OnboardingSession) -> usize {
        let index = session.add_experience().unwrap();
        session
            .update_experience(
                index,
                ExperiencePatch {
                    job_title: Some("Backend Developer".into()),
                    company: Some("Acme".into()),
                    description: Some("Built and ran the billing pipeline".into()),
                    start_date: Some(Some("2021-03".parse().unwrap())),
                    ..ExperiencePatch::default()
                },
            )
            .unwrap();
        index
    }

    #[tokio::test]
    async fn resume_flow_lands_on_saved_step() {
        let store = ScriptedStore::with_snapshot(json!({
            "currentStep": 2,
            "isCompleted": false,
            "data": {
                "summary": "abc",
                "experience": [{
                    "role": "Dev",
                    "company": "Acme",
                    "startDate": "2022-01-01T00:00:00Z",
                    "endDate": null
                }]
            }
        }));
        let mut session = session_with(store);

        assert_eq!(session.load().await, LoadOutcome::Resumed);
        let view = session.view();
        assert_eq!(view.current_step_index, 1);
        assert_eq!(view.draft.experiences.len(), 1);
        assert!(view.draft.experiences[0].is_current);
        assert!(view.draft.experiences[0].end_date.is_none());
        assert_eq!(view.draft.full_name, "Ana");
        assert!(!session.autosave_armed());
    }

    #[tokio::test]
    async fn first_time_user_gets_empty_draft_without_error() {
        let (session, _) = fresh_session().await;
        assert!(session.error().is_none());
        assert_eq!(session.current_step(), StepId::Account);
        assert_eq!(session.draft().email, "ana@example.com");
        assert!(!session.has_progress());
    }

    #[tokio::test]
    async fn load_failure_sets_error_and_empty_draft() {
        let store = Arc::new(ScriptedStore::default());
        *store.load_error.lock().unwrap() = Some(StoreError::Unavailable("offline".into()));
        let mut session = session_with(store);

        assert_eq!(session.load().await, LoadOutcome::Failed);
        assert_eq!(session.phase(), Phase::Ready);
        assert!(session.error().unwrap().contains("offline"));
        assert!(session.draft().is_blank());

        session.clear_error();
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn mutations_before_load_are_refused() {
        let mut session = session_with(Arc::new(ScriptedStore::default()));
        assert!(matches!(
            session.add_skill("Rust"),
            Err(OnboardError::NotReady)
        ));
        assert!(matches!(
            session.go_next().await,
            Err(OnboardError::NotReady)
        ));
    }

    #[tokio::test]
    async fn forward_navigation_saves_at_next_persisted_step() {
        let (mut session, store) = fresh_session().await;
        session
            .edit_field(AccountField::Summary, "Ten years of backend work")
            .unwrap();

        let step = session.go_next().await.unwrap();
        assert_eq!(step, StepId::Experience);
        assert_eq!(session.view().current_step_index, 1);

        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].current_step.get(), 2);
        assert!(!saves[0].is_completed);
        assert!(session.last_saved_at().is_some());
    }

    #[tokio::test]
    async fn invalid_step_blocks_navigation_without_saving() {
        let (mut session, store) = fresh_session().await;
        session.edit_field(AccountField::Summary, "short").unwrap();

        let err = session.go_next().await.unwrap_err();
        match err {
            OnboardError::Validation(errors) => assert!(errors.has(&Field::Summary)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.saves().is_empty());
        assert_eq!(session.current_step(), StepId::Account);
        assert!(session.take_message().unwrap().is_error);
    }

    #[tokio::test]
    async fn failed_save_keeps_the_step() {
        let (mut session, store) = fresh_session().await;
        session
            .edit_field(AccountField::Summary, "Ten years of backend work")
            .unwrap();
        store.fail_next_save(StoreError::Rejected(vec!["bad".into(), "worse".into()]));

        assert!(session.go_next().await.is_err());
        assert_eq!(session.current_step(), StepId::Account);
        assert_eq!(session.error(), Some("bad, worse"));
        assert!(!session.is_saving());

        // retry succeeds and clears the error
        session.go_next().await.unwrap();
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn reaching_review_flags_the_save_but_not_the_session() {
        let (mut session, store) = fresh_session().await;
        session
            .edit_field(AccountField::Summary, "Ten years of backend work")
            .unwrap();
        session.go_next().await.unwrap();
        complete_experience(&mut session);
        session.add_experience().unwrap();

        assert_eq!(session.go_next().await.unwrap(), StepId::Review);
        let last = store.saves().pop().unwrap();
        assert_eq!(last.current_step, PersistedStep::LAST);
        assert!(last.is_completed);
        // empty row was stripped
        assert_eq!(last.data.experiences.len(), 1);
        assert_eq!(session.draft().experiences.len(), 1);
        assert!(!session.is_completed());

        assert_eq!(session.go_back().await.unwrap(), StepId::Experience);
        assert_eq!(store.saves().pop().unwrap().current_step.get(), 2);
    }

    #[tokio::test]
    async fn back_from_first_step_stays_put() {
        let (mut session, store) = fresh_session().await;
        assert_eq!(session.go_back().await.unwrap(), StepId::Account);
        assert_eq!(store.saves()[0].current_step, PersistedStep::FIRST);
    }

    #[tokio::test]
    async fn finish_is_blocked_without_name() {
        let store = Arc::new(ScriptedStore::default());
        let mut session = OnboardingSession::new(
            OnboardConfig::default(),
            Identity::default(),
            store.clone(),
        );
        session.load().await;
        session.add_skill("SQL").unwrap();

        let err = session.finish().await.unwrap_err();
        match err {
            OnboardError::Validation(errors) => assert!(errors.has(&Field::FullName)),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.completes(), 0);
        assert!(!session.is_completed());
    }

    #[tokio::test]
    async fn finish_needs_experience_or_skill() {
        let (mut session, store) = fresh_session().await;
        let err = session.finish().await.unwrap_err();
        assert!(matches!(err, OnboardError::Validation(e) if e.has(&Field::ProfileContent)));
        assert_eq!(store.completes(), 0);
    }

    #[tokio::test]
    async fn finish_flushes_edits_then_locks_the_session() {
        let (mut session, store) = fresh_session().await;
        session.add_skill("SQL").unwrap();

        let profile = session.finish().await.unwrap();
        assert_eq!(profile.id, "profile-1");
        assert_eq!(store.saves().len(), 1);
        assert_eq!(store.completes(), 1);
        assert!(session.is_completed());
        assert!(session.view().steps.iter().all(|(_, r)| *r == StepResult::Completed));

        assert!(matches!(
            session.add_skill("Rust"),
            Err(OnboardError::Completed)
        ));
        assert!(matches!(
            session.finish().await,
            Err(OnboardError::Completed)
        ));
    }

    #[tokio::test]
    async fn finish_failure_is_surfaced() {
        let (mut session, store) = fresh_session().await;
        session.add_skill("SQL").unwrap();
        *store.complete_error.lock().unwrap() = Some(StoreError::Unavailable("down".into()));

        assert!(session.finish().await.is_err());
        assert!(!session.is_completed());
        assert!(session.error().unwrap().contains("down"));
    }

    #[tokio::test]
    async fn skill_rejections_report_reasons() {
        let (mut session, _) = fresh_session().await;
        session.add_skill("SQL").unwrap();
        assert!(!session.take_message().unwrap().is_error);

        assert!(session.add_skill("SQL").is_err());
        let message = session.take_message().unwrap();
        assert!(message.is_error);
        assert_eq!(message.text, "skill was already added");

        assert!(session.add_skill("C").is_err());
        assert_eq!(
            session.take_message().unwrap().text,
            "skill must be at least 2 characters"
        );

        assert!(session.remove_skill("SQL").unwrap());
        assert!(!session.remove_skill("SQL").unwrap());
    }

    #[tokio::test]
    async fn identity_fields_are_read_only() {
        let (mut session, _) = fresh_session().await;
        assert!(matches!(
            session.edit("fullName", "Someone Else"),
            Err(OnboardError::ReadOnlyField("fullName"))
        ));
        assert!(matches!(
            session.edit("nickname", "x"),
            Err(OnboardError::UnknownField(_))
        ));
        assert_eq!(session.draft().full_name, "Ana");
    }

    #[tokio::test]
    async fn current_flag_clears_end_date_in_payload() {
        let (mut session, store) = fresh_session().await;
        let index = complete_experience(&mut session);
        session
            .update_experience(
                index,
                ExperiencePatch {
                    end_date: Some(Some("2023-01".parse().unwrap())),
                    is_current: Some(true),
                    ..ExperiencePatch::default()
                },
            )
            .unwrap();
        session.add_skill("SQL").unwrap();
        session.finish().await.unwrap();

        let saved = &store.saves()[0];
        assert_eq!(saved.data.experiences[0].end_date, None);
    }

    #[tokio::test]
    async fn experience_index_out_of_range() {
        let (mut session, _) = fresh_session().await;
        assert!(matches!(
            session.remove_experience(3),
            Err(OnboardError::NoSuchExperience(3))
        ));
        assert!(matches!(
            session.update_experience(0, ExperiencePatch::default()),
            Err(OnboardError::NoSuchExperience(0))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_fires_after_quiet_period_at_current_step() {
        let (mut session, store) = fresh_session().await;
        assert_eq!(session.run_autosave().await, AutosaveOutcome::NotDue);

        session.edit_field(AccountField::Summary, "Draft sum").unwrap();
        assert!(session.autosave_armed());

        tokio::time::advance(Duration::from_secs(4)).await;
        session.edit_field(AccountField::Summary, "Draft summary").unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(session.run_autosave().await, AutosaveOutcome::NotDue);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(session.run_autosave().await, AutosaveOutcome::Saved);

        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].current_step, PersistedStep::FIRST);
        assert!(!saves[0].is_completed);
        assert_eq!(saves[0].data.summary, "Draft summary");
        assert_eq!(session.current_step(), StepId::Account);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_skips_incomplete_experience() {
        let (mut session, store) = fresh_session().await;
        let index = complete_experience(&mut session);
        session
            .update_experience(
                index,
                ExperiencePatch {
                    company: Some(String::new()),
                    ..ExperiencePatch::default()
                },
            )
            .unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(
            session.run_autosave().await,
            AutosaveOutcome::Suppressed(SuppressReason::IncompleteExperience)
        );
        assert!(store.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_skips_empty_rows_and_blank_drafts() {
        let (mut session, store) = fresh_session().await;
        session.add_experience().unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(
            session.run_autosave().await,
            AutosaveOutcome::Suppressed(SuppressReason::EmptyDraft)
        );

        session.add_skill("SQL").unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(
            session.run_autosave().await,
            AutosaveOutcome::Suppressed(SuppressReason::EmptyExperience)
        );
        assert!(store.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_failure_is_silent() {
        let (mut session, store) = fresh_session().await;
        session.add_skill("SQL").unwrap();
        session.take_message();
        store.fail_next_save(StoreError::Unavailable("timeout".into()));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(matches!(
            session.run_autosave().await,
            AutosaveOutcome::Failed(_)
        ));
        assert!(session.error().is_none());
        assert!(session.take_message().is_none());
        assert_eq!(session.view().autosave, AutosavePhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_cancels_pending_autosave() {
        let (mut session, store) = fresh_session().await;
        session
            .edit_field(AccountField::Summary, "Ten years of backend work")
            .unwrap();
        assert!(session.autosave_deadline().is_some());

        session.go_next().await.unwrap();
        assert!(session.autosave_deadline().is_none());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(session.run_autosave().await, AutosaveOutcome::NotDue);
        assert_eq!(store.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_navigation_keeps_edits_queued_for_autosave() {
        let (mut session, store) = fresh_session().await;
        session
            .edit_field(AccountField::Summary, "Ten years of backend work")
            .unwrap();
        store.fail_next_save(StoreError::Unavailable("timeout".into()));

        assert!(session.go_next().await.is_err());
        assert!(session.autosave_deadline().is_some());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(session.run_autosave().await, AutosaveOutcome::Saved);
        let saves = store.saves();
        assert_eq!(saves.len(), 2);
        assert_eq!(saves[1].current_step, PersistedStep::FIRST);
        assert_eq!(saves[1].data.summary, "Ten years of backend work");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_before_finish_keeps_edits_queued() {
        let (mut session, store) = fresh_session().await;
        session.add_skill("SQL").unwrap();
        store.fail_next_save(StoreError::Unavailable("timeout".into()));

        assert!(session.finish().await.is_err());
        assert_eq!(store.completes(), 0);
        assert!(session.autosave_deadline().is_some());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(session.run_autosave().await, AutosaveOutcome::Saved);
    }

    #[tokio::test]
    async fn hydration_does_not_arm_autosave() {
        let store = ScriptedStore::with_snapshot(json!({
            "currentStep": 1,
            "data": { "summary": "Resumed summary", "skills": ["SQL"] }
        }));
        let mut session = session_with(store);
        session.load().await;

        assert!(!session.autosave_armed());
        assert!(session.autosave_deadline().is_none());
        assert!(session.has_progress());
    }

    #[tokio::test]
    async fn hydrated_skills_are_unique_and_limit_still_applies() {
        let mut skills: Vec<String> = (0..22).map(|i| format!("skill-{i}")).collect();
        skills.push("skill-0".into());
        let store = ScriptedStore::with_snapshot(json!({
            "currentStep": 1,
            "data": { "skills": skills }
        }));
        let mut session = session_with(store);
        session.load().await;

        assert_eq!(session.draft().skills.len(), 22);
        let err = session.add_skill("Rust").unwrap_err();
        assert!(matches!(err, OnboardError::Validation(e) if e.has(&Field::Skill)));
    }

    #[tokio::test]
    async fn completed_snapshot_is_read_only() {
        let store = ScriptedStore::with_snapshot(json!({
            "currentStep": 3,
            "isCompleted": true,
            "data": { "skills": ["SQL"] }
        }));
        let mut session = session_with(store);
        session.load().await;

        assert!(session.is_completed());
        assert!(!session.has_progress());
        assert!(matches!(
            session.go_back().await,
            Err(OnboardError::Completed)
        ));
    }

    #[tokio::test]
    async fn reset_returns_to_initial_state() {
        let (mut session, _) = fresh_session().await;
        session.add_skill("SQL").unwrap();
        session.reset();

        assert_eq!(session.phase(), Phase::Uninitialized);
        assert!(session.draft().skills.is_empty());
        assert!(!session.autosave_armed());
        assert!(session.take_message().is_none());
        assert!(matches!(session.add_skill("SQL"), Err(OnboardError::NotReady)));
    }

    #[tokio::test]
    async fn dispatch_routes_intents() {
        let (mut session, store) = fresh_session().await;
        session
            .dispatch(Intent::EditField {
                field: AccountField::Summary,
                value: "Ten years of backend work".into(),
            })
            .await
            .unwrap();
        session
            .dispatch(Intent::AddSkill("Rust".into()))
            .await
            .unwrap();
        session.dispatch(Intent::GoNext).await.unwrap();

        let view = session.view();
        assert_eq!(view.current_step_index, 1);
        assert!(view.can_finish);
        assert!(view.last_saved_display.is_some());
        assert_eq!(
            view.steps,
            vec![
                (StepId::Account, StepResult::Completed),
                (StepId::Experience, StepResult::Pending),
                (StepId::Review, StepResult::Locked),
            ]
        );
        assert_eq!(store.saves()[0].data.skills, vec!["Rust"]);
    }

    #[test]
    fn saved_at_display_format() {
        let at = Utc::now();
        let shown = format_saved_at(&at);
        // dd/mm/YYYY HH:MM
        assert_eq!(shown.len(), 16);
        assert_eq!(&shown[2..3], "/");
        assert_eq!(&shown[13..14], ":");
    }
}
