//! Attempt stores: an in-process map, and a JSON file shared between
//! processes.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use fd_lock::RwLock;
use uuid::Uuid;

use crate::error::{PolicyViolation, StoreError};
use crate::model::Attempt;
use crate::traits::{AttemptStore, MarkOutcome, Submission};

/// Attempt store backed by a mutex-guarded map.
///
/// Quota checks, attempt creation, and the submitted-at check-and-set each
/// run under a single lock acquisition, so concurrent callers observe them
/// atomically.
#[derive(Debug, Default)]
pub struct InMemoryAttemptStore {
    attempts: Mutex<HashMap<Uuid, Attempt>>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attempts(attempts: impl IntoIterator<Item = Attempt>) -> Self {
        Self {
            attempts: Mutex::new(attempts.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    /// Load a snapshot written by [`save_json`](Self::save_json). A missing
    /// file yields an empty store.
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read attempt store from {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        let attempts: Vec<Attempt> =
            serde_json::from_str(&content).context("failed to parse attempt store JSON")?;
        Ok(Self::from_attempts(attempts))
    }

    /// Write every attempt as a JSON array, oldest first.
    ///
    /// The snapshot goes to a sibling temporary file first and is renamed
    /// over `path`, so readers never see a half-written store.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let attempts = self.snapshot().map_err(anyhow::Error::from)?;
        let json =
            serde_json::to_string_pretty(&attempts).context("failed to serialize attempts")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = sibling(path, ".tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write attempt store to {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace attempt store at {}", path.display()))?;
        Ok(())
    }

    /// All attempts ordered by start time.
    pub fn snapshot(&self) -> Result<Vec<Attempt>, StoreError> {
        let mut attempts: Vec<Attempt> = self.lock()?.values().cloned().collect();
        attempts.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then(a.attempt_number.cmp(&b.attempt_number))
        });
        Ok(attempts)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Attempt>>, StoreError> {
        self.attempts
            .lock()
            .map_err(|_| StoreError::Backend("attempt store lock poisoned".into()))
    }

    fn create(
        &self,
        user_id: &str,
        lesson_id: &str,
        quiz_version: u32,
        max_attempts: u32,
    ) -> Result<Attempt, StoreError> {
        let mut attempts = self.lock()?;

        let mut used = 0u32;
        for attempt in attempts.values() {
            if attempt.user_id != user_id || attempt.lesson_id != lesson_id {
                continue;
            }
            if !attempt.is_submitted() {
                tracing::info!(attempt = %attempt.id, user_id, lesson_id, "resuming attempt");
                return Ok(attempt.clone());
            }
            used += 1;
        }

        if max_attempts > 0 && used >= max_attempts {
            return Err(PolicyViolation::QuotaExceeded { max_attempts, used }.into());
        }

        let attempt = Attempt::new(lesson_id, user_id, quiz_version, used + 1);
        tracing::info!(
            attempt = %attempt.id,
            user_id,
            lesson_id,
            attempt_number = attempt.attempt_number,
            "created attempt"
        );
        attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    fn count(&self, user_id: &str, lesson_id: &str) -> Result<u32, StoreError> {
        let attempts = self.lock()?;
        Ok(attempts
            .values()
            .filter(|a| a.user_id == user_id && a.lesson_id == lesson_id)
            .count() as u32)
    }

    fn get(&self, attempt_id: Uuid) -> Result<Option<Attempt>, StoreError> {
        Ok(self.lock()?.get(&attempt_id).cloned())
    }

    fn mark(&self, attempt_id: Uuid, submission: Submission) -> Result<MarkOutcome, StoreError> {
        let mut attempts = self.lock()?;
        let attempt = attempts
            .get_mut(&attempt_id)
            .ok_or(StoreError::NotFound(attempt_id))?;

        if attempt.is_submitted() {
            // A submitted attempt always carries its grade.
            let grade = attempt
                .grade
                .clone()
                .ok_or_else(|| StoreError::Backend(format!("attempt {attempt_id} has no grade")))?;
            return Ok(MarkOutcome::AlreadySubmitted(grade));
        }

        attempt.record_submission(submission);
        Ok(MarkOutcome::Recorded(attempt.clone()))
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn create_attempt(
        &self,
        user_id: &str,
        lesson_id: &str,
        quiz_version: u32,
        max_attempts: u32,
    ) -> Result<Attempt, StoreError> {
        self.create(user_id, lesson_id, quiz_version, max_attempts)
    }

    async fn count_attempts(&self, user_id: &str, lesson_id: &str) -> Result<u32, StoreError> {
        self.count(user_id, lesson_id)
    }

    async fn get_attempt(&self, attempt_id: Uuid) -> Result<Option<Attempt>, StoreError> {
        self.get(attempt_id)
    }

    async fn mark_submitted(
        &self,
        attempt_id: Uuid,
        submission: Submission,
    ) -> Result<MarkOutcome, StoreError> {
        self.mark(attempt_id, submission)
    }
}

/// Attempt store kept in a JSON file that several processes may share.
///
/// Every operation takes an exclusive lock on a sidecar `<file>.lock`,
/// re-reads the snapshot, applies the change, and writes the file back
/// before the lock is released. Quotas and the first-submission-wins rule
/// therefore hold across separate `lessonquiz take` runs, not just within
/// one.
#[derive(Debug, Clone)]
pub struct FileAttemptStore {
    path: PathBuf,
}

impl FileAttemptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current on-disk contents, read under the lock.
    pub fn snapshot(&self) -> Result<Vec<Attempt>, StoreError> {
        locked(&self.path, |store| Ok((store.snapshot()?, false)))
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&InMemoryAttemptStore) -> Result<(T, bool), StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || locked(&path, op))
            .await
            .map_err(|e| StoreError::Backend(format!("attempt store task failed: {e}")))?
    }
}

/// Apply `op` to the snapshot at `path` while holding the file lock. `op`
/// returns its value and whether the snapshot changed and must be saved.
fn locked<T>(
    path: &Path,
    op: impl FnOnce(&InMemoryAttemptStore) -> Result<(T, bool), StoreError>,
) -> Result<T, StoreError> {
    let backend = |e: anyhow::Error| StoreError::Backend(format!("{e:#}"));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))
            .map_err(backend)?;
    }
    let lock_path = sibling(path, ".lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("failed to open {}", lock_path.display()))
        .map_err(backend)?;
    let mut lock = RwLock::new(file);
    let _guard = lock
        .write()
        .with_context(|| format!("failed to lock {}", lock_path.display()))
        .map_err(backend)?;

    let store = InMemoryAttemptStore::load_json(path).map_err(backend)?;
    let (value, changed) = op(&store)?;
    if changed {
        store.save_json(path).map_err(backend)?;
    }
    Ok(value)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[async_trait]
impl AttemptStore for FileAttemptStore {
    async fn create_attempt(
        &self,
        user_id: &str,
        lesson_id: &str,
        quiz_version: u32,
        max_attempts: u32,
    ) -> Result<Attempt, StoreError> {
        let (user_id, lesson_id) = (user_id.to_string(), lesson_id.to_string());
        self.run(move |store| {
            let attempt = store.create(&user_id, &lesson_id, quiz_version, max_attempts)?;
            Ok((attempt, true))
        })
        .await
    }

    async fn count_attempts(&self, user_id: &str, lesson_id: &str) -> Result<u32, StoreError> {
        let (user_id, lesson_id) = (user_id.to_string(), lesson_id.to_string());
        self.run(move |store| Ok((store.count(&user_id, &lesson_id)?, false)))
            .await
    }

    async fn get_attempt(&self, attempt_id: Uuid) -> Result<Option<Attempt>, StoreError> {
        self.run(move |store| Ok((store.get(attempt_id)?, false))).await
    }

    async fn mark_submitted(
        &self,
        attempt_id: Uuid,
        submission: Submission,
    ) -> Result<MarkOutcome, StoreError> {
        self.run(move |store| {
            let outcome = store.mark(attempt_id, submission)?;
            let changed = matches!(outcome, MarkOutcome::Recorded(_));
            Ok((outcome, changed))
        })
        .await
    }
}
