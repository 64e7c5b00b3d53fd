//! Orchestrates the analyze workflow and the history view.
//!
//! A submit runs image load, inference, save and history refresh in that
//! order. Only one submit may be in flight per analyzer; a second call gets
//! [`AnalyzerError::Busy`]. Results are published on watch channels that
//! front ends subscribe to.

use log::{error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

use crate::database::{AnalysisStore, DatabaseError};
use crate::food::image::{ImageError, ImageStore};
use crate::food::prompt::{format_response, ANALYSIS_INSTRUCTION, FAILURE_PLACEHOLDER};
use crate::food::record::{AnalysisRecord, NewAnalysisRecord};
use crate::providers::traits::InferenceProvider;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("An analysis is already in progress")]
    Busy,
    #[error("Image error: {0}")]
    Image(#[from] ImageError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
    #[error("Analysis was cancelled")]
    Cancelled,
    #[error("Analysis task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum WorkflowStatus {
    Idle,
    Submitting,
    Persisting,
    Completed { id: String },
    InferenceFailed(String),
    PersistFailed(String),
}

impl WorkflowStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, WorkflowStatus::Submitting | WorkflowStatus::Persisting)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Inference and save both succeeded.
    Saved { record: AnalysisRecord },
    /// Inference succeeded but the record could not be stored.
    NotSaved { result_text: String, error: String },
    InferenceFailed { error: String },
}

impl SubmitOutcome {
    /// The text shown to the user for this outcome.
    pub fn display_text(&self) -> &str {
        match self {
            SubmitOutcome::Saved { record } => &record.result_text,
            SubmitOutcome::NotSaved { result_text, .. } => result_text,
            SubmitOutcome::InferenceFailed { .. } => FAILURE_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub history_limit: usize,
    /// Extra save attempts after the first one fails.
    pub persist_retries: u32,
    pub retry_delay: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            persist_retries: 1,
            retry_delay: Duration::from_millis(500),
        }
    }
}

struct Inner {
    inference: Arc<dyn InferenceProvider>,
    store: Arc<dyn AnalysisStore>,
    images: Arc<dyn ImageStore>,
    config: AnalyzerConfig,
    current_result: watch::Sender<Option<String>>,
    history: watch::Sender<Vec<AnalysisRecord>>,
    status: watch::Sender<WorkflowStatus>,
    submitting: AtomicBool,
}

/// Aborts every spawned workflow when the last analyzer handle goes away.
#[derive(Default)]
struct TaskScope {
    tasks: Mutex<Vec<AbortHandle>>,
}

impl TaskScope {
    fn track(&self, handle: AbortHandle) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }

    fn abort_all(&self) {
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Releases the submit slot even if the workflow future is dropped mid-way.
struct SubmitGuard<'a> {
    inner: &'a Inner,
}

impl<'a> SubmitGuard<'a> {
    fn acquire(inner: &'a Inner) -> Option<Self> {
        inner
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { inner })
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.inner.status.send_if_modified(|status| {
            if status.is_in_flight() {
                *status = WorkflowStatus::Idle;
                true
            } else {
                false
            }
        });
        self.inner.submitting.store(false, Ordering::Release);
    }
}

/// Outcome recorded once the record is stored, so a cancel after that point
/// still reports the save.
type SavedSlot = Arc<Mutex<Option<SubmitOutcome>>>;

/// A spawned submit workflow.
pub struct WorkflowHandle {
    handle: JoinHandle<Result<SubmitOutcome, AnalyzerError>>,
    saved: SavedSlot,
}

impl WorkflowHandle {
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Waits for the workflow. Must not be called again once it has returned.
    pub async fn wait(&mut self) -> Result<SubmitOutcome, AnalyzerError> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => match self.saved.lock().clone() {
                Some(outcome) => Ok(outcome),
                None => Err(AnalyzerError::Cancelled),
            },
            Err(e) => Err(AnalyzerError::Task(e.to_string())),
        }
    }

    pub async fn join(mut self) -> Result<SubmitOutcome, AnalyzerError> {
        self.wait().await
    }
}

#[derive(Clone)]
pub struct FoodAnalyzer {
    inner: Arc<Inner>,
    scope: Arc<TaskScope>,
}

impl FoodAnalyzer {
    pub fn new(
        inference: Arc<dyn InferenceProvider>,
        store: Arc<dyn AnalysisStore>,
        images: Arc<dyn ImageStore>,
        config: AnalyzerConfig,
    ) -> Self {
        let (current_result, _) = watch::channel(None);
        let (history, _) = watch::channel(Vec::new());
        let (status, _) = watch::channel(WorkflowStatus::Idle);

        Self {
            inner: Arc::new(Inner {
                inference,
                store,
                images,
                config,
                current_result,
                history,
                status,
                submitting: AtomicBool::new(false),
            }),
            scope: Arc::new(TaskScope::default()),
        }
    }

    pub fn current_result(&self) -> watch::Receiver<Option<String>> {
        self.inner.current_result.subscribe()
    }

    pub fn history(&self) -> watch::Receiver<Vec<AnalysisRecord>> {
        self.inner.history.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<WorkflowStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_submitting(&self) -> bool {
        self.inner.submitting.load(Ordering::Acquire)
    }

    /// Copies a picked file into the image store and returns its durable reference.
    pub async fn import_image(&self, path: &Path) -> Result<String, AnalyzerError> {
        Ok(self.inner.images.store(path).await?)
    }

    pub async fn analyze_file(&self, path: &Path) -> Result<SubmitOutcome, AnalyzerError> {
        let image_ref = self.import_image(path).await?;
        self.submit_image(&image_ref).await
    }

    pub async fn submit_image(&self, image_ref: &str) -> Result<SubmitOutcome, AnalyzerError> {
        self.inner.submit_image(image_ref, &SavedSlot::default()).await
    }

    /// Runs [`submit_image`](Self::submit_image) as a task owned by this analyzer.
    pub fn spawn_submit(&self, image_ref: impl Into<String>) -> WorkflowHandle {
        let inner = Arc::clone(&self.inner);
        let image_ref = image_ref.into();
        let saved = SavedSlot::default();
        let slot = Arc::clone(&saved);
        let handle = tokio::spawn(async move { inner.submit_image(&image_ref, &slot).await });
        self.scope.track(handle.abort_handle());
        WorkflowHandle { handle, saved }
    }

    pub async fn load_history(&self) -> Result<Vec<AnalysisRecord>, AnalyzerError> {
        self.inner.load_history().await
    }

    /// Deletes a record and always refreshes history afterwards.
    pub async fn delete_record(&self, id: &str) -> Result<(), AnalyzerError> {
        let deleted = self.inner.store.delete(id).await;
        if let Err(e) = &deleted {
            warn!("Failed to delete analysis {}: {}", id, e);
        }

        if let Err(e) = self.inner.load_history().await {
            warn!("History refresh after delete failed: {}", e);
        }

        deleted?;
        info!("Deleted analysis {}", id);
        Ok(())
    }

    pub fn clear_current_result(&self) {
        self.inner.current_result.send_replace(None);
        self.inner.status.send_if_modified(|status| {
            if status.is_in_flight() || *status == WorkflowStatus::Idle {
                false
            } else {
                *status = WorkflowStatus::Idle;
                true
            }
        });
    }

    /// Aborts all spawned workflows.
    pub fn shutdown(&self) {
        self.scope.abort_all();
    }
}

impl Inner {
    async fn submit_image(
        &self,
        image_ref: &str,
        saved: &Mutex<Option<SubmitOutcome>>,
    ) -> Result<SubmitOutcome, AnalyzerError> {
        let _guard = SubmitGuard::acquire(self).ok_or(AnalyzerError::Busy)?;
        self.status.send_replace(WorkflowStatus::Submitting);
        info!("Analyzing image {}", image_ref);

        let result_text = match self.infer(image_ref).await {
            Ok(text) => text,
            Err(reason) => {
                warn!("Analysis of {} failed: {}", image_ref, reason);
                self.current_result
                    .send_replace(Some(FAILURE_PLACEHOLDER.to_string()));
                self.status
                    .send_replace(WorkflowStatus::InferenceFailed(reason.clone()));
                return Ok(SubmitOutcome::InferenceFailed { error: reason });
            }
        };

        self.current_result.send_replace(Some(result_text.clone()));
        self.status.send_replace(WorkflowStatus::Persisting);

        let new_record = NewAnalysisRecord::new(image_ref, result_text.clone());
        let id = match self.persist(new_record.clone()).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to save analysis of {}: {}", image_ref, e);
                self.status
                    .send_replace(WorkflowStatus::PersistFailed(e.to_string()));
                return Ok(SubmitOutcome::NotSaved {
                    result_text,
                    error: e.to_string(),
                });
            }
        };

        let outcome = SubmitOutcome::Saved {
            record: new_record.with_id(id.clone()),
        };
        *saved.lock() = Some(outcome.clone());
        self.status.send_replace(WorkflowStatus::Completed { id });

        if let Err(e) = self.load_history().await {
            warn!("History refresh after save failed: {}", e);
        }

        Ok(outcome)
    }

    /// Loads the image and asks the model about it; errors come back as a message.
    async fn infer(&self, image_ref: &str) -> Result<String, String> {
        let image = self
            .images
            .load(image_ref)
            .await
            .map_err(|e| e.to_string())?;

        let raw = self
            .inference
            .analyze_image(&image, ANALYSIS_INSTRUCTION)
            .await
            .map_err(|e| e.to_string())?;

        let formatted = format_response(&raw);
        if formatted.is_empty() {
            return Err("model returned an empty report".to_string());
        }
        Ok(formatted)
    }

    async fn persist(&self, record: NewAnalysisRecord) -> Result<String, DatabaseError> {
        let mut attempt = 0;
        loop {
            match self.store.create(record.clone()).await {
                Ok(id) => return Ok(id),
                Err(e) if attempt < self.config.persist_retries => {
                    attempt += 1;
                    warn!(
                        "Save attempt {} failed: {}; retrying in {:?}",
                        attempt, e, self.config.retry_delay
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn load_history(&self) -> Result<Vec<AnalysisRecord>, AnalyzerError> {
        match self.store.list_recent(self.config.history_limit).await {
            Ok(records) => {
                self.history.send_replace(records.clone());
                Ok(records)
            }
            Err(e) => {
                warn!("Failed to load analysis history: {}", e);
                Err(e.into())
            }
        }
    }
}
