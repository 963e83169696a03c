//! Project list view state
//!
//! `ProjectModel` owns one subscription to the repository's project stream
//! for as long as the screen is attached. Each emission is mapped off the
//! async thread and replaces the published state wholesale.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{DecodeError, RepositoryError};
use crate::project::{map_projects, PresentationSample, ProjectRecord};
use crate::repository::ImageRepository;

/// What the project screen renders
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    /// Attached, subscription not opened yet
    #[default]
    Initial,
    /// Waiting for the first emission of a subscription
    Loading,
    Success(Vec<PresentationSample>),
    Error(String),
}

/// Reconnect schedule after a failed subscription
///
/// Durations are stored in milliseconds so the policy can live in the
/// JSON config file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Re-subscriptions allowed after consecutive failures (0 = never retry)
    pub max_retries: u32,
    /// Delay before the first retry, doubled after each failure
    pub initial_backoff_ms: u64,
    /// Upper bound for the doubled delay
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    pub fn never() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

/// Why a subscription stopped
enum SubscriptionEnd {
    Cancelled,
    Completed,
    Failed { delivered: bool },
}

#[derive(Debug, thiserror::Error)]
enum EmissionError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// View-state holder for the project list screen
pub struct ProjectModel {
    state: watch::Receiver<ViewState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProjectModel {
    /// Attach to a screen: subscribe to the repository until `detach`
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(repository: Arc<dyn ImageRepository>, retry: RetryPolicy) -> Self {
        let (tx, rx) = watch::channel(ViewState::Initial);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_subscription(repository, retry, tx, cancel.clone()));

        Self {
            state: rx,
            cancel,
            task: Some(task),
        }
    }

    /// Current state
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Receiver for the render layer; sees every state replacement
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    /// Wait for a project list, or for the subscription to give up
    ///
    /// Errors the retry policy will recover from are waited out. Returns
    /// the state published last when the subscription ends or `within`
    /// elapses.
    pub async fn settled(&self, within: Duration) -> ViewState {
        let mut states = self.state.clone();
        let waited = tokio::time::timeout(
            within,
            states.wait_for(|s| matches!(s, ViewState::Success(_))),
        )
        .await
        .map(|ready| ready.map(|state| state.clone()));

        match waited {
            Ok(Ok(state)) => state,
            // Task ended (retries exhausted or stream completed) or timed out
            Ok(Err(_)) | Err(_) => self.state(),
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Cancel the subscription and wait for it to wind down.
    ///
    /// No state is published once this returns.
    pub async fn detach(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!(error = %e, "project subscription task failed");
                }
            }
        }
    }
}

impl Drop for ProjectModel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ProjectModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectModel")
            .field("state", &*self.state.borrow())
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Subscription loop: (re)subscribe, publish, back off on failure
async fn run_subscription(
    repository: Arc<dyn ImageRepository>,
    retry: RetryPolicy,
    state: watch::Sender<ViewState>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        match subscribe_once(repository.as_ref(), &state, &cancel).await {
            SubscriptionEnd::Cancelled => {
                debug!("project subscription cancelled");
                return;
            }
            SubscriptionEnd::Completed => {
                info!("project stream completed");
                return;
            }
            SubscriptionEnd::Failed { delivered } => {
                // A subscription that delivered at least one list starts a fresh retry budget
                if delivered {
                    attempt = 0;
                }
                attempt += 1;
                if attempt > retry.max_retries {
                    warn!(attempts = attempt, "giving up on project stream");
                    return;
                }

                let delay = retry.backoff(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying project stream");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

async fn subscribe_once(
    repository: &dyn ImageRepository,
    state: &watch::Sender<ViewState>,
    cancel: &CancellationToken,
) -> SubscriptionEnd {
    let mut projects = repository.list_projects();
    let mut delivered = false;

    if *state.borrow() == ViewState::Initial {
        publish(state, cancel, ViewState::Loading);
    }

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return SubscriptionEnd::Cancelled,
            next = projects.next() => next,
        };

        let Some(emission) = next else {
            return SubscriptionEnd::Completed;
        };

        let mapped = match emission {
            Ok(records) => tokio::select! {
                _ = cancel.cancelled() => return SubscriptionEnd::Cancelled,
                mapped = map_off_thread(records) => mapped,
            },
            Err(e) => Err(EmissionError::from(e)),
        };

        match mapped {
            Ok(samples) => {
                debug!(samples = samples.len(), "publishing project list");
                publish(state, cancel, ViewState::Success(samples));
                delivered = true;
            }
            Err(e) => {
                error!(error = %e, "project stream failed");
                publish(state, cancel, ViewState::Error(e.to_string()));
                return SubscriptionEnd::Failed { delivered };
            }
        }
    }
}

async fn map_off_thread(
    records: Vec<ProjectRecord>,
) -> Result<Vec<PresentationSample>, EmissionError> {
    let samples = task::spawn_blocking(move || map_projects(&records))
        .await
        .map_err(|e| DecodeError::Join(e.to_string()))??;
    Ok(samples)
}

/// Replace the published state unless the screen is gone
fn publish(state: &watch::Sender<ViewState>, cancel: &CancellationToken, next: ViewState) {
    if cancel.is_cancelled() {
        return;
    }
    state.send_replace(next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibraryError;
    use crate::imaging::tests::png_bytes;
    use crate::project::ProjectType;
    use crate::repository::fake::FakeRepository;
    use chrono::Utc;
    use tokio::time::timeout;

    fn record(id: i64, project_type: ProjectType, original: Option<Vec<u8>>) -> ProjectRecord {
        ProjectRecord {
            id,
            project_type,
            prompt: format!("prompt {id}"),
            style_id: "pixel-art".to_string(),
            canvas_id: "1:1".to_string(),
            generated_image: png_bytes(2, 2, [id as u8, 0, 0, 255]),
            original_image: original,
            created_at: Utc::now(),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        }
    }

    /// Wait until the published state satisfies `pred`
    async fn wait_for(
        rx: &mut watch::Receiver<ViewState>,
        pred: impl Fn(&ViewState) -> bool,
    ) -> ViewState {
        timeout(Duration::from_secs(5), rx.wait_for(|s| pred(s)))
            .await
            .expect("state never reached")
            .expect("publisher dropped")
            .clone()
    }

    /// Wait until the repository has been subscribed to `n` times
    async fn wait_for_calls(repo: &FakeRepository, n: usize) {
        timeout(Duration::from_secs(5), async {
            while repo.list_calls() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("subscription count never reached");
    }

    fn failure() -> RepositoryError {
        RepositoryError::Generation("backend offline".to_string())
    }

    fn ids(state: &ViewState) -> Vec<i64> {
        match state {
            ViewState::Success(samples) => samples.iter().map(|s| s.id()).collect(),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(5), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(60), Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_initial_then_success() {
        let repo = Arc::new(FakeRepository::default());
        let tx = repo.queue_subscription();

        let model = ProjectModel::attach(repo.clone(), RetryPolicy::never());
        let mut rx = model.subscribe();

        let loading = wait_for(&mut rx, |s| *s != ViewState::Initial).await;
        assert_eq!(loading, ViewState::Loading);

        tx.unbounded_send(Ok(vec![
            record(1, ProjectType::TextToImage, None),
            record(2, ProjectType::ImageToImage, None),
        ]))
        .unwrap();

        let state = wait_for(&mut rx, |s| matches!(s, ViewState::Success(_))).await;
        assert_eq!(ids(&state), vec![1]);
        assert_eq!(model.state(), state);

        model.detach().await;
    }

    #[tokio::test]
    async fn test_reemission_replaces_state() {
        let repo = Arc::new(FakeRepository::default());
        let tx = repo.queue_subscription();
        let model = ProjectModel::attach(repo.clone(), RetryPolicy::never());
        let mut rx = model.subscribe();

        let original = png_bytes(1, 1, [0, 0, 0, 255]);
        tx.unbounded_send(Ok(vec![
            record(1, ProjectType::TextToImage, None),
            record(2, ProjectType::ImageToImage, Some(original)),
        ]))
        .unwrap();
        let first = wait_for(&mut rx, |s| matches!(s, ViewState::Success(_))).await;
        assert_eq!(ids(&first), vec![1, 2]);

        tx.unbounded_send(Ok(vec![record(3, ProjectType::TextToImage, None)]))
            .unwrap();
        let second = wait_for(&mut rx, |s| {
            matches!(s, ViewState::Success(samples) if samples.iter().any(|x| x.id() == 3))
        })
        .await;
        assert_eq!(ids(&second), vec![3]);

        model.detach().await;
    }

    #[tokio::test]
    async fn test_decode_failure_publishes_error_then_retries() {
        let repo = Arc::new(FakeRepository::default());
        let first = repo.queue_subscription();
        let second = repo.queue_subscription();

        let model = ProjectModel::attach(repo.clone(), fast_retry());
        let mut rx = model.subscribe();

        let mut broken = record(1, ProjectType::TextToImage, None);
        broken.generated_image = b"not an image".to_vec();
        first.unbounded_send(Ok(vec![broken])).unwrap();

        let failed = wait_for(&mut rx, |s| matches!(s, ViewState::Error(_))).await;
        assert!(matches!(failed, ViewState::Error(msg) if msg.contains("decode")));

        second
            .unbounded_send(Ok(vec![record(4, ProjectType::TextToImage, None)]))
            .unwrap();
        let recovered = wait_for(&mut rx, |s| matches!(s, ViewState::Success(_))).await;
        assert_eq!(ids(&recovered), vec![4]);
        assert_eq!(repo.list_calls(), 2);

        model.detach().await;
    }

    #[tokio::test]
    async fn test_repository_error_without_retry_stays_in_error() {
        let repo = Arc::new(FakeRepository::default());
        let tx = repo.queue_subscription();
        let model = ProjectModel::attach(repo.clone(), RetryPolicy::never());
        let mut rx = model.subscribe();

        tx.unbounded_send(Err(RepositoryError::Storage(LibraryError::Poisoned)))
            .unwrap();
        let state = wait_for(&mut rx, |s| matches!(s, ViewState::Error(_))).await;
        assert_eq!(
            state,
            ViewState::Error("storage error: catalog lock poisoned".to_string())
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(repo.list_calls(), 1);
        model.detach().await;
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let repo = Arc::new(FakeRepository::default());
        for _ in 0..3 {
            repo.queue_subscription().unbounded_send(Err(failure())).unwrap();
        }

        let model = ProjectModel::attach(repo.clone(), fast_retry());
        let mut rx = model.subscribe();

        // First subscription plus two retries
        wait_for_calls(&repo, 3).await;
        let state = wait_for(&mut rx, |s| matches!(s, ViewState::Error(_))).await;
        assert_eq!(
            state,
            ViewState::Error("generation failed: backend offline".to_string())
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(repo.list_calls(), 3);
        assert!(matches!(model.state(), ViewState::Error(_)));
        // The task has ended and dropped its sender
        assert!(rx.has_changed().is_err());
        model.detach().await;
    }

    #[tokio::test]
    async fn test_retry_budget_resets_after_delivery() {
        let repo = Arc::new(FakeRepository::default());
        repo.queue_subscription().unbounded_send(Err(failure())).unwrap();
        let delivering = repo.queue_subscription();
        delivering
            .unbounded_send(Ok(vec![record(7, ProjectType::TextToImage, None)]))
            .unwrap();
        delivering.unbounded_send(Err(failure())).unwrap();
        repo.queue_subscription().unbounded_send(Err(failure())).unwrap();
        repo.queue_subscription().unbounded_send(Err(failure())).unwrap();

        let model = ProjectModel::attach(repo.clone(), fast_retry());

        // Without the reset the loop would stop after the third subscription
        wait_for_calls(&repo, 4).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(repo.list_calls(), 4);
        assert!(matches!(model.state(), ViewState::Error(_)));
        model.detach().await;
    }

    #[tokio::test]
    async fn test_settled_waits_out_transient_error() {
        let repo = Arc::new(FakeRepository::default());
        repo.queue_subscription().unbounded_send(Err(failure())).unwrap();
        repo.queue_subscription()
            .unbounded_send(Ok(vec![record(3, ProjectType::TextToImage, None)]))
            .unwrap();

        let model = ProjectModel::attach(repo.clone(), fast_retry());
        let state = model.settled(Duration::from_secs(5)).await;
        assert_eq!(ids(&state), vec![3]);
        assert_eq!(repo.list_calls(), 2);
        model.detach().await;
    }

    #[tokio::test]
    async fn test_settled_reports_final_error() {
        let repo = Arc::new(FakeRepository::default());
        for _ in 0..3 {
            repo.queue_subscription().unbounded_send(Err(failure())).unwrap();
        }

        let model = ProjectModel::attach(repo.clone(), fast_retry());
        let state = model.settled(Duration::from_secs(5)).await;
        assert_eq!(
            state,
            ViewState::Error("generation failed: backend offline".to_string())
        );
        assert_eq!(repo.list_calls(), 3);
        model.detach().await;
    }

    #[tokio::test]
    async fn test_settled_times_out_while_loading() {
        let repo = Arc::new(FakeRepository::default());
        let _tx = repo.queue_subscription();

        let model = ProjectModel::attach(repo.clone(), fast_retry());
        let state = model.settled(Duration::from_millis(20)).await;
        assert_eq!(state, ViewState::Loading);
        model.detach().await;
    }

    #[tokio::test]
    async fn test_no_state_after_detach() {
        let repo = Arc::new(FakeRepository::default());
        let tx = repo.queue_subscription();
        let model = ProjectModel::attach(repo.clone(), RetryPolicy::never());
        let mut rx = model.subscribe();

        tx.unbounded_send(Ok(vec![record(1, ProjectType::TextToImage, None)]))
            .unwrap();
        let before = wait_for(&mut rx, |s| matches!(s, ViewState::Success(_))).await;

        model.detach().await;

        // The subscription is gone; later emissions have nowhere to go
        let _ = tx.unbounded_send(Ok(vec![record(2, ProjectType::TextToImage, None)]));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*rx.borrow(), before);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn test_completed_stream_keeps_last_state() {
        let repo = Arc::new(FakeRepository::default());
        let tx = repo.queue_subscription();
        let model = ProjectModel::attach(repo.clone(), fast_retry());
        let mut rx = model.subscribe();

        tx.unbounded_send(Ok(vec![record(5, ProjectType::TextToImage, None)]))
            .unwrap();
        wait_for(&mut rx, |s| matches!(s, ViewState::Success(_))).await;
        drop(tx);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ids(&model.state()), vec![5]);
        assert_eq!(repo.list_calls(), 1);
        model.detach().await;
    }
}
