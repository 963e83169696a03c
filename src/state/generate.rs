//! Generation view state
//!
//! Drives one generation request at a time against the repository and
//! exposes its progress. Starting a new request cancels the previous one.

use futures::StreamExt;
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::presets::StylePreset;
use crate::repository::ImageRepository;

/// Prompts offered by "Surprise me"
pub const SAMPLE_PROMPTS: [&str; 4] = [
    "Portrait of Harry Potter cooking cheeseburger",
    "Dwayne Johnson as Superman, realistic portrait",
    "Colin Farrell as the president of the USA",
    "Happy charming googly-eyed potato walking around a cardboard diorama town chatting",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerateState {
    #[default]
    Idle,
    /// Tokens received so far, in arrival order
    Loading { progress: Vec<String> },
    Success { tokens: Vec<String> },
    Error(String),
}

/// A style as listed in the picker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavorableStyle {
    pub style: StylePreset,
    pub is_favorite: bool,
}

/// Full style catalog, flagged with the user's favorites
pub fn styles(favorite_ids: &[String]) -> Vec<FavorableStyle> {
    StylePreset::ALL
        .into_iter()
        .map(|style| FavorableStyle {
            style,
            is_favorite: favorite_ids.iter().any(|id| id == style.id()),
        })
        .collect()
}

/// Pick a sample prompt that differs from `current`
pub fn surprise_prompt(current: &str) -> &'static str {
    let candidates: Vec<&'static str> = SAMPLE_PROMPTS
        .into_iter()
        .filter(|prompt| *prompt != current)
        .collect();
    candidates
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(SAMPLE_PROMPTS[0])
}

/// View-state holder for the generate screen
pub struct GenerateModel {
    repository: Arc<dyn ImageRepository>,
    state: watch::Sender<GenerateState>,
    /// Id of the only run allowed to publish; bumped whenever a run is stopped
    current_run: Arc<AtomicU64>,
    in_flight: Option<(CancellationToken, JoinHandle<()>)>,
}

impl GenerateModel {
    pub fn new(repository: Arc<dyn ImageRepository>) -> Self {
        let (state, _) = watch::channel(GenerateState::Idle);
        Self {
            repository,
            state,
            current_run: Arc::new(AtomicU64::new(0)),
            in_flight: None,
        }
    }

    pub fn state(&self) -> GenerateState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerateState> {
        self.state.subscribe()
    }

    /// Start generating for `prompt`
    ///
    /// A blank prompt is rejected straight away with an `Error` state.
    /// Must be called from within a tokio runtime.
    pub fn generate(&mut self, prompt: &str) {
        self.stop_in_flight();

        let prompt = prompt.trim();
        if prompt.is_empty() {
            self.state
                .send_replace(GenerateState::Error("prompt is empty".to_string()));
            return;
        }

        info!(prompt, "starting generation");
        self.state
            .send_replace(GenerateState::Loading { progress: Vec::new() });

        let run = RunGuard {
            id: self.current_run.load(Ordering::SeqCst),
            current: self.current_run.clone(),
            state: self.state.clone(),
        };
        let cancel = CancellationToken::new();
        let tokens = self.repository.generate_image(prompt);
        let task = tokio::spawn(run_generation(tokens, run, cancel.clone()));
        self.in_flight = Some((cancel, task));
    }

    /// Stop the in-flight generation, if any, and go back to `Idle`
    pub fn cancel(&mut self) {
        if self.stop_in_flight() {
            debug!("generation cancelled");
        }
        self.state.send_replace(GenerateState::Idle);
    }

    fn stop_in_flight(&mut self) -> bool {
        // A task stuck between its cancellation check and its send sees a stale id
        self.current_run.fetch_add(1, Ordering::SeqCst);
        match self.in_flight.take() {
            Some((cancel, task)) => {
                cancel.cancel();
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for GenerateModel {
    fn drop(&mut self) {
        self.stop_in_flight();
    }
}

/// Publishing handle of one generation run
struct RunGuard {
    id: u64,
    current: Arc<AtomicU64>,
    state: watch::Sender<GenerateState>,
}

impl RunGuard {
    /// Publish `next` unless a newer run or a cancel has superseded this one.
    ///
    /// The id is checked under the channel's write lock.
    fn publish(&self, next: GenerateState) -> bool {
        self.state.send_if_modified(|state| {
            if self.current.load(Ordering::SeqCst) != self.id {
                return false;
            }
            *state = next;
            true
        })
    }
}

async fn run_generation(
    mut tokens: crate::repository::TokenStream,
    run: RunGuard,
    cancel: CancellationToken,
) {
    let mut received = Vec::new();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = tokens.next() => next,
        };
        if cancel.is_cancelled() {
            return;
        }

        match next {
            Some(Ok(token)) => {
                received.push(token);
                if !run.publish(GenerateState::Loading {
                    progress: received.clone(),
                }) {
                    return;
                }
            }
            Some(Err(e)) => {
                error!(error = %e, "generation failed");
                run.publish(GenerateState::Error(e.to_string()));
                return;
            }
            None => {
                info!(tokens = received.len(), "generation finished");
                run.publish(GenerateState::Success { tokens: received });
                return;
            }
        }
    }
}
