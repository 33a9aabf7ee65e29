// rams-document-service/src/pipeline/session.rs

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

use super::cache::{CacheKey, DocumentCache, PdfPayload, DEFAULT_CACHE_CAPACITY};
use super::progress::{ProgressConfig, ProgressTicker};
use super::retry::{BackoffPolicy, RetryPolicy};
use crate::composition::GenerationInput;
use crate::error::{RamsError, Result};
use crate::preview::{
    todays_download_filename, write_pdf, DisplayState, PageCursor, PrintSink, ViewerStrategy, Zoom,
};
use crate::renderers::PdfBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    pub attempt_timeout: Duration,
    pub progress: ProgressConfig,
    /// Generated documents kept per session
    pub cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(120),
            progress: ProgressConfig::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    Idle,
    Generating {
        attempt: u32,
    },
    Ready {
        pdf: PdfPayload,
        from_cache: bool,
    },
    /// `retry_in` is set while an automatic retry is scheduled; `None` is terminal.
    Failed {
        error: String,
        attempts: u32,
        retry_in: Option<Duration>,
    },
}

impl PreviewState {
    /// Generation is in flight or a retry is scheduled.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            PreviewState::Generating { .. } | PreviewState::Failed { retry_in: Some(_), .. }
        )
    }

    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, PreviewState::Failed { retry_in: None, .. })
    }

    pub fn pdf(&self) -> Option<&PdfPayload> {
        match self {
            PreviewState::Ready { pdf, .. } => Some(pdf),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct GenerationEvent {
    token: u64,
    kind: EventKind,
}

#[derive(Debug)]
enum EventKind {
    AttemptStarted {
        attempt: u32,
    },
    AttemptFailed {
        attempt: u32,
        error: String,
        retry_in: Option<Duration>,
    },
    Completed {
        attempt: u32,
        pdf: PdfPayload,
    },
}

pub struct PreviewSession {
    backend: Arc<dyn PdfBackend>,
    config: PipelineConfig,
    viewers: ViewerStrategy,
    cache: DocumentCache,
    current_token: Arc<AtomicU64>,
    events_tx: mpsc::UnboundedSender<GenerationEvent>,
    events_rx: mpsc::UnboundedReceiver<GenerationEvent>,
    state: PreviewState,
    input: Option<Arc<GenerationInput>>,
    key: Option<CacheKey>,
    progress_tx: Arc<watch::Sender<u8>>,
    progress_rx: watch::Receiver<u8>,
    ticker: Option<ProgressTicker>,
    display: DisplayState,
    zoom: Zoom,
    page: PageCursor,
}

impl PreviewSession {
    pub fn new(backend: Arc<dyn PdfBackend>, config: PipelineConfig, viewers: ViewerStrategy) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (progress_tx, progress_rx) = watch::channel(0);
        let cache = DocumentCache::with_capacity(config.cache_capacity);
        Self {
            backend,
            config,
            viewers,
            cache,
            current_token: Arc::new(AtomicU64::new(0)),
            events_tx,
            events_rx,
            state: PreviewState::Idle,
            input: None,
            key: None,
            progress_tx: Arc::new(progress_tx),
            progress_rx,
            ticker: None,
            display: DisplayState::Hidden,
            zoom: Zoom::default(),
            page: PageCursor::default(),
        }
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Progress percentage. Stays below the configured ceiling until the
    /// renderer confirms success.
    pub fn progress(&self) -> u8 {
        *self.progress_rx.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress_rx.clone()
    }

    pub fn cached_documents(&self) -> usize {
        self.cache.len()
    }

    /// Start previewing `input`. A cache hit goes straight to `Ready`;
    /// otherwise a generation run is spawned. Must be called within a Tokio
    /// runtime.
    #[instrument(skip(self, input), fields(project = %input.document.project.project_name))]
    pub fn open(&mut self, input: GenerationInput) -> &PreviewState {
        self.supersede();

        let key = match CacheKey::derive(&input) {
            Ok(key) => key,
            Err(e) => {
                error!(error = %e, "Cannot derive cache key");
                self.state = PreviewState::Failed {
                    error: e.to_string(),
                    attempts: 0,
                    retry_in: None,
                };
                return &self.state;
            }
        };
        self.input = Some(Arc::new(input));
        self.key = Some(key.clone());

        if let Some(pdf) = self.cache.get(&key).cloned() {
            info!(cache_key = %key, "Cache hit, skipping generation");
            self.progress_tx.send_replace(100);
            self.show(pdf, true);
            return &self.state;
        }

        self.start_generation();
        &self.state
    }

    /// Evict the cached document and regenerate from scratch.
    pub fn refresh(&mut self) -> &PreviewState {
        if self.input.is_none() {
            return &self.state;
        }
        if let Some(key) = &self.key {
            if self.cache.evict(key).is_some() {
                debug!(cache_key = %key, "Evicted cached document");
            }
        }
        self.supersede();
        info!("Refreshing preview");
        self.start_generation();
        &self.state
    }

    /// Manual retry after retries were exhausted. The cache is left intact.
    pub fn retry(&mut self) -> &PreviewState {
        if self.state.is_terminal_failure() && self.input.is_some() {
            self.supersede();
            self.start_generation();
        }
        &self.state
    }

    /// Stop the progress timer and reset transient state. An in-flight render
    /// keeps running but its result will be ignored.
    pub fn close(&mut self) {
        self.supersede();
        self.state = PreviewState::Idle;
        self.input = None;
        self.key = None;
        debug!("Preview closed");
    }

    /// Apply whatever events have already arrived, without waiting.
    pub fn poll(&mut self) -> &PreviewState {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
        }
        &self.state
    }

    /// Wait for the next state change from the current run.
    pub async fn next_change(&mut self) -> &PreviewState {
        while self.state.is_pending() {
            match self.events_rx.recv().await {
                Some(event) => {
                    if self.apply(event) {
                        break;
                    }
                }
                None => break,
            }
        }
        &self.state
    }

    /// Wait until the current run reaches `Ready` or terminal `Failed`.
    pub async fn settle(&mut self) -> &PreviewState {
        while self.state.is_pending() {
            match self.events_rx.recv().await {
                Some(event) => {
                    self.apply(event);
                }
                None => break,
            }
        }
        &self.state
    }

    // ------------------------------------------------------------
    // View state
    // ------------------------------------------------------------

    pub fn zoom(&self) -> f32 {
        self.zoom.value()
    }

    pub fn zoom_in(&mut self) {
        self.zoom.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.zoom.reset();
    }

    pub fn current_page(&self) -> u32 {
        self.page.current()
    }

    pub fn num_pages(&self) -> u32 {
        self.page.num_pages()
    }

    pub fn next_page(&mut self) {
        self.page.next();
    }

    pub fn prev_page(&mut self) {
        self.page.prev();
    }

    pub fn go_to_page(&mut self, page: u32) {
        self.page.go_to(page);
    }

    // ------------------------------------------------------------
    // Export
    // ------------------------------------------------------------

    /// Filename for a download made today.
    pub fn download_filename(&self) -> Option<String> {
        self.input
            .as_ref()
            .map(|input| todays_download_filename(&input.document.project.project_name))
    }

    /// Write the ready document into `dir`. Never regenerates.
    pub async fn download(&self, dir: &Path) -> Result<PathBuf> {
        let pdf = self.state.pdf().ok_or(RamsError::NotReady)?;
        let filename = self.download_filename().ok_or(RamsError::NotReady)?;
        write_pdf(pdf, dir, &filename).await
    }

    /// Send the ready document to `sink`. Never regenerates.
    pub async fn print(&self, sink: &dyn PrintSink) -> Result<()> {
        let pdf = self.state.pdf().ok_or(RamsError::NotReady)?;
        let job_name = self
            .input
            .as_ref()
            .map(|input| input.document.title())
            .unwrap_or_else(|| pdf.filename().to_string());
        sink.print(&job_name, pdf).await
    }

    // ------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------

    /// Invalidate the current run and clear transient view state.
    fn supersede(&mut self) {
        self.current_token.fetch_add(1, Ordering::SeqCst);
        self.ticker = None;
        self.progress_tx.send_replace(0);
        self.display = DisplayState::Hidden;
        self.zoom.reset();
        self.page = PageCursor::default();
    }

    fn start_generation(&mut self) {
        let Some(input) = self.input.clone() else {
            self.state = PreviewState::Idle;
            return;
        };

        let token = self.current_token.fetch_add(1, Ordering::SeqCst) + 1;
        self.ticker = Some(ProgressTicker::spawn(
            self.config.progress,
            Arc::clone(&self.progress_tx),
        ));
        self.state = PreviewState::Generating { attempt: 1 };

        let run = GenerationRun {
            token,
            current_token: Arc::clone(&self.current_token),
            backend: Arc::clone(&self.backend),
            input,
            retry: self.config.retry.clone(),
            attempt_timeout: self.config.attempt_timeout,
            events: self.events_tx.clone(),
        };
        tokio::spawn(run.run());
    }

    /// Returns true when the event belonged to the current run.
    fn apply(&mut self, event: GenerationEvent) -> bool {
        if event.token != self.current_token.load(Ordering::SeqCst) {
            debug!(token = event.token, "Discarding event from superseded run");
            return false;
        }

        match event.kind {
            EventKind::AttemptStarted { attempt } => {
                self.state = PreviewState::Generating { attempt };
            }
            EventKind::AttemptFailed {
                attempt,
                error,
                retry_in,
            } => {
                match retry_in {
                    Some(delay) => warn!(
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %error,
                        "Generation attempt failed, retrying"
                    ),
                    None => {
                        error!(attempts = attempt, error = %error, "Generation failed");
                        self.ticker = None;
                    }
                }
                self.state = PreviewState::Failed {
                    error,
                    attempts: attempt,
                    retry_in,
                };
            }
            EventKind::Completed { attempt, pdf } => {
                info!(attempt, size_bytes = pdf.len(), "Document generated");
                self.ticker = None;
                self.progress_tx.send_replace(100);
                if let Some(key) = &self.key {
                    self.cache.insert(key.clone(), pdf.clone());
                }
                self.show(pdf, false);
            }
        }
        true
    }

    fn show(&mut self, pdf: PdfPayload, from_cache: bool) {
        self.display = self.viewers.display(&pdf);
        self.page = match &self.display {
            DisplayState::Shown(display) => PageCursor::new(display.num_pages),
            _ => PageCursor::default(),
        };
        self.state = PreviewState::Ready { pdf, from_cache };
    }
}

/// One generation run: the initial attempt plus automatic retries.
struct GenerationRun {
    token: u64,
    current_token: Arc<AtomicU64>,
    backend: Arc<dyn PdfBackend>,
    input: Arc<GenerationInput>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
    events: mpsc::UnboundedSender<GenerationEvent>,
}

impl GenerationRun {
    fn is_stale(&self) -> bool {
        self.current_token.load(Ordering::SeqCst) != self.token
    }

    fn send(&self, kind: EventKind) -> bool {
        self.events
            .send(GenerationEvent {
                token: self.token,
                kind,
            })
            .is_ok()
    }

    #[instrument(skip(self), fields(token = self.token))]
    async fn run(self) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if !self.send(EventKind::AttemptStarted { attempt }) {
                return;
            }

            match self.attempt_once().await {
                Ok(pdf) => {
                    self.send(EventKind::Completed { attempt, pdf });
                    return;
                }
                Err(e) => {
                    let retry_in = self.retry.delay_after_attempt(attempt);
                    let delivered = self.send(EventKind::AttemptFailed {
                        attempt,
                        error: e.to_string(),
                        retry_in,
                    });
                    let Some(delay) = retry_in else {
                        return;
                    };
                    if !delivered {
                        return;
                    }
                    tokio::time::sleep(delay).await;
                    if self.is_stale() {
                        debug!(attempt, "Run superseded, abandoning retries");
                        return;
                    }
                }
            }
        }
    }

    /// Any failure, including a renderer panic or timeout, becomes an error.
    async fn attempt_once(&self) -> Result<PdfPayload> {
        let render = AssertUnwindSafe(self.backend.render(&self.input)).catch_unwind();
        let outcome = tokio::time::timeout(self.attempt_timeout, render)
            .await
            .map_err(|_| RamsError::AttemptTimedOut(self.attempt_timeout.as_secs()))?;
        let document = outcome
            .map_err(|_| RamsError::GenerationFailed("renderer panicked".to_string()))??;
        PdfPayload::from_generated(&document)
    }
}
