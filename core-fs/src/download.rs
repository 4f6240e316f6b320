//! # Download Jobs & Event Routing
//!
//! Coordinates one asynchronous native download with the begin/progress
//! notifications the native layer emits for it.
//!
//! ## Job lifecycle
//!
//! ```text
//! Created → Subscribed ──(events 0..n)──→ settled (Ok | Err)
//!               │                            ↑
//!               └──→ Stopping ───────────────┘
//! ```
//!
//! 1. [`DownloadRouter::start`] allocates a fresh [`JobId`] (never reused).
//! 2. A begin listener (the caller's, or a logging default) and, if given, a
//!    progress listener are attached under `DownloadBegin-<id>` /
//!    `DownloadProgress-<id>` on every channel that supports listeners.
//! 3. The native download is started with the job id before `start`
//!    returns, so a stop request can never reach the native layer ahead of
//!    the download it refers to.
//! 4. When the native result settles every listener registered for the job
//!    is removed, exactly once, before the result reaches the caller.
//!
//! Stopping is fire-and-forget: [`DownloadRouter::stop`] only signals the
//! native layer. Teardown still happens on settlement, or when the optional
//! watchdog timeout fires, or when the caller drops the [`DownloadHandle`]
//! (which also asks the native layer to stop the abandoned job).

use bridge_traits::events::{EventCallback, EventChannel, Subscription};
use bridge_traits::error::Result as NativeResult;
use bridge_traits::native::{JobId, NativeFileSystem, RawDownloadResult};
use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tracing::{debug, info, warn};

use core_runtime::logging::{redact_if_sensitive, strip_path};

use crate::error::{FsError, Result};

const BEGIN_EVENT_PREFIX: &str = "DownloadBegin";
const PROGRESS_EVENT_PREFIX: &str = "DownloadProgress";

/// Name of the begin event for `job_id`.
pub fn begin_event_name(job_id: JobId) -> String {
    format!("{}-{}", BEGIN_EVENT_PREFIX, job_id)
}

/// Name of the progress event for `job_id`.
pub fn progress_event_name(job_id: JobId) -> String {
    format!("{}-{}", PROGRESS_EVENT_PREFIX, job_id)
}

// ============================================================================
// Event payloads
// ============================================================================

/// Emitted once the server responded and the transfer is about to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadBegin {
    pub job_id: JobId,
    pub status_code: u16,
    /// `-1` when the server did not announce a length.
    pub content_length: i64,
    pub headers: BTreeMap<String, String>,
}

/// Emitted as bytes are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub job_id: JobId,
    pub content_length: i64,
    pub bytes_written: u64,
}

/// Outcome of a finished download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    pub job_id: JobId,
    pub status_code: u16,
    pub bytes_written: u64,
}

impl From<RawDownloadResult> for DownloadResult {
    fn from(raw: RawDownloadResult) -> Self {
        Self {
            job_id: raw.job_id,
            status_code: raw.status_code,
            bytes_written: raw.bytes_written,
        }
    }
}

// Wire forms. Some platforms omit `jobId` because the event name already
// scopes the payload; the router fills it in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BeginPayload {
    job_id: Option<JobId>,
    status_code: u16,
    #[serde(default = "unknown_length")]
    content_length: i64,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressPayload {
    job_id: Option<JobId>,
    #[serde(default = "unknown_length")]
    content_length: i64,
    bytes_written: u64,
}

fn unknown_length() -> i64 {
    -1
}

// ============================================================================
// Options
// ============================================================================

pub type BeginCallback = Arc<dyn Fn(&DownloadBegin) + Send + Sync>;
pub type ProgressCallback = Arc<dyn Fn(&DownloadProgress) + Send + Sync>;

/// Parameters of one download.
#[derive(Clone)]
pub struct DownloadOptions {
    pub from_url: String,
    pub to_file: String,
    pub begin: Option<BeginCallback>,
    pub progress: Option<ProgressCallback>,
}

impl DownloadOptions {
    pub fn new(from_url: impl Into<String>, to_file: impl Into<String>) -> Self {
        Self {
            from_url: from_url.into(),
            to_file: to_file.into(),
            begin: None,
            progress: None,
        }
    }

    pub fn on_begin<F>(mut self, callback: F) -> Self
    where
        F: Fn(&DownloadBegin) + Send + Sync + 'static,
    {
        self.begin = Some(Arc::new(callback));
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&DownloadProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("from_url", &redact_if_sensitive("from_url", &self.from_url))
            .field("to_file", &self.to_file)
            .field("begin", &self.begin.as_ref().map(|_| "Fn(&DownloadBegin)"))
            .field("progress", &self.progress.as_ref().map(|_| "Fn(&DownloadProgress)"))
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// State of a job that has not settled yet. Settled jobs leave the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Created,
    Subscribed,
    /// Stop was requested; waiting for the native layer to settle.
    Stopping,
}

/// Allocates job ids and tracks jobs that are still in flight.
#[derive(Debug, Default)]
pub struct JobRegistry {
    last_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, JobState>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh id. Ids start at 1 and only increase.
    pub fn allocate(&self) -> JobId {
        let id = JobId::new(self.last_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.jobs.lock().insert(id, JobState::Created);
        id
    }

    pub fn state(&self, job_id: JobId) -> Option<JobState> {
        self.jobs.lock().get(&job_id).copied()
    }

    /// In-flight jobs, ordered by id.
    pub fn active_jobs(&self) -> Vec<(JobId, JobState)> {
        let mut jobs: Vec<_> = self
            .jobs
            .lock()
            .iter()
            .map(|(id, state)| (*id, *state))
            .collect();
        jobs.sort_by_key(|(id, _)| *id);
        jobs
    }

    fn mark_subscribed(&self, job_id: JobId) {
        if let Some(state) = self.jobs.lock().get_mut(&job_id) {
            if *state == JobState::Created {
                *state = JobState::Subscribed;
            }
        }
    }

    /// Returns whether the job was still in flight.
    fn mark_stopping(&self, job_id: JobId) -> bool {
        match self.jobs.lock().get_mut(&job_id) {
            Some(state) => {
                *state = JobState::Stopping;
                true
            }
            None => false,
        }
    }

    fn settle(&self, job_id: JobId) -> Option<JobState> {
        self.jobs.lock().remove(&job_id)
    }
}

// ============================================================================
// Per-job teardown guard
// ============================================================================

/// Owns every subscription made for one job.
///
/// Removal happens once: on [`JobGuard::settle`], or on drop if the job
/// future was abandoned before settling. An abandoned job is also stopped
/// natively.
struct JobGuard {
    job_id: JobId,
    backend: Arc<dyn NativeFileSystem>,
    registry: Arc<JobRegistry>,
    subscriptions: Vec<Box<dyn Subscription>>,
    settled: bool,
}

impl JobGuard {
    fn release(&mut self) -> usize {
        let count = self.subscriptions.len();
        for subscription in self.subscriptions.drain(..) {
            subscription.remove();
        }
        count
    }

    fn settle(&mut self, succeeded: bool) {
        let released = self.release();
        let last_state = self.registry.settle(self.job_id);
        self.settled = true;
        debug!(
            job_id = %self.job_id,
            released,
            succeeded,
            last_state = ?last_state,
            "Download settled"
        );
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if !self.settled {
            let released = self.release();
            self.registry.settle(self.job_id);
            self.backend.stop_download(self.job_id);
            debug!(job_id = %self.job_id, released, "Download abandoned before settling; stopped");
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// A started download.
///
/// The job id is available immediately (for [`DownloadRouter::stop`]); await
/// the handle for the result. Dropping it detaches every listener of the job.
pub struct DownloadHandle {
    job_id: JobId,
    result: BoxFuture<'static, Result<DownloadResult>>,
}

impl DownloadHandle {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }
}

impl Future for DownloadHandle {
    type Output = Result<DownloadResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.result.as_mut().poll(cx)
    }
}

impl fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Starts downloads and routes their events to per-job callbacks.
pub struct DownloadRouter {
    backend: Arc<dyn NativeFileSystem>,
    channels: Vec<Arc<dyn EventChannel>>,
    registry: Arc<JobRegistry>,
    timeout: Option<Duration>,
    log_begin: bool,
}

impl DownloadRouter {
    pub fn new(
        backend: Arc<dyn NativeFileSystem>,
        channels: Vec<Arc<dyn EventChannel>>,
        timeout: Option<Duration>,
        log_begin: bool,
    ) -> Self {
        Self {
            backend,
            channels,
            registry: Arc::new(JobRegistry::new()),
            timeout,
            log_begin,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Starts a download.
    ///
    /// Listeners are attached and the native download is issued before this
    /// returns. Awaiting the handle only waits for the native result.
    pub fn start(&self, options: DownloadOptions) -> DownloadHandle {
        let job_id = self.registry.allocate();
        let DownloadOptions {
            from_url,
            to_file,
            begin,
            progress,
        } = options;

        let begin = begin.unwrap_or_else(|| default_begin_callback(self.log_begin));
        let mut guard = JobGuard {
            job_id,
            backend: Arc::clone(&self.backend),
            registry: Arc::clone(&self.registry),
            subscriptions: Vec::new(),
            settled: false,
        };

        let begin_name = begin_event_name(job_id);
        let progress_name = progress_event_name(job_id);
        for channel in self.channels.iter().filter(|c| c.supports_listeners()) {
            guard.subscriptions.push(
                channel.add_listener(&begin_name, begin_listener(job_id, Arc::clone(&begin))),
            );
            if let Some(progress) = &progress {
                guard.subscriptions.push(
                    channel.add_listener(&progress_name, progress_listener(job_id, Arc::clone(progress))),
                );
            }
        }
        self.registry.mark_subscribed(job_id);

        debug!(
            job_id = %job_id,
            url = %redact_if_sensitive("from_url", &from_url),
            to = %strip_path(&to_file),
            subscriptions = guard.subscriptions.len(),
            "Download subscribed"
        );

        let mut native: BoxFuture<'static, NativeResult<RawDownloadResult>> = {
            let backend = Arc::clone(&self.backend);
            Box::pin(async move { backend.download_file(&from_url, &to_file, job_id).await })
        };
        // First poll issues the native call; the caller's await drives the rest.
        let started = native
            .as_mut()
            .poll(&mut Context::from_waker(noop_waker_ref()));

        let backend = Arc::clone(&self.backend);
        let timeout = self.timeout;
        let result = async move {
            let outcome = match started {
                Poll::Ready(settled) => settled.map_err(FsError::from),
                Poll::Pending => await_native(native, backend.as_ref(), job_id, timeout).await,
            };

            guard.settle(outcome.is_ok());
            outcome.map(DownloadResult::from)
        };

        DownloadHandle {
            job_id,
            result: Box::pin(result),
        }
    }

    /// Asks the native layer to abort `job_id`. Does not detach listeners.
    pub fn stop(&self, job_id: JobId) {
        if !self.registry.mark_stopping(job_id) {
            debug!(job_id = %job_id, "Stop requested for a job that is not in flight");
        }
        self.backend.stop_download(job_id);
    }
}

impl fmt::Debug for DownloadRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRouter")
            .field(
                "channels",
                &self.channels.iter().map(|c| c.name().to_string()).collect::<Vec<_>>(),
            )
            .field("active_jobs", &self.registry.active_jobs())
            .field("timeout", &self.timeout)
            .finish()
    }
}

async fn await_native(
    native: BoxFuture<'static, NativeResult<RawDownloadResult>>,
    backend: &dyn NativeFileSystem,
    job_id: JobId,
    timeout: Option<Duration>,
) -> Result<RawDownloadResult> {
    let Some(limit) = timeout else {
        return native.await.map_err(FsError::from);
    };

    match tokio::time::timeout(limit, native).await {
        Ok(settled) => settled.map_err(FsError::from),
        Err(_) => {
            warn!(job_id = %job_id, timeout = ?limit, "Download timed out; stopping");
            backend.stop_download(job_id);
            Err(FsError::timed_out(limit))
        }
    }
}

fn default_begin_callback(log: bool) -> BeginCallback {
    Arc::new(move |info: &DownloadBegin| {
        if log {
            info!(
                job_id = %info.job_id,
                status_code = info.status_code,
                content_length = info.content_length,
                "Download begun"
            );
        }
    })
}

/// Drops payloads whose explicit `jobId` disagrees with the event scope.
fn scoped(job_id: JobId, reported: Option<JobId>, event: &str) -> bool {
    match reported {
        Some(reported) if reported != job_id => {
            warn!(job_id = %job_id, reported = %reported, event, "Dropping event tagged for another job");
            false
        }
        _ => true,
    }
}

fn begin_listener(job_id: JobId, callback: BeginCallback) -> EventCallback {
    Arc::new(move |payload: &Value| {
        match BeginPayload::deserialize(payload) {
            Ok(wire) if scoped(job_id, wire.job_id, BEGIN_EVENT_PREFIX) => {
                callback(&DownloadBegin {
                    job_id,
                    status_code: wire.status_code,
                    content_length: wire.content_length,
                    headers: wire.headers,
                })
            }
            Ok(_) => {}
            Err(e) => warn!(job_id = %job_id, error = %e, "Malformed download begin payload"),
        }
    })
}

fn progress_listener(job_id: JobId, callback: ProgressCallback) -> EventCallback {
    Arc::new(move |payload: &Value| {
        match ProgressPayload::deserialize(payload) {
            Ok(wire) if scoped(job_id, wire.job_id, PROGRESS_EVENT_PREFIX) => {
                callback(&DownloadProgress {
                    job_id,
                    content_length: wire.content_length,
                    bytes_written: wire.bytes_written,
                })
            }
            Ok(_) => {}
            Err(e) => warn!(job_id = %job_id, error = %e, "Malformed download progress payload"),
        }
    })
}
