//! Cross-thread render bridge.
//!
//! The render engine is thread-affine and callback-driven. Callers are
//! ordinary async (or blocking) code on arbitrary threads. The bridge joins
//! the two:
//!
//! ```text
//!  caller thread                         worker thread "render-worker"
//!  ─────────────                         ─────────────────────────────
//!  submit(request) ──spawn────────────▶  current_thread runtime + LocalSet
//!       │                                  RenderWorker::run(request)
//!       │                                    create_session → navigate →
//!       │                                    content_ready → export
//!       ▼                                        │
//!  timeout_at(deadline, rx) ◀──── oneshot ───────┘  (exactly one send)
//! ```
//!
//! ## Guarantees
//!
//! * **Exactly one resolution.** The oneshot sender lives in a
//!   [`Completion`] guard. It is consumed by the first completion; if the
//!   worker exits without completing (panic, runtime failure) the guard's
//!   `Drop` sends an `Internal` failure instead.
//! * **Caller-side timeout.** The deadline is fixed when `submit` is called.
//!   When it passes first, the future resolves with
//!   [`RenderError::Timeout`] and the worker thread is *abandoned*, not
//!   killed. Its late completion finds the receiver gone and is dropped.
//! * **No shared state.** Each request owns its thread, runtime and engine
//!   session; concurrent submissions never touch each other.

use crate::engine::RenderEngine;
use crate::error::RenderError;
use crate::output::RenderArtifact;
use crate::worker::{RenderRequest, RenderWorker};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Result of one render request: the artifact or the reason it failed.
pub type RenderOutcome = Result<RenderArtifact, RenderError>;

/// Name given to every worker thread.
pub const WORKER_THREAD_NAME: &str = "render-worker";

/// Submits render requests to dedicated worker threads and awaits them
/// with a timeout.
///
/// Cheap to clone; clones share the engine.
pub struct RenderBridge<E: RenderEngine> {
    engine: Arc<E>,
    timeout: Duration,
}

impl<E: RenderEngine> Clone for RenderBridge<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            timeout: self.timeout,
        }
    }
}

impl<E: RenderEngine> RenderBridge<E> {
    pub fn new(engine: E, timeout: Duration) -> Self {
        Self::from_shared(Arc::new(engine), timeout)
    }

    pub fn from_shared(engine: Arc<E>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Start `request` on a fresh worker thread.
    ///
    /// The returned future resolves exactly once, with the worker's outcome
    /// or with [`RenderError::Timeout`] once `timeout` has elapsed since
    /// this call. It must be polled inside a Tokio runtime.
    pub fn submit(&self, request: RenderRequest) -> BoxFuture<'static, RenderOutcome> {
        let deadline = Instant::now() + self.timeout;
        let timeout = self.timeout;
        let source_name = request.source.display_name();
        let (tx, rx) = oneshot::channel();
        let completion = Completion::new(tx);

        let engine = Arc::clone(&self.engine);
        let spawned = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_main(engine, request, completion));

        let early = match spawned {
            // The join handle is dropped: the thread is detached.
            Ok(_) => None,
            Err(e) => {
                error!("Render worker thread could not be spawned: {}", e);
                // The closure, and with it the completion guard, was dropped
                // with the spawn error; its Drop already sent an Internal
                // failure. Report the spawn failure instead.
                Some(RenderError::initialization(
                    "render worker thread could not be started",
                    Some(Box::new(e)),
                ))
            }
        };

        async move {
            if let Some(err) = early {
                return Err(err);
            }
            match tokio::time::timeout_at(deadline, rx).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_closed)) => Err(RenderError::internal(
                    "render worker exited without reporting a result",
                )),
                Err(_elapsed) => {
                    warn!("Render of {} timed out after {:?}", source_name, timeout);
                    Err(RenderError::Timeout { after: timeout })
                }
            }
        }
        .boxed()
    }

    /// Blocking variant of [`submit`](Self::submit) for callers without an
    /// async runtime. Must not be called from inside one.
    pub fn submit_blocking(&self, request: RenderRequest) -> RenderOutcome {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| {
                RenderError::initialization("caller runtime could not be created", Some(Box::new(e)))
            })?;
        rt.block_on(self.submit(request))
    }
}

// ── Worker thread ────────────────────────────────────────────────────────

fn worker_main<E: RenderEngine>(engine: Arc<E>, request: RenderRequest, completion: Completion) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            completion.complete(Err(RenderError::initialization(
                "worker event loop could not be created",
                Some(Box::new(e)),
            )));
            return;
        }
    };

    let local = tokio::task::LocalSet::new();
    let outcome = local.block_on(&rt, async {
        let worker = RenderWorker::new(engine.as_ref(), request);
        match AssertUnwindSafe(worker.run()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(RenderError::internal(format!(
                "render worker panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    });
    completion.complete(outcome);
    debug!("Render worker finished");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

/// One-shot completion handle owned by the worker.
///
/// Whatever path the worker takes, the caller's future is resolved once:
/// explicitly through [`Completion::complete`], or with an `Internal`
/// failure when the guard is dropped unused.
struct Completion {
    tx: Option<oneshot::Sender<RenderOutcome>>,
}

impl Completion {
    fn new(tx: oneshot::Sender<RenderOutcome>) -> Self {
        Self { tx: Some(tx) }
    }

    fn complete(mut self, outcome: RenderOutcome) {
        self.send(outcome);
    }

    fn send(&mut self, outcome: RenderOutcome) {
        if let Some(tx) = self.tx.take() {
            if tx.send(outcome).is_err() {
                debug!("Render result discarded: caller stopped waiting");
            }
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.send(Err(RenderError::internal(
                "render worker stopped before completing",
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderSettings;
    use crate::engine::{EngineError, RenderSession};
    use crate::worker::RenderSource;
    use async_trait::async_trait;
    use std::path::Path;

    #[derive(Clone, Copy)]
    enum Mode {
        Ready,
        NeverReady,
        Panic,
    }

    struct StubEngine(Mode);

    struct StubSession(Mode);

    #[async_trait(?Send)]
    impl RenderEngine for StubEngine {
        type Session = StubSession;

        fn name(&self) -> &'static str {
            "stub"
        }

        async fn create_session(&self, _environment: &Path) -> Result<StubSession, EngineError> {
            Ok(StubSession(self.0))
        }
    }

    #[async_trait(?Send)]
    impl RenderSession for StubSession {
        async fn navigate(&mut self, _source: &RenderSource) -> Result<(), EngineError> {
            Ok(())
        }

        async fn content_ready(&mut self) -> Result<(), EngineError> {
            match self.0 {
                Mode::Ready => Ok(()),
                Mode::NeverReady => std::future::pending().await,
                Mode::Panic => panic!("engine callback blew up"),
            }
        }

        async fn inject_presentation(&mut self, _css: &str) -> Result<(), EngineError> {
            Ok(())
        }

        async fn export_to_file(
            &mut self,
            _path: &Path,
            _settings: &RenderSettings,
        ) -> Result<(), EngineError> {
            Ok(())
        }

        async fn export_to_stream(
            &mut self,
            _settings: &RenderSettings,
        ) -> Result<Vec<u8>, EngineError> {
            Ok(b"%PDF-1.7".to_vec())
        }
    }

    fn request() -> RenderRequest {
        RenderRequest::new(RenderSource::Html("<p>x</p>".into()))
    }

    #[tokio::test]
    async fn ready_engine_resolves_with_bytes() {
        let bridge = RenderBridge::new(StubEngine(Mode::Ready), Duration::from_secs(5));
        let out = bridge.submit(request()).await.unwrap();
        assert_eq!(out.bytes(), Some(&b"%PDF-1.7"[..]));
    }

    #[tokio::test]
    async fn never_ready_engine_times_out() {
        let bridge = RenderBridge::new(StubEngine(Mode::NeverReady), Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = bridge.submit(request()).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "timed out");
        assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
    }

    #[tokio::test]
    async fn worker_panic_becomes_internal_failure() {
        let bridge = RenderBridge::new(StubEngine(Mode::Panic), Duration::from_secs(5));
        let err = bridge.submit(request()).await.unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert!(err.to_string().contains("engine callback blew up"), "{err}");
    }

    #[tokio::test]
    async fn concurrent_submissions_are_independent() {
        let bridge = RenderBridge::new(StubEngine(Mode::Ready), Duration::from_secs(5));
        let slow = RenderBridge::new(StubEngine(Mode::NeverReady), Duration::from_millis(150));

        let (a, b, c) = tokio::join!(
            bridge.submit(request()),
            slow.submit(request()),
            bridge.submit(request())
        );
        assert!(a.is_ok());
        assert!(b.unwrap_err().is_timeout());
        assert!(c.is_ok());
    }

    #[test]
    fn submit_blocking_works_without_runtime() {
        let bridge = RenderBridge::new(StubEngine(Mode::Ready), Duration::from_secs(5));
        let out = bridge.submit_blocking(request()).unwrap();
        assert!(out.bytes().is_some());
    }

    #[test]
    fn dropped_completion_reports_internal_failure() {
        let (tx, mut rx) = oneshot::channel();
        drop(Completion::new(tx));
        let err = rx.try_recv().unwrap().unwrap_err();
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn completion_sends_once() {
        let (tx, mut rx) = oneshot::channel();
        Completion::new(tx).complete(Ok(RenderArtifact::Bytes(vec![1])));
        assert_eq!(rx.try_recv().unwrap().unwrap(), RenderArtifact::Bytes(vec![1]));
    }
}
