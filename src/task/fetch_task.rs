//! The single-shot fetch task and its builder

use std::sync::{Arc, OnceLock};
use tokio::runtime::Handle;
use tracing::Instrument;
use url::Url;

use super::handler::FetchHandler;
use super::state::{FetchHandle, TaskShared};
use super::worker::{FetchJob, complete, deliver};
use crate::config::FetchConfig;
use crate::decode::DecodeStrategy;
use crate::error::{Error, FetchError, Result};
use crate::pool::FetchPool;
use crate::traffic::TrafficTag;
use crate::transport::{HttpTransport, Transport};
use crate::types::{Outcome, RequestKind, TaskId, TaskState};

/// A single-shot, cancellable HTTP GET with typed decoding
///
/// A task is built with a URL and a [`FetchHandler`], optionally given a
/// [`DecodeStrategy`], and then executed exactly once. The request runs on a
/// [`FetchPool`] worker; the outcome is delivered to the handler on the
/// runtime that called [`FetchTask::execute`], or inline on the worker if
/// `execute` was called outside any runtime.
///
/// URL problems never panic. An empty, unparsable or non-HTTP URL is
/// recorded when the task is built and reported through
/// [`FetchHandler::on_error`] as `InvalidInput` when it executes.
///
/// # Examples
///
/// ```no_run
/// use fetch_task::{DecodeStrategy, FetchTask, Outcome};
/// use serde::Deserialize;
/// use tokio::sync::oneshot;
///
/// #[derive(Debug, Deserialize)]
/// struct Meta {
///     status: u16,
/// }
///
/// #[derive(Debug, Deserialize)]
/// struct Envelope {
///     meta: Meta,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (tx, rx) = oneshot::channel::<Outcome<Envelope>>();
/// let mut task = FetchTask::new("http://example.test/v1/gifs/translate?s=facepalm", tx)
///     .with_decode(DecodeStrategy::json())?;
/// let handle = task.execute()?;
///
/// match rx.await? {
///     Outcome::Value(envelope) => println!("meta.status = {}", envelope.meta.status),
///     Outcome::Error(e) => eprintln!("task {} failed: {}", handle.id(), e),
/// }
/// # Ok(())
/// # }
/// ```
pub struct FetchTask<R> {
    shared: Arc<TaskShared>,
    url: std::result::Result<Url, FetchError>,
    kind: RequestKind,
    decode: Option<DecodeStrategy<R>>,
    handler: Option<Box<dyn FetchHandler<R>>>,
    traffic_tag: Option<TrafficTag>,
    config: Option<Arc<FetchConfig>>,
    transport: Option<Arc<dyn Transport>>,
    pool: Option<FetchPool>,
}

impl<R: Send + 'static> FetchTask<R> {
    /// Create a GET task for `url` that reports to `handler`
    pub fn new(url: impl AsRef<str>, handler: impl FetchHandler<R>) -> Self {
        Self::with_kind(url, RequestKind::Get, handler)
    }

    /// Create a task with an explicit request kind
    ///
    /// `RequestKind::Post` is reserved; such a task fails with
    /// `InvalidInput` when executed, without touching the network.
    pub fn with_kind(
        url: impl AsRef<str>,
        kind: RequestKind,
        handler: impl FetchHandler<R>,
    ) -> Self {
        Self {
            shared: TaskShared::new(),
            url: parse_url(url.as_ref()),
            kind,
            decode: None,
            handler: Some(Box::new(handler)),
            traffic_tag: None,
            config: None,
            transport: None,
            pool: None,
        }
    }

    /// Select how the response body becomes `R`
    ///
    /// # Errors
    ///
    /// Returns `Error::DecodeAlreadySelected` if a strategy was already set.
    pub fn with_decode(mut self, strategy: DecodeStrategy<R>) -> Result<Self> {
        if self.decode.is_some() {
            return Err(Error::DecodeAlreadySelected);
        }
        self.decode = Some(strategy);
        Ok(self)
    }

    /// Override the traffic tag (default comes from the configuration)
    pub fn with_traffic_tag(mut self, tag: impl Into<TrafficTag>) -> Self {
        self.traffic_tag = Some(tag.into());
        self
    }

    /// Use `config` for timeouts and the default traffic tag
    pub fn with_config(mut self, config: impl Into<Arc<FetchConfig>>) -> Self {
        self.config = Some(config.into());
        self
    }

    /// Use `transport` instead of the shared HTTP transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Run on `pool` instead of the shared pool
    pub fn with_pool(mut self, pool: FetchPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Id of this task
    pub fn id(&self) -> TaskId {
        self.shared.id()
    }

    /// Current state
    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// The parsed URL, if it was valid
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref().ok()
    }

    /// The request kind
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// The traffic tag this task will run under
    pub fn traffic_tag(&self) -> TrafficTag {
        self.traffic_tag
            .unwrap_or_else(|| self.effective_config().traffic_tag)
    }

    /// A handle observing this task
    pub fn handle(&self) -> FetchHandle {
        FetchHandle::new(Arc::clone(&self.shared))
    }

    /// Cancel the task
    ///
    /// Allowed before or during execution. Cancelling before `execute()`
    /// makes a later `execute()` fail with `Error::AlreadyExecuted`.
    /// Returns `false` if the task had already reached a terminal state.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Start the task
    ///
    /// A URL or request-kind problem is reported through `on_error` before
    /// this returns. Otherwise the request is queued on the pool and this
    /// returns immediately.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyExecuted` if the task is not in the `Created` state
    /// - `Error::Runtime` or `Error::HttpClient` if the shared pool or the
    ///   shared transport cannot be built; the task stays in `Created`
    pub fn execute(&mut self) -> Result<FetchHandle> {
        self.ensure_created()?;

        let url = match self.preflight() {
            Ok(url) => url,
            Err(error) => {
                self.fail_fast(error)?;
                return Ok(self.handle());
            }
        };

        let pool = match &self.pool {
            Some(pool) => pool.clone(),
            None => FetchPool::shared()?,
        };
        let transport: Arc<dyn Transport> = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => HttpTransport::shared()?,
        };
        let config = self.effective_config();
        let traffic_tag = self.traffic_tag();

        let handler = self.start()?;
        let origin = Handle::try_current().ok();
        let id = self.id();

        let job = FetchJob {
            shared: Arc::clone(&self.shared),
            url,
            decode: self.decode.take().unwrap_or(DecodeStrategy::None),
            transport,
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            traffic_tag,
        };

        let span = tracing::info_span!(
            "fetch",
            task_id = %id,
            url = %job.url,
            traffic_tag = %traffic_tag
        );
        tracing::debug!(
            parent: &span,
            decode = job.decode.name(),
            in_flight = pool.in_flight(),
            "fetch task queued"
        );

        let shared = Arc::clone(&self.shared);
        let work = async move {
            if let Some(outcome) = job.run().await {
                deliver(shared, handler, outcome, origin);
            }
        }
        .instrument(span);

        // Detached; cancellation goes through the shared token
        drop(pool.spawn(self.shared.cancel_token(), work));

        Ok(self.handle())
    }

    fn ensure_created(&self) -> Result<()> {
        match self.state() {
            TaskState::Created => Ok(()),
            state => Err(Error::AlreadyExecuted {
                id: self.id(),
                state,
            }),
        }
    }

    fn preflight(&self) -> std::result::Result<Url, FetchError> {
        if self.kind == RequestKind::Post {
            return Err(FetchError::invalid_input("HTTP POST unsupported"));
        }
        self.url.clone()
    }

    /// Move to `Running` and take the handler; fails if another caller won
    fn start(&mut self) -> Result<Box<dyn FetchHandler<R>>> {
        let already = |task: &Self| Error::AlreadyExecuted {
            id: task.id(),
            state: task.state(),
        };
        if !self.shared.advance(TaskState::Running) {
            return Err(already(self));
        }
        self.handler.take().ok_or_else(|| already(self))
    }

    fn fail_fast(&mut self, error: FetchError) -> Result<()> {
        let handler = self.start()?;
        tracing::warn!(
            task_id = %self.id(),
            error = %error,
            "fetch task rejected before execution"
        );
        complete(&self.shared, handler, Outcome::Error(error));
        Ok(())
    }

    fn effective_config(&self) -> Arc<FetchConfig> {
        match &self.config {
            Some(config) => Arc::clone(config),
            None => default_config(),
        }
    }
}

impl<R> std::fmt::Debug for FetchTask<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchTask")
            .field("id", &self.shared.id())
            .field("state", &self.shared.state())
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("kind", &self.kind)
            .field("decode", &self.decode.is_some())
            .field("traffic_tag", &self.traffic_tag)
            .finish_non_exhaustive()
    }
}

fn default_config() -> Arc<FetchConfig> {
    static DEFAULT: OnceLock<Arc<FetchConfig>> = OnceLock::new();
    Arc::clone(DEFAULT.get_or_init(|| Arc::new(FetchConfig::default())))
}

fn parse_url(raw: &str) -> std::result::Result<Url, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FetchError::invalid_input("URL is empty"));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| FetchError::invalid_input(format!("invalid URL '{}': {}", trimmed, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(FetchError::invalid_input(format!(
            "unsupported URL scheme '{}'",
            scheme
        ))),
    }
}
