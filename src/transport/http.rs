//! reqwest-backed transport

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use super::traits::{
    Transport, TransportError, TransportErrorKind, TransportRequest, TransportResponse,
};
use crate::config::FetchConfig;
use crate::error::Result;
use crate::traffic::TrafficStats;

/// Upper bound for pre-allocating the body buffer from `Content-Length`
const MAX_BODY_PREALLOC: u64 = 1024 * 1024;

/// HTTP transport built on a shared `reqwest::Client`
///
/// The client pools connections internally and is safe to use from many
/// workers at once, so one instance serves every task. reqwest fixes the
/// connect timeout per client, so a request asking for a different connect
/// timeout gets its own client, built once and reused. The read timeout is
/// applied to the response head and to every body chunk.
///
/// # Examples
///
/// ```no_run
/// use fetch_task::transport::HttpTransport;
///
/// # fn example() -> fetch_task::Result<()> {
/// // Process-wide instance built from the default configuration
/// let transport = HttpTransport::shared()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    config: FetchConfig,
    client: reqwest::Client,
    // Clients for connect timeouts other than `config.connect_timeout`
    by_connect_timeout: Mutex<HashMap<Duration, reqwest::Client>>,
}

impl HttpTransport {
    /// Build a transport from `config`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid, or
    /// `Error::HttpClient` if the client cannot be built.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(config, config.connect_timeout)?;

        Ok(Self {
            config: config.clone(),
            client,
            by_connect_timeout: Mutex::new(HashMap::new()),
        })
    }

    /// Client enforcing `connect_timeout`, with every other setting from the
    /// configuration this transport was built with
    fn client_for(
        &self,
        connect_timeout: Duration,
    ) -> std::result::Result<reqwest::Client, TransportError> {
        if connect_timeout == self.config.connect_timeout {
            return Ok(self.client.clone());
        }

        let mut clients = self
            .by_connect_timeout
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = clients.get(&connect_timeout) {
            return Ok(client.clone());
        }

        let client = build_client(&self.config, connect_timeout).map_err(|e| {
            TransportError::new(
                TransportErrorKind::Protocol,
                format!("failed to build client: {}", e),
            )
        })?;
        tracing::debug!(?connect_timeout, "built client for connect timeout");
        clients.insert(connect_timeout, client.clone());
        Ok(client)
    }

    /// The process-wide transport, built on first use from `FetchConfig::default()`
    ///
    /// # Errors
    ///
    /// Returns `Error::HttpClient` if the client cannot be built. A failed
    /// build is not cached; the next call tries again.
    pub fn shared() -> Result<Arc<HttpTransport>> {
        static SHARED: OnceLock<Arc<HttpTransport>> = OnceLock::new();

        if let Some(transport) = SHARED.get() {
            return Ok(Arc::clone(transport));
        }
        let transport = Arc::new(Self::new(&FetchConfig::default())?);
        Ok(Arc::clone(SHARED.get_or_init(|| transport)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        request: TransportRequest<'_>,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let url = request.url;
        let client = self.client_for(request.connect_timeout)?;
        let accounting = TrafficStats::global().begin(request.traffic_tag);

        // The response head must arrive within connect + read timeouts
        let head_deadline = request.connect_timeout + request.read_timeout;
        let send = client.get(url.clone()).send();
        let mut response = match tokio::time::timeout(head_deadline, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(classify_send_error(&e)),
            Err(_) => {
                return Err(TransportError::new(
                    TransportErrorKind::ReadTimeout,
                    format!("no response from '{}' within {:?}", url, head_deadline),
                ));
            }
        };

        let status = response.status();
        let reason = match status.canonical_reason() {
            Some(reason) => reason.to_string(),
            None => format!("HTTP {}", status.as_u16()),
        };
        tracing::debug!(url = %url, status = status.as_u16(), "response head received");

        let capacity = response
            .content_length()
            .unwrap_or(0)
            .min(MAX_BODY_PREALLOC) as usize;
        let mut body = Vec::with_capacity(capacity);

        loop {
            match tokio::time::timeout(request.read_timeout, response.chunk()).await {
                Ok(Ok(Some(chunk))) => {
                    accounting.record_bytes(chunk.len());
                    body.extend_from_slice(&chunk);
                }
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    return Err(TransportError::new(
                        TransportErrorKind::Io,
                        format!("failed to read response body from '{}': {}", url, e),
                    ));
                }
                Err(_) => {
                    return Err(TransportError::new(
                        TransportErrorKind::ReadTimeout,
                        format!(
                            "read timed out after {:?} while reading body from '{}'",
                            request.read_timeout, url
                        ),
                    ));
                }
            }
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

fn build_client(config: &FetchConfig, connect_timeout: Duration) -> Result<reqwest::Client> {
    let redirect = if config.follow_redirects {
        reqwest::redirect::Policy::limited(config.max_redirects)
    } else {
        reqwest::redirect::Policy::none()
    };

    let client = reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(config.user_agent.clone())
        .redirect(redirect)
        .build()?;
    Ok(client)
}

fn classify_send_error(e: &reqwest::Error) -> TransportError {
    if e.is_connect() || e.is_timeout() {
        TransportError::new(
            TransportErrorKind::Connect,
            format!("connection failed: {}", e),
        )
    } else if e.is_request() || e.is_redirect() || e.is_builder() {
        TransportError::new(
            TransportErrorKind::Protocol,
            format!("client protocol error: {}", e),
        )
    } else {
        TransportError::new(TransportErrorKind::Io, format!("request failed: {}", e))
    }
}
