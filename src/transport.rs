//! The transport seam between the client and the wire.
//!
//! A [`Transport`] executes one prepared request asynchronously and supports
//! cancelling every request it currently has in flight. Connection pooling,
//! TLS, and redirects are the transport's business; the client never looks
//! behind this trait. The default implementation, [`ReqwestTransport`], is
//! what [`Client::builder`](crate::Client::builder) wires in, and test
//! doubles can stand in for it.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use tokio::sync::watch;
use url::Url;

use crate::error::BoxError;

/// A fully prepared request, ready for the wire.
///
/// This is what the client hands to the transport and to request loggers:
/// target URL, method, complete header map, body bytes (possibly empty), and
/// the per-request timeout.
#[derive(Debug, Clone)]
pub struct RequestParts {
    /// The fully qualified target URL, query string included.
    pub url: Url,
    /// The HTTP method.
    pub method: Method,
    /// All headers, fixed and client defaults merged.
    pub headers: HeaderMap,
    /// The request body; empty means no body.
    pub body: Bytes,
    /// How long the transport may spend on this request.
    pub timeout: Duration,
}

/// Status code and headers of a received response.
///
/// This is everything the client needs to classify an outcome; the body
/// travels separately.
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
}

impl ResponseMetadata {
    /// Whether the status code is in `200..300`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A transport-level failure.
///
/// `response` carries metadata when the failure happened after headers were
/// received (an interrupted body read, for instance).
#[derive(Debug)]
pub struct TransportError {
    /// The underlying error.
    pub source: BoxError,
    /// Response metadata, if any arrived before the failure.
    pub response: Option<ResponseMetadata>,
}

impl TransportError {
    fn cancelled() -> Self {
        Self {
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                "request cancelled",
            )),
            response: None,
        }
    }
}

/// What a transport reports back for one executed request.
pub type TransportResult = std::result::Result<(ResponseMetadata, Bytes), TransportError>;

/// The external networking capability the client dispatches through.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes one prepared request and reports the outcome.
    async fn execute(&self, request: &RequestParts) -> TransportResult;

    /// Cancels every request currently in flight, best effort.
    ///
    /// Cancelled executions still complete, reporting a transport error.
    /// Requests dispatched after this call are unaffected.
    fn cancel_all(&self);
}

/// The default [`Transport`], backed by a shared [`reqwest::Client`].
pub struct ReqwestTransport {
    http: reqwest::Client,
    // Current cancellation generation. Each execute subscribes to the
    // generation live at dispatch time; cancel_all fires it and installs a
    // fresh one, so only already-dispatched requests are affected.
    cancel: Mutex<watch::Sender<bool>>,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Creates a transport around an existing `reqwest::Client`, keeping its
    /// connection pool and TLS configuration.
    pub fn with_client(http: reqwest::Client) -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            http,
            cancel: Mutex::new(tx),
        }
    }

    async fn dispatch(&self, request: &RequestParts) -> TransportResult {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .timeout(request.timeout);
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| TransportError {
            source: e.into(),
            response: None,
        })?;

        let metadata = ResponseMetadata {
            status: response.status(),
            headers: response.headers().clone(),
        };
        match response.bytes().await {
            Ok(body) => Ok((metadata, body)),
            Err(e) => Err(TransportError {
                source: e.into(),
                response: Some(metadata),
            }),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &RequestParts) -> TransportResult {
        let mut cancelled = self.cancel.lock().unwrap().subscribe();
        tokio::select! {
            outcome = self.dispatch(request) => outcome,
            // Fires on cancel_all (value change) or on the old generation
            // being dropped; both mean this request was cancelled.
            _ = cancelled.changed() => Err(TransportError::cancelled()),
        }
    }

    fn cancel_all(&self) {
        let mut guard = self.cancel.lock().unwrap();
        let _ = guard.send(true);
        *guard = watch::channel(false).0;
    }
}
