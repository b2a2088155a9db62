//! HTTP client with a typed JSON request pipeline.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] to configure and create clients.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{
    codec::{DateFormat, JsonCodec},
    metadata::RequestMetadata,
    query,
    transport::{ReqwestTransport, RequestParts, ResponseMetadata, Transport, TransportError},
    Error, Result,
};

/// The JSON MIME type, sent as `Accept` on every request and as
/// `Content-Type` whenever a body is present.
pub const MIME_JSON: &str = "application/json";

/// Fixed per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A request observer, invoked exactly once per completed request with the
/// prepared request, the response body bytes (if any), the response metadata
/// (if any), and the classified error (if any).
pub type RequestLogger =
    Arc<dyn Fn(&RequestParts, Option<&[u8]>, Option<&ResponseMetadata>, Option<&Error>) + Send + Sync>;

/// Invoked when a request that requires valid authentication receives a 401.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// An HTTP client bound to one base URL.
///
/// The client is cheap to clone and designed to be reused across many
/// requests. Configuration (default headers, loggers, the session-expiry
/// hook) is expected to happen at setup time; the client takes read locks on
/// it at dispatch, so concurrent reconfiguration during traffic is safe but
/// callers should serialize it themselves if ordering matters.
///
/// # Examples
///
/// ```no_run
/// use courier::Client;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct CreateUser {
///     name: String,
///     email: String,
/// }
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), courier::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .default_header("User-Agent", "my-app/1.0")
///     .build();
///
/// let user: Option<User> = client.get("users/123").await?;
///
/// let new_user = CreateUser {
///     name: "Alice".to_string(),
///     email: "alice@example.com".to_string(),
/// };
/// let created: Option<User> = client.post("users", &new_user).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: Url,
    codec: RwLock<Arc<JsonCodec>>,
    default_headers: RwLock<HeaderMap>,
    loggers: RwLock<Vec<RequestLogger>>,
    expired: RwLock<Option<SessionExpiredHook>>,
}

impl Client {
    /// Creates a new [`ClientBuilder`] for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Makes a typed HTTP request.
    ///
    /// This is the full-control entry point the verb helpers forward to. The
    /// body is encoded to JSON (`None` means no body and no `Content-Type`);
    /// an encode failure completes with [`Error::Coding`] without dispatching
    /// anything. A non-empty response body is decoded strictly into `Res`,
    /// falling back to the lenient fragment interpretation for `null` and
    /// bare scalar bodies. An empty response body yields `Ok(None)`.
    ///
    /// # Type Parameters
    ///
    /// * `Req` - The request body type (must implement `Serialize`)
    /// * `Res` - The response body type (must implement `DeserializeOwned`)
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use courier::{Client, RequestMetadata};
    /// use http::Method;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize)]
    /// struct Search { query: String }
    ///
    /// #[derive(Deserialize)]
    /// struct Results { hits: Vec<String> }
    ///
    /// # async fn example() -> Result<(), courier::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")
    ///     .build();
    ///
    /// let metadata = RequestMetadata::new(Method::POST, "search")
    ///     .with_query_param("page", 2)
    ///     .with_auth();
    /// let body = Search { query: "rust".to_string() };
    ///
    /// let results: Option<Results> = client.call(metadata, Some(&body)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<Req, Res>(
        &self,
        metadata: RequestMetadata,
        body: Option<&Req>,
    ) -> Result<Option<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        // Outstanding work holds the codec it started with, not the whole
        // client; swapping the date format mid-flight affects later requests.
        let codec = self.codec();
        let encoded = match body {
            Some(value) => Bytes::from(codec.encode(value)?),
            None => Bytes::new(),
        };
        let request = self.build_request(&metadata, encoded, MIME_JSON);
        match self.send(request, metadata.requires_auth).await? {
            Some(bytes) if !bytes.is_empty() => codec.decode(&bytes),
            _ => Ok(None),
        }
    }

    /// Makes a typed request and discards the response body without
    /// attempting to decode it.
    ///
    /// This is the "no response body expected" counterpart of [`Client::call`];
    /// pass `None::<&()>` for a body-less fire of the endpoint.
    pub async fn invoke<Req>(&self, metadata: RequestMetadata, body: Option<&Req>) -> Result<()>
    where
        Req: Serialize,
    {
        let encoded = match body {
            Some(value) => Bytes::from(self.codec().encode(value)?),
            None => Bytes::new(),
        };
        let request = self.build_request(&metadata, encoded, MIME_JSON);
        self.send(request, metadata.requires_auth).await?;
        Ok(())
    }

    /// Builds the wire-level request for the given metadata and body.
    ///
    /// Resolves the path against the base URL (an empty path addresses the
    /// base URL itself), attaches the query string when parameters are
    /// present, and sets the fixed headers (`Accept: application/json`,
    /// `Accept-Encoding: gzip`, `Cache-Control: no-cache`) plus the 60 second
    /// timeout. Client default headers are applied last and may override the
    /// fixed ones.
    ///
    /// # Panics
    ///
    /// Panics if `body` is non-empty and the method is GET, HEAD, or DELETE
    /// (a programming-contract violation), or if the path cannot be resolved
    /// against the base URL.
    pub fn build_request(
        &self,
        metadata: &RequestMetadata,
        body: Bytes,
        content_type: &str,
    ) -> RequestParts {
        let url = if metadata.path.is_empty() {
            self.inner.base_url.clone()
        } else {
            self.inner
                .base_url
                .join(&metadata.path)
                .unwrap_or_else(|e| panic!("invalid request path {:?}: {e}", metadata.path))
        };
        let url = if metadata.query_params.is_empty() {
            url
        } else {
            query::with_query(&url, &metadata.query_params)
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(MIME_JSON));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        if !body.is_empty() {
            let method = &metadata.method;
            if *method == Method::GET || *method == Method::HEAD || *method == Method::DELETE {
                panic!("request body not supported for method {method}");
            }
            let value = HeaderValue::from_str(content_type)
                .unwrap_or_else(|e| panic!("invalid content type {content_type:?}: {e}"));
            headers.insert(header::CONTENT_TYPE, value);
        }

        for (name, value) in self.inner.default_headers.read().unwrap().iter() {
            headers.insert(name.clone(), value.clone());
        }

        RequestParts {
            url,
            method: metadata.method.clone(),
            headers,
            body,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Dispatches a prepared request and classifies the outcome.
    ///
    /// Every registered logger is invoked exactly once with the request, the
    /// response body bytes, the response metadata, and the classified error,
    /// before this future resolves. A panicking logger is contained and
    /// reported through `tracing`; it never affects the returned result or
    /// the remaining loggers. Classification order: a transport error
    /// becomes [`Error::Network`]; a response with a status outside `200..300`
    /// becomes [`Error::Http`] (and, when `requires_auth` is set and the
    /// status is 401, fires the session-expiry hook once on the runtime,
    /// independently of this future); anything else is success.
    ///
    /// On success the raw response body is returned; an empty body comes back
    /// as `Some` empty bytes and is treated as "no body" by the typed
    /// pipeline.
    pub async fn send(&self, request: RequestParts, requires_auth: bool) -> Result<Option<Bytes>> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            body_bytes = request.body.len(),
            "dispatching HTTP request"
        );

        let (body, response, error) = match self.inner.transport.execute(&request).await {
            Ok((metadata, body)) => {
                tracing::info!(
                    status = metadata.status.as_u16(),
                    url = %request.url,
                    "received HTTP response"
                );
                if metadata.is_success() {
                    (Some(body), Some(metadata), None)
                } else {
                    let error = Error::Http {
                        response: metadata.clone(),
                        body: body.clone(),
                    };
                    (Some(body), Some(metadata), Some(error))
                }
            }
            Err(TransportError { source, response }) => {
                tracing::warn!(
                    error = %source,
                    url = %request.url,
                    "transport failure"
                );
                let metadata = response.clone();
                (None, metadata, Some(Error::Network { source, response }))
            }
        };

        let loggers = self.inner.loggers.read().unwrap().clone();
        for logger in &loggers {
            // An observer failure must not replace the classified completion.
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                logger(&request, body.as_deref(), response.as_ref(), error.as_ref())
            }));
            if outcome.is_err() {
                tracing::error!(url = %request.url, "request logger panicked");
            }
        }

        if requires_auth && error.as_ref().and_then(Error::status) == Some(StatusCode::UNAUTHORIZED)
        {
            if let Some(hook) = self.inner.expired.read().unwrap().clone() {
                tracing::warn!(url = %request.url, "session expired");
                tokio::spawn(async move { hook() });
            }
        }

        match error {
            Some(e) => Err(e),
            None => Ok(body),
        }
    }

    /// Makes a GET request to the specified path.
    pub async fn get<Res>(&self, path: impl Into<String>) -> Result<Option<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call::<(), Res>(RequestMetadata::new(Method::GET, path), None)
            .await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Option<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::POST, path), Some(body))
            .await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Option<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::PUT, path), Some(body))
            .await
    }

    /// Makes a PATCH request to the specified path with a JSON body.
    pub async fn patch<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Option<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::PATCH, path), Some(body))
            .await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<Res>(&self, path: impl Into<String>) -> Result<Option<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call::<(), Res>(RequestMetadata::new(Method::DELETE, path), None)
            .await
    }

    /// Cancels every request currently in flight, best effort.
    ///
    /// Cancelled requests still complete, reporting [`Error::Network`];
    /// requests dispatched after this call are unaffected.
    pub fn cancel_all(&self) {
        self.inner.transport.cancel_all();
    }

    /// Sets a default header applied to every subsequent request, after the
    /// fixed headers (so it may override them).
    pub fn set_default_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.default_headers.write().unwrap().insert(name, value);
    }

    /// Registers a request logger. Loggers are invoked in registration order,
    /// once per completed request.
    pub fn add_logger(&self, logger: RequestLogger) {
        self.inner.loggers.write().unwrap().push(logger);
    }

    /// Sets the hook invoked when an authenticated request receives a 401.
    pub fn on_session_expired(&self, hook: SessionExpiredHook) {
        *self.inner.expired.write().unwrap() = Some(hook);
    }

    /// The codec currently used for request and response bodies.
    pub fn codec(&self) -> Arc<JsonCodec> {
        Arc::clone(&self.inner.codec.read().unwrap())
    }

    /// Sets the date strategy for all subsequent encode and decode calls.
    ///
    /// Requests already in flight keep the codec they were dispatched with.
    pub fn set_date_format(&self, format: DateFormat) {
        *self.inner.codec.write().unwrap() = Arc::new(JsonCodec::new(format));
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use courier::{ClientBuilder, DateFormat};
///
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")
///     .default_header("User-Agent", "my-app/1.0")
///     .date_format(DateFormat::UnixMillis)
///     .build();
/// ```
pub struct ClientBuilder {
    base_url: Option<String>,
    default_headers: HeaderMap,
    loggers: Vec<RequestLogger>,
    expired: Option<SessionExpiredHook>,
    date_format: DateFormat,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            loggers: Vec::new(),
            expired: None,
            date_format: DateFormat::default(),
            transport: None,
        }
    }

    /// Sets the base URL for all requests. Required.
    ///
    /// The URL must be absolute; a trailing slash is appended when missing so
    /// relative paths resolve under the final path segment instead of
    /// replacing it.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Adds a default header included in all requests.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid; headers are
    /// construction-time configuration and an invalid one is a bug in the
    /// calling code.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref())
            .unwrap_or_else(|e| panic!("invalid header name {:?}: {e}", name.as_ref()));
        let value = HeaderValue::try_from(value.as_ref())
            .unwrap_or_else(|e| panic!("invalid header value {:?}: {e}", value.as_ref()));
        self.default_headers.insert(name, value);
        self
    }

    /// Registers a request logger.
    pub fn logger(mut self, logger: RequestLogger) -> Self {
        self.loggers.push(logger);
        self
    }

    /// Sets the session-expiry hook.
    pub fn on_session_expired(mut self, hook: SessionExpiredHook) -> Self {
        self.expired = Some(hook);
        self
    }

    /// Sets the date strategy for the client's codec.
    pub fn date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    /// Replaces the default reqwest-backed transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the configured [`Client`].
    ///
    /// # Panics
    ///
    /// Panics if no base URL was provided or if it is not a valid absolute
    /// URL. A malformed base URL is a construction-time precondition
    /// violation, not a recoverable runtime condition.
    pub fn build(self) -> Client {
        let raw = self.base_url.expect("base URL is required");
        let mut base_url =
            Url::parse(&raw).unwrap_or_else(|e| panic!("invalid base URL {raw:?}: {e}"));
        assert!(
            !base_url.cannot_be_a_base(),
            "base URL {raw:?} cannot carry relative paths"
        );
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

        Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                codec: RwLock::new(Arc::new(JsonCodec::new(self.date_format))),
                default_headers: RwLock::new(self.default_headers),
                loggers: RwLock::new(self.loggers),
                expired: RwLock::new(self.expired),
            }),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::builder().base_url("https://api.example.com/v2").build()
    }

    #[test]
    fn test_empty_path_resolves_to_base_url() {
        let request = client().build_request(&RequestMetadata::default(), Bytes::new(), MIME_JSON);
        assert_eq!(request.url.as_str(), "https://api.example.com/v2/");
    }

    #[test]
    fn test_trailing_slash_normalization_keeps_base_path_segment() {
        let metadata = RequestMetadata::new(Method::GET, "users/7");
        let request = client().build_request(&metadata, Bytes::new(), MIME_JSON);
        assert_eq!(request.url.as_str(), "https://api.example.com/v2/users/7");
    }

    #[test]
    fn test_fixed_headers_and_timeout() {
        let request = client().build_request(&RequestMetadata::default(), Bytes::new(), MIME_JSON);
        assert_eq!(request.headers.get(header::ACCEPT).unwrap(), MIME_JSON);
        assert_eq!(request.headers.get(header::ACCEPT_ENCODING).unwrap(), "gzip");
        assert_eq!(request.headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(request.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_empty_body_has_no_content_type() {
        let request = client().build_request(&RequestMetadata::default(), Bytes::new(), MIME_JSON);
        assert!(request.headers.get(header::CONTENT_TYPE).is_none());
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_body_sets_content_type() {
        let metadata = RequestMetadata::new(Method::POST, "items");
        let request = client().build_request(&metadata, Bytes::from_static(b"{}"), MIME_JSON);
        assert_eq!(request.headers.get(header::CONTENT_TYPE).unwrap(), MIME_JSON);
    }

    #[test]
    fn test_default_headers_override_fixed_headers() {
        let client = Client::builder()
            .base_url("https://api.example.com")
            .default_header("Accept", "text/plain")
            .build();
        let request = client.build_request(&RequestMetadata::default(), Bytes::new(), MIME_JSON);
        assert_eq!(request.headers.get(header::ACCEPT).unwrap(), "text/plain");
    }

    #[test]
    #[should_panic(expected = "request body not supported")]
    fn test_body_on_get_panics() {
        let metadata = RequestMetadata::new(Method::GET, "items");
        client().build_request(&metadata, Bytes::from_static(b"{}"), MIME_JSON);
    }

    #[test]
    #[should_panic(expected = "invalid base URL")]
    fn test_malformed_base_url_panics() {
        Client::builder().base_url("not a url").build();
    }

    #[test]
    fn test_query_params_attached() {
        let metadata = RequestMetadata::new(Method::GET, "search").with_query_param("q", "rust");
        let request = client().build_request(&metadata, Bytes::new(), MIME_JSON);
        assert_eq!(request.url.query(), Some("q=rust"));
    }
}
