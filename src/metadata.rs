//! Per-request metadata.

use std::collections::HashMap;
use std::fmt::Display;

use http::Method;

/// Metadata for an individual HTTP request.
///
/// This describes one request relative to a client's base URL: method, path,
/// query parameters, and whether the request requires valid authentication
/// (which arms the session-expiry hook on a 401 response).
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path, resolved against the client's base URL. An empty
    /// path addresses the base URL itself.
    pub path: String,

    /// Query parameters for this request. Ordering carries no meaning.
    pub query_params: HashMap<String, String>,

    /// Whether a 401 response should signal session expiry.
    pub requires_auth: bool,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_params: HashMap::new(),
            requires_auth: false,
        }
    }

    /// Adds a query parameter, stringified with its `Display` representation.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.query_params.insert(key.into(), value.to_string());
        self
    }

    /// Adds multiple query parameters.
    pub fn with_query_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Marks this request as requiring valid authentication.
    pub fn with_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}
