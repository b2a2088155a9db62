//! Error types for HTTP API calls.
//!
//! Every failed request produces exactly one [`Error`] variant: a local
//! serialization problem ([`Error::Coding`]), a transport-level failure with
//! no usable HTTP semantics ([`Error::Network`]), or a well-formed HTTP
//! response outside the success range ([`Error::Http`]). The client never
//! retries on its own; recovery policy belongs to the caller.

use bytes::Bytes;
use http::StatusCode;

use crate::transport::ResponseMetadata;

/// A boxed error from the transport layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for HTTP API calls.
///
/// # Examples
///
/// ```no_run
/// use courier::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .build();
///
/// match client.get::<serde_json::Value>("users/123").await {
///     Ok(Some(value)) => println!("Got: {value}"),
///     Ok(None) => println!("Empty response"),
///     Err(Error::Http { response, body }) => {
///         eprintln!("HTTP {}: {}", response.status, String::from_utf8_lossy(&body));
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request body failed to serialize, or the response body failed to
    /// deserialize (after the lenient fragment fallback was exhausted).
    #[error("JSON coding failed: {0}")]
    Coding(#[from] serde_json::Error),

    /// A transport-level failure: the request never produced a usable HTTP
    /// response, or the response body could not be read.
    ///
    /// `response` is populated when response metadata arrived before the
    /// failure (for example, the headers were received but reading the body
    /// was interrupted). Cancelled requests also surface here.
    #[error("network error: {source}")]
    Network {
        /// The underlying transport error.
        #[source]
        source: BoxError,
        /// Response metadata, if any arrived before the failure.
        response: Option<ResponseMetadata>,
    },

    /// The server returned a status code outside `200..300`.
    #[error("HTTP error {}", .response.status)]
    Http {
        /// Status code and headers of the failing response.
        response: ResponseMetadata,
        /// The raw response body, preserved for debugging.
        body: Bytes,
    },
}

impl Error {
    /// Returns the HTTP status code if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|r| r.status)
    }

    /// Returns the response metadata if a response was received.
    pub fn response(&self) -> Option<&ResponseMetadata> {
        match self {
            Error::Coding(_) => None,
            Error::Network { response, .. } => response.as_ref(),
            Error::Http { response, .. } => Some(response),
        }
    }
}

/// A specialized `Result` type for HTTP API calls.
pub type Result<T> = std::result::Result<T, Error>;
