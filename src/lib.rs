//! # Courier - a typed JSON HTTP client
//!
//! Courier is a small, reusable HTTP request client built on top of `reqwest`.
//! It unifies URL construction with query parameters, JSON encoding/decoding
//! with a lenient fallback for primitive and empty responses, a typed error
//! taxonomy, cross-cutting request observers and session-expiry signaling,
//! and bulk cancellation of in-flight work.
//!
//! ## Quick Start
//!
//! ```no_run
//! use courier::Client;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//!     email: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//!     email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), courier::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")
//!         .default_header("User-Agent", "my-app/1.0")
//!         .build();
//!
//!     // GET request
//!     if let Some(user) = client.get::<User>("users/123").await? {
//!         println!("User: {}", user.name);
//!     }
//!
//!     // POST request
//!     let new_user = CreateUser {
//!         name: "Alice".to_string(),
//!         email: "alice@example.com".to_string(),
//!     };
//!     let created: Option<User> = client.post("users", &new_user).await?;
//!     println!("Created user: {:?}", created.map(|u| u.id));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typed requests and responses** - generic over request/response types
//!   with automatic JSON serialization; `Option` stands in for "no body" on
//!   both sides
//! - **Lenient decoding** - `null` and bare scalar response bodies decode
//!   against primitive targets instead of failing
//! - **Three-way error taxonomy** - [`Error::Coding`], [`Error::Network`],
//!   and [`Error::Http`] tell local, transport, and protocol failures apart
//! - **Request observers** - loggers see every completed request exactly
//!   once, and an authenticated 401 fires the session-expiry hook
//! - **Pluggable transport** - the [`Transport`] trait isolates the wire;
//!   swap in a test double or tune the underlying `reqwest` client
//! - **Bulk cancellation** - [`Client::cancel_all`] cancels everything in
//!   flight; later requests are unaffected
//! - **Date strategies** - [`Timestamp`] fields follow the client's
//!   configured [`DateFormat`]
//!
//! ## Error Handling
//!
//! ```no_run
//! use courier::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://api.example.com").build();
//! match client.get::<serde_json::Value>("endpoint").await {
//!     Ok(body) => println!("Success: {body:?}"),
//!     Err(Error::Http { response, body }) => {
//!         eprintln!("HTTP {}: {}", response.status, String::from_utf8_lossy(&body));
//!     }
//!     Err(Error::Network { source, .. }) => {
//!         eprintln!("Transport failure: {source}");
//!     }
//!     Err(Error::Coding(e)) => {
//!         eprintln!("Payload problem: {e}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! No retry, backoff, or partial-failure recovery happens anywhere in the
//! crate; all recovery policy belongs to the caller.

mod client;
mod codec;
mod error;
mod metadata;
pub mod query;
pub mod transport;

pub use client::{Client, ClientBuilder, RequestLogger, SessionExpiredHook, MIME_JSON};
pub use codec::{DateFormat, JsonCodec, Timestamp};
pub use error::{BoxError, Error, Result};
pub use metadata::RequestMetadata;
pub use transport::{ReqwestTransport, RequestParts, ResponseMetadata, Transport};
