//! Client for the Car2DB vehicle specification API.
//!
//! The only capability the rest of the server needs is
//! [`ApiClient::get`]: a JSON GET with authentication headers, a per-attempt
//! timeout, exponential-backoff retries for transient failures, and
//! normalised errors.
//!
//! # Error Taxonomy
//!
//! | Failure | Retried | Surfaced as |
//! |---------|---------|-------------|
//! | 4xx response | never | [`FetchError::Http`] with hint |
//! | 5xx response | up to `max_retries` | [`FetchError::Http`] with hint |
//! | Timeout | up to `max_retries` | [`FetchError::Timeout`] |
//! | Malformed JSON on 2xx | never | [`FetchError::Decode`] |
//! | Other network error | never | [`FetchError::Network`] |

pub mod client;
pub mod error;
pub mod query;
pub mod types;

pub use client::{backoff_delay, ApiClient, ClientConfig};
pub use error::{hint_for_status, ApiError, FetchError, FetchResult};
pub use query::{QueryParams, QueryValue};
pub use types::Listing;
