//! Transport-only client for the fragments generation and sandbox routes.
//!
//! The generation routes answer with a plain text stream carrying one JSON
//! object as it is being written. This crate turns that stream into cumulative
//! [`generation_provider::FragmentSnapshot`] values and owns nothing beyond
//! the HTTP exchange: no history, no retries, no UI state.

pub mod client;
pub mod config;
pub mod error;
pub mod partial_json;
pub mod stream;
pub mod url;

pub use client::{CancellationSignal, FragmentsApiClient};
pub use config::FragmentsApiConfig;
pub use error::FragmentsApiError;
pub use partial_json::{parse_partial_json, PartialJsonError};
pub use stream::ObjectStreamParser;
pub use url::{endpoint_url, SANDBOX_PATH};
