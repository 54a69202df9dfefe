//! HTTP client module
//!
//! Request/response types and the retrying client used by the executor.

mod client;

pub use client::{join_url, HttpClient, HttpError, HttpRequest, HttpResponse, RetryPolicy};
