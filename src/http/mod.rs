//! HTTP client module
//!
//! Provides the HTTP layer beneath the playback source adapter.
//!
//! # Features
//!
//! - **Automatic Retries**: bounded retries with backoff, internal to a fetch
//! - **Rate Limiting**: token bucket rate limiter using governor
//! - **Backoff Strategies**: constant, linear, and exponential
//! - **Authentication**: integration with the auth module

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
