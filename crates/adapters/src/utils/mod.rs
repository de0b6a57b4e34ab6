//! Shared request plumbing for venue adapters
//!
//! - Fixed-window rate limiting per credential class
//! - The per-venue request dispatcher that owns the HTTP transport

pub mod dispatcher;
pub mod rate_limiter;

pub use dispatcher::{CredentialClass, DispatcherConfig, RequestDispatcher, DEFAULT_HTTP_TIMEOUT};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
