// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP client layer
//!
//! Provides the request engine (redirects, retries, timeouts, status
//! validation) and the cookie jar it reads from and writes to.

mod client;
mod cookie;
mod request;
mod response;
mod retry;

pub use client::{HttpClient, HttpClientConfig};
pub use cookie::{Cookie, CookieJar, SameSite, DELETED_SENTINEL};
pub use request::{
    MultipartField, MultipartValue, RequestBody, RequestConfig, RequestOptions, ResponseType,
    StatusValidator,
};
pub use response::{Response, ResponseData};
pub use retry::{exponential_backoff, RetryDelayFn, RetryOptions, RetryOverrides, RetryPredicate};

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Headers sent with every request, lowest precedence
pub const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("accept", "*/*"),
    ("accept-language", "en-US,en;q=0.9"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
];

/// Statuses treated as redirects
pub const REDIRECT_STATUSES: &[u16] = &[301, 302, 303, 307, 308];

/// Redirects replayed as GET without a body
pub const METHOD_DOWNGRADE_STATUSES: &[u16] = &[301, 302, 303];

/// Statuses retried by default when retries are enabled
pub const DEFAULT_RETRY_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Header names set by the auth flow
pub mod headers {
    pub const CONTENT_TYPE: &str = "content-type";
    pub const REFERER: &str = "referer";
    pub const ORIGIN: &str = "origin";
}
