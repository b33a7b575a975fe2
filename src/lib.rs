// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Ypareo - Stateful Session Client
//!
//! An HTTP client for sites that authenticate with a login form and a
//! session cookie.
//!
//! ## Features
//!
//! - Request engine: redirects with method downgrade, per-attempt timeouts,
//!   opt-in retries with exponential backoff, status validation
//! - Cookie jar: domain/path/secure matching, lazy expiry, JSON persistence
//! - Sessions: save and restore without logging in again
//! - Login: CSRF-aware form login with automatic re-login on stale sessions
//! - Credentials held encrypted in memory and dropped after login
//! - Typed lifecycle events
//!
//! ## Example
//!
//! ```rust,no_run
//! use ypareo::{Client, ClientConfig, EventKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::new(
//!         "https://ypareo.example.com",
//!         "jdoe",
//!         "secret",
//!     ))?;
//!
//!     client.on(EventKind::Error, |event| eprintln!("{:?}", event));
//!
//!     let user = client.login().await?;
//!     println!("Logged in as {}", user);
//!
//!     // Persist and restore later without the password
//!     let saved = client.save_session()?;
//!     client.restore_session(&saved, false).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod session;

// Re-exports for convenience

// Client
pub use client::{Client, ClientConfig};

// Auth
pub use auth::{AuthEvent, AuthManager, AuthUrls, EventKind, EventManager, ListenerId};
pub use auth::{DefaultPageParser, LoginErrorCode, PageParser, PasswordManager};

// Errors
pub use error::{Error, FlowStage, HttpError, HttpErrorKind, Result};

// HTTP
pub use http::{Cookie, CookieJar, HttpClient, HttpClientConfig, RequestOptions, Response};

// Session
pub use session::{Registration, SerializedSession, SessionManager, SessionState, User};

/// Ypareo client version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
