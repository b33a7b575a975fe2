// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for the session client
//!
//! Transport failures and rejected statuses share one [`HttpError`] shape,
//! distinguished by an optional status code. Authentication and session
//! state failures get their own variants, and the auth flows wrap whatever
//! went wrong in [`Error::Flow`] so observers see a single prefixed error.

use std::fmt;

use thiserror::Error;

use crate::auth::LoginErrorCode;
use crate::http::{RequestConfig, Response};

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    /// Request failed at the transport level or was rejected by status validation
    #[error(transparent)]
    Http(#[from] HttpError),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Login rejected by the server
    #[error("Authentication failed: {reason}")]
    Authentication {
        reason: String,
        code: Option<LoginErrorCode>,
        status: Option<u16>,
    },

    /// Operation not valid for the current session state
    #[error("{0}")]
    SessionState(String),

    /// Failure of an auth flow, prefixed with the stage that failed
    #[error("{stage}: {source}")]
    Flow {
        stage: FlowStage,
        #[source]
        source: Box<Error>,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential encryption failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Auth flow stage used as the prefix of a wrapped failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    /// `login()` failed
    Login,
    /// `restore_session()` failed without a re-login
    Restore,
    /// `restore_session()` failed and the fallback login failed too
    RestoreRelogin,
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self {
            FlowStage::Login => "Login failed",
            FlowStage::Restore => "Session restore failed",
            FlowStage::RestoreRelogin => "Session restore and auto re-login failed",
        };
        f.write_str(prefix)
    }
}

/// What went wrong with an HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    /// The attempt did not complete within its timeout
    Timeout,
    /// Connection, TLS or body read failure
    Network,
    /// The response status failed validation
    Status,
    /// A redirect could not be followed
    Redirect,
    /// More hops than `max_redirects`
    TooManyRedirects,
}

/// Normalized HTTP failure
///
/// Transport failures carry no status. Status failures carry the status,
/// its reason phrase, the full response and the resolved request config.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HttpError {
    pub kind: HttpErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub response: Option<Box<Response>>,
    pub config: Option<Box<RequestConfig>>,
}

impl HttpError {
    /// Attempt timed out
    pub fn timeout(config: &RequestConfig) -> Self {
        Self {
            kind: HttpErrorKind::Timeout,
            message: format!(
                "Request timed out after {}ms",
                config.timeout.as_millis()
            ),
            status: None,
            status_text: None,
            response: None,
            config: Some(Box::new(config.clone())),
        }
    }

    /// Low-level network failure
    pub fn network(err: impl fmt::Display, config: &RequestConfig) -> Self {
        Self {
            kind: HttpErrorKind::Network,
            message: format!("Network error: {}", err),
            status: None,
            status_text: None,
            response: None,
            config: Some(Box::new(config.clone())),
        }
    }

    /// Status rejected by the validator
    pub fn status(response: Response) -> Self {
        let status = response.status_code();
        Self {
            kind: HttpErrorKind::Status,
            message: format!("Request failed with status code {}", status),
            status: Some(status),
            status_text: Some(response.status_text.clone()),
            config: Some(Box::new(response.config.clone())),
            response: Some(Box::new(response)),
        }
    }

    /// Redirect response that cannot be followed
    pub fn redirect(
        reason: impl Into<String>,
        status: u16,
        status_text: impl Into<String>,
        config: &RequestConfig,
    ) -> Self {
        Self {
            kind: HttpErrorKind::Redirect,
            message: reason.into(),
            status: Some(status),
            status_text: Some(status_text.into()),
            response: None,
            config: Some(Box::new(config.clone())),
        }
    }

    /// Hop limit reached
    pub fn too_many_redirects(max: usize, config: &RequestConfig) -> Self {
        Self {
            kind: HttpErrorKind::TooManyRedirects,
            message: format!("Max redirects exceeded: {}", max),
            status: None,
            status_text: None,
            response: None,
            config: Some(Box::new(config.clone())),
        }
    }

    /// 4xx status
    pub fn is_client_error(&self) -> bool {
        self.status.map_or(false, |s| (400..500).contains(&s))
    }

    /// 5xx status
    pub fn is_server_error(&self) -> bool {
        self.status.map_or(false, |s| s >= 500)
    }

    /// Failure below the HTTP layer (no status was received)
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, HttpErrorKind::Timeout | HttpErrorKind::Network)
    }
}

impl Error {
    /// Create an authentication error from a login error code
    pub fn auth_code(code: LoginErrorCode) -> Self {
        Error::Authentication {
            reason: code.message().to_string(),
            code: Some(code),
            status: None,
        }
    }

    /// Create an authentication error for an unexpected status
    pub fn auth_status(reason: impl Into<String>, status: u16) -> Self {
        Error::Authentication {
            reason: reason.into(),
            code: None,
            status: Some(status),
        }
    }

    /// Create a session state error
    pub fn session_state<S: Into<String>>(msg: S) -> Self {
        Error::SessionState(msg.into())
    }

    /// Wrap an error with the auth flow stage that failed
    pub fn flow(stage: FlowStage, source: Error) -> Self {
        Error::Flow {
            stage,
            source: Box::new(source),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Innermost error, looking through flow wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Flow { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this is (or wraps) an authentication failure
    pub fn is_authentication(&self) -> bool {
        matches!(self.root(), Error::Authentication { .. })
    }

    /// Check if this is a wrapped `login()` failure
    pub fn is_login_failure(&self) -> bool {
        matches!(
            self,
            Error::Flow {
                stage: FlowStage::Login,
                ..
            }
        )
    }

    /// Check if this is (or wraps) a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.root(),
            Error::Http(HttpError {
                kind: HttpErrorKind::Timeout,
                ..
            })
        )
    }

    /// Get HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self.root() {
            Error::Http(e) => e.status,
            Error::Authentication { status, .. } => *status,
            _ => None,
        }
    }

    /// Login error code if this is (or wraps) an authentication failure
    pub fn login_error_code(&self) -> Option<LoginErrorCode> {
        match self.root() {
            Error::Authentication { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_display_keeps_source_message() {
        let err = Error::flow(
            FlowStage::Login,
            Error::auth_code(LoginErrorCode::AccountLocked),
        );

        assert_eq!(
            err.to_string(),
            "Login failed: Authentication failed: Account disabled."
        );
        assert!(err.is_authentication());
        assert!(err.is_login_failure());
        assert_eq!(err.login_error_code(), Some(LoginErrorCode::AccountLocked));
    }

    #[test]
    fn test_root_unwraps_nested_flows() {
        let inner = Error::session_state("Session expired");
        let err = Error::flow(FlowStage::RestoreRelogin, Error::flow(FlowStage::Login, inner));

        assert!(matches!(err.root(), Error::SessionState(msg) if msg == "Session expired"));
        assert!(!err.is_login_failure());
    }

    #[test]
    fn test_auth_status_error() {
        let err = Error::auth_status("Failed to load login page", 503);

        assert_eq!(err.status_code(), Some(503));
        assert!(err.login_error_code().is_none());
    }
}
