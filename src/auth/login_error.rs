// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Login rejection detection
//!
//! A rejected login lands back on the login page with the reason encoded in
//! the last path segment, e.g. `/index.php/login/2`.

use std::fmt;

use url::Url;

use crate::http::Response;

/// Why the server rejected a login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginErrorCode {
    /// Code `2`
    InvalidCredentials,
    /// Code `4`
    AccountLocked,
    /// Any other code
    Unknown,
}

impl LoginErrorCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "2" => LoginErrorCode::InvalidCredentials,
            "4" => LoginErrorCode::AccountLocked,
            _ => LoginErrorCode::Unknown,
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            LoginErrorCode::InvalidCredentials => Some("2"),
            LoginErrorCode::AccountLocked => Some("4"),
            LoginErrorCode::Unknown => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LoginErrorCode::InvalidCredentials => "Invalid credentials.",
            LoginErrorCode::AccountLocked => "Account disabled.",
            LoginErrorCode::Unknown => "Unknown error.",
        }
    }
}

impl fmt::Display for LoginErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Classify a final URL; `None` unless it points back at the login page
pub fn parse_login_error(url: &Url) -> Option<LoginErrorCode> {
    let url = url.as_str();
    if !url.contains("login") {
        return None;
    }

    let tail: Vec<char> = url.chars().rev().take(2).collect();
    let code: String = tail.into_iter().rev().filter(|c| *c != '/').collect();
    Some(LoginErrorCode::from_code(&code))
}

/// Classify where a response ended up after redirects
pub fn detect_login_error(response: &Response) -> Option<LoginErrorCode> {
    parse_login_error(&response.url)
}
