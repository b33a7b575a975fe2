// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Authentication flows
//!
//! Login against the form endpoint, restoration of saved sessions with
//! automatic re-login, encrypted credential storage and lifecycle events.

mod events;
mod login_error;
mod manager;
mod parser;
mod password;

pub use events::{AuthEvent, EventKind, EventManager, Listener, ListenerId};
pub use login_error::{detect_login_error, parse_login_error, LoginErrorCode};
pub use manager::{AuthManager, AuthUrls};
pub use parser::{normalize_text, DefaultPageParser, PageParser};
pub use password::PasswordManager;
