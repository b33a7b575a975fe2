// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session lifecycle
//!
//! Tracks who is logged in and persists the session (user plus cookies) so
//! it can be restored later without a new login.

mod manager;
mod user;

pub use manager::{SerializedSession, SessionManager, SessionState, DEFAULT_SESSION_MAX_AGE};
pub use user::{Registration, User};
