// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session state machine and persistence
//!
//! `connected` always has a user; `disconnected` and `error` have neither a
//! user nor cookies. [`SessionManager::set_user`] is the only way into
//! `connected`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::user::User;
use crate::error::{Error, Result};
use crate::http::CookieJar;

/// Saved sessions older than this are considered stale
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifecycle of the authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Persisted form of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedSession {
    pub user: User,
    /// Serialized cookie jar (a JSON array encoded as a string)
    pub cookies: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl SerializedSession {
    pub fn parse(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Milliseconds since the session was saved
    pub fn age_ms(&self) -> i64 {
        Utc::now().timestamp_millis() - self.timestamp
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    state: SessionState,
    user: Option<User>,
}

/// Session state shared by the client and its auth flows
///
/// Cloning yields another handle to the same session.
#[derive(Debug, Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<SessionInner>>,
    jar: CookieJar,
}

impl SessionManager {
    /// Create a disconnected session bound to `jar`
    pub fn new(jar: CookieJar) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionInner::default())),
            jar,
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Move to `state`, keeping the session invariants
    ///
    /// `connected` is only accepted while a user is set; `disconnected` and
    /// `error` drop the user and the cookies.
    pub fn set_state(&self, state: SessionState) {
        match state {
            SessionState::Disconnected => self.reset(),
            SessionState::Error => self.mark_error(),
            SessionState::Connecting => self.inner.write().state = SessionState::Connecting,
            SessionState::Connected => {
                let mut inner = self.inner.write();
                if inner.user.is_some() {
                    inner.state = SessionState::Connected;
                } else {
                    tracing::warn!("Ignoring transition to connected without a user");
                }
            }
        }
    }

    pub fn user(&self) -> Option<User> {
        self.inner.read().user.clone()
    }

    /// Set the user and move to `connected`
    pub fn set_user(&self, user: User) {
        let mut inner = self.inner.write();
        tracing::debug!(username = %user.username, "Session connected");
        inner.user = Some(user);
        inner.state = SessionState::Connected;
    }

    /// Handle on the session's cookie jar
    pub fn jar(&self) -> CookieJar {
        self.jar.clone()
    }

    /// Back to `disconnected`, user and cookies dropped
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.state = SessionState::Disconnected;
        inner.user = None;
        self.jar.clear();
    }

    /// Move to `error`, user and cookies dropped
    pub fn mark_error(&self) {
        let mut inner = self.inner.write();
        inner.state = SessionState::Error;
        inner.user = None;
        self.jar.clear();
    }

    pub fn is_connected(&self) -> bool {
        let inner = self.inner.read();
        inner.state == SessionState::Connected && inner.user.is_some()
    }

    /// Serialize the user and cookies for later restoration
    pub fn serialize(&self) -> Result<String> {
        let user = {
            let inner = self.inner.read();
            if inner.state == SessionState::Connected {
                inner.user.clone()
            } else {
                None
            }
        };
        let user = user.ok_or_else(|| {
            Error::session_state("Cannot serialize session: not connected or user is null.")
        })?;

        let session = SerializedSession {
            user,
            cookies: self.jar.serialize(),
            timestamp: Utc::now().timestamp_millis(),
        };
        Ok(serde_json::to_string(&session)?)
    }

    /// Build a connected manager from saved data
    ///
    /// Cookies are restored into `jar` in place, so anything else holding
    /// the jar sees them too.
    pub fn deserialize(data: &str, jar: CookieJar) -> Result<Self> {
        let session = SerializedSession::parse(data)?;
        let manager = SessionManager::new(jar);
        manager.restore(&session);
        Ok(manager)
    }

    /// Restore saved cookies into this session's jar and set the user
    pub fn restore(&self, session: &SerializedSession) {
        let restored = CookieJar::deserialize(&session.cookies);
        tracing::debug!(cookies = restored.len(), "Restoring session cookies");
        self.jar.extend(&restored);
        self.set_user(session.user.clone());
    }

    /// Whether saved data is younger than `max_age`; malformed data is not
    pub fn is_session_valid(data: &str, max_age: Duration) -> bool {
        match SerializedSession::parse(data) {
            Ok(session) => session.age_ms() < max_age.as_millis() as i64,
            Err(_) => false,
        }
    }
}
