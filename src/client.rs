// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! High-level client
//!
//! Wires one cookie jar into both the HTTP client and the session, so
//! whatever the server sets during login is what gets saved and restored.

use std::env;
use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::auth::{
    AuthEvent, AuthManager, AuthUrls, DefaultPageParser, EventKind, EventManager, ListenerId,
    PageParser,
};
use crate::error::{Error, Result};
use crate::http::{CookieJar, HttpClient, HttpClientConfig};
use crate::session::{SessionManager, SessionState, User};

/// Environment variable holding the base URL
pub const ENV_BASE_URL: &str = "YPAREO_BASE_URL";
/// Environment variable holding the username
pub const ENV_USERNAME: &str = "YPAREO_USERNAME";
/// Environment variable holding the password
pub const ENV_PASSWORD: &str = "YPAREO_PASSWORD";

/// Client configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// Site root, e.g. `https://ypareo.example.com`
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Auth endpoints
    pub urls: AuthUrls,
    /// Transport settings; `base_url` is taken from this config
    pub http: HttpClientConfig,
    /// Log debug events at info level
    pub debug: bool,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("urls", &self.urls)
            .field("debug", &self.debug)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            urls: AuthUrls::default(),
            http: HttpClientConfig::default(),
            debug: false,
        }
    }

    /// Read `YPAREO_BASE_URL`, `YPAREO_USERNAME` and `YPAREO_PASSWORD`
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            required_env(ENV_BASE_URL)?,
            required_env(ENV_USERNAME)?,
            required_env(ENV_PASSWORD)?,
        ))
    }

    pub fn urls(mut self, urls: AuthUrls) -> Self {
        self.urls = urls;
        self
    }

    pub fn http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

fn required_env(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config(format!("{} is not set", name)))
}

/// Authenticated client for one account
#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    session: SessionManager,
    events: EventManager,
    auth: Arc<AuthManager>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.http.base_url())
            .field("auth", &self.auth)
            .finish()
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_parser(config, Arc::new(DefaultPageParser))
    }

    /// Create a client that reads pages with `parser`
    pub fn with_parser(config: ClientConfig, parser: Arc<dyn PageParser>) -> Result<Self> {
        if config.username.is_empty() {
            return Err(Error::Config("username must not be empty".to_string()));
        }

        let jar = CookieJar::new();
        let http_config = config
            .http
            .base_url(config.base_url)
            .follow_redirects(true);
        let http = HttpClient::with_cookie_jar(http_config, jar.clone())?;
        let session = SessionManager::new(jar);

        let events = EventManager::new();
        events.set_debug(config.debug);

        let auth = AuthManager::new(
            http.clone(),
            session.clone(),
            events.clone(),
            config.urls,
            config.username,
            &config.password,
        )?
        .with_parser(parser);

        Ok(Self {
            http,
            session,
            events,
            auth: Arc::new(auth),
        })
    }

    /// Subscribe to an event
    pub fn on(
        &self,
        kind: EventKind,
        listener: impl Fn(&AuthEvent<'_>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.events.on(kind, listener)
    }

    /// Subscribe to the next occurrence of an event
    pub fn once(
        &self,
        kind: EventKind,
        listener: impl Fn(&AuthEvent<'_>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.events.once(kind, listener)
    }

    /// Unsubscribe
    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Log in and wait for the outcome
    pub async fn login(&self) -> Result<User> {
        self.auth.login().await
    }

    /// Log in in the background; the outcome is only reported through events
    pub fn spawn_login(&self) -> JoinHandle<()> {
        let auth = Arc::clone(&self.auth);
        tokio::spawn(async move {
            if let Err(err) = auth.login().await {
                tracing::debug!(error = %err, "Background login failed");
            }
        })
    }

    /// Restore a session saved with [`Client::save_session`]
    pub async fn restore_session(&self, data: &str, auto_relogin: bool) -> Result<User> {
        self.auth.restore_session(data, auto_relogin).await
    }

    /// Serialize the current session
    pub fn save_session(&self) -> Result<String> {
        if !self.session.is_connected() {
            return Err(Error::session_state("No active session to save"));
        }
        self.session.serialize()
    }

    /// End the session; no-op unless connected
    pub fn logout(&self) {
        self.auth.logout();
    }

    /// Forget the stored password
    pub fn clear_password(&self) {
        self.auth.clear_password();
    }

    pub fn user(&self) -> Option<User> {
        self.session.user()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// HTTP client sharing the session cookies, for data requests
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Cookie;

    #[test]
    fn test_jar_is_shared() {
        let client = Client::new(ClientConfig::new("https://example.com/", "jdoe", "pw")).unwrap();

        client
            .http()
            .cookie_jar()
            .set_cookie(Cookie::new("PHPSESSID", "abc").domain(".example.com"));

        assert_eq!(client.session().jar().len(), 1);
        assert_eq!(client.http().base_url(), Some("https://example.com"));
        assert_eq!(client.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_save_requires_session() {
        let client = Client::new(ClientConfig::new("https://example.com", "jdoe", "pw")).unwrap();
        let err = client.save_session().unwrap_err();
        assert_eq!(err.to_string(), "No active session to save");
    }

    #[test]
    fn test_logout_only_ends_a_connected_session() {
        let client = Client::new(ClientConfig::new("https://example.com", "jdoe", "pw")).unwrap();
        let jar = client.http().cookie_jar();
        jar.set_cookie(Cookie::new("pref", "1").domain("example.com"));

        client.logout();
        assert_eq!(jar.len(), 1);

        client.session().set_state(SessionState::Connecting);
        client.logout();
        assert_eq!(jar.len(), 1);
        assert_eq!(client.state(), SessionState::Connecting);

        client.session().set_user(User::new("jdoe"));
        client.logout();
        assert!(jar.is_empty());
        assert_eq!(client.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let config = ClientConfig::new("https://example.com", "jdoe", "hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_empty_username_rejected() {
        let err = Client::new(ClientConfig::new("https://example.com", "", "pw")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
