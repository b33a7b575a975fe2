// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Login, session restoration and logout
//!
//! Every terminal failure is emitted as an `Error` event before it is
//! returned, wrapped with the stage that failed.

use std::sync::Arc;

use parking_lot::Mutex;

use super::events::{AuthEvent, EventManager};
use super::login_error::detect_login_error;
use super::parser::{DefaultPageParser, PageParser};
use super::password::PasswordManager;
use crate::error::{Error, FlowStage, Result};
use crate::http::{headers, HttpClient, RequestBody, RequestOptions, Response};
use crate::session::{
    SerializedSession, SessionManager, SessionState, User, DEFAULT_SESSION_MAX_AGE,
};

/// Endpoints of the authentication flow, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUrls {
    /// Login form page
    pub login: String,
    /// Form submission target
    pub auth: String,
    /// Landing page, used to probe restored sessions
    pub home: String,
}

impl Default for AuthUrls {
    fn default() -> Self {
        Self {
            login: "/index.php/login".to_string(),
            auth: "/index.php/authentication".to_string(),
            home: "/index.php/apprenant/accueil".to_string(),
        }
    }
}

/// Drives the authentication flows on top of the HTTP client
pub struct AuthManager {
    http: HttpClient,
    session: SessionManager,
    events: EventManager,
    urls: AuthUrls,
    username: String,
    password: Mutex<PasswordManager>,
    parser: Arc<dyn PageParser>,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("username", &self.username)
            .field("urls", &self.urls)
            .field("state", &self.session.state())
            .finish()
    }
}

impl AuthManager {
    /// Create the manager; the password is encrypted immediately
    pub fn new(
        http: HttpClient,
        session: SessionManager,
        events: EventManager,
        urls: AuthUrls,
        username: impl Into<String>,
        password: &str,
    ) -> Result<Self> {
        let username = username.into();
        let password = PasswordManager::new(&username, password)?;

        Ok(Self {
            http,
            session,
            events,
            urls,
            username,
            password: Mutex::new(password),
            parser: Arc::new(DefaultPageParser),
        })
    }

    /// Use another page parser
    pub fn with_parser(mut self, parser: Arc<dyn PageParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Log in, or return the current user when already connected
    pub async fn login(&self) -> Result<User> {
        if let Some(user) = self.connected_user() {
            self.events.emit(&AuthEvent::Ready);
            return Ok(user);
        }

        let password = self.password.lock().decrypt();
        let Some(password) = password else {
            let err = Error::session_state("Password has been cleared. Cannot login.");
            self.events.emit(&AuthEvent::Error(&err));
            return Err(err);
        };

        self.session.set_state(SessionState::Connecting);
        tracing::info!(username = %self.username, "Logging in");

        match self.submit_login(&password).await {
            Ok(user) => {
                self.session.set_user(user.clone());
                self.clear_password();
                tracing::info!(username = %user.username, "Login succeeded");

                self.events.emit(&AuthEvent::Login(&user));
                self.events.emit(&AuthEvent::Ready);
                Ok(user)
            }
            Err(err) => {
                self.session.mark_error();
                let err = Error::flow(FlowStage::Login, err);
                tracing::warn!(error = %err, "Login failed");

                self.events.emit(&AuthEvent::Error(&err));
                Err(err)
            }
        }
    }

    async fn submit_login(&self, password: &str) -> Result<User> {
        let login_page = self
            .http
            .get(
                &self.urls.login,
                self.page_options(None)
                    .header(headers::CONTENT_TYPE, "text/html; charset=UTF-8"),
            )
            .await?;

        if !login_page.is_success() {
            let status = login_page.status_code();
            return Err(Error::auth_status(
                format!("Failed to load login page (status {})", status),
                status,
            ));
        }

        let csrf_token = self.parser.csrf_token(&login_page.text_lossy());
        match csrf_token {
            Some(ref token) => {
                let preview: String = token.chars().take(8).collect();
                self.events
                    .emit_debug(&format!("CSRF token found: {}...", preview));
            }
            None => self.events.emit_debug("No CSRF token found on login page"),
        }

        let mut form = vec![
            ("login", self.username.as_str()),
            ("password", password),
            ("btnSeConnecter", "Se connecter"),
            ("screenWidth", "1920"),
            ("screenHeight", "1080"),
        ];
        if let Some(ref token) = csrf_token {
            form.push(("token_csrf", token.as_str()));
        }

        let referer = format!("{}{}", self.base_url(), self.urls.login);
        let auth = self
            .http
            .post(
                &self.urls.auth,
                RequestBody::form(form),
                self.page_options(Some(&referer)).header(
                    headers::CONTENT_TYPE,
                    "application/x-www-form-urlencoded; charset=UTF-8",
                ),
            )
            .await?;

        if !auth.is_success() {
            let status = auth.status_code();
            return Err(Error::auth_status(
                format!("unexpected status {}", status),
                status,
            ));
        }

        if let Some(code) = detect_login_error(&auth) {
            return Err(Error::auth_code(code));
        }

        Ok(self.parser.user(&auth.text_lossy(), &self.username))
    }

    /// Restore a saved session, falling back to a fresh login when allowed
    pub async fn restore_session(&self, data: &str, auto_relogin: bool) -> Result<User> {
        match self.try_restore(data, auto_relogin).await {
            Ok(user) => Ok(user),
            Err(err) => self.recover(err, auto_relogin).await,
        }
    }

    async fn try_restore(&self, data: &str, auto_relogin: bool) -> Result<User> {
        if !SessionManager::is_session_valid(data, DEFAULT_SESSION_MAX_AGE) {
            if auto_relogin {
                tracing::info!("Saved session is stale, logging in again");
                return self.login().await;
            }
            return Err(Error::session_state("Session expired"));
        }

        let saved = SerializedSession::parse(data)?;
        self.session.restore(&saved);

        let referer = format!("{}{}", self.base_url(), self.urls.home);
        let home = self
            .http
            .get(
                &self.urls.home,
                self.page_options(Some(&referer))
                    .header(headers::CONTENT_TYPE, "text/html; charset=UTF-8"),
            )
            .await?;

        if let Some(reason) = rejection(&home) {
            if auto_relogin {
                tracing::info!(reason = %reason, "Saved session rejected, logging in again");
                self.session.reset();
                return self.login().await;
            }
            return Err(Error::session_state(format!(
                "Session invalid on server: {}",
                reason
            )));
        }

        let user = self
            .session
            .user()
            .ok_or_else(|| Error::session_state("Session restored without a user"))?;

        tracing::info!(username = %user.username, "Session restored");
        self.events.emit(&AuthEvent::SessionRestored(&user));
        Ok(user)
    }

    async fn recover(&self, err: Error, auto_relogin: bool) -> Result<User> {
        // login() already reported its own failure
        if err.is_login_failure() {
            self.session.reset();
            return Err(err);
        }

        if auto_relogin && self.has_password() {
            tracing::info!(error = %err, "Session restore failed, logging in again");
            self.session.reset();
            return match self.login().await {
                Ok(user) => Ok(user),
                Err(login_err) => {
                    let err = Error::flow(FlowStage::RestoreRelogin, login_err);
                    self.events.emit(&AuthEvent::Error(&err));
                    Err(err)
                }
            };
        }

        self.session.reset();
        let err = Error::flow(FlowStage::Restore, err);
        tracing::warn!(error = %err, "Session restore failed");
        self.events.emit(&AuthEvent::Error(&err));
        Err(err)
    }

    /// Drop the session; no-op unless connected
    pub fn logout(&self) {
        if !self.session.is_connected() {
            return;
        }
        self.session.reset();
        tracing::info!(username = %self.username, "Logged out");
        self.events.emit(&AuthEvent::Logout);
    }

    /// Forget the stored password
    pub fn clear_password(&self) {
        self.password.lock().clear();
    }

    pub fn has_password(&self) -> bool {
        self.password.lock().has_password()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn user(&self) -> Option<User> {
        self.session.user()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn urls(&self) -> &AuthUrls {
        &self.urls
    }

    fn connected_user(&self) -> Option<User> {
        if self.session.is_connected() {
            self.session.user()
        } else {
            None
        }
    }

    fn base_url(&self) -> &str {
        self.http.base_url().unwrap_or("")
    }

    /// Options for the auth pages: every status returned, Origin set
    fn page_options(&self, referer: Option<&str>) -> RequestOptions {
        let mut options = RequestOptions::new().validate_status(|_| true);
        if !self.base_url().is_empty() {
            options = options.header(headers::ORIGIN, self.base_url());
        }
        if let Some(referer) = referer {
            options = options.header(headers::REFERER, referer);
        }
        options
    }
}

/// Why a probe of the landing page shows the session is dead
fn rejection(response: &Response) -> Option<String> {
    if let Some(code) = detect_login_error(response) {
        return Some(code.message().to_string());
    }
    if !response.is_success() {
        return Some(format!("unexpected status {}", response.status_code()));
    }
    None
}
