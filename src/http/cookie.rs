// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cookie jar implementation for persistent cookie storage

use chrono::{DateTime, NaiveDateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Cookie value some servers use to clear a cookie
pub const DELETED_SENTINEL: &str = "deleted";

/// A single HTTP cookie
///
/// Serializes to the persisted record shape: camelCase keys, ISO-8601
/// timestamps, optional attributes omitted when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name
    pub key: String,
    /// Cookie value
    pub value: String,
    /// Domain with a leading dot (None = any host)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path the cookie is valid for
    #[serde(default = "default_path")]
    pub path: String,
    /// Absolute expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Lifetime in seconds, counted from `creation`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    /// Secure flag (HTTPS only)
    #[serde(default)]
    pub secure: bool,
    /// HttpOnly flag
    #[serde(default)]
    pub http_only: bool,
    /// SameSite attribute, only set for the exact spellings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
    /// When the cookie was created
    pub creation: DateTime<Utc>,
    /// When the cookie was last sent
    pub last_accessed: DateTime<Utc>,
}

/// SameSite cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// Cookie only sent with same-site requests
    Strict,
    /// Cookie sent with same-site and top-level navigations
    Lax,
    /// Cookie sent with all requests
    None,
}

impl SameSite {
    /// Parse the attribute value. Case-sensitive on purpose.
    fn from_attr(value: &str) -> Option<Self> {
        match value {
            "Strict" => Some(SameSite::Strict),
            "Lax" => Some(SameSite::Lax),
            "None" => Some(SameSite::None),
            _ => None,
        }
    }
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Create a new cookie
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            value: value.into(),
            domain: None,
            path: default_path(),
            expires: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
            creation: now,
            last_accessed: now,
        }
    }

    /// Set the domain; a leading dot is added when missing
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(dotted_domain(&domain.into()));
        self
    }

    /// Set the path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set secure flag
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set http_only flag
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set same_site attribute
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Set expiration time
    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Set max-age in seconds
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Parse a Set-Cookie header value received from `request_url`
    ///
    /// Returns `None` when the first segment has no `=` or the request URL
    /// does not parse.
    pub fn parse(header: &str, request_url: &str) -> Option<Self> {
        let url = Url::parse(request_url).ok()?;
        let host = url.host_str().unwrap_or("");

        let mut parts = header.split(';').map(str::trim);
        let first = parts.next()?;
        let (key, value) = first.split_once('=')?;
        let mut cookie = Cookie::new(key.trim(), value.trim());

        for attr in parts {
            let (name, value) = match attr.split_once('=') {
                Some((name, value)) => (name.trim().to_lowercase(), Some(value.trim())),
                None => (attr.to_lowercase(), None),
            };

            match name.as_str() {
                "domain" => {
                    cookie.domain = Some(match value {
                        Some(v) if !v.is_empty() => dotted_domain(v),
                        _ => format!(".{}", host),
                    });
                }
                "path" => {
                    cookie.path = value
                        .filter(|v| !v.is_empty())
                        .unwrap_or("/")
                        .to_string();
                }
                "expires" => cookie.expires = value.and_then(parse_cookie_date),
                "max-age" => cookie.max_age = value.and_then(|v| v.parse::<i64>().ok()),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "samesite" => {
                    if let Some(same_site) = value.and_then(SameSite::from_attr) {
                        cookie.same_site = Some(same_site);
                    }
                }
                _ => {}
            }
        }

        if cookie.domain.is_none() {
            cookie.domain = Some(format!(".{}", host));
        }

        Some(cookie)
    }

    /// Check if the cookie should be sent to the given URL
    ///
    /// A URL that does not parse never matches.
    pub fn matches(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(url) => self.matches_url(&url),
            Err(_) => false,
        }
    }

    /// Same as [`Cookie::matches`] for an already parsed URL
    pub fn matches_url(&self, url: &Url) -> bool {
        if let Some(ref domain) = self.domain {
            let host = url.host_str().unwrap_or("");
            let domain = domain.strip_prefix('.').unwrap_or(domain);
            if host != domain && !host.ends_with(&format!(".{}", domain)) {
                return false;
            }
        }

        if !self.path.is_empty() && !url.path().starts_with(&self.path) {
            return false;
        }

        if self.secure && url.scheme() != "https" {
            return false;
        }

        true
    }

    /// Check if the cookie is expired
    pub fn is_expired(&self) -> bool {
        if self.value == DELETED_SENTINEL || self.max_age == Some(0) {
            return true;
        }

        let now = Utc::now();
        if let Some(max_age) = self.max_age {
            let age_secs = (now - self.creation).num_milliseconds() as f64 / 1000.0;
            return age_secs > max_age as f64;
        }

        self.expires.map_or(false, |exp| now > exp)
    }

    /// Identity key `domain|path|key`
    pub fn identity(&self) -> String {
        identity_key(&self.key, self.domain.as_deref(), Some(&self.path))
    }

    /// Convert to cookie header format
    pub fn to_header_value(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    /// Serialize to a JSON record
    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Restore from a JSON record, timestamps included
    pub fn deserialize(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}

fn dotted_domain(domain: &str) -> String {
    if domain.is_empty() || domain.starts_with('.') {
        domain.to_string()
    } else {
        format!(".{}", domain)
    }
}

fn identity_key(key: &str, domain: Option<&str>, path: Option<&str>) -> String {
    let path = path.filter(|p| !p.is_empty()).unwrap_or("/");
    let domain = domain.map(dotted_domain).unwrap_or_default();
    format!("{}|{}|{}", domain, path, key)
}

/// Parse an `Expires` attribute (RFC 1123 or the Netscape `-` variant)
fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%a, %d-%b-%Y %H:%M:%S GMT", "%A, %d-%b-%y %H:%M:%S GMT"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Cookie storage keyed by identity
///
/// Cloning yields another handle to the same cookies.
#[derive(Debug, Clone)]
pub struct CookieJar {
    cookies: Arc<DashMap<String, Cookie>>,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    /// Create a new empty cookie jar
    pub fn new() -> Self {
        Self {
            cookies: Arc::new(DashMap::new()),
        }
    }

    /// Store a cookie, replacing any cookie with the same identity
    ///
    /// An already expired cookie deletes the stored one instead.
    pub fn set_cookie(&self, cookie: Cookie) {
        let id = cookie.identity();
        if cookie.is_expired() {
            tracing::debug!(cookie = %cookie.key, "Cookie expired on arrival, removing");
            self.cookies.remove(&id);
            return;
        }
        self.cookies.insert(id, cookie);
    }

    /// Parse a Set-Cookie header value and store the result
    ///
    /// Unparsable headers are ignored.
    pub fn set_cookie_str(&self, header: &str, request_url: &str) {
        if let Some(cookie) = Cookie::parse(header, request_url) {
            self.set_cookie(cookie);
        }
    }

    /// Get all cookies for a URL, marking them as accessed
    pub fn get_cookies(&self, request_url: &str) -> Vec<Cookie> {
        self.remove_expired();

        let url = match Url::parse(request_url) {
            Ok(url) => url,
            Err(_) => return Vec::new(),
        };

        let now = Utc::now();
        let mut result = Vec::new();
        for mut entry in self.cookies.iter_mut() {
            if entry.matches_url(&url) {
                entry.last_accessed = now;
                result.push(entry.value().clone());
            }
        }
        result
    }

    /// Get the `Cookie` request header value for a URL (empty when none match)
    pub fn get_cookie_string(&self, request_url: &str) -> String {
        self.get_cookies(request_url)
            .iter()
            .map(Cookie::to_header_value)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// All live cookies
    pub fn all_cookies(&self) -> Vec<Cookie> {
        self.remove_expired();
        self.cookies.iter().map(|e| e.value().clone()).collect()
    }

    /// Copy every live cookie of `other` into this jar
    pub fn extend(&self, other: &CookieJar) {
        for cookie in other.all_cookies() {
            self.set_cookie(cookie);
        }
    }

    /// Remove a specific cookie
    pub fn remove_cookie(&self, cookie: &Cookie) {
        self.cookies.remove(&cookie.identity());
    }

    /// Remove a cookie by key, domain and path
    pub fn remove_by_key(&self, key: &str, domain: Option<&str>, path: Option<&str>) {
        self.cookies.remove(&identity_key(key, domain, path));
    }

    /// Check if a cookie with the same identity is stored
    pub fn has_cookie(&self, cookie: &Cookie) -> bool {
        self.cookies.contains_key(&cookie.identity())
    }

    /// Check if a cookie is stored by key, domain and path
    pub fn has_cookie_by_key(&self, key: &str, domain: Option<&str>, path: Option<&str>) -> bool {
        self.cookies.contains_key(&identity_key(key, domain, path))
    }

    /// Clear all cookies
    pub fn clear(&self) {
        self.cookies.clear();
    }

    /// Remove expired cookies
    fn remove_expired(&self) {
        self.cookies.retain(|_, c| !c.is_expired());
    }

    /// Get live cookie count
    pub fn len(&self) -> usize {
        self.remove_expired();
        self.cookies.len()
    }

    /// Check if jar is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export live cookies as a pretty JSON array
    pub fn serialize(&self) -> String {
        let cookies = self.all_cookies();
        serde_json::to_string_pretty(&cookies).unwrap_or_else(|_| "[]".to_string())
    }

    /// Import cookies from a JSON array
    ///
    /// Expired and malformed records are dropped. Input that is not an
    /// array yields an empty jar.
    pub fn deserialize(data: &str) -> Self {
        let jar = CookieJar::new();
        let records = match serde_json::from_str::<Vec<serde_json::Value>>(data) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed cookie jar data");
                return jar;
            }
        };

        for record in records {
            match serde_json::from_value::<Cookie>(record) {
                Ok(cookie) if !cookie.is_expired() => {
                    jar.cookies.insert(cookie.identity(), cookie);
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "Skipping malformed cookie record"),
            }
        }
        jar
    }
}
