// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP client implementation
//!
//! Redirects and cookies are handled here rather than by reqwest, so every
//! hop reads the jar, writes Set-Cookie back into it, and is subject to the
//! method downgrade rules.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION, REFERER,
    SET_COOKIE, USER_AGENT,
};
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode};
use url::Url;

use super::cookie::{CookieJar, DELETED_SENTINEL};
use super::request::{
    MultipartField, MultipartValue, RequestBody, RequestConfig, RequestOptions, StatusValidator,
};
use super::response::{Response, ResponseData};
use super::retry::RetryOptions;
use super::{
    DEFAULT_HEADERS, DEFAULT_USER_AGENT, METHOD_DOWNGRADE_STATUSES, REDIRECT_STATUSES,
};
use crate::error::{Error, HttpError, Result};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL prepended to relative paths; also sent as Referer
    pub base_url: Option<String>,
    /// User agent string
    pub user_agent: String,
    /// Default per-attempt timeout
    pub timeout: Duration,
    /// Follow redirects by default
    pub follow_redirects: bool,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Default headers, above the built-in table
    pub default_headers: HeaderMap,
    /// Default retry policy
    pub retry: RetryOptions,
    /// Default status validation
    pub validate_status: StatusValidator,
    /// Fail on statuses the validator rejects
    pub throw_on_http_error: bool,
    /// Accept invalid certificates (dangerous!)
    pub accept_invalid_certs: bool,
    /// Proxy URL
    pub proxy: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            follow_redirects: true,
            max_redirects: 10,
            default_headers: HeaderMap::new(),
            retry: RetryOptions::default(),
            validate_status: StatusValidator::default(),
            throw_on_http_error: true,
            accept_invalid_certs: false,
            proxy: None,
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Add a default header (invalid names or values are ignored)
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.default_headers.insert(name, value);
        }
        self
    }

    pub fn retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate_status(mut self, f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        self.validate_status = StatusValidator::new(f);
        self
    }

    pub fn throw_on_http_error(mut self, throw: bool) -> Self {
        self.throw_on_http_error = throw;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

/// HTTP client with cookie management
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: Arc<HttpClientConfig>,
    cookie_jar: Arc<RwLock<CookieJar>>,
}

/// Body ready to hand to reqwest
enum PreparedBody {
    Empty,
    Bytes(Bytes),
    Multipart(Form),
}

/// What one hop brought back
struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        Self::with_cookie_jar(config, CookieJar::new())
    }

    /// Create a new HTTP client reading and writing an existing jar
    pub fn with_cookie_jar(mut config: HttpClientConfig, jar: CookieJar) -> Result<Self> {
        config.base_url = config
            .base_url
            .take()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let mut builder = Client::builder()
            .redirect(Policy::none())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .cookie_store(false); // We handle cookies ourselves

        if let Some(ref proxy_url) = config.proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy_url)
                    .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?,
            );
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
            cookie_jar: Arc::new(RwLock::new(jar)),
        })
    }

    /// Get a handle on the current cookie jar
    pub fn cookie_jar(&self) -> CookieJar {
        self.cookie_jar.read().clone()
    }

    /// Point the client at another jar
    pub fn set_cookie_jar(&self, jar: CookieJar) {
        *self.cookie_jar.write() = jar;
    }

    /// Base URL with trailing slashes trimmed
    pub fn base_url(&self) -> Option<&str> {
        self.config.base_url.as_deref()
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Execute a GET request
    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::GET, path, None, options).await
    }

    /// Execute a POST request
    pub async fn post(
        &self,
        path: &str,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(Method::POST, path, Some(body.into()), options)
            .await
    }

    /// Execute a PUT request
    pub async fn put(
        &self,
        path: &str,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(Method::PUT, path, Some(body.into()), options)
            .await
    }

    /// Execute a DELETE request
    pub async fn delete(
        &self,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(Method::DELETE, path, body, options).await
    }

    /// Execute a PATCH request
    pub async fn patch(
        &self,
        path: &str,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(Method::PATCH, path, Some(body.into()), options)
            .await
    }

    /// Execute a HEAD request
    pub async fn head(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::HEAD, path, None, options).await
    }

    /// Execute an OPTIONS request
    pub async fn options(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::OPTIONS, path, None, options).await
    }

    /// Execute a request, retrying whole redirect chains per the merged policy
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        let config = RequestConfig {
            method,
            url: self.build_url(path)?,
            headers: HeaderMap::new(),
            body,
            timeout: options.timeout.unwrap_or(self.config.timeout),
            follow_redirects: options
                .follow_redirects
                .unwrap_or(self.config.follow_redirects),
            retry: self.config.retry.merge(options.retry.as_ref()),
            validate_status: options
                .validate_status
                .clone()
                .unwrap_or_else(|| self.config.validate_status.clone()),
            response_type: options.response_type.unwrap_or_default(),
            throw_on_http_error: options
                .throw_on_http_error
                .unwrap_or(self.config.throw_on_http_error),
        };

        let mut attempt = 0u32;
        loop {
            match self.execute(config.clone(), &options.headers).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if !config.retry.should_retry_error(&err, attempt) {
                        return Err(err.into());
                    }
                    let delay = config.retry.delay(attempt);
                    tracing::warn!(
                        method = %config.method,
                        url = %config.url,
                        attempt = attempt + 1,
                        max_retries = config.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run one attempt, following redirects
    async fn execute(
        &self,
        mut config: RequestConfig,
        extra_headers: &HeaderMap,
    ) -> std::result::Result<Response, HttpError> {
        let start = Instant::now();
        let mut hops = 0usize;

        loop {
            let mut headers = self.build_headers(&config.url, extra_headers);
            let body = prepare_body(config.body.as_ref(), &mut headers)
                .map_err(|e| HttpError::network(e, &config))?;
            config.headers = headers;

            tracing::debug!(method = %config.method, url = %config.url, "Sending request");
            let raw = self.send(&config, body).await?;
            self.store_cookies(&raw.headers, &config.url);

            let status = raw.status.as_u16();
            let status_text = raw.status.canonical_reason().unwrap_or("").to_string();
            tracing::debug!(url = %config.url, status, "Received response");

            if config.follow_redirects && REDIRECT_STATUSES.contains(&status) {
                if hops >= self.config.max_redirects {
                    return Err(HttpError::too_many_redirects(
                        self.config.max_redirects,
                        &config,
                    ));
                }

                let location = raw
                    .headers
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        HttpError::redirect(
                            "Redirect location header missing",
                            status,
                            status_text.clone(),
                            &config,
                        )
                    })?;

                let next = config.url.join(location).map_err(|e| {
                    HttpError::redirect(
                        format!("Invalid redirect location '{}': {}", location, e),
                        status,
                        status_text.clone(),
                        &config,
                    )
                })?;

                tracing::debug!(status, from = %config.url, to = %next, "Following redirect");

                if METHOD_DOWNGRADE_STATUSES.contains(&status) {
                    config.method = Method::GET;
                    config.body = None;
                }
                config.url = next;
                hops += 1;
                continue;
            }

            let empty = raw.status == StatusCode::NO_CONTENT
                || raw
                    .headers
                    .get(CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .map_or(false, |v| v.trim() == "0");
            let data = if empty {
                ResponseData::Null
            } else {
                ResponseData::decode(raw.body, config.response_type)
            };

            let response = Response {
                status: raw.status,
                status_text,
                headers: raw.headers,
                data,
                url: config.url.clone(),
                redirected: hops > 0,
                response_time_ms: start.elapsed().as_millis() as u64,
                config: config.clone(),
            };

            if config.throw_on_http_error && !config.validate_status.validate(status) {
                tracing::debug!(url = %response.url, status, "Status rejected by validator");
                return Err(HttpError::status(response));
            }

            return Ok(response);
        }
    }

    /// Send one hop under the attempt timeout, body read included
    async fn send(
        &self,
        config: &RequestConfig,
        body: PreparedBody,
    ) -> std::result::Result<RawResponse, HttpError> {
        let mut builder = self
            .client
            .request(config.method.clone(), config.url.clone())
            .headers(config.headers.clone());

        builder = match body {
            PreparedBody::Empty => builder,
            PreparedBody::Bytes(bytes) => builder.body(bytes),
            PreparedBody::Multipart(form) => builder.multipart(form),
        };

        let exchange = async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(RawResponse {
                status,
                headers,
                body,
            })
        };

        match tokio::time::timeout(config.timeout, exchange).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) if e.is_timeout() => Err(HttpError::timeout(config)),
            Ok(Err(e)) => {
                tracing::debug!(url = %config.url, error = %e, "Network error");
                Err(HttpError::network(e, config))
            }
            Err(_) => {
                tracing::debug!(url = %config.url, timeout_ms = config.timeout.as_millis() as u64, "Request timed out");
                Err(HttpError::timeout(config))
            }
        }
    }

    /// Resolve a path against the base URL
    fn build_url(&self, path: &str) -> Result<Url> {
        if is_absolute(path) {
            return Ok(Url::parse(path)?);
        }

        match self.config.base_url {
            Some(ref base) => {
                let joined = if path.starts_with('/') {
                    format!("{}{}", base, path)
                } else {
                    format!("{}/{}", base, path)
                };
                Ok(Url::parse(&joined)?)
            }
            None => Ok(Url::parse(path)?),
        }
    }

    /// Headers for one hop, lowest precedence first
    fn build_headers(&self, url: &Url, extra: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let user_agent = HeaderValue::from_str(&self.config.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(USER_AGENT, user_agent);
        for (name, value) in DEFAULT_HEADERS {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        for (name, value) in self.config.default_headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        for (name, value) in extra.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let cookies = self.cookie_jar().get_cookie_string(url.as_str());
        if !cookies.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&cookies) {
                headers.insert(COOKIE, value);
            }
        }

        if !headers.contains_key(REFERER) {
            if let Some(value) = self
                .config
                .base_url
                .as_deref()
                .and_then(|base| HeaderValue::from_str(base).ok())
            {
                headers.insert(REFERER, value);
            }
        }

        headers
    }

    /// Capture Set-Cookie headers into the jar
    fn store_cookies(&self, headers: &HeaderMap, url: &Url) {
        let jar = self.cookie_jar();
        for value in headers.get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for part in split_set_cookie_header(value) {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                if is_deletion(part) {
                    tracing::debug!(cookie = part, "Skipping deleted cookie");
                    continue;
                }
                jar.set_cookie_str(part, url.as_str());
            }
        }
    }
}

fn is_absolute(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Split a folded Set-Cookie value on commas that start a new `name=`
///
/// Commas inside `Expires=Wed, 21 Oct 2015 ...` are followed by a date
/// token, not a name, and stay in place.
fn split_set_cookie_header(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, b) in value.bytes().enumerate() {
        if b == b',' && starts_cookie_pair(&value[i + 1..]) {
            parts.push(&value[start..i]);
            start = i + 1;
        }
    }
    parts.push(&value[start..]);
    parts
}

fn starts_cookie_pair(rest: &str) -> bool {
    let rest = rest.trim_start();
    let name_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    name_len > 0 && rest.as_bytes().get(name_len) == Some(&b'=')
}

fn is_deletion(cookie: &str) -> bool {
    let lower = cookie.to_ascii_lowercase();
    lower.contains(&format!("={};", DELETED_SENTINEL))
        || lower.contains(&format!("={} ", DELETED_SENTINEL))
}

fn set_default_content_type(headers: &mut HeaderMap, value: &str) {
    if headers.contains_key(CONTENT_TYPE) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(CONTENT_TYPE, value);
    }
}

/// Encode the body and set its default Content-Type
fn prepare_body(
    body: Option<&RequestBody>,
    headers: &mut HeaderMap,
) -> std::result::Result<PreparedBody, reqwest::Error> {
    let Some(body) = body else {
        return Ok(PreparedBody::Empty);
    };

    let prepared = match body {
        RequestBody::Text(text) => {
            set_default_content_type(headers, "text/plain;charset=UTF-8");
            PreparedBody::Bytes(Bytes::from(text.clone()))
        }
        RequestBody::Form(pairs) => {
            set_default_content_type(
                headers,
                "application/x-www-form-urlencoded;charset=UTF-8",
            );
            PreparedBody::Bytes(Bytes::from(RequestBody::encode_form(pairs)))
        }
        RequestBody::Json(value) => {
            set_default_content_type(headers, "application/json;charset=UTF-8");
            PreparedBody::Bytes(Bytes::from(value.to_string()))
        }
        RequestBody::Binary { data, content_type } => {
            set_default_content_type(
                headers,
                content_type.as_deref().unwrap_or("application/octet-stream"),
            );
            PreparedBody::Bytes(data.clone())
        }
        RequestBody::Multipart(fields) => {
            // reqwest writes the boundary
            headers.remove(CONTENT_TYPE);
            PreparedBody::Multipart(build_multipart(fields)?)
        }
    };

    Ok(prepared)
}

fn build_multipart(fields: &[MultipartField]) -> std::result::Result<Form, reqwest::Error> {
    let mut form = Form::new();
    for field in fields {
        form = match field.value {
            MultipartValue::Text(ref text) => form.text(field.name.clone(), text.clone()),
            MultipartValue::File {
                ref data,
                ref file_name,
                ref mime,
            } => {
                let mut part = Part::bytes(data.to_vec());
                if let Some(name) = file_name {
                    part = part.file_name(name.clone());
                }
                if let Some(mime) = mime {
                    part = part.mime_str(mime)?;
                }
                form.part(field.name.clone(), part)
            }
        };
    }
    Ok(form)
}
