// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP request types and per-call options

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use super::retry::{RetryOptions, RetryOverrides};
use crate::error::Result;

/// Request body, encoded according to its variant
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Plain text (`text/plain;charset=UTF-8` unless set)
    Text(String),
    /// URL-encoded form (`application/x-www-form-urlencoded;charset=UTF-8` unless set)
    Form(Vec<(String, String)>),
    /// JSON document (`application/json;charset=UTF-8` unless set)
    Json(serde_json::Value),
    /// Raw bytes (`content_type` or `application/octet-stream` unless set)
    Binary {
        data: Bytes,
        content_type: Option<String>,
    },
    /// Multipart form; the transport sets Content-Type with its boundary
    Multipart(Vec<MultipartField>),
}

impl RequestBody {
    /// Text body
    pub fn text(text: impl Into<String>) -> Self {
        RequestBody::Text(text.into())
    }

    /// Form body from key/value pairs, order preserved
    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// JSON body from any serializable value
    pub fn json<T: Serialize>(data: &T) -> Result<Self> {
        Ok(RequestBody::Json(serde_json::to_value(data)?))
    }

    /// Binary body without a declared type
    pub fn binary(data: impl Into<Bytes>) -> Self {
        RequestBody::Binary {
            data: data.into(),
            content_type: None,
        }
    }

    /// Serialized form payload
    pub(crate) fn encode_form(pairs: &[(String, String)]) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish()
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(data: Bytes) -> Self {
        RequestBody::binary(data)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(data: Vec<u8>) -> Self {
        RequestBody::binary(data)
    }
}

/// One field of a multipart body
#[derive(Debug, Clone)]
pub struct MultipartField {
    pub name: String,
    pub value: MultipartValue,
}

/// Multipart field content
#[derive(Debug, Clone)]
pub enum MultipartValue {
    Text(String),
    File {
        data: Bytes,
        file_name: Option<String>,
        mime: Option<String>,
    },
}

impl MultipartField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: MultipartValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: MultipartValue::File {
                data: data.into(),
                file_name: Some(file_name.into()),
                mime: None,
            },
        }
    }
}

/// How the response body is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// UTF-8 text (lossy)
    #[default]
    Text,
    /// JSON value; a body that fails to parse decodes to null
    Json,
    /// Raw bytes
    Binary,
}

/// Predicate deciding which statuses count as success
#[derive(Clone)]
pub struct StatusValidator(Arc<dyn Fn(u16) -> bool + Send + Sync>);

impl StatusValidator {
    pub fn new(f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Accept every status
    pub fn any() -> Self {
        Self::new(|_| true)
    }

    pub fn validate(&self, status: u16) -> bool {
        (self.0)(status)
    }
}

impl Default for StatusValidator {
    fn default() -> Self {
        Self::new(|status| (200..300).contains(&status))
    }
}

impl fmt::Debug for StatusValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StatusValidator")
    }
}

/// Per-call overrides of the client defaults
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Headers with the highest precedence
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
    pub follow_redirects: Option<bool>,
    pub retry: Option<RetryOverrides>,
    pub validate_status: Option<StatusValidator>,
    pub response_type: Option<ResponseType>,
    pub throw_on_http_error: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header (invalid names or values are ignored)
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Set multiple headers
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    pub fn retry(mut self, retry: RetryOverrides) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn validate_status(mut self, f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        self.validate_status = Some(StatusValidator::new(f));
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn throw_on_http_error(mut self, throw: bool) -> Self {
        self.throw_on_http_error = Some(throw);
        self
    }
}

/// Resolved description of one logical request
///
/// Built once per `request()` call. Redirect hops replace `url`, and for
/// 301/302/303 also `method` and `body`; `headers` holds what the latest
/// hop actually sent.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub retry: RetryOptions,
    pub validate_status: StatusValidator,
    pub response_type: ResponseType,
    pub throw_on_http_error: bool,
}
