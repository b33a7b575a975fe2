// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP response types

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use super::request::{RequestConfig, ResponseType};
use crate::error::{Error, Result};

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// No content (204, `Content-Length: 0`, or JSON that failed to parse)
    Null,
    Text(String),
    Json(serde_json::Value),
    Binary(Bytes),
}

impl ResponseData {
    /// Decode a raw body according to the requested type
    pub fn decode(body: Bytes, response_type: ResponseType) -> Self {
        match response_type {
            ResponseType::Text => ResponseData::Text(String::from_utf8_lossy(&body).into_owned()),
            ResponseType::Json => match serde_json::from_slice(&body) {
                Ok(value) => ResponseData::Json(value),
                Err(_) => ResponseData::Null,
            },
            ResponseType::Binary => ResponseData::Binary(body),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResponseData::Null)
    }
}

/// HTTP response representation
#[derive(Debug, Clone)]
pub struct Response {
    /// Response status code
    pub status: StatusCode,
    /// Reason phrase
    pub status_text: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded body
    pub data: ResponseData,
    /// Final URL (after redirects)
    pub url: Url,
    /// Whether at least one redirect was followed
    pub redirected: bool,
    /// Response time in milliseconds, all hops included
    pub response_time_ms: u64,
    /// Config of the final hop
    pub config: RequestConfig,
}

impl Response {
    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if status is redirect (3xx)
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Get status code as u16
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Body as text, if it was decoded as text
    pub fn text(&self) -> Option<&str> {
        match self.data {
            ResponseData::Text(ref text) => Some(text),
            _ => None,
        }
    }

    /// Body as text whatever the decoding; empty for null
    pub fn text_lossy(&self) -> String {
        match self.data {
            ResponseData::Null => String::new(),
            ResponseData::Text(ref text) => text.clone(),
            ResponseData::Json(ref value) => value.to_string(),
            ResponseData::Binary(ref bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        match self.data {
            ResponseData::Json(ref value) => Ok(serde_json::from_value(value.clone())?),
            ResponseData::Text(ref text) => Ok(serde_json::from_str(text)?),
            ResponseData::Binary(ref bytes) => Ok(serde_json::from_slice(bytes)?),
            ResponseData::Null => Err(Error::other("Response has no body")),
        }
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get all values for a header
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Get content type
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the final URL as string
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text() {
        let data = ResponseData::decode(Bytes::from("Hello, World!"), ResponseType::Text);
        assert_eq!(data, ResponseData::Text("Hello, World!".to_string()));
    }

    #[test]
    fn test_decode_invalid_json_is_null() {
        assert!(ResponseData::decode(Bytes::from("<html>"), ResponseType::Json).is_null());

        let data = ResponseData::decode(Bytes::from(r#"{"ok":true}"#), ResponseType::Json);
        assert_eq!(data, ResponseData::Json(serde_json::json!({"ok": true})));
    }

    #[test]
    fn test_decode_binary() {
        let data = ResponseData::decode(Bytes::from_static(&[0, 159, 146]), ResponseType::Binary);
        assert_eq!(data, ResponseData::Binary(Bytes::from_static(&[0, 159, 146])));
    }
}
