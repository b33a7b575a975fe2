// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use ypareo::http::{
    HttpClient, HttpClientConfig, RequestBody, RequestOptions, ResponseData, RetryOptions,
    RetryOverrides,
};
use ypareo::{Error, HttpErrorKind};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::with_config(HttpClientConfig::new().base_url(server.uri())).expect("http client")
}

fn has_cookie(client: &HttpClient, key: &str) -> bool {
    client
        .cookie_jar()
        .all_cookies()
        .iter()
        .any(|cookie| cookie.key == key)
}

fn fast_retry() -> RetryOverrides {
    RetryOverrides::new()
        .enabled(true)
        .retry_delay(|_| Duration::from_millis(10))
}

#[tokio::test]
async fn follows_302_as_get_and_replays_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/home")
                .insert_header("set-cookie", "PHPSESSID=abc123; Path=/; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .and(header("cookie", "PHPSESSID=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .post(
            "/login",
            RequestBody::form([("login", "jdoe")]),
            RequestOptions::default(),
        )
        .await
        .expect("response");

    assert!(response.redirected);
    assert_eq!(response.url.path(), "/home");
    assert_eq!(response.config.method, reqwest::Method::GET);
    assert!(response.config.body.is_none());
    assert_eq!(response.text(), Some("welcome"));
    assert!(has_cookie(&client, "PHPSESSID"));
}

#[tokio::test]
async fn downgrades_303_post_and_drops_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(303).insert_header("location", "/next"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .post("/submit", "payload", RequestOptions::default())
        .await
        .expect("response");

    assert!(response.redirected);
    assert_eq!(response.url.path(), "/next");

    let requests = server.received_requests().await.expect("requests");
    let follow_up = requests.last().expect("second hop");
    assert_eq!(follow_up.method.as_str(), "GET");
    assert!(follow_up.body.is_empty());
    assert!(follow_up.headers.get("content-type").is_none());
}

#[tokio::test]
async fn keeps_method_and_body_on_307() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(307).insert_header("location", "/upload-final"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload-final"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .post("/upload", "payload", RequestOptions::default())
        .await
        .expect("response");

    assert_eq!(response.status_code(), 201);
    assert_eq!(response.config.method, reqwest::Method::POST);
}

#[tokio::test]
async fn retries_server_errors_until_success() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    Mock::given(method("GET"))
        .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
            let current = attempts_clone.fetch_add(1, Ordering::SeqCst);
            if current < 2 {
                ResponseTemplate::new(503)
            } else {
                ResponseTemplate::new(200).set_body_string("ok")
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .get("/data", RequestOptions::new().retry(fast_retry()))
        .await
        .expect("response");

    assert_eq!(response.status_code(), 200);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::new()
            .base_url(server.uri())
            .retry(RetryOptions::new().enabled(true).max_retries(2)),
    )
    .expect("http client");

    let err = client
        .get(
            "/data",
            RequestOptions::new().retry(RetryOverrides::new().retry_delay(|_| Duration::ZERO)),
        )
        .await
        .expect_err("should fail");

    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.to_string(), "Request failed with status code 503");
}

#[tokio::test]
async fn does_not_retry_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .get("/data", RequestOptions::default())
        .await
        .expect_err("should fail");

    match err {
        Error::Http(e) => {
            assert_eq!(e.kind, HttpErrorKind::Status);
            assert_eq!(e.status, Some(503));
            assert_eq!(e.response.map(|r| r.status_code()), Some(503));
        }
        other => panic!("expected http error, got {:?}", other),
    }
}

#[tokio::test]
async fn does_not_retry_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .get("/missing", RequestOptions::new().retry(fast_retry()))
        .await
        .expect_err("should fail");

    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn times_out_slow_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .get(
            "/slow",
            RequestOptions::new().timeout(Duration::from_millis(50)),
        )
        .await
        .expect_err("should time out");

    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "Request timed out after 50ms");
}

#[tokio::test]
async fn redirect_without_location_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(302))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .get("/nowhere", RequestOptions::new().retry(fast_retry()))
        .await
        .expect_err("should fail");

    match err {
        Error::Http(e) => {
            assert_eq!(e.kind, HttpErrorKind::Redirect);
            assert_eq!(e.status, Some(302));
            assert_eq!(e.message, "Redirect location header missing");
        }
        other => panic!("expected redirect error, got {:?}", other),
    }
}

#[tokio::test]
async fn stops_after_max_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .expect(3)
        .mount(&server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::new()
            .base_url(server.uri())
            .max_redirects(2),
    )
    .expect("http client");

    let err = client
        .get("/loop", RequestOptions::new().retry(fast_retry()))
        .await
        .expect_err("should fail");

    assert_eq!(err.to_string(), "Max redirects exceeded: 2");
    assert_eq!(err.status_code(), None);
}

#[tokio::test]
async fn returns_redirect_when_not_following() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .get(
            "/start",
            RequestOptions::new()
                .follow_redirects(false)
                .throw_on_http_error(false),
        )
        .await
        .expect("response");

    assert_eq!(response.status_code(), 302);
    assert!(!response.redirected);
    assert_eq!(response.header("location"), Some("/elsewhere"));
}

#[tokio::test]
async fn no_content_decodes_to_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .delete("/item/1", None, RequestOptions::default())
        .await
        .expect("response");

    assert_eq!(response.data, ResponseData::Null);
}

#[tokio::test]
async fn skips_deleted_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header(
                    "set-cookie",
                    "PHPSESSID=deleted; expires=Thu, 01 Jan 1970 00:00:01 GMT; Path=/",
                )
                .append_header("set-cookie", "keep=1; Path=/"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .get("/logout", RequestOptions::default())
        .await
        .expect("response");

    assert!(!has_cookie(&client, "PHPSESSID"));
    assert!(has_cookie(&client, "keep"));
}

#[tokio::test]
async fn sends_json_with_default_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("content-type", "application/json;charset=UTF-8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"saved":true}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let body = RequestBody::json(&serde_json::json!({"name": "value"})).expect("body");
    let response = client
        .put(
            "/settings",
            body,
            RequestOptions::new().response_type(ypareo::http::ResponseType::Json),
        )
        .await
        .expect("response");

    assert_eq!(response.data, ResponseData::Json(serde_json::json!({"saved": true})));
}

#[tokio::test]
async fn stores_cookies_folded_into_one_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header(
            "set-cookie",
            "a=1; Path=/, b=2; Expires=Wed, 21 Oct 2099 07:28:00 GMT; Path=/,c=3; HttpOnly",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .get("/login", RequestOptions::default())
        .await
        .expect("response");

    let cookies = client.cookie_jar().all_cookies();
    assert_eq!(cookies.len(), 3);
    let b = cookies.iter().find(|c| c.key == "b").expect("cookie b");
    assert_eq!(b.value, "2");
    assert!(b.expires.is_some());
    assert!(cookies.iter().any(|c| c.key == "c" && c.http_only));

    client
        .get("/home", RequestOptions::default())
        .await
        .expect("response");
    let requests = server.received_requests().await.expect("requests");
    let sent = requests
        .iter()
        .find(|r| r.url.path() == "/home")
        .and_then(|r| r.headers.get("cookie"))
        .and_then(|v| v.to_str().ok())
        .expect("cookie header")
        .to_string();
    for pair in ["a=1", "b=2", "c=3"] {
        assert!(sent.contains(pair), "{} missing from {}", pair, sent);
    }
}

#[tokio::test]
async fn empty_json_body_decodes_to_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .get(
            "/empty",
            RequestOptions::new().response_type(ypareo::http::ResponseType::Json),
        )
        .await
        .expect("response");

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.data, ResponseData::Null);
}

#[tokio::test]
async fn retries_after_timeout() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    Mock::given(method("GET"))
        .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
            if attempts_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(200).set_delay(Duration::from_millis(500))
            } else {
                ResponseTemplate::new(200).set_body_string("ok")
            }
        })
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .get(
            "/flaky",
            RequestOptions::new()
                .timeout(Duration::from_millis(100))
                .retry(fast_retry()),
        )
        .await
        .expect("response after retry");

    assert_eq!(response.text(), Some("ok"));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn timeout_without_retry_is_final() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .get(
            "/slow",
            RequestOptions::new()
                .timeout(Duration::from_millis(50))
                .retry(fast_retry().enabled(false)),
        )
        .await
        .expect_err("should time out");

    assert!(err.is_timeout());
}
