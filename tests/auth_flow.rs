// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use ypareo::{
    AuthEvent, Client, ClientConfig, Cookie, CookieJar, EventKind, SerializedSession,
    SessionState, User,
};

const LOGIN_PATH: &str = "/index.php/login";
const AUTH_PATH: &str = "/index.php/authentication";
const HOME_PATH: &str = "/index.php/apprenant/accueil";

const HOME_PAGE: &str = r#"<html><body>
    <div class="user-info"><span class="user-info-label">Jane Doe</span></div>
    <select name="codeInscription"><option value="1234567">BTS SIO (2024-2025)</option></select>
</body></html>"#;

fn client_for(server: &MockServer) -> Client {
    Client::new(ClientConfig::new(server.uri(), "jdoe", "pw")).expect("client")
}

/// Record every event kind in order
fn record_events(client: &Client) -> Arc<Mutex<Vec<EventKind>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        EventKind::Ready,
        EventKind::Login,
        EventKind::Logout,
        EventKind::SessionRestored,
        EventKind::Error,
    ] {
        let seen = seen.clone();
        client.on(kind, move |event| seen.lock().unwrap().push(event.kind()));
    }
    seen
}

async fn mount_login_page(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Successful form post: session cookie set, redirect to the landing page
async fn mount_successful_auth(server: &MockServer, session_id: &str) {
    Mock::given(method("POST"))
        .and(path(AUTH_PATH))
        .and(body_string_contains("login=jdoe"))
        .and(body_string_contains("password=pw"))
        .and(body_string_contains("btnSeConnecter=Se+connecter"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", HOME_PATH)
                .insert_header(
                    "set-cookie",
                    format!("PHPSESSID={}; Path=/; HttpOnly", session_id).as_str(),
                ),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(HOME_PATH))
        .and(header("cookie", format!("PHPSESSID={}", session_id).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME_PAGE))
        .mount(server)
        .await;
}

fn saved_session(session_id: &str, age_ms: i64) -> String {
    let jar = CookieJar::new();
    jar.set_cookie(Cookie::new("PHPSESSID", session_id).domain(".127.0.0.1"));
    serde_json::to_string(&SerializedSession {
        user: User::new("jdoe").with_full_name("Saved Name"),
        cookies: jar.serialize(),
        timestamp: Utc::now().timestamp_millis() - age_ms,
    })
    .expect("serialize")
}

#[tokio::test]
async fn login_without_csrf_token() {
    let server = MockServer::start().await;
    mount_login_page(&server, "<html><form></form></html>").await;
    mount_successful_auth(&server, "abc").await;

    let client = client_for(&server);
    let events = record_events(&client);

    let user = client.login().await.expect("login");

    assert_eq!(user.full_name.as_deref(), Some("Jane Doe"));
    assert_eq!(user.registrations[0].code, 1234567);
    assert!(client.is_connected());
    assert_eq!(client.state(), SessionState::Connected);
    assert_eq!(
        *events.lock().unwrap(),
        vec![EventKind::Login, EventKind::Ready]
    );

    let requests = server.received_requests().await.expect("requests");
    let post = requests
        .iter()
        .find(|r| r.url.path() == AUTH_PATH)
        .expect("auth request");
    let body = String::from_utf8_lossy(&post.body);
    assert!(!body.contains("token_csrf"));
    assert!(body.contains("screenWidth=1920"));

    // already connected: no new requests, just ready
    let again = client.login().await.expect("login");
    assert_eq!(again, user);
    assert_eq!(server.received_requests().await.expect("requests").len(), requests.len());
}

#[tokio::test]
async fn login_sends_csrf_token() {
    let server = MockServer::start().await;
    mount_login_page(
        &server,
        r#"<form><input type="hidden" name="token_csrf" value="tok123"></form>"#,
    )
    .await;
    Mock::given(method("POST"))
        .and(path(AUTH_PATH))
        .and(body_string_contains("token_csrf=tok123"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", HOME_PATH))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(HOME_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME_PAGE))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = client.login().await.expect("login");
    assert_eq!(user.username, "jdoe");
}

#[tokio::test]
async fn locked_account_is_rejected() {
    let server = MockServer::start().await;
    mount_login_page(&server, "<html></html>").await;
    Mock::given(method("POST"))
        .and(path(AUTH_PATH))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/index.php/login/4"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.php/login/4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>locked</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let e = errors.clone();
    client.on(EventKind::Error, move |event| {
        if let AuthEvent::Error(err) = event {
            e.lock().unwrap().push(err.to_string());
        }
    });

    let err = client.login().await.expect_err("login should fail");

    assert!(err.is_authentication());
    assert!(err.is_login_failure());
    assert!(err.to_string().contains("Account disabled"));
    assert_eq!(err.login_error_code(), Some(ypareo::LoginErrorCode::AccountLocked));
    assert_eq!(client.state(), SessionState::Error);
    assert!(client.user().is_none());
    assert_eq!(
        *errors.lock().unwrap(),
        vec!["Login failed: Authentication failed: Account disabled.".to_string()]
    );
}

#[tokio::test]
async fn login_page_failure_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.login().await.expect_err("login should fail");

    assert!(err.is_authentication());
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(client.state(), SessionState::Error);
}

#[tokio::test]
async fn cleared_password_prevents_login() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    client.clear_password();

    let err = client.login().await.expect_err("login should fail");
    assert_eq!(err.to_string(), "Password has been cleared. Cannot login.");
    assert!(server.received_requests().await.expect("requests").is_empty());
}

#[tokio::test]
async fn save_logout_and_restore() {
    let server = MockServer::start().await;
    mount_login_page(&server, "<html></html>").await;
    mount_successful_auth(&server, "abc").await;

    let client = client_for(&server);
    let events = record_events(&client);
    client.login().await.expect("login");
    let saved = client.save_session().expect("save");

    client.logout();
    assert_eq!(client.state(), SessionState::Disconnected);
    assert!(client.http().cookie_jar().is_empty());
    assert!(client.save_session().is_err());

    // the password was dropped after login, so this must succeed on cookies alone
    let user = client.restore_session(&saved, true).await.expect("restore");
    assert_eq!(user.full_name.as_deref(), Some("Jane Doe"));
    assert!(client.is_connected());
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            EventKind::Login,
            EventKind::Ready,
            EventKind::Logout,
            EventKind::SessionRestored
        ]
    );
}

#[tokio::test]
async fn stale_session_without_relogin_fails() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let events = record_events(&client);

    let saved = saved_session("old", 25 * 60 * 60 * 1000);
    let err = client
        .restore_session(&saved, false)
        .await
        .expect_err("restore should fail");

    assert_eq!(err.to_string(), "Session restore failed: Session expired");
    assert_eq!(client.state(), SessionState::Disconnected);
    assert_eq!(*events.lock().unwrap(), vec![EventKind::Error]);
    assert!(server.received_requests().await.expect("requests").is_empty());
}

#[tokio::test]
async fn rejected_session_falls_back_to_login() {
    let server = MockServer::start().await;
    mount_login_page(&server, "<html></html>").await;
    mount_successful_auth(&server, "fresh").await;
    Mock::given(method("GET"))
        .and(path(HOME_PATH))
        .and(header("cookie", "PHPSESSID=stale"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", LOGIN_PATH))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let events = record_events(&client);

    let user = client
        .restore_session(&saved_session("stale", 0), true)
        .await
        .expect("restore");

    assert_eq!(user.full_name.as_deref(), Some("Jane Doe"));
    assert_eq!(
        client.http().cookie_jar().get_cookie_string(&server.uri()),
        "PHPSESSID=fresh"
    );
    assert_eq!(
        *events.lock().unwrap(),
        vec![EventKind::Login, EventKind::Ready]
    );
}

#[tokio::test]
async fn rejected_session_without_relogin_fails() {
    let server = MockServer::start().await;
    mount_login_page(&server, "<html></html>").await;
    Mock::given(method("GET"))
        .and(path(HOME_PATH))
        .respond_with(ResponseTemplate::new(302).insert_header("location", LOGIN_PATH))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .restore_session(&saved_session("stale", 0), false)
        .await
        .expect_err("restore should fail");

    assert!(err
        .to_string()
        .starts_with("Session restore failed: Session invalid on server:"));
    assert!(client.user().is_none());
    assert!(client.http().cookie_jar().is_empty());
}

#[tokio::test]
async fn background_login_reports_through_events() {
    let server = MockServer::start().await;
    mount_login_page(&server, "<html></html>").await;
    mount_successful_auth(&server, "abc").await;

    let client = client_for(&server);
    let events = record_events(&client);

    client.spawn_login().await.expect("join");

    assert!(client.is_connected());
    assert_eq!(
        *events.lock().unwrap(),
        vec![EventKind::Login, EventKind::Ready]
    );
}
