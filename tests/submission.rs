//! Request submission against a mocked crew backend.

use std::time::Duration;

use crew_assistant::api::{CrewClient, GENERIC_FAILURE, NO_RESULTS};
use crew_assistant::app::App;
use crew_assistant::auth::User;
use crew_assistant::form::{OutputView, EMPTY_REQUEST, LOGIN_REQUIRED};
use serde_json::json;
use url::Url;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_for(base: &str) -> App {
    let crew = CrewClient::new(Url::parse(base).expect("base url"));
    let mut app = App::with_clients(crew, None);
    app.session
        .signed_in(User::new("test-session-token".to_string(), None, Some(3600)));
    app
}

/// Poll until the in-flight request has been folded into the form.
async fn settle(app: &mut App) {
    for _ in 0..300 {
        app.poll_background().await;
        if app.request_task.is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("request never completed");
}

#[tokio::test]
async fn sends_trimmed_request_with_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crew"))
        .and(header("Authorization", "Bearer test-session-token"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({ "user_request": "Find contact information for Sarah" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "user_request": "Find contact information for Sarah",
            "result": "Sarah Connor <sarah@example.com>"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut app = app_for(&mock_server.uri());
    app.form.set_draft("   Find contact information for Sarah  ");
    app.submit();
    settle(&mut app).await;

    assert_eq!(
        app.form.output(false),
        OutputView::Success("Sarah Connor <sarah@example.com>")
    );
    assert!(app.form.error().is_none());
    assert_eq!(app.form.draft(), "   Find contact information for Sarah  ");
}

#[tokio::test]
async fn combined_result_is_preferred_verbatim() {
    let mock_server = MockServer::start().await;
    let combined = "Meeting created:\n  Tomorrow 14:00  with John\n\nContact: john@company.com";

    Mock::given(method("POST"))
        .and(path("/api/crew"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "combined_result": combined,
            "result": "ignored"
        })))
        .mount(&mock_server)
        .await;

    let mut app = app_for(&mock_server.uri());
    app.form.set_draft("Create a meeting tomorrow at 2pm with John");
    app.submit();
    settle(&mut app).await;

    assert_eq!(app.form.output(false), OutputView::Success(combined));
}

#[tokio::test]
async fn success_without_result_fields_shows_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crew"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&mock_server)
        .await;

    let mut app = app_for(&mock_server.uri());
    app.form.set_draft("anything");
    app.submit();
    settle(&mut app).await;

    assert_eq!(app.form.output(false), OutputView::Success(NO_RESULTS));
}

#[tokio::test]
async fn server_error_message_is_shown_exactly() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crew"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid session token" })),
        )
        .mount(&mock_server)
        .await;

    let mut app = app_for(&mock_server.uri());
    app.form.set_draft("find Sarah");
    app.submit();
    settle(&mut app).await;

    assert_eq!(app.form.output(false), OutputView::Error("Invalid session token"));
    assert!(app.form.response().is_none());
}

#[tokio::test]
async fn error_without_message_is_generic() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crew"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let mut app = app_for(&mock_server.uri());
    app.form.set_draft("find Sarah");
    app.submit();
    settle(&mut app).await;

    assert_eq!(app.form.output(false), OutputView::Error(GENERIC_FAILURE));
}

#[tokio::test]
async fn connection_refused_names_the_port() {
    // Grab a free port and close it again so nothing is listening
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut app = app_for(&format!("http://127.0.0.1:{}", port));
    app.form.set_draft("find Sarah");
    app.submit();
    settle(&mut app).await;

    let expected = format!(
        "Cannot connect to server. Make sure the backend is running on port {}.",
        port
    );
    assert_eq!(app.form.error(), Some(expected.as_str()));
}

#[tokio::test]
async fn blank_input_never_reaches_the_backend() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut app = app_for(&mock_server.uri());
    for draft in ["", "    ", "\n\n"] {
        app.form.set_draft(draft);
        app.submit();
        assert!(app.request_task.is_none());
        assert_eq!(app.form.error(), Some(EMPTY_REQUEST));
    }

    mock_server.verify().await;
}

#[tokio::test]
async fn missing_token_never_reaches_the_backend() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crew = CrewClient::new(Url::parse(&mock_server.uri()).unwrap());
    let mut app = App::with_clients(crew, None);
    app.form.set_draft("find Sarah");
    app.submit();

    assert!(app.request_task.is_none());
    assert_eq!(app.form.error(), Some(LOGIN_REQUIRED));
    mock_server.verify().await;
}

#[tokio::test]
async fn overlapping_submit_is_ignored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crew"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": "done" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut app = app_for(&mock_server.uri());
    app.form.set_draft("find Sarah");
    app.submit();
    assert!(app.is_busy());
    assert_eq!(app.form.output(false), OutputView::Loading);

    app.submit();
    settle(&mut app).await;

    assert_eq!(app.form.output(false), OutputView::Success("done"));
    mock_server.verify().await;
}

#[tokio::test]
async fn typing_after_error_clears_it_before_resubmitting() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crew"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "No JSON data provided" })))
        .mount(&mock_server)
        .await;

    let mut app = app_for(&mock_server.uri());
    app.form.set_draft("find Sarah");
    app.submit();
    settle(&mut app).await;
    assert_eq!(app.form.error(), Some("No JSON data provided"));

    app.form.insert_char('!');
    assert_eq!(app.form.error(), None);
    assert_eq!(app.form.output(false), OutputView::Empty);
}

#[tokio::test]
async fn health_reports_backend_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "message": "Backend is running!"
        })))
        .mount(&mock_server)
        .await;

    let crew = CrewClient::new(Url::parse(&mock_server.uri()).unwrap());
    let status = crew.health().await.expect("health");

    assert_eq!(status.status, "healthy");
    assert_eq!(status.message.as_deref(), Some("Backend is running!"));
}
