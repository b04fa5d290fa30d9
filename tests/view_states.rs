//! Which screen and output state gets drawn.

use crew_assistant::api::{ApiError, CrewClient, CrewResponse};
use crew_assistant::app::{App, InputMode};
use crew_assistant::auth::User;
use crew_assistant::ui::{self, INPUT_LABEL, LOGIN_PROMPT};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use reqwest::StatusCode;
use url::Url;

fn logged_out_app() -> App {
    let crew = CrewClient::new(Url::parse("http://localhost:5001").unwrap());
    App::with_clients(crew, None)
}

fn signed_in_app() -> App {
    let mut app = logged_out_app();
    app.session
        .signed_in(User::new("token".to_string(), None, Some(3600)));
    app.input_mode = InputMode::Editing;
    app
}

/// Render and return the screen as one string per row.
fn draw(app: &mut App) -> Vec<String> {
    let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
    terminal.draw(|frame| ui::render(app, frame)).unwrap();

    let buffer = terminal.backend().buffer();
    buffer
        .content()
        .chunks(buffer.area.width as usize)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect()
}

fn shows(screen: &[String], needle: &str) -> bool {
    screen.iter().any(|row| row.contains(needle))
}

#[test]
fn logged_out_shows_login_and_never_the_form() {
    let mut app = logged_out_app();
    let screen = draw(&mut app);

    assert!(shows(&screen, LOGIN_PROMPT));
    assert!(!shows(&screen, INPUT_LABEL));
    assert!(!shows(&screen, "Send Request"));
}

#[test]
fn authenticated_shows_form_and_never_login() {
    let mut app = signed_in_app();
    let screen = draw(&mut app);

    assert!(shows(&screen, INPUT_LABEL));
    assert!(!shows(&screen, LOGIN_PROMPT));
    assert!(shows(&screen, "Enter a request above to get started"));
}

#[test]
fn expired_session_falls_back_to_login() {
    let mut app = signed_in_app();
    app.session
        .signed_in(User::new("token".to_string(), None, Some(0)));
    let screen = draw(&mut app);

    assert!(shows(&screen, LOGIN_PROMPT));
    assert!(!shows(&screen, INPUT_LABEL));
}

#[test]
fn login_in_progress_shows_loading_and_url() {
    let mut app = logged_out_app();
    app.session.begin_signin();
    app.session
        .set_redirect_url("https://auth.example.com/authorize?client_id=x".to_string());
    let screen = draw(&mut app);

    assert!(shows(&screen, "Loading..."));
    assert!(shows(&screen, "https://auth.example.com/authorize?client_id=x"));
    assert!(!shows(&screen, LOGIN_PROMPT));
}

#[test]
fn login_error_is_displayed() {
    let mut app = logged_out_app();
    app.session.begin_signin();
    app.session
        .signin_failed("identity provider error: access_denied".to_string());
    let screen = draw(&mut app);

    assert!(shows(&screen, "identity provider error: access_denied"));
    assert!(shows(&screen, LOGIN_PROMPT));
}

#[test]
fn response_text_is_displayed() {
    let mut app = signed_in_app();
    app.form.set_draft("find Sarah");
    app.form.begin_submit(Some("token")).unwrap();
    app.form.finish(Ok(CrewResponse {
        result: Some("Sarah Connor, sarah@example.com".to_string()),
        ..Default::default()
    }));
    let screen = draw(&mut app);

    assert!(shows(&screen, "Response"));
    assert!(shows(&screen, "Sarah Connor, sarah@example.com"));
    assert!(!shows(&screen, "Enter a request above to get started"));
}

#[test]
fn error_text_is_displayed() {
    let mut app = signed_in_app();
    app.form.set_draft("find Sarah");
    app.form.begin_submit(Some("token")).unwrap();
    app.form.finish(Err(ApiError::Server {
        status: StatusCode::UNAUTHORIZED,
        message: "Invalid session token".to_string(),
    }));
    let screen = draw(&mut app);

    assert!(shows(&screen, "Error"));
    assert!(shows(&screen, "Invalid session token"));
}

#[test]
fn in_flight_request_shows_processing() {
    let mut app = signed_in_app();
    app.form.set_draft("find Sarah");
    app.form.begin_submit(Some("token")).unwrap();
    let screen = draw(&mut app);

    assert!(shows(&screen, "Processing your request..."));
    assert!(shows(&screen, "This may take a few seconds"));
}
