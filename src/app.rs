use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::{ApiError, CrewClient, CrewResponse};
use crate::auth::{self, AuthEvent, OidcClient, Session};
use crate::config::{Config, ConfigError};
use crate::form::RequestForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Top-level screen, decided by the session alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Assistant,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Request form and session
    pub form: RequestForm,
    pub session: Session,

    // Output section
    pub result_scroll: u16,
    pub result_height: u16,      // Inner height of the output area
    pub result_width: u16,       // Inner width, for wrap calculations
    pub status_message: Option<String>,

    // Animation state
    pub animation_frame: u8,

    // Clients
    pub crew: CrewClient,
    pub oidc: Option<OidcClient>,
    /// Why login is unavailable, when the identity settings are incomplete
    pub oidc_unavailable: Option<String>,

    // Background work
    pub request_task: Option<JoinHandle<Result<CrewResponse, ApiError>>>,
    pub auth_events: Option<mpsc::UnboundedReceiver<AuthEvent>>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let crew = CrewClient::new(config.api_base()?);
        match config.oidc_settings() {
            Ok(settings) => Ok(Self::with_clients(crew, Some(OidcClient::new(settings)))),
            Err(err) => {
                error!("login unavailable: {}", err);
                let mut app = Self::with_clients(crew, None);
                app.oidc_unavailable = Some(err.to_string());
                Ok(app)
            }
        }
    }

    pub fn with_clients(crew: CrewClient, oidc: Option<OidcClient>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,

            form: RequestForm::default(),
            session: Session::default(),

            result_scroll: 0,
            result_height: 0,
            result_width: 0,
            status_message: None,

            animation_frame: 0,

            crew,
            oidc,
            oidc_unavailable: None,

            request_task: None,
            auth_events: None,
        }
    }

    pub fn screen(&self) -> Screen {
        if self.session.is_authenticated() {
            Screen::Assistant
        } else {
            Screen::Login
        }
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_loading() || self.form.is_in_flight()
    }

    // Session actions

    pub fn start_login(&mut self) {
        if self.session.is_loading() {
            return;
        }
        match &self.oidc {
            Some(client) => {
                info!("starting sign-in");
                self.session.begin_signin();
                self.auth_events = Some(auth::spawn_signin(client.clone()));
            }
            None => {
                let reason = self
                    .oidc_unavailable
                    .clone()
                    .unwrap_or_else(|| "login is not configured".to_string());
                self.session.signin_failed(reason);
            }
        }
    }

    /// Drop the user along with everything they typed or received.
    pub fn logout(&mut self) {
        info!("signed out");
        if let Some(task) = self.request_task.take() {
            task.abort();
        }
        self.session.sign_out();
        self.form = RequestForm::default();
        self.result_scroll = 0;
        self.input_mode = InputMode::Normal;
        self.status_message = None;
    }

    // Request actions

    /// Validate and send the draft. Ignored while the identity provider is
    /// loading or a request is already in flight.
    pub fn submit(&mut self) {
        if self.is_busy() {
            return;
        }

        let token = self.session.access_token().map(str::to_string);
        let Some(submission) = self.form.begin_submit(token.as_deref()) else {
            return;
        };

        self.result_scroll = 0;
        self.status_message = None;

        let crew = self.crew.clone();
        self.request_task = Some(tokio::spawn(async move {
            crew.submit(&submission.token, &submission.user_request).await
        }));
    }

    /// Collect finished background work. Called once per event.
    pub async fn poll_background(&mut self) {
        if self.request_task.as_ref().is_some_and(|task| task.is_finished()) {
            if let Some(task) = self.request_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(err) => Err(ApiError::Task(err.to_string())),
                };
                self.form.finish(result);
                self.result_scroll = 0;
            }
        }

        let mut disconnected = false;
        if let Some(rx) = &mut self.auth_events {
            loop {
                match rx.try_recv() {
                    Ok(AuthEvent::Redirecting(url)) => self.session.set_redirect_url(url),
                    Ok(AuthEvent::SignedIn(user)) => {
                        self.session.signed_in(user);
                        self.input_mode = InputMode::Editing;
                    }
                    Ok(AuthEvent::Failed(message)) => self.session.signin_failed(message),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }

        if disconnected {
            self.auth_events = None;
            if self.session.is_loading() {
                self.session
                    .signin_failed("sign-in ended unexpectedly".to_string());
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % SPINNER_FRAMES.len() as u8;
        }
    }

    // Output scrolling

    pub fn max_result_scroll(&self) -> u16 {
        let total = self.result_line_count();
        total.saturating_sub(self.result_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.result_scroll = self
            .result_scroll
            .saturating_add(lines)
            .min(self.max_result_scroll());
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.result_scroll = self.result_scroll.saturating_sub(lines);
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.result_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.result_height / 2).max(1));
    }

    pub fn scroll_to_end(&mut self) {
        self.result_scroll = self.max_result_scroll();
    }

    /// Wrapped line count of the shown response.
    fn result_line_count(&self) -> u16 {
        let Some(response) = self.form.response() else {
            return 0;
        };

        // Use actual output width for wrap calculation, default to 50 if not set
        let wrap_width = if self.result_width > 0 {
            self.result_width as usize
        } else {
            50
        };

        let mut total: usize = 0;
        for line in response.display_text().lines() {
            let char_count = line.chars().count();
            total += (char_count / wrap_width) + 1;
        }
        total.min(u16::MAX as usize) as u16
    }
}

pub const SPINNER_FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
