//! OIDC login for the terminal client.
//!
//! The flow mirrors a browser sign-in redirect:
//!
//! ```text
//! discover ──► PKCE + state ──► loopback listener ──► open browser
//!                                      │
//!                        redirect with ?code&state
//!                                      ▼
//!                              token exchange ──► User
//! ```
//!
//! Tokens are held in memory only. There is no refresh and no token
//! validation; the backend validates the bearer token it receives.

pub mod callback;
pub mod oidc;
pub mod pkce;
pub mod session;

use std::process::{Command, Stdio};
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, warn};

pub use oidc::{OidcClient, PendingSignin, ProviderMetadata};
pub use session::{Profile, Session, User};

/// How long to wait for the user to finish in the browser.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("could not reach the identity provider: {0}")]
    Request(#[from] reqwest::Error),

    #[error("discovery document at {url} returned {status}")]
    Discovery { url: String, status: StatusCode },

    #[error("identity provider error: {0}")]
    Provider(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("login state did not match, please try again")]
    StateMismatch,

    #[error("login callback failed: {0}")]
    Callback(String),

    #[error("redirect URI {0} has no usable port")]
    InvalidRedirect(String),

    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out waiting for the browser login")]
    Timeout,
}

/// Progress of a background sign-in, delivered to the event loop.
#[derive(Debug)]
pub enum AuthEvent {
    Redirecting(String),
    SignedIn(User),
    Failed(String),
}

/// Run the whole sign-in. `on_redirect` sees the authorization URL before the
/// browser is opened.
pub async fn signin<F>(client: &OidcClient, on_redirect: F) -> Result<User, AuthError>
where
    F: FnOnce(&str),
{
    let pending = client.begin_signin().await?;
    on_redirect(pending.authorization_url());
    if let Err(err) = open_browser(pending.authorization_url()) {
        warn!("could not open a browser: {}", err);
    }
    pending.finish(LOGIN_TIMEOUT).await
}

/// Sign in on a background task, reporting progress over a channel.
pub fn spawn_signin(client: OidcClient) -> mpsc::UnboundedReceiver<AuthEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let redirect_tx = tx.clone();
        let event = match signin(&client, |url| {
            let _ = redirect_tx.send(AuthEvent::Redirecting(url.to_string()));
        })
        .await
        {
            Ok(user) => AuthEvent::SignedIn(user),
            Err(err) => {
                error!("sign-in failed: {}", err);
                AuthEvent::Failed(err.to_string())
            }
        };
        let _ = tx.send(event);
    });

    rx
}

/// Hand the URL to the platform's opener.
pub fn open_browser(url: &str) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };

    command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}
