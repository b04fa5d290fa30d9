//! Loopback listener that receives the browser redirect after login.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use url::Url;

use super::AuthError;

type CodeSender = oneshot::Sender<Result<String, AuthError>>;

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Signed in</title></head>
<body><h1>You are signed in</h1><p>Return to the terminal. You can close this window.</p></body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign-in failed</title></head>
<body><h1>Sign-in failed</h1><p>Return to the terminal for details.</p></body>
</html>"#;

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    sender: Arc<Mutex<Option<CodeSender>>>,
}

impl CallbackState {
    /// Only the first callback completes the login.
    fn complete(&self, outcome: Result<String, AuthError>) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        match sender {
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => debug!("ignoring repeated login callback"),
        }
    }
}

pub struct CallbackServer {
    addr: SocketAddr,
    receiver: oneshot::Receiver<Result<String, AuthError>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Listen on the redirect URI's port and path. Port 0 picks a free port,
    /// see [`CallbackServer::local_addr`].
    pub async fn start(redirect_uri: &Url, expected_state: String) -> Result<Self, AuthError> {
        let bind_addr = bind_address(redirect_uri)?;

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| AuthError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| AuthError::Bind {
            addr: bind_addr,
            source,
        })?;

        let (code_tx, code_rx) = oneshot::channel();
        let state = CallbackState {
            expected_state: Arc::from(expected_state),
            sender: Arc::new(Mutex::new(Some(code_tx))),
        };

        let app = Router::new()
            .route(redirect_uri.path(), get(handle_callback))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("login callback server error: {}", err);
            }
        });

        debug!(%addr, path = redirect_uri.path(), "login callback server listening");

        Ok(Self {
            addr,
            receiver: code_rx,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn wait_for_code(&mut self, timeout: Duration) -> Result<String, AuthError> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(AuthError::Callback(
                "callback server stopped before a redirect arrived".to_string(),
            )),
            Err(_) => Err(AuthError::Timeout),
        }
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!("login callback server task failed: {}", err);
            }
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<&'static str>) {
    if let Some(error) = params.get("error") {
        let message = params
            .get("error_description")
            .map(|desc| format!("{}: {}", error, desc))
            .unwrap_or_else(|| error.clone());
        state.complete(Err(AuthError::Provider(message)));
        return (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE));
    }

    match (params.get("code"), params.get("state")) {
        (Some(code), Some(received)) if received.as_str() == &*state.expected_state => {
            state.complete(Ok(code.clone()));
            (StatusCode::OK, Html(SUCCESS_PAGE))
        }
        (Some(_), _) => {
            state.complete(Err(AuthError::StateMismatch));
            (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE))
        }
        (None, _) => {
            state.complete(Err(AuthError::Callback(
                "redirect did not include an authorization code".to_string(),
            )));
            (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE))
        }
    }
}

/// Listener address for the redirect URI's host and port.
fn bind_address(redirect_uri: &Url) -> Result<String, AuthError> {
    let port = redirect_uri
        .port_or_known_default()
        .ok_or_else(|| AuthError::InvalidRedirect(redirect_uri.to_string()))?;
    Ok(match redirect_uri.host_str() {
        Some("localhost") | Some("127.0.0.1") | None => format!("127.0.0.1:{}", port),
        Some("[::1]") => format!("[::1]:{}", port),
        Some(host) => format!("{}:{}", host, port),
    })
}
