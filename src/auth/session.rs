//! Derived session state read by the view.
//!
//! The session only ever holds an in-memory user. Nothing is persisted and
//! tokens are never refreshed; an expired user simply stops counting as
//! authenticated.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use std::time::{Duration, SystemTime};

/// Claims read from the ID token payload. The signature is not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Profile {
    pub fn from_id_token(id_token: &str) -> Option<Self> {
        let payload = id_token.split('.').nth(1)?;
        // Some providers pad their segments
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub access_token: String,
    pub token_type: String,
    pub id_token: Option<String>,
    pub expires_at: Option<SystemTime>,
    pub profile: Profile,
}

impl User {
    pub fn new(access_token: String, id_token: Option<String>, expires_in: Option<u64>) -> Self {
        let profile = id_token
            .as_deref()
            .and_then(Profile::from_id_token)
            .unwrap_or_default();

        Self {
            access_token,
            token_type: "Bearer".to_string(),
            id_token,
            // An expiry past what SystemTime can hold is treated as none
            expires_at: expires_in
                .and_then(|secs| SystemTime::now().checked_add(Duration::from_secs(secs))),
            profile,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.profile
            .name
            .as_deref()
            .or(self.profile.email.as_deref())
            .or(self.profile.sub.as_deref())
    }
}

#[derive(Debug, Default)]
pub struct Session {
    user: Option<User>,
    loading: bool,
    error: Option<String>,
    redirect_url: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.as_ref().is_some_and(|user| !user.is_expired())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(|user| user.access_token.as_str())
            .filter(|token| !token.is_empty())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Authorization URL of the sign-in in progress, if any.
    pub fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }

    pub fn begin_signin(&mut self) {
        self.loading = true;
        self.error = None;
        self.redirect_url = None;
    }

    pub fn set_redirect_url(&mut self, url: String) {
        self.redirect_url = Some(url);
    }

    pub fn signed_in(&mut self, user: User) {
        self.user = Some(user);
        self.loading = false;
        self.error = None;
        self.redirect_url = None;
    }

    pub fn signin_failed(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
        self.redirect_url = None;
    }

    pub fn sign_out(&mut self) {
        self.user = None;
        self.loading = false;
        self.redirect_url = None;
    }
}
