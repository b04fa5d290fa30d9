//! The request form: draft text, last response, last error.
//!
//! For the most recent submission at most one of `response` and `error` is
//! set. A new submission clears both before anything else happens.

use tracing::error;

use crate::api::{ApiError, CrewResponse};

pub const EMPTY_REQUEST: &str = "Please enter a request";
pub const LOGIN_REQUIRED: &str = "Please log in to use the calendar assistant";

/// A validated request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub token: String,
    pub user_request: String,
}

/// What the output section shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputView<'a> {
    Loading,
    Error(&'a str),
    Success(&'a str),
    Empty,
}

#[derive(Debug, Default)]
pub struct RequestForm {
    draft: String,
    cursor: usize, // character index into draft
    response: Option<CrewResponse>,
    error: Option<String>,
    in_flight: bool,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl RequestForm {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn response(&self) -> Option<&CrewResponse> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    // Editing. Every change to the draft clears a shown error.

    pub fn set_draft(&mut self, text: &str) {
        self.draft = text.to_string();
        self.cursor = self.draft.chars().count();
        self.edited();
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert(byte_pos, c);
        self.cursor += 1;
        self.edited();
    }

    pub fn insert_str(&mut self, text: &str) {
        // Terminals deliver pasted line breaks as \r
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert_str(byte_pos, &text);
        self.cursor += text.chars().count();
        self.edited();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
            self.edited();
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.draft.chars().count() {
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
            self.edited();
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.draft.chars().count();
    }

    fn edited(&mut self) {
        self.error = None;
    }

    // Submission

    /// Whether the submit control is enabled.
    pub fn can_submit(&self, identity_loading: bool) -> bool {
        !identity_loading && !self.in_flight && !self.draft.trim().is_empty()
    }

    /// Validate the draft and the token. Returns the request to send, or sets
    /// the error and returns `None`. Ignored while a request is in flight.
    pub fn begin_submit(&mut self, token: Option<&str>) -> Option<Submission> {
        if self.in_flight {
            return None;
        }

        let user_request = self.draft.trim();
        if user_request.is_empty() {
            self.error = Some(EMPTY_REQUEST.to_string());
            return None;
        }

        self.error = None;
        self.response = None;

        let token = match token.filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None => {
                self.error = Some(LOGIN_REQUIRED.to_string());
                return None;
            }
        };

        self.in_flight = true;
        Some(Submission {
            token,
            user_request: user_request.to_string(),
        })
    }

    pub fn finish(&mut self, result: Result<CrewResponse, ApiError>) {
        self.in_flight = false;
        match result {
            Ok(response) => {
                self.error = None;
                self.response = Some(response);
            }
            Err(err) => {
                error!("API call failed: {}", err);
                self.response = None;
                self.error = Some(err.user_message());
            }
        }
    }

    pub fn output(&self, identity_loading: bool) -> OutputView<'_> {
        if identity_loading || self.in_flight {
            OutputView::Loading
        } else if let Some(error) = &self.error {
            OutputView::Error(error)
        } else if let Some(response) = &self.response {
            OutputView::Success(response.display_text())
        } else {
            OutputView::Empty
        }
    }
}
