//! Error taxonomy for the interactive chat core.
//!
//! Every failure that reaches the loop is expressed as a [`ChatError`]. The
//! kind decides how it propagates (banner, swallowed, or fed back to the
//! model) and which hint the banner shows.

use std::fmt;

/// Maximum number of characters of a response body shown in the banner.
const BANNER_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    RateLimit,
    Network,
    Timeout,
    Upload,
    ToolExecution,
    UserDenied,
    Validation,
    NotFound,
    Persistence,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Auth => "authentication error",
            ErrorKind::RateLimit => "rate limited",
            ErrorKind::Network => "network error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Upload => "upload error",
            ErrorKind::ToolExecution => "tool error",
            ErrorKind::UserDenied => "denied",
            ErrorKind::Validation => "invalid input",
            ErrorKind::NotFound => "not found",
            ErrorKind::Persistence => "history error",
        }
    }

    /// Recovery hint shown when the error carries no response body.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            ErrorKind::Auth => Some("Your session may have expired; refresh session cookies and restart."),
            ErrorKind::RateLimit => Some("Usage limit reached; try later."),
            ErrorKind::Network => Some("Check connection and try again."),
            ErrorKind::Timeout => Some("The service took too long; try again."),
            ErrorKind::Upload => Some("Verify the file exists and is readable."),
            _ => None,
        }
    }
}

/// Structured metadata attached to remote failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    pub status: Option<u16>,
    pub code: Option<i64>,
    pub code_name: Option<String>,
    pub endpoint: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: ErrorDetails,
}

impl ChatError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: ErrorDetails::default(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn tool(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ToolExecution, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.details.status = Some(status);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.details.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        if !body.trim().is_empty() {
            self.details.body = Some(body);
        }
        self
    }

    pub fn with_code(mut self, code: i64, name: Option<String>) -> Self {
        self.details.code = Some(code);
        self.details.code_name = name;
        self
    }

    pub fn hint(&self) -> Option<&'static str> {
        if self.details.body.is_some() {
            return None;
        }
        self.kind.hint()
    }

    /// Lines rendered by the error banner, most important first.
    pub fn banner_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Error: {}", self.message)];

        let mut meta = Vec::new();
        if let Some(status) = self.details.status {
            meta.push(format!("HTTP {status}"));
        }
        match (&self.details.code_name, self.details.code) {
            (Some(name), Some(code)) => meta.push(format!("{name} ({code})")),
            (Some(name), None) => meta.push(name.clone()),
            (None, Some(code)) => meta.push(format!("code {code}")),
            (None, None) => {}
        }
        if let Some(endpoint) = &self.details.endpoint {
            meta.push(endpoint.clone());
        }
        if !meta.is_empty() {
            lines.push(meta.join(" · "));
        }

        if let Some(body) = &self.details.body {
            lines.push(format!("Response: {}", truncate_chars(body.trim(), BANNER_BODY_LIMIT)));
        }
        if let Some(hint) = self.hint() {
            lines.push(hint.to_string());
        }
        lines
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)?;
        if let Some(status) = self.details.status {
            write!(f, " (HTTP {status})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ChatError {}

pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push('…');
    out
}
