use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagsErrorKind {
    InvalidConfig,
    InvalidTarget,
    Network,
    Timeout,
    Cancelled,
    Decode,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagsError {
    pub kind: TagsErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub retryable: bool,
}

impl TagsError {
    pub fn new(kind: TagsErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
            retryable: matches!(kind, TagsErrorKind::Network | TagsErrorKind::Timeout),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(TagsErrorKind::InvalidConfig, "INVALID_CONFIG", message)
    }

    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::new(TagsErrorKind::InvalidTarget, "INVALID_TARGET", message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TagsErrorKind::Network, "NETWORK", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TagsErrorKind::Timeout, "TIMEOUT", message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(TagsErrorKind::Cancelled, "CANCELLED", message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TagsErrorKind::Decode, "DECODE", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(TagsErrorKind::Internal, "INTERNAL", message)
    }

    /// Superseded requests end this way; callers swallow them.
    pub fn is_cancelled(&self) -> bool {
        self.kind == TagsErrorKind::Cancelled
    }
}

impl fmt::Display for TagsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TagsError {}

impl From<std::io::Error> for TagsError {
    fn from(err: std::io::Error) -> Self {
        TagsError::internal(err.to_string())
    }
}

impl From<serde_json::Error> for TagsError {
    fn from(err: serde_json::Error) -> Self {
        TagsError::decode(err.to_string())
    }
}

impl From<reqwest::Error> for TagsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return TagsError::timeout("HTTP request timed out");
        }
        if err.is_decode() {
            return TagsError::decode(format!("Invalid server response: {}", err));
        }
        TagsError::network(err.to_string())
    }
}
