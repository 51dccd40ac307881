use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::constants::error_messages;

/// Lifecycle of a single URL validation.
///
/// `Pending` and `InProgress` are transient; every result handed back to a
/// caller carries one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Pending,
    InProgress,
    Success,
    Error,
    Timeout,
    Skipped,
    Cancelled,
}

impl ValidationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Skipped => "SKIPPED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of probing one URL.
///
/// The same type is cached in memory and persisted as a row by the durable
/// store, which is the only place `expires_at` gets set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// The URL as supplied by the caller; also the cache key
    pub url: String,
    /// True only when status, content type and size all passed
    pub valid: bool,
    /// HTTP status of the final response, 0 when none was received
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Declared body size, -1 when unknown
    pub content_length_bytes: i64,
    pub response_time_ms: u64,
    pub redirect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub error: Option<String>,
    pub status: ValidationStatus,
    pub validated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ValidationResult {
    /// Create a fresh result for `url` in the `Pending` state.
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            valid: false,
            status_code: 0,
            content_type: None,
            content_length_bytes: -1,
            response_time_ms: 0,
            redirect: false,
            redirect_url: None,
            error: None,
            status: ValidationStatus::Pending,
            validated_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Move a pending result into `InProgress`.
    pub fn start(&mut self) {
        self.status = ValidationStatus::InProgress;
    }

    /// Terminate as a successful, valid probe.
    pub fn succeed(&mut self) {
        self.valid = true;
        self.error = None;
        self.status = ValidationStatus::Success;
        self.validated_at = Utc::now();
    }

    /// Terminate with a failure status and a human-readable reason.
    pub fn fail(&mut self, status: ValidationStatus, reason: impl Into<String>) {
        debug_assert!(status != ValidationStatus::Success && status.is_terminal());
        self.valid = false;
        self.error = Some(reason.into());
        self.status = status;
        self.validated_at = Utc::now();
    }

    /// Mark the result as a redirect to `target`.
    pub fn record_redirect(&mut self, target: impl Into<String>) {
        self.redirect = true;
        self.redirect_url = Some(target.into());
    }

    /// Result for a URL that was deliberately not probed.
    pub fn skipped(url: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::pending(url);
        result.fail(ValidationStatus::Skipped, reason);
        result
    }

    /// Result for a validation whose worker never reported back.
    pub fn cancelled(url: impl Into<String>) -> Self {
        let mut result = Self::pending(url);
        result.fail(ValidationStatus::Cancelled, error_messages::CANCELLED);
        result
    }

    pub fn is_ok(&self) -> bool {
        self.valid && self.status == ValidationStatus::Success
    }

    pub fn is_not_ok(&self) -> bool {
        !self.is_ok()
    }

    /// Whether the row has passed its persisted expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.error, self.status_code) {
            (None, code) => write!(f, "{} - {} - {}", self.status, code, &self.url),
            (Some(reason), 0) => write!(f, "{} - {} - {}", self.status, &self.url, reason),
            (Some(reason), code) => {
                write!(f, "{} - {} - {} - {}", self.status, code, &self.url, reason)
            }
        }
    }
}
