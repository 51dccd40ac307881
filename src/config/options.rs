//! Per-request probe options
//!
//! `ProbeOptions` is the fully resolved set of knobs a single probe runs
//! with. Callers start from `Config::probe_options` and apply the optional
//! `RequestOverrides` carried by an inbound request.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::constants::{redirects, timeouts};
use crate::core::error::{Result, UrlProbeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub connect_timeout: Duration,
    pub socket_timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirects: u8,
    pub validate_content_type: bool,
    /// Only consulted by batch validation
    pub parallel: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(timeouts::DEFAULT_CONNECT_TIMEOUT_MS),
            socket_timeout: Duration::from_millis(timeouts::DEFAULT_SOCKET_TIMEOUT_MS),
            follow_redirects: redirects::DEFAULT_FOLLOW,
            max_redirects: redirects::DEFAULT_MAX_REDIRECTS,
            validate_content_type: true,
            parallel: false,
        }
    }
}

/// Optional overrides supplied with a single or batch request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOverrides {
    pub connect_timeout_ms: Option<u64>,
    pub socket_timeout_ms: Option<u64>,
    pub follow_redirects: Option<bool>,
    pub max_redirects: Option<u8>,
    pub validate_content_type: Option<bool>,
    pub parallel: Option<bool>,
}

impl ProbeOptions {
    /// Apply request overrides on top of these options and check the result.
    pub fn with_overrides(&self, overrides: &RequestOverrides) -> Result<Self> {
        let mut options = self.clone();
        if let Some(ms) = overrides.connect_timeout_ms {
            options.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.socket_timeout_ms {
            options.socket_timeout = Duration::from_millis(ms);
        }
        if let Some(follow) = overrides.follow_redirects {
            options.follow_redirects = follow;
        }
        if let Some(max) = overrides.max_redirects {
            options.max_redirects = max;
        }
        if let Some(validate) = overrides.validate_content_type {
            options.validate_content_type = validate;
        }
        if let Some(parallel) = overrides.parallel {
            options.parallel = parallel;
        }
        options.validate()?;
        Ok(options)
    }

    /// Check timeouts and redirect limit against the accepted bounds.
    pub fn validate(&self) -> Result<()> {
        check_timeout("connect timeout", self.connect_timeout)?;
        check_timeout("socket timeout", self.socket_timeout)?;

        if self.max_redirects > redirects::MAX_REDIRECTS {
            return Err(UrlProbeError::InvalidArgument(format!(
                "max redirects of {} is out of range. Expected 0-{}.",
                self.max_redirects,
                redirects::MAX_REDIRECTS
            )));
        }
        Ok(())
    }
}

fn check_timeout(name: &str, timeout: Duration) -> Result<()> {
    let ms = timeout.as_millis();
    let bounds = u128::from(timeouts::MIN_TIMEOUT_MS)..=u128::from(timeouts::MAX_TIMEOUT_MS);
    if !bounds.contains(&ms) {
        return Err(UrlProbeError::InvalidArgument(format!(
            "{name} of {ms}ms is out of range. Expected {}-{}ms.",
            timeouts::MIN_TIMEOUT_MS,
            timeouts::MAX_TIMEOUT_MS
        )));
    }
    Ok(())
}
