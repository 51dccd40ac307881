//! Decides whether a probed response counts as a valid asset.

use rustc_hash::FxHashSet;
use std::fmt;

use crate::core::constants::{
    ALLOWED_CONTENT_TYPES, PAGE_CONTENT_TYPES, defaults, http_status,
};

/// Why a response failed classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    ResponseCode(u16),
    ContentType(Option<String>),
    TooLarge(i64),
}

impl Rejection {
    /// Short machine-friendly label used in batch summaries
    pub fn kind(&self) -> String {
        match self {
            Self::ResponseCode(code) => format!("http_{code}"),
            Self::ContentType(_) => "content_type".to_string(),
            Self::TooLarge(_) => "too_large".to_string(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResponseCode(code) => write!(f, "invalid response code: {code}"),
            Self::ContentType(Some(content_type)) => {
                write!(f, "invalid content type: {content_type}")
            }
            Self::ContentType(None) => write!(f, "invalid content type: none"),
            Self::TooLarge(bytes) => write!(f, "content too large: {bytes} bytes"),
        }
    }
}

/// Allow-list and size ceiling applied to every probe response.
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    allowed: FxHashSet<String>,
    max_content_length: i64,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::with_max_content_length(defaults::MAX_CONTENT_LENGTH_BYTES)
    }
}

impl ContentPolicy {
    pub fn new<'a, I>(allowed: I, max_content_length: i64) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let allowed = allowed
            .into_iter()
            .map(normalize_content_type)
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            allowed,
            max_content_length,
        }
    }

    /// Built-in allow-list with a custom size ceiling
    pub fn with_max_content_length(max_content_length: i64) -> Self {
        Self::new(ALLOWED_CONTENT_TYPES, max_content_length)
    }

    pub fn max_content_length(&self) -> i64 {
        self.max_content_length
    }

    pub fn allows(&self, content_type: &str) -> bool {
        self.allowed.contains(&normalize_content_type(content_type))
    }

    /// Allowed types other than HTML pages count as assets.
    pub fn is_asset_type(&self, content_type: &str) -> bool {
        let normalized = normalize_content_type(content_type);
        self.allowed.contains(&normalized) && !PAGE_CONTENT_TYPES.contains(&normalized.as_str())
    }

    /// Apply the rules in order; the first failing rule decides.
    ///
    /// A negative `content_length` means unknown and passes the size rule.
    pub fn classify(
        &self,
        status_code: u16,
        content_type: Option<&str>,
        content_length: i64,
        check_content_type: bool,
    ) -> Result<(), Rejection> {
        if status_code != http_status::OK {
            return Err(Rejection::ResponseCode(status_code));
        }

        if check_content_type {
            match content_type {
                Some(content_type) if self.allows(content_type) => {}
                Some(content_type) => {
                    return Err(Rejection::ContentType(Some(normalize_content_type(
                        content_type,
                    ))));
                }
                None => return Err(Rejection::ContentType(None)),
            }
        }

        if content_length > self.max_content_length {
            return Err(Rejection::TooLarge(content_length));
        }

        Ok(())
    }
}

/// Strip parameters (`; charset=...`) and lower-case
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn test_classify__pdf_within_limit_is_valid() {
        let policy = ContentPolicy::default();
        assert_eq!(
            policy.classify(200, Some("application/pdf"), 1000, true),
            Ok(())
        );
    }

    #[test]
    fn test_classify__content_type_parameters_and_case_ignored() {
        let policy = ContentPolicy::default();
        assert!(
            policy
                .classify(200, Some("Text/HTML; charset=UTF-8"), -1, true)
                .is_ok()
        );
        assert!(policy.classify(200, Some("application/x-hdf"), 1, true).is_ok());
        assert!(policy.classify(200, Some("application/fits"), 1, true).is_ok());
    }

    #[test]
    fn test_classify__content_type_not_allowed() {
        let policy = ContentPolicy::default();
        let rejection = policy
            .classify(200, Some("text/css"), 1000, true)
            .unwrap_err();
        assert_eq!(rejection, Rejection::ContentType(Some("text/css".to_string())));
        assert_eq!(rejection.to_string(), "invalid content type: text/css");
        assert_eq!(rejection.kind(), "content_type");
    }

    #[test]
    fn test_classify__missing_content_type_fails() {
        let policy = ContentPolicy::default();
        let rejection = policy.classify(200, None, 10, true).unwrap_err();
        assert_eq!(rejection.to_string(), "invalid content type: none");
    }

    #[test]
    fn test_classify__content_type_check_can_be_disabled() {
        let policy = ContentPolicy::default();
        assert!(policy.classify(200, Some("text/css"), 10, false).is_ok());
        assert!(policy.classify(200, None, 10, false).is_ok());
    }

    #[test]
    fn test_classify__non_200_fails_first() {
        let policy = ContentPolicy::default();
        let rejection = policy.classify(404, Some("text/css"), -1, true).unwrap_err();
        assert_eq!(rejection.to_string(), "invalid response code: 404");
        assert_eq!(rejection.kind(), "http_404");

        // A 3xx never counts as a terminal success
        assert!(policy.classify(301, Some("text/html"), -1, true).is_err());
    }

    #[test]
    fn test_classify__size_ceiling() {
        let policy = ContentPolicy::default();
        let ceiling = 5 * 1024 * 1024;
        assert!(policy.classify(200, Some("application/zip"), ceiling, true).is_ok());

        let rejection = policy
            .classify(200, Some("application/zip"), ceiling + 1, true)
            .unwrap_err();
        assert_eq!(
            rejection.to_string(),
            format!("content too large: {} bytes", ceiling + 1)
        );
        assert_eq!(rejection.kind(), "too_large");
    }

    #[test]
    fn test_classify__unknown_length_passes() {
        let policy = ContentPolicy::with_max_content_length(1);
        assert!(policy.classify(200, Some("image/png"), -1, true).is_ok());
    }

    #[test]
    fn test_is_asset_type() {
        let policy = ContentPolicy::default();
        assert!(policy.is_asset_type("application/pdf"));
        assert!(policy.is_asset_type("image/png; q=1"));
        assert!(!policy.is_asset_type("text/html"));
        assert!(!policy.is_asset_type("text/css"));
    }

    #[test]
    fn test_normalize_content_type() {
        assert_eq!(normalize_content_type(" Image/PNG ;x=y"), "image/png");
        assert_eq!(normalize_content_type(""), "");
    }
}
