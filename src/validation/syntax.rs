//! Cheap, network-free URL well-formedness check.

use once_cell::sync::Lazy;
use regex::Regex;

// scheme, dot-separated labels with a 2-6 letter TLD, optional port, then an
// optional path/query/fragment from the URL-safe character set
const URL_PATTERN: &str = r"^(?i:https?)://([a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?\.)+[a-zA-Z]{2,6}(:[0-9]{1,5})?([/?#][A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=%]*)?$";

static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(URL_PATTERN).expect("URL pattern is a valid regex"));

/// Returns true when `url` is a syntactically valid http(s) URL.
///
/// Surrounding whitespace is ignored; empty input is always invalid.
pub fn has_valid_syntax(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && URL_REGEX.is_match(url)
}
