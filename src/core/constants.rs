//! Application-wide constants to avoid magic values throughout the codebase.
//!
//! Probe bounds, cache defaults and the content-type allow-list all live here
//! so `Config` and `ContentPolicy` can be built from one place.

/// Output format constants
pub mod output_formats {
    /// Text output format - one line per URL
    pub const TEXT: &str = "text";
    /// JSON output format - structured output for automation
    pub const JSON: &str = "json";

    /// Default output format
    pub const DEFAULT: &str = TEXT;

    /// All valid output formats
    pub const ALL: [&str; 2] = [TEXT, JSON];
}

/// HTTP status code constants
pub mod http_status {
    /// HTTP 200 OK - the only status accepted by the classifier
    pub const OK: u16 = 200;
    /// HTTP 405 Method Not Allowed - HEAD rejected, retry with GET
    pub const METHOD_NOT_ALLOWED: u16 = 405;
    /// HTTP 501 Not Implemented - HEAD rejected, retry with GET
    pub const NOT_IMPLEMENTED: u16 = 501;
}

/// Timeout bounds for outbound probes, in milliseconds
pub mod timeouts {
    /// Default connect timeout
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
    /// Default socket (read) timeout
    pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 10_000;
    /// Smallest accepted connect/socket timeout
    pub const MIN_TIMEOUT_MS: u64 = 1_000;
    /// Largest accepted connect/socket timeout
    pub const MAX_TIMEOUT_MS: u64 = 30_000;
}

/// Redirect handling defaults
pub mod redirects {
    /// Follow redirects unless told otherwise
    pub const DEFAULT_FOLLOW: bool = true;
    /// Default hop limit handed to the HTTP client
    pub const DEFAULT_MAX_REDIRECTS: u8 = 5;
    /// Largest accepted hop limit
    pub const MAX_REDIRECTS: u8 = 10;
}

/// Default configuration values
pub mod defaults {
    /// Maximum number of URLs accepted in one batch
    pub const MAX_BATCH_SIZE: usize = 100;
    /// Content length ceiling (5 MiB)
    pub const MAX_CONTENT_LENGTH_BYTES: i64 = 5 * 1024 * 1024;
    /// Cache entry time-to-live
    pub const CACHE_TTL_MINUTES: u64 = 60;
    /// Partition used by the durable cache when none is configured
    pub const PARTITION: &str = "default";
    /// Config file looked up in the working directory and its parents
    pub const CONFIG_FILE_NAME: &str = ".urlprobe.toml";
    /// Number of duplicated URLs listed by a repair analysis
    pub const TOP_DUPLICATES: usize = 10;
}

/// User agent sent with every probe
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Content types treated as pages rather than downloadable assets
pub const PAGE_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// Content types accepted by the classifier
pub const ALLOWED_CONTENT_TYPES: [&str; 41] = [
    // documents
    "text/html",
    "application/xhtml+xml",
    "text/plain",
    "text/csv",
    "application/pdf",
    "application/rtf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.oasis.opendocument.text",
    "application/vnd.oasis.opendocument.spreadsheet",
    // images
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/svg+xml",
    "image/webp",
    "image/tiff",
    "image/bmp",
    // datasets
    "application/json",
    "application/ld+json",
    "application/xml",
    "text/xml",
    "application/x-hdf",
    "application/x-hdf5",
    "application/x-netcdf",
    "application/netcdf",
    "application/fits",
    "image/fits",
    "application/vnd.ms-excel",
    "text/tab-separated-values",
    // archives
    "application/zip",
    "application/gzip",
    "application/x-gzip",
    "application/x-tar",
    "application/x-7z-compressed",
    "application/x-bzip2",
    "application/x-xz",
    "application/vnd.rar",
    "application/x-rar-compressed",
    // generic binary
    "application/octet-stream",
];

/// Error message constants
pub mod error_messages {
    /// Reason recorded when the syntax check fails
    pub const INVALID_SYNTAX: &str = "invalid syntax";
    /// Reason recorded for URLs matching an exclusion pattern
    pub const EXCLUDED: &str = "excluded by pattern";
    /// Reason recorded when a pending validation never completed
    pub const CANCELLED: &str = "validation cancelled";
    /// Unknown error fallback
    pub const UNKNOWN_ERROR: &str = "Unknown error";
}
