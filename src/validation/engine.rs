//! Single-URL validation lifecycle.
//!
//! `ValidationEngine::validate` always returns a `ValidationResult`. Syntax
//! failures, transport errors and classifier rejections are all reported as
//! terminal states on the result, and every outcome is written to the cache
//! under the caller's original URL before it is returned.

use log::{debug, warn};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::CacheStore;
use crate::config::{Config, ProbeOptions};
use crate::core::constants::{USER_AGENT, error_messages, http_status};
use crate::core::error::Result;
use crate::core::types::{ValidationResult, ValidationStatus};
use crate::reporting::logging;
use crate::validation::classifier::ContentPolicy;
use crate::validation::syntax::has_valid_syntax;

pub struct ValidationEngine {
    policy: ContentPolicy,
    cache: Arc<dyn CacheStore>,
    cache_ttl: Duration,
    user_agent: String,
    resolve: Vec<(String, SocketAddr)>,
}

impl ValidationEngine {
    pub fn new(policy: ContentPolicy, cache: Arc<dyn CacheStore>, cache_ttl: Duration) -> Self {
        Self {
            policy,
            cache,
            cache_ttl,
            user_agent: USER_AGENT.to_string(),
            resolve: Vec::new(),
        }
    }

    pub fn from_config(config: &Config, cache: Arc<dyn CacheStore>) -> Result<Self> {
        let mut engine = Self::new(config.content_policy(), cache, config.cache_ttl());
        if let Some(ref user_agent) = config.user_agent {
            engine = engine.with_user_agent(user_agent.clone());
        }
        for (host, addr) in config.resolve_overrides()? {
            engine = engine.with_resolve(host, addr);
        }
        Ok(engine)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Pin `host` to `addr` instead of resolving it through DNS.
    pub fn with_resolve(mut self, host: impl Into<String>, addr: SocketAddr) -> Self {
        self.resolve.push((host.into(), addr));
        self
    }

    pub fn policy(&self) -> &ContentPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// HTTP client carrying the timeouts and redirect policy of `options`
    pub fn build_client(&self, options: &ProbeOptions) -> Result<Client> {
        let mut builder = Client::builder()
            .connect_timeout(options.connect_timeout)
            .read_timeout(options.socket_timeout)
            .redirect(redirect_policy(options))
            .user_agent(self.user_agent.as_str());

        for (host, addr) in &self.resolve {
            builder = builder.resolve(host, *addr);
        }

        Ok(builder.build()?)
    }

    /// Validate one URL with a client built for `options`.
    pub async fn validate(&self, url: &str, options: &ProbeOptions) -> ValidationResult {
        match self.build_client(options) {
            Ok(client) => self.validate_with_client(&client, url, options).await,
            Err(err) => {
                let mut result = ValidationResult::pending(url);
                result.fail(ValidationStatus::Error, err.to_string());
                self.store(&result);
                result
            }
        }
    }

    /// Validate one URL reusing an existing client (see `build_client`).
    pub async fn validate_with_client(
        &self,
        client: &Client,
        url: &str,
        options: &ProbeOptions,
    ) -> ValidationResult {
        let mut result = ValidationResult::pending(url);

        if !has_valid_syntax(url) {
            result.fail(ValidationStatus::Error, error_messages::INVALID_SYNTAX);
            logging::log_probe_result(&result);
            self.store(&result);
            return result;
        }

        result.start();
        let target = url.trim();
        let started = Instant::now();
        let response = send_probe(client, target).await;
        result.response_time_ms = started.elapsed().as_millis() as u64;

        match response {
            Ok(response) => self.inspect_response(&mut result, target, &response, options),
            Err(err) => {
                let status = if is_timeout(&err) {
                    ValidationStatus::Timeout
                } else {
                    ValidationStatus::Error
                };
                result.fail(status, describe_error(&err));
            }
        }

        logging::log_probe_result(&result);
        self.store(&result);
        result
    }

    fn inspect_response(
        &self,
        result: &mut ValidationResult,
        target: &str,
        response: &Response,
        options: &ProbeOptions,
    ) {
        let headers = response.headers();
        result.status_code = response.status().as_u16();
        result.content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        result.content_length_bytes = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|length| *length >= 0)
            .unwrap_or(-1);

        if response.status().is_redirection() {
            let location = headers
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(|location| resolve_location(response.url(), location));
            if let Some(location) = location {
                result.fail(
                    ValidationStatus::Error,
                    format!("redirect not followed: {location}"),
                );
                result.record_redirect(location);
                return;
            }
        } else if Url::parse(target).is_ok_and(|requested| &requested != response.url()) {
            result.record_redirect(response.url().as_str());
        }

        match self.policy.classify(
            result.status_code,
            result.content_type.as_deref(),
            result.content_length_bytes,
            options.validate_content_type,
        ) {
            Ok(()) => result.succeed(),
            Err(rejection) => result.fail(ValidationStatus::Error, rejection.to_string()),
        }
    }

    fn store(&self, result: &ValidationResult) {
        if let Err(err) = self.cache.put(&result.url, result, self.cache_ttl) {
            warn!("Cache write for {} failed: {err}", result.url);
        }
    }
}

/// HEAD first; servers that reject HEAD get a GET instead.
async fn send_probe(client: &Client, url: &str) -> reqwest::Result<Response> {
    let response = client.head(url).send().await?;
    match response.status().as_u16() {
        http_status::METHOD_NOT_ALLOWED | http_status::NOT_IMPLEMENTED => {
            debug!("HEAD rejected by {url}, retrying with GET");
            client.get(url).send().await
        }
        _ => Ok(response),
    }
}

// Stop (rather than fail) once the hop limit is reached so the last 3xx
// response is still inspected
fn redirect_policy(options: &ProbeOptions) -> Policy {
    if !options.follow_redirects {
        return Policy::none();
    }
    let max = usize::from(options.max_redirects);
    Policy::custom(move |attempt| {
        if attempt.previous().len() > max {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

fn resolve_location(base: &Url, location: &str) -> String {
    base.join(location)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| location.to_string())
}

// Read timeouts can surface as an io::Error buried in the hyper error chain
fn is_timeout(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return true;
    }
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if inner
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
        {
            return true;
        }
        source = inner.source();
    }
    false
}

/// Innermost source message, which carries the I/O cause
fn describe_error(err: &reqwest::Error) -> String {
    let mut innermost: &dyn std::error::Error = err;
    while let Some(inner) = innermost.source() {
        innermost = inner;
    }
    innermost.to_string()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::cache::MemoryCache;
    use mockito::Server;

    const HOST: &str = "assets.test";
    const HOUR: Duration = Duration::from_secs(3600);

    fn engine_for(server: &Server, cache: Arc<dyn CacheStore>) -> ValidationEngine {
        let addr: SocketAddr = server.host_with_port().parse().unwrap();
        ValidationEngine::new(ContentPolicy::default(), cache, HOUR).with_resolve(HOST, addr)
    }

    fn url_for(server: &Server, path: &str) -> String {
        let port = server.host_with_port().rsplit(':').next().unwrap().to_string();
        format!("http://{HOST}:{port}{path}")
    }

    #[tokio::test]
    async fn test_validate__invalid_syntax_makes_no_request() {
        let mut server = Server::new_async().await;
        let m = server.mock("HEAD", mockito::Matcher::Any).expect(0).create_async().await;
        let cache = Arc::new(MemoryCache::new());
        let engine = engine_for(&server, cache.clone());

        let result = engine.validate("not a url", &ProbeOptions::default()).await;

        assert_eq!(result.status, ValidationStatus::Error);
        assert_eq!(result.error.as_deref(), Some("invalid syntax"));
        assert_eq!(result.status_code, 0);
        assert!(cache.lookup("not a url").unwrap().is_some());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_validate__pdf_is_valid_and_cached() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("HEAD", "/paper.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .expect(1)
            .create_async()
            .await;
        let cache = Arc::new(MemoryCache::new());
        let engine = engine_for(&server, cache.clone());
        let url = url_for(&server, "/paper.pdf");

        let result = engine.validate(&url, &ProbeOptions::default()).await;

        assert!(result.is_ok(), "{result:?}");
        assert_eq!(result.status_code, 200);
        assert_eq!(result.content_type.as_deref(), Some("application/pdf"));
        assert!(!result.redirect);
        assert_eq!(cache.lookup(&url).unwrap(), Some(result));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_validate__falls_back_to_get_when_head_rejected() {
        let mut server = Server::new_async().await;
        let head = server
            .mock("HEAD", "/data.json")
            .with_status(405)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/data.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;
        let engine = engine_for(&server, Arc::new(MemoryCache::new()));

        let result = engine
            .validate(&url_for(&server, "/data.json"), &ProbeOptions::default())
            .await;

        assert!(result.is_ok(), "{result:?}");
        head.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_validate__404_reports_response_code() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("HEAD", "/missing")
            .with_status(404)
            .with_header("content-type", "text/html")
            .create_async()
            .await;
        let engine = engine_for(&server, Arc::new(MemoryCache::new()));

        let result = engine
            .validate(&url_for(&server, "/missing"), &ProbeOptions::default())
            .await;

        assert_eq!(result.status, ValidationStatus::Error);
        assert_eq!(result.status_code, 404);
        assert_eq!(result.error.as_deref(), Some("invalid response code: 404"));
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_validate__disallowed_content_type() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("HEAD", "/style.css")
            .with_status(200)
            .with_header("content-type", "text/css")
            .create_async()
            .await;
        let engine = engine_for(&server, Arc::new(MemoryCache::new()));
        let url = url_for(&server, "/style.css");

        let result = engine.validate(&url, &ProbeOptions::default()).await;
        assert_eq!(result.error.as_deref(), Some("invalid content type: text/css"));

        let lenient = ProbeOptions {
            validate_content_type: false,
            ..Default::default()
        };
        assert!(engine.validate(&url, &lenient).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate__redirect_not_followed() {
        let mut server = Server::new_async().await;
        let target = url_for(&server, "/new.pdf");
        let _m = server
            .mock("HEAD", "/old.pdf")
            .with_status(301)
            .with_header("location", &target)
            .create_async()
            .await;
        let engine = engine_for(&server, Arc::new(MemoryCache::new()));
        let options = ProbeOptions {
            follow_redirects: false,
            ..Default::default()
        };

        let result = engine.validate(&url_for(&server, "/old.pdf"), &options).await;

        assert!(result.redirect);
        assert_eq!(result.redirect_url.as_deref(), Some(target.as_str()));
        assert_eq!(result.status_code, 301);
        assert_eq!(result.status, ValidationStatus::Error);
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_validate__redirect_followed_to_asset() {
        let mut server = Server::new_async().await;
        let target = url_for(&server, "/new.pdf");
        let _old = server
            .mock("HEAD", "/old.pdf")
            .with_status(302)
            .with_header("location", "/new.pdf")
            .create_async()
            .await;
        let _new = server
            .mock("HEAD", "/new.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .create_async()
            .await;
        let cache = Arc::new(MemoryCache::new());
        let engine = engine_for(&server, cache.clone());
        let original = url_for(&server, "/old.pdf");

        let result = engine.validate(&original, &ProbeOptions::default()).await;

        assert!(result.is_ok(), "{result:?}");
        assert!(result.redirect);
        assert_eq!(result.redirect_url.as_deref(), Some(target.as_str()));
        // Cached under the URL the caller asked for
        assert_eq!(result.url, original);
        assert!(cache.lookup(&original).unwrap().is_some());
        assert!(cache.lookup(&target).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validate__hop_limit_returns_last_redirect() {
        let mut server = Server::new_async().await;
        let _a = server
            .mock("HEAD", "/a")
            .with_status(302)
            .with_header("location", "/b")
            .create_async()
            .await;
        let _b = server
            .mock("HEAD", "/b")
            .with_status(302)
            .with_header("location", "/c")
            .create_async()
            .await;
        let engine = engine_for(&server, Arc::new(MemoryCache::new()));
        let options = ProbeOptions {
            max_redirects: 1,
            ..Default::default()
        };

        let result = engine.validate(&url_for(&server, "/a"), &options).await;

        assert_eq!(result.status_code, 302);
        assert!(result.redirect);
        assert_eq!(result.redirect_url, Some(url_for(&server, "/c")));
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_validate__connection_refused_is_error() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let engine = ValidationEngine::new(
            ContentPolicy::default(),
            Arc::new(MemoryCache::new()),
            HOUR,
        )
        .with_resolve(HOST, addr);

        let result = engine
            .validate(
                &format!("http://{HOST}:{}/file.pdf", addr.port()),
                &ProbeOptions::default(),
            )
            .await;

        assert_eq!(result.status, ValidationStatus::Error);
        assert_eq!(result.status_code, 0);
        let error = result.error.unwrap_or_default();
        assert!(
            error.to_lowercase().contains("refused"),
            "expected the I/O cause, got {error:?}"
        );
    }

    #[tokio::test]
    async fn test_validate__silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let engine = ValidationEngine::new(
            ContentPolicy::default(),
            Arc::new(MemoryCache::new()),
            HOUR,
        )
        .with_resolve(HOST, addr);
        let options = ProbeOptions {
            socket_timeout: Duration::from_millis(1000),
            ..Default::default()
        };

        let result = engine
            .validate(&format!("http://{HOST}:{}/slow", addr.port()), &options)
            .await;

        assert_eq!(result.status, ValidationStatus::Timeout);
        assert!(result.error.is_some());
        assert!(result.response_time_ms >= 1000);
    }
}
