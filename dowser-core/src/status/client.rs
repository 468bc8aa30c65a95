use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, instrument};

use super::redirect::{FetchError, NativeRedirects, RedirectFollower, MAX_REDIRECTS};
use super::types::{LinkStatus, TransportError, TransportKind};
use crate::cache::StatusCache;
use crate::error::Result;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Browser-like User-Agent sent with every probe. Some hosts answer
/// bare library agents with 403s they would never show a reader.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0";

/// Probes URLs over HTTP and memoizes one [`LinkStatus`] per URL.
///
/// Certificate verification is disabled on purpose: a link to a page
/// behind an expired certificate still resolves for a reader, and the
/// check reports reachability, not TLS hygiene.
#[derive(Debug, Clone)]
pub struct StatusResolver {
    client: reqwest::Client,
    follower: Arc<dyn RedirectFollower>,
    cache: Arc<StatusCache>,
}

/// Builder for [`StatusResolver`]. `build` is fallible because the HTTP
/// client is constructed here.
#[derive(Debug)]
pub struct ResolverBuilder {
    timeout: Duration,
    user_agent: String,
    follower: Arc<dyn RedirectFollower>,
    cache: Option<Arc<StatusCache>>,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follower: Arc::new(NativeRedirects),
            cache: None,
        }
    }
}

impl ResolverBuilder {
    /// Per-request timeout covering connect, redirects, and body read.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Redirect-following strategy; defaults to [`NativeRedirects`].
    pub fn with_follower(mut self, follower: Arc<dyn RedirectFollower>) -> Self {
        self.follower = follower;
        self
    }

    /// Share a cache between resolvers instead of creating a fresh one.
    pub fn with_cache(mut self, cache: Arc<StatusCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<StatusResolver> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(self.follower.client_policy())
            .user_agent(&self.user_agent)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(StatusResolver {
            client,
            follower: self.follower,
            cache: self.cache.unwrap_or_default(),
        })
    }
}

impl StatusResolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Resolver with default settings: native redirects, 10s timeout,
    /// fresh cache.
    pub fn new() -> Result<Self> {
        ResolverBuilder::default().build()
    }

    /// The cache backing this resolver.
    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    /// Probe `url`, or return its memoized status without touching the
    /// network. Failures are data: every call yields a `LinkStatus`.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn resolve(&self, url: &str) -> LinkStatus {
        if let Some(cached) = self.cache.get(url) {
            debug!("cache hit");
            return cached;
        }

        let started = Instant::now();
        let status = match self.follower.fetch(&self.client, url).await {
            Ok(fetched) => {
                let title = extract_title(&fetched.body);
                LinkStatus::http(url, fetched.final_url, fetched.code, title)
            }
            Err(FetchError::TooManyRedirects) => {
                LinkStatus::failed(url, TransportError::too_many_redirects(MAX_REDIRECTS))
            }
            Err(FetchError::Transport(err)) => LinkStatus::failed(url, classify_transport(&err)),
        };

        debug!(
            code = status.http_code(),
            good = status.good(),
            duration_ms = started.elapsed().as_millis() as u64,
            "probe finished"
        );

        // First writer wins; hand back whatever the cache holds so every
        // caller sees one canonical record per URL.
        self.cache.insert(url, status)
    }
}

/// First `<title>` of the document, entity-decoded and trimmed. The
/// pattern spans newlines; anything past the body cap was never read.
fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Flatten an error chain into one message, outermost cause first.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn classify_transport(err: &reqwest::Error) -> TransportError {
    let message = error_chain(err);
    let kind = transport_kind(err.is_timeout(), err.is_connect(), &message);
    TransportError::new(kind, message)
}

/// Map client error flags plus the flattened message onto a transport
/// kind. DNS is checked first: a resolution failure also reports as a
/// connect error, and TLS failures surface inside connect errors too.
fn transport_kind(is_timeout: bool, is_connect: bool, message: &str) -> TransportKind {
    let lower = message.to_lowercase();
    if lower.contains("dns")
        || lower.contains("failed to lookup")
        || lower.contains("name or service not known")
    {
        TransportKind::ServerNotFound
    } else if is_timeout || lower.contains("timed out") {
        TransportKind::Timeout
    } else if lower.contains("certificate") || lower.contains("tls") || lower.contains("ssl") {
        TransportKind::Tls
    } else if is_connect || lower.contains("connection refused") || lower.contains("connection reset")
    {
        TransportKind::Connection
    } else {
        TransportKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::redirect::ManualRedirects;

    fn resolver() -> StatusResolver {
        StatusResolver::new().unwrap()
    }

    #[test]
    fn test_extract_title_basic() {
        let html = "<html><head><title>My Blog</title></head></html>";
        assert_eq!(extract_title(html), Some("My Blog".to_string()));
    }

    #[test]
    fn test_extract_title_spans_newlines_and_attrs() {
        let html = "<TITLE lang=\"en\">\n  Two\nLines\n</TITLE>";
        assert_eq!(extract_title(html), Some("Two\nLines".to_string()));
    }

    #[test]
    fn test_extract_title_decodes_entities() {
        let html = "<title>Fish &amp; Chips &#8212; a review</title>";
        assert_eq!(extract_title(html), Some("Fish & Chips \u{2014} a review".to_string()));
    }

    #[test]
    fn test_extract_title_first_occurrence_wins() {
        let html = "<title>First</title><title>Second</title>";
        assert_eq!(extract_title(html), Some("First".to_string()));
    }

    #[test]
    fn test_extract_title_absent_or_empty() {
        assert_eq!(extract_title("<html><body>plain</body></html>"), None);
        assert_eq!(extract_title("<title>   </title>"), None);
        assert_eq!(extract_title(""), None);
    }

    #[test]
    fn test_transport_kind_classification() {
        use TransportKind::*;

        let at = |timeout, connect, msg: &str| transport_kind(timeout, connect, msg);

        assert_eq!(at(false, true, "error trying to connect: dns error: failed to lookup address information"), ServerNotFound);
        assert_eq!(at(false, false, "Name or service not known"), ServerNotFound);
        assert_eq!(at(true, false, "operation timed out"), Timeout);
        assert_eq!(at(false, true, "error trying to connect: invalid peer certificate"), Tls);
        assert_eq!(at(false, true, "tcp connect error: Connection refused (os error 111)"), Connection);
        assert_eq!(at(false, false, "request body stream erred"), Other);
    }

    #[tokio::test]
    async fn test_resolve_ok_with_title() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/post")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><head><title>A Post</title></head></html>")
            .create_async()
            .await;

        let url = format!("{}/post", server.url());
        let status = resolver().resolve(&url).await;

        assert!(status.good());
        assert_eq!(status.http_code(), 200);
        assert_eq!(status.title.as_deref(), Some("A Post"));
        assert_eq!(status.actual_url, url);
        assert!(!status.redirected());
        assert_eq!(status.describe(), "OK (A Post)");
    }

    #[tokio::test]
    async fn test_resolve_sends_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/ua")
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .with_status(200)
            .create_async()
            .await;

        let url = format!("{}/ua", server.url());
        let status = resolver().resolve(&url).await;

        assert!(status.good());
        page.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_keeps_title_on_error_pages() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/gone")
            .with_status(404)
            .with_body("<title>Oops</title>")
            .create_async()
            .await;

        let url = format!("{}/gone", server.url());
        let status = resolver().resolve(&url).await;

        assert!(!status.good());
        assert_eq!(status.http_code(), 404);
        assert_eq!(status.title.as_deref(), Some("Oops"));
        assert_eq!(status.describe(), "No page under this URL.");
    }

    #[tokio::test]
    async fn test_resolve_probes_each_url_once() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/cached")
            .with_status(200)
            .with_body("<title>Cached</title>")
            .expect(1)
            .create_async()
            .await;

        let resolver = resolver();
        let url = format!("{}/cached", server.url());
        let first = resolver.resolve(&url).await;
        let second = resolver.resolve(&url).await;

        assert_eq!(first, second);
        page.assert_async().await;

        let stats = resolver.cache().stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_resolve_reports_redirect_in_description() {
        let mut server = mockito::Server::new_async().await;
        let _hop = server
            .mock("GET", "/moved")
            .with_status(301)
            .with_header("location", "/here")
            .create_async()
            .await;
        let _target = server
            .mock("GET", "/here")
            .with_status(200)
            .with_body("<title>Landed</title>")
            .create_async()
            .await;

        let url = format!("{}/moved", server.url());
        let status = resolver().resolve(&url).await;

        assert!(status.good());
        assert!(status.redirected());
        assert_eq!(status.http_code(), 200);
        assert_eq!(
            status.describe(),
            format!("OK (Landed) (redirected to {}/here)", server.url())
        );
    }

    #[tokio::test]
    async fn test_resolve_hop_limit_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let _loop_mock = server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .expect(MAX_REDIRECTS + 1)
            .create_async()
            .await;

        let url = format!("{}/loop", server.url());
        let status = resolver().resolve(&url).await;

        assert_eq!(status.http_code(), 0);
        assert_eq!(
            status.transport_error().map(|e| e.kind),
            Some(TransportKind::TooManyRedirects)
        );
    }

    #[tokio::test]
    async fn test_resolve_manual_follower_matches_native() {
        let mut server = mockito::Server::new_async().await;
        let _hop = server
            .mock("GET", "/m")
            .with_status(302)
            .with_header("location", "/n")
            .expect(2)
            .create_async()
            .await;
        let _target = server
            .mock("GET", "/n")
            .with_status(200)
            .with_body("<title>Same</title>")
            .expect(2)
            .create_async()
            .await;

        let url = format!("{}/m", server.url());
        let native = resolver().resolve(&url).await;
        let manual = StatusResolver::builder()
            .with_follower(Arc::new(ManualRedirects))
            .build()
            .unwrap()
            .resolve(&url)
            .await;

        assert_eq!(native, manual);
    }

    #[tokio::test]
    async fn test_resolve_connection_failure_is_data() {
        // Nothing listens on port 1.
        let status = resolver().resolve("http://127.0.0.1:1/").await;

        assert_eq!(status.http_code(), 0);
        let error = status.transport_error().unwrap();
        assert!(!error.message.is_empty());
        assert!(status.describe().starts_with("Error: "));
        assert!(!status.good());
    }

    #[tokio::test]
    async fn test_resolve_unknown_host_is_server_not_found() {
        let status = resolver()
            .resolve("http://no-such-host.invalid/")
            .await;

        assert_eq!(status.http_code(), 0);
        assert_eq!(
            status.transport_error().map(|e| e.kind),
            Some(TransportKind::ServerNotFound)
        );
        assert_eq!(status.describe(), "Server not found.");
    }
}
