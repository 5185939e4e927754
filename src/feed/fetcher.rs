use std::time::Duration;

use futures::{Stream, StreamExt};
use thiserror::Error;
use url::Url;

use crate::feed::parser::{parse_feed, ParseError, ParsedFeed};
use crate::util::{validate_url, UrlValidationError};

/// Default per-feed time budget covering connect, headers and body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default response size limit (10MB).
pub const MAX_FEED_SIZE: usize = 10 * 1024 * 1024;
/// User agent sent with every feed request.
pub const DEFAULT_USER_AGENT: &str = concat!("feedmerge/", env!("CARGO_PKG_VERSION"));

/// Errors retrieving feed bytes.
///
/// These cover everything before parsing: the URL itself, the network,
/// the HTTP status, and the response body.
#[derive(Debug, Error)]
pub enum TransportError {
    /// URL is not an http(s) URL with a host
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured time budget
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Why a single feed contributed no posts. Always names the feed URL.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("fetching feed {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("parsing feed {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: ParseError,
    },
}

impl FeedError {
    /// The feed URL this error belongs to
    pub fn url(&self) -> &str {
        match self {
            FeedError::Transport { url, .. } | FeedError::Decode { url, .. } => url,
        }
    }
}

/// Limits applied to each feed retrieval.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Time budget per feed; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Maximum response body size in bytes
    pub max_feed_size: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            max_feed_size: MAX_FEED_SIZE,
        }
    }
}

/// Builds the HTTP client shared by every feed task.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, TransportError> {
    Ok(reqwest::Client::builder().user_agent(user_agent).build()?)
}

/// Retrieves and parses a single feed.
///
/// # Errors
///
/// - [`FeedError::Transport`] for invalid URLs, network failures, non-2xx
///   statuses, timeouts and oversized or truncated bodies
/// - [`FeedError::Decode`] when the body is not a well-formed feed document
///
/// No retries are attempted.
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<ParsedFeed, FeedError> {
    let bytes = fetch_bytes(client, url, options)
        .await
        .map_err(|source| FeedError::Transport {
            url: url.to_string(),
            source,
        })?;

    let feed = parse_feed(&bytes).map_err(|source| FeedError::Decode {
        url: url.to_string(),
        source,
    })?;

    tracing::debug!(
        url = %url,
        title = %feed.title,
        posts = feed.posts.len(),
        "Parsed feed"
    );
    Ok(feed)
}

async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<Vec<u8>, TransportError> {
    let url = validate_url(url)?;
    let download = download(client, url, options.max_feed_size);

    match options.timeout {
        Some(limit) => tokio::time::timeout(limit, download)
            .await
            .map_err(|_| TransportError::Timeout)?,
        None => download.await,
    }
}

async fn download(
    client: &reqwest::Client,
    url: Url,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(TransportError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, limit).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    let expected_length = response.content_length();

    // Fast path: a declared length over the limit fails before any body is read
    if expected_length.is_some_and(|len| len > limit as u64) {
        return Err(TransportError::ResponseTooLarge);
    }

    collect_limited(response.bytes_stream(), expected_length, limit).await
}

/// Drains body chunks, failing as soon as the running total passes `limit`.
///
/// Chunked responses declare no length, so this running check is the only
/// cap they meet. When a length was declared, a shorter body is an error.
async fn collect_limited<S, B>(
    mut chunks: S,
    expected_length: Option<u64>,
    limit: usize,
) -> Result<Vec<u8>, TransportError>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut body = Vec::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(TransportError::ResponseTooLarge);
        }
        body.extend_from_slice(chunk);
    }

    match expected_length {
        Some(expected) if (body.len() as u64) < expected => Err(TransportError::IncompleteResponse {
            expected,
            received: body.len(),
        }),
        _ => Ok(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Test</title>
    <item><guid>1</guid><title>Test</title><pubDate>2023-01-01</pubDate></item>
</channel></rss>"#;

    async fn serve(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = serve(
            ResponseTemplate::new(200)
                .set_body_string(VALID_RSS)
                .insert_header("Content-Type", "application/xml"),
        )
        .await;
        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());

        let feed = fetch_feed(&client, &url, &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(feed.posts.len(), 1);
        assert_eq!(feed.posts[0].author(), "Test");
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let mock_server = serve(ResponseTemplate::new(404)).await;
        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());

        let err = fetch_feed(&client, &url, &FetchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.url(), url);
        match err {
            FeedError::Transport {
                source: TransportError::HttpStatus(404),
                ..
            } => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());

        let err = fetch_feed(&client, &url, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FeedError::Transport {
                source: TransportError::HttpStatus(500),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_malformed_feed_decode_error() {
        let mock_server =
            serve(ResponseTemplate::new(200).set_body_string("<rss><channel></item></rss>")).await;
        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());

        let err = fetch_feed(&client, &url, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains(&url));
        match err {
            FeedError::Decode { .. } => {}
            e => panic!("Expected Decode error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_response_too_large() {
        let mock_server = serve(ResponseTemplate::new(200).set_body_string(VALID_RSS)).await;
        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let options = FetchOptions {
            max_feed_size: 16,
            ..FetchOptions::default()
        };

        let err = fetch_feed(&client, &url, &options).await.unwrap_err();
        assert!(matches!(
            err,
            FeedError::Transport {
                source: TransportError::ResponseTooLarge,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_slow_feed_times_out() {
        let mock_server = serve(
            ResponseTemplate::new(200)
                .set_body_string(VALID_RSS)
                .set_delay(Duration::from_secs(5)),
        )
        .await;
        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let options = FetchOptions {
            timeout: Some(Duration::from_millis(200)),
            ..FetchOptions::default()
        };

        let err = fetch_feed(&client, &url, &options).await.unwrap_err();
        assert!(matches!(
            err,
            FeedError::Transport {
                source: TransportError::Timeout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_request() {
        let client = reqwest::Client::new();
        let err = fetch_feed(&client, "ftp://example.com/feed", &FetchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.url(), "ftp://example.com/feed");
        assert!(matches!(
            err,
            FeedError::Transport {
                source: TransportError::InvalidUrl(_),
                ..
            }
        ));
    }

    // ========================================================================
    // Body size limits
    // ========================================================================

    const FILLER: &str = "<!-- filler filler filler filler filler filler filler filler -->";

    fn chunks(
        parts: &[&'static [u8]],
    ) -> impl Stream<Item = Result<&'static [u8], reqwest::Error>> + Unpin {
        futures::stream::iter(parts.to_vec().into_iter().map(Ok))
    }

    /// Serves one response using chunked transfer encoding, which carries no
    /// Content-Length. wiremock always sets the header, so this writes raw HTTP.
    async fn serve_chunked(chunk: &'static str, count: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            let mut response = String::from(
                "HTTP/1.1 200 OK\r\nContent-Type: application/xml\r\n\
                 Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
            );
            for _ in 0..count {
                response.push_str(&format!("{:x}\r\n{}\r\n", chunk.len(), chunk));
            }
            response.push_str("0\r\n\r\n");
            // The client may hang up early once it has seen too much
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/feed", addr)
    }

    #[tokio::test]
    async fn test_collect_stops_once_limit_passed() {
        let err = collect_limited(chunks(&[b"aaaa", b"bbbb", b"cccc"]), None, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ResponseTooLarge));
    }

    #[tokio::test]
    async fn test_collect_allows_body_at_limit() {
        let body = collect_limited(chunks(&[b"aaaa", b"bbbb", b"cc"]), Some(10), 10)
            .await
            .unwrap();
        assert_eq!(body, b"aaaabbbbcc");
    }

    #[tokio::test]
    async fn test_collect_short_body_is_incomplete() {
        let err = collect_limited(chunks(&[b"abc"]), Some(8), 100)
            .await
            .unwrap_err();
        match err {
            TransportError::IncompleteResponse { expected, received } => {
                assert_eq!(expected, 8);
                assert_eq!(received, 3);
            }
            e => panic!("Expected IncompleteResponse, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_chunked_body_over_limit_rejected() {
        let url = serve_chunked(FILLER, 64).await;
        let options = FetchOptions {
            max_feed_size: 1024,
            ..FetchOptions::default()
        };

        let err = fetch_feed(&reqwest::Client::new(), &url, &options)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FeedError::Transport {
                source: TransportError::ResponseTooLarge,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_chunked_body_within_limit_parsed() {
        let url = serve_chunked(VALID_RSS, 1).await;

        let feed = fetch_feed(&reqwest::Client::new(), &url, &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(feed.posts.len(), 1);
    }
}
