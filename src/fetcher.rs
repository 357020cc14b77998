//! Page fetching with outcome classification
//!
//! [`HttpFetcher`] issues a GET with a browser-like header set and sorts the result
//! into success, retryable failure or permanent failure:
//!
//! | Response | Outcome |
//! |---|---|
//! | 2xx / 3xx, `text/html`, decodable | success |
//! | 403 / 404 | permanent |
//! | other status | retryable |
//! | not `text/html` | permanent |
//! | body not valid in declared charset | permanent |
//! | timeout, connection refused/reset, TLS failure | retryable |

use crate::config::FetchConfig;
use crate::error::{Error, FetchError, Result};
use async_trait::async_trait;
use encoding_rs::Encoding;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::debug;

/// A downloaded and decoded HTML page
#[derive(Clone, Debug)]
pub struct FetchedPage {
    /// Decoded body
    pub text: String,
    /// Encoding the body was declared in (and is saved back in)
    pub encoding: &'static Encoding,
}

/// Source of HTML pages
///
/// Implementations must be safe to call concurrently for independent URLs.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and decode it
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError>;
}

/// How an HTTP status is treated before the body is looked at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx or 3xx
    Success,
    /// 403 or 404: the content is not reachable
    Permanent,
    /// Anything else: transient server state
    Retryable,
}

/// Classify an HTTP status code
pub fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() || status.is_redirection() {
        StatusClass::Success
    } else if status == StatusCode::FORBIDDEN || status == StatusCode::NOT_FOUND {
        StatusClass::Permanent
    } else {
        StatusClass::Retryable
    }
}

/// Extract the `charset` parameter from a Content-Type value
///
/// ```
/// use hn_dl::fetcher::charset_from_content_type;
///
/// assert_eq!(
///     charset_from_content_type("text/html; charset=\"ISO-8859-1\""),
///     Some("ISO-8859-1")
/// );
/// assert_eq!(charset_from_content_type("text/html"), None);
/// ```
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').trim_matches('\''))
        } else {
            None
        }
    })
}

/// Decode `body` strictly in the given encoding
///
/// Malformed byte sequences are an error rather than being replaced.
pub fn decode_body(body: &[u8], encoding: &'static Encoding) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
}

/// [`PageFetcher`] backed by a shared `reqwest` client
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    default_encoding: &'static Encoding,
}

impl HttpFetcher {
    /// Build the client from fetch settings
    ///
    /// # Errors
    /// Returns error if a header value is invalid, the default encoding is unknown,
    /// or the HTTP client cannot be created
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, header_value(&config.accept, "fetch.accept")?);
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header_value(&config.accept_language, "fetch.accept_language")?,
        );

        let default_encoding = Encoding::for_label(config.default_encoding.as_bytes())
            .ok_or_else(|| Error::Config {
                message: format!("unknown encoding '{}'", config.default_encoding),
                key: Some("fetch.default_encoding".to_string()),
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            default_encoding,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, &e))?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Got response");
        match classify_status(status) {
            StatusClass::Success => {}
            StatusClass::Permanent => {
                return Err(FetchError::permanent(
                    url,
                    format!("page not found or requires authorization (HTTP {})", status.as_u16()),
                ));
            }
            StatusClass::Retryable => {
                return Err(FetchError::retryable(
                    url,
                    format!("page could not be processed right now (HTTP {})", status.as_u16()),
                ));
            }
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        debug!(url = %url, content_type = %content_type, "Checking content type");
        if !content_type.contains("text/html") {
            return Err(FetchError::permanent(
                url,
                format!("content type is not text/html ({content_type:?})"),
            ));
        }

        let encoding = match charset_from_content_type(&content_type) {
            Some(label) => Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                FetchError::permanent(url, format!("unknown charset '{label}'"))
            })?,
            None => self.default_encoding,
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::retryable(url, format!("failed to read body: {e}")))?;

        let text = decode_body(&body, encoding).ok_or_else(|| {
            FetchError::permanent(url, format!("body is not valid {}", encoding.name()))
        })?;

        Ok(FetchedPage { text, encoding })
    }
}

fn header_value(value: &str, key: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Config {
        message: format!("invalid header value: {e}"),
        key: Some(key.to_string()),
    })
}

/// A request that never got a response
///
/// Builder errors (unsupported scheme, malformed URL) will fail the same way every
/// time; everything else is network trouble.
fn request_error(url: &str, e: &reqwest::Error) -> FetchError {
    if e.is_builder() {
        FetchError::permanent(url, format!("invalid request: {e}"))
    } else if e.is_timeout() {
        FetchError::retryable(url, "request timed out")
    } else if e.is_connect() {
        FetchError::retryable(url, format!("connection failed: {e}"))
    } else {
        FetchError::retryable(url, format!("request failed: {e}"))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&FetchConfig::default()).unwrap()
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::FOUND), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), StatusClass::Permanent);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), StatusClass::Permanent);
        assert_eq!(classify_status(StatusCode::GONE), StatusClass::Retryable);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            StatusClass::Retryable
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            StatusClass::Retryable
        );
    }

    #[test]
    fn test_charset_parsing() {
        assert_eq!(
            charset_from_content_type("text/html; charset=utf-8"),
            Some("utf-8")
        );
        assert_eq!(
            charset_from_content_type("text/html;Charset='windows-1251'"),
            Some("windows-1251")
        );
        assert_eq!(charset_from_content_type("text/html; q=1"), None);
    }

    #[test]
    fn test_decode_body_is_strict() {
        assert_eq!(
            decode_body("héllo".as_bytes(), encoding_rs::UTF_8).as_deref(),
            Some("héllo")
        );
        assert_eq!(decode_body(&[0x66, 0xff, 0xfe], encoding_rs::UTF_8), None);
        assert_eq!(
            decode_body(&[0x68, 0xe9], encoding_rs::WINDOWS_1252).as_deref(),
            Some("hé")
        );
    }

    #[tokio::test]
    async fn test_fetch_success_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("accept", "*/*"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>ok</body></html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let page = fetcher()
            .fetch(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(page.text, "<html><body>ok</body></html>");
        assert_eq!(page.encoding, encoding_rs::UTF_8);

        let requests = server.received_requests().await.unwrap();
        let user_agent = requests[0].headers.get("user-agent").unwrap();
        assert!(user_agent.to_str().unwrap().starts_with("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_fetch_declared_charset_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=ISO-8859-1")
                    .set_body_bytes(vec![0x63, 0x61, 0x66, 0xe9]),
            )
            .mount(&server)
            .await;

        let page = fetcher()
            .fetch(&format!("{}/latin", server.uri()))
            .await
            .unwrap();
        assert_eq!(page.text, "café");
        assert_eq!(page.encoding, encoding_rs::WINDOWS_1252);
    }

    #[tokio::test]
    async fn test_fetch_404_and_403_are_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
        assert!(err.reason().contains("404"));

        let err = fetcher()
            .fetch(&format!("{}/forbidden", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
        assert!(err.reason().contains("403"));
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/busy", server.uri()))
            .await
            .unwrap_err();
        assert!(!err.is_permanent());
        assert!(err.reason().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_wrong_content_type_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.4".to_vec()),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/paper.pdf", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
        assert!(err.reason().contains("application/pdf"));
    }

    #[tokio::test]
    async fn test_fetch_undecodable_body_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbled"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_bytes(vec![0x3c, 0x70, 0x3e, 0xff, 0xfe]),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/garbled", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_fetch_unknown_charset_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/odd"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<p>hi</p>", "text/html; charset=x-klingon"),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/odd", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
        assert!(err.reason().contains("x-klingon"));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = FetchConfig {
            timeout: Duration::from_millis(200),
            ..FetchConfig::default()
        };
        let err = HttpFetcher::new(&config)
            .unwrap()
            .fetch(&format!("{}/slow", server.uri()))
            .await
            .unwrap_err();
        assert!(!err.is_permanent());
        assert_eq!(err.reason(), "request timed out");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_retryable() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = fetcher()
            .fetch(&format!("http://127.0.0.1:{port}/"))
            .await
            .unwrap_err();
        assert!(!err.is_permanent());
    }

    #[tokio::test]
    async fn test_fetch_unsupported_scheme_is_permanent() {
        let err = fetcher()
            .fetch("mailto:someone@example.com")
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }
}
