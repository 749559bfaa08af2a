//! Single GET against the dictionary API.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use std::fmt;

pub const NOT_FOUND_MESSAGE: &str = "Word not found";

/// Characters left alone by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The API answered with a non-success status.
    Lookup(String),
    /// No response was received.
    Network(String),
    /// A success response whose body was not JSON.
    Decode(String),
}

impl FetchError {
    /// Interprets the body of a non-success response.
    /// Only a JSON object counts; its `title`, else its `message`, is used
    /// when present and non-empty. Scalars read as their text form.
    pub fn from_error_body(body: &str) -> Self {
        let detail = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(fields)) => ["title", "message"]
                .into_iter()
                .find_map(|key| fields.get(key).and_then(detail_text)),
            _ => None,
        };
        FetchError::Lookup(detail.unwrap_or_else(|| NOT_FOUND_MESSAGE.to_string()))
    }
}

fn detail_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Lookup(message) => f.write_str(message),
            FetchError::Network(reason) => write!(f, "network error: {reason}"),
            FetchError::Decode(reason) => write!(f, "unreadable response: {reason}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Source of raw dictionary payloads for a term.
#[allow(async_fn_in_trait)]
pub trait WordFetcher {
    async fn fetch_word(&self, term: &str) -> Result<Value, FetchError>;
}

pub fn word_url(api_base: &str, term: &str) -> String {
    format!(
        "{}/{}",
        api_base.trim_end_matches('/'),
        utf8_percent_encode(term, URI_COMPONENT)
    )
}

#[cfg(feature = "http")]
pub use native::HttpFetcher;

#[cfg(feature = "http")]
mod native {
    use super::{FetchError, WordFetcher, word_url};
    use serde_json::Value;
    use tracing::debug;

    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: reqwest::Client,
        api_base: String,
    }

    impl HttpFetcher {
        pub fn new(api_base: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                api_base: api_base.into(),
            }
        }
    }

    impl WordFetcher for HttpFetcher {
        async fn fetch_word(&self, term: &str) -> Result<Value, FetchError> {
            let url = word_url(&self.api_base, term);
            debug!(%url, "requesting definition");
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|err| FetchError::Network(err.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                debug!(%status, "dictionary lookup rejected");
                return Err(FetchError::from_error_body(&body));
            }
            response
                .json::<Value>()
                .await
                .map_err(|err| FetchError::Decode(err.to_string()))
        }
    }
}

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;

#[cfg(feature = "browser")]
mod browser {
    use super::{FetchError, WordFetcher, word_url};
    use gloo_net::http::Request;
    use serde_json::Value;
    use tracing::debug;

    #[derive(Debug, Clone)]
    pub struct BrowserFetcher {
        api_base: String,
    }

    impl BrowserFetcher {
        pub fn new(api_base: impl Into<String>) -> Self {
            Self {
                api_base: api_base.into(),
            }
        }
    }

    impl WordFetcher for BrowserFetcher {
        async fn fetch_word(&self, term: &str) -> Result<Value, FetchError> {
            let url = word_url(&self.api_base, term);
            debug!(%url, "requesting definition");
            let response = Request::get(&url)
                .send()
                .await
                .map_err(|err| FetchError::Network(err.to_string()))?;
            if !response.ok() {
                let body = response.text().await.unwrap_or_default();
                debug!(status = response.status(), "dictionary lookup rejected");
                return Err(FetchError::from_error_body(&body));
            }
            response
                .json::<Value>()
                .await
                .map_err(|err| FetchError::Decode(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_wins_over_message() {
        let err = FetchError::from_error_body(
            r#"{"title":"No Definitions Found","message":"Sorry pal","resolution":"Try again"}"#,
        );
        assert_eq!(err.to_string(), "No Definitions Found");
    }

    #[test]
    fn message_used_when_title_missing_or_empty() {
        let err = FetchError::from_error_body(r#"{"title":"","message":"Rate limited"}"#);
        assert_eq!(err, FetchError::Lookup("Rate limited".into()));
    }

    #[test]
    fn unparsable_or_empty_bodies_fall_back() {
        for body in ["", "<html>502</html>", "{}", "[1,2]", r#"{"title":null}"#] {
            assert_eq!(FetchError::from_error_body(body).to_string(), NOT_FOUND_MESSAGE);
        }
    }

    #[test]
    fn only_object_bodies_supply_a_message() {
        assert_eq!(
            FetchError::from_error_body(r#"["Oops","x"]"#).to_string(),
            NOT_FOUND_MESSAGE
        );
        assert_eq!(FetchError::from_error_body(r#""Oops""#).to_string(), NOT_FOUND_MESSAGE);
        assert_eq!(FetchError::from_error_body(r#"{"title":404}"#).to_string(), "404");
        assert_eq!(
            FetchError::from_error_body(r#"{"title":{"x":1},"message":"Slow down"}"#).to_string(),
            "Slow down"
        );
    }

    #[test]
    fn term_is_encoded_like_uri_component() {
        assert_eq!(
            word_url("https://api.example.test/en/", "ice cream"),
            "https://api.example.test/en/ice%20cream"
        );
        assert_eq!(
            word_url("https://api.example.test/en", "rock'n'roll?&/"),
            "https://api.example.test/en/rock'n'roll%3F%26%2F"
        );
        assert_eq!(word_url("http://x", "café"), "http://x/caf%C3%A9");
    }

    #[cfg(feature = "http")]
    mod http {
        use super::super::*;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        async fn serve_once(status_line: &'static str, body: &'static str) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let read = socket.read(&mut buf).await.unwrap();
                    if read == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..read]);
                }
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            });
            format!("http://{addr}/api/v2/entries/en")
        }

        #[tokio::test]
        async fn success_body_is_returned_as_json() {
            let base = serve_once("200 OK", r#"[{"word":"hello"}]"#).await;
            let payload = HttpFetcher::new(base).fetch_word("hello").await.unwrap();
            assert_eq!(payload[0]["word"], "hello");
        }

        #[tokio::test]
        async fn not_found_uses_api_title() {
            let base = serve_once(
                "404 Not Found",
                r#"{"title":"No Definitions Found","message":"Sorry pal"}"#,
            )
            .await;
            let err = HttpFetcher::new(base).fetch_word("qwzx").await.unwrap_err();
            assert_eq!(err, FetchError::Lookup("No Definitions Found".into()));
        }

        #[tokio::test]
        async fn unparsable_error_body_falls_back() {
            let base = serve_once("500 Internal Server Error", "oops").await;
            let err = HttpFetcher::new(base).fetch_word("hello").await.unwrap_err();
            assert_eq!(err.to_string(), NOT_FOUND_MESSAGE);
        }

        #[tokio::test]
        async fn refused_connection_is_a_network_error() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let err = HttpFetcher::new(format!("http://{addr}"))
                .fetch_word("hello")
                .await
                .unwrap_err();
            assert!(matches!(err, FetchError::Network(_)));
        }
    }
}
