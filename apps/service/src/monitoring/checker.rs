use std::error::Error as _;
use std::time::{Duration, Instant};

use reqwest::Method;
use reqwest::header::HeaderMap;

use super::types::Outcome;
use crate::config::ProbeConfig;
use crate::database::models::{Headers, Monitor};

/// Issues one request for a monitor and reports what happened.
///
/// Implementations never fail: every error becomes an `Outcome::Failure`.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, monitor: &Monitor) -> Outcome;
}

/// HTTP/HTTPS prober backed by a shared reqwest client
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
    snippet_bytes: usize,
}

impl HttpProber {
    pub fn new(config: &ProbeConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(Self { client, timeout: config.timeout(), snippet_bytes: config.body_snippet_bytes })
    }

    fn describe_error(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            return format!("Request timed out after {}s", self.timeout.as_secs());
        }

        // reqwest's own message is generic; the root cause sits in the source chain.
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, monitor: &Monitor) -> Outcome {
        let method = match Method::from_bytes(monitor.method.to_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                return Outcome::failure(format!("Unsupported HTTP method: {}", monitor.method));
            }
        };

        let mut request = self.client.request(method, &monitor.url);
        for (key, value) in &monitor.headers {
            request = request.header(key, value);
        }
        if let Some(body) = &monitor.body {
            request = request.body(body.clone());
        }

        let start = Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Outcome::failure(self.describe_error(&e)),
        };

        let status_code = response.status().as_u16();
        let response_headers = extract_response_headers(response.headers());

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Outcome::failure(self.describe_error(&e)),
        };

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        Outcome::Success {
            status_code,
            latency_ms,
            response_size: body.len() as u64,
            response_headers,
            body_snippet: truncate_snippet(&body, self.snippet_bytes),
        }
    }
}

/// Collect response headers; repeated names are joined with ", ".
pub fn extract_response_headers(headers: &HeaderMap) -> Headers {
    let mut extracted = Headers::new();

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        extracted
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }

    extracted
}

/// Decode a body as text, keeping at most `cap` bytes and never splitting a
/// character.
pub fn truncate_snippet(body: &[u8], cap: usize) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= cap {
        return text.into_owned();
    }

    let mut end = cap;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_truncate_snippet_respects_cap() {
        let body = vec![b'a'; 5000];
        assert_eq!(truncate_snippet(&body, 2000).len(), 2000);
        assert_eq!(truncate_snippet(b"short", 2000), "short");
        assert_eq!(truncate_snippet(b"", 2000), "");
    }

    #[test]
    fn test_truncate_snippet_keeps_char_boundary() {
        // "é" is two bytes; a cap of 3 would split the second one
        let body = "éé".as_bytes();
        assert_eq!(truncate_snippet(body, 3), "é");
        assert_eq!(truncate_snippet(body, 4), "éé");
    }

    #[test]
    fn test_truncate_snippet_invalid_utf8() {
        let snippet = truncate_snippet(&[0x66, 0x6f, 0xff, 0x6f], 2000);
        assert!(snippet.starts_with("fo"));
        assert!(snippet.ends_with('o'));
    }

    #[test]
    fn test_extract_response_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));

        let extracted = extract_response_headers(&headers);
        assert_eq!(extracted.get("content-type").map(String::as_str), Some("text/plain"));
        assert_eq!(extracted.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
    }

    #[tokio::test]
    async fn test_unsupported_method_is_failure() {
        let prober = HttpProber::new(&ProbeConfig::default()).unwrap();
        let monitor = Monitor {
            id: 1,
            name: "bad".to_string(),
            url: "http://127.0.0.1:9".to_string(),
            method: "NOT A METHOD".to_string(),
            headers: Headers::new(),
            body: None,
            interval_seconds: 60,
        };

        match prober.probe(&monitor).await {
            Outcome::Failure { error } => assert!(error.contains("Unsupported HTTP method")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
