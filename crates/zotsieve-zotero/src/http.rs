use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, warn};

use crate::error::{Result, ZoteroError};

const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Seconds from a `Retry-After` header; HTTP-date values fall back to the default.
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}

/// 1s, 2s, 4s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

/// GET-only client that spaces requests by `min_interval` and retries
/// 429s and transport failures.
pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    next_slot: Mutex<Instant>,
    max_retries: u32,
}

impl RateLimitedClient {
    pub fn new(
        min_interval: Duration,
        max_retries: u32,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            min_interval,
            next_slot: Mutex::new(Instant::now()),
            max_retries,
        })
    }

    /// Holds the slot lock while sleeping so concurrent callers queue up.
    async fn throttle(&self) {
        let mut next = self.next_slot.lock().await;
        sleep_until(*next).await;
        *next = Instant::now() + self.min_interval;
    }

    pub async fn get_with_headers(&self, url: &str, headers: &HeaderMap) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            let can_retry = attempt < self.max_retries;
            attempt += 1;
            self.throttle().await;

            let resp = match self.client.get(url).headers(headers.clone()).send().await {
                Ok(resp) => resp,
                Err(e) if can_retry => {
                    let delay = backoff(attempt - 1);
                    debug!(error = %e, ?delay, "request failed, retrying");
                    sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after(resp.headers());
                if !can_retry {
                    return Err(ZoteroError::RateLimit(wait.as_secs()));
                }
                warn!(?wait, attempt, "rate limited by server");
                sleep(wait).await;
                continue;
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ZoteroError::Api(
                    url.to_string(),
                    format!("HTTP {}: {}", status.as_u16(), body.trim()),
                ));
            }
            return Ok(resp.text().await?);
        }
    }

    pub async fn get_json_with_headers<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<T> {
        let text = self.get_with_headers(url, headers).await?;
        serde_json::from_str(&text).map_err(|e| ZoteroError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn client(max_retries: u32) -> RateLimitedClient {
        RateLimitedClient::new(
            Duration::from_millis(0),
            max_retries,
            Duration::from_secs(5),
            "zotsieve-test",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn retries_after_429_then_succeeds() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("GET", "/ping")
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(1)
            .create_async()
            .await;

        let client = client(2);
        let url = format!("{}/ping", server.url());

        // Second mock takes over once the first has been hit.
        let ok = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body("[1, 2]")
            .create_async()
            .await;

        let body: Vec<u32> = client.get_json_with_headers(&url, &HeaderMap::new()).await.unwrap();
        assert_eq!(body, vec![1, 2]);
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[test]
    fn retry_after_parses_seconds_or_falls_back() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), DEFAULT_RETRY_AFTER);
        headers.insert(RETRY_AFTER, " 12 ".parse().unwrap());
        assert_eq!(retry_after(&headers), Duration::from_secs(12));
        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_after(&headers), DEFAULT_RETRY_AFTER);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff(0), Duration::from_secs(1));
        assert_eq!(backoff(3), Duration::from_secs(8));
        assert_eq!(backoff(40), Duration::from_secs(64));
    }

    #[tokio::test]
    async fn rate_limit_error_when_retries_exhausted() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;

        let err = client(0)
            .get_with_headers(&format!("{}/ping", server.url()), &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ZoteroError::RateLimit(7)));
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(403)
            .with_body("Forbidden")
            .create_async()
            .await;

        let err = client(3)
            .get_with_headers(&format!("{}/ping", server.url()), &HeaderMap::new())
            .await
            .unwrap_err();
        match err {
            ZoteroError::Api(_, msg) => assert_eq!(msg, "HTTP 403: Forbidden"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(0)
            .get_json_with_headers::<Vec<u32>>(&format!("{}/ping", server.url()), &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ZoteroError::Parse(_)));
    }
}
