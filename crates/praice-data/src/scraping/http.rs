//! 재시도가 포함된 HTTP 페이지 가져오기.

use std::time::Duration;

use praice_core::ScraperConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Proxy, StatusCode};
use tracing::{debug, warn};

use super::{ScraperError, ScraperResult};

/// 재시도 대기 상한
const MAX_BACKOFF: Duration = Duration::from_secs(300);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 스크래퍼가 공유하는 HTTP 가져오기 도우미.
///
/// 브라우저 User-Agent로 요청하고, 실패 시 `backoff_base * 2^attempt` 만큼 대기 후
/// 최대 `max_retries`회까지 시도합니다. 429와 5xx 응답도 재시도 대상입니다.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    backoff_base: Duration,
}

impl HttpFetcher {
    /// 기본 설정(30초 타임아웃, 3회, 1초 백오프)으로 생성
    pub fn new(proxy: Option<&str>) -> ScraperResult<Self> {
        let config = ScraperConfig {
            proxy: proxy.map(str::to_string),
            ..Default::default()
        };
        Self::from_config(&config)
    }

    /// 스크래퍼 설정으로 생성
    pub fn from_config(config: &ScraperConfig) -> ScraperResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            max_retries: config.max_retries.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// 페이지 본문을 가져옵니다.
    ///
    /// 429/5xx와 네트워크 오류는 재시도하고, 그 외 4xx는 즉시 실패합니다.
    pub async fn fetch_text(&self, url: &str) -> ScraperResult<String> {
        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                debug!(url, attempt, delay_ms = delay.as_millis() as u64, "재시도 대기");
                tokio::time::sleep(delay).await;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.text().await?);
                    }

                    last_error = format!("HTTP {}", status);
                    if !is_retryable(status) {
                        warn!(url, status = %status, "재시도 불가 응답");
                        return Err(ScraperError::FetchFailed {
                            attempts: attempt + 1,
                            last_error,
                        });
                    }
                    warn!(url, status = %status, attempt = attempt + 1, "요청 실패");
                }
                Err(e) => {
                    warn!(url, error = %e, attempt = attempt + 1, "요청 실패");
                    last_error = e.to_string();
                }
            }
        }

        Err(ScraperError::FetchFailed {
            attempts: self.max_retries,
            last_error,
        })
    }

    /// `attempt`번째 재시도 전 대기 시간: `backoff_base * 2^(attempt - 1)`, 상한 `MAX_BACKOFF`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
