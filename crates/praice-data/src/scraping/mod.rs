//! 뉴스 스크래퍼 플러그인.
//!
//! 소스별 스크래퍼는 [`NewsScraper`]를 구현하고 [`ScraperRegistry`]에 이름으로 등록됩니다.
//! 뉴스 행의 `source` 컬럼 값이 레지스트리 키로 사용됩니다.
//!
//! ## 사용 예시
//! ```rust,ignore
//! let registry = ScraperRegistry::with_defaults(ScraperConfig::default());
//! let scraper = registry.create("yfinance", None)?;
//! let headlines = scraper.scrape_headlines("https://finance.yahoo.com/quote/AAPL/news").await?;
//! ```

pub mod http;
pub mod yahoo;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use praice_core::{Article, Headline, ScraperConfig};
use thiserror::Error;

use crate::error::DataError;

pub use http::HttpFetcher;
pub use yahoo::YahooScraper;

/// 스크래퍼 에러
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP 요청 실패: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{attempts}회 시도 후 가져오기 실패: {last_error}")]
    FetchFailed { attempts: u32, last_error: String },

    #[error("등록되지 않은 뉴스 소스: {0}")]
    UnknownSource(String),

    #[error("HTML 파싱 실패: {0}")]
    Parse(String),
}

impl From<ScraperError> for DataError {
    fn from(err: ScraperError) -> Self {
        match err {
            ScraperError::Parse(msg) => DataError::ParseError(msg),
            ScraperError::UnknownSource(name) => {
                DataError::ConfigError(format!("unknown news source: {}", name))
            }
            other => DataError::FetchError(other.to_string()),
        }
    }
}

pub type ScraperResult<T> = Result<T, ScraperError>;

/// 뉴스 소스 스크래퍼.
#[async_trait]
pub trait NewsScraper: Send + Sync {
    /// 레지스트리 키 (예: "yfinance")
    fn source(&self) -> &str;

    /// 목록 페이지에서 헤드라인과 링크를 추출합니다.
    async fn scrape_headlines(&self, url: &str) -> ScraperResult<Vec<Headline>>;

    /// 기사 페이지에서 본문, 게시 시각, 언급된 티커를 추출합니다.
    async fn scrape_article(&self, url: &str) -> ScraperResult<Article>;
}

/// 스크래퍼 생성자. 프록시가 반영된 스크래퍼 설정을 받습니다.
pub type ScraperFactory =
    Arc<dyn Fn(&ScraperConfig) -> ScraperResult<Arc<dyn NewsScraper>> + Send + Sync>;

/// 소스 이름 → 스크래퍼 생성자.
#[derive(Clone)]
pub struct ScraperRegistry {
    config: ScraperConfig,
    factories: BTreeMap<String, ScraperFactory>,
}

impl ScraperRegistry {
    /// 빈 레지스트리.
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            factories: BTreeMap::new(),
        }
    }

    /// 기본 소스(`yfinance`)가 등록된 레지스트리.
    pub fn with_defaults(config: ScraperConfig) -> Self {
        let mut registry = Self::new(config);
        registry.register(yahoo::SOURCE, |config: &ScraperConfig| {
            let fetcher = HttpFetcher::from_config(config)?;
            Ok(Arc::new(YahooScraper::new(fetcher)) as Arc<dyn NewsScraper>)
        });
        registry
    }

    /// 소스를 등록합니다. 같은 이름이 있으면 교체합니다.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ScraperConfig) -> ScraperResult<Arc<dyn NewsScraper>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// 스크래퍼를 생성합니다. `proxy`가 주어지면 설정의 프록시보다 우선합니다.
    pub fn create(&self, name: &str, proxy: Option<&str>) -> ScraperResult<Arc<dyn NewsScraper>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ScraperError::UnknownSource(name.to_string()))?;

        let mut config = self.config.clone();
        if let Some(proxy) = proxy {
            config.proxy = Some(proxy.to_string());
        }
        factory(&config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// 등록된 소스 이름 (정렬됨).
    pub fn sources(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// 시작 시 필요한 소스가 모두 등록되어 있는지 확인합니다.
    pub fn validate(&self, names: &[&str]) -> ScraperResult<()> {
        match names.iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(ScraperError::UnknownSource(missing.to_string())),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ScraperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperRegistry")
            .field("sources", &self.sources())
            .finish()
    }
}
