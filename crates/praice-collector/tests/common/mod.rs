//! 통합 테스트 공용 fixture.
//!
//! 네트워크 없이 수집 파이프라인을 돌리기 위한 Provider / 스크래퍼 / 추론 모의 객체입니다.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use praice_collector::{CollectorConfig, JobContext};
use praice_core::{
    Article, Headline, Period, PriceBar, PriceRequest, ScraperConfig, SymbolInfo,
};
use praice_data::inference::InferenceResult;
use praice_data::provider::ProviderResult;
use praice_data::scraping::ScraperResult;
use praice_data::{
    InferenceError, MarketDataProvider, MemoryStore, NewsScraper, ProviderError, ScraperError,
    ScraperRegistry, SentimentScorer, StatementSet, Store, Summarizer, SummarizerRegistry,
};
use rust_decimal::Decimal;

pub const MOCK_SOURCE: &str = "mock";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `start`부터 하루 간격의 상승 일봉 `count`개.
pub fn rising_bars(start: NaiveDate, count: usize) -> Vec<PriceBar> {
    (0..count)
        .map(|i| {
            let base = Decimal::from(100 + i as i64);
            PriceBar::ohlcv(
                start + Duration::days(i as i64),
                base,
                base + Decimal::from(2),
                base - Decimal::from(1),
                base + Decimal::from(1),
                1_000_000 + i as i64,
            )
        })
        .collect()
}

// =============================================================================
// Provider
// =============================================================================

/// 심볼별로 미리 넣어 둔 가격/재무제표를 돌려주는 Provider.
#[derive(Default)]
pub struct MockProvider {
    prices: BTreeMap<String, Vec<PriceBar>>,
    statements: BTreeMap<(String, Period), StatementSet>,
    known: BTreeSet<String>,
    failing: BTreeSet<String>,
    price_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 심볼 정보 조회에 응답할 심볼.
    pub fn with_symbol(mut self, code: &str) -> Self {
        self.known.insert(code.to_string());
        self
    }

    pub fn with_prices(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.known.insert(code.to_string());
        self.prices.insert(code.to_string(), bars);
        self
    }

    pub fn with_statements(mut self, code: &str, period: Period, set: StatementSet) -> Self {
        self.known.insert(code.to_string());
        self.statements.insert((code.to_string(), period), set);
        self
    }

    /// 가격 조회가 API 오류로 실패할 심볼.
    pub fn failing(mut self, code: &str) -> Self {
        self.known.insert(code.to_string());
        self.failing.insert(code.to_string());
        self
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_prices(
        &self,
        code: &str,
        request: &PriceRequest,
    ) -> ProviderResult<Vec<PriceBar>> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(code) {
            return Err(ProviderError::Api(format!("{} unavailable", code)));
        }

        let bars = self.prices.get(code).cloned().unwrap_or_default();
        Ok(match request {
            PriceRequest::Range { start, end } => bars
                .into_iter()
                .filter(|bar| bar.date >= *start && bar.date <= *end)
                .collect(),
            _ => bars,
        })
    }

    async fn fetch_symbol_info(&self, code: &str) -> ProviderResult<Option<SymbolInfo>> {
        if !self.known.contains(code) {
            return Ok(None);
        }
        Ok(Some(SymbolInfo {
            symbol: code.to_string(),
            long_name: Some("Mock Corporation".to_string()),
            quote_type: Some("EQUITY".to_string()),
            ..Default::default()
        }))
    }

    async fn fetch_statements(&self, code: &str, period: Period) -> ProviderResult<StatementSet> {
        Ok(self
            .statements
            .get(&(code.to_string(), period))
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// Scraper
// =============================================================================

/// URL별 헤드라인과 기사를 돌려주는 스크래퍼.
#[derive(Default)]
pub struct MockScraper {
    pub headlines: BTreeMap<String, Vec<Headline>>,
    pub articles: BTreeMap<String, Article>,
}

impl MockScraper {
    pub fn with_headlines(mut self, url: &str, items: &[(&str, &str)]) -> Self {
        self.headlines.insert(
            url.to_string(),
            items
                .iter()
                .map(|(headline, link)| Headline {
                    headline: headline.to_string(),
                    link: link.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn with_article(mut self, url: &str, content: &str, symbols: &[&str]) -> Self {
        self.articles.insert(
            url.to_string(),
            Article {
                content: content.to_string(),
                published_at: None,
                symbols: symbols.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    /// `mock` 소스로 등록된 레지스트리.
    pub fn into_registry(self) -> Arc<ScraperRegistry> {
        let scraper = Arc::new(self);
        let mut registry = ScraperRegistry::new(ScraperConfig::default());
        registry.register(MOCK_SOURCE, move |_config: &ScraperConfig| {
            Ok(scraper.clone() as Arc<dyn NewsScraper>)
        });
        Arc::new(registry)
    }
}

#[async_trait]
impl NewsScraper for MockScraper {
    fn source(&self) -> &str {
        MOCK_SOURCE
    }

    async fn scrape_headlines(&self, url: &str) -> ScraperResult<Vec<Headline>> {
        self.headlines
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::FetchFailed {
                attempts: 3,
                last_error: format!("404 for {}", url),
            })
    }

    async fn scrape_article(&self, url: &str) -> ScraperResult<Article> {
        self.articles
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::Parse(format!("no article body at {}", url)))
    }
}

// =============================================================================
// Inference
// =============================================================================

/// 첫 문장을 요약으로 돌려주는 요약기.
pub struct MockSummarizer {
    pub calls: AtomicUsize,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn summarize(&self, text: &str, _max_tokens: u32) -> InferenceResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.starts_with("FAIL") {
            return Err(InferenceError::Api {
                status: 503,
                message: "model loading".to_string(),
            });
        }
        let first = text.split('.').next().unwrap_or_default();
        Ok(format!("  {}.  ", first.trim()))
    }
}

/// 고정 점수를 돌려주는 감성 분석기. `FAIL`로 시작하는 요약은 실패합니다.
pub struct MockScorer(pub f64);

#[async_trait]
impl SentimentScorer for MockScorer {
    async fn score(&self, text: &str) -> InferenceResult<f64> {
        if text.starts_with("FAIL") {
            return Err(InferenceError::Api {
                status: 500,
                message: "scorer crashed".to_string(),
            });
        }
        Ok(self.0)
    }
}

// =============================================================================
// Context
// =============================================================================

/// 인메모리 저장소와 모의 객체로 만든 작업 컨텍스트.
pub fn memory_context(
    store: Arc<MemoryStore>,
    provider: MockProvider,
    scraper: MockScraper,
    config: CollectorConfig,
) -> JobContext {
    let mut summarizers = SummarizerRegistry::new("mock");
    summarizers.register(Arc::new(MockSummarizer::new()));

    JobContext::new(
        store as Arc<dyn Store>,
        Arc::new(provider),
        scraper.into_registry(),
        Arc::new(summarizers),
        Arc::new(MockScorer(0.25)),
        config,
    )
}
