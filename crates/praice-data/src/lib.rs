//! 데이터 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 저장소 trait과 PostgreSQL / 인메모리 백엔드 (배치 upsert 포함)
//! - Yahoo Finance 시장 데이터 Provider (가격, 심볼 정보, 재무제표)
//! - 뉴스 스크래퍼 플러그인과 재시도 HTTP 도우미
//! - 요약/감성 분석 추론 클라이언트

pub mod error;
pub mod inference;
pub mod provider;
pub mod scraping;
pub mod storage;

pub use error::{DataError, Result};

// 저장소 재내보내기
pub use storage::{
    AnalysisStore, Database, FundamentalStore, MemoryStore, NewsStore, PgStore, PriceStore,
    ScrapingUrlStore, SkippedRecord, Store, SymbolStore, UpsertReport, UPSERT_BATCH_SIZE,
};

// Provider 재내보내기
pub use provider::{
    MarketDataProvider, ProviderError, StatementSet, StatementTable, YahooProvider,
};

// 스크래퍼 재내보내기
pub use scraping::{HttpFetcher, NewsScraper, ScraperError, ScraperRegistry, YahooScraper};

// 추론 클라이언트 재내보내기
pub use inference::{
    InferenceApiSentimentScorer, InferenceError, SentimentScorer, Summarizer, SummarizerRegistry,
};
