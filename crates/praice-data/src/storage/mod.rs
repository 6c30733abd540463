//! 저장소 계층.
//!
//! 엔티티 계열별 async trait과 두 가지 백엔드를 제공합니다:
//! - `PgStore`: PostgreSQL (sqlx)
//! - `MemoryStore`: 테스트/로컬 실행용 인메모리 구현
//!
//! 시계열 계열(가격, 기술적 분석, 재무)의 bulk upsert는 trait 기본 메서드로 구현되어
//! 두 백엔드가 같은 배치 분할 규칙을 공유합니다. 백엔드는 배치 하나를 하나의
//! 트랜잭션으로 적용하는 `upsert_*_batch`만 구현합니다.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use praice_core::{
    validate_code, FundamentalData, HistoricalPrice, NewNews, NewSymbol, News, NewsStats,
    NewsStage, NewsSymbol, NewsUpdate, Period, PriceBar, ScrapingUrl, ScrapingUrlUpdate, Symbol,
    SymbolConfig, SymbolConfigUpdate, SymbolUpdate, TaEntry, TechnicalAnalysis, Timeframe,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{DataError, Result};
use crate::provider::MarketDataProvider;

pub use memory::MemoryStore;
pub use postgres::{Database, PgStore};

/// bulk upsert 기본 배치 크기.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// upsert 중 건너뛴 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// 자연 키 (예: "2024-01-02", "2024-01-02/1D")
    pub key: String,
    pub reason: String,
}

/// bulk upsert 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertReport {
    pub upserted: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl UpsertReport {
    pub fn record_success(&mut self) {
        self.upserted += 1;
    }

    pub fn record_skip(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedRecord {
            key: key.into(),
            reason: reason.into(),
        });
    }

    /// 다른 배치의 결과를 합칩니다.
    pub fn absorb(&mut self, other: UpsertReport) {
        self.upserted += other.upserted;
        self.skipped.extend(other.skipped);
    }

    /// 입력 레코드 수 (성공 + 건너뜀).
    pub fn total(&self) -> usize {
        self.upserted + self.skipped.len()
    }
}

/// 배치 크기를 검증하고 레코드를 배치로 나눕니다.
pub fn batches<T>(records: &[T], batch_size: usize) -> Result<std::slice::Chunks<'_, T>> {
    if batch_size == 0 {
        return Err(DataError::Validation(
            "batch size must be greater than zero".to_string(),
        ));
    }
    Ok(records.chunks(batch_size))
}

// =============================================================================
// Symbols & configs
// =============================================================================

/// 심볼 및 수집 설정 저장소.
#[async_trait]
pub trait SymbolStore: Send + Sync {
    async fn get_symbol(&self, code: &str) -> Result<Symbol>;

    /// 정규화 후 심볼을 추가합니다. 코드가 이미 있으면 `DuplicateError`.
    async fn add_symbol(&self, new: NewSymbol) -> Result<Symbol>;

    async fn list_symbols(&self) -> Result<Vec<Symbol>>;

    async fn list_active_symbols(&self) -> Result<Vec<Symbol>>;

    async fn update_symbol(&self, code: &str, update: SymbolUpdate) -> Result<Symbol>;

    /// 심볼과 종속 행(설정, URL, 뉴스 연결, 시계열)을 삭제합니다.
    async fn delete_symbol(&self, code: &str) -> Result<()>;

    /// 지정하지 않은 플래그는 기본값(true)으로 설정을 생성합니다.
    async fn create_symbol_config(
        &self,
        code: &str,
        flags: SymbolConfigUpdate,
    ) -> Result<SymbolConfig>;

    async fn get_symbol_config(&self, code: &str) -> Result<SymbolConfig>;

    /// 변경된 필드가 있으면 `true`.
    async fn update_symbol_config(&self, code: &str, update: SymbolConfigUpdate) -> Result<bool>;

    async fn delete_symbol_config(&self, code: &str) -> Result<()>;

    /// 심볼 코드 순으로 (심볼, 설정) 쌍을 반환합니다.
    async fn list_symbol_configs(&self) -> Result<Vec<(Symbol, SymbolConfig)>>;

    /// 설정을 조회하고, 없으면 기본값으로 생성합니다.
    async fn get_or_create_symbol_config(&self, code: &str) -> Result<SymbolConfig> {
        match self.get_symbol_config(code).await {
            Err(DataError::NotFound(_)) => {}
            other => return other,
        }
        match self
            .create_symbol_config(code, SymbolConfigUpdate::default())
            .await
        {
            Err(DataError::DuplicateError(_)) => self.get_symbol_config(code).await,
            other => other,
        }
    }

    /// 심볼을 조회하고, 없으면 외부 심볼 정보로 생성합니다.
    ///
    /// 동시 생성으로 고유 제약 위반이 나면 기존 행을 다시 읽습니다.
    async fn get_or_create_symbol(
        &self,
        code: &str,
        provider: &dyn MarketDataProvider,
    ) -> Result<Symbol> {
        let code = validate_code(code)?;
        match self.get_symbol(&code).await {
            Err(DataError::NotFound(_)) => {}
            other => return other,
        }

        info!(symbol = %code, provider = provider.name(), "심볼 없음, 외부 정보로 생성");
        let info = provider.fetch_symbol_info(&code).await?.ok_or_else(|| {
            DataError::NotFound(format!("no symbol info available for {}", code))
        })?;

        match self.add_symbol(info.into_new_symbol(&code)).await {
            Ok(symbol) => {
                info!(symbol = %symbol.symbol, name = %symbol.name, "새 심볼 생성");
                Ok(symbol)
            }
            Err(DataError::DuplicateError(_)) => {
                debug!(symbol = %code, "동시 생성 감지, 기존 심볼 재조회");
                self.get_symbol(&code).await
            }
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Scraping URLs
// =============================================================================

/// 뉴스 헤드라인 수집 URL 저장소.
#[async_trait]
pub trait ScrapingUrlStore: Send + Sync {
    /// (심볼, 소스) 쌍이 이미 있으면 `DuplicateError`.
    async fn add_scraping_url(&self, code: &str, url: &str, source: &str) -> Result<ScrapingUrl>;

    async fn list_scraping_urls(&self, code: Option<&str>) -> Result<Vec<ScrapingUrl>>;

    async fn get_scraping_url(&self, code: &str, source: &str) -> Result<ScrapingUrl>;

    /// 활성 심볼의 활성 URL 중 해당 소스의 목록.
    async fn list_active_scraping_urls(&self, source: &str) -> Result<Vec<ScrapingUrl>>;

    async fn update_scraping_url(&self, id: i64, update: ScrapingUrlUpdate)
        -> Result<ScrapingUrl>;

    async fn delete_scraping_url(&self, id: i64) -> Result<()>;
}

// =============================================================================
// News
// =============================================================================

/// 뉴스 및 뉴스-심볼 연결 저장소.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// URL이 이미 있으면 `DuplicateError`.
    async fn create_news(&self, new: NewNews) -> Result<News>;

    /// URL 기준 조회 또는 생성. 두 번째 값은 생성 여부.
    async fn get_or_create_news(&self, new: NewNews) -> Result<(News, bool)>;

    async fn get_news(&self, id: i64) -> Result<News>;

    async fn update_news(&self, id: i64, update: NewsUpdate) -> Result<News>;

    async fn delete_news(&self, id: i64) -> Result<()>;

    /// 2단계 수집 결과(본문, 게시 시각)를 기록합니다.
    async fn set_article_content(
        &self,
        id: i64,
        content: &str,
        published_at: Option<DateTime<Utc>>,
        scraped_at: DateTime<Utc>,
    ) -> Result<()>;

    /// 뉴스-심볼 연결 조회 또는 생성. 두 번째 값은 생성 여부.
    async fn link_news_symbol(&self, news_id: i64, symbol_id: i64) -> Result<(NewsSymbol, bool)>;

    async fn list_news_symbols(&self, news_id: i64) -> Result<Vec<NewsSymbol>>;

    async fn delete_news_symbol(&self, id: i64) -> Result<()>;

    /// 심볼에 연결된 뉴스 (게시 시각 최신순, null은 마지막).
    async fn find_news_by_symbol(&self, code: &str, limit: usize, offset: usize)
        -> Result<Vec<News>>;

    async fn count_news_by_symbol(&self, code: &str) -> Result<i64>;

    /// 제목 또는 본문에 대소문자 구분 없이 포함된 뉴스.
    async fn search_news(&self, query: &str, limit: usize) -> Result<Vec<News>>;

    async fn news_stats(&self) -> Result<NewsStats>;

    /// 본문 없음. 대기열 순서는 아래 보강 선택자와 같습니다.
    async fn list_news_without_content(&self, limit: usize) -> Result<Vec<News>>;

    async fn count_news_without_content(&self) -> Result<i64>;

    /// 본문 있음 AND 단어 수 없음.
    async fn list_news_pending_word_count(&self, limit: Option<usize>) -> Result<Vec<News>>;

    /// 단어 수 ≥ `min_words` AND 요약 없음.
    async fn list_news_pending_summary(&self, min_words: i32, limit: usize) -> Result<Vec<News>>;

    /// 요약 있음 AND 감성 점수 없음.
    ///
    /// 단계별 선택자는 실패 기록이 없는 행을 먼저, 그다음 오래전에 실패한 행을 ID 순으로
    /// 돌려줍니다. 매번 실패하는 행이 `limit`을 채워 뒤의 행을 막지 않습니다.
    async fn list_news_pending_sentiment(&self, limit: usize) -> Result<Vec<News>>;

    /// 단계 처리 실패 시각을 기록해 해당 행을 대기열 뒤로 보냅니다.
    async fn mark_news_attempt(
        &self,
        id: i64,
        stage: NewsStage,
        attempted_at: DateTime<Utc>,
    ) -> Result<()>;

    /// 단어 수를 하나의 트랜잭션으로 기록합니다. 하나라도 실패하면 전체 롤백.
    async fn set_words_count_batch(&self, counts: &[(i64, i32)]) -> Result<usize>;

    async fn set_content_summary(&self, id: i64, summary: &str) -> Result<()>;

    async fn set_sentiment_score(&self, id: i64, score: f64) -> Result<()>;
}

// =============================================================================
// Historical prices
// =============================================================================

/// 일봉 가격 저장소.
#[async_trait]
pub trait PriceStore: SymbolStore {
    /// 날짜 오름차순, 양끝 포함.
    async fn get_historical_prices(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalPrice>>;

    async fn get_historical_price(&self, code: &str, date: NaiveDate) -> Result<HistoricalPrice>;

    async fn delete_historical_price(&self, code: &str, date: NaiveDate) -> Result<()>;

    /// 배치 하나를 하나의 트랜잭션으로 upsert합니다.
    async fn upsert_price_batch(&self, symbol_id: i64, batch: &[PriceBar]) -> Result<UpsertReport>;

    async fn bulk_upsert_prices(&self, code: &str, records: &[PriceBar]) -> Result<UpsertReport> {
        self.bulk_upsert_prices_batched(code, records, UPSERT_BATCH_SIZE)
            .await
    }

    async fn bulk_upsert_prices_batched(
        &self,
        code: &str,
        records: &[PriceBar],
        batch_size: usize,
    ) -> Result<UpsertReport> {
        let chunks = batches(records, batch_size)?;
        let symbol = self.get_symbol(code).await?;

        let mut report = UpsertReport::default();
        for batch in chunks {
            report.absorb(self.upsert_price_batch(symbol.id, batch).await?);
        }

        debug!(
            symbol = %symbol.symbol,
            upserted = report.upserted,
            skipped = report.skipped.len(),
            "가격 bulk upsert 완료"
        );
        Ok(report)
    }
}

// =============================================================================
// Technical analysis
// =============================================================================

/// 기술적 분석 저장소.
#[async_trait]
pub trait AnalysisStore: SymbolStore {
    async fn get_technical_analysis(
        &self,
        code: &str,
        date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<TechnicalAnalysis>;

    /// 날짜 오름차순, 양끝 포함.
    async fn list_technical_analysis(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        timeframe: Timeframe,
    ) -> Result<Vec<TechnicalAnalysis>>;

    async fn delete_technical_analysis(
        &self,
        code: &str,
        date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<()>;

    /// 삭제된 행 수를 반환합니다.
    async fn delete_technical_analysis_by_symbol(
        &self,
        code: &str,
        timeframe: Timeframe,
    ) -> Result<u64>;

    /// 배치 하나를 하나의 트랜잭션으로 upsert합니다. 기존 JSON에는 키 단위로 병합합니다.
    async fn upsert_analysis_batch(
        &self,
        symbol_id: i64,
        batch: &[(NaiveDate, TaEntry)],
        timeframe: Timeframe,
    ) -> Result<UpsertReport>;

    async fn bulk_upsert_technical_analysis(
        &self,
        code: &str,
        entries: &[(NaiveDate, TaEntry)],
        timeframe: Timeframe,
    ) -> Result<UpsertReport> {
        let chunks = batches(entries, UPSERT_BATCH_SIZE)?;
        let symbol = self.get_symbol(code).await?;

        let mut report = UpsertReport::default();
        for batch in chunks {
            report.absorb(
                self.upsert_analysis_batch(symbol.id, batch, timeframe)
                    .await?,
            );
        }

        debug!(
            symbol = %symbol.symbol,
            timeframe = %timeframe,
            upserted = report.upserted,
            skipped = report.skipped.len(),
            "기술적 분석 bulk upsert 완료"
        );
        Ok(report)
    }
}

// =============================================================================
// Fundamentals
// =============================================================================

/// 재무 데이터 저장소.
#[async_trait]
pub trait FundamentalStore: SymbolStore {
    /// 날짜 내림차순, 양끝 포함.
    async fn get_fundamental_data(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        period: Option<Period>,
    ) -> Result<Vec<FundamentalData>>;

    async fn delete_fundamental_data(
        &self,
        code: &str,
        date: NaiveDate,
        period: Period,
    ) -> Result<()>;

    /// 배치 하나를 하나의 트랜잭션으로 upsert합니다.
    async fn upsert_fundamental_batch(
        &self,
        symbol_id: i64,
        batch: &[(NaiveDate, Map<String, Value>)],
        period: Period,
    ) -> Result<UpsertReport>;

    async fn bulk_upsert_fundamentals(
        &self,
        code: &str,
        entries: &[(NaiveDate, Map<String, Value>)],
        period: Period,
    ) -> Result<UpsertReport> {
        let chunks = batches(entries, UPSERT_BATCH_SIZE)?;
        let symbol = self.get_symbol(code).await?;

        let mut report = UpsertReport::default();
        for batch in chunks {
            report.absorb(self.upsert_fundamental_batch(symbol.id, batch, period).await?);
        }

        debug!(
            symbol = %symbol.symbol,
            period = %period,
            upserted = report.upserted,
            skipped = report.skipped.len(),
            "재무 데이터 bulk upsert 완료"
        );
        Ok(report)
    }
}

/// 모든 저장소 계열을 구현한 타입.
pub trait Store:
    SymbolStore + ScrapingUrlStore + NewsStore + PriceStore + AnalysisStore + FundamentalStore
{
}

impl<T> Store for T where
    T: SymbolStore + ScrapingUrlStore + NewsStore + PriceStore + AnalysisStore + FundamentalStore
{
}

/// 기술적 분석 레코드의 자연 키.
pub(crate) fn analysis_key(date: NaiveDate, timeframe: Timeframe) -> String {
    format!("{}/{}", date, timeframe)
}

/// 재무 데이터 레코드의 자연 키.
pub(crate) fn fundamental_key(date: NaiveDate, period: Period) -> String {
    format!("{}/{}", date, period)
}
