//! 정기 실행 작업.
//!
//! 각 작업은 시작을 로그로 남기고, 수집기/처리기 하나를 호출한 뒤 결과 건수 또는 에러를
//! 로그로 남깁니다. 작업은 에러를 반환하지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::ValueEnum;
use praice_data::{
    MarketDataProvider, ScraperRegistry, SentimentScorer, Store, Summarizer, SummarizerRegistry,
};

use crate::collectors::{FundamentalCollector, NewsCollector, PriceCollector};
use crate::processors::{NewsProcessor, TechnicalAnalysisProcessor};
use crate::{CollectorConfig, Result};

/// 모든 작업이 공유하는 의존성 묶음
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn Store>,
    pub provider: Arc<dyn MarketDataProvider>,
    pub scrapers: Arc<ScraperRegistry>,
    pub summarizers: Arc<SummarizerRegistry>,
    pub sentiment: Arc<dyn SentimentScorer>,
    pub config: CollectorConfig,
}

impl JobContext {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn MarketDataProvider>,
        scrapers: Arc<ScraperRegistry>,
        summarizers: Arc<SummarizerRegistry>,
        sentiment: Arc<dyn SentimentScorer>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            store,
            provider,
            scrapers,
            summarizers,
            sentiment,
            config,
        }
    }

    pub fn price_collector(&self) -> PriceCollector {
        PriceCollector::new(self.store.clone(), self.provider.clone())
            .with_request_delay(self.config.price.request_delay())
    }

    pub fn fundamental_collector(&self) -> FundamentalCollector {
        FundamentalCollector::new(self.store.clone(), self.provider.clone())
    }

    pub fn news_collector(&self) -> NewsCollector {
        NewsCollector::new(self.store.clone(), self.scrapers.clone(), self.provider.clone())
    }

    pub fn news_processor(&self) -> NewsProcessor {
        NewsProcessor::new(self.store.clone())
    }

    pub fn technical_processor(&self) -> TechnicalAnalysisProcessor {
        TechnicalAnalysisProcessor::new(self.store.clone())
    }

    /// 설정된 요약 모델, 없으면 기본 모델
    pub fn summarizer(&self, model: Option<&str>) -> Result<Arc<dyn Summarizer>> {
        let summarizer = match model.or(self.config.news.summary_model.as_deref()) {
            Some(name) => self.summarizers.get(name)?,
            None => self.summarizers.default_summarizer()?,
        };
        Ok(summarizer)
    }
}

/// 등록 가능한 작업 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum JobKind {
    Headlines,
    Articles,
    Prices,
    TechnicalAnalysis,
    Fundamentals,
    WordsCount,
    Summaries,
    Sentiment,
}

impl JobKind {
    pub const ALL: [JobKind; 8] = [
        JobKind::Headlines,
        JobKind::Articles,
        JobKind::Prices,
        JobKind::TechnicalAnalysis,
        JobKind::Fundamentals,
        JobKind::WordsCount,
        JobKind::Summaries,
        JobKind::Sentiment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Headlines => "collect_headlines",
            JobKind::Articles => "collect_articles",
            JobKind::Prices => "collect_prices",
            JobKind::TechnicalAnalysis => "calculate_technical_analysis",
            JobKind::Fundamentals => "collect_fundamentals",
            JobKind::WordsCount => "populate_words_count",
            JobKind::Summaries => "populate_summaries",
            JobKind::Sentiment => "populate_sentiment",
        }
    }

    /// 작업을 실행합니다.
    pub async fn run(self, ctx: &JobContext) {
        match self {
            JobKind::Headlines => collect_headlines(ctx).await,
            JobKind::Articles => collect_articles(ctx).await,
            JobKind::Prices => collect_prices(ctx).await,
            JobKind::TechnicalAnalysis => calculate_technical_analysis(ctx).await,
            JobKind::Fundamentals => collect_fundamentals(ctx).await,
            JobKind::WordsCount => populate_words_count(ctx).await,
            JobKind::Summaries => populate_summaries(ctx).await,
            JobKind::Sentiment => populate_sentiment(ctx).await,
        }
    }
}

/// 설정된 소스의 헤드라인 수집
pub async fn collect_headlines(ctx: &JobContext) {
    let source = ctx.config.news.headline_source.as_str();
    tracing::info!(job = JobKind::Headlines.name(), source = source, "작업 시작");

    match ctx
        .news_collector()
        .collect_news_headlines_by_source(source)
        .await
    {
        Ok(stats) => stats.log_summary(JobKind::Headlines.name()),
        Err(e) => tracing::error!(job = JobKind::Headlines.name(), error = %e, "작업 실패"),
    }
}

/// 본문 없는 뉴스의 본문 수집
pub async fn collect_articles(ctx: &JobContext) {
    tracing::info!(job = JobKind::Articles.name(), "작업 시작");

    match ctx
        .news_collector()
        .collect_news_articles(ctx.config.news.article_limit)
        .await
    {
        Ok(stats) => stats.log_summary(JobKind::Articles.name()),
        Err(e) => tracing::error!(job = JobKind::Articles.name(), error = %e, "작업 실패"),
    }
}

pub async fn collect_prices(ctx: &JobContext) {
    let period = ctx.config.price.scheduled_period.as_str();
    tracing::info!(job = JobKind::Prices.name(), period = period, "작업 시작");

    match ctx
        .price_collector()
        .collect_historical_prices_all(period)
        .await
    {
        Ok(stats) => stats.log_summary(JobKind::Prices.name()),
        Err(e) => tracing::error!(job = JobKind::Prices.name(), error = %e, "작업 실패"),
    }
}

/// 시장 시간대 기준 최근 구간의 기술적 분석
pub async fn calculate_technical_analysis(ctx: &JobContext) {
    let today = Utc::now()
        .with_timezone(&ctx.config.technical.market_timezone)
        .date_naive();
    let start = today - chrono::Duration::days(ctx.config.technical.window_days);
    tracing::info!(
        job = JobKind::TechnicalAnalysis.name(),
        start = %start,
        end = %today,
        "작업 시작"
    );

    match ctx
        .technical_processor()
        .calculate_and_store_technical_analysis_all(Some(start), Some(today))
        .await
    {
        Ok(stats) => stats.log_summary(JobKind::TechnicalAnalysis.name()),
        Err(e) => {
            tracing::error!(job = JobKind::TechnicalAnalysis.name(), error = %e, "작업 실패")
        }
    }
}

pub async fn collect_fundamentals(ctx: &JobContext) {
    tracing::info!(job = JobKind::Fundamentals.name(), "작업 시작");

    match ctx
        .fundamental_collector()
        .collect_fundamental_data_all()
        .await
    {
        Ok(stats) => stats.log_summary(JobKind::Fundamentals.name()),
        Err(e) => tracing::error!(job = JobKind::Fundamentals.name(), error = %e, "작업 실패"),
    }
}

pub async fn populate_words_count(ctx: &JobContext) {
    tracing::info!(job = JobKind::WordsCount.name(), "작업 시작");

    match ctx
        .news_processor()
        .populate_words_count(ctx.config.news.words_batch_size)
        .await
    {
        Ok(total) => tracing::info!(job = JobKind::WordsCount.name(), updated = total, "작업 완료"),
        Err(e) => tracing::error!(job = JobKind::WordsCount.name(), error = %e, "작업 실패"),
    }
}

pub async fn populate_summaries(ctx: &JobContext) {
    tracing::info!(job = JobKind::Summaries.name(), "작업 시작");

    let summarizer = match ctx.summarizer(None) {
        Ok(summarizer) => summarizer,
        Err(e) => {
            tracing::error!(job = JobKind::Summaries.name(), error = %e, "요약 모델 없음");
            return;
        }
    };

    let news = &ctx.config.news;
    match ctx
        .news_processor()
        .populate_content_summary(
            news.summary_min_words,
            news.summary_max_tokens,
            news.summary_limit,
            summarizer.as_ref(),
        )
        .await
    {
        Ok((count, ids)) => tracing::info!(
            job = JobKind::Summaries.name(),
            model = summarizer.name(),
            updated = count,
            ids = ?ids,
            "작업 완료"
        ),
        Err(e) => tracing::error!(job = JobKind::Summaries.name(), error = %e, "작업 실패"),
    }
}

pub async fn populate_sentiment(ctx: &JobContext) {
    tracing::info!(job = JobKind::Sentiment.name(), "작업 시작");

    match ctx
        .news_processor()
        .populate_sentiment_scores(ctx.config.news.sentiment_limit, ctx.sentiment.as_ref())
        .await
    {
        Ok((count, ids)) => tracing::info!(
            job = JobKind::Sentiment.name(),
            updated = count,
            ids = ?ids,
            "작업 완료"
        ),
        Err(e) => tracing::error!(job = JobKind::Sentiment.name(), error = %e, "작업 실패"),
    }
}

/// 작업별 트리거 주기
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// 고정 간격
    Every(Duration),
    /// cron 표현식 (초 포함, UTC)
    Cron(String),
}

impl JobKind {
    /// 스케줄러 설정에서 이 작업의 트리거를 찾습니다.
    pub fn trigger(&self, config: &CollectorConfig) -> Trigger {
        let s = &config.scheduler;
        match self {
            JobKind::Headlines => Trigger::Every(s.headlines_interval()),
            JobKind::Articles => Trigger::Every(s.articles_interval()),
            JobKind::Prices => Trigger::Cron(s.prices_cron.clone()),
            JobKind::TechnicalAnalysis => Trigger::Cron(s.technical_cron.clone()),
            JobKind::Fundamentals => Trigger::Cron(s.fundamentals_cron.clone()),
            JobKind::WordsCount => Trigger::Cron(s.words_count_cron.clone()),
            JobKind::Summaries => Trigger::Every(s.summaries_interval()),
            JobKind::Sentiment => Trigger::Every(s.sentiment_interval()),
        }
    }
}
