//! DB 행 ↔ 도메인 타입 변환.
//!
//! 열거형 컬럼은 TEXT로 저장되므로 읽을 때 파싱이 필요합니다.

use chrono::{DateTime, NaiveDate, Utc};
use praice_core::{
    FundamentalData, HistoricalPrice, News, NewsSymbol, ScrapingUrl, Symbol, SymbolConfig,
    TechnicalAnalysis,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::error::DataError;

#[derive(Debug, FromRow)]
pub(super) struct SymbolRow {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub asset_class: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SymbolRow> for Symbol {
    type Error = DataError;

    fn try_from(row: SymbolRow) -> Result<Self, Self::Error> {
        Ok(Symbol {
            id: row.id,
            symbol: row.symbol,
            name: row.name,
            asset_class: row.asset_class.parse()?,
            sector: row.sector,
            industry: row.industry,
            exchange: row.exchange,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct SymbolConfigRow {
    pub id: i64,
    pub symbol_id: i64,
    pub collect_price_data: bool,
    pub collect_yfinance_news: bool,
    pub collect_technical_indicators: bool,
    pub collect_fundamental_data: bool,
}

impl From<SymbolConfigRow> for SymbolConfig {
    fn from(row: SymbolConfigRow) -> Self {
        SymbolConfig {
            id: row.id,
            symbol_id: row.symbol_id,
            collect_price_data: row.collect_price_data,
            collect_yfinance_news: row.collect_yfinance_news,
            collect_technical_indicators: row.collect_technical_indicators,
            collect_fundamental_data: row.collect_fundamental_data,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ScrapingUrlRow {
    pub id: i64,
    pub symbol_id: i64,
    pub url: String,
    pub source: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScrapingUrlRow> for ScrapingUrl {
    fn from(row: ScrapingUrlRow) -> Self {
        ScrapingUrl {
            id: row.id,
            symbol_id: row.symbol_id,
            url: row.url,
            source: row.source,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct NewsRow {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: String,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub words_count: Option<i32>,
    pub content_summary: Option<String>,
    pub sentiment_score: Option<f64>,
    pub article_attempted_at: Option<DateTime<Utc>>,
    pub summary_attempted_at: Option<DateTime<Utc>>,
    pub sentiment_attempted_at: Option<DateTime<Utc>>,
}

impl From<NewsRow> for News {
    fn from(row: NewsRow) -> Self {
        News {
            id: row.id,
            title: row.title,
            url: row.url,
            source: row.source,
            content: row.content,
            published_at: row.published_at,
            scraped_at: row.scraped_at,
            words_count: row.words_count,
            content_summary: row.content_summary,
            sentiment_score: row.sentiment_score,
            article_attempted_at: row.article_attempted_at,
            summary_attempted_at: row.summary_attempted_at,
            sentiment_attempted_at: row.sentiment_attempted_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct NewsSymbolRow {
    pub id: i64,
    pub news_id: i64,
    pub symbol_id: i64,
}

impl From<NewsSymbolRow> for NewsSymbol {
    fn from(row: NewsSymbolRow) -> Self {
        NewsSymbol {
            id: row.id,
            news_id: row.news_id,
            symbol_id: row.symbol_id,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct PriceRow {
    pub symbol_id: i64,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    pub dividends: Decimal,
    pub stock_splits: Decimal,
}

impl From<PriceRow> for HistoricalPrice {
    fn from(row: PriceRow) -> Self {
        HistoricalPrice {
            symbol_id: row.symbol_id,
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            dividends: row.dividends,
            stock_splits: row.stock_splits,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct AnalysisRow {
    pub symbol_id: i64,
    pub date: NaiveDate,
    pub timeframe: String,
    pub technical_indicators: Json<Map<String, Value>>,
    pub candlestick_patterns: Json<Map<String, Value>>,
}

impl TryFrom<AnalysisRow> for TechnicalAnalysis {
    type Error = DataError;

    fn try_from(row: AnalysisRow) -> Result<Self, Self::Error> {
        Ok(TechnicalAnalysis {
            symbol_id: row.symbol_id,
            date: row.date,
            timeframe: row.timeframe.parse()?,
            technical_indicators: row.technical_indicators.0,
            candlestick_patterns: row.candlestick_patterns.0,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct FundamentalRow {
    pub symbol_id: i64,
    pub date: NaiveDate,
    pub period: String,
    pub data: Json<Map<String, Value>>,
}

impl TryFrom<FundamentalRow> for FundamentalData {
    type Error = DataError;

    fn try_from(row: FundamentalRow) -> Result<Self, Self::Error> {
        Ok(FundamentalData {
            symbol_id: row.symbol_id,
            date: row.date,
            period: row.period.parse()?,
            data: row.data.0,
        })
    }
}

/// 행 목록을 도메인 타입으로 변환합니다.
pub(super) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DataError>
where
    T: TryFrom<R, Error = DataError>,
{
    rows.into_iter().map(T::try_from).collect()
}
