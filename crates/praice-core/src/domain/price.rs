//! 일봉 가격 데이터.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 외부 소스에서 정규화된 일봉 한 개.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    pub dividends: Decimal,
    pub stock_splits: Decimal,
}

impl PriceBar {
    /// 배당/분할이 없는 일봉.
    pub fn ohlcv(
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: i64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            dividends: Decimal::ZERO,
            stock_splits: Decimal::ZERO,
        }
    }

    /// 업서트 결과 보고에 쓰이는 자연 키.
    pub fn key(&self) -> String {
        self.date.to_string()
    }
}

/// 저장된 일봉 (`(symbol_id, date)` 고유).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPrice {
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

impl HistoricalPrice {
    pub fn from_bar(symbol_id: i64, bar: &PriceBar) -> Self {
        Self {
            symbol_id,
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            dividends: bar.dividends,
            stock_splits: bar.stock_splits,
        }
    }

    pub fn to_bar(&self) -> PriceBar {
        PriceBar {
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            dividends: self.dividends,
            stock_splits: self.stock_splits,
        }
    }
}

/// 가격 수집 요청 (상대 기간 또는 날짜 범위).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceRequest {
    /// "1d", "5d", "1mo", "max" 등 상대 기간
    Period(String),
    /// 시작/종료일 (양끝 포함)
    Range { start: NaiveDate, end: NaiveDate },
}

impl PriceRequest {
    pub fn period(period: impl Into<String>) -> Self {
        PriceRequest::Period(period.into())
    }
}

impl Default for PriceRequest {
    fn default() -> Self {
        PriceRequest::Period("max".to_string())
    }
}
