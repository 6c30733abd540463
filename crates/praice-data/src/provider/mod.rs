//! 외부 시장 데이터 Provider.
//!
//! 가격 이력, 심볼 메타데이터, 재무제표를 가져오는 Provider를 정의합니다.
//!
//! ## Yahoo Finance
//! - `YahooProvider`: `yahoo_finance_api` 기반 일봉(배당/분할 포함)
//! - 검색 API 기반 심볼 정보 조회
//! - fundamentals-timeseries API 기반 재무제표 4종

pub mod yahoo;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use praice_core::{Period, PriceBar, PriceRequest, SymbolInfo};
use thiserror::Error;

use crate::error::DataError;

pub use yahoo::YahooProvider;

/// Provider 오류.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP 요청 실패
    #[error("HTTP 요청 실패: {0}")]
    Http(#[from] reqwest::Error),

    /// Yahoo Finance API 오류
    #[error("Yahoo Finance API 오류: {0}")]
    Api(String),

    /// 응답 파싱 실패
    #[error("응답 파싱 실패: {0}")]
    Parse(String),

    /// 잘못된 요청 (기간 문자열, 날짜 범위 등)
    #[error("잘못된 요청: {0}")]
    InvalidRequest(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl From<ProviderError> for DataError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Parse(msg) => DataError::ParseError(msg),
            ProviderError::InvalidRequest(msg) => DataError::Validation(msg),
            other => DataError::FetchError(other.to_string()),
        }
    }
}

/// 재무제표 한 종류 (항목명 → 날짜 → 값).
///
/// 항목명은 소스 원본(CamelCase 등)을 유지하며, 정규화는 수집기에서 수행합니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementTable {
    pub rows: BTreeMap<String, BTreeMap<NaiveDate, Option<f64>>>,
}

impl StatementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, date: NaiveDate, value: Option<f64>) {
        self.rows.entry(label.into()).or_default().insert(date, value);
    }

    /// 테이블에 등장하는 모든 보고일.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.rows.values().flat_map(|cols| cols.keys().copied()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 한 보고 주기의 재무제표 4종.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementSet {
    pub income: StatementTable,
    pub balance_sheet: StatementTable,
    pub cash_flow: StatementTable,
    pub financials: StatementTable,
}

impl StatementSet {
    /// 병합 순서대로 테이블을 반환합니다.
    pub fn tables(&self) -> [&StatementTable; 4] {
        [
            &self.financials,
            &self.balance_sheet,
            &self.cash_flow,
            &self.income,
        ]
    }
}

/// 시장 데이터 Provider trait.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider 이름.
    fn name(&self) -> &str;

    /// 일봉 이력 조회 (날짜 오름차순).
    async fn fetch_prices(&self, code: &str, request: &PriceRequest)
        -> ProviderResult<Vec<PriceBar>>;

    /// 심볼 메타데이터 조회. 정확히 일치하는 결과가 없으면 `None`.
    async fn fetch_symbol_info(&self, code: &str) -> ProviderResult<Option<SymbolInfo>>;

    /// 재무제표 4종 조회.
    async fn fetch_statements(&self, code: &str, period: Period) -> ProviderResult<StatementSet>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_table_dates() {
        let d1 = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();

        let mut table = StatementTable::new();
        table.insert("TotalRevenue", d1, Some(10.0));
        table.insert("NetIncome", d2, None);

        assert_eq!(table.dates().into_iter().collect::<Vec<_>>(), vec![d2, d1]);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: DataError = ProviderError::InvalidRequest("period".to_string()).into();
        assert!(matches!(err, DataError::Validation(_)));

        let err: DataError = ProviderError::Api("down".to_string()).into();
        assert!(matches!(err, DataError::FetchError(_)));
    }
}
