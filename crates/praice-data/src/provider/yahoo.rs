//! Yahoo Finance Provider.
//!
//! - 가격: `yahoo_finance_api` (상대 기간 `get_quote_range`, 날짜 범위 `get_quote_history_interval`)
//! - 심볼 정보: 검색 API (`/v1/finance/search`)
//! - 재무제표: fundamentals-timeseries API

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use praice_core::{Period, PriceBar, PriceRequest, SymbolInfo};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{MarketDataProvider, ProviderError, ProviderResult, StatementSet, StatementTable};

const DEFAULT_SEARCH_URL: &str = "https://query1.finance.yahoo.com/v1/finance/search";
const DEFAULT_TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";

/// 재무제표 조회 시작 시점 (1985-08-22, Unix 초).
const TIMESERIES_START: i64 = 493_590_046;

/// 손익계산서 항목.
const INCOME_ITEMS: &[&str] = &[
    "TotalRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingExpense",
    "OperatingIncome",
    "NetIncome",
    "BasicEPS",
    "DilutedEPS",
    "EBIT",
    "EBITDA",
    "InterestExpense",
    "TaxProvision",
    "ResearchAndDevelopment",
    "SellingGeneralAndAdministration",
];

/// 재무상태표 항목.
const BALANCE_SHEET_ITEMS: &[&str] = &[
    "TotalAssets",
    "TotalLiabilitiesNetMinorityInterest",
    "StockholdersEquity",
    "CurrentAssets",
    "CurrentLiabilities",
    "CashAndCashEquivalents",
    "Inventory",
    "AccountsReceivable",
    "TotalDebt",
    "LongTermDebt",
    "RetainedEarnings",
    "ShareIssued",
];

/// 현금흐름표 항목.
const CASH_FLOW_ITEMS: &[&str] = &[
    "OperatingCashFlow",
    "InvestingCashFlow",
    "FinancingCashFlow",
    "FreeCashFlow",
    "CapitalExpenditure",
    "RepurchaseOfCapitalStock",
    "CashDividendsPaid",
    "EndCashPosition",
];

/// 종합 재무 지표 항목.
const FINANCIALS_ITEMS: &[&str] = &[
    "NormalizedIncome",
    "NormalizedEBITDA",
    "NetIncomeCommonStockholders",
    "BasicAverageShares",
    "DilutedAverageShares",
    "TotalExpenses",
    "ReconciledDepreciation",
];

/// Yahoo Finance 기반 시장 데이터 Provider.
pub struct YahooProvider {
    connector: yahoo_finance_api::YahooConnector,
    client: reqwest::Client,
    search_url: String,
    timeseries_url: String,
}

impl YahooProvider {
    /// 기본 엔드포인트로 Provider를 생성합니다.
    pub fn new() -> ProviderResult<Self> {
        Self::with_endpoints(DEFAULT_SEARCH_URL, DEFAULT_TIMESERIES_URL)
    }

    /// 검색/재무제표 엔드포인트를 지정하여 생성합니다.
    pub fn with_endpoints(
        search_url: impl Into<String>,
        timeseries_url: impl Into<String>,
    ) -> ProviderResult<Self> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| ProviderError::Api(format!("Yahoo Finance 연결 실패: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0")
            .build()?;

        Ok(Self {
            connector,
            client,
            search_url: search_url.into(),
            timeseries_url: timeseries_url.into(),
        })
    }

    async fn fetch_statement_table(
        &self,
        code: &str,
        period: Period,
        items: &[&str],
    ) -> ProviderResult<StatementTable> {
        let prefix = timeseries_prefix(period);
        let types = items
            .iter()
            .map(|item| format!("{}{}", prefix, item))
            .collect::<Vec<_>>()
            .join(",");
        let period2 = Utc::now().timestamp().to_string();

        let body: Value = self
            .client
            .get(format!("{}/{}", self.timeseries_url, code))
            .query(&[
                ("symbol", code),
                ("type", types.as_str()),
                ("period1", TIMESERIES_START.to_string().as_str()),
                ("period2", period2.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_timeseries(&body, prefix)
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_prices(
        &self,
        code: &str,
        request: &PriceRequest,
    ) -> ProviderResult<Vec<PriceBar>> {
        let response = match request {
            PriceRequest::Period(period) => {
                debug!(symbol = code, period = %period, "Yahoo Finance 기간 조회");
                self.connector
                    .get_quote_range(code, "1d", period)
                    .await
            }
            PriceRequest::Range { start, end } => {
                if start > end {
                    return Err(ProviderError::InvalidRequest(format!(
                        "시작일 {}이 종료일 {}보다 늦습니다",
                        start, end
                    )));
                }
                debug!(symbol = code, start = %start, end = %end, "Yahoo Finance 날짜 범위 조회");
                // 종료일 포함을 위해 하루 뒤 자정까지 요청
                let end_exclusive = end.succ_opt().unwrap_or(*end);
                self.connector
                    .get_quote_history_interval(
                        code,
                        naive_date_to_offset_datetime(*start)?,
                        naive_date_to_offset_datetime(end_exclusive)?,
                        "1d",
                    )
                    .await
            }
        }
        .map_err(|e| ProviderError::Api(format!("{} 가격 조회 실패: {}", code, e)))?;

        let quotes = response
            .quotes()
            .map_err(|e| ProviderError::Parse(format!("Quote 파싱 오류: {}", e)))?;

        // 이벤트가 없는 응답은 오류로 보고되므로 빈 목록으로 처리
        let dividends: HashMap<NaiveDate, Decimal> = response
            .dividends()
            .unwrap_or_default()
            .iter()
            .filter_map(|d| {
                let date = timestamp_to_date(d.date as i64)?;
                Some((date, Decimal::from_f64_retain(d.amount as f64)?))
            })
            .collect();
        let splits: HashMap<NaiveDate, Decimal> = response
            .splits()
            .unwrap_or_default()
            .iter()
            .filter_map(|s| {
                let date = timestamp_to_date(s.date as i64)?;
                let denominator = s.denominator as f64;
                if denominator == 0.0 {
                    return None;
                }
                Some((date, Decimal::from_f64_retain(s.numerator as f64 / denominator)?))
            })
            .collect();

        let mut bars: Vec<PriceBar> = quotes
            .iter()
            .filter_map(|q| {
                let date = timestamp_to_date(q.timestamp as i64)?;
                let bar = PriceBar {
                    date,
                    open: Decimal::from_f64_retain(q.open)?,
                    high: Decimal::from_f64_retain(q.high)?,
                    low: Decimal::from_f64_retain(q.low)?,
                    close: Decimal::from_f64_retain(q.close)?,
                    volume: q.volume as i64,
                    dividends: dividends.get(&date).copied().unwrap_or_default(),
                    stock_splits: splits.get(&date).copied().unwrap_or_default(),
                };
                Some(bar)
            })
            .collect();

        if let PriceRequest::Range { start, end } = request {
            bars.retain(|b| b.date >= *start && b.date <= *end);
        }
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);

        Ok(bars)
    }

    async fn fetch_symbol_info(&self, code: &str) -> ProviderResult<Option<SymbolInfo>> {
        let data: SearchResponse = self
            .client
            .get(&self.search_url)
            .query(&[("q", code), ("quotesCount", "10"), ("newsCount", "0")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let info = data
            .quotes
            .unwrap_or_default()
            .into_iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(code))
            .map(|q| SymbolInfo {
                symbol: q.symbol,
                long_name: q.long_name,
                short_name: q.short_name,
                quote_type: q.quote_type,
                sector: q.sector,
                industry: q.industry,
                exchange: q.exchange,
            });

        if info.is_none() {
            warn!(symbol = code, "Yahoo 검색 결과에 일치하는 심볼 없음");
        }
        Ok(info)
    }

    async fn fetch_statements(&self, code: &str, period: Period) -> ProviderResult<StatementSet> {
        Ok(StatementSet {
            income: self.fetch_statement_table(code, period, INCOME_ITEMS).await?,
            balance_sheet: self
                .fetch_statement_table(code, period, BALANCE_SHEET_ITEMS)
                .await?,
            cash_flow: self.fetch_statement_table(code, period, CASH_FLOW_ITEMS).await?,
            financials: self.fetch_statement_table(code, period, FINANCIALS_ITEMS).await?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    quotes: Option<Vec<SearchQuote>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuote {
    symbol: String,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default, alias = "longname")]
    long_name: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default)]
    quote_type: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
}

fn timeseries_prefix(period: Period) -> &'static str {
    match period {
        Period::Annual => "annual",
        Period::Quarterly => "quarterly",
    }
}

/// fundamentals-timeseries 응답을 항목별 테이블로 변환합니다.
///
/// 각 결과는 `meta.type[0]`(예: `annualTotalRevenue`)을 키로 하는 배열에
/// `{asOfDate, reportedValue: {raw}}` 항목을 담고 있습니다. `null` 항목은 건너뜁니다.
pub(crate) fn parse_timeseries(body: &Value, prefix: &str) -> ProviderResult<StatementTable> {
    let results = body
        .pointer("/timeseries/result")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Parse("timeseries.result 필드 없음".to_string()))?;

    let mut table = StatementTable::new();

    for result in results {
        let Some(type_name) = result.pointer("/meta/type/0").and_then(Value::as_str) else {
            continue;
        };
        let label = type_name.strip_prefix(prefix).unwrap_or(type_name);
        let Some(points) = result.get(type_name).and_then(Value::as_array) else {
            continue;
        };

        for point in points.iter().filter(|p| !p.is_null()) {
            let Some(date) = point
                .get("asOfDate")
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            else {
                continue;
            };
            let value = point
                .pointer("/reportedValue/raw")
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite());
            table.insert(label, date, value);
        }
    }

    Ok(table)
}

fn timestamp_to_date(timestamp: i64) -> Option<NaiveDate> {
    Utc.timestamp_opt(timestamp, 0).single().map(|dt| dt.date_naive())
}

/// NaiveDate를 OffsetDateTime(UTC 자정)으로 변환.
fn naive_date_to_offset_datetime(date: NaiveDate) -> ProviderResult<OffsetDateTime> {
    let month = time::Month::try_from(date.month() as u8)
        .map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;
    let day = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
        .map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;
    Ok(day.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timeseries() {
        let body = json!({
            "timeseries": {
                "result": [
                    {
                        "meta": {"symbol": ["AAPL"], "type": ["annualTotalRevenue"]},
                        "timestamp": [1672444800, 1703980800],
                        "annualTotalRevenue": [
                            {"asOfDate": "2022-09-30", "reportedValue": {"raw": 394328000000.0}},
                            null,
                            {"asOfDate": "2023-09-30", "reportedValue": {"raw": 383285000000.0}}
                        ]
                    },
                    {
                        "meta": {"symbol": ["AAPL"], "type": ["annualNetIncome"]},
                        "annualNetIncome": [
                            {"asOfDate": "2023-09-30", "reportedValue": {"fmt": "n/a"}}
                        ]
                    },
                    {
                        "meta": {"symbol": ["AAPL"], "type": ["annualEBITDA"]}
                    }
                ]
            }
        });

        let table = parse_timeseries(&body, "annual").unwrap();
        let d2023 = NaiveDate::from_ymd_opt(2023, 9, 30).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows["TotalRevenue"].len(), 2);
        assert_eq!(table.rows["TotalRevenue"][&d2023], Some(383285000000.0));
        assert_eq!(table.rows["NetIncome"][&d2023], None);
    }

    #[test]
    fn test_parse_timeseries_rejects_malformed() {
        assert!(parse_timeseries(&json!({"error": "x"}), "annual").is_err());
    }

    #[test]
    fn test_naive_date_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let odt = naive_date_to_offset_datetime(date).unwrap();
        assert_eq!(odt.unix_timestamp(), 1_704_153_600);
        assert_eq!(timestamp_to_date(1_704_153_600), Some(date));
    }

    #[tokio::test]
    async fn test_fetch_symbol_info_exact_match() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "quotes": [
                        {"symbol": "MSFTX", "shortName": "Other"},
                        {
                            "symbol": "MSFT",
                            "shortName": "Microsoft",
                            "longname": "Microsoft Corporation",
                            "quoteType": "EQUITY",
                            "exchange": "NMS",
                            "sector": "Technology",
                            "industry": "Software-Infrastructure"
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = YahooProvider::with_endpoints(
            format!("{}/search", server.url()),
            format!("{}/timeseries", server.url()),
        )
        .unwrap();

        let info = provider.fetch_symbol_info("msft").await.unwrap().unwrap();
        assert_eq!(info.symbol, "MSFT");
        assert_eq!(info.long_name.as_deref(), Some("Microsoft Corporation"));
        assert_eq!(info.quote_type.as_deref(), Some("EQUITY"));
        mock.assert_async().await;
    }

    #[tokio::test]
    #[ignore] // 실제 Yahoo Finance 호출
    async fn test_fetch_prices_live() {
        let provider = YahooProvider::new().unwrap();
        let bars = provider
            .fetch_prices("AAPL", &PriceRequest::period("5d"))
            .await
            .unwrap();
        assert!(!bars.is_empty());
    }
}
