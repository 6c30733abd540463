//! 재무 데이터 수집기.
//!
//! 재무제표 4종을 보고일 기준으로 합쳐 날짜별 JSON 객체로 저장합니다.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use praice_core::text::to_snake_label;
use praice_core::Period;
use praice_data::{MarketDataProvider, StatementSet, Store, UpsertReport};
use serde_json::{Map, Number, Value};

use crate::{CollectionStats, Result};

/// 재무제표 4종을 날짜별 `{label: value | null}`로 변환합니다.
///
/// - 네 테이블 모두에 존재하는 보고일만 남깁니다.
/// - 항목명은 lower_snake_case로 정규화합니다.
/// - 값이 없거나 유한하지 않으면 `null`입니다.
/// - 결과는 날짜 내림차순입니다.
pub fn process_statements(set: &StatementSet) -> Vec<(NaiveDate, Map<String, Value>)> {
    let tables = set.tables();

    let mut common: Option<BTreeSet<NaiveDate>> = None;
    for table in tables {
        let dates = table.dates();
        common = Some(match common {
            None => dates,
            Some(acc) => acc.intersection(&dates).copied().collect(),
        });
    }
    let common = common.unwrap_or_default();

    common
        .into_iter()
        .rev()
        .map(|date| {
            let mut data = Map::new();
            for table in tables {
                for (label, values) in &table.rows {
                    let value = values
                        .get(&date)
                        .copied()
                        .flatten()
                        .and_then(Number::from_f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null);
                    data.insert(to_snake_label(label), value);
                }
            }
            (date, data)
        })
        .collect()
}

/// 연간/분기 재무 데이터 수집기
pub struct FundamentalCollector {
    store: Arc<dyn Store>,
    provider: Arc<dyn MarketDataProvider>,
}

impl FundamentalCollector {
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { store, provider }
    }

    /// 한 심볼의 연간/분기 재무 데이터를 수집해 저장합니다.
    pub async fn collect_fundamental_data(&self, code: &str) -> Result<UpsertReport> {
        let symbol = self.store.get_symbol(code).await?;
        tracing::info!(symbol = %symbol.symbol, "재무 데이터 수집 시작");

        let mut report = UpsertReport::default();
        for period in Period::ALL {
            let statements = self.provider.fetch_statements(&symbol.symbol, period).await?;
            let entries = process_statements(&statements);

            if entries.is_empty() {
                tracing::warn!(symbol = %symbol.symbol, period = %period, "공통 보고일 없음");
                continue;
            }

            let period_report = self
                .store
                .bulk_upsert_fundamentals(&symbol.symbol, &entries, period)
                .await?;
            tracing::debug!(
                symbol = %symbol.symbol,
                period = %period,
                dates = entries.len(),
                upserted = period_report.upserted,
                "재무 데이터 저장"
            );
            report.absorb(period_report);
        }

        tracing::info!(
            symbol = %symbol.symbol,
            upserted = report.upserted,
            skipped = report.skipped.len(),
            "재무 데이터 수집 완료"
        );
        Ok(report)
    }

    /// `collect_fundamental_data`가 켜진 활성 심볼 전체를 수집합니다.
    pub async fn collect_fundamental_data_all(&self) -> Result<CollectionStats> {
        let start = Instant::now();
        let mut stats = CollectionStats::new();

        let targets: Vec<String> = self
            .store
            .list_symbol_configs()
            .await?
            .into_iter()
            .filter(|(symbol, config)| symbol.is_active && config.collect_fundamental_data)
            .map(|(symbol, _)| symbol.symbol)
            .collect();

        for code in &targets {
            stats.total += 1;
            match self.collect_fundamental_data(code).await {
                Ok(report) if report.total() == 0 => stats.empty += 1,
                Ok(report) => {
                    stats.success += 1;
                    stats.records += report.upserted;
                    stats.skipped_records += report.skipped.len();
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::error!(symbol = %code, error = %e, "재무 데이터 수집 실패");
                }
            }
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use praice_data::StatementTable;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(label: &str, values: &[(NaiveDate, Option<f64>)]) -> StatementTable {
        let mut table = StatementTable::new();
        for (d, v) in values {
            table.insert(label, *d, *v);
        }
        table
    }

    #[test]
    fn test_common_dates_descending_with_snake_labels() {
        let d1 = date(2022, 12, 31);
        let d2 = date(2023, 12, 31);
        let d3 = date(2021, 12, 31);

        let set = StatementSet {
            income: table("Net Income", &[(d1, Some(10.0)), (d2, Some(12.0))]),
            balance_sheet: table("TotalAssets", &[(d1, Some(100.0)), (d2, Some(110.0))]),
            cash_flow: table("Free Cash Flow", &[(d1, Some(5.0)), (d2, Some(f64::NAN))]),
            financials: table(
                "Gross Profit",
                &[(d1, Some(50.0)), (d2, None), (d3, Some(1.0))],
            ),
        };

        let result = process_statements(&set);
        let dates: Vec<NaiveDate> = result.iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![d2, d1]);

        let latest = &result[0].1;
        assert_eq!(latest["net_income"], Value::from(12.0));
        assert_eq!(latest["total_assets"], Value::from(110.0));
        assert_eq!(latest["free_cash_flow"], Value::Null);
        assert_eq!(latest["gross_profit"], Value::Null);
        assert_eq!(latest.len(), 4);
    }

    #[test]
    fn test_missing_table_yields_no_dates() {
        let d1 = date(2023, 12, 31);
        let set = StatementSet {
            income: table("Net Income", &[(d1, Some(1.0))]),
            balance_sheet: table("Total Assets", &[(d1, Some(1.0))]),
            cash_flow: table("Free Cash Flow", &[(d1, Some(1.0))]),
            financials: StatementTable::new(),
        };

        assert!(process_statements(&set).is_empty());
    }

    #[test]
    fn test_label_missing_on_date_is_null() {
        let d1 = date(2023, 6, 30);
        let d2 = date(2023, 9, 30);
        let mut income = table("Net Income", &[(d1, Some(1.0)), (d2, Some(2.0))]);
        income.insert("Tax Provision", d2, Some(0.5));

        let set = StatementSet {
            income,
            balance_sheet: table("Total Assets", &[(d1, Some(1.0)), (d2, Some(1.0))]),
            cash_flow: table("Free Cash Flow", &[(d1, Some(1.0)), (d2, Some(1.0))]),
            financials: table("Gross Profit", &[(d1, Some(1.0)), (d2, Some(1.0))]),
        };

        let result = process_statements(&set);
        let older = &result[1].1;
        assert_eq!(result[1].0, d1);
        assert_eq!(older["tax_provision"], Value::Null);
        assert_eq!(result[0].1["tax_provision"], Value::from(0.5));
    }
}
