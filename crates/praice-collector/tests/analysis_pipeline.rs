//! 기술적 분석 / 재무 데이터 통합 테스트.

mod common;

use std::sync::Arc;

use common::{date, rising_bars, MockProvider};
use praice_collector::{FundamentalCollector, TechnicalAnalysisProcessor};
use praice_core::{
    AssetClass, NewSymbol, Period, SymbolConfigUpdate, TaEntry, Timeframe,
};
use praice_data::{
    AnalysisStore, FundamentalStore, MemoryStore, PriceStore, StatementSet, Store, SymbolStore,
};
use serde_json::{json, Map, Value};

async fn store_with_symbols(codes: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for code in codes {
        store
            .add_symbol(NewSymbol::new(*code, *code, AssetClass::Stock))
            .await
            .unwrap();
        store.get_or_create_symbol_config(code).await.unwrap();
    }
    store
}

// =============================================================================
// Technical analysis
// =============================================================================

#[tokio::test]
async fn test_technical_analysis_merges_into_existing_row() {
    let store = store_with_symbols(&["AAPL"]).await;
    store
        .bulk_upsert_prices("AAPL", &rising_bars(date(2024, 1, 1), 30))
        .await
        .unwrap();

    let mut custom = Map::new();
    custom.insert("CUSTOM_SIGNAL".to_string(), json!(1.5));
    store
        .bulk_upsert_technical_analysis(
            "AAPL",
            &[(
                date(2024, 1, 20),
                TaEntry {
                    technical_indicators: custom,
                    candlestick_patterns: Map::new(),
                },
            )],
            Timeframe::D1,
        )
        .await
        .unwrap();

    let processor = TechnicalAnalysisProcessor::new(store.clone() as Arc<dyn Store>);
    let report = processor
        .calculate_and_store_technical_analysis(
            "AAPL",
            Some(date(2024, 1, 20)),
            Some(date(2024, 1, 25)),
            Timeframe::D1,
        )
        .await
        .unwrap();
    assert_eq!(report.upserted, 6);

    let row = store
        .get_technical_analysis("AAPL", date(2024, 1, 20), Timeframe::D1)
        .await
        .unwrap();
    assert_eq!(row.technical_indicators["CUSTOM_SIGNAL"], json!(1.5));
    // 20번째 일봉부터 SMA_20이 채워짐 (워밍업은 전체 이력으로 계산)
    assert!(row.technical_indicators["SMA_20"].is_number());
    assert!(row.candlestick_patterns.contains_key("CDLDOJI"));

    let rows = store
        .list_technical_analysis("AAPL", None, None, Timeframe::D1)
        .await
        .unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows.first().map(|r| r.date), Some(date(2024, 1, 20)));
    assert_eq!(rows.last().map(|r| r.date), Some(date(2024, 1, 25)));
}

#[tokio::test]
async fn test_technical_analysis_without_prices_is_empty() {
    let store = store_with_symbols(&["MSFT"]).await;
    let processor = TechnicalAnalysisProcessor::new(store.clone() as Arc<dyn Store>);

    let report = processor
        .calculate_and_store_technical_analysis("MSFT", None, None, Timeframe::D1)
        .await
        .unwrap();

    assert_eq!(report.total(), 0);
    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test]
async fn test_technical_analysis_outside_history_is_empty() {
    let store = store_with_symbols(&["AAPL"]).await;
    store
        .bulk_upsert_prices("AAPL", &rising_bars(date(2024, 1, 1), 10))
        .await
        .unwrap();
    let processor = TechnicalAnalysisProcessor::new(store.clone() as Arc<dyn Store>);

    let report = processor
        .calculate_and_store_technical_analysis(
            "AAPL",
            Some(date(2025, 1, 1)),
            None,
            Timeframe::D1,
        )
        .await
        .unwrap();

    assert_eq!(report.total(), 0);
    assert!(store
        .list_technical_analysis("AAPL", None, None, Timeframe::D1)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_technical_analysis_rejects_inverted_range() {
    let store = store_with_symbols(&["AAPL"]).await;
    let processor = TechnicalAnalysisProcessor::new(store as Arc<dyn Store>);

    let result = processor
        .calculate_and_store_technical_analysis(
            "AAPL",
            Some(date(2024, 2, 1)),
            Some(date(2024, 1, 1)),
            Timeframe::D1,
        )
        .await;
    assert!(result.is_err());

    let err = processor
        .calculate_and_store_technical_analysis("NOPE", None, None, Timeframe::D1)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_technical_analysis_all_respects_flag() {
    let store = store_with_symbols(&["AAPL", "MSFT"]).await;
    for code in ["AAPL", "MSFT"] {
        store
            .bulk_upsert_prices(code, &rising_bars(date(2024, 1, 1), 5))
            .await
            .unwrap();
    }
    store
        .update_symbol_config(
            "MSFT",
            SymbolConfigUpdate {
                collect_technical_indicators: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let processor = TechnicalAnalysisProcessor::new(store.clone() as Arc<dyn Store>);
    let stats = processor
        .calculate_and_store_technical_analysis_all(None, None)
        .await
        .unwrap();

    assert_eq!(stats.total, 1);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.records, 5);
    assert!(store
        .list_technical_analysis("MSFT", None, None, Timeframe::D1)
        .await
        .unwrap()
        .is_empty());
}

// =============================================================================
// Fundamentals
// =============================================================================

fn annual_statements() -> StatementSet {
    let fy23 = date(2023, 9, 30);
    let fy22 = date(2022, 9, 30);
    // 2021은 손익계산서에만 있어 교집합에서 빠집니다.
    let fy21 = date(2021, 9, 30);

    let mut set = StatementSet::default();
    set.income.insert("TotalRevenue", fy23, Some(383_285_000_000.0));
    set.income.insert("TotalRevenue", fy22, Some(394_328_000_000.0));
    set.income.insert("TotalRevenue", fy21, Some(365_817_000_000.0));
    set.balance_sheet.insert("TotalAssets", fy23, Some(352_583_000_000.0));
    set.balance_sheet.insert("TotalAssets", fy22, Some(352_755_000_000.0));
    set.cash_flow.insert("FreeCashFlow", fy23, Some(99_584_000_000.0));
    set.cash_flow.insert("FreeCashFlow", fy22, Some(f64::NAN));
    set.financials.insert("Net Income", fy23, Some(96_995_000_000.0));
    set.financials.insert("Net Income", fy22, None);
    set
}

#[tokio::test]
async fn test_fundamentals_are_collected_on_common_dates() {
    let store = store_with_symbols(&["AAPL"]).await;
    let collector = FundamentalCollector::new(
        store.clone() as Arc<dyn Store>,
        Arc::new(MockProvider::new().with_statements("AAPL", Period::Annual, annual_statements())),
    );

    let report = collector.collect_fundamental_data("AAPL").await.unwrap();
    assert_eq!(report.upserted, 2);

    let rows = store
        .get_fundamental_data("AAPL", None, None, Some(Period::Annual))
        .await
        .unwrap();
    let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(2023, 9, 30), date(2022, 9, 30)]);

    let latest = &rows[0].data;
    assert_eq!(latest["total_revenue"], json!(383_285_000_000.0));
    assert_eq!(latest["net_income"], json!(96_995_000_000.0));

    let previous = &rows[1].data;
    assert_eq!(previous["free_cash_flow"], Value::Null);
    assert_eq!(previous["net_income"], Value::Null);

    assert!(store
        .get_fundamental_data("AAPL", None, None, Some(Period::Quarterly))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_fundamentals_require_existing_symbol() {
    let store = Arc::new(MemoryStore::new());
    let collector = FundamentalCollector::new(
        store.clone() as Arc<dyn Store>,
        Arc::new(MockProvider::new().with_statements("AAPL", Period::Annual, annual_statements())),
    );

    let err = collector.collect_fundamental_data("AAPL").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(store.list_symbols().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fundamentals_all_counts_empty_symbols() {
    let store = store_with_symbols(&["AAPL", "MSFT"]).await;
    let provider =
        MockProvider::new().with_statements("AAPL", Period::Annual, annual_statements());
    let collector = FundamentalCollector::new(store.clone() as Arc<dyn Store>, Arc::new(provider));

    let stats = collector.collect_fundamental_data_all().await.unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.empty, 1);
    assert_eq!(stats.records, 2);
}

