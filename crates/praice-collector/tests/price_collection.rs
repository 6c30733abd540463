//! 가격 수집 통합 테스트 (인메모리 저장소).

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{date, rising_bars, MockProvider};
use praice_collector::PriceCollector;
use praice_core::{AssetClass, NewSymbol, PriceBar, PriceRequest, SymbolConfigUpdate};
use praice_data::{MemoryStore, PriceStore, Store, SymbolStore};
use rust_decimal_macros::dec;

fn collector(store: &Arc<MemoryStore>, provider: MockProvider) -> PriceCollector {
    PriceCollector::new(store.clone() as Arc<dyn Store>, Arc::new(provider))
}

fn aapl_bar() -> PriceBar {
    PriceBar::ohlcv(
        date(2024, 1, 2),
        dec!(187.15),
        dec!(188.44),
        dec!(183.89),
        dec!(185.64),
        82_488_700,
    )
}

#[tokio::test]
async fn test_collect_creates_symbol_and_stores_bar() {
    let store = Arc::new(MemoryStore::new());
    let collector = collector(&store, MockProvider::new().with_prices("AAPL", vec![aapl_bar()]));

    let report = collector
        .collect_historical_prices(" aapl ", &PriceRequest::period("1d"))
        .await
        .unwrap();
    assert_eq!(report.upserted, 1);
    assert!(report.skipped.is_empty());

    let symbol = store.get_symbol("AAPL").await.unwrap();
    assert_eq!(symbol.name, "Mock Corporation");
    assert!(symbol.is_active);

    let day = date(2024, 1, 2);
    let rows = store
        .get_historical_prices("AAPL", Some(day), Some(day))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let stored = &rows[0];
    assert_eq!(stored.date, day);
    assert_eq!(stored.open, dec!(187.15));
    assert_eq!(stored.high, dec!(188.44));
    assert_eq!(stored.low, dec!(183.89));
    assert_eq!(stored.close, dec!(185.64));
    assert_eq!(stored.volume, 82_488_700);
    assert_eq!(stored.dividends, dec!(0));
}

#[tokio::test]
async fn test_collect_twice_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let collector = collector(
        &store,
        MockProvider::new().with_prices("AAPL", rising_bars(date(2024, 1, 2), 5)),
    );

    for _ in 0..2 {
        let report = collector
            .collect_historical_prices("AAPL", &PriceRequest::period("max"))
            .await
            .unwrap();
        assert_eq!(report.upserted, 5);
    }

    let rows = store.get_historical_prices("AAPL", None, None).await.unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(store.list_symbols().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_large_history_is_split_into_batches() {
    let store = Arc::new(MemoryStore::new());
    let collector = collector(
        &store,
        MockProvider::new().with_prices("MSFT", rising_bars(date(2023, 1, 1), 250)),
    );

    let report = collector
        .collect_historical_prices("MSFT", &PriceRequest::period("max"))
        .await
        .unwrap();

    assert_eq!(report.upserted, 250);
    // 100 + 100 + 50
    assert_eq!(store.transaction_count(), 3);
}

#[tokio::test]
async fn test_negative_price_is_skipped_without_failing_batch() {
    let mut bars = rising_bars(date(2024, 1, 2), 3);
    bars[1].low = dec!(-1);

    let store = Arc::new(MemoryStore::new());
    let collector = collector(&store, MockProvider::new().with_prices("TSLA", bars));

    let report = collector
        .collect_historical_prices("TSLA", &PriceRequest::period("1mo"))
        .await
        .unwrap();

    assert_eq!(report.upserted, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "2024-01-03");
    assert!(report.skipped[0].reason.contains("non_negative"));

    let rows = store.get_historical_prices("TSLA", None, None).await.unwrap();
    let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 4)]);
}

#[tokio::test]
async fn test_unknown_symbol_is_not_created() {
    let store = Arc::new(MemoryStore::new());
    let collector = collector(&store, MockProvider::new());

    let err = collector
        .collect_historical_prices("ZZZZ", &PriceRequest::period("max"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(store.list_symbols().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_code_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockProvider::new());
    let collector = PriceCollector::new(store.clone() as Arc<dyn Store>, provider.clone());

    let result = collector
        .collect_historical_prices("   ", &PriceRequest::period("max"))
        .await;

    assert!(result.is_err());
    assert_eq!(provider.price_calls(), 0);
}

#[tokio::test]
async fn test_update_uses_lookback_window() {
    let today = Utc::now().date_naive();
    let store = Arc::new(MemoryStore::new());
    let collector = collector(
        &store,
        MockProvider::new().with_prices("NVDA", rising_bars(today - Duration::days(40), 41)),
    );

    let upserted = collector.update_historical_prices("NVDA", 30).await.unwrap();

    assert_eq!(upserted, 31);
    let rows = store.get_historical_prices("NVDA", None, None).await.unwrap();
    assert_eq!(rows.first().map(|r| r.date), Some(today - Duration::days(30)));
}

#[tokio::test]
async fn test_update_all_isolates_failing_symbol() {
    let today = Utc::now().date_naive();
    let store = Arc::new(MemoryStore::new());
    for code in ["AAPL", "BROKE", "MSFT"] {
        store
            .add_symbol(NewSymbol::new(code, code, AssetClass::Stock))
            .await
            .unwrap();
    }

    // BROKE는 AAPL과 MSFT 사이에서 처리됩니다.
    let collector = collector(
        &store,
        MockProvider::new()
            .with_prices("AAPL", rising_bars(today - Duration::days(2), 3))
            .with_prices("MSFT", rising_bars(today - Duration::days(1), 2))
            .failing("BROKE"),
    );

    let results = collector.update_all_symbols_prices(5).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results.get("AAPL"), Some(&3));
    assert_eq!(results.get("BROKE"), Some(&0));
    assert_eq!(results.get("MSFT"), Some(&2));
    assert_eq!(
        store
            .get_historical_prices("MSFT", None, None)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_collect_all_respects_price_flag() {
    let store = Arc::new(MemoryStore::new());
    for code in ["AAPL", "BROKE", "EMPTY", "SKIP"] {
        store
            .add_symbol(NewSymbol::new(code, code, AssetClass::Stock))
            .await
            .unwrap();
        store
            .get_or_create_symbol_config(code)
            .await
            .unwrap();
    }
    store
        .update_symbol_config(
            "SKIP",
            SymbolConfigUpdate {
                collect_price_data: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let provider = Arc::new(
        MockProvider::new()
            .with_prices("AAPL", rising_bars(date(2024, 1, 2), 4))
            .with_prices("SKIP", rising_bars(date(2024, 1, 2), 4))
            .failing("BROKE"),
    );
    let collector = PriceCollector::new(store.clone() as Arc<dyn Store>, provider.clone());

    let stats = collector.collect_historical_prices_all("max").await.unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.empty, 1);
    assert_eq!(stats.records, 4);
    assert_eq!(provider.price_calls(), 3);
    assert!(store
        .get_historical_prices("SKIP", None, None)
        .await
        .unwrap()
        .is_empty());
}
