//! 가격 이력 수집기.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use praice_core::{validate_code, PriceRequest};
use praice_data::{MarketDataProvider, Store, UpsertReport};

use crate::{CollectionStats, Result};

/// `update_historical_prices` 기본 조회 기간 (일)
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Provider에서 일봉을 가져와 저장소에 upsert합니다.
pub struct PriceCollector {
    store: Arc<dyn Store>,
    provider: Arc<dyn MarketDataProvider>,
    request_delay: Duration,
}

impl PriceCollector {
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            store,
            provider,
            request_delay: Duration::ZERO,
        }
    }

    /// 심볼 간 요청 딜레이 (Rate limit 대응)
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// 한 심볼의 가격 이력을 수집합니다.
    ///
    /// 심볼이 없으면 외부 심볼 정보로 생성한 뒤 저장합니다.
    /// Provider가 빈 결과를 주면 빈 리포트를 반환합니다.
    pub async fn collect_historical_prices(
        &self,
        code: &str,
        request: &PriceRequest,
    ) -> Result<UpsertReport> {
        let code = validate_code(code)?;
        let symbol = self
            .store
            .get_or_create_symbol(&code, self.provider.as_ref())
            .await?;

        let bars = self
            .provider
            .fetch_prices(&symbol.symbol, request)
            .await?;

        if bars.is_empty() {
            tracing::warn!(symbol = %symbol.symbol, request = ?request, "가격 데이터 없음");
            return Ok(UpsertReport::default());
        }

        let report = self.store.bulk_upsert_prices(&symbol.symbol, &bars).await?;
        for skipped in &report.skipped {
            tracing::warn!(
                symbol = %symbol.symbol,
                key = %skipped.key,
                reason = %skipped.reason,
                "가격 레코드 건너뜀"
            );
        }

        tracing::info!(
            symbol = %symbol.symbol,
            fetched = bars.len(),
            upserted = report.upserted,
            skipped = report.skipped.len(),
            "가격 수집 완료"
        );
        Ok(report)
    }

    /// 최근 `lookback_days`일 구간을 다시 수집합니다. 저장된 레코드 수를 반환합니다.
    pub async fn update_historical_prices(&self, code: &str, lookback_days: i64) -> Result<usize> {
        let end = Utc::now().date_naive();
        let start = end - chrono::Duration::days(lookback_days);

        let report = self
            .collect_historical_prices(code, &PriceRequest::Range { start, end })
            .await?;
        Ok(report.upserted)
    }

    /// 모든 활성 심볼의 최근 가격을 갱신합니다.
    ///
    /// 실패한 심볼은 로그를 남기고 0으로 기록하며, 나머지 심볼은 계속 진행합니다.
    pub async fn update_all_symbols_prices(
        &self,
        lookback_days: i64,
    ) -> Result<BTreeMap<String, usize>> {
        let symbols = self.store.list_active_symbols().await?;
        let mut results = BTreeMap::new();

        for (idx, symbol) in symbols.iter().enumerate() {
            if idx > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let count = match self
                .update_historical_prices(&symbol.symbol, lookback_days)
                .await
            {
                Ok(count) => count,
                Err(e) => {
                    tracing::error!(symbol = %symbol.symbol, error = %e, "가격 갱신 실패");
                    0
                }
            };
            results.insert(symbol.symbol.clone(), count);
        }

        Ok(results)
    }

    /// `collect_price_data`가 켜진 활성 심볼 전체를 같은 기간으로 수집합니다.
    pub async fn collect_historical_prices_all(&self, period: &str) -> Result<CollectionStats> {
        let start = Instant::now();
        let mut stats = CollectionStats::new();
        let request = PriceRequest::period(period);

        let targets: Vec<String> = self
            .store
            .list_symbol_configs()
            .await?
            .into_iter()
            .filter(|(symbol, config)| symbol.is_active && config.collect_price_data)
            .map(|(symbol, _)| symbol.symbol)
            .collect();

        tracing::info!(count = targets.len(), period = period, "가격 수집 대상 조회 완료");

        for (idx, code) in targets.iter().enumerate() {
            stats.total += 1;
            if idx > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            match self.collect_historical_prices(code, &request).await {
                Ok(report) if report.total() == 0 => stats.empty += 1,
                Ok(report) => {
                    stats.success += 1;
                    stats.records += report.upserted;
                    stats.skipped_records += report.skipped.len();
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::error!(symbol = %code, error = %e, "가격 수집 실패");
                }
            }
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }
}
