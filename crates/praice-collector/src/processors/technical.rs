//! 기술적 분석 계산 및 저장.
//!
//! 지표 워밍업을 위해 항상 전체 가격 이력으로 계산하고, 저장은 요청 구간만 합니다.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use praice_analytics::process_technical_analysis;
use praice_core::{validate_range, PriceBar, TaEntry, Timeframe};
use praice_data::{Store, UpsertReport};

use crate::{CollectionStats, Result};

/// 저장된 가격 이력으로 기술적 분석을 계산해 저장합니다.
pub struct TechnicalAnalysisProcessor {
    store: Arc<dyn Store>,
}

impl TechnicalAnalysisProcessor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 한 심볼의 기술적 분석을 `[start, end]` 구간에 대해 저장합니다.
    ///
    /// 가격 이력이 없으면 빈 리포트를 반환합니다.
    pub async fn calculate_and_store_technical_analysis(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        timeframe: Timeframe,
    ) -> Result<UpsertReport> {
        validate_range(start, end)?;
        let symbol = self.store.get_symbol(code).await?;

        let history = self
            .store
            .get_historical_prices(&symbol.symbol, None, None)
            .await?;
        if history.is_empty() {
            tracing::warn!(symbol = %symbol.symbol, "가격 이력 없음, 기술적 분석 생략");
            return Ok(UpsertReport::default());
        }

        let bars: Vec<PriceBar> = history.iter().map(|p| p.to_bar()).collect();
        let computed = process_technical_analysis(&bars)?;

        let entries: Vec<(NaiveDate, TaEntry)> = computed
            .into_iter()
            .filter(|(date, _)| {
                start.map_or(true, |s| *date >= s) && end.map_or(true, |e| *date <= e)
            })
            .collect();

        if entries.is_empty() {
            tracing::debug!(symbol = %symbol.symbol, ?start, ?end, "구간 내 가격 없음");
            return Ok(UpsertReport::default());
        }

        let report = self
            .store
            .bulk_upsert_technical_analysis(&symbol.symbol, &entries, timeframe)
            .await?;

        tracing::info!(
            symbol = %symbol.symbol,
            timeframe = %timeframe,
            history = bars.len(),
            upserted = report.upserted,
            skipped = report.skipped.len(),
            "기술적 분석 저장 완료"
        );
        Ok(report)
    }

    /// `collect_technical_indicators`가 켜진 활성 심볼 전체의 일봉 분석을 저장합니다.
    pub async fn calculate_and_store_technical_analysis_all(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<CollectionStats> {
        validate_range(start, end)?;
        let started = Instant::now();
        let mut stats = CollectionStats::new();

        let targets: Vec<String> = self
            .store
            .list_symbol_configs()
            .await?
            .into_iter()
            .filter(|(symbol, config)| symbol.is_active && config.collect_technical_indicators)
            .map(|(symbol, _)| symbol.symbol)
            .collect();

        for code in &targets {
            stats.total += 1;
            match self
                .calculate_and_store_technical_analysis(code, start, end, Timeframe::D1)
                .await
            {
                Ok(report) if report.total() == 0 => stats.empty += 1,
                Ok(report) => {
                    stats.success += 1;
                    stats.records += report.upserted;
                    stats.skipped_records += report.skipped.len();
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::error!(symbol = %code, error = %e, "기술적 분석 실패");
                }
            }
        }

        stats.elapsed = started.elapsed();
        Ok(stats)
    }
}
