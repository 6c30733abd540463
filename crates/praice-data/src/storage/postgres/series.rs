//! 시계열 테이블(가격, 기술적 분석, 재무) 쿼리.
//!
//! 배치 upsert는 배치 하나를 트랜잭션 하나로 적용하고, 레코드마다 SAVEPOINT를 두어
//! 제약 위반 레코드만 건너뜁니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use praice_core::{
    merge_json_object, FundamentalData, HistoricalPrice, Period, PriceBar, TaEntry,
    TechnicalAnalysis, Timeframe,
};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};

use super::rows::{convert_all, AnalysisRow, FundamentalRow, PriceRow};
use super::{begin_record, finish_record, PgStore};
use crate::error::{DataError, Result};
use crate::storage::{
    analysis_key, fundamental_key, AnalysisStore, FundamentalStore, PriceStore, UpsertReport,
};

#[async_trait]
impl PriceStore for PgStore {
    async fn get_historical_prices(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalPrice>> {
        let symbol_id = self.symbol_id(code).await?;
        let rows: Vec<PriceRow> = sqlx::query_as(
            r#"
            SELECT symbol_id, date, open, high, low, close, volume, dividends, stock_splits
            FROM historical_prices_1d
            WHERE symbol_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date ASC
            "#,
        )
        .bind(symbol_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_historical_price(&self, code: &str, date: NaiveDate) -> Result<HistoricalPrice> {
        let symbol_id = self.symbol_id(code).await?;
        let row: Option<PriceRow> = sqlx::query_as(
            r#"
            SELECT symbol_id, date, open, high, low, close, volume, dividends, stock_splits
            FROM historical_prices_1d
            WHERE symbol_id = $1 AND date = $2
            "#,
        )
        .bind(symbol_id)
        .bind(date)
        .fetch_optional(self.pool())
        .await?;

        row.map(Into::into)
            .ok_or_else(|| DataError::NotFound(format!("Price {} {} not found", code, date)))
    }

    async fn delete_historical_price(&self, code: &str, date: NaiveDate) -> Result<()> {
        let symbol_id = self.symbol_id(code).await?;
        let result =
            sqlx::query("DELETE FROM historical_prices_1d WHERE symbol_id = $1 AND date = $2")
                .bind(symbol_id)
                .bind(date)
                .execute(self.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("Price {} {} not found", code, date)));
        }
        Ok(())
    }

    async fn upsert_price_batch(&self, symbol_id: i64, batch: &[PriceBar]) -> Result<UpsertReport> {
        let mut tx = self.pool().begin().await?;
        let mut report = UpsertReport::default();

        for bar in batch {
            begin_record(&mut tx).await?;
            let outcome = sqlx::query(
                r#"
                INSERT INTO historical_prices_1d
                    (symbol_id, date, open, high, low, close, volume, dividends, stock_splits)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (symbol_id, date) DO UPDATE SET
                    open = EXCLUDED.open,
                    high = EXCLUDED.high,
                    low = EXCLUDED.low,
                    close = EXCLUDED.close,
                    volume = EXCLUDED.volume,
                    dividends = EXCLUDED.dividends,
                    stock_splits = EXCLUDED.stock_splits
                "#,
            )
            .bind(symbol_id)
            .bind(bar.date)
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume)
            .bind(bar.dividends)
            .bind(bar.stock_splits)
            .execute(&mut *tx)
            .await
            .map(|_| ());
            finish_record(&mut tx, outcome, bar.key(), &mut report).await?;
        }

        tx.commit().await?;
        Ok(report)
    }
}

#[async_trait]
impl AnalysisStore for PgStore {
    async fn get_technical_analysis(
        &self,
        code: &str,
        date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<TechnicalAnalysis> {
        let symbol_id = self.symbol_id(code).await?;
        let row: Option<AnalysisRow> = sqlx::query_as(
            r#"
            SELECT symbol_id, date, timeframe, technical_indicators, candlestick_patterns
            FROM technical_analysis
            WHERE symbol_id = $1 AND date = $2 AND timeframe = $3
            "#,
        )
        .bind(symbol_id)
        .bind(date)
        .bind(timeframe.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.ok_or_else(|| {
            DataError::NotFound(format!(
                "Technical analysis {} {} not found",
                code,
                analysis_key(date, timeframe)
            ))
        })?
        .try_into()
    }

    async fn list_technical_analysis(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        timeframe: Timeframe,
    ) -> Result<Vec<TechnicalAnalysis>> {
        let symbol_id = self.symbol_id(code).await?;
        let rows: Vec<AnalysisRow> = sqlx::query_as(
            r#"
            SELECT symbol_id, date, timeframe, technical_indicators, candlestick_patterns
            FROM technical_analysis
            WHERE symbol_id = $1
              AND timeframe = $2
              AND ($3::date IS NULL OR date >= $3)
              AND ($4::date IS NULL OR date <= $4)
            ORDER BY date ASC
            "#,
        )
        .bind(symbol_id)
        .bind(timeframe.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        convert_all(rows)
    }

    async fn delete_technical_analysis(
        &self,
        code: &str,
        date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<()> {
        let symbol_id = self.symbol_id(code).await?;
        let result = sqlx::query(
            "DELETE FROM technical_analysis WHERE symbol_id = $1 AND date = $2 AND timeframe = $3",
        )
        .bind(symbol_id)
        .bind(date)
        .bind(timeframe.as_str())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!(
                "Technical analysis {} {} not found",
                code,
                analysis_key(date, timeframe)
            )));
        }
        Ok(())
    }

    async fn delete_technical_analysis_by_symbol(
        &self,
        code: &str,
        timeframe: Timeframe,
    ) -> Result<u64> {
        let symbol_id = self.symbol_id(code).await?;
        let result =
            sqlx::query("DELETE FROM technical_analysis WHERE symbol_id = $1 AND timeframe = $2")
                .bind(symbol_id)
                .bind(timeframe.as_str())
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected())
    }

    async fn upsert_analysis_batch(
        &self,
        symbol_id: i64,
        batch: &[(NaiveDate, TaEntry)],
        timeframe: Timeframe,
    ) -> Result<UpsertReport> {
        let mut tx = self.pool().begin().await?;
        let mut report = UpsertReport::default();

        for (date, entry) in batch {
            begin_record(&mut tx).await?;
            let outcome = upsert_analysis_record(&mut tx, symbol_id, *date, timeframe, entry).await;
            finish_record(&mut tx, outcome, analysis_key(*date, timeframe), &mut report).await?;
        }

        tx.commit().await?;
        Ok(report)
    }
}

/// 기존 행을 잠그고 JSON 객체를 병합한 뒤 전체 값을 다시 씁니다.
///
/// 먼저 `ON CONFLICT DO NOTHING`으로 행을 만들어 봅니다. 새로 만들어졌으면 끝이고,
/// 이미 있으면(동시에 다른 트랜잭션이 만든 경우 포함) 그 행을 `FOR UPDATE`로 잠근 뒤
/// 병합합니다. 없는 행에는 잠금이 걸리지 않으므로 삽입을 먼저 시도합니다.
async fn upsert_analysis_record(
    tx: &mut Transaction<'static, Postgres>,
    symbol_id: i64,
    date: NaiveDate,
    timeframe: Timeframe,
    entry: &TaEntry,
) -> std::result::Result<(), sqlx::Error> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO technical_analysis
            (symbol_id, date, timeframe, technical_indicators, candlestick_patterns)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (symbol_id, date, timeframe) DO NOTHING
        "#,
    )
    .bind(symbol_id)
    .bind(date)
    .bind(timeframe.as_str())
    .bind(Json(&entry.technical_indicators))
    .bind(Json(&entry.candlestick_patterns))
    .execute(&mut **tx)
    .await?;
    if inserted.rows_affected() == 1 {
        return Ok(());
    }

    let (Json(mut indicators), Json(mut patterns)): (
        Json<Map<String, Value>>,
        Json<Map<String, Value>>,
    ) = sqlx::query_as(
        r#"
        SELECT technical_indicators, candlestick_patterns
        FROM technical_analysis
        WHERE symbol_id = $1 AND date = $2 AND timeframe = $3
        FOR UPDATE
        "#,
    )
    .bind(symbol_id)
    .bind(date)
    .bind(timeframe.as_str())
    .fetch_one(&mut **tx)
    .await?;

    merge_json_object(&mut indicators, &entry.technical_indicators);
    merge_json_object(&mut patterns, &entry.candlestick_patterns);
    sqlx::query(
        r#"
        UPDATE technical_analysis
        SET technical_indicators = $4, candlestick_patterns = $5
        WHERE symbol_id = $1 AND date = $2 AND timeframe = $3
        "#,
    )
    .bind(symbol_id)
    .bind(date)
    .bind(timeframe.as_str())
    .bind(Json(&indicators))
    .bind(Json(&patterns))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl FundamentalStore for PgStore {
    async fn get_fundamental_data(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        period: Option<Period>,
    ) -> Result<Vec<FundamentalData>> {
        let symbol_id = self.symbol_id(code).await?;
        let rows: Vec<FundamentalRow> = sqlx::query_as(
            r#"
            SELECT symbol_id, date, period, data
            FROM fundamental_data
            WHERE symbol_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
              AND ($4::text IS NULL OR period = $4)
            ORDER BY date DESC, period ASC
            "#,
        )
        .bind(symbol_id)
        .bind(start)
        .bind(end)
        .bind(period.map(|p| p.as_str()))
        .fetch_all(self.pool())
        .await?;

        convert_all(rows)
    }

    async fn delete_fundamental_data(
        &self,
        code: &str,
        date: NaiveDate,
        period: Period,
    ) -> Result<()> {
        let symbol_id = self.symbol_id(code).await?;
        let result = sqlx::query(
            "DELETE FROM fundamental_data WHERE symbol_id = $1 AND date = $2 AND period = $3",
        )
        .bind(symbol_id)
        .bind(date)
        .bind(period.as_str())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!(
                "Fundamental data {} {} not found",
                code,
                fundamental_key(date, period)
            )));
        }
        Ok(())
    }

    async fn upsert_fundamental_batch(
        &self,
        symbol_id: i64,
        batch: &[(NaiveDate, Map<String, Value>)],
        period: Period,
    ) -> Result<UpsertReport> {
        let mut tx = self.pool().begin().await?;
        let mut report = UpsertReport::default();

        for (date, data) in batch {
            begin_record(&mut tx).await?;
            let outcome = sqlx::query(
                r#"
                INSERT INTO fundamental_data (symbol_id, date, period, data)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (symbol_id, date, period) DO UPDATE SET data = EXCLUDED.data
                "#,
            )
            .bind(symbol_id)
            .bind(date)
            .bind(period.as_str())
            .bind(Json(data))
            .execute(&mut *tx)
            .await
            .map(|_| ());
            finish_record(&mut tx, outcome, fundamental_key(*date, period), &mut report).await?;
        }

        tx.commit().await?;
        Ok(report)
    }
}
