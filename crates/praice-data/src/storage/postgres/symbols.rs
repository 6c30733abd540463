//! 심볼, 수집 설정, 스크래핑 URL 쿼리.

use std::collections::HashMap;

use async_trait::async_trait;
use praice_core::{
    normalize_code, NewSymbol, ScrapingUrl, ScrapingUrlUpdate, Symbol, SymbolConfig,
    SymbolConfigUpdate, SymbolUpdate,
};
use tracing::{debug, instrument};

use super::rows::{convert_all, ScrapingUrlRow, SymbolConfigRow, SymbolRow};
use super::PgStore;
use crate::error::{DataError, Result};
use crate::storage::{ScrapingUrlStore, SymbolStore};

#[async_trait]
impl SymbolStore for PgStore {
    async fn get_symbol(&self, code: &str) -> Result<Symbol> {
        let code = normalize_code(code);
        let row: Option<SymbolRow> = sqlx::query_as("SELECT * FROM symbols WHERE symbol = $1")
            .bind(&code)
            .fetch_optional(self.pool())
            .await?;

        row.ok_or_else(|| DataError::NotFound(format!("Symbol {} not found", code)))?
            .try_into()
    }

    #[instrument(skip(self, new), fields(symbol = %new.symbol))]
    async fn add_symbol(&self, new: NewSymbol) -> Result<Symbol> {
        let new = new.normalized()?;

        let row: SymbolRow = sqlx::query_as(
            r#"
            INSERT INTO symbols (symbol, name, asset_class, sector, industry, exchange)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.symbol)
        .bind(&new.name)
        .bind(new.asset_class.as_str())
        .bind(&new.sector)
        .bind(&new.industry)
        .bind(&new.exchange)
        .fetch_one(self.pool())
        .await?;

        debug!(id = row.id, "Created symbol record");
        row.try_into()
    }

    async fn list_symbols(&self) -> Result<Vec<Symbol>> {
        let rows: Vec<SymbolRow> = sqlx::query_as("SELECT * FROM symbols ORDER BY symbol")
            .fetch_all(self.pool())
            .await?;
        convert_all(rows)
    }

    async fn list_active_symbols(&self) -> Result<Vec<Symbol>> {
        let rows: Vec<SymbolRow> =
            sqlx::query_as("SELECT * FROM symbols WHERE is_active ORDER BY symbol")
                .fetch_all(self.pool())
                .await?;
        convert_all(rows)
    }

    async fn update_symbol(&self, code: &str, update: SymbolUpdate) -> Result<Symbol> {
        let mut symbol = self.get_symbol(code).await?;
        if update.is_empty() {
            return Ok(symbol);
        }
        update.apply_to(&mut symbol);

        let row: SymbolRow = sqlx::query_as(
            r#"
            UPDATE symbols
            SET name = $2, asset_class = $3, sector = $4, industry = $5,
                exchange = $6, is_active = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(symbol.id)
        .bind(&symbol.name)
        .bind(symbol.asset_class.as_str())
        .bind(&symbol.sector)
        .bind(&symbol.industry)
        .bind(&symbol.exchange)
        .bind(symbol.is_active)
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    async fn delete_symbol(&self, code: &str) -> Result<()> {
        let code = normalize_code(code);
        let result = sqlx::query("DELETE FROM symbols WHERE symbol = $1")
            .bind(&code)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("Symbol {} not found", code)));
        }
        Ok(())
    }

    async fn create_symbol_config(
        &self,
        code: &str,
        flags: SymbolConfigUpdate,
    ) -> Result<SymbolConfig> {
        let symbol_id = self.symbol_id(code).await?;
        let mut config = SymbolConfig::defaults(0, symbol_id);
        flags.apply_to(&mut config);

        let row: SymbolConfigRow = sqlx::query_as(
            r#"
            INSERT INTO symbol_configs
                (symbol_id, collect_price_data, collect_yfinance_news,
                 collect_technical_indicators, collect_fundamental_data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(symbol_id)
        .bind(config.collect_price_data)
        .bind(config.collect_yfinance_news)
        .bind(config.collect_technical_indicators)
        .bind(config.collect_fundamental_data)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn get_symbol_config(&self, code: &str) -> Result<SymbolConfig> {
        let symbol_id = self.symbol_id(code).await?;
        let row: Option<SymbolConfigRow> =
            sqlx::query_as("SELECT * FROM symbol_configs WHERE symbol_id = $1")
                .bind(symbol_id)
                .fetch_optional(self.pool())
                .await?;

        row.map(Into::into)
            .ok_or_else(|| DataError::NotFound(format!("Config for {} not found", code)))
    }

    async fn update_symbol_config(&self, code: &str, update: SymbolConfigUpdate) -> Result<bool> {
        let mut config = self.get_symbol_config(code).await?;
        if !update.apply_to(&mut config) {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE symbol_configs
            SET collect_price_data = $2, collect_yfinance_news = $3,
                collect_technical_indicators = $4, collect_fundamental_data = $5
            WHERE id = $1
            "#,
        )
        .bind(config.id)
        .bind(config.collect_price_data)
        .bind(config.collect_yfinance_news)
        .bind(config.collect_technical_indicators)
        .bind(config.collect_fundamental_data)
        .execute(self.pool())
        .await?;

        Ok(true)
    }

    async fn delete_symbol_config(&self, code: &str) -> Result<()> {
        let symbol_id = self.symbol_id(code).await?;
        let result = sqlx::query("DELETE FROM symbol_configs WHERE symbol_id = $1")
            .bind(symbol_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("Config for {} not found", code)));
        }
        Ok(())
    }

    async fn list_symbol_configs(&self) -> Result<Vec<(Symbol, SymbolConfig)>> {
        let configs: Vec<SymbolConfigRow> = sqlx::query_as("SELECT * FROM symbol_configs")
            .fetch_all(self.pool())
            .await?;
        let mut by_symbol: HashMap<i64, SymbolConfig> = configs
            .into_iter()
            .map(|row| (row.symbol_id, row.into()))
            .collect();

        Ok(self
            .list_symbols()
            .await?
            .into_iter()
            .filter_map(|symbol| by_symbol.remove(&symbol.id).map(|config| (symbol, config)))
            .collect())
    }
}

#[async_trait]
impl ScrapingUrlStore for PgStore {
    async fn add_scraping_url(&self, code: &str, url: &str, source: &str) -> Result<ScrapingUrl> {
        let symbol_id = self.symbol_id(code).await?;
        let row: ScrapingUrlRow = sqlx::query_as(
            r#"
            INSERT INTO scraping_urls (symbol_id, url, source)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(symbol_id)
        .bind(url)
        .bind(source)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn list_scraping_urls(&self, code: Option<&str>) -> Result<Vec<ScrapingUrl>> {
        let rows: Vec<ScrapingUrlRow> = match code {
            Some(code) => {
                let symbol_id = self.symbol_id(code).await?;
                sqlx::query_as("SELECT * FROM scraping_urls WHERE symbol_id = $1 ORDER BY id")
                    .bind(symbol_id)
                    .fetch_all(self.pool())
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM scraping_urls ORDER BY id")
                    .fetch_all(self.pool())
                    .await?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_scraping_url(&self, code: &str, source: &str) -> Result<ScrapingUrl> {
        let symbol_id = self.symbol_id(code).await?;
        let row: Option<ScrapingUrlRow> =
            sqlx::query_as("SELECT * FROM scraping_urls WHERE symbol_id = $1 AND source = $2")
                .bind(symbol_id)
                .bind(source)
                .fetch_optional(self.pool())
                .await?;

        row.map(Into::into).ok_or_else(|| {
            DataError::NotFound(format!("Scraping URL for {}/{} not found", code, source))
        })
    }

    async fn list_active_scraping_urls(&self, source: &str) -> Result<Vec<ScrapingUrl>> {
        let rows: Vec<ScrapingUrlRow> = sqlx::query_as(
            r#"
            SELECT u.*
            FROM scraping_urls u
            JOIN symbols s ON s.id = u.symbol_id
            WHERE u.source = $1 AND u.is_active AND s.is_active
            ORDER BY u.id
            "#,
        )
        .bind(source)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_scraping_url(
        &self,
        id: i64,
        update: ScrapingUrlUpdate,
    ) -> Result<ScrapingUrl> {
        let current: Option<ScrapingUrlRow> =
            sqlx::query_as("SELECT * FROM scraping_urls WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        let mut target: ScrapingUrl = current
            .map(Into::into)
            .ok_or_else(|| DataError::NotFound(format!("Scraping URL {} not found", id)))?;
        update.apply_to(&mut target);

        let row: ScrapingUrlRow = sqlx::query_as(
            r#"
            UPDATE scraping_urls
            SET url = $2, source = $3, is_active = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&target.url)
        .bind(&target.source)
        .bind(target.is_active)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn delete_scraping_url(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM scraping_urls WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("Scraping URL {} not found", id)));
        }
        Ok(())
    }
}
