//! 뉴스 및 뉴스-심볼 연결 쿼리.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use praice_core::{NewNews, News, NewsStage, NewsStats, NewsSymbol, NewsUpdate};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use tracing::debug;

use super::rows::{NewsRow, NewsSymbolRow};
use super::{like_pattern, PgStore};
use crate::error::{DataError, Result};
use crate::storage::NewsStore;

impl PgStore {
    async fn fetch_news(&self, sql: &str, limit: Option<i64>) -> Result<Vec<News>> {
        let rows: Vec<NewsRow> = sqlx::query_as(sql)
            .bind(limit)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn news_by_url(&self, url: &str) -> Result<News> {
        let row: Option<NewsRow> = sqlx::query_as("SELECT * FROM news WHERE url = $1")
            .bind(url)
            .fetch_optional(self.pool())
            .await?;
        row.map(Into::into)
            .ok_or_else(|| DataError::NotFound(format!("News {} not found", url)))
    }

    /// 단일 뉴스 행을 갱신하고, 대상이 없으면 `NotFound`.
    async fn touch_news(&self, id: i64, query: Query<'_, Postgres, PgArguments>) -> Result<()> {
        let result = query.execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("News {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl NewsStore for PgStore {
    async fn create_news(&self, new: NewNews) -> Result<News> {
        let row: NewsRow = sqlx::query_as(
            r#"
            INSERT INTO news (title, url, source, content, published_at, scraped_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.title)
        .bind(&new.url)
        .bind(&new.source)
        .bind(&new.content)
        .bind(new.published_at)
        .bind(new.scraped_at)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn get_or_create_news(&self, new: NewNews) -> Result<(News, bool)> {
        let inserted: Option<NewsRow> = sqlx::query_as(
            r#"
            INSERT INTO news (title, url, source, content, published_at, scraped_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (url) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&new.title)
        .bind(&new.url)
        .bind(&new.source)
        .bind(&new.content)
        .bind(new.published_at)
        .bind(new.scraped_at)
        .fetch_optional(self.pool())
        .await?;

        match inserted {
            Some(row) => {
                debug!(id = row.id, url = %row.url, "Created news record");
                Ok((row.into(), true))
            }
            None => Ok((self.news_by_url(&new.url).await?, false)),
        }
    }

    async fn get_news(&self, id: i64) -> Result<News> {
        let row: Option<NewsRow> = sqlx::query_as("SELECT * FROM news WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Into::into)
            .ok_or_else(|| DataError::NotFound(format!("News {} not found", id)))
    }

    async fn update_news(&self, id: i64, update: NewsUpdate) -> Result<News> {
        let mut news = self.get_news(id).await?;
        if update.is_empty() {
            return Ok(news);
        }
        update.apply_to(&mut news);

        let row: NewsRow = sqlx::query_as(
            r#"
            UPDATE news
            SET title = $2, source = $3, content = $4, published_at = $5, scraped_at = $6,
                words_count = $7, content_summary = $8, sentiment_score = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&news.title)
        .bind(&news.source)
        .bind(&news.content)
        .bind(news.published_at)
        .bind(news.scraped_at)
        .bind(news.words_count)
        .bind(&news.content_summary)
        .bind(news.sentiment_score)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn delete_news(&self, id: i64) -> Result<()> {
        self.touch_news(id, sqlx::query("DELETE FROM news WHERE id = $1").bind(id))
            .await
    }

    async fn set_article_content(
        &self,
        id: i64,
        content: &str,
        published_at: Option<DateTime<Utc>>,
        scraped_at: DateTime<Utc>,
    ) -> Result<()> {
        self.touch_news(
            id,
            sqlx::query(
                "UPDATE news SET content = $2, published_at = $3, scraped_at = $4 WHERE id = $1",
            )
            .bind(id)
            .bind(content)
            .bind(published_at)
            .bind(scraped_at),
        )
        .await
    }

    async fn link_news_symbol(&self, news_id: i64, symbol_id: i64) -> Result<(NewsSymbol, bool)> {
        let inserted: Option<NewsSymbolRow> = sqlx::query_as(
            r#"
            INSERT INTO news_symbols (news_id, symbol_id)
            VALUES ($1, $2)
            ON CONFLICT (news_id, symbol_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(news_id)
        .bind(symbol_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| match DataError::from(e) {
            DataError::ConstraintViolation(msg) => DataError::NotFound(msg),
            other => other,
        })?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }

        let row: NewsSymbolRow = sqlx::query_as(
            "SELECT * FROM news_symbols WHERE news_id = $1 AND symbol_id = $2",
        )
        .bind(news_id)
        .bind(symbol_id)
        .fetch_one(self.pool())
        .await?;
        Ok((row.into(), false))
    }

    async fn list_news_symbols(&self, news_id: i64) -> Result<Vec<NewsSymbol>> {
        let rows: Vec<NewsSymbolRow> =
            sqlx::query_as("SELECT * FROM news_symbols WHERE news_id = $1 ORDER BY id")
                .bind(news_id)
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_news_symbol(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM news_symbols WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("NewsSymbol {} not found", id)));
        }
        Ok(())
    }

    async fn find_news_by_symbol(
        &self,
        code: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<News>> {
        let symbol_id = self.symbol_id(code).await?;
        let rows: Vec<NewsRow> = sqlx::query_as(
            r#"
            SELECT n.*
            FROM news n
            JOIN news_symbols ns ON ns.news_id = n.id
            WHERE ns.symbol_id = $1
            ORDER BY n.published_at DESC NULLS LAST, n.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(symbol_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_news_by_symbol(&self, code: &str) -> Result<i64> {
        let symbol_id = self.symbol_id(code).await?;
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM news_symbols WHERE symbol_id = $1")
                .bind(symbol_id)
                .fetch_one(self.pool())
                .await?;
        Ok(count)
    }

    async fn search_news(&self, query: &str, limit: usize) -> Result<Vec<News>> {
        let rows: Vec<NewsRow> = sqlx::query_as(
            r#"
            SELECT *
            FROM news
            WHERE title ILIKE $1 OR content ILIKE $1
            ORDER BY published_at DESC NULLS LAST, id DESC
            LIMIT $2
            "#,
        )
        .bind(like_pattern(query))
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn news_stats(&self) -> Result<NewsStats> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT source, COUNT(*) FROM news GROUP BY source")
                .fetch_all(self.pool())
                .await?;

        let mut stats = NewsStats::default();
        for (source, count) in rows {
            stats.total += count;
            stats.by_source.insert(source, count);
        }
        Ok(stats)
    }

    async fn list_news_without_content(&self, limit: usize) -> Result<Vec<News>> {
        self.fetch_news(
            r#"
            SELECT * FROM news
            WHERE content IS NULL
            ORDER BY article_attempted_at ASC NULLS FIRST, id
            LIMIT $1
            "#,
            Some(limit as i64),
        )
        .await
    }

    async fn count_news_without_content(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM news WHERE content IS NULL")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    async fn list_news_pending_word_count(&self, limit: Option<usize>) -> Result<Vec<News>> {
        self.fetch_news(
            r#"
            SELECT * FROM news
            WHERE content IS NOT NULL AND words_count IS NULL
            ORDER BY id
            LIMIT $1
            "#,
            limit.map(|l| l as i64),
        )
        .await
    }

    async fn list_news_pending_summary(&self, min_words: i32, limit: usize) -> Result<Vec<News>> {
        let rows: Vec<NewsRow> = sqlx::query_as(
            r#"
            SELECT * FROM news
            WHERE words_count >= $1 AND content_summary IS NULL
            ORDER BY summary_attempted_at ASC NULLS FIRST, id
            LIMIT $2
            "#,
        )
        .bind(min_words)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_news_pending_sentiment(&self, limit: usize) -> Result<Vec<News>> {
        self.fetch_news(
            r#"
            SELECT * FROM news
            WHERE content_summary IS NOT NULL AND sentiment_score IS NULL
            ORDER BY sentiment_attempted_at ASC NULLS FIRST, id
            LIMIT $1
            "#,
            Some(limit as i64),
        )
        .await
    }

    async fn set_words_count_batch(&self, counts: &[(i64, i32)]) -> Result<usize> {
        let mut tx = self.pool().begin().await?;

        for (id, count) in counts {
            let result = sqlx::query("UPDATE news SET words_count = $2 WHERE id = $1")
                .bind(id)
                .bind(count)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(DataError::NotFound(format!("News {} not found", id)));
            }
        }

        tx.commit().await?;
        Ok(counts.len())
    }

    async fn set_content_summary(&self, id: i64, summary: &str) -> Result<()> {
        self.touch_news(
            id,
            sqlx::query("UPDATE news SET content_summary = $2 WHERE id = $1")
                .bind(id)
                .bind(summary),
        )
        .await
    }

    async fn set_sentiment_score(&self, id: i64, score: f64) -> Result<()> {
        self.touch_news(
            id,
            sqlx::query("UPDATE news SET sentiment_score = $2 WHERE id = $1")
                .bind(id)
                .bind(score),
        )
        .await
    }

    async fn mark_news_attempt(
        &self,
        id: i64,
        stage: NewsStage,
        attempted_at: DateTime<Utc>,
    ) -> Result<()> {
        let sql = match stage {
            NewsStage::Article => "UPDATE news SET article_attempted_at = $2 WHERE id = $1",
            NewsStage::Summary => "UPDATE news SET summary_attempted_at = $2 WHERE id = $1",
            NewsStage::Sentiment => "UPDATE news SET sentiment_attempted_at = $2 WHERE id = $1",
        };
        self.touch_news(id, sqlx::query(sql).bind(id).bind(attempted_at))
            .await
    }
}
