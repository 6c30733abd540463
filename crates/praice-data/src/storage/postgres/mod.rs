//! PostgreSQL 스토리지 구현.
//!
//! 연결 풀 래퍼(`Database`)와 모든 저장소 trait을 구현하는 `PgStore`를 제공합니다.
//! 엔티티 계열별 쿼리는 하위 모듈에 나뉘어 있습니다.

mod news;
mod rows;
mod series;
mod symbols;

use std::time::Duration;

use praice_core::{normalize_code, DatabaseConfig};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use super::UpsertReport;
use crate::error::{DataError, Result};

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 새로운 데이터베이스 연결 풀을 생성합니다.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(host = %config.host, database = %config.name, "Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.connection_url())
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// 기존 연결 풀에서 Database 인스턴스를 생성합니다.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 내부 연결 풀을 반환합니다.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 데이터베이스 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::migrate!("../../migrations").run(&self.pool).await?;

        info!("Migrations completed successfully");
        Ok(())
    }

    /// 데이터베이스 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DataError::QueryError(e.to_string()))?;
        Ok(true)
    }
}

/// PostgreSQL 기반 저장소.
#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn pool(&self) -> &PgPool {
        self.db.pool()
    }

    /// 심볼 코드로 ID를 조회합니다.
    async fn symbol_id(&self, code: &str) -> Result<i64> {
        let code = normalize_code(code);
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM symbols WHERE symbol = $1")
            .bind(&code)
            .fetch_optional(self.pool())
            .await?;

        row.map(|(id,)| id)
            .ok_or_else(|| DataError::NotFound(format!("Symbol {} not found", code)))
    }
}

/// 레코드 단위 SAVEPOINT를 설정합니다.
async fn begin_record(tx: &mut Transaction<'static, Postgres>) -> Result<()> {
    sqlx::query("SAVEPOINT upsert_record")
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// 레코드 결과에 따라 SAVEPOINT를 해제하거나 롤백합니다.
///
/// DB 제약 위반은 SAVEPOINT로 롤백하고 건너뜀으로 기록합니다. 연결 오류 등은
/// 호출자에게 전파되어 배치 트랜잭션 전체가 롤백됩니다.
async fn finish_record(
    tx: &mut Transaction<'static, Postgres>,
    outcome: std::result::Result<(), sqlx::Error>,
    key: String,
    report: &mut UpsertReport,
) -> Result<()> {
    match outcome {
        Ok(()) => {
            sqlx::query("RELEASE SAVEPOINT upsert_record")
                .execute(&mut **tx)
                .await?;
            report.record_success();
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) => {
            sqlx::query("ROLLBACK TO SAVEPOINT upsert_record")
                .execute(&mut **tx)
                .await?;
            warn!(key = %key, error = %db_err, "레코드 upsert 건너뜀");
            report.record_skip(key, db_err.message().to_string());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// ILIKE 패턴용 이스케이프.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("apple"), "%apple%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
