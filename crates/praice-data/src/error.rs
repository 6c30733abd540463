//! 데이터 모듈 오류 타입.

use praice_core::PraiceError;
use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 레코드를 찾을 수 없음
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 중복 레코드 (고유 제약 위반)
    #[error("Duplicate record: {0}")]
    DuplicateError(String),

    /// CHECK / NOT NULL / 외래 키 제약 위반
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 입력 검증 실패
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 마이그레이션 오류
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// 데이터 가져오기 오류 (외부 소스)
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl DataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, DataError::DuplicateError(_))
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                match code.as_ref() {
                    // PostgreSQL 고유 제약 조건 위반
                    "23505" => DataError::DuplicateError(db_err.message().to_string()),
                    // CHECK / NOT NULL / 외래 키 위반
                    "23514" | "23502" | "23503" => {
                        DataError::ConstraintViolation(db_err.message().to_string())
                    }
                    _ => DataError::QueryError(db_err.message().to_string()),
                }
            }
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DataError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DataError::MigrationError(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

impl From<PraiceError> for DataError {
    fn from(err: PraiceError) -> Self {
        match err {
            PraiceError::Validation(msg) => DataError::Validation(msg),
            PraiceError::NotFound(msg) => DataError::NotFound(msg),
            PraiceError::Config(msg) => DataError::ConfigError(msg),
            PraiceError::DataSource(msg) => DataError::FetchError(msg),
            PraiceError::Serialization(msg) => DataError::SerializationError(msg),
            PraiceError::Internal(msg) => DataError::QueryError(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_core_error() {
        let err: DataError = PraiceError::Validation("bad".to_string()).into();
        assert!(matches!(err, DataError::Validation(_)));

        let err: DataError = PraiceError::NotFound("AAPL".to_string()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DataError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
        assert!(matches!(DataError::from(sqlx::Error::PoolTimedOut), DataError::PoolExhausted));
    }
}
