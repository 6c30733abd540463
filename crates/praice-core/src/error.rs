//! 도메인 공통 에러 타입.
//!
//! 검증 실패, 조회 실패 등 저장소 구현과 무관한 에러를 정의합니다.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Error)]
pub enum PraiceError {
    /// 잘못된 입력 (자산 클래스, 타임프레임, 기간, 날짜 문자열 등)
    #[error("검증 실패: {0}")]
    Validation(String),

    /// 찾을 수 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 외부 데이터 소스 에러
    #[error("데이터 소스 에러: {0}")]
    DataSource(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type PraiceResult<T> = Result<T, PraiceError>;

impl PraiceError {
    /// 입력 검증 에러인지 확인합니다.
    pub fn is_validation(&self) -> bool {
        matches!(self, PraiceError::Validation(_))
    }

    /// 조회 실패 에러인지 확인합니다.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PraiceError::NotFound(_))
    }
}

impl From<serde_json::Error> for PraiceError {
    fn from(err: serde_json::Error) -> Self {
        PraiceError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for PraiceError {
    fn from(err: config::ConfigError) -> Self {
        PraiceError::Config(err.to_string())
    }
}
