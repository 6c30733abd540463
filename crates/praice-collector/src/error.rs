//! 에러 타입 정의.

use std::fmt;

use praice_analytics::IndicatorError;
use praice_core::PraiceError;
use praice_data::inference::InferenceError;
use praice_data::{DataError, ProviderError, ScraperError};
use tokio_cron_scheduler::JobSchedulerError;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 저장소 또는 외부 데이터 소스 에러
    Data(DataError),
    /// 입력 검증 에러
    Validation(String),
    /// 설정 에러
    Config(String),
    /// 뉴스 스크래핑 에러
    Scraper(ScraperError),
    /// 요약/감성 추론 에러
    Inference(InferenceError),
    /// 기술적 지표 계산 에러
    Indicator(IndicatorError),
    /// 스케줄러 에러
    Scheduler(JobSchedulerError),
}

impl CollectorError {
    /// 조회 실패 에러인지 확인합니다.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Data(e) if e.is_not_found())
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(e) => write!(f, "Data error: {}", e),
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Scraper(e) => write!(f, "Scraper error: {}", e),
            Self::Inference(e) => write!(f, "Inference error: {}", e),
            Self::Indicator(e) => write!(f, "Indicator error: {}", e),
            Self::Scheduler(e) => write!(f, "Scheduler error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Data(e) => Some(e),
            Self::Scraper(e) => Some(e),
            Self::Inference(e) => Some(e),
            Self::Indicator(e) => Some(e),
            Self::Scheduler(e) => Some(e),
            Self::Validation(_) | Self::Config(_) => None,
        }
    }
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Validation(msg) => Self::Validation(msg),
            other => Self::Data(other),
        }
    }
}

impl From<PraiceError> for CollectorError {
    fn from(err: PraiceError) -> Self {
        match err {
            PraiceError::Validation(msg) => Self::Validation(msg),
            PraiceError::Config(msg) => Self::Config(msg),
            other => Self::Data(other.into()),
        }
    }
}

impl From<ProviderError> for CollectorError {
    fn from(err: ProviderError) -> Self {
        DataError::from(err).into()
    }
}

impl From<ScraperError> for CollectorError {
    fn from(err: ScraperError) -> Self {
        Self::Scraper(err)
    }
}

impl From<InferenceError> for CollectorError {
    fn from(err: InferenceError) -> Self {
        Self::Inference(err)
    }
}

impl From<IndicatorError> for CollectorError {
    fn from(err: IndicatorError) -> Self {
        Self::Indicator(err)
    }
}

impl From<JobSchedulerError> for CollectorError {
    fn from(err: JobSchedulerError) -> Self {
        Self::Scheduler(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_lifted_out_of_data_error() {
        let err: CollectorError = DataError::Validation("batch size".to_string()).into();
        assert!(matches!(err, CollectorError::Validation(_)));

        let err: CollectorError = PraiceError::Validation("timeframe".to_string()).into();
        assert!(matches!(err, CollectorError::Validation(_)));
    }

    #[test]
    fn test_not_found() {
        let err: CollectorError = DataError::NotFound("AAPL".to_string()).into();
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("Data error"));

        let err: CollectorError = PraiceError::NotFound("MSFT".to_string()).into();
        assert!(err.is_not_found());
    }
}
