//! 기술적 지표 모듈.
//!
//! - [`surface`]: ta-rs 기반 지표 표면 (이동평균, 밴드, 오실레이터, 변동성)
//! - [`candle_patterns`]: 캔들스틱 패턴 인식

pub mod candle_patterns;
pub mod surface;

pub use candle_patterns::{
    Candle, CandlePatternIndicator, CandlePatternParams, BEARISH, BULLISH, PATTERN_NAMES,
};
pub use surface::{IndicatorSeries, IndicatorSurface, EMA_PERIODS, RSI_PERIODS, SMA_PERIODS};

use thiserror::Error;

/// 지표 계산 에러.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),

    /// 계산 오류
    #[error("계산 오류: {0}")]
    CalculationError(String),
}

/// 지표 계산 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;
