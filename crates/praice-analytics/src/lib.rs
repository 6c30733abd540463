//! 기술적 분석 엔진.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - ta-rs 기반 기술적 지표 표면
//! - 캔들스틱 패턴 인식
//! - 가격 이력 → 날짜별 [`praice_core::TaEntry`] 변환

pub mod indicators;
pub mod ta_processor;

pub use indicators::{
    Candle, CandlePatternIndicator, CandlePatternParams, IndicatorError, IndicatorResult,
    IndicatorSeries, IndicatorSurface, PATTERN_NAMES,
};
pub use ta_processor::process_technical_analysis;
