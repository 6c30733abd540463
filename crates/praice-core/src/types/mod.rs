//! 파이프라인 전반에서 사용되는 공통 타입.

mod asset_class;
mod date;
mod period;
mod timeframe;

pub use asset_class::*;
pub use date::*;
pub use period::*;
pub use timeframe::*;
