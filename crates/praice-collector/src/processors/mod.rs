//! 저장된 데이터를 가공하는 처리기.

pub mod news;
pub mod technical;

pub use news::{count_words, NewsProcessor};
pub use technical::TechnicalAnalysisProcessor;
