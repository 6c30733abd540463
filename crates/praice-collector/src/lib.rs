//! praice 수집 파이프라인.
//!
//! 이 crate는 다음을 제공합니다:
//! - 가격/재무/뉴스 수집기
//! - 기술적 분석 및 뉴스 보강 처리기
//! - 정기 작업과 스케줄러
//! - `praice` CLI 바이너리

pub mod collectors;
pub mod config;
pub mod error;
pub mod jobs;
pub mod processors;
pub mod scheduler;
pub mod stats;

pub use collectors::{process_statements, FundamentalCollector, NewsCollector, PriceCollector};
pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use jobs::{JobContext, JobKind};
pub use processors::{count_words, NewsProcessor, TechnicalAnalysisProcessor};
pub use scheduler::Scheduler;
pub use stats::CollectionStats;
