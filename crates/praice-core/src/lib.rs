//! # Praice Core
//!
//! 시장 데이터 수집 파이프라인의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! - 심볼, 수집 설정, 스크래핑 URL
//! - 뉴스 및 심볼 연결
//! - 가격, 기술적 분석, 재무 데이터 레코드
//! - 타임프레임/자산 클래스/보고 주기 열거형
//! - 설정 관리 및 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod text;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
