//! 뉴스 헤드라인 수집 URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// (심볼, 소스) 쌍마다 하나씩 존재하는 스크래핑 URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapingUrl {
    pub id: i64,
    pub symbol_id: i64,
    pub url: String,
    /// 스크래퍼 레지스트리 키 (예: "yfinance")
    pub source: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 스크래핑 URL 부분 업데이트.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingUrlUpdate {
    pub url: Option<String>,
    pub source: Option<String>,
    pub is_active: Option<bool>,
}

impl ScrapingUrlUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, target: &mut ScrapingUrl) {
        if let Some(url) = &self.url {
            target.url = url.clone();
        }
        if let Some(source) = &self.source {
            target.source = source.clone();
        }
        if let Some(is_active) = self.is_active {
            target.is_active = is_active;
        }
    }
}
