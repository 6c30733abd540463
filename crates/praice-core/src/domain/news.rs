//! 뉴스 기사와 심볼 연결.
//!
//! 뉴스 행은 헤드라인 수집 시 본문 없이 생성되고, 이후 단계별로 채워집니다:
//! 본문 → 단어 수 → 요약 → 감성 점수.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 저장된 뉴스 기사.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct News {
    pub id: i64,
    pub title: String,
    /// 기사 URL (고유)
    pub url: String,
    pub source: String,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub words_count: Option<i32>,
    pub content_summary: Option<String>,
    pub sentiment_score: Option<f64>,
    /// 단계별 마지막 실패 시각. 대기열에서 실패한 행을 뒤로 보냅니다.
    #[serde(default)]
    pub article_attempted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary_attempted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sentiment_attempted_at: Option<DateTime<Utc>>,
}

impl News {
    /// 해당 단계의 마지막 실패 시각.
    pub fn attempted_at(&self, stage: NewsStage) -> Option<DateTime<Utc>> {
        match stage {
            NewsStage::Article => self.article_attempted_at,
            NewsStage::Summary => self.summary_attempted_at,
            NewsStage::Sentiment => self.sentiment_attempted_at,
        }
    }
}

/// 뉴스 보강 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsStage {
    Article,
    Summary,
    Sentiment,
}

impl NewsStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsStage::Article => "article",
            NewsStage::Summary => "summary",
            NewsStage::Sentiment => "sentiment",
        }
    }
}

/// 새 뉴스 생성 요청.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNews {
    pub title: String,
    pub url: String,
    pub source: String,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
}

impl NewNews {
    /// 헤드라인 단계의 뉴스 (본문 없음).
    pub fn headline(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            content: None,
            published_at: None,
            scraped_at,
        }
    }
}

/// 뉴스 부분 업데이트.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsUpdate {
    pub title: Option<String>,
    pub source: Option<String>,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub words_count: Option<i32>,
    pub content_summary: Option<String>,
    pub sentiment_score: Option<f64>,
}

impl NewsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, news: &mut News) {
        if let Some(v) = &self.title {
            news.title = v.clone();
        }
        if let Some(v) = &self.source {
            news.source = v.clone();
        }
        if let Some(v) = &self.content {
            news.content = Some(v.clone());
        }
        if let Some(v) = self.published_at {
            news.published_at = Some(v);
        }
        if let Some(v) = self.scraped_at {
            news.scraped_at = v;
        }
        if let Some(v) = self.words_count {
            news.words_count = Some(v);
        }
        if let Some(v) = &self.content_summary {
            news.content_summary = Some(v.clone());
        }
        if let Some(v) = self.sentiment_score {
            news.sentiment_score = Some(v);
        }
    }
}

/// 뉴스-심볼 다대다 연결.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsSymbol {
    pub id: i64,
    pub news_id: i64,
    pub symbol_id: i64,
}

/// 뉴스 통계.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsStats {
    pub total: i64,
    pub by_source: BTreeMap<String, i64>,
}

/// 스크래퍼가 반환하는 헤드라인.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub headline: String,
    pub link: String,
}

/// 스크래퍼가 반환하는 기사 본문.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    /// 기사에서 언급된 티커 (중복 제거, 등장 순서 유지)
    pub symbols: Vec<String>,
}
