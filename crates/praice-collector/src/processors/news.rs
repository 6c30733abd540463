//! 뉴스 보강 처리기.
//!
//! 본문 → 단어 수 → 요약 → 감성 점수 순서로 채웁니다.
//! 각 단계는 앞 단계의 필드가 채워진 행만 대상으로 합니다.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use praice_core::NewsStage;
use praice_data::inference::{truncate_chars, MAX_INPUT_CHARS};
use praice_data::{SentimentScorer, Store, Summarizer};
use regex::Regex;

use crate::{CollectorError, Result};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

/// `\w+` 토큰 수
pub fn count_words(text: &str) -> i32 {
    WORD_RE.find_iter(text).count().min(i32::MAX as usize) as i32
}

/// 뉴스 단어 수/요약/감성 점수 처리기
pub struct NewsProcessor {
    store: Arc<dyn Store>,
}

impl NewsProcessor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 본문은 있고 단어 수가 없는 뉴스의 단어 수를 채웁니다.
    ///
    /// 배치 하나를 하나의 트랜잭션으로 기록하며, 대상이 없을 때까지 반복합니다.
    pub async fn populate_words_count(&self, batch_size: usize) -> Result<usize> {
        if batch_size == 0 {
            return Err(CollectorError::Validation(
                "batch size must be greater than zero".to_string(),
            ));
        }

        let mut total = 0usize;
        loop {
            let batch = self
                .store
                .list_news_pending_word_count(Some(batch_size))
                .await?;
            if batch.is_empty() {
                break;
            }

            let counts: Vec<(i64, i32)> = batch
                .iter()
                .filter_map(|news| news.content.as_deref().map(|c| (news.id, count_words(c))))
                .collect();

            let updated = self.store.set_words_count_batch(&counts).await?;
            if updated == 0 {
                break;
            }
            total += updated;
            tracing::debug!(batch = counts.len(), total = total, "단어 수 배치 기록");
        }

        tracing::info!(total = total, "단어 수 계산 완료");
        Ok(total)
    }

    /// 단어 수가 `min_words` 이상이고 요약이 없는 뉴스를 최대 `limit`건 요약합니다.
    ///
    /// 요약된 건수와 뉴스 ID 목록을 반환합니다. 실패한 행은 건너뜁니다.
    pub async fn populate_content_summary(
        &self,
        min_words: i32,
        max_tokens: u32,
        limit: usize,
        summarizer: &dyn Summarizer,
    ) -> Result<(usize, Vec<i64>)> {
        let pending = self
            .store
            .list_news_pending_summary(min_words, limit)
            .await?;

        let mut ids = Vec::new();
        for news in &pending {
            let Some(content) = news.content.as_deref() else {
                continue;
            };
            let input = truncate_chars(content, MAX_INPUT_CHARS);

            let summary = match summarizer.summarize(input, max_tokens).await {
                Ok(summary) if summary.trim().is_empty() => {
                    tracing::warn!(news_id = news.id, model = summarizer.name(), "빈 요약 결과");
                    self.mark_failed(news.id, NewsStage::Summary).await;
                    continue;
                }
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!(news_id = news.id, model = summarizer.name(), error = %e, "요약 실패");
                    self.mark_failed(news.id, NewsStage::Summary).await;
                    continue;
                }
            };

            match self.store.set_content_summary(news.id, summary.trim()).await {
                Ok(()) => ids.push(news.id),
                Err(e) => {
                    tracing::error!(news_id = news.id, error = %e, "요약 저장 실패");
                    self.mark_failed(news.id, NewsStage::Summary).await;
                }
            }
        }

        tracing::info!(
            candidates = pending.len(),
            summarized = ids.len(),
            model = summarizer.name(),
            "요약 완료"
        );
        Ok((ids.len(), ids))
    }

    /// 요약은 있고 감성 점수가 없는 뉴스를 최대 `limit`건 점수화합니다.
    ///
    /// 본문이 아닌 요약문을 입력으로 사용합니다.
    pub async fn populate_sentiment_scores(
        &self,
        limit: usize,
        scorer: &dyn SentimentScorer,
    ) -> Result<(usize, Vec<i64>)> {
        let pending = self.store.list_news_pending_sentiment(limit).await?;

        let mut ids = Vec::new();
        for news in &pending {
            let Some(summary) = news.content_summary.as_deref() else {
                continue;
            };

            let score = match scorer.score(summary).await {
                Ok(score) => score,
                Err(e) => {
                    tracing::error!(news_id = news.id, error = %e, "감성 분석 실패");
                    self.mark_failed(news.id, NewsStage::Sentiment).await;
                    continue;
                }
            };

            match self.store.set_sentiment_score(news.id, score).await {
                Ok(()) => ids.push(news.id),
                Err(e) => {
                    tracing::error!(news_id = news.id, error = %e, "감성 점수 저장 실패");
                    self.mark_failed(news.id, NewsStage::Sentiment).await;
                }
            }
        }

        tracing::info!(candidates = pending.len(), scored = ids.len(), "감성 분석 완료");
        Ok((ids.len(), ids))
    }

    /// 실패한 행을 해당 단계 대기열 뒤로 보냅니다.
    async fn mark_failed(&self, id: i64, stage: NewsStage) {
        if let Err(e) = self.store.mark_news_attempt(id, stage, Utc::now()).await {
            tracing::warn!(news_id = id, stage = stage.as_str(), error = %e, "실패 시각 기록 실패");
        }
    }
}
