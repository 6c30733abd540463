//! 요약/감성 분석 추론 클라이언트.
//!
//! - [`Summarizer`]: 자체 추론 API(BART), OpenAI, Anthropic
//! - [`SentimentScorer`]: 자체 추론 API (FinBERT)

pub mod sentiment;
pub mod summarizer;

use std::time::Duration;

use reqwest::{Client, Response};
use thiserror::Error;

use crate::error::DataError;

pub use sentiment::{weighted_sentiment, InferenceApiSentimentScorer, LabelScore, SentimentScorer};
pub use summarizer::{
    summary_prompt, AnthropicSummarizer, InferenceApiSummarizer, OpenAiSummarizer, Summarizer,
    SummarizerRegistry,
};

/// 요약기 입력 최대 문자 수.
pub const MAX_INPUT_CHARS: usize = 3500;

/// 추론 서비스 에러
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP 요청 실패: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API 오류 ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("응답 형식 오류: {0}")]
    InvalidResponse(String),

    #[error("API 키 없음: {0}")]
    MissingApiKey(String),

    #[error("등록되지 않은 모델: {0}")]
    UnknownModel(String),
}

impl From<InferenceError> for DataError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::MissingApiKey(_) | InferenceError::UnknownModel(_) => {
                DataError::ConfigError(err.to_string())
            }
            InferenceError::InvalidResponse(msg) => DataError::ParseError(msg),
            other => DataError::FetchError(other.to_string()),
        }
    }
}

pub type InferenceResult<T> = Result<T, InferenceError>;

/// 문자 경계를 지키며 최대 `max_chars`자로 자릅니다.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub(crate) fn http_client(timeout_secs: u64) -> InferenceResult<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// 비성공 응답을 `Api` 에러로 변환합니다.
pub(crate) async fn check_status(response: Response) -> InferenceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(InferenceError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // 멀티바이트 문자
        assert_eq!(truncate_chars("가나다라", 2), "가나");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_inference_error_into_data_error() {
        let err: DataError = InferenceError::MissingApiKey("openai".to_string()).into();
        assert!(matches!(err, DataError::ConfigError(_)));

        let err: DataError = InferenceError::Api {
            status: 503,
            message: "loading".to_string(),
        }
        .into();
        assert!(matches!(err, DataError::FetchError(_)));
    }
}
