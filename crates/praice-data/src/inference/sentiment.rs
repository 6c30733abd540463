//! 감성 점수 계산기.

use async_trait::async_trait;
use praice_core::InferenceConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{check_status, http_client, InferenceError, InferenceResult};

/// 텍스트의 감성 점수를 [-1, 1] 범위로 계산합니다.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn score(&self, text: &str) -> InferenceResult<f64>;
}

/// 분류 모델의 라벨별 확률.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// 라벨 확률을 가중 합산합니다 (positive +1, negative -1, neutral 0).
pub fn weighted_sentiment(scores: &[LabelScore]) -> f64 {
    scores
        .iter()
        .map(|s| {
            let weight = match s.label.to_lowercase().as_str() {
                "positive" => 1.0,
                "negative" => -1.0,
                _ => 0.0,
            };
            weight * s.score
        })
        .sum()
}

#[derive(Serialize)]
struct SentimentRequest<'a> {
    text: &'a str,
    model_name: &'a str,
}

/// `POST {text, model_name}` → `{sentiment_score}` 또는 `[{label, score}]`
pub struct InferenceApiSentimentScorer {
    client: Client,
    url: String,
    model_name: String,
}

impl InferenceApiSentimentScorer {
    pub fn new(client: Client, url: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            model_name: model_name.into(),
        }
    }

    pub fn from_config(config: &InferenceConfig) -> InferenceResult<Self> {
        Ok(Self::new(
            http_client(config.timeout_secs)?,
            &config.sentiment_api_url,
            &config.sentiment_model,
        ))
    }
}

#[async_trait]
impl SentimentScorer for InferenceApiSentimentScorer {
    async fn score(&self, text: &str) -> InferenceResult<f64> {
        let request = SentimentRequest {
            text,
            model_name: &self.model_name,
        };
        let response = self.client.post(&self.url).json(&request).send().await?;
        let body: Value = check_status(response).await?.json().await?;

        let score = parse_sentiment_response(&body)?;
        Ok(score.clamp(-1.0, 1.0))
    }
}

/// 응답 형식별 점수 추출.
///
/// `{sentiment_score}`, `[{label, score}]`, 파이프라인 형식 `[[{label, score}]]`를 지원합니다.
fn parse_sentiment_response(body: &Value) -> InferenceResult<f64> {
    if let Some(score) = body.get("sentiment_score").and_then(Value::as_f64) {
        return Ok(score);
    }

    let labels = match body {
        Value::Array(items) => match items.first() {
            Some(Value::Array(inner)) => inner,
            _ => items,
        },
        _ => {
            return Err(InferenceError::InvalidResponse(format!(
                "unexpected sentiment response: {}",
                body
            )))
        }
    };

    let scores: Vec<LabelScore> = serde_json::from_value(Value::Array(labels.clone()))
        .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;
    if scores.is_empty() {
        return Err(InferenceError::InvalidResponse(
            "empty label score list".to_string(),
        ));
    }
    Ok(weighted_sentiment(&scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn label(label: &str, score: f64) -> LabelScore {
        LabelScore {
            label: label.to_string(),
            score,
        }
    }

    #[test]
    fn test_weighted_sentiment() {
        let scores = vec![
            label("positive", 0.7),
            label("negative", 0.2),
            label("neutral", 0.1),
        ];
        assert!((weighted_sentiment(&scores) - 0.5).abs() < 1e-9);

        let scores = vec![label("Negative", 0.9), label("Positive", 0.1)];
        assert!((weighted_sentiment(&scores) + 0.8).abs() < 1e-9);

        assert_eq!(weighted_sentiment(&[]), 0.0);
    }

    #[test]
    fn test_parse_response_shapes() {
        assert_eq!(
            parse_sentiment_response(&json!({"sentiment_score": 0.25})).unwrap(),
            0.25
        );

        let flat = json!([{"label": "positive", "score": 0.6}, {"label": "negative", "score": 0.4}]);
        assert!((parse_sentiment_response(&flat).unwrap() - 0.2).abs() < 1e-9);

        let nested = json!([[{"label": "negative", "score": 1.0}]]);
        assert_eq!(parse_sentiment_response(&nested).unwrap(), -1.0);

        assert!(matches!(
            parse_sentiment_response(&json!({"error": "x"})),
            Err(InferenceError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_score_is_clamped() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sentiment_score")
            .match_body(Matcher::PartialJson(json!({
                "text": "Great quarter",
                "model_name": "ProsusAI/finbert",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sentiment_score": 1.7}"#)
            .create_async()
            .await;

        let scorer = InferenceApiSentimentScorer::new(
            Client::new(),
            format!("{}/sentiment_score", server.url()),
            "ProsusAI/finbert",
        );
        assert_eq!(scorer.score("Great quarter").await.unwrap(), 1.0);
        mock.assert_async().await;
    }
}
