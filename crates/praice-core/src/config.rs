//! 애플리케이션 설정.
//!
//! 기본값 → `config/default.toml`(선택) → `PRAICE__*` 환경 변수 → 기존 평면 환경 변수
//! (`DB_HOST`, `SENTIMENT_API_URL` 등) 순으로 병합합니다. 프로세스 시작 시 한 번
//! 생성되어 각 컴포넌트로 전달됩니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::PraiceResult;

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub inference: InferenceConfig,
    pub scraper: ScraperConfig,
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 전체 연결 URL (설정 시 개별 항목보다 우선)
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
    /// 연결 획득 타임아웃 (초)
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            name: "praice".to_string(),
            username: "praice".to_string(),
            password: "praice".to_string(),
            max_connections: 10,
            connect_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// PostgreSQL 연결 URL.
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.name
            ),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// pretty, json, compact
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 요약/감성 분석 외부 서비스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// 요약기 레지스트리 키 ("bart", "openai", "anthropic")
    pub summarization_model: String,
    /// 자체 추론 API의 요약 엔드포인트
    pub summarizer_url: String,
    /// 자체 추론 API의 감성 점수 엔드포인트
    pub sentiment_api_url: String,
    pub sentiment_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            summarization_model: "bart".to_string(),
            summarizer_url: "http://localhost:8000/summarize".to_string(),
            sentiment_api_url: "http://localhost:8000/sentiment_score".to_string(),
            sentiment_model: "ProsusAI/finbert".to_string(),
            anthropic_api_key: None,
            anthropic_model: "claude-3-5-sonnet-20240620".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            timeout_secs: 120,
        }
    }
}

/// 뉴스 스크래퍼 HTTP 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// HTTP 프록시 URL
    pub proxy: Option<String>,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// 재시도 지수 백오프의 기본 대기 시간 (밀리초)
    pub backoff_base_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            max_retries: 3,
            timeout_secs: 30,
            backoff_base_ms: 1000,
        }
    }
}

/// 기존 평면 환경 변수와 설정 키 매핑.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.name"),
    ("DB_USERNAME", "database.username"),
    ("DB_PASSWORD", "database.password"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
    ("SUMMARIZATION_MODEL", "inference.summarization_model"),
    ("HUGGINGFACE_SUMMARIZER_URL", "inference.summarizer_url"),
    ("SENTIMENT_API_URL", "inference.sentiment_api_url"),
    ("ANTHROPIC_API_KEY", "inference.anthropic_api_key"),
    ("OPENAI_API_KEY", "inference.openai_api_key"),
    ("SCRAPER_PROXY", "scraper.proxy"),
];

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없어도 실패하지 않습니다.
    pub fn load<P: AsRef<Path>>(path: P) -> PraiceResult<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("PRAICE")
                    .separator("__")
                    .try_parsing(true),
            );

        for (env_key, config_key) in LEGACY_ENV_KEYS {
            builder = builder.set_override_option(*config_key, std::env::var(env_key).ok())?;
        }

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> PraiceResult<Self> {
        Self::load(DEFAULT_CONFIG_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.inference.summarization_model, "bart");
        assert_eq!(config.scraper.max_retries, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_connection_url() {
        let mut db = DatabaseConfig {
            host: "db".to_string(),
            port: 6543,
            name: "market".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };
        assert_eq!(db.connection_url(), "postgres://user:secret@db:6543/market");

        db.url = Some("postgres://override/db".to_string());
        assert_eq!(db.connection_url(), "postgres://override/db");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert!(config.database.max_connections > 0);
        assert!(!config.inference.sentiment_model.is_empty());
    }
}
