//! 환경변수 기반 설정 모듈.
//!
//! 수집 작업의 한도, 딜레이, 스케줄 주기 등 작업 튜닝 값만 다룹니다.
//! DB/추론/스크래퍼 연결 설정은 `praice_core::AppConfig`가 담당합니다.

use std::time::Duration;

use chrono_tz::Tz;

use crate::error::{CollectorError, Result};

/// Collector 전체 설정
#[derive(Debug, Clone, Default)]
pub struct CollectorConfig {
    /// 가격 수집 설정
    pub price: PriceCollectConfig,
    /// 뉴스 수집 및 보강 설정
    pub news: NewsCollectConfig,
    /// 기술적 분석 설정
    pub technical: TechnicalConfig,
    /// 스케줄러 설정
    pub scheduler: SchedulerConfig,
}

/// 가격 수집 설정
#[derive(Debug, Clone)]
pub struct PriceCollectConfig {
    /// 정기 수집 기간 (기본: "5d")
    pub scheduled_period: String,
    /// `update` 계열 조회 기간 (일)
    pub lookback_days: i64,
    /// 심볼 간 요청 딜레이 (밀리초)
    pub request_delay_ms: u64,
}

impl Default for PriceCollectConfig {
    fn default() -> Self {
        Self {
            scheduled_period: "5d".to_string(),
            lookback_days: 30,
            request_delay_ms: 0,
        }
    }
}

/// 뉴스 수집 및 보강 설정
#[derive(Debug, Clone)]
pub struct NewsCollectConfig {
    /// 헤드라인 수집 소스
    pub headline_source: String,
    /// 본문 수집 1회당 기사 수
    pub article_limit: usize,
    /// 단어 수 계산 배치 크기
    pub words_batch_size: usize,
    /// 요약 대상 최소 단어 수
    pub summary_min_words: i32,
    /// 요약 최대 토큰 수
    pub summary_max_tokens: u32,
    /// 요약 1회당 기사 수
    pub summary_limit: usize,
    /// 요약 모델 (미지정 시 추론 설정의 기본 모델)
    pub summary_model: Option<String>,
    /// 감성 분석 1회당 기사 수
    pub sentiment_limit: usize,
}

impl Default for NewsCollectConfig {
    fn default() -> Self {
        Self {
            headline_source: "yfinance".to_string(),
            article_limit: 100,
            words_batch_size: 200,
            summary_min_words: 300,
            summary_max_tokens: 200,
            summary_limit: 5,
            summary_model: None,
            sentiment_limit: 5,
        }
    }
}

/// 기술적 분석 설정
#[derive(Debug, Clone)]
pub struct TechnicalConfig {
    /// 정기 계산 시 저장할 과거 일수 (오늘 포함 범위의 시작)
    pub window_days: i64,
    /// "오늘"을 판단하는 시장 시간대
    pub market_timezone: Tz,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            window_days: 2,
            market_timezone: chrono_tz::US::Eastern,
        }
    }
}

/// 스케줄러 설정 (cron 표현식은 UTC 기준, 초 단위 필드 포함)
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 헤드라인 수집 주기 (분)
    pub headlines_interval_minutes: u64,
    /// 본문 수집 주기 (분)
    pub articles_interval_minutes: u64,
    /// 가격 수집 cron
    pub prices_cron: String,
    /// 기술적 분석 cron
    pub technical_cron: String,
    /// 재무 데이터 cron
    pub fundamentals_cron: String,
    /// 단어 수 계산 cron
    pub words_count_cron: String,
    /// 요약 주기 (분)
    pub summaries_interval_minutes: u64,
    /// 감성 분석 주기 (분)
    pub sentiment_interval_minutes: u64,
    /// 동시 실행 작업 수 상한
    pub max_concurrent_jobs: usize,
    /// 시작 직후 모든 작업을 한 번 실행
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            headlines_interval_minutes: 80,
            articles_interval_minutes: 170,
            prices_cron: "0 0 22 * * *".to_string(),
            technical_cron: "0 30 22 * * *".to_string(),
            fundamentals_cron: "0 0 23 1 * *".to_string(),
            words_count_cron: "0 0 0 * * *".to_string(),
            summaries_interval_minutes: 15,
            sentiment_interval_minutes: 10,
            max_concurrent_jobs: 20,
            run_on_start: false,
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let market_timezone = match std::env::var("TA_MARKET_TIMEZONE") {
            Ok(name) => name.parse::<Tz>().map_err(|e| {
                CollectorError::Config(format!("TA_MARKET_TIMEZONE '{}': {}", name, e))
            })?,
            Err(_) => defaults.technical.market_timezone,
        };

        let config = Self {
            price: PriceCollectConfig {
                scheduled_period: env_var_string("PRICE_SCHEDULED_PERIOD", "5d"),
                lookback_days: env_var_parse("PRICE_LOOKBACK_DAYS", 30),
                request_delay_ms: env_var_parse("PRICE_REQUEST_DELAY_MS", 0),
            },
            news: NewsCollectConfig {
                headline_source: env_var_string("NEWS_HEADLINE_SOURCE", "yfinance"),
                article_limit: env_var_parse("NEWS_ARTICLE_LIMIT", 100),
                words_batch_size: env_var_parse("NEWS_WORDS_BATCH_SIZE", 200),
                summary_min_words: env_var_parse("NEWS_SUMMARY_MIN_WORDS", 300),
                summary_max_tokens: env_var_parse("NEWS_SUMMARY_MAX_TOKENS", 200),
                summary_limit: env_var_parse("NEWS_SUMMARY_LIMIT", 5),
                summary_model: std::env::var("NEWS_SUMMARY_MODEL").ok(),
                sentiment_limit: env_var_parse("NEWS_SENTIMENT_LIMIT", 5),
            },
            technical: TechnicalConfig {
                window_days: env_var_parse("TA_WINDOW_DAYS", 2),
                market_timezone,
            },
            scheduler: SchedulerConfig {
                headlines_interval_minutes: env_var_parse("SCHEDULE_HEADLINES_MINUTES", 80),
                articles_interval_minutes: env_var_parse("SCHEDULE_ARTICLES_MINUTES", 170),
                prices_cron: env_var_string("SCHEDULE_PRICES_CRON", "0 0 22 * * *"),
                technical_cron: env_var_string("SCHEDULE_TECHNICAL_CRON", "0 30 22 * * *"),
                fundamentals_cron: env_var_string("SCHEDULE_FUNDAMENTALS_CRON", "0 0 23 1 * *"),
                words_count_cron: env_var_string("SCHEDULE_WORDS_COUNT_CRON", "0 0 0 * * *"),
                summaries_interval_minutes: env_var_parse("SCHEDULE_SUMMARIES_MINUTES", 15),
                sentiment_interval_minutes: env_var_parse("SCHEDULE_SENTIMENT_MINUTES", 10),
                max_concurrent_jobs: env_var_parse("SCHEDULER_MAX_CONCURRENT_JOBS", 20),
                run_on_start: env_var_bool("SCHEDULER_RUN_ON_START", false),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// 0이면 안 되는 값 검증
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("NEWS_WORDS_BATCH_SIZE", self.news.words_batch_size as u64),
            ("NEWS_ARTICLE_LIMIT", self.news.article_limit as u64),
            ("SCHEDULER_MAX_CONCURRENT_JOBS", self.scheduler.max_concurrent_jobs as u64),
            ("SCHEDULE_HEADLINES_MINUTES", self.scheduler.headlines_interval_minutes),
            ("SCHEDULE_ARTICLES_MINUTES", self.scheduler.articles_interval_minutes),
            ("SCHEDULE_SUMMARIES_MINUTES", self.scheduler.summaries_interval_minutes),
            ("SCHEDULE_SENTIMENT_MINUTES", self.scheduler.sentiment_interval_minutes),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(CollectorError::Config(format!("{} must be greater than zero", key)));
            }
        }
        if self.price.lookback_days < 0 || self.technical.window_days < 0 {
            return Err(CollectorError::Config(
                "lookback/window days must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl PriceCollectConfig {
    /// 심볼 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl SchedulerConfig {
    pub fn headlines_interval(&self) -> Duration {
        minutes(self.headlines_interval_minutes)
    }

    pub fn articles_interval(&self) -> Duration {
        minutes(self.articles_interval_minutes)
    }

    pub fn summaries_interval(&self) -> Duration {
        minutes(self.summaries_interval_minutes)
    }

    pub fn sentiment_interval(&self) -> Duration {
        minutes(self.sentiment_interval_minutes)
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value * 60)
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값을 파싱 ("true", "1", "yes" → true)
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// 환경변수 문자열 (없으면 기본값)
fn env_var_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_job_table() {
        let config = CollectorConfig::default();

        assert_eq!(config.price.scheduled_period, "5d");
        assert_eq!(config.price.lookback_days, 30);
        assert_eq!(config.news.article_limit, 100);
        assert_eq!(config.news.words_batch_size, 200);
        assert_eq!(config.news.summary_min_words, 300);
        assert_eq!(config.news.summary_limit, 5);
        assert_eq!(config.news.sentiment_limit, 5);
        assert_eq!(config.technical.window_days, 2);
        assert_eq!(config.technical.market_timezone, chrono_tz::US::Eastern);

        let scheduler = &config.scheduler;
        assert_eq!(scheduler.headlines_interval(), Duration::from_secs(80 * 60));
        assert_eq!(scheduler.articles_interval(), Duration::from_secs(170 * 60));
        assert_eq!(scheduler.prices_cron, "0 0 22 * * *");
        assert_eq!(scheduler.technical_cron, "0 30 22 * * *");
        assert_eq!(scheduler.fundamentals_cron, "0 0 23 1 * *");
        assert_eq!(scheduler.words_count_cron, "0 0 0 * * *");
        assert_eq!(scheduler.summaries_interval(), Duration::from_secs(15 * 60));
        assert_eq!(scheduler.sentiment_interval(), Duration::from_secs(10 * 60));
        assert_eq!(scheduler.max_concurrent_jobs, 20);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let mut config = CollectorConfig::default();
        config.scheduler.max_concurrent_jobs = 0;
        assert!(matches!(config.validate(), Err(CollectorError::Config(_))));

        let mut config = CollectorConfig::default();
        config.news.words_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_var_parse_falls_back() {
        assert_eq!(env_var_parse("PRAICE_TEST_UNSET_VARIABLE", 7u64), 7);
        assert_eq!(env_var_string("PRAICE_TEST_UNSET_VARIABLE", "x"), "x");
        assert!(!env_var_bool("PRAICE_TEST_UNSET_VARIABLE", false));
    }
}
