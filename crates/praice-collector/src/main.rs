//! praice CLI.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use praice_collector::{CollectorConfig, JobContext, JobKind, Scheduler};
use praice_core::{init_logging, AppConfig, LogConfig};
use praice_data::{
    Database, InferenceApiSentimentScorer, PgStore, ScraperRegistry, Store, SummarizerRegistry,
    YahooProvider,
};

#[derive(Parser)]
#[command(name = "praice")]
#[command(about = "Market data, news and technical analysis collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (기본: config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 심볼 관리
    Symbol {
        #[command(subcommand)]
        action: SymbolCommand,
    },
    /// 심볼별 수집 설정
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// 뉴스 스크래핑 URL 관리
    Url {
        #[command(subcommand)]
        action: UrlCommand,
    },
    /// 가격 이력
    Price {
        #[command(subcommand)]
        action: PriceCommand,
    },
    /// 뉴스 수집 및 보강
    News {
        #[command(subcommand)]
        action: NewsCommand,
    },
    /// 기술적 분석
    Ta {
        #[command(subcommand)]
        action: TaCommand,
    },
    /// 재무 데이터
    Fundamental {
        #[command(subcommand)]
        action: FundamentalCommand,
    },
    /// 데이터베이스 마이그레이션 실행
    Migrate,
    /// 정기 작업 데몬 실행
    Scheduler {
        /// 스케줄 없이 지정한 작업만 한 번 실행
        #[arg(long, value_enum)]
        once: Option<JobKind>,
    },
}

#[derive(Subcommand)]
pub enum SymbolCommand {
    /// 심볼 추가
    Add {
        symbol: String,
        #[arg(long)]
        name: String,
        /// stock, commodity, currency, crypto, etf, index, bond, mutualfund, futures, option
        #[arg(long, default_value = "stock")]
        asset_class: String,
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
    },
    /// 심볼 목록
    List {
        /// 활성 심볼만
        #[arg(long)]
        active: bool,
    },
    /// 심볼 정보 수정
    Update {
        symbol: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        asset_class: Option<String>,
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
    },
    /// 심볼과 종속 데이터 삭제
    Delete { symbol: String },
    Activate { symbol: String },
    Deactivate { symbol: String },
}

/// 수집 플래그 (지정하지 않은 값은 유지)
#[derive(Args, Clone, Default)]
pub struct ConfigFlags {
    #[arg(long)]
    pub price: Option<bool>,
    #[arg(long)]
    pub news: Option<bool>,
    #[arg(long)]
    pub technical: Option<bool>,
    #[arg(long)]
    pub fundamental: Option<bool>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// 심볼 설정 조회
    Show { symbol: String },
    /// 설정 수정 (없으면 기본값으로 생성 후 수정)
    Update {
        symbol: String,
        #[command(flatten)]
        flags: ConfigFlags,
    },
    /// 설정 삭제
    Delete { symbol: String },
    /// 전체 설정 목록
    List,
}

#[derive(Subcommand)]
pub enum UrlCommand {
    /// 스크래핑 URL 추가
    Add {
        symbol: String,
        url: String,
        #[arg(long, default_value = "yfinance")]
        source: String,
    },
    /// Yahoo Finance 뉴스 URL 추가 (`--all`이면 뉴스 수집이 켜진 모든 심볼)
    AddYfinance {
        symbol: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// URL 목록
    List {
        #[arg(long)]
        symbol: Option<String>,
    },
    /// URL 수정
    Update {
        id: i64,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// URL 삭제
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum PriceCommand {
    /// 한 심볼의 가격 수집
    Collect {
        symbol: String,
        /// 최근 N일 (지정 시 period 무시)
        #[arg(long)]
        days: Option<i64>,
        /// 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max
        #[arg(long, default_value = "max")]
        period: String,
    },
    /// 가격 수집이 켜진 모든 심볼 수집
    CollectAll {
        #[arg(long, default_value = "max")]
        period: String,
    },
    /// 최근 N일 갱신
    Update {
        symbol: String,
        #[arg(long, default_value_t = praice_collector::collectors::DEFAULT_LOOKBACK_DAYS)]
        days: i64,
    },
    /// 모든 활성 심볼 최근 N일 갱신
    UpdateAll {
        #[arg(long, default_value_t = praice_collector::collectors::DEFAULT_LOOKBACK_DAYS)]
        days: i64,
    },
    /// 저장된 가격 조회
    Show {
        symbol: String,
        /// YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum NewsCommand {
    /// 헤드라인 수집 (심볼 미지정 시 소스의 모든 활성 URL)
    Headlines {
        symbol: Option<String>,
        #[arg(long, default_value = "yfinance")]
        source: String,
        #[arg(long)]
        proxy: Option<String>,
    },
    /// 본문 없는 기사 수집
    Articles {
        #[arg(long, default_value_t = 100)]
        limit: usize,
        #[arg(long)]
        proxy: Option<String>,
    },
    /// 뉴스 한 건 조회
    Show { id: i64 },
    /// 심볼 관련 뉴스 목록
    List {
        symbol: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// 제목/본문 검색
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// 소스별 통계
    Stats,
    /// 단어 수 계산
    Words {
        #[arg(long, default_value_t = 200)]
        batch_size: usize,
    },
    /// 요약 생성
    Summarize {
        #[arg(long, default_value_t = 300)]
        min_words: i32,
        #[arg(long, default_value_t = 200)]
        max_tokens: u32,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// bart, openai, anthropic
        #[arg(long)]
        model: Option<String>,
    },
    /// 감성 점수 계산
    Sentiment {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum TaCommand {
    /// 한 심볼의 기술적 분석 계산
    Calculate {
        symbol: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// 1D, 1W, 1M
        #[arg(long, default_value = "1D")]
        timeframe: String,
    },
    /// 기술적 분석이 켜진 모든 심볼 계산
    CalculateAll {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// 삭제 (날짜 미지정 시 타임프레임 전체)
    Delete {
        symbol: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "1D")]
        timeframe: String,
    },
    /// 저장된 분석 조회
    Show {
        symbol: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value = "1D")]
        timeframe: String,
        /// 표시할 지표 키 (쉼표 구분)
        #[arg(long, default_value = "RSI_14,MACD,SMA_20")]
        keys: String,
    },
}

#[derive(Subcommand)]
pub enum FundamentalCommand {
    /// 한 심볼 수집
    Collect { symbol: String },
    /// 재무 수집이 켜진 모든 심볼 수집
    CollectAll,
    /// 저장된 재무 데이터 조회
    Show {
        symbol: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// annual, quarterly
        #[arg(long)]
        period: Option<String>,
    },
    /// 한 보고일 삭제
    Delete {
        symbol: String,
        date: String,
        #[arg(long, default_value = "annual")]
        period: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let app_config = match &cli.config {
        Some(path) => AppConfig::load(path),
        None => AppConfig::load_default(),
    }
    .context("설정 로드 실패")?;

    // 로깅 초기화
    let mut log_config = LogConfig::from(&app_config.logging);
    if let Some(level) = &cli.log_level {
        log_config.level = level.clone();
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    let collector_config = CollectorConfig::from_env()?;

    // DB 연결
    let db = Database::connect(&app_config.database)
        .await
        .context("데이터베이스 연결 실패")?;
    tracing::info!("데이터베이스 연결 성공");

    let pg = Arc::new(PgStore::new(db));
    let ctx = build_context(&app_config, pg.clone(), collector_config)?;

    match cli.command {
        Commands::Migrate => {
            pg.database().migrate().await.context("마이그레이션 실패")?;
            println!("Migrations applied.");
        }
        Commands::Symbol { action } => commands::symbol(&ctx, action).await?,
        Commands::Config { action } => commands::config(&ctx, action).await?,
        Commands::Url { action } => commands::url(&ctx, action).await?,
        Commands::Price { action } => commands::price(&ctx, action).await?,
        Commands::News { action } => commands::news(&ctx, action).await?,
        Commands::Ta { action } => commands::ta(&ctx, action).await?,
        Commands::Fundamental { action } => commands::fundamental(&ctx, action).await?,
        Commands::Scheduler { once: Some(kind) } => {
            tracing::info!(job = kind.name(), "작업 단발 실행");
            kind.run(&ctx).await;
        }
        Commands::Scheduler { once: None } => {
            let mut scheduler = Scheduler::new(ctx).await?;
            scheduler.register_all().await?;
            scheduler.run_until_shutdown().await?;
        }
    }

    pg.database().pool().close().await;
    tracing::info!("praice 종료");

    Ok(())
}

fn build_context(
    app_config: &AppConfig,
    store: Arc<dyn Store>,
    config: CollectorConfig,
) -> anyhow::Result<JobContext> {
    let provider = Arc::new(YahooProvider::new().context("Yahoo Provider 생성 실패")?);

    let scrapers = ScraperRegistry::with_defaults(app_config.scraper.clone());
    scrapers
        .validate(&[config.news.headline_source.as_str()])
        .context("뉴스 소스 검증 실패")?;

    let summarizers =
        SummarizerRegistry::from_config(&app_config.inference).context("요약기 설정 실패")?;
    let sentiment = InferenceApiSentimentScorer::from_config(&app_config.inference)
        .context("감성 분석기 설정 실패")?;

    Ok(JobContext::new(
        store,
        provider,
        Arc::new(scrapers),
        Arc::new(summarizers),
        Arc::new(sentiment),
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_price_collect() {
        let cli = Cli::try_parse_from(["praice", "price", "collect", "AAPL", "--days", "7"]).unwrap();
        match cli.command {
            Commands::Price {
                action: PriceCommand::Collect { symbol, days, period },
            } => {
                assert_eq!(symbol, "AAPL");
                assert_eq!(days, Some(7));
                assert_eq!(period, "max");
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_parse_scheduler_once() {
        let cli = Cli::try_parse_from(["praice", "scheduler", "--once", "prices"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Scheduler {
                once: Some(JobKind::Prices)
            }
        ));
    }

    #[test]
    fn test_parse_config_update_keeps_unset_flags() {
        let cli = Cli::try_parse_from(["praice", "config", "update", "MSFT", "--news", "false"])
            .unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigCommand::Update { symbol, flags },
            } => {
                assert_eq!(symbol, "MSFT");
                assert_eq!(flags.news, Some(false));
                assert!(flags.price.is_none());
            }
            _ => panic!("unexpected command"),
        }
    }
}
