//! CLI 하위 명령 처리.

use std::str::FromStr;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use praice_collector::JobContext;
use praice_core::{
    parse_date, validate_range, AssetClass, NewSymbol, Period, PriceRequest, ScrapingUrlUpdate,
    SymbolConfigUpdate, SymbolUpdate, Timeframe,
};
use praice_data::DataError;

use crate::{
    ConfigCommand, ConfigFlags, FundamentalCommand, NewsCommand, PriceCommand, SymbolCommand,
    TaCommand, UrlCommand,
};

const YFINANCE_SOURCE: &str = "yfinance";

fn yfinance_news_url(symbol: &str) -> String {
    format!("https://finance.yahoo.com/quote/{}/news/", symbol)
}

fn parse_opt_date(value: Option<&str>) -> anyhow::Result<Option<NaiveDate>> {
    value.map(parse_date).transpose().map_err(Into::into)
}

fn parse_range(
    start: Option<&str>,
    end: Option<&str>,
) -> anyhow::Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let start = parse_opt_date(start)?;
    let end = parse_opt_date(end)?;
    validate_range(start, end)?;
    Ok((start, end))
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

// =============================================================================
// symbol
// =============================================================================

pub async fn symbol(ctx: &JobContext, action: SymbolCommand) -> anyhow::Result<()> {
    let store = &ctx.store;

    match action {
        SymbolCommand::Add {
            symbol,
            name,
            asset_class,
            sector,
            industry,
            exchange,
        } => {
            let asset_class = AssetClass::from_str(&asset_class)?;
            let mut new = NewSymbol::new(symbol, name, asset_class);
            if let Some(sector) = sector {
                new = new.with_sector(sector);
            }
            if let Some(industry) = industry {
                new = new.with_industry(industry);
            }
            if let Some(exchange) = exchange {
                new = new.with_exchange(exchange);
            }

            let created = store.add_symbol(new).await?;
            println!("Symbol {} added (id {}).", created.symbol, created.id);
        }
        SymbolCommand::List { active } => {
            let symbols = if active {
                store.list_active_symbols().await?
            } else {
                store.list_symbols().await?
            };

            println!(
                "{:<10} {:<32} {:<10} {:<24} {:<10} {}",
                "Symbol", "Name", "Class", "Sector", "Exchange", "Active"
            );
            for s in &symbols {
                println!(
                    "{:<10} {:<32} {:<10} {:<24} {:<10} {}",
                    s.symbol,
                    s.name,
                    s.asset_class.as_str(),
                    or_dash(&s.sector),
                    or_dash(&s.exchange),
                    s.is_active
                );
            }
            println!("{} symbols", symbols.len());
        }
        SymbolCommand::Update {
            symbol,
            name,
            asset_class,
            sector,
            industry,
            exchange,
        } => {
            let update = SymbolUpdate {
                name,
                asset_class: asset_class.as_deref().map(AssetClass::from_str).transpose()?,
                sector,
                industry,
                exchange,
                is_active: None,
            };
            if update.is_empty() {
                bail!("nothing to update");
            }
            let updated = store.update_symbol(&symbol, update).await?;
            println!("Symbol {} updated.", updated.symbol);
        }
        SymbolCommand::Delete { symbol } => {
            store.delete_symbol(&symbol).await?;
            println!("Symbol {} deleted.", symbol.to_uppercase());
        }
        SymbolCommand::Activate { symbol } => {
            let updated = store.update_symbol(&symbol, SymbolUpdate::active(true)).await?;
            println!("Symbol {} activated.", updated.symbol);
        }
        SymbolCommand::Deactivate { symbol } => {
            let updated = store
                .update_symbol(&symbol, SymbolUpdate::active(false))
                .await?;
            println!("Symbol {} deactivated.", updated.symbol);
        }
    }

    Ok(())
}

// =============================================================================
// config
// =============================================================================

impl From<ConfigFlags> for SymbolConfigUpdate {
    fn from(flags: ConfigFlags) -> Self {
        SymbolConfigUpdate {
            collect_price_data: flags.price,
            collect_yfinance_news: flags.news,
            collect_technical_indicators: flags.technical,
            collect_fundamental_data: flags.fundamental,
        }
    }
}

pub async fn config(ctx: &JobContext, action: ConfigCommand) -> anyhow::Result<()> {
    let store = &ctx.store;

    match action {
        ConfigCommand::Show { symbol } => {
            let config = store.get_symbol_config(&symbol).await?;
            println!("symbol:                       {}", symbol.to_uppercase());
            println!("collect_price_data:           {}", config.collect_price_data);
            println!("collect_yfinance_news:        {}", config.collect_yfinance_news);
            println!("collect_technical_indicators: {}", config.collect_technical_indicators);
            println!("collect_fundamental_data:     {}", config.collect_fundamental_data);
        }
        ConfigCommand::Update { symbol, flags } => {
            store.get_or_create_symbol_config(&symbol).await?;
            let changed = store.update_symbol_config(&symbol, flags.into()).await?;
            if changed {
                println!("Config for {} updated.", symbol.to_uppercase());
            } else {
                println!("Config for {} unchanged.", symbol.to_uppercase());
            }
        }
        ConfigCommand::Delete { symbol } => {
            store.delete_symbol_config(&symbol).await?;
            println!("Config for {} deleted.", symbol.to_uppercase());
        }
        ConfigCommand::List => {
            println!(
                "{:<10} {:<6} {:<6} {:<10} {}",
                "Symbol", "Price", "News", "Technical", "Fundamental"
            );
            for (symbol, config) in store.list_symbol_configs().await? {
                println!(
                    "{:<10} {:<6} {:<6} {:<10} {}",
                    symbol.symbol,
                    config.collect_price_data,
                    config.collect_yfinance_news,
                    config.collect_technical_indicators,
                    config.collect_fundamental_data
                );
            }
        }
    }

    Ok(())
}

// =============================================================================
// url
// =============================================================================

pub async fn url(ctx: &JobContext, action: UrlCommand) -> anyhow::Result<()> {
    let store = &ctx.store;

    match action {
        UrlCommand::Add {
            symbol,
            url,
            source,
        } => {
            if !ctx.scrapers.contains(&source) {
                bail!("unknown news source: {}", source);
            }
            let created = store.add_scraping_url(&symbol, &url, &source).await?;
            println!("Scraping URL {} added for {}.", created.id, symbol.to_uppercase());
        }
        UrlCommand::AddYfinance { symbol, all } => {
            let targets: Vec<String> = match (symbol, all) {
                (Some(symbol), false) => vec![store.get_symbol(&symbol).await?.symbol],
                (None, true) => store
                    .list_symbol_configs()
                    .await?
                    .into_iter()
                    .filter(|(_, config)| config.collect_yfinance_news)
                    .map(|(symbol, _)| symbol.symbol)
                    .collect(),
                _ => bail!("pass either a symbol or --all"),
            };

            for code in targets {
                match store
                    .add_scraping_url(&code, &yfinance_news_url(&code), YFINANCE_SOURCE)
                    .await
                {
                    Ok(created) => println!("Scraping URL {} added for {}.", created.id, code),
                    Err(DataError::DuplicateError(_)) => {
                        println!("Scraping URL already exists for {}.", code)
                    }
                    Err(e) => println!("Error adding scraping URL for {}: {}", code, e),
                }
            }
        }
        UrlCommand::List { symbol } => {
            let urls = store.list_scraping_urls(symbol.as_deref()).await?;
            println!("{:<6} {:<8} {:<10} {:<7} {}", "ID", "Symbol", "Source", "Active", "URL");
            for u in &urls {
                println!(
                    "{:<6} {:<8} {:<10} {:<7} {}",
                    u.id, u.symbol_id, u.source, u.is_active, u.url
                );
            }
        }
        UrlCommand::Update {
            id,
            url,
            source,
            active,
        } => {
            let update = ScrapingUrlUpdate {
                url,
                source,
                is_active: active,
            };
            if update.is_empty() {
                bail!("nothing to update");
            }
            let updated = store.update_scraping_url(id, update).await?;
            println!("Scraping URL {} updated: {}", updated.id, updated.url);
        }
        UrlCommand::Delete { id } => {
            store.delete_scraping_url(id).await?;
            println!("Scraping URL {} deleted.", id);
        }
    }

    Ok(())
}

// =============================================================================
// price
// =============================================================================

pub async fn price(ctx: &JobContext, action: PriceCommand) -> anyhow::Result<()> {
    let collector = ctx.price_collector();

    match action {
        PriceCommand::Collect {
            symbol,
            days,
            period,
        } => {
            let request = match days {
                Some(days) => {
                    let end = Utc::now().date_naive();
                    PriceRequest::Range {
                        start: end - chrono::Duration::days(days),
                        end,
                    }
                }
                None => PriceRequest::period(period),
            };
            let report = collector.collect_historical_prices(&symbol, &request).await?;
            if report.total() == 0 {
                println!("No price data collected for {}.", symbol.to_uppercase());
            } else {
                println!(
                    "Collected {} price records for {} ({} skipped).",
                    report.upserted,
                    symbol.to_uppercase(),
                    report.skipped.len()
                );
            }
        }
        PriceCommand::CollectAll { period } => {
            let stats = collector.collect_historical_prices_all(&period).await?;
            stats.log_summary("price collect-all");
            println!(
                "Collected prices for {}/{} symbols ({} records).",
                stats.success, stats.total, stats.records
            );
        }
        PriceCommand::Update { symbol, days } => {
            let count = collector.update_historical_prices(&symbol, days).await?;
            println!("Updated {} price records for {}.", count, symbol.to_uppercase());
        }
        PriceCommand::UpdateAll { days } => {
            let results = collector.update_all_symbols_prices(days).await?;
            let total: usize = results.values().sum();
            println!(
                "Updated prices for {} symbols. Total records updated: {}",
                results.len(),
                total
            );
        }
        PriceCommand::Show {
            symbol,
            start,
            end,
            limit,
        } => {
            let (start, end) = parse_range(start.as_deref(), end.as_deref())?;
            let prices = ctx
                .store
                .get_historical_prices(&symbol, start, end)
                .await?;

            println!(
                "{:<12} {:>12} {:>12} {:>12} {:>12} {:>14}",
                "Date", "Open", "High", "Low", "Close", "Volume"
            );
            let skip = prices.len().saturating_sub(limit);
            for p in prices.iter().skip(skip) {
                println!(
                    "{:<12} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>14}",
                    p.date, p.open, p.high, p.low, p.close, p.volume
                );
            }
        }
    }

    Ok(())
}

// =============================================================================
// news
// =============================================================================

pub async fn news(ctx: &JobContext, action: NewsCommand) -> anyhow::Result<()> {
    let store = &ctx.store;

    match action {
        NewsCommand::Headlines {
            symbol,
            source,
            proxy,
        } => {
            let mut collector = ctx.news_collector();
            if let Some(proxy) = proxy {
                collector = collector.with_proxy(proxy);
            }
            match symbol {
                Some(symbol) => {
                    let headlines = collector.collect_news_headlines(&symbol, &source).await?;
                    println!(
                        "Collected {} headlines for {}.",
                        headlines.len(),
                        symbol.to_uppercase()
                    );
                }
                None => {
                    let stats = collector.collect_news_headlines_by_source(&source).await?;
                    stats.log_summary("news headlines");
                    println!(
                        "Collected {} headlines from {} URLs.",
                        stats.records, stats.total
                    );
                }
            }
        }
        NewsCommand::Articles { limit, proxy } => {
            let mut collector = ctx.news_collector();
            if let Some(proxy) = proxy {
                collector = collector.with_proxy(proxy);
            }
            let stats = collector.collect_news_articles(limit).await?;
            stats.log_summary("news articles");
            println!(
                "Scraped {}/{} articles. {} still without content.",
                stats.success,
                stats.total,
                store.count_news_without_content().await?
            );
        }
        NewsCommand::Show { id } => {
            let news = store.get_news(id).await?;
            let symbols = store.list_news_symbols(id).await?;
            println!("Title:      {}", news.title);
            println!("URL:        {}", news.url);
            println!("Source:     {}", news.source);
            println!(
                "Published:  {}",
                news.published_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
            );
            println!("Scraped:    {}", news.scraped_at.to_rfc3339());
            println!(
                "Words:      {}",
                news.words_count.map(|w| w.to_string()).unwrap_or_else(|| "-".to_string())
            );
            println!(
                "Sentiment:  {}",
                news.sentiment_score
                    .map(|s| format!("{:.3}", s))
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("Symbols:    {} linked", symbols.len());
            if let Some(summary) = &news.content_summary {
                println!("\n{}", summary);
            }
        }
        NewsCommand::List {
            symbol,
            limit,
            offset,
        } => {
            let items = store.find_news_by_symbol(&symbol, limit, offset).await?;
            let total = store.count_news_by_symbol(&symbol).await?;
            for n in &items {
                println!(
                    "{:<8} {:<25} {}",
                    n.id,
                    n.published_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    n.title
                );
            }
            println!("{} of {} news for {}", items.len(), total, symbol.to_uppercase());
        }
        NewsCommand::Search { query, limit } => {
            for n in store.search_news(&query, limit).await? {
                println!("{:<8} {:<10} {}", n.id, n.source, n.title);
            }
        }
        NewsCommand::Stats => {
            let stats = store.news_stats().await?;
            println!("Total: {}", stats.total);
            for (source, count) in &stats.by_source {
                println!("  {:<12} {}", source, count);
            }
            println!("Without content: {}", store.count_news_without_content().await?);
        }
        NewsCommand::Words { batch_size } => {
            let total = ctx.news_processor().populate_words_count(batch_size).await?;
            println!("Updated words count for {} news.", total);
        }
        NewsCommand::Summarize {
            min_words,
            max_tokens,
            limit,
            model,
        } => {
            let summarizer = ctx.summarizer(model.as_deref())?;
            let (count, ids) = ctx
                .news_processor()
                .populate_content_summary(min_words, max_tokens, limit, summarizer.as_ref())
                .await?;
            println!("Summarized {} news with {}: {:?}", count, summarizer.name(), ids);
        }
        NewsCommand::Sentiment { limit } => {
            let (count, ids) = ctx
                .news_processor()
                .populate_sentiment_scores(limit, ctx.sentiment.as_ref())
                .await?;
            println!("Scored {} news: {:?}", count, ids);
        }
    }

    Ok(())
}

// =============================================================================
// ta
// =============================================================================

pub async fn ta(ctx: &JobContext, action: TaCommand) -> anyhow::Result<()> {
    let processor = ctx.technical_processor();

    match action {
        TaCommand::Calculate {
            symbol,
            start,
            end,
            timeframe,
        } => {
            let (start, end) = parse_range(start.as_deref(), end.as_deref())?;
            let timeframe = Timeframe::from_str(&timeframe)?;
            let report = processor
                .calculate_and_store_technical_analysis(&symbol, start, end, timeframe)
                .await?;
            println!(
                "Upserted {} technical analysis records for {} ({} skipped).",
                report.upserted,
                symbol.to_uppercase(),
                report.skipped.len()
            );
        }
        TaCommand::CalculateAll { start, end } => {
            let (start, end) = parse_range(start.as_deref(), end.as_deref())?;
            let stats = processor
                .calculate_and_store_technical_analysis_all(start, end)
                .await?;
            stats.log_summary("ta calculate-all");
            println!(
                "Calculated technical analysis for {}/{} symbols ({} records).",
                stats.success, stats.total, stats.records
            );
        }
        TaCommand::Delete {
            symbol,
            date,
            timeframe,
        } => {
            let timeframe = Timeframe::from_str(&timeframe)?;
            match date {
                Some(date) => {
                    let date = parse_date(&date)?;
                    ctx.store
                        .delete_technical_analysis(&symbol, date, timeframe)
                        .await?;
                    println!("Deleted {} {} for {}.", date, timeframe, symbol.to_uppercase());
                }
                None => {
                    let deleted = ctx
                        .store
                        .delete_technical_analysis_by_symbol(&symbol, timeframe)
                        .await?;
                    println!(
                        "Deleted {} {} records for {}.",
                        deleted,
                        timeframe,
                        symbol.to_uppercase()
                    );
                }
            }
        }
        TaCommand::Show {
            symbol,
            start,
            end,
            timeframe,
            keys,
        } => {
            let (start, end) = parse_range(start.as_deref(), end.as_deref())?;
            let timeframe = Timeframe::from_str(&timeframe)?;
            let keys: Vec<&str> = keys.split(',').map(str::trim).filter(|k| !k.is_empty()).collect();

            let rows = ctx
                .store
                .list_technical_analysis(&symbol, start, end, timeframe)
                .await?;

            print!("{:<12}", "Date");
            for key in &keys {
                print!(" {:>14}", key);
            }
            println!(" {:>9}", "Patterns");
            for row in &rows {
                print!("{:<12}", row.date);
                for key in &keys {
                    let value = row
                        .technical_indicators
                        .get(*key)
                        .and_then(|v| v.as_f64())
                        .map(|v| format!("{:.4}", v))
                        .unwrap_or_else(|| "-".to_string());
                    print!(" {:>14}", value);
                }
                let active = row
                    .candlestick_patterns
                    .values()
                    .filter(|v| v.as_i64().is_some_and(|p| p != 0))
                    .count();
                println!(" {:>9}", active);
            }
        }
    }

    Ok(())
}

// =============================================================================
// fundamental
// =============================================================================

pub async fn fundamental(ctx: &JobContext, action: FundamentalCommand) -> anyhow::Result<()> {
    let collector = ctx.fundamental_collector();

    match action {
        FundamentalCommand::Collect { symbol } => {
            let report = collector.collect_fundamental_data(&symbol).await?;
            println!(
                "Upserted {} fundamental records for {}.",
                report.upserted,
                symbol.to_uppercase()
            );
        }
        FundamentalCommand::CollectAll => {
            let stats = collector.collect_fundamental_data_all().await?;
            stats.log_summary("fundamental collect-all");
            println!(
                "Collected fundamentals for {}/{} symbols ({} records).",
                stats.success, stats.total, stats.records
            );
        }
        FundamentalCommand::Show {
            symbol,
            start,
            end,
            period,
        } => {
            let (start, end) = parse_range(start.as_deref(), end.as_deref())?;
            let period = period.as_deref().map(Period::from_str).transpose()?;
            let rows = ctx
                .store
                .get_fundamental_data(&symbol, start, end, period)
                .await?;

            for row in &rows {
                println!("{} ({}) - {} items", row.date, row.period, row.data.len());
                let json = serde_json::to_string_pretty(&row.data)
                    .context("재무 데이터 직렬화 실패")?;
                println!("{}", json);
            }
            if rows.is_empty() {
                println!("No fundamental data for {}.", symbol.to_uppercase());
            }
        }
        FundamentalCommand::Delete {
            symbol,
            date,
            period,
        } => {
            let date = parse_date(&date)?;
            let period = Period::from_str(&period)?;
            ctx.store
                .delete_fundamental_data(&symbol, date, period)
                .await?;
            println!("Deleted {} {} for {}.", date, period, symbol.to_uppercase());
        }
    }

    Ok(())
}
