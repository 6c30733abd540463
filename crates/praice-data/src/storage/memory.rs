//! 인메모리 저장소.
//!
//! PostgreSQL 스키마와 같은 고유/CHECK 제약을 흉내 내며, 배치 upsert마다
//! 트랜잭션 수를 세어 배치 경계를 검증할 수 있게 합니다.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use praice_core::{
    normalize_code, FundamentalData, HistoricalPrice, NewNews, NewSymbol, News, NewsStats,
    NewsStage, NewsSymbol, NewsUpdate, Period, PriceBar, ScrapingUrl, ScrapingUrlUpdate, Symbol,
    SymbolConfig, SymbolConfigUpdate, SymbolUpdate, TaEntry, TechnicalAnalysis, Timeframe,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{
    analysis_key, fundamental_key, AnalysisStore, FundamentalStore, NewsStore, PriceStore,
    ScrapingUrlStore, SymbolStore, UpsertReport,
};
use crate::error::{DataError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    symbols: BTreeMap<i64, Symbol>,
    /// symbol_id → 설정
    configs: BTreeMap<i64, SymbolConfig>,
    scraping_urls: BTreeMap<i64, ScrapingUrl>,
    news: BTreeMap<i64, News>,
    news_symbols: BTreeMap<i64, NewsSymbol>,
    prices: BTreeMap<(i64, NaiveDate), HistoricalPrice>,
    analysis: BTreeMap<(i64, Timeframe, NaiveDate), TechnicalAnalysis>,
    fundamentals: BTreeMap<(i64, Period, NaiveDate), FundamentalData>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn symbol(&self, code: &str) -> Result<&Symbol> {
        let code = normalize_code(code);
        self.symbols
            .values()
            .find(|s| s.symbol == code)
            .ok_or_else(|| DataError::NotFound(format!("Symbol {} not found", code)))
    }

    fn symbol_id(&self, code: &str) -> Result<i64> {
        self.symbol(code).map(|s| s.id)
    }

    fn news_mut(&mut self, id: i64) -> Result<&mut News> {
        self.news
            .get_mut(&id)
            .ok_or_else(|| DataError::NotFound(format!("News {} not found", id)))
    }
}

/// 인메모리 저장소.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    transactions: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 실행된 배치 트랜잭션 수.
    pub fn transaction_count(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    fn begin_transaction(&self) {
        self.transactions.fetch_add(1, Ordering::SeqCst);
    }
}

/// `historical_prices_1d`의 CHECK 제약과 같은 검사.
fn check_price(bar: &PriceBar) -> std::result::Result<(), String> {
    let prices = [bar.open, bar.high, bar.low, bar.close, bar.dividends, bar.stock_splits];
    if prices.iter().any(|p| *p < Decimal::ZERO) || bar.volume < 0 {
        return Err("violates check constraint historical_prices_1d_non_negative".to_string());
    }
    Ok(())
}

fn in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}

/// 실패 기록이 없는 행 먼저, 그다음 오래된 실패 순. 같은 시각이면 ID 순.
fn in_queue_order(mut news: Vec<News>, stage: NewsStage, limit: usize) -> Vec<News> {
    news.sort_by_key(|n| (n.attempted_at(stage), n.id));
    news.truncate(limit);
    news
}

/// 게시 시각 최신순, null은 마지막.
fn sort_newest_first(news: &mut [News]) {
    news.sort_by(|a, b| match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x).then(b.id.cmp(&a.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.id.cmp(&a.id),
    });
}

#[async_trait]
impl SymbolStore for MemoryStore {
    async fn get_symbol(&self, code: &str) -> Result<Symbol> {
        self.state.read().await.symbol(code).cloned()
    }

    async fn add_symbol(&self, new: NewSymbol) -> Result<Symbol> {
        let new = new.normalized()?;
        let mut state = self.state.write().await;
        if state.symbol(&new.symbol).is_ok() {
            return Err(DataError::DuplicateError(format!(
                "Symbol {} already exists",
                new.symbol
            )));
        }

        let now = Utc::now();
        let symbol = Symbol {
            id: state.next_id(),
            symbol: new.symbol,
            name: new.name,
            asset_class: new.asset_class,
            sector: new.sector,
            industry: new.industry,
            exchange: new.exchange,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.symbols.insert(symbol.id, symbol.clone());
        Ok(symbol)
    }

    async fn list_symbols(&self) -> Result<Vec<Symbol>> {
        let state = self.state.read().await;
        let mut symbols: Vec<Symbol> = state.symbols.values().cloned().collect();
        symbols.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(symbols)
    }

    async fn list_active_symbols(&self) -> Result<Vec<Symbol>> {
        Ok(self
            .list_symbols()
            .await?
            .into_iter()
            .filter(|s| s.is_active)
            .collect())
    }

    async fn update_symbol(&self, code: &str, update: SymbolUpdate) -> Result<Symbol> {
        let mut state = self.state.write().await;
        let id = state.symbol_id(code)?;
        let symbol = state
            .symbols
            .get_mut(&id)
            .ok_or_else(|| DataError::NotFound(format!("Symbol {} not found", code)))?;
        if !update.is_empty() {
            update.apply_to(symbol);
            symbol.updated_at = Utc::now();
        }
        Ok(symbol.clone())
    }

    async fn delete_symbol(&self, code: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let id = state.symbol_id(code)?;

        state.symbols.remove(&id);
        state.configs.remove(&id);
        state.scraping_urls.retain(|_, u| u.symbol_id != id);
        state.news_symbols.retain(|_, l| l.symbol_id != id);
        state.prices.retain(|(sid, _), _| *sid != id);
        state.analysis.retain(|(sid, _, _), _| *sid != id);
        state.fundamentals.retain(|(sid, _, _), _| *sid != id);
        Ok(())
    }

    async fn create_symbol_config(
        &self,
        code: &str,
        flags: SymbolConfigUpdate,
    ) -> Result<SymbolConfig> {
        let mut state = self.state.write().await;
        let symbol_id = state.symbol_id(code)?;
        if state.configs.contains_key(&symbol_id) {
            return Err(DataError::DuplicateError(format!(
                "Config for {} already exists",
                code
            )));
        }

        let id = state.next_id();
        let mut config = SymbolConfig::defaults(id, symbol_id);
        flags.apply_to(&mut config);
        state.configs.insert(symbol_id, config.clone());
        Ok(config)
    }

    async fn get_symbol_config(&self, code: &str) -> Result<SymbolConfig> {
        let state = self.state.read().await;
        let symbol_id = state.symbol_id(code)?;
        state
            .configs
            .get(&symbol_id)
            .cloned()
            .ok_or_else(|| DataError::NotFound(format!("Config for {} not found", code)))
    }

    async fn update_symbol_config(&self, code: &str, update: SymbolConfigUpdate) -> Result<bool> {
        let mut state = self.state.write().await;
        let symbol_id = state.symbol_id(code)?;
        let config = state
            .configs
            .get_mut(&symbol_id)
            .ok_or_else(|| DataError::NotFound(format!("Config for {} not found", code)))?;
        Ok(update.apply_to(config))
    }

    async fn delete_symbol_config(&self, code: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let symbol_id = state.symbol_id(code)?;
        state
            .configs
            .remove(&symbol_id)
            .map(|_| ())
            .ok_or_else(|| DataError::NotFound(format!("Config for {} not found", code)))
    }

    async fn list_symbol_configs(&self) -> Result<Vec<(Symbol, SymbolConfig)>> {
        let state = self.state.read().await;
        let mut pairs: Vec<(Symbol, SymbolConfig)> = state
            .configs
            .iter()
            .filter_map(|(sid, config)| {
                state
                    .symbols
                    .get(sid)
                    .map(|s| (s.clone(), config.clone()))
            })
            .collect();
        pairs.sort_by(|a, b| a.0.symbol.cmp(&b.0.symbol));
        Ok(pairs)
    }
}

#[async_trait]
impl ScrapingUrlStore for MemoryStore {
    async fn add_scraping_url(&self, code: &str, url: &str, source: &str) -> Result<ScrapingUrl> {
        let mut state = self.state.write().await;
        let symbol_id = state.symbol_id(code)?;
        if state
            .scraping_urls
            .values()
            .any(|u| u.symbol_id == symbol_id && u.source == source)
        {
            return Err(DataError::DuplicateError(format!(
                "Scraping URL for {}/{} already exists",
                code, source
            )));
        }

        let now = Utc::now();
        let scraping_url = ScrapingUrl {
            id: state.next_id(),
            symbol_id,
            url: url.to_string(),
            source: source.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state
            .scraping_urls
            .insert(scraping_url.id, scraping_url.clone());
        Ok(scraping_url)
    }

    async fn list_scraping_urls(&self, code: Option<&str>) -> Result<Vec<ScrapingUrl>> {
        let state = self.state.read().await;
        let symbol_id = code.map(|c| state.symbol_id(c)).transpose()?;
        Ok(state
            .scraping_urls
            .values()
            .filter(|u| symbol_id.map_or(true, |id| u.symbol_id == id))
            .cloned()
            .collect())
    }

    async fn get_scraping_url(&self, code: &str, source: &str) -> Result<ScrapingUrl> {
        let state = self.state.read().await;
        let symbol_id = state.symbol_id(code)?;
        state
            .scraping_urls
            .values()
            .find(|u| u.symbol_id == symbol_id && u.source == source)
            .cloned()
            .ok_or_else(|| {
                DataError::NotFound(format!("Scraping URL for {}/{} not found", code, source))
            })
    }

    async fn list_active_scraping_urls(&self, source: &str) -> Result<Vec<ScrapingUrl>> {
        let state = self.state.read().await;
        Ok(state
            .scraping_urls
            .values()
            .filter(|u| u.is_active && u.source == source)
            .filter(|u| {
                state
                    .symbols
                    .get(&u.symbol_id)
                    .is_some_and(|s| s.is_active)
            })
            .cloned()
            .collect())
    }

    async fn update_scraping_url(
        &self,
        id: i64,
        update: ScrapingUrlUpdate,
    ) -> Result<ScrapingUrl> {
        let mut state = self.state.write().await;
        if let Some(source) = &update.source {
            let current = state
                .scraping_urls
                .get(&id)
                .ok_or_else(|| DataError::NotFound(format!("Scraping URL {} not found", id)))?;
            let symbol_id = current.symbol_id;
            if state
                .scraping_urls
                .values()
                .any(|u| u.id != id && u.symbol_id == symbol_id && &u.source == source)
            {
                return Err(DataError::DuplicateError(format!(
                    "Scraping URL for source {} already exists",
                    source
                )));
            }
        }

        let target = state
            .scraping_urls
            .get_mut(&id)
            .ok_or_else(|| DataError::NotFound(format!("Scraping URL {} not found", id)))?;
        update.apply_to(target);
        target.updated_at = Utc::now();
        Ok(target.clone())
    }

    async fn delete_scraping_url(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .scraping_urls
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DataError::NotFound(format!("Scraping URL {} not found", id)))
    }
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn create_news(&self, new: NewNews) -> Result<News> {
        let mut state = self.state.write().await;
        if state.news.values().any(|n| n.url == new.url) {
            return Err(DataError::DuplicateError(format!(
                "News {} already exists",
                new.url
            )));
        }

        let news = News {
            id: state.next_id(),
            title: new.title,
            url: new.url,
            source: new.source,
            content: new.content,
            published_at: new.published_at,
            scraped_at: new.scraped_at,
            words_count: None,
            content_summary: None,
            sentiment_score: None,
            article_attempted_at: None,
            summary_attempted_at: None,
            sentiment_attempted_at: None,
        };
        state.news.insert(news.id, news.clone());
        Ok(news)
    }

    async fn get_or_create_news(&self, new: NewNews) -> Result<(News, bool)> {
        {
            let state = self.state.read().await;
            if let Some(existing) = state.news.values().find(|n| n.url == new.url) {
                return Ok((existing.clone(), false));
            }
        }
        match self.create_news(new.clone()).await {
            Ok(news) => Ok((news, true)),
            Err(DataError::DuplicateError(_)) => {
                let state = self.state.read().await;
                state
                    .news
                    .values()
                    .find(|n| n.url == new.url)
                    .cloned()
                    .map(|n| (n, false))
                    .ok_or_else(|| DataError::NotFound(format!("News {} not found", new.url)))
            }
            Err(e) => Err(e),
        }
    }

    async fn get_news(&self, id: i64) -> Result<News> {
        let state = self.state.read().await;
        state
            .news
            .get(&id)
            .cloned()
            .ok_or_else(|| DataError::NotFound(format!("News {} not found", id)))
    }

    async fn update_news(&self, id: i64, update: NewsUpdate) -> Result<News> {
        let mut state = self.state.write().await;
        let news = state.news_mut(id)?;
        update.apply_to(news);
        Ok(news.clone())
    }

    async fn delete_news(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .news
            .remove(&id)
            .ok_or_else(|| DataError::NotFound(format!("News {} not found", id)))?;
        state.news_symbols.retain(|_, l| l.news_id != id);
        Ok(())
    }

    async fn set_article_content(
        &self,
        id: i64,
        content: &str,
        published_at: Option<DateTime<Utc>>,
        scraped_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let news = state.news_mut(id)?;
        news.content = Some(content.to_string());
        news.published_at = published_at;
        news.scraped_at = scraped_at;
        Ok(())
    }

    async fn link_news_symbol(&self, news_id: i64, symbol_id: i64) -> Result<(NewsSymbol, bool)> {
        let mut state = self.state.write().await;
        if !state.news.contains_key(&news_id) {
            return Err(DataError::NotFound(format!("News {} not found", news_id)));
        }
        if !state.symbols.contains_key(&symbol_id) {
            return Err(DataError::NotFound(format!("Symbol id {} not found", symbol_id)));
        }
        if let Some(link) = state
            .news_symbols
            .values()
            .find(|l| l.news_id == news_id && l.symbol_id == symbol_id)
        {
            return Ok((*link, false));
        }

        let link = NewsSymbol {
            id: state.next_id(),
            news_id,
            symbol_id,
        };
        state.news_symbols.insert(link.id, link);
        Ok((link, true))
    }

    async fn list_news_symbols(&self, news_id: i64) -> Result<Vec<NewsSymbol>> {
        let state = self.state.read().await;
        Ok(state
            .news_symbols
            .values()
            .filter(|l| l.news_id == news_id)
            .copied()
            .collect())
    }

    async fn delete_news_symbol(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .news_symbols
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DataError::NotFound(format!("NewsSymbol {} not found", id)))
    }

    async fn find_news_by_symbol(
        &self,
        code: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<News>> {
        let state = self.state.read().await;
        let symbol_id = state.symbol_id(code)?;
        let mut news: Vec<News> = state
            .news_symbols
            .values()
            .filter(|l| l.symbol_id == symbol_id)
            .filter_map(|l| state.news.get(&l.news_id).cloned())
            .collect();
        sort_newest_first(&mut news);
        Ok(news.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_news_by_symbol(&self, code: &str) -> Result<i64> {
        let state = self.state.read().await;
        let symbol_id = state.symbol_id(code)?;
        Ok(state
            .news_symbols
            .values()
            .filter(|l| l.symbol_id == symbol_id)
            .count() as i64)
    }

    async fn search_news(&self, query: &str, limit: usize) -> Result<Vec<News>> {
        let needle = query.to_lowercase();
        let state = self.state.read().await;
        let mut news: Vec<News> = state
            .news
            .values()
            .filter(|n| {
                n.title.to_lowercase().contains(&needle)
                    || n
                        .content
                        .as_deref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        sort_newest_first(&mut news);
        news.truncate(limit);
        Ok(news)
    }

    async fn news_stats(&self) -> Result<NewsStats> {
        let state = self.state.read().await;
        let mut stats = NewsStats {
            total: state.news.len() as i64,
            ..Default::default()
        };
        for news in state.news.values() {
            *stats.by_source.entry(news.source.clone()).or_insert(0) += 1;
        }
        Ok(stats)
    }

    async fn list_news_without_content(&self, limit: usize) -> Result<Vec<News>> {
        let state = self.state.read().await;
        let pending = state
            .news
            .values()
            .filter(|n| n.content.is_none())
            .cloned()
            .collect();
        Ok(in_queue_order(pending, NewsStage::Article, limit))
    }

    async fn count_news_without_content(&self) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.news.values().filter(|n| n.content.is_none()).count() as i64)
    }

    async fn list_news_pending_word_count(&self, limit: Option<usize>) -> Result<Vec<News>> {
        let state = self.state.read().await;
        Ok(state
            .news
            .values()
            .filter(|n| n.content.is_some() && n.words_count.is_none())
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn list_news_pending_summary(&self, min_words: i32, limit: usize) -> Result<Vec<News>> {
        let state = self.state.read().await;
        let pending = state
            .news
            .values()
            .filter(|n| n.words_count.is_some_and(|w| w >= min_words))
            .filter(|n| n.content_summary.is_none())
            .cloned()
            .collect();
        Ok(in_queue_order(pending, NewsStage::Summary, limit))
    }

    async fn list_news_pending_sentiment(&self, limit: usize) -> Result<Vec<News>> {
        let state = self.state.read().await;
        let pending = state
            .news
            .values()
            .filter(|n| n.content_summary.is_some() && n.sentiment_score.is_none())
            .cloned()
            .collect();
        Ok(in_queue_order(pending, NewsStage::Sentiment, limit))
    }

    async fn set_words_count_batch(&self, counts: &[(i64, i32)]) -> Result<usize> {
        self.begin_transaction();
        let mut state = self.state.write().await;
        if let Some((missing, _)) = counts.iter().find(|(id, _)| !state.news.contains_key(id)) {
            return Err(DataError::NotFound(format!("News {} not found", missing)));
        }
        for (id, count) in counts {
            state.news_mut(*id)?.words_count = Some(*count);
        }
        Ok(counts.len())
    }

    async fn set_content_summary(&self, id: i64, summary: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.news_mut(id)?.content_summary = Some(summary.to_string());
        Ok(())
    }

    async fn set_sentiment_score(&self, id: i64, score: f64) -> Result<()> {
        let mut state = self.state.write().await;
        state.news_mut(id)?.sentiment_score = Some(score);
        Ok(())
    }

    async fn mark_news_attempt(
        &self,
        id: i64,
        stage: NewsStage,
        attempted_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let news = state.news_mut(id)?;
        match stage {
            NewsStage::Article => news.article_attempted_at = Some(attempted_at),
            NewsStage::Summary => news.summary_attempted_at = Some(attempted_at),
            NewsStage::Sentiment => news.sentiment_attempted_at = Some(attempted_at),
        }
        Ok(())
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn get_historical_prices(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalPrice>> {
        let state = self.state.read().await;
        let symbol_id = state.symbol_id(code)?;
        Ok(state
            .prices
            .range((symbol_id, NaiveDate::MIN)..=(symbol_id, NaiveDate::MAX))
            .filter(|((_, date), _)| in_range(*date, start, end))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn get_historical_price(&self, code: &str, date: NaiveDate) -> Result<HistoricalPrice> {
        let state = self.state.read().await;
        let symbol_id = state.symbol_id(code)?;
        state
            .prices
            .get(&(symbol_id, date))
            .cloned()
            .ok_or_else(|| DataError::NotFound(format!("Price {} {} not found", code, date)))
    }

    async fn delete_historical_price(&self, code: &str, date: NaiveDate) -> Result<()> {
        let mut state = self.state.write().await;
        let symbol_id = state.symbol_id(code)?;
        state
            .prices
            .remove(&(symbol_id, date))
            .map(|_| ())
            .ok_or_else(|| DataError::NotFound(format!("Price {} {} not found", code, date)))
    }

    async fn upsert_price_batch(&self, symbol_id: i64, batch: &[PriceBar]) -> Result<UpsertReport> {
        self.begin_transaction();
        let mut state = self.state.write().await;
        let mut report = UpsertReport::default();

        for bar in batch {
            match check_price(bar) {
                Ok(()) => {
                    state
                        .prices
                        .insert((symbol_id, bar.date), HistoricalPrice::from_bar(symbol_id, bar));
                    report.record_success();
                }
                Err(reason) => report.record_skip(bar.key(), reason),
            }
        }
        Ok(report)
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn get_technical_analysis(
        &self,
        code: &str,
        date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<TechnicalAnalysis> {
        let state = self.state.read().await;
        let symbol_id = state.symbol_id(code)?;
        state
            .analysis
            .get(&(symbol_id, timeframe, date))
            .cloned()
            .ok_or_else(|| {
                DataError::NotFound(format!(
                    "Technical analysis {} {} not found",
                    code,
                    analysis_key(date, timeframe)
                ))
            })
    }

    async fn list_technical_analysis(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        timeframe: Timeframe,
    ) -> Result<Vec<TechnicalAnalysis>> {
        let state = self.state.read().await;
        let symbol_id = state.symbol_id(code)?;
        Ok(state
            .analysis
            .range((symbol_id, timeframe, NaiveDate::MIN)..=(symbol_id, timeframe, NaiveDate::MAX))
            .filter(|((_, _, date), _)| in_range(*date, start, end))
            .map(|(_, ta)| ta.clone())
            .collect())
    }

    async fn delete_technical_analysis(
        &self,
        code: &str,
        date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let symbol_id = state.symbol_id(code)?;
        state
            .analysis
            .remove(&(symbol_id, timeframe, date))
            .map(|_| ())
            .ok_or_else(|| {
                DataError::NotFound(format!(
                    "Technical analysis {} {} not found",
                    code,
                    analysis_key(date, timeframe)
                ))
            })
    }

    async fn delete_technical_analysis_by_symbol(
        &self,
        code: &str,
        timeframe: Timeframe,
    ) -> Result<u64> {
        let mut state = self.state.write().await;
        let symbol_id = state.symbol_id(code)?;
        let before = state.analysis.len();
        state
            .analysis
            .retain(|(sid, tf, _), _| !(*sid == symbol_id && *tf == timeframe));
        Ok((before - state.analysis.len()) as u64)
    }

    async fn upsert_analysis_batch(
        &self,
        symbol_id: i64,
        batch: &[(NaiveDate, TaEntry)],
        timeframe: Timeframe,
    ) -> Result<UpsertReport> {
        self.begin_transaction();
        let mut state = self.state.write().await;
        let mut report = UpsertReport::default();

        for (date, entry) in batch {
            state
                .analysis
                .entry((symbol_id, timeframe, *date))
                .and_modify(|row| row.merge(entry))
                .or_insert_with(|| TechnicalAnalysis {
                    symbol_id,
                    date: *date,
                    timeframe,
                    technical_indicators: entry.technical_indicators.clone(),
                    candlestick_patterns: entry.candlestick_patterns.clone(),
                });
            report.record_success();
        }
        Ok(report)
    }
}

#[async_trait]
impl FundamentalStore for MemoryStore {
    async fn get_fundamental_data(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        period: Option<Period>,
    ) -> Result<Vec<FundamentalData>> {
        let state = self.state.read().await;
        let symbol_id = state.symbol_id(code)?;
        let mut rows: Vec<FundamentalData> = state
            .fundamentals
            .iter()
            .filter(|((sid, p, date), _)| {
                *sid == symbol_id
                    && period.map_or(true, |want| *p == want)
                    && in_range(*date, start, end)
            })
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.period.cmp(&b.period)));
        Ok(rows)
    }

    async fn delete_fundamental_data(
        &self,
        code: &str,
        date: NaiveDate,
        period: Period,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let symbol_id = state.symbol_id(code)?;
        state
            .fundamentals
            .remove(&(symbol_id, period, date))
            .map(|_| ())
            .ok_or_else(|| {
                DataError::NotFound(format!(
                    "Fundamental data {} {} not found",
                    code,
                    fundamental_key(date, period)
                ))
            })
    }

    async fn upsert_fundamental_batch(
        &self,
        symbol_id: i64,
        batch: &[(NaiveDate, Map<String, Value>)],
        period: Period,
    ) -> Result<UpsertReport> {
        self.begin_transaction();
        let mut state = self.state.write().await;
        let mut report = UpsertReport::default();

        for (date, data) in batch {
            state.fundamentals.insert(
                (symbol_id, period, *date),
                FundamentalData {
                    symbol_id,
                    date: *date,
                    period,
                    data: data.clone(),
                },
            );
            report.record_success();
        }
        Ok(report)
    }
}
