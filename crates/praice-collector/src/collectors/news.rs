//! 뉴스 수집기.
//!
//! 2단계로 동작합니다:
//! 1. 헤드라인: 심볼별 스크래핑 URL에서 제목과 링크를 수집해 본문 없는 뉴스 행을 만듭니다.
//! 2. 본문: 본문이 없는 행을 소스별 스크래퍼로 다시 방문해 본문, 게시 시각, 관련 심볼을 채웁니다.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use praice_core::{normalize_code, Headline, NewNews, News, NewsStage, ScrapingUrl};
use praice_data::{MarketDataProvider, NewsScraper, ScraperRegistry, Store};

use crate::{CollectionStats, Result};

/// 헤드라인/본문 수집기
pub struct NewsCollector {
    store: Arc<dyn Store>,
    registry: Arc<ScraperRegistry>,
    provider: Arc<dyn MarketDataProvider>,
    proxy: Option<String>,
}

impl NewsCollector {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<ScraperRegistry>,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Self {
        Self {
            store,
            registry,
            provider,
            proxy: None,
        }
    }

    /// 스크래퍼 설정의 프록시 대신 사용할 프록시
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// 한 심볼/소스의 헤드라인을 수집합니다.
    ///
    /// 심볼이나 스크래핑 URL이 없으면 로그를 남기고 빈 목록을 반환합니다.
    pub async fn collect_news_headlines(&self, code: &str, source: &str) -> Result<Vec<Headline>> {
        let code = normalize_code(code);
        tracing::info!(symbol = %code, source = source, "헤드라인 수집 시작");

        let url = match self.store.get_scraping_url(&code, source).await {
            Ok(url) => url,
            Err(e) if e.is_not_found() => {
                tracing::error!(symbol = %code, source = source, error = %e, "스크래핑 URL 없음");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let headlines = self.scrape_headlines(&url).await?;
        tracing::info!(
            symbol = %code,
            source = source,
            count = headlines.len(),
            "헤드라인 수집 완료"
        );
        Ok(headlines)
    }

    /// 해당 소스의 활성 URL 전체에서 헤드라인을 수집합니다. URL 단위로 실패를 격리합니다.
    pub async fn collect_news_headlines_by_source(&self, source: &str) -> Result<CollectionStats> {
        let start = Instant::now();
        let mut stats = CollectionStats::new();

        let urls = self.store.list_active_scraping_urls(source).await?;
        tracing::info!(source = source, count = urls.len(), "헤드라인 수집 대상 조회 완료");

        for url in &urls {
            stats.total += 1;
            match self.scrape_headlines(url).await {
                Ok(headlines) if headlines.is_empty() => stats.empty += 1,
                Ok(headlines) => {
                    stats.success += 1;
                    stats.records += headlines.len();
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::error!(url = %url.url, source = source, error = %e, "헤드라인 수집 실패");
                }
            }
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    async fn scrape_headlines(&self, url: &ScrapingUrl) -> Result<Vec<Headline>> {
        let scraper = self.registry.create(&url.source, self.proxy.as_deref())?;
        let headlines = scraper.scrape_headlines(&url.url).await?;

        let mut created = 0usize;
        for item in &headlines {
            let new = NewNews::headline(&item.headline, &item.link, &url.source, Utc::now());
            match self.store.get_or_create_news(new).await {
                Ok((_, true)) => created += 1,
                Ok((_, false)) => {}
                Err(e) => {
                    tracing::warn!(link = %item.link, error = %e, "헤드라인 저장 실패");
                }
            }
        }

        tracing::debug!(
            url = %url.url,
            scraped = headlines.len(),
            created = created,
            "헤드라인 저장 완료"
        );
        Ok(headlines)
    }

    /// 본문이 없는 뉴스를 최대 `limit`건 방문해 본문과 관련 심볼을 채웁니다.
    ///
    /// 기사 하나, 심볼 하나의 실패는 로그만 남기고 건너뜁니다.
    pub async fn collect_news_articles(&self, limit: usize) -> Result<CollectionStats> {
        let start = Instant::now();
        let mut stats = CollectionStats::new();

        let pending = self.store.list_news_without_content(limit).await?;
        tracing::info!(count = pending.len(), "본문 수집 시작");

        let mut scrapers: BTreeMap<String, Arc<dyn NewsScraper>> = BTreeMap::new();
        for news in &pending {
            stats.total += 1;
            match self.collect_article(news, &mut scrapers).await {
                Ok(linked) => {
                    stats.success += 1;
                    stats.records += linked;
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::error!(news_id = news.id, url = %news.url, error = %e, "기사 수집 실패");
                    if let Err(e) = self
                        .store
                        .mark_news_attempt(news.id, NewsStage::Article, Utc::now())
                        .await
                    {
                        tracing::warn!(news_id = news.id, error = %e, "실패 시각 기록 실패");
                    }
                }
            }
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    /// 기사 하나를 수집합니다. 새로 연결된 심볼 수를 반환합니다.
    async fn collect_article(
        &self,
        news: &News,
        scrapers: &mut BTreeMap<String, Arc<dyn NewsScraper>>,
    ) -> Result<usize> {
        let scraper = match scrapers.get(&news.source) {
            Some(scraper) => scraper.clone(),
            None => {
                let scraper = self.registry.create(&news.source, self.proxy.as_deref())?;
                scrapers.insert(news.source.clone(), scraper.clone());
                scraper
            }
        };

        let article = scraper.scrape_article(&news.url).await?;
        self.store
            .set_article_content(news.id, &article.content, article.published_at, Utc::now())
            .await?;

        let mut linked = 0usize;
        for code in &article.symbols {
            let symbol = match self
                .store
                .get_or_create_symbol(code, self.provider.as_ref())
                .await
            {
                Ok(symbol) => symbol,
                Err(e) => {
                    tracing::error!(news_id = news.id, symbol = %code, error = %e, "관련 심볼 생성 실패");
                    continue;
                }
            };

            match self.store.link_news_symbol(news.id, symbol.id).await {
                Ok((_, true)) => linked += 1,
                Ok((_, false)) => {}
                Err(e) => {
                    tracing::error!(news_id = news.id, symbol = %code, error = %e, "뉴스-심볼 연결 실패");
                }
            }
        }

        tracing::debug!(
            news_id = news.id,
            words = article.content.split_whitespace().count(),
            symbols = article.symbols.len(),
            linked = linked,
            "기사 수집 완료"
        );
        Ok(linked)
    }
}
