//! Yahoo Finance 뉴스 스크래퍼.
//!
//! ## 페이지 구조
//! - 목록: `li.stream-item` 안의 `h3` 제목과 `a[href]` 링크 (상대 경로 가능)
//! - 기사: `div.caas-body p` 본문, `time[datetime]` 게시 시각,
//!   `div.caas-xray-entity fin-ticker[symbol]` 언급 티커

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use praice_core::{Article, Headline};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{HttpFetcher, NewsScraper, ScraperError, ScraperResult};

/// 레지스트리 키.
pub const SOURCE: &str = "yfinance";

const BASE_URL: &str = "https://finance.yahoo.com";

/// Yahoo Finance 뉴스 스크래퍼
pub struct YahooScraper {
    fetcher: HttpFetcher,
}

impl YahooScraper {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl NewsScraper for YahooScraper {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn scrape_headlines(&self, url: &str) -> ScraperResult<Vec<Headline>> {
        let html = self.fetcher.fetch_text(url).await?;
        let headlines = parse_headlines(&html)?;
        debug!(url, count = headlines.len(), "헤드라인 추출");
        Ok(headlines)
    }

    async fn scrape_article(&self, url: &str) -> ScraperResult<Article> {
        let html = self.fetcher.fetch_text(url).await?;
        parse_article(&html)
    }
}

fn selector(css: &str) -> ScraperResult<Selector> {
    Selector::parse(css).map_err(|e| ScraperError::Parse(format!("{}: {}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 상대 링크에 도메인을 붙입니다.
fn absolute_link(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", BASE_URL, href)
    } else {
        format!("{}/{}", BASE_URL, href)
    }
}

/// 목록 페이지 HTML에서 헤드라인을 추출합니다.
///
/// 제목이나 링크가 없는 항목은 건너뜁니다.
pub fn parse_headlines(html: &str) -> ScraperResult<Vec<Headline>> {
    let document = Html::parse_document(html);
    let item_selector = selector("li.stream-item")?;
    let title_selector = selector("h3")?;
    let link_selector = selector("a[href]")?;

    let mut headlines = Vec::new();
    for item in document.select(&item_selector) {
        let Some(title) = item
            .select(&title_selector)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
        else {
            continue;
        };
        let Some(href) = item
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())
        else {
            continue;
        };

        headlines.push(Headline {
            headline: title,
            link: absolute_link(href),
        });
    }

    Ok(headlines)
}

/// 기사 페이지 HTML에서 본문, 게시 시각, 언급 티커를 추출합니다.
pub fn parse_article(html: &str) -> ScraperResult<Article> {
    let document = Html::parse_document(html);

    let paragraph_selector = selector("div.caas-body p")?;
    let paragraphs: Vec<String> = document
        .select(&paragraph_selector)
        .map(element_text)
        .filter(|p| !p.is_empty())
        .collect();

    let content = if paragraphs.is_empty() {
        let body_selector = selector("body")?;
        document
            .select(&body_selector)
            .next()
            .map(element_text)
            .unwrap_or_default()
    } else {
        paragraphs.join("\n")
    };

    let time_selector = selector("time[datetime]")?;
    let published_at = document
        .select(&time_selector)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let ticker_selector = selector("div.caas-xray-entity fin-ticker[symbol]")?;
    let mut symbols: Vec<String> = Vec::new();
    for ticker in document.select(&ticker_selector) {
        if let Some(symbol) = ticker.value().attr("symbol").map(str::trim) {
            if !symbol.is_empty() && !symbols.iter().any(|s| s == symbol) {
                symbols.push(symbol.to_string());
            }
        }
    }

    Ok(Article {
        content,
        published_at,
        symbols,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LIST_HTML: &str = r#"
        <html><body><ul>
          <li class="stream-item">
            <a href="/news/apple-earnings-beat.html"><h3>Apple  earnings beat</h3></a>
          </li>
          <li class="stream-item">
            <h3>Tesla recalls vehicles</h3>
            <a href="https://finance.yahoo.com/news/tesla-recall.html">read</a>
          </li>
          <li class="stream-item"><h3>No link here</h3></li>
          <li class="stream-item ad"><a href="/ad">Sponsored</a></li>
          <li class="other-item"><h3>Wrong class</h3><a href="/x">x</a></li>
        </ul></body></html>
    "#;

    const ARTICLE_HTML: &str = r#"
        <html><body>
          <header><time datetime="2024-03-05T14:30:00.000Z">March 5</time></header>
          <div class="caas-body">
            <p>Apple reported record revenue.</p>
            <p>   </p>
            <p>Shares rose 3% after hours.</p>
          </div>
          <div class="caas-xray-entity">
            <fin-ticker symbol="AAPL"></fin-ticker>
            <fin-ticker symbol="MSFT"></fin-ticker>
            <fin-ticker symbol="AAPL"></fin-ticker>
          </div>
          <fin-ticker symbol="GOOG"></fin-ticker>
        </body></html>
    "#;

    #[test]
    fn test_parse_headlines() {
        let headlines = parse_headlines(LIST_HTML).unwrap();
        assert_eq!(headlines.len(), 2);
        assert_eq!(headlines[0].headline, "Apple earnings beat");
        assert_eq!(
            headlines[0].link,
            "https://finance.yahoo.com/news/apple-earnings-beat.html"
        );
        assert_eq!(headlines[1].headline, "Tesla recalls vehicles");
        assert_eq!(
            headlines[1].link,
            "https://finance.yahoo.com/news/tesla-recall.html"
        );
    }

    #[test]
    fn test_parse_article() {
        let article = parse_article(ARTICLE_HTML).unwrap();
        assert_eq!(
            article.content,
            "Apple reported record revenue.\nShares rose 3% after hours."
        );
        assert_eq!(
            article.published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap())
        );
        assert_eq!(article.symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_parse_article_falls_back_to_body() {
        let html = "<html><body><div>Plain text article</div><time datetime=\"bad\"></time></body></html>";
        let article = parse_article(html).unwrap();
        assert_eq!(article.content, "Plain text article");
        assert!(article.published_at.is_none());
        assert!(article.symbols.is_empty());
    }

    #[test]
    fn test_absolute_link() {
        assert_eq!(absolute_link("/news/a"), "https://finance.yahoo.com/news/a");
        assert_eq!(absolute_link("news/a"), "https://finance.yahoo.com/news/a");
        assert_eq!(absolute_link("https://example.com/a"), "https://example.com/a");
    }

    #[tokio::test]
    async fn test_scrape_headlines_over_http() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/quote/AAPL/news")
            .with_status(200)
            .with_body(LIST_HTML)
            .create_async()
            .await;

        let scraper = YahooScraper::new(HttpFetcher::new(None).unwrap());
        let headlines = scraper
            .scrape_headlines(&format!("{}/quote/AAPL/news", server.url()))
            .await
            .unwrap();
        assert_eq!(headlines.len(), 2);
    }

    #[tokio::test]
    #[ignore] // 네트워크 필요
    async fn test_live_headlines() {
        let scraper = YahooScraper::new(HttpFetcher::new(None).unwrap());
        let headlines = scraper
            .scrape_headlines("https://finance.yahoo.com/quote/AAPL/news")
            .await
            .unwrap();
        println!("{} headlines", headlines.len());
    }
}
