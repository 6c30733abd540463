//! 뉴스 수집/보강 파이프라인 통합 테스트.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use common::{MockProvider, MockScorer, MockScraper, MockSummarizer, MOCK_SOURCE};
use praice_collector::{NewsCollector, NewsProcessor};
use praice_core::{AssetClass, NewNews, NewSymbol, SymbolUpdate};
use praice_data::{MemoryStore, NewsStore, ScrapingUrlStore, Store, SymbolStore};

const AAPL_URL: &str = "https://news.mock/quote/AAPL";
const MSFT_URL: &str = "https://news.mock/quote/MSFT";

async fn store_with_urls(codes: &[(&str, &str)]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (code, url) in codes {
        store
            .add_symbol(NewSymbol::new(*code, *code, AssetClass::Stock))
            .await
            .unwrap();
        store.add_scraping_url(code, url, MOCK_SOURCE).await.unwrap();
    }
    store
}

fn news_collector(
    store: &Arc<MemoryStore>,
    scraper: MockScraper,
    provider: MockProvider,
) -> NewsCollector {
    NewsCollector::new(
        store.clone() as Arc<dyn Store>,
        scraper.into_registry(),
        Arc::new(provider),
    )
}

fn article_news(title: &str, url: &str, content: &str) -> NewNews {
    NewNews {
        content: Some(content.to_string()),
        ..NewNews::headline(title, url, MOCK_SOURCE, Utc::now())
    }
}

fn words(n: usize) -> String {
    vec!["revenue"; n].join(" ")
}

#[tokio::test]
async fn test_headlines_are_deduplicated_by_link() {
    let store = store_with_urls(&[("AAPL", AAPL_URL)]).await;
    let scraper = MockScraper::default().with_headlines(
        AAPL_URL,
        &[
            ("Apple beats estimates", "https://news.mock/a/1"),
            ("Apple unveils device", "https://news.mock/a/2"),
        ],
    );
    let collector = news_collector(&store, scraper, MockProvider::new());

    let first = collector.collect_news_headlines("aapl", MOCK_SOURCE).await.unwrap();
    let second = collector.collect_news_headlines("AAPL", MOCK_SOURCE).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(store.count_news_without_content().await.unwrap(), 2);
}

#[tokio::test]
async fn test_missing_scraping_url_returns_empty() {
    let store = store_with_urls(&[("AAPL", AAPL_URL)]).await;
    let collector = news_collector(&store, MockScraper::default(), MockProvider::new());

    let headlines = collector
        .collect_news_headlines("MSFT", MOCK_SOURCE)
        .await
        .unwrap();

    assert!(headlines.is_empty());
    assert_eq!(store.count_news_without_content().await.unwrap(), 0);
}

#[tokio::test]
async fn test_headlines_by_source_isolates_failures() {
    let store = store_with_urls(&[("AAPL", AAPL_URL), ("MSFT", MSFT_URL), ("IBM", "https://news.mock/quote/IBM")]).await;
    store
        .update_symbol("IBM", SymbolUpdate::active(false))
        .await
        .unwrap();

    // MSFT URL은 등록되지 않아 스크래핑이 실패합니다.
    let scraper = MockScraper::default()
        .with_headlines(AAPL_URL, &[("Apple beats estimates", "https://news.mock/a/1")])
        .with_headlines(
            "https://news.mock/quote/IBM",
            &[("IBM headline", "https://news.mock/i/1")],
        );
    let collector = news_collector(&store, scraper, MockProvider::new());

    let stats = collector
        .collect_news_headlines_by_source(MOCK_SOURCE)
        .await
        .unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.records, 1);
    assert_eq!(store.count_news_without_content().await.unwrap(), 1);
}

#[tokio::test]
async fn test_articles_fill_content_and_link_symbols() {
    let store = store_with_urls(&[("AAPL", AAPL_URL)]).await;
    let scraper = MockScraper::default()
        .with_headlines(
            AAPL_URL,
            &[
                ("Chip makers rally", "https://news.mock/a/1"),
                ("Paywalled story", "https://news.mock/a/2"),
            ],
        )
        .with_article(
            "https://news.mock/a/1",
            "Apple and Nvidia shares rose on Tuesday.",
            &["AAPL", "NVDA", "GHOST"],
        );
    let collector = news_collector(&store, scraper, MockProvider::new().with_symbol("NVDA"));

    collector
        .collect_news_headlines("AAPL", MOCK_SOURCE)
        .await
        .unwrap();
    let stats = collector.collect_news_articles(100).await.unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.records, 2);

    // NVDA는 외부 정보로 생성, GHOST는 정보가 없어 건너뜀
    assert!(store.get_symbol("NVDA").await.is_ok());
    assert!(store.get_symbol("GHOST").await.unwrap_err().is_not_found());

    let news = store.search_news("Chip makers", 10).await.unwrap();
    assert_eq!(news.len(), 1);
    assert_eq!(
        news[0].content.as_deref(),
        Some("Apple and Nvidia shares rose on Tuesday.")
    );
    assert_eq!(store.list_news_symbols(news[0].id).await.unwrap().len(), 2);

    // 실패한 기사는 다음 실행에서 다시 대상이 됩니다.
    assert_eq!(store.count_news_without_content().await.unwrap(), 1);
}

#[tokio::test]
async fn test_enrichment_runs_in_order() {
    let store = Arc::new(MemoryStore::new());
    let long = store
        .create_news(article_news(
            "Quarterly results",
            "https://news.mock/long",
            &format!("Revenue grew strongly. {}", words(350)),
        ))
        .await
        .unwrap();
    let short = store
        .create_news(article_news("Brief", "https://news.mock/short", &words(50)))
        .await
        .unwrap();

    let processor = NewsProcessor::new(store.clone() as Arc<dyn Store>);
    let summarizer = MockSummarizer::new();
    let scorer = MockScorer(0.25);

    // 요약 전에는 감성 점수 대상이 없습니다.
    let (scored, _) = processor.populate_sentiment_scores(5, &scorer).await.unwrap();
    assert_eq!(scored, 0);

    let counted = processor.populate_words_count(1).await.unwrap();
    assert_eq!(counted, 2);
    assert_eq!(store.get_news(long.id).await.unwrap().words_count, Some(353));
    assert_eq!(store.get_news(short.id).await.unwrap().words_count, Some(50));

    let (summarized, ids) = processor
        .populate_content_summary(300, 200, 5, &summarizer)
        .await
        .unwrap();
    assert_eq!(summarized, 1);
    assert_eq!(ids, vec![long.id]);
    assert_eq!(
        store.get_news(long.id).await.unwrap().content_summary.as_deref(),
        Some("Revenue grew strongly.")
    );
    assert!(store.get_news(short.id).await.unwrap().content_summary.is_none());

    let (scored, ids) = processor.populate_sentiment_scores(5, &scorer).await.unwrap();
    assert_eq!(scored, 1);
    assert_eq!(ids, vec![long.id]);
    assert_eq!(store.get_news(long.id).await.unwrap().sentiment_score, Some(0.25));

    // 다시 실행하면 처리할 대상이 없습니다.
    assert_eq!(processor.populate_words_count(200).await.unwrap(), 0);
    let (summarized, _) = processor
        .populate_content_summary(300, 200, 5, &summarizer)
        .await
        .unwrap();
    assert_eq!(summarized, 0);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_summary_failure_is_skipped() {
    let store = Arc::new(MemoryStore::new());
    let failing = store
        .create_news(article_news(
            "Model down",
            "https://news.mock/fail",
            &format!("FAIL {}", words(400)),
        ))
        .await
        .unwrap();
    let ok = store
        .create_news(article_news(
            "Model up",
            "https://news.mock/ok",
            &format!("Guidance raised. {}", words(400)),
        ))
        .await
        .unwrap();

    let processor = NewsProcessor::new(store.clone() as Arc<dyn Store>);
    processor.populate_words_count(200).await.unwrap();

    let (summarized, ids) = processor
        .populate_content_summary(300, 200, 5, &MockSummarizer::new())
        .await
        .unwrap();

    assert_eq!(summarized, 1);
    assert_eq!(ids, vec![ok.id]);
    assert!(store.get_news(failing.id).await.unwrap().content_summary.is_none());
}

#[tokio::test]
async fn test_failing_summaries_move_behind_pending_rows() {
    let store = Arc::new(MemoryStore::new());
    let mut failing = Vec::new();
    for i in 0..5 {
        let news = store
            .create_news(article_news(
                &format!("Broken {}", i),
                &format!("https://news.mock/broken/{}", i),
                &format!("FAIL {}", words(400)),
            ))
            .await
            .unwrap();
        failing.push(news.id);
    }
    let good = store
        .create_news(article_news(
            "Late arrival",
            "https://news.mock/late",
            &format!("Orders doubled. {}", words(400)),
        ))
        .await
        .unwrap();

    let processor = NewsProcessor::new(store.clone() as Arc<dyn Store>);
    let summarizer = MockSummarizer::new();
    processor.populate_words_count(200).await.unwrap();

    // 첫 실행은 앞선 다섯 건이 모두 실패합니다.
    let (summarized, _) = processor
        .populate_content_summary(300, 200, 5, &summarizer)
        .await
        .unwrap();
    assert_eq!(summarized, 0);
    for id in &failing {
        assert!(store.get_news(*id).await.unwrap().summary_attempted_at.is_some());
    }

    let (summarized, ids) = processor
        .populate_content_summary(300, 200, 5, &summarizer)
        .await
        .unwrap();
    assert_eq!(summarized, 1);
    assert_eq!(ids, vec![good.id]);
    assert_eq!(
        store.get_news(good.id).await.unwrap().content_summary.as_deref(),
        Some("Orders doubled.")
    );
}

#[tokio::test]
async fn test_failing_sentiment_moves_behind_pending_rows() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..5 {
        let news = store
            .create_news(article_news(
                &format!("Broken {}", i),
                &format!("https://news.mock/broken/{}", i),
                &words(10),
            ))
            .await
            .unwrap();
        store
            .set_content_summary(news.id, "FAIL unreadable summary")
            .await
            .unwrap();
    }
    let good = store
        .create_news(article_news("Late arrival", "https://news.mock/late", &words(10)))
        .await
        .unwrap();
    store
        .set_content_summary(good.id, "Orders doubled.")
        .await
        .unwrap();

    let processor = NewsProcessor::new(store.clone() as Arc<dyn Store>);
    let scorer = MockScorer(0.25);

    let (scored, _) = processor.populate_sentiment_scores(5, &scorer).await.unwrap();
    assert_eq!(scored, 0);

    let (scored, ids) = processor.populate_sentiment_scores(5, &scorer).await.unwrap();
    assert_eq!(scored, 1);
    assert_eq!(ids, vec![good.id]);
    assert_eq!(store.get_news(good.id).await.unwrap().sentiment_score, Some(0.25));
}

#[tokio::test]
async fn test_failing_articles_move_behind_pending_rows() {
    let store = store_with_urls(&[("AAPL", AAPL_URL)]).await;
    let scraper = MockScraper::default()
        .with_headlines(
            AAPL_URL,
            &[
                ("Paywalled one", "https://news.mock/a/1"),
                ("Paywalled two", "https://news.mock/a/2"),
                ("Open story", "https://news.mock/a/3"),
            ],
        )
        .with_article("https://news.mock/a/3", "Apple opened a new campus.", &["AAPL"]);
    let collector = news_collector(&store, scraper, MockProvider::new());
    collector
        .collect_news_headlines("AAPL", MOCK_SOURCE)
        .await
        .unwrap();

    let first = collector.collect_news_articles(2).await.unwrap();
    assert_eq!(first.errors, 2);
    assert_eq!(first.success, 0);

    let second = collector.collect_news_articles(2).await.unwrap();
    assert_eq!(second.success, 1);
    assert_eq!(second.errors, 1);

    let news = store.search_news("Open story", 10).await.unwrap();
    assert_eq!(news[0].content.as_deref(), Some("Apple opened a new campus."));
    assert_eq!(store.count_news_without_content().await.unwrap(), 2);
}

#[tokio::test]
async fn test_words_count_rejects_zero_batch() {
    let store = Arc::new(MemoryStore::new());
    let processor = NewsProcessor::new(store as Arc<dyn Store>);

    assert!(processor.populate_words_count(0).await.is_err());
}
