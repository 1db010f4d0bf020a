// tests/enrich_offline.rs
// Enrichment against an in-memory fetcher; nothing here touches the network.
mod common;

use common::StubFetcher;
use research_digest::config::EnrichConfig;
use research_digest::enrich::{enrich, enrich_records, extract_abstract};
use research_digest::record::Record;
use serde_json::json;
use std::time::Duration;

const ARXIV_ABS: &str = include_str!("fixtures/arxiv_abs.html");
const FORUM: &str = "https://forum.test/graphql";

fn cfg() -> EnrichConfig {
    EnrichConfig {
        forum_graphql_url: FORUM.into(),
        ..EnrichConfig::default()
    }
}

fn rec(title: &str, org: &str, abs: &str, url: &str) -> Record {
    Record::new(title, vec![], org, abs, url, "", "rss", "").unwrap()
}

fn meta_page(desc: &str) -> String {
    format!(r#"<html><head><meta name="description" content="{desc}"></head><body><p>x</p></body></html>"#)
}

#[tokio::test]
async fn bare_record_gets_title_only_sentence() {
    let stub = StubFetcher::new();
    let out = enrich(
        vec![rec("Steering vectors in practice", "", "", "https://blog.test/steer")],
        &stub,
        &cfg(),
    )
    .await;
    assert_eq!(out[0].abstract_text, "Research titled 'Steering vectors in practice'.");
    assert_eq!(stub.gets(), vec!["https://blog.test/steer"]);
}

#[tokio::test]
async fn meta_description_replaces_short_abstract() {
    let desc = "We evaluate how steering vectors change refusal behaviour across several open-weight chat models.";
    let stub = StubFetcher::new().page("https://blog.test/steer", &meta_page(desc));
    let mut recs = vec![rec("Steering", "Lab", "tiny", "https://blog.test/steer")];
    let stats = enrich_records(&mut recs, &stub, &cfg()).await;
    assert_eq!(stats.candidates, 1);
    assert_eq!(stats.enriched, 1);
    assert_eq!(stats.synthetic, 0);
    assert_eq!(recs[0].abstract_text, desc);
}

#[tokio::test]
async fn long_abstracts_are_left_alone() {
    let long = "An abstract that is comfortably longer than fifty characters in total length.";
    let stub = StubFetcher::new();
    let mut recs = vec![rec("Kept", "Lab", long, "https://blog.test/kept")];
    let stats = enrich_records(&mut recs, &stub, &cfg()).await;
    assert_eq!(stats.candidates, 0);
    assert_eq!(recs[0].abstract_text, long);
    assert!(stub.gets().is_empty());
}

#[tokio::test]
async fn second_pass_changes_nothing() {
    let desc = "We evaluate how steering vectors change refusal behaviour across several open-weight chat models.";
    let stub = StubFetcher::new().page("https://blog.test/steer", &meta_page(desc));
    let recs = vec![
        rec("Steering", "Lab", "", "https://blog.test/steer"),
        rec("Missing page", "Lab", "", "https://blog.test/missing"),
    ];
    let once = enrich(recs, &stub, &cfg()).await;
    let twice = enrich(once.clone(), &stub, &cfg()).await;
    assert_eq!(once, twice);
    let steer_fetches = stub
        .gets()
        .iter()
        .filter(|u| u.as_str() == "https://blog.test/steer")
        .count();
    assert_eq!(steer_fetches, 1, "an enriched record is not fetched again");
}

#[tokio::test]
async fn arxiv_pdf_link_falls_back_to_abs_page() {
    let stub = StubFetcher::new()
        .page("https://arxiv.org/pdf/2401.05566", "<html><body>pdf viewer shell</body></html>")
        .page("https://arxiv.org/abs/2401.05566", ARXIV_ABS);
    let got = extract_abstract(&stub, "https://arxiv.org/pdf/2401.05566", &cfg())
        .await
        .unwrap();
    let (strategy, text) = got.expect("abstract from the abs page");
    assert_eq!(strategy, "arxiv_alt");
    assert!(text.starts_with("Humans are capable of strategically deceptive behavior."));
    assert!(!text.contains("Abstract:"));
}

#[tokio::test]
async fn arxiv_abs_page_is_read_directly() {
    let stub = StubFetcher::new().page("https://arxiv.org/abs/2401.05566", ARXIV_ABS);
    let (strategy, _) = extract_abstract(&stub, "https://arxiv.org/abs/2401.05566", &cfg())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(strategy, "arxiv");
    assert_eq!(stub.gets(), vec!["https://arxiv.org/abs/2401.05566"]);
}

#[tokio::test]
async fn forum_posts_use_the_excerpt_query() {
    let excerpt = "We revisit backdoored models and ask whether safety training removes deceptive behaviour.";
    let stub = StubFetcher::new().json(
        FORUM,
        json!({ "data": { "post": { "result": { "excerpt": excerpt } } } }),
    );
    let url = "https://www.lesswrong.com/posts/AbC123xyz/sleeper-agents";
    let (strategy, text) = extract_abstract(&stub, url, &cfg()).await.unwrap().unwrap();
    assert_eq!(strategy, "forum_api");
    assert_eq!(text, excerpt);
    assert!(stub.gets().is_empty(), "page must not be scraped when the api answers");
    assert_eq!(stub.posts()[0]["variables"]["input"]["selector"]["_id"], "AbC123xyz");
}

#[tokio::test]
async fn forum_short_excerpt_falls_through_to_page() {
    let url = "https://www.lesswrong.com/posts/AbC123xyz/sleeper-agents";
    let desc = "A page description that is long enough to count as an abstract for this post.";
    let stub = StubFetcher::new()
        .json(
            FORUM,
            json!({ "data": { "post": { "result": {
                "excerpt": "too short",
                "contents": { "plaintextDescription": "also short" }
            } } } }),
        )
        .page(url, &meta_page(desc));
    let (strategy, text) = extract_abstract(&stub, url, &cfg()).await.unwrap().unwrap();
    assert_eq!(strategy, "meta_description");
    assert_eq!(text, desc);
}

#[tokio::test]
async fn pdf_urls_are_never_fetched() {
    let stub = StubFetcher::new();
    let mut recs = vec![rec("A pdf", "Lab", "", "https://lab.test/report.pdf")];
    let stats = enrich_records(&mut recs, &stub, &cfg()).await;
    assert!(stub.gets().is_empty());
    assert_eq!(stats.synthetic, 1);
    assert_eq!(recs[0].abstract_text, "Research from Lab titled 'A pdf'.");
}

#[tokio::test]
async fn failed_and_binary_fetches_degrade_to_synthetic() {
    let stub = StubFetcher::new()
        .status("https://down.test/a", 503)
        .binary("https://files.test/b", "application/octet-stream");
    let mut recs = vec![
        rec("Down", "", "", "https://down.test/a"),
        rec("Binary", "", "", "https://files.test/b"),
    ];
    let stats = enrich_records(&mut recs, &stub, &cfg()).await;
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.enriched, 0);
    assert_eq!(stats.synthetic, 2);
    assert!(recs.iter().all(|r| !r.abstract_text.trim().is_empty()));
}

#[tokio::test]
async fn fetches_never_exceed_the_worker_cap() {
    let desc = "We evaluate how steering vectors change refusal behaviour across several open-weight chat models.";
    let mut stub = StubFetcher::new().delay(Duration::from_millis(20));
    let mut recs = Vec::new();
    for i in 0..12 {
        let url = format!("https://blog.test/{i}");
        stub = stub.page(&url, &meta_page(desc));
        recs.push(rec(&format!("Post {i}"), "Lab", "", &url));
    }
    let cfg = EnrichConfig {
        max_concurrent: 3,
        ..cfg()
    };
    let stats = enrich_records(&mut recs, &stub, &cfg).await;
    assert_eq!(stats.enriched, 12);
    assert!(stub.max_in_flight() <= 3, "saw {} in flight", stub.max_in_flight());
    assert!(stub.max_in_flight() >= 2, "fetches should overlap");
    // each record got its own page text, in place and in order
    let titles: Vec<String> = recs.iter().map(|r| r.title.clone()).collect();
    assert_eq!(titles, (0..12).map(|i| format!("Post {i}")).collect::<Vec<_>>());
}

#[tokio::test]
async fn synthetic_sentence_lists_three_authors() {
    let stub = StubFetcher::new();
    let r = Record::new(
        "Model organisms",
        vec!["A".into(), "B".into(), "C".into(), "D".into()],
        "Redwood Research",
        "",
        "https://down.test/x",
        "2025-03-04T10:00:00Z",
        "scrape",
        "",
    )
    .unwrap();
    let out = enrich(vec![r], &stub, &cfg()).await;
    assert_eq!(
        out[0].abstract_text,
        "Research from Redwood Research titled 'Model organisms'. Published 2025-03-04. Authors: A, B, C and 1 others."
    );
}
