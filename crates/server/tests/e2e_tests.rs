//! End-to-end tests running the full router in-process with mock sources.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use barrage_core::testing::MockStore;
use barrage_core::Config;
use common::TestFixture;

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v2/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_version_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v2/version").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["version"].is_string());
}

#[tokio::test]
async fn test_config_endpoint_has_no_secrets() {
    let mut config = Config::default();
    config.store = Some(barrage_core::config::StoreConfig {
        url: "https://kv.example.com".to_string(),
        token: "super-secret".to_string(),
    });
    let fixture = TestFixture::with_config(config).await;

    let response = fixture.get("/api/v2/config").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.to_string().contains("super-secret"));
    assert_eq!(response.body["store"]["token_configured"], true);
}

#[tokio::test]
async fn test_search_anime() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v2/search/anime?keyword=Foo").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["errorCode"], 0);
    assert_eq!(response.body["success"], true);
    let animes = response.body["animes"].as_array().unwrap();
    assert_eq!(animes.len(), 1);
    assert_eq!(animes[0]["animeId"], 1);
    assert_eq!(animes[0]["animeTitle"], "Foo (2023)");
    assert_eq!(animes[0]["episodeCount"], 13);
    assert_eq!(animes[0]["type"], "tvseries");
}

#[tokio::test]
async fn test_search_empty_keyword_is_rejected() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v2/search/anime?keyword=").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errorCode"], 400);
    assert_eq!(response.body["success"], false);
    assert!(response.body["errorMessage"].is_string());
}

#[tokio::test]
async fn test_search_is_served_from_cache() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v2/search/anime?keyword=Foo").await;
    fixture.get("/api/v2/search/anime?keyword=Foo").await;
    assert_eq!(fixture.source.search_calls(), 1);
}

#[tokio::test]
async fn test_search_episodes_filters_listing() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .get("/api/v2/search/episodes?anime=Foo&episode=12")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let animes = response.body["animes"].as_array().unwrap();
    assert_eq!(animes.len(), 1);
    let episodes = animes[0]["episodes"].as_array().unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0]["episodeTitle"], "【qq】第12集");
}

#[tokio::test]
async fn test_bangumi_lists_episodes() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v2/search/anime?keyword=Foo").await;

    let response = fixture.get("/api/v2/bangumi/1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["bangumi"]["animeId"], 1);
    let episodes = response.body["bangumi"]["episodes"].as_array().unwrap();
    assert_eq!(episodes.len(), 13);
    // Ids are allocated sequentially from the registry floor.
    assert_eq!(episodes[0]["episodeId"], 10_001);
}

#[tokio::test]
async fn test_bangumi_unknown_id_is_404() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v2/bangumi/99").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["errorCode"], 404);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_match_picks_nth_unfiltered_episode() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v2/match", json!({"fileName": "Foo.S01E05.mkv"}))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["isMatched"], true);
    let matches = response.body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["animeId"], 1);
    assert_eq!(matches[0]["animeTitle"], "Foo (2023)");
    // The trailer (10001) is filtered out, so the 5th real episode is
    // 第5集 at id 10006.
    assert_eq!(matches[0]["episodeId"], 10_006);
    assert_eq!(matches[0]["episodeTitle"], "【qq】第5集");
}

#[tokio::test]
async fn test_match_unknown_title_is_unmatched() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v2/match", json!({"fileName": "Bar.S01E01.mkv"}))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["isMatched"], false);
    assert!(response.body["matches"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_match_empty_file_name_is_rejected() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v2/match", json!({"fileName": ""}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errorCode"], 400);
}

#[tokio::test]
async fn test_comment_fetch_normalizes_and_caches() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v2/search/anime?keyword=Foo").await;

    let response = fixture.get("/api/v2/comment/10006").await;
    assert_eq!(response.status, StatusCode::OK);
    // Two "hello" in one dedup window collapse to one grouped comment.
    assert_eq!(response.body["count"], 2);
    let comments = response.body["comments"].as_array().unwrap();
    assert_eq!(comments[0]["cid"], 1);
    assert_eq!(comments[0]["m"], "hello x 2");
    assert_eq!(comments[0]["p"], "5.00,1,16777215,[qq]");
    assert_eq!(comments[1]["m"], "bye");

    // A second fetch inside the TTL never reaches the source.
    let again = fixture.get("/api/v2/comment/10006").await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["count"], 2);
    assert_eq!(fixture.source.fetch_calls(), 1);
}

#[tokio::test]
async fn test_comment_unknown_episode_is_404() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v2/comment/55555").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["errorCode"], 404);
}

#[tokio::test]
async fn test_comment_xml_format() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v2/search/anime?keyword=Foo").await;

    let (status, body) = fixture.get_text("/api/v2/comment/10006?format=xml").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("<?xml version=\"1.0\""));
    assert!(body.contains("<root>"));
    assert!(body.contains("<d p=\"5.00,1,16777215,[qq]\">hello x 2</d>"));
    assert!(body.ends_with("</root>"));
}

#[tokio::test]
async fn test_rate_limit_applies_per_client() {
    let mut config = Config::default();
    config.rate_limit.max_per_minute = 1;
    let fixture = TestFixture::with_config(config).await;
    fixture.get("/api/v2/search/anime?keyword=Foo").await;

    // First upstream fetch for this client is allowed.
    let first = fixture.get_as("/api/v2/comment/10002", "1.2.3.4").await;
    assert_eq!(first.status, StatusCode::OK);

    // A different (uncached) episode exceeds the budget.
    let second = fixture.get_as("/api/v2/comment/10003", "1.2.3.4").await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.body["errorCode"], 429);
    assert_eq!(second.body["success"], false);

    // The cached episode stays reachable for the limited client.
    let cached = fixture.get_as("/api/v2/comment/10002", "1.2.3.4").await;
    assert_eq!(cached.status, StatusCode::OK);

    // Another client has its own budget.
    let other = fixture.get_as("/api/v2/comment/10003", "5.6.7.8").await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn test_comment_by_url() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post(
            "/api/v2/comment/by-url",
            json!({"videoUrl": "https://v.example.com/play/123"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 2);
}

#[tokio::test]
async fn test_comment_by_url_rejects_non_http() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v2/comment/by-url", json!({"videoUrl": "not a url"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errorCode"], 400);
}

#[tokio::test]
async fn test_state_survives_restart_via_store() {
    let store = Arc::new(MockStore::new());
    let fixture = TestFixture::with_store(Config::default(), Arc::clone(&store)).await;
    fixture.get("/api/v2/search/anime?keyword=Foo").await;
    // The durable sync runs on a background task.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A fresh server over the same store knows the title without searching.
    let restarted = TestFixture::with_store(Config::default(), store).await;
    let response = restarted.get("/api/v2/bangumi/1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["bangumi"]["animeTitle"], "Foo (2023)");
    assert_eq!(restarted.source.search_calls(), 0);
}
