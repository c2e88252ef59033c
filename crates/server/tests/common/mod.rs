//! Common test utilities for E2E testing with mocks.
//!
//! Builds the full router in-process with scriptable mock sources and an
//! in-memory durable store, so end-to-end flows run without any network.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use barrage_core::danmaku::RawComments;
use barrage_core::registry::{NewEpisode, NewTitle};
use barrage_core::testing::{MockSource, MockStore};
use barrage_core::{AggregationContext, Config, DurableStore, SourceAdapter};
use barrage_server::api::create_router;
use barrage_server::state::AppState;

/// In-process server with one controllable mock source.
pub struct TestFixture {
    pub router: Router,
    pub source: Arc<MockSource>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture with default config and a source serving [`foo_title`] and
    /// [`sample_comments`].
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let source = Arc::new(
            MockSource::new("qq")
                .with_search_hits(vec![foo_title()])
                .with_comments(sample_comments()),
        );
        Self::build(config, source, None).await
    }

    pub async fn with_store(config: Config, store: Arc<MockStore>) -> Self {
        let source = Arc::new(
            MockSource::new("qq")
                .with_search_hits(vec![foo_title()])
                .with_comments(sample_comments()),
        );
        Self::build(config, source, Some(store)).await
    }

    async fn build(config: Config, source: Arc<MockSource>, store: Option<Arc<MockStore>>) -> Self {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::clone(&source) as _];
        let context = Arc::new(AggregationContext::new(
            config,
            adapters,
            store.map(|s| s as Arc<dyn DurableStore>),
        ));
        context.ensure_loaded().await;
        let state = Arc::new(AppState::new(context));
        Self {
            router: create_router(state),
            source,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a GET request carrying a proxy-reported client address.
    pub async fn get_as(&self, path: &str, ip: &str) -> TestResponse {
        self.request("GET", path, None, Some(ip)).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        ip: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(ip) = ip {
            builder = builder.header("X-Forwarded-For", ip);
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// A title with a trailer plus twelve real episodes, all tagged `【qq】`.
pub fn foo_title() -> NewTitle {
    let mut episodes = vec![NewEpisode {
        url: "qq://foo/trailer".to_string(),
        title: "【qq】第1集 预告".to_string(),
    }];
    episodes.extend((1..=12).map(|n| NewEpisode {
        url: format!("qq://foo/{n}"),
        title: format!("【qq】第{n}集"),
    }));
    NewTitle {
        id: 1,
        display_title: "Foo (2023)".to_string(),
        category: "tvseries".to_string(),
        image_url: String::new(),
        start_date: "2023-01-01".to_string(),
        rating: 8.5,
        episodes,
    }
}

/// Three comments, two of which share text inside one dedup window.
pub fn sample_comments() -> RawComments {
    use serde_json::json;
    RawComments::Tuples(vec![
        vec![json!(5.0), json!(1), json!(0xFFFFFF), json!(0), json!("hello")],
        vec![json!(40.0), json!(5), json!(0xFF0000), json!(0), json!("hello")],
        vec![json!(90.0), json!(1), json!(0xFFFFFF), json!(0), json!("bye")],
    ])
}
