//! Test helpers for integration tests
//!
//! Provides the test server, raw webhook requests and polling for the
//! effects of events handled after the response.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use guard_api::{create_app, AppState};
use guard_common::AppConfig;
use guard_service::testing::{FakeGateway, FakeLanguageModel, TestHarness, BOT_ID};
use guard_service::ServiceContext;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use guard_service::testing::test_config;

/// How long effects of an accepted event may take to show up
const SETTLE_TIMEOUT: Duration = Duration::from_secs(3);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub ctx: Arc<ServiceContext>,
    pub gateway: Arc<FakeGateway>,
    pub llm: Arc<FakeLanguageModel>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let harness = TestHarness::new(config).await;
        let ctx = Arc::new(harness.ctx);
        let app = create_app(AppState::from_shared(Arc::clone(&ctx)));

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            ctx,
            gateway: harness.gateway,
            llm: harness.llm,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Post an event to `/` as the configured bot account
    pub async fn post_event<T: Serialize>(&self, event: &T) -> Result<Response> {
        self.post_event_as("/", BOT_ID.into_inner(), event).await
    }

    /// Post an event to `path` claiming to come from `self_id`
    pub async fn post_event_as<T: Serialize>(
        &self,
        path: &str,
        self_id: i64,
        event: &T,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .post(&url)
            .header("X-Self-ID", self_id.to_string())
            .json(event)
            .send()
            .await?)
    }

    /// Post an arbitrary body with explicit headers
    pub async fn post_raw(
        &self,
        content_type: Option<&str>,
        self_id: Option<&str>,
        body: impl Into<reqwest::Body>,
    ) -> Result<Response> {
        let url = format!("{}/", self.base_url());
        let mut request = self.client.post(&url).body(body);
        if let Some(ct) = content_type {
            request = request.header("Content-Type", ct);
        }
        if let Some(id) = self_id {
            request = request.header("X-Self-ID", id);
        }
        Ok(request.send().await?)
    }
}

/// Poll `check` until it holds or the settle timeout passes
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + SETTLE_TIMEOUT;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status != expected_status {
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(body)
}

/// Assert an error response and return its `error.code`
pub async fn assert_error(response: Response, expected_status: StatusCode) -> Result<String> {
    let body = assert_status(response, expected_status).await?;
    let json: serde_json::Value = serde_json::from_str(&body)?;
    json["error"]["code"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("No error code in body: {body}"))
}
