//! Integration tests for the tour REST API and toast WebSocket.
//!
//! Each test spins up an Axum server on a random port backed by in-memory
//! storage and a stub image loader, then drives it over HTTP with reqwest
//! and over WebSocket with tokio-tungstenite.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use onboarding_tour::error::ImageLoadError;
use onboarding_tour::i18n::BundleLocalizer;
use onboarding_tour::identity::StaticIdentity;
use onboarding_tour::images::{ImageCache, ImageLoader};
use onboarding_tour::notify::{BroadcastNotifier, Toast};
use onboarding_tour::store::{KeyValueStore, MemoryStore, ProgressScope, ProgressStore};
use onboarding_tour::tour::{ProductInfo, TourDeps, TourService, tour_routes};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Loader that never touches the network.
struct StubLoader;

#[async_trait]
impl ImageLoader for StubLoader {
    async fn load(&self, url: &str) -> Result<(), ImageLoadError> {
        if url.contains("missing") {
            return Err(ImageLoadError::InvalidUrl(url.to_string()));
        }
        Ok(())
    }
}

struct TestServer {
    port: u16,
    storage: Arc<MemoryStore>,
    toasts: broadcast::Receiver<Toast>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    async fn get(&self, path: &str) -> Value {
        let resp = reqwest::get(self.url(path)).await.unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    async fn post(&self, path: &str) -> Value {
        let resp = reqwest::Client::new().post(self.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    fn toasts(&mut self) -> Vec<Toast> {
        let mut out = Vec::new();
        while let Ok(toast) = self.toasts.try_recv() {
            out.push(toast);
        }
        out
    }
}

/// Parse a WS text frame into a serde_json::Value.
fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

fn home_scope() -> ProgressScope {
    ProgressScope {
        deployment_id: "prod-eu".to_string(),
        product: "mtx".to_string(),
        callsign: "matrix".to_string(),
        route: "/".to_string(),
    }
}

/// Start an Axum server on a random port.
async fn start_server() -> TestServer {
    let storage = Arc::new(MemoryStore::new());
    let notifier = Arc::new(BroadcastNotifier::new());
    let toasts = notifier.subscribe();
    let deps = TourDeps {
        progress: Arc::new(ProgressStore::new(storage.clone())),
        images: ImageCache::new(Arc::new(StubLoader)),
        notifier: notifier.clone(),
        localizer: Arc::new(BundleLocalizer::bundled("en")),
    };
    let product = ProductInfo {
        product: "mtx".to_string(),
        callsign: "matrix".to_string(),
        theme: "light".to_string(),
    };
    let service = TourService::new(product, Arc::new(StaticIdentity("prod-eu".into())), deps);
    let app = tour_routes(service, notifier);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        port,
        storage,
        toasts,
    }
}

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let body = server.get("/health").await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "onboarding-tour");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn first_visit_opens_tour_and_next_clamps() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let view = server.get("/api/tour?route=/").await;
        assert_eq!(view["visibility"], "open");
        assert_eq!(view["step_number"], 1);
        assert_eq!(view["step_count"], 2);
        assert_eq!(view["title"], "Welcome");

        let view = server.post("/api/tour/next?route=/").await;
        assert_eq!(view["step_number"], 2);
        assert_eq!(view["is_last"], true);

        // Already on the last step
        let view = server.post("/api/tour/next?route=/").await;
        assert_eq!(view["step_number"], 2);
        assert_eq!(view["labels"]["advance"], "Finish");

        // Plain navigation persists nothing
        assert!(server.storage.is_empty().await);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn completing_every_step_closes_and_notifies_once() {
    timeout(TEST_TIMEOUT, async {
        let mut server = start_server().await;

        let view = server.post("/api/tour/complete").await;
        assert_eq!(view["step_number"], 2);

        let view = server.post("/api/tour/complete").await;
        assert_eq!(view["visibility"], "review_button");
        assert_eq!(view["label"], "Review onboarding");

        let scope = home_scope();
        assert_eq!(
            server.storage.get(&scope.seen_key()).await.unwrap().as_deref(),
            Some("true")
        );
        let stored: Vec<String> =
            serde_json::from_str(&server.storage.get(&scope.steps_key()).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, vec!["test".to_string(), "welcome".to_string()]);

        let toasts = server.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message, "Onboarding completed");
        assert_eq!(toasts[0].duration_ms, 3000);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn close_saves_progress_and_review_is_read_only() {
    timeout(TEST_TIMEOUT, async {
        let mut server = start_server().await;
        server.get("/api/tour").await;

        let view = server.post("/api/tour/close").await;
        assert_eq!(view["visibility"], "review_button");

        let scope = home_scope();
        let stored: Vec<String> =
            serde_json::from_str(&server.storage.get(&scope.steps_key()).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, vec!["welcome".to_string()]);

        let toasts = server.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message, "Progress saved");
        assert_eq!(toasts[0].duration_ms, 2000);

        let view = server.post("/api/tour/review").await;
        assert_eq!(view["visibility"], "open");
        assert_eq!(view["review_mode"], true);
        assert_eq!(view["step_number"], 1);

        let keys_before = server.storage.len().await;
        server.post("/api/tour/complete").await;
        server.post("/api/tour/close").await;
        assert_eq!(server.storage.len().await, keys_before);
        let stored: Vec<String> =
            serde_json::from_str(&server.storage.get(&scope.steps_key()).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, vec!["welcome".to_string()]);
        assert!(server.toasts().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_action_is_not_found() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let resp = reqwest::Client::new()
            .post(server.url("/api/tour/skip"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn device_switch_changes_image() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let view = server.get("/api/tour").await;
        assert_eq!(view["image_url"], "/onboarding/light/home-welcome.png");

        let resp = reqwest::Client::new()
            .post(server.url("/api/tour/device"))
            .json(&serde_json::json!({"device": "mobile"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let view: Value = resp.json().await.unwrap();
        assert_eq!(view["device"], "mobile");
        assert_eq!(view["image_url"], "/onboarding/light/home-welcome-mobile.png");

        // Query parameter works the same way
        let view = server.get("/api/tour?device=desktop").await;
        assert_eq!(view["device"], "desktop");
        assert_eq!(view["image_url"], "/onboarding/light/home-welcome.png");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn restart_forgets_progress() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.post("/api/tour/complete").await;
        server.post("/api/tour/complete").await;
        assert!(!server.storage.is_empty().await);

        let view = server.post("/api/tour/restart").await;
        assert_eq!(view["visibility"], "open");
        assert_eq!(view["step_number"], 1);
        assert_eq!(view["review_mode"], false);
        assert!(server.storage.is_empty().await);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_routes_share_home_progress() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.post("/api/tour/close?route=/").await;

        let view = server.get("/api/tour?route=/reports").await;
        assert_eq!(view["visibility"], "review_button");

        // Arbitrary routes land on the home tour, not on new entries
        for i in 0..20 {
            server.get(&format!("/api/tour?route=/junk/{i}")).await;
        }
        let stored: Vec<String> = serde_json::from_str(
            &server.storage.get(&home_scope().steps_key()).await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(stored, vec!["welcome".to_string()]);
        assert_eq!(server.storage.len().await, 1);
    })
    .await
    .expect("test timed out");
}

// ── WebSocket Tests ──────────────────────────────────────────────────

#[tokio::test]
async fn toasts_stream_over_websocket() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let (mut ws, _resp) = connect_async(format!("ws://127.0.0.1:{}/ws/toasts", server.port))
            .await
            .expect("failed to connect");

        server.post("/api/tour/close").await;
        let msg = ws.next().await.unwrap().unwrap();
        let toast = parse_ws_json(&msg);
        assert_eq!(toast["message"], "Progress saved");
        assert_eq!(toast["duration_ms"], 2000);

        server.post("/api/tour/restart").await;
        server.post("/api/tour/complete").await;
        server.post("/api/tour/complete").await;
        let msg = ws.next().await.unwrap().unwrap();
        let toast = parse_ws_json(&msg);
        assert_eq!(toast["message"], "Onboarding completed");
        assert_eq!(toast["duration_ms"], 3000);

        ws.send(Message::Close(None)).await.unwrap();
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn every_toast_client_gets_each_toast() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let url = format!("ws://127.0.0.1:{}/ws/toasts", server.port);
        let (mut first, _) = connect_async(&url).await.expect("failed to connect");
        let (mut second, _) = connect_async(&url).await.expect("failed to connect");

        server.post("/api/tour/close").await;

        for ws in [&mut first, &mut second] {
            let msg = ws.next().await.unwrap().unwrap();
            assert_eq!(parse_ws_json(&msg)["message"], "Progress saved");
        }
    })
    .await
    .expect("test timed out");
}
