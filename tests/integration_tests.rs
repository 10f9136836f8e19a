use chrono::{Duration, Utc};
use hsc_ad_market::bidding::model::{BidStatus, Identity, Listing, ListingType};
use hsc_ad_market::config::Config;
use hsc_ad_market::database::MemoryAdStore;
use hsc_ad_market::handlers::WEBHOOK_SECRET_HEADER;
use hsc_ad_market::message_broker::NoopPublisher;
use hsc_ad_market::server::build_router;
use hsc_ad_market::state::AppState;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

const WEBHOOK_SECRET: &str = "test-secret";

/// 트레이싱 초기화 (테스트마다 호출되므로 중복 설정은 무시)
fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

struct TestApp {
    address: String,
    client: Client,
    store: Arc<MemoryAdStore>,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn submit_bid(&self, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/ads/bids"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn market(&self, query: &str) -> Value {
        self.client
            .get(self.url(&format!("/api/ads/market{query}")))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse market")
    }
}

/// 메모리 저장소로 서버 실행
/// 사용자 1, 2 가 각자 광고 게시글 1, 2 를 가지고 세션 토큰 token-1, token-2 로 인증한다
async fn spawn_app() -> TestApp {
    init_tracing();

    let store = Arc::new(MemoryAdStore::new());
    for id in [1, 2] {
        store
            .insert_listing(Listing {
                id,
                user_id: id,
                title: format!("Local Business {id}"),
                listing_type: ListingType::Advertise,
                location: Some("Riverside".to_string()),
                image_url: None,
            })
            .await;
        store
            .insert_session(
                format!("token-{id}"),
                Identity {
                    user_id: id,
                    email: format!("owner{id}@example.com"),
                    is_admin: false,
                },
                Utc::now() + Duration::hours(1),
            )
            .await;
    }

    let config = Config {
        port: 0,
        database_url: String::new(),
        db_max_connections: 1,
        kafka_brokers: None,
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        sweep_interval_secs: 60,
    };
    let state = AppState::new(store.clone(), Arc::new(NoopPublisher), config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    info!("테스트 서버 실행: {}", addr);

    TestApp {
        address: format!("http://{addr}"),
        client: Client::new(),
        store,
    }
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bid_requires_session() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/ads/bids"))
        .json(&json!({ "listing_id": 1, "weekly_bid_amount": 10.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .submit_bid("unknown", json!({ "listing_id": 1, "weekly_bid_amount": 10.0 }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHENTICATED");

    assert!(app.store.all_bids().await.is_empty());
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(app.url("/api/ads/bids/mine"))
        .header("cookie", "theme=dark; hsc_session=token-1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bids: Value = response.json().await.unwrap();
    assert_eq!(bids, json!([]));
}

#[tokio::test]
async fn test_bid_below_base_rate_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .submit_bid("token-1", json!({ "listing_id": 1, "weekly_bid_amount": 4.99 }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_AMOUNT");
    assert!(app.store.all_bids().await.is_empty());

    let response = app
        .submit_bid("token-1", json!({ "listing_id": 1, "weekly_bid_amount": 5.0 }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_malformed_payload() {
    let app = spawn_app().await;

    let response = app
        .submit_bid(
            "token-1",
            json!({ "listing_id": 1, "weekly_bid_amount": "lots" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "MALFORMED_PAYLOAD");
}

#[tokio::test]
async fn test_malformed_query_parameters() {
    let app = spawn_app().await;

    for path in ["/api/ads/market?week_start=next-week", "/api/ads/slots?date=2024-13-40"] {
        let response = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "MALFORMED_PAYLOAD");
    }
}

#[tokio::test]
async fn test_submit_then_update_bid() {
    let app = spawn_app().await;

    let response = app
        .submit_bid(
            "token-1",
            json!({ "listing_id": 1, "weekly_bid_amount": 5.0, "auto_renew": true }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["action"], "created");
    assert_eq!(created["bid"]["current_position"], 1);
    assert_eq!(created["bid"]["status"], "active");

    let response = app
        .submit_bid("token-1", json!({ "listing_id": 1, "weekly_bid_amount": 12.0 }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["action"], "updated");
    assert_eq!(updated["bid"]["id"], created["bid"]["id"]);

    let market = app.market("").await;
    assert_eq!(market["current_top_bid"], 12.0);
    assert_eq!(market["price_to_beat"], 17.0);
    assert_eq!(market["total_active_bids"], 1);
    assert_eq!(market["positions"][0]["title"], "Local Business 1");
    assert_eq!(app.store.all_bids().await.len(), 1);
}

#[tokio::test]
async fn test_bid_on_foreign_listing_is_not_found() {
    let app = spawn_app().await;
    let response = app
        .submit_bid("token-1", json!({ "listing_id": 2, "weekly_bid_amount": 10.0 }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_empty_market_for_past_week() {
    let app = spawn_app().await;
    app.submit_bid("token-1", json!({ "listing_id": 1, "weekly_bid_amount": 20.0 }))
        .await;

    let market = app.market("?week_start=2020-01-06").await;
    assert_eq!(market["week_start"], "2020-01-06");
    assert_eq!(market["week_end"], "2020-01-12");
    assert_eq!(market["current_top_bid"], 0.0);
    assert_eq!(market["price_to_beat"], 5.0);
    assert_eq!(market["positions"], json!([]));
}

#[tokio::test]
async fn test_slot_board() {
    let app = spawn_app().await;
    app.submit_bid("token-1", json!({ "listing_id": 1, "weekly_bid_amount": 20.0 }))
        .await;

    let board: Value = app
        .client
        .get(app.url("/api/ads/slots"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let slots = board["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 5);
    assert_eq!(slots[0]["label"], "Top Spot");
    assert_eq!(slots[0]["occupied"], true);
    assert_eq!(slots[0]["price"], 25.0);
    assert_eq!(slots[1]["occupied"], false);
    assert_eq!(slots[1]["price"], 10.0);
}

#[tokio::test]
async fn test_cancel_bid() {
    let app = spawn_app().await;
    let created: Value = app
        .submit_bid("token-1", json!({ "listing_id": 1, "weekly_bid_amount": 8.0 }))
        .await
        .json()
        .await
        .unwrap();
    let bid_id = created["bid"]["id"].clone();

    let response = app
        .client
        .post(app.url("/api/ads/bids/cancel"))
        .bearer_auth("token-1")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_FIELD");

    let response = app
        .client
        .post(app.url("/api/ads/bids/cancel"))
        .bearer_auth("token-2")
        .json(&json!({ "bid_id": bid_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.all_bids().await[0].status, BidStatus::Active);

    let response = app
        .client
        .post(app.url("/api/ads/bids/cancel"))
        .bearer_auth("token-1")
        .json(&json!({ "bid_id": bid_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["bid"]["status"], "cancelled");

    let market = app.market("").await;
    assert_eq!(market["total_active_bids"], 0);

    let mine: Value = app
        .client
        .get(app.url("/api/ads/bids/mine"))
        .bearer_auth("token-1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_payment_webhook() {
    let app = spawn_app().await;
    let payment = json!({
        "payment_id": "pi_test_1",
        "listing_id": 1,
        "user_id": 1,
        "weekly_bid_amount": 15.0,
        "auto_renew": true
    });

    let response = app
        .client
        .post(app.url("/api/webhooks/payments"))
        .json(&payment)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .post(app.url("/api/webhooks/payments"))
        .header(WEBHOOK_SECRET_HEADER, "wrong")
        .json(&payment)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.store.all_bids().await.is_empty());

    for expected in ["created", "replayed"] {
        let response = app
            .client
            .post(app.url("/api/webhooks/payments"))
            .header(WEBHOOK_SECRET_HEADER, WEBHOOK_SECRET)
            .json(&payment)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["action"], expected);
    }

    let bids = app.store.all_bids().await;
    assert_eq!(bids.len(), 1);
    assert!(bids[0].auto_renew);
}
