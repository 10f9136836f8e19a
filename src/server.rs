// region:    --- Imports
use crate::config::Config;
use crate::database::{DatabaseManager, PgAdStore};
use crate::handlers;
use crate::message_broker::{EventPublisher, KafkaManager, NoopPublisher, AD_MARKET_TOPIC};
use crate::scheduler::MarketScheduler;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/api/ads/bids", post(handlers::handle_bid))
        .route("/api/ads/bids/cancel", post(handlers::handle_cancel))
        .route("/api/ads/bids/mine", get(handlers::handle_get_my_bids))
        .route("/api/ads/market", get(handlers::handle_get_market))
        .route("/api/ads/slots", get(handlers::handle_get_slots))
        .route(
            "/api/webhooks/payments",
            post(handlers::handle_payment_webhook),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 64))
        .with_state(state)
}
// endregion: --- Router

// region:    --- Server
/// 이벤트 발행기 구성 (브로커 미설정 시 NoopPublisher)
async fn build_publisher(
    config: &Config,
) -> Result<Arc<dyn EventPublisher>, Box<dyn std::error::Error>> {
    let Some(brokers) = config.kafka_brokers.as_deref() else {
        info!("{:<12} --> Kafka 미설정: 이벤트 발행 비활성화", "Main");
        return Ok(Arc::new(NoopPublisher));
    };

    let kafka_manager = KafkaManager::new(brokers)?;
    if let Err(e) = kafka_manager.create_topic(AD_MARKET_TOPIC, 5, 1).await {
        // 이미 존재하는 토픽일 수 있음
        error!("{:<12} --> 토픽 생성 실패: {}", "Main", e);
    }
    info!("{:<12} --> Kafka 초기화 성공", "Main");
    Ok(kafka_manager.get_producer())
}

pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new(&config).await?);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    let publisher = build_publisher(&config).await?;
    let store = Arc::new(PgAdStore::new(Arc::clone(&db_manager)));

    // 입찰 정리 스케줄러
    let scheduler = MarketScheduler::new(
        store.clone(),
        Arc::clone(&publisher),
        Duration::from_secs(config.sweep_interval_secs.max(1)),
    );
    scheduler.start();

    let address = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(store, publisher, config);
    let routes_all = build_router(state);

    let listener = TcpListener::bind(&address).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    axum::serve(listener, routes_all.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("{:<12} --> Server shutting down", "Main");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("{:<12} --> Ctrl+C 핸들러 설치 실패: {}", "Main", e);
            std::future::pending::<()>().await;
        }
        info!("{:<12} --> Received Ctrl+C, shutting down", "Main");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("{:<12} --> Received terminate signal, shutting down", "Main");
            }
            Err(e) => {
                error!("{:<12} --> 시그널 핸들러 설치 실패: {}", "Main", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
// endregion: --- Server
