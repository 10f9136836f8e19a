use hsc_ad_market::config::Config;
use hsc_ad_market::server;
use tracing::error;

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .without_time()
        .with_target(false)
        .init();

    let config = Config::load();
    if let Err(e) = server::start_server(config).await {
        error!("{:<12} --> Server error: {}", "Main", e);
        return Err(e);
    }
    Ok(())
}
// endregion: --- Main
