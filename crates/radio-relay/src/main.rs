use radio_proto::config::Config;
use radio_relay::RelayState;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,radio_relay=debug,tower_http=info")
            }),
        )
        .init();

    let (config, load_error) = Config::load_or_default();
    match load_error {
        None => info!("Config loaded from: {:?}", Config::config_path()),
        Some(e) => warn!("Config unavailable ({:?}): {}; using defaults", Config::config_path(), e),
    }

    let state = RelayState::from_config(&config.relay)?;
    info!("Relaying to {}", state.upstream_base);

    let addr = config.relay.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server = radio_relay::spawn(listener, state);

    tokio::select! {
        res = server => {
            if let Err(e) = res {
                tracing::error!("relay task ended: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
