//! Pickup client runtime.
//!
//! Keeps one authenticated session alive for a host shell: messages are
//! exchanged as JSON lines on stdin/stdout, logs go to stderr, and order
//! and inquiry notifications are received over the realtime channel.

use std::path::PathBuf;
use std::sync::Arc;

use pickup_application::{
    ClientSession, CookieScope, CredentialStore, LoginNavigator, MemoryCredentialStore,
};
use pickup_domain::{ClientConfig, NotificationEvent};
use pickup_infrastructure::{
    ConfigLoader, FileCredentialStore, InboundReader, LineBridge, RealtimeChannel,
    ReqwestTransport, SystemClock, default_config_file,
};
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Navigator for a headless runtime: the host shell owns the login screen
/// and learns about it from the `LOGOUT` message.
struct LogNavigator;

impl LoginNavigator for LogNavigator {
    fn redirect_to_login(&self, login_path: &str) {
        tracing::info!(%login_path, "login required");
    }
}

fn config_path() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

fn load_config() -> Result<ClientConfig, pickup_infrastructure::ConfigError> {
    let loader = match (config_path(), default_config_file()) {
        (Some(path), _) => ConfigLoader::new().with_file(path),
        (None, Some(path)) => ConfigLoader::new().with_optional_file(path),
        (None, None) => ConfigLoader::new(),
    };
    loader.load()
}

fn credential_store(
    config: &ClientConfig,
) -> Result<Arc<dyn CredentialStore>, pickup_application::StoreError> {
    let scope = CookieScope::new(config.cookie_domain.clone(), config.cookie_path.clone());
    let clock = Arc::new(SystemClock);
    match &config.credential_file {
        Some(path) => {
            let store = FileCredentialStore::open(path, scope, clock)?;
            tracing::info!(path = %store.path().display(), "using persistent credential store");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryCredentialStore::new(scope, clock))),
    }
}

fn log_event(event: &NotificationEvent) {
    tracing::info!(
        topic = ?event.topic,
        change = ?event.change,
        payload = %event.payload,
        "notification"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the host bridge; logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Pickup client v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let store = credential_store(&config)?;
    let transport = Arc::new(ReqwestTransport::new(&config)?);

    let session = Arc::new(
        ClientSession::builder(
            config.clone(),
            transport,
            store,
            Arc::new(SystemClock),
            Arc::new(LogNavigator),
        )
        .host_bridge(Arc::new(LineBridge::stdout()))
        .build(),
    );
    session.announce_ready();

    if let Err(error) = session.restore().await {
        tracing::warn!(%error, "stored session could not be restored");
    }

    let _subscription = session.hub().subscribe(log_event, log_event);
    let realtime = RealtimeChannel::connect(
        &config,
        session.context().clone(),
        session.hub().clone(),
    )?;

    let inbound = {
        let session = session.clone();
        async move {
            let mut reader = InboundReader::new(BufReader::new(tokio::io::stdin()));
            loop {
                match reader.next_message().await {
                    Ok(Some(message)) => {
                        if let Err(error) = session.handle_inbound(message) {
                            tracing::warn!(%error, "failed to store host credential");
                            continue;
                        }
                        if let Err(error) = session.restore().await {
                            tracing::warn!(%error, "auto login failed");
                        }
                    }
                    Ok(None) => break,
                    Err(error) => {
                        tracing::warn!(%error, "host input failed");
                        break;
                    }
                }
            }
        }
    };

    tokio::select! {
        () = inbound => tracing::info!("host closed input"),
        result = tokio::signal::ctrl_c() => {
            if let Err(error) = result {
                tracing::warn!(%error, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        }
    }

    realtime.shutdown().await;
    Ok(())
}
