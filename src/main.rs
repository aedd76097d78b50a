use acme_delegate::{Config, OwnChallenge, SharedConfig};
use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("acme-delegate".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let credential_store = config.credential_store()?;
    credential_store.lock().await.ping().await?;
    let own_challenge: OwnChallenge = Arc::new(RwLock::new(config.own_challenge.clone()));

    let mut dns_server =
        acme_delegate::new_dns(config.clone(), credential_store.clone(), own_challenge).await?;
    let dns_handle = tokio::spawn(async move { dns_server.block_until_done().await });

    let api_server = acme_delegate::new_http(config.clone(), credential_store)?;
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(dns_res) = dns_handle => {
            dns_res?;
            tracing::info!("DNS server stopped");
        }
        Ok(api_res) = api_handle => {
            api_res?;
            tracing::info!("API server stopped");
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acme_delegate=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}
