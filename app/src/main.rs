//! balance-watch
//!
//! Subscribes to the balances of the configured accounts on every chain with an
//! EVM endpoint and logs each change until Ctrl-C.
//!
//! Usage: `balance-watch <config.json>`

mod book;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use balance_core::AppConfig;
use balance_service::{BalanceCallback, BalanceService, Registry, SubscribeRequest};
use chain_client::{ClientMaps, JsonRpcEvmClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::book::BalanceBook;

fn load_config() -> anyhow::Result<AppConfig> {
    let path = std::env::args()
        .nth(1)
        .context("usage: balance-watch <config.json>")?;
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    AppConfig::from_json(&text).with_context(|| format!("Invalid config file {}", path))
}

/// One JSON-RPC client per configured EVM endpoint
fn build_clients(config: &AppConfig) -> ClientMaps {
    config
        .evm_endpoints
        .iter()
        .fold(ClientMaps::new(), |clients, endpoint| {
            info!(chain = %endpoint.chain, url = %endpoint.url, "EVM endpoint configured");
            clients.with_evm(Arc::new(JsonRpcEvmClient::new(
                endpoint.chain.clone(),
                endpoint.url.clone(),
                config.balance.request_timeout(),
            )))
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("balance_watch=info".parse()?)
                .add_directive("balance_service=info".parse()?)
                .add_directive("warn".parse()?),
        )
        .init();

    let config = load_config()?;
    let clients = build_clients(&config);

    let chains: Vec<String> = config
        .chains
        .iter()
        .filter(|chain| clients.evm.contains_key(&chain.slug))
        .map(|chain| chain.slug.clone())
        .collect();
    if chains.is_empty() {
        warn!("No configured chain has an endpoint; nothing to watch");
    }

    info!(
        accounts = config.accounts.len(),
        chains = chains.len(),
        assets = config.assets.len(),
        "Starting balance-watch"
    );

    let service = BalanceService::new(
        Registry::new(config.chains.clone(), config.assets.clone()),
        clients,
        config.balance.clone(),
    );

    let book = Arc::new(Mutex::new(BalanceBook::new()));
    let callback: BalanceCallback = {
        let book = book.clone();
        Arc::new(move |items| {
            let changed = match book.lock() {
                Ok(mut book) => book.apply(items),
                Err(_) => return,
            };
            for item in changed {
                info!(
                    address = %item.address,
                    token = %item.token_slug,
                    free = %item.free,
                    locked = %item.locked,
                    state = item.state.as_str(),
                    "Balance"
                );
            }
        })
    };

    let handle = service.subscribe(
        SubscribeRequest {
            addresses: config.accounts.clone(),
            chains,
            ..Default::default()
        },
        callback,
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    handle.cancel();

    if let Ok(book) = book.lock() {
        info!(records = book.len(), states = ?book.state_counts(), "Subscription cancelled");
    }
    Ok(())
}
