// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Manual verification script for a cTrader Open API session.
//!
//! Connects, authenticates the application and the account from the token file, optionally
//! fetches the symbol list, then keeps the session alive until Ctrl+C.
//!
//! Usage:
//! ```bash
//! cargo run --bin ctrader-session -p forex-ctrader --features bin -- --credentials app.json
//! ```

use std::{path::PathBuf, rc::Rc};

use anyhow::Context;
use clap::Parser;
use forex_ctrader::{
    auth::HttpTokenRefresher,
    common::{Credentials, HostType},
    config::SessionConfig,
    metrics::SessionMetrics,
    runtime::EventLoop,
    services::{SymbolCallbacks, SymbolListService},
    session::{AccountCallbacks, AccountSession, TransportCallbacks, TransportSession},
};
use forex_network::{TcpConnector, tls::create_tls_config_from_certs_dir};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ctrader-session", about = "Run an authenticated cTrader Open API session")]
struct Args {
    /// Path of the application credentials JSON file.
    #[arg(long, env = "CTRADER_CREDENTIALS_FILE", default_value = "app_auth.json")]
    credentials: PathBuf,

    /// Overrides the host type from the credentials file.
    #[arg(long, value_enum)]
    host: Option<HostType>,

    /// Fetches the account symbol list once authenticated.
    #[arg(long)]
    symbols: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let credentials = Credentials::from_file(&args.credentials).with_context(|| {
        format!("failed to load credentials from {}", args.credentials.display())
    })?;

    let mut config = SessionConfig::from_env();
    config.host_type = args.host.unwrap_or(credentials.host());

    let mut connector = TcpConnector::new();
    if let Some(certs_dir) = &config.certs_dir {
        connector = connector.with_tls_config(create_tls_config_from_certs_dir(certs_dir)?);
    }

    let refresher = HttpTokenRefresher::new(credentials.clone(), config.oauth_timeout())?;
    let token_file = config.token_file.clone();
    let metrics = SessionMetrics::new().context("failed to create session metrics")?;

    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let transport = TransportSession::new(
                config,
                credentials,
                Rc::new(connector),
                event_loop.handle(),
            );
            transport.set_metrics(metrics.clone());

            let account =
                AccountSession::from_file(transport.clone(), &token_file, Rc::new(refresher))
                    .with_context(|| {
                        format!("failed to load tokens from {}", token_file.display())
                    })?;

            let symbols = SymbolListService::new(transport.clone());
            symbols.set_callbacks(SymbolCallbacks::default().with_on_symbols_received(
                |received| {
                    tracing::info!("Received {} symbols", received.len());
                    for symbol in received.iter().take(10) {
                        tracing::info!(
                            "  {} {}",
                            symbol.symbol_id,
                            symbol.symbol_name.as_deref().unwrap_or("?")
                        );
                    }
                },
            ));

            let fetch_symbols = args.symbols;
            let on_authenticated = symbols.clone();
            account.set_callbacks(AccountCallbacks::default().with_on_oauth_success(
                move |tokens| {
                    tracing::info!("Account {:?} ready", tokens.account_id);
                    if fetch_symbols {
                        on_authenticated.fetch(tokens.account_id, false, None);
                    }
                },
            ));

            let on_app_auth = account.clone();
            transport.set_callbacks(
                TransportCallbacks::default()
                    .with_on_app_auth_success(move |_| on_app_auth.connect(None))
                    .with_on_status_changed(|status| tracing::info!("Transport status: {status}")),
            );

            transport.connect();

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl+C")?;

            tracing::info!("Shutting down");
            account.logout();
            account.disconnect();
            transport.disconnect();

            anyhow::Ok(())
        })
        .await?;

    event_loop.shutdown();

    match metrics.render() {
        Ok(text) => tracing::info!("Session metrics:\n{text}"),
        Err(e) => tracing::warn!("Failed to render session metrics: {e}"),
    }
    Ok(())
}
