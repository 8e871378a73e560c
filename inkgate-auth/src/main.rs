// Inkgate - Scope-gated notebook tools over OAuth 2.0
// Copyright (C) 2025 Inkgate Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use clap::Parser;
use inkgate_auth::{routes, state::AppState, sweeper, Config};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "inkgate-auth")]
#[command(about = "Authorization server for the Inkgate notebook", long_about = None)]
struct Args {
    /// Interface to bind
    #[arg(long, env = "INKGATE_AUTH_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "INKGATE_AUTH_PORT")]
    port: Option<u16>,

    /// Public issuer URL advertised in metadata
    #[arg(long, env = "INKGATE_AUTH_ISSUER")]
    issuer: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkgate_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.issuer.is_some() {
        config.issuer = args.issuer;
    }

    info!("Starting Inkgate authorization server");
    info!("Issuer: {}", config.issuer_url());

    let state = AppState::in_memory(config.clone())?;
    let _sweeper = sweeper::spawn(state.server.clone(), config.sweep_interval());

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
