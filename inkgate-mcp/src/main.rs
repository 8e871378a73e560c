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
use inkgate_mcp::{routes, state::AppState, Config};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "inkgate-mcp")]
#[command(about = "Scope-gated notebook MCP resource server", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "INKGATE_MCP_PORT")]
    port: Option<u16>,

    /// Authorization server base URL
    #[arg(long, env = "INKGATE_MCP_AUTH_SERVER_URL")]
    auth_server: Option<String>,

    /// Require token audiences to cover this resource (RFC 8707)
    #[arg(long)]
    oauth_strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkgate_mcp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(auth_server) = args.auth_server {
        config.auth_server_url = auth_server;
    }
    config.strict_audience |= args.oauth_strict;

    let state = AppState::from_config(config.clone())?;

    info!("Notebook MCP resource server at {}", config.server_url());
    info!("Authorization server: {}", config.auth_server_url());
    info!("Introspection endpoint: {}", config.introspection_endpoint());
    if config.strict_audience {
        info!("Strict audience validation enabled");
    }

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
