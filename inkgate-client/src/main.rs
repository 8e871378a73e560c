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

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inkgate_client::{aggregate_scopes, tool_payload, ClientOptions, NotebookClient};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(name = "inkgate-client")]
#[command(about = "Headless OAuth client for the Inkgate notebook server")]
struct Cli {
    /// MCP endpoint of the notebook resource server
    #[arg(
        long,
        env = "INKGATE_CLIENT_SERVER_URL",
        default_value = "http://localhost:8001/mcp",
        global = true
    )]
    server_url: String,

    /// Demo account username
    #[arg(long, env = "INKGATE_CLIENT_USERNAME", default_value = "demo_user", global = true)]
    username: String,

    /// Demo account password
    #[arg(
        long,
        env = "INKGATE_CLIENT_PASSWORD",
        default_value = "demo_password",
        global = true
    )]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start without a token and authorize each scope only when challenged
    StepUp,

    /// Aggregate the scopes of the tools to be used and authorize once
    Aggregated,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkgate_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let server_url = Url::parse(&cli.server_url).context("Invalid server URL")?;
    let options = ClientOptions {
        username: cli.username,
        password: cli.password,
        ..ClientOptions::default()
    };
    let mut client = NotebookClient::new(server_url, options)?;

    println!("Connecting to: {}", cli.server_url);
    client.initialize().await?;

    match cli.command {
        Commands::StepUp => step_up(&mut client).await,
        Commands::Aggregated => aggregated(&mut client).await,
    }
}

async fn step_up(client: &mut NotebookClient) -> Result<()> {
    println!("Step 1: list_notes");
    let listed = client.call_tool_with_step_up("list_notes", json!({})).await?;
    print_notes(&tool_payload(&listed)?);
    print_token_scope(client);

    println!("Step 2: add_note (requires 'write')");
    let added = client.call_tool_with_step_up("add_note", new_note()).await?;
    print_note(&tool_payload(&added)?);
    print_token_scope(client);

    Ok(())
}

async fn aggregated(client: &mut NotebookClient) -> Result<()> {
    let tools = client.list_tools().await?;
    for tool in &tools {
        println!("  {} requires {:?}", tool.name, tool.meta.required_scopes);
    }

    let scope = aggregate_scopes(&tools, &["list_notes", "add_note"])?;
    println!("Requesting aggregated scope: {}", scope);
    client.authorize(&scope).await?;
    print_token_scope(client);

    let listed = client.call_tool("list_notes", json!({})).await?;
    print_notes(&tool_payload(&listed)?);

    let added = client.call_tool("add_note", new_note()).await?;
    print_note(&tool_payload(&added)?);

    Ok(())
}

fn new_note() -> Value {
    json!({
        "title": "My New Note",
        "content": "This note was added by the inkgate client"
    })
}

fn print_token_scope(client: &NotebookClient) {
    if let Some(token) = client.token() {
        println!("Token scope: {}", token.scope);
    }
}

fn print_notes(listing: &Value) {
    let notes = listing["notes"].as_array().cloned().unwrap_or_default();
    if notes.is_empty() {
        println!("No notes found.");
        return;
    }

    println!("Found {} note(s):", notes.len());
    for note in notes {
        println!("  - {} {}", note["id"].as_str().unwrap_or("?"), note["title"]);
    }
}

fn print_note(note: &Value) {
    println!("Note created:");
    println!("  ID: {}", note["id"].as_str().unwrap_or("?"));
    println!("  Title: {}", note["title"].as_str().unwrap_or(""));
    println!("  Content: {}", note["content"].as_str().unwrap_or(""));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "inkgate-client",
            "--server-url",
            "http://localhost:8100/mcp",
            "aggregated",
        ])
        .unwrap();

        assert_eq!(cli.server_url, "http://localhost:8100/mcp");
        assert!(matches!(cli.command, Commands::Aggregated));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["inkgate-client"]).is_err());
    }
}
