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

//! Both servers bound on ephemeral ports, driven through the client.

use anyhow::Result;
use inkgate_client::{aggregate_scopes, tool_payload, CallError, ClientOptions, NotebookClient};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::net::TcpListener;
use url::Url;

struct Stack {
    resource_url: Url,
}

async fn serve(listener: TcpListener, app: axum::Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
}

async fn start_stack(strict_audience: bool) -> Result<Stack> {
    let as_listener = TcpListener::bind("127.0.0.1:0").await?;
    let as_url = format!("http://{}", as_listener.local_addr()?);
    let auth_config = inkgate_auth::Config {
        issuer: Some(as_url.clone()),
        ..inkgate_auth::Config::default()
    };
    let auth_state = inkgate_auth::AppState::in_memory(auth_config)?;
    serve(as_listener, inkgate_auth::create_router(auth_state)).await;

    let rs_listener = TcpListener::bind("127.0.0.1:0").await?;
    let resource_url = format!("http://{}/mcp", rs_listener.local_addr()?);
    let mcp_config = inkgate_mcp::Config {
        server_url: Some(resource_url.clone()),
        auth_server_url: as_url,
        strict_audience,
        ..inkgate_mcp::Config::default()
    };
    let mcp_state = inkgate_mcp::AppState::from_config(mcp_config)?;
    serve(rs_listener, inkgate_mcp::create_router(mcp_state)).await;

    Ok(Stack {
        resource_url: Url::parse(&resource_url)?,
    })
}

fn client(stack: &Stack) -> Result<NotebookClient> {
    NotebookClient::new(stack.resource_url.clone(), ClientOptions::default())
}

#[tokio::test]
async fn test_step_up_flow() -> Result<()> {
    let stack = start_stack(false).await?;
    let mut client = client(&stack)?;
    client.initialize().await?;

    // No token yet: the server names the read scope.
    match client.call_tool("list_notes", json!({})).await {
        Err(CallError::Challenge { status, challenge }) => {
            assert_eq!(status, 401);
            assert_eq!(challenge.error, "invalid_token");
            assert_eq!(challenge.scope.as_deref(), Some("read"));
        }
        other => panic!("expected a challenge, got {:?}", other),
    }

    let listed = client.call_tool_with_step_up("list_notes", json!({})).await?;
    assert_eq!(tool_payload(&listed)?["count"], 0);
    assert_eq!(client.token().map(|t| t.scope.as_str()), Some("read"));

    // Read token is not enough to write.
    match client
        .call_tool("add_note", json!({"title": "t", "content": "c"}))
        .await
    {
        Err(CallError::Challenge { status, challenge }) => {
            assert_eq!(status, 403);
            assert_eq!(challenge.error, "insufficient_scope");
            assert_eq!(challenge.scope.as_deref(), Some("write"));
        }
        other => panic!("expected a challenge, got {:?}", other),
    }

    let added = client
        .call_tool_with_step_up("add_note", json!({"title": "Idea", "content": "step-up"}))
        .await?;
    assert_eq!(tool_payload(&added)?["title"], "Idea");
    assert_eq!(client.token().map(|t| t.scope.as_str()), Some("write"));
    Ok(())
}

#[tokio::test]
async fn test_aggregated_flow() -> Result<()> {
    let stack = start_stack(false).await?;
    let mut client = client(&stack)?;

    let tools = client.list_tools().await?;
    let scope = aggregate_scopes(&tools, &["list_notes", "add_note"])?;
    assert_eq!(scope.to_string(), "read write");

    let token = client.authorize(&scope).await?;
    assert_eq!(token.scope, "read write");
    assert_eq!(token.token_type, "Bearer");

    let added = client
        .call_tool("add_note", json!({"title": "Plan", "content": "aggregated"}))
        .await?;
    let id = tool_payload(&added)?["id"].as_str().unwrap_or_default().to_string();

    let listed = client.call_tool("list_notes", json!({})).await?;
    let listing = tool_payload(&listed)?;
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["notes"][0]["id"], id.as_str());

    let edited = client
        .call_tool("edit_note", json!({"note_id": id, "title": "Plan B"}))
        .await?;
    assert_eq!(tool_payload(&edited)?["title"], "Plan B");
    Ok(())
}

#[tokio::test]
async fn test_strict_audience_accepts_bound_token() -> Result<()> {
    let stack = start_stack(true).await?;
    let mut client = client(&stack)?;

    client.authorize(&"read".parse()?).await?;
    let listed = client.call_tool("list_notes", json!({})).await?;
    assert_eq!(tool_payload(&listed)?["count"], 0);
    Ok(())
}

#[tokio::test]
async fn test_wrong_password_is_rejected() -> Result<()> {
    let stack = start_stack(false).await?;
    let options = ClientOptions {
        password: "not-the-password".to_string(),
        ..ClientOptions::default()
    };
    let mut client = NotebookClient::new(stack.resource_url.clone(), options)?;

    let err = client.authorize(&"read".parse()?).await.unwrap_err();
    assert!(err.to_string().contains("401"));
    assert!(client.token().is_none());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_authorization_server_fails_closed() -> Result<()> {
    let dead = std::net::TcpListener::bind("127.0.0.1:0")?;
    let dead_url = format!("http://{}", dead.local_addr()?);
    drop(dead);

    let rs_listener = TcpListener::bind("127.0.0.1:0").await?;
    let resource_url = format!("http://{}/mcp", rs_listener.local_addr()?);
    let mcp_config = inkgate_mcp::Config {
        server_url: Some(resource_url.clone()),
        auth_server_url: dead_url,
        introspection_timeout_ms: 500,
        ..inkgate_mcp::Config::default()
    };
    serve(
        rs_listener,
        inkgate_mcp::create_router(inkgate_mcp::AppState::from_config(mcp_config)?),
    )
    .await;

    let response = reqwest::Client::new()
        .post(&resource_url)
        .bearer_auth("it_whatever")
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "list_notes", "arguments": {}}
        }))
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 401);
    let header = response
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(
        header,
        r#"Bearer error="invalid_token", error_description="Authentication required", scope="read""#
    );
    Ok(())
}
