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

//! JSON-RPC 2.0 endpoint for the MCP protocol.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    challenge::Challenge,
    decision::Decision,
    state::AppState,
    tools::{tool_error, tool_result},
};

pub const PROTOCOL_VERSION: &str = "2025-06-18";

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

pub async fn mcp_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!("Rejected MCP body: {}", rejection.body_text());
            return Json(create_error_response(Value::Null, PARSE_ERROR, "Parse error"))
                .into_response();
        }
    };

    // Batches are not part of this protocol revision.
    if !request.is_object() {
        debug!("Rejected non-object MCP body");
        return Json(create_error_response(
            Value::Null,
            INVALID_REQUEST,
            "Invalid Request",
        ))
        .into_response();
    }

    let method = extract_method(&request);
    let Some(id) = request.get("id").cloned() else {
        debug!(method, "MCP notification received");
        return StatusCode::ACCEPTED.into_response();
    };
    debug!(method, id = %id, "MCP request received");

    let params = request.get("params");
    let response = match method {
        "initialize" => create_success_response(id, initialize_result()),
        "ping" => create_success_response(id, json!({})),
        "tools/list" => create_success_response(
            id,
            json!({ "tools": state.tools.definitions(&state.registry) }),
        ),
        "tools/call" => return handle_tools_call(&state, id, params, &headers).await,
        _ => create_error_response(id, METHOD_NOT_FOUND, "Method not found"),
    };

    Json(response).into_response()
}

async fn handle_tools_call(
    state: &AppState,
    id: Value,
    params: Option<&Value>,
    headers: &HeaderMap,
) -> Response {
    let Some(name) = params.and_then(|p| p.get("name")).and_then(Value::as_str) else {
        return Json(create_error_response(id, INVALID_PARAMS, "Tool name is required"))
            .into_response();
    };
    let arguments = params
        .and_then(|p| p.get("arguments"))
        .cloned()
        .unwrap_or_else(|| json!({}));

    let bearer = bearer_token(headers);
    let decision = match state.engine.authorize_request(name, bearer).await {
        Ok(decision) => decision,
        Err(unknown) => {
            warn!("{}", unknown);
            return Json(create_error_response(id, INVALID_PARAMS, &unknown.to_string()))
                .into_response();
        }
    };

    match decision {
        Decision::Deny {
            kind,
            required_scope,
        } => Challenge::new(kind, required_scope).into_response(),
        Decision::Allow { subject } => {
            debug!(tool = name, subject = ?subject, "Tool call authorized");
            let result = match state.tools.call(name, &arguments).await {
                Ok(payload) => tool_result(&payload),
                Err(e) => {
                    warn!(tool = name, "Tool call failed: {}", e);
                    tool_error(&e.to_string())
                }
            };
            Json(create_success_response(id, result)).into_response()
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": "inkgate-mcp",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "instructions": "Notebook server with scope-based OAuth authentication (read/write scopes)"
    })
}

/// Token from an `Authorization: Bearer` header. Any other scheme counts as
/// no token.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn extract_method(request: &Value) -> &str {
    request.get("method").and_then(|v| v.as_str()).unwrap_or("")
}

fn create_success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn create_error_response(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}
