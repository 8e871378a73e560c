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

use anyhow::{anyhow, Result};
use inkgate_core::{Note, Scope};
use inkgate_db::NoteRepository;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::registry::ToolScopeRegistry;

pub const LIST_NOTES: &str = "list_notes";
pub const READ_NOTE: &str = "read_note";
pub const ADD_NOTE: &str = "add_note";
pub const EDIT_NOTE: &str = "edit_note";

pub const TOOL_NAMES: [&str; 4] = [LIST_NOTES, READ_NOTE, ADD_NOTE, EDIT_NOTE];

/// Scope requirements for the notebook tools.
pub fn notebook_registry() -> ToolScopeRegistry {
    ToolScopeRegistry::new()
        .require(LIST_NOTES, Scope::Read)
        .require(READ_NOTE, Scope::Read)
        .require(ADD_NOTE, Scope::Write)
        .require(EDIT_NOTE, Scope::Write)
}

pub struct NotebookTools {
    notes: Arc<NoteRepository>,
}

impl NotebookTools {
    pub fn new(notes: Arc<NoteRepository>) -> Self {
        Self { notes }
    }

    /// Tool listing with each tool's required scope under `_meta`.
    pub fn definitions(&self, registry: &ToolScopeRegistry) -> Vec<Value> {
        [
            list_notes_tool(),
            read_note_tool(),
            add_note_tool(),
            edit_note_tool(),
        ]
        .into_iter()
        .map(|mut tool| {
            let scopes: Vec<&str> = tool["name"]
                .as_str()
                .and_then(|name| registry.required_scope(name))
                .map(|scope| vec![scope.as_str()])
                .unwrap_or_default();
            tool["_meta"] = json!({ "required_scopes": scopes });
            tool
        })
        .collect()
    }

    /// Run a tool and return its JSON payload.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<Value> {
        match name {
            LIST_NOTES => self.list_notes().await,
            READ_NOTE => self.read_note(arguments).await,
            ADD_NOTE => self.add_note(arguments).await,
            EDIT_NOTE => self.edit_note(arguments).await,
            _ => Err(anyhow!("Unknown tool: {}", name)),
        }
    }

    async fn list_notes(&self) -> Result<Value> {
        let notes: Vec<Value> = self
            .notes
            .list()
            .await?
            .iter()
            .map(|note| {
                json!({
                    "id": note.id,
                    "title": note.title,
                    "created_at": note.created_at.to_rfc3339(),
                    "updated_at": note.updated_at.to_rfc3339(),
                })
            })
            .collect();

        Ok(json!({ "count": notes.len(), "notes": notes }))
    }

    async fn read_note(&self, arguments: &Value) -> Result<Value> {
        let note_id = required_str(arguments, "note_id")?;
        Ok(match self.notes.find_by_id(note_id).await? {
            Some(note) => note_json(&note),
            None => not_found(note_id),
        })
    }

    async fn add_note(&self, arguments: &Value) -> Result<Value> {
        let title = required_str(arguments, "title")?.to_string();
        let content = required_str(arguments, "content")?.to_string();

        let note = self.notes.create(title, content).await?;
        tracing::info!(note_id = %note.id, "Note added");
        Ok(note_json(&note))
    }

    async fn edit_note(&self, arguments: &Value) -> Result<Value> {
        let note_id = required_str(arguments, "note_id")?;
        let title = optional_str(arguments, "title")?;
        let content = optional_str(arguments, "content")?;

        Ok(match self.notes.update(note_id, title, content).await? {
            Some(note) => {
                tracing::info!(note_id = %note.id, "Note edited");
                note_json(&note)
            }
            None => not_found(note_id),
        })
    }
}

/// Wrap a payload as an MCP text content result.
pub fn tool_result(payload: &Value) -> Value {
    json!({
        "content": [{ "type": "text", "text": payload.to_string() }]
    })
}

pub fn tool_error(message: &str) -> Value {
    json!({
        "content": [{ "type": "text", "text": message }],
        "isError": true
    })
}

fn note_json(note: &Note) -> Value {
    json!({
        "id": note.id,
        "title": note.title,
        "content": note.content,
        "created_at": note.created_at.to_rfc3339(),
        "updated_at": note.updated_at.to_rfc3339(),
    })
}

fn not_found(note_id: &str) -> Value {
    json!({ "error": "Note not found", "note_id": note_id })
}

fn required_str<'a>(arguments: &'a Value, name: &str) -> Result<&'a str> {
    arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("{} is required", name))
}

fn optional_str(arguments: &Value, name: &str) -> Result<Option<String>> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(anyhow!("{} must be a string", name)),
    }
}

fn list_notes_tool() -> Value {
    json!({
        "name": LIST_NOTES,
        "description": "List all notes with their IDs, titles and timestamps",
        "inputSchema": {
            "type": "object",
            "properties": {}
        }
    })
}

fn read_note_tool() -> Value {
    json!({
        "name": READ_NOTE,
        "description": "Read a note by ID",
        "inputSchema": {
            "type": "object",
            "properties": {
                "note_id": { "type": "string", "description": "The ID of the note to read" }
            },
            "required": ["note_id"]
        }
    })
}

fn add_note_tool() -> Value {
    json!({
        "name": ADD_NOTE,
        "description": "Add a new note",
        "inputSchema": {
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "The title of the note" },
                "content": { "type": "string", "description": "The content of the note" }
            },
            "required": ["title", "content"]
        }
    })
}

fn edit_note_tool() -> Value {
    json!({
        "name": EDIT_NOTE,
        "description": "Edit an existing note. Omitted fields are left unchanged",
        "inputSchema": {
            "type": "object",
            "properties": {
                "note_id": { "type": "string", "description": "The ID of the note to edit" },
                "title": { "type": "string", "description": "New title" },
                "content": { "type": "string", "description": "New content" }
            },
            "required": ["note_id"]
        }
    })
}
