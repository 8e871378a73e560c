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

pub mod challenge;
pub mod client;
pub mod discovery;

pub use challenge::{parse_challenge, Challenge};
pub use client::{
    aggregate_scopes, tool_payload, CallError, ClientOptions, NotebookClient, RegisteredClient,
    TokenSet, ToolInfo,
};
pub use discovery::{discover, Discovery};
