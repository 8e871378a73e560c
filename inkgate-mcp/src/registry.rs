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

use anyhow::{bail, Result};
use inkgate_core::{Scope, ScopeSet};
use std::collections::BTreeMap;

/// Static mapping from tool name to the single scope it requires. Fixed at
/// startup; every exposed tool must have an entry.
#[derive(Debug, Clone, Default)]
pub struct ToolScopeRegistry {
    requirements: BTreeMap<String, Scope>,
}

impl ToolScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, tool: impl Into<String>, scope: Scope) -> Self {
        self.requirements.insert(tool.into(), scope);
        self
    }

    pub fn required_scope(&self, tool: &str) -> Option<Scope> {
        self.requirements.get(tool).copied()
    }

    /// Union of every scope any tool requires.
    pub fn scopes_supported(&self) -> ScopeSet {
        self.requirements.values().copied().collect()
    }

    /// Fail if any of the given tools has no scope entry.
    pub fn ensure_covers<'a>(&self, tools: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let missing: Vec<&str> = tools
            .into_iter()
            .filter(|tool| !self.requirements.contains_key(*tool))
            .collect();

        if !missing.is_empty() {
            bail!("Tools without a scope requirement: {}", missing.join(", "));
        }
        Ok(())
    }
}
