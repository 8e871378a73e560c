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
use tera::Tera;

const LOGIN_TEMPLATE: &str = include_str!("../templates/login.html");

/// Build the template engine. Templates are compiled into the binary.
pub fn init_templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template("login.html", LOGIN_TEMPLATE)
        .context("Failed to parse login.html")?;
    Ok(tera)
}
