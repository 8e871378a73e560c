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

pub mod authenticator;
pub mod config;
pub mod error;
pub mod oauth2;
pub mod routes;
pub mod services;
pub mod state;
pub mod sweeper;
pub mod templates;

#[cfg(test)]
pub mod test_helpers;

pub use config::Config;
pub use routes::create_router;
pub use services::AuthorizationServer;
pub use state::AppState;
