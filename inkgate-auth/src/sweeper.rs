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

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::services::AuthorizationServer;

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Spawn the background purge of expired codes and tokens. Expiry is also
/// checked on every read, so this only bounds memory. Periods below one
/// second are raised to one second.
pub fn spawn(server: Arc<AuthorizationServer>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every.max(MIN_PERIOD));
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            sweep(&server).await;
        }
    })
}

async fn sweep(server: &AuthorizationServer) {
    match server.purge_expired().await {
        Ok((0, 0)) => {}
        Ok((codes, tokens)) => {
            tracing::info!(codes, tokens, "Purged expired authorization state");
        }
        Err(e) => tracing::error!("Sweeper failed: {:?}", e),
    }
}
