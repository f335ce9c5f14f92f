// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{net::SocketAddr, sync::Arc};

use axum::{Json, Router, extract::State, routing::get};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::store::TableStore;

pub fn build_router(store: Arc<TableStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(store)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(bind_addr: SocketAddr, store: Arc<TableStore>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "health endpoint listening");
    axum::serve(listener, build_router(store)).await?;
    Ok(())
}

async fn health(State(store): State<Arc<TableStore>>) -> Json<serde_json::Value> {
    let table = store.snapshot().await;
    Json(serde_json::json!({
        "ok": true,
        "service": "starcall-bot",
        "table": table.exists(),
        "locked": table.is_locked,
    }))
}
