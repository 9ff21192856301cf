// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HomeHub Gateway - device registration and call forwarding over HTTP
//!
//! # Endpoints
//!
//! - `GET /` - Liveness check
//! - `POST /connect` - Register a device, or reconnect a known one
//! - `GET /device` - Device summaries
//! - `GET /device/:id` - One device summary
//! - `DELETE /device/:id` - Remove a device
//! - `GET /device/:id/services` - Service declarations
//! - `GET /device/:id/messages` - Message declarations
//! - `GET /device/:id/services/:service` - Forward a call to the device
//!
//! The server must be run with `into_make_service_with_connect_info::<SocketAddr>()`
//! so `/connect` can see the peer address.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod routes;

use auth::{HubCodeValidator, StaticHubCode};
use axum::Router;
use config::GatewayConfig;
use homehub::{DeviceRepository, Dispatcher, Hub, HubResult, SqliteStore};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
pub struct AppState {
    pub hub: Hub<SqliteStore>,
    pub hub_code: Arc<dyn HubCodeValidator>,
    /// Prefix used in device summary links
    pub url_path: String,
}

impl AppState {
    pub fn new(
        hub: Hub<SqliteStore>,
        hub_code: Arc<dyn HubCodeValidator>,
        url_path: impl Into<String>,
    ) -> Self {
        Self {
            hub,
            hub_code,
            url_path: url_path.into(),
        }
    }

    /// Open the store and build the dispatcher described by `config`.
    pub fn from_config(config: &GatewayConfig) -> HubResult<Self> {
        let store = SqliteStore::init(&config.store_config())?;
        let dispatcher = Dispatcher::new(config.dispatch_config())?;

        Ok(Self::new(
            Hub::new(store, dispatcher),
            Arc::new(StaticHubCode::new(config.hub_code.clone())),
            config.url_path.clone(),
        ))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    routes::api_routes()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
