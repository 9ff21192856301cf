// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route definitions.

use crate::handlers;
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Device registration and access routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::home))
        .route("/connect", post(handlers::connect))
        .route("/device", get(handlers::list_devices))
        .route("/device/", get(handlers::list_devices))
        .route(
            "/device/:id",
            get(handlers::get_device).delete(handlers::delete_device),
        )
        .route("/device/:id/services", get(handlers::device_services))
        .route("/device/:id/messages", get(handlers::device_messages))
        .route(
            "/device/:id/services/:service",
            get(handlers::call_service),
        )
}
