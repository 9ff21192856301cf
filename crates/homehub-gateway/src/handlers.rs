// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP request handlers.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use homehub::view::{messages_view, services_view};
use homehub::{
    CallParams, Device, DeviceAddr, DeviceSummary, DispatchError, HubError, MessageView,
    ServiceView,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    pub fn new(code: u16, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(400, error)
    }

    pub fn internal(error: impl Into<String>) -> Self {
        Self::new(500, error)
    }

    /// Reconnecting an unknown device is a client error, not an empty result.
    fn from_reconnect(err: HubError) -> Self {
        match err {
            HubError::NotFound(_) => Self::new(404, err.to_string()),
            other => other.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("{}", self.error);
        } else {
            tracing::debug!("Request rejected ({}): {}", self.code, self.error);
        }

        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }
        (status, Json(self)).into_response()
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        let code = match &err {
            HubError::Validation(_) | HubError::Parse(_) => 400,
            HubError::NotFound(_) => 204,
            HubError::Persistence(_) => 500,
            HubError::Dispatch(dispatch) => match dispatch {
                DispatchError::InvalidUrl(_) | DispatchError::Transport(_) => 400,
                DispatchError::Connect(_) | DispatchError::Timeout => 503,
                DispatchError::Client(_) => 500,
            },
        };
        Self::new(code, err.to_string())
    }
}

/// Run a blocking store operation off the async workers.
async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::internal(format!("Store task failed: {}", e)))
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id)
        .map_err(|_| HubError::Validation(format!("invalid device id '{}'", id)).into())
}

async fn load_device(state: &AppState, id: &str) -> Result<Device, ApiError> {
    let id = parse_id(id)?;
    let hub = state.hub.clone();
    Ok(blocking(move || hub.device(id)).await??)
}

/// `POST /connect` body.
#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(rename = "hub-code")]
    pub hub_code: String,
    #[serde(default)]
    pub name: String,
    /// Packed schema text
    #[serde(default)]
    pub serv: String,
    /// Codec the schema is packed with
    #[serde(default)]
    pub algo: String,
    /// Present when a known device reconnects
    #[serde(default)]
    pub id: Option<String>,
    /// Overrides the observed peer address
    #[serde(default)]
    pub addr: Option<String>,
}

/// GET /
pub async fn home() -> &'static str {
    "Works"
}

/// POST /connect - register or reconnect a device
pub async fn connect(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: ConnectRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid connect payload: {}", e)))?;

    if !state.hub_code.accepts(&request.hub_code) {
        tracing::warn!("Rejected connect from {}: bad hub code", peer);
        return Err(HubError::Validation("invalid hub code".into()).into());
    }

    let addr = match request.addr.as_deref().filter(|a| !a.is_empty()) {
        Some(text) => text
            .parse::<DeviceAddr>()
            .map_err(|e| ApiError::from(HubError::Validation(e.to_string())))?,
        None => DeviceAddr::from_ip(peer.ip()),
    };

    if let Some(id) = request.id.as_deref().filter(|id| !id.is_empty()) {
        let id = parse_id(id)?;
        let hub = state.hub.clone();
        blocking(move || hub.reconnect(id, addr))
            .await?
            .map_err(ApiError::from_reconnect)?;
        return Ok("Device Reconnected to Hub!".into_response());
    }

    if request.name.trim().is_empty() {
        return Err(HubError::Validation("device name is required".into()).into());
    }

    let hub = state.hub.clone();
    let id = blocking(move || {
        hub.register(&request.name, addr, &request.algo, request.serv.as_bytes())
    })
    .await??;

    Ok(id.to_string().into_response())
}

/// GET /device - all devices
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeviceSummary>>, ApiError> {
    let hub = state.hub.clone();
    let devices = blocking(move || hub.devices()).await??;

    Ok(Json(
        devices
            .iter()
            .map(|device| DeviceSummary::new(device, &state.url_path))
            .collect(),
    ))
}

/// GET /device/:id
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeviceSummary>, ApiError> {
    let device = load_device(&state, &id).await?;
    Ok(Json(DeviceSummary::new(&device, &state.url_path)))
}

/// DELETE /device/:id
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<&'static str, ApiError> {
    let id = parse_id(&id)?;
    let hub = state.hub.clone();
    blocking(move || hub.remove(id)).await??;
    Ok("Device removed")
}

/// GET /device/:id/services
pub async fn device_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ServiceView>>, ApiError> {
    let device = load_device(&state, &id).await?;
    Ok(Json(services_view(&device)))
}

/// GET /device/:id/messages
pub async fn device_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let device = load_device(&state, &id).await?;
    Ok(Json(messages_view(&device)))
}

/// GET /device/:id/services/:service - forward a call, relay the raw reply
pub async fn call_service(
    State(state): State<Arc<AppState>>,
    Path((id, service)): Path<(String, String)>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let device = load_device(&state, &id).await?;
    let reply = state
        .hub
        .call_service(&device, &service, &CallParams::from(pairs))
        .await?;

    Ok((StatusCode::OK, reply.body).into_response())
}
