// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service call dispatcher
//!
//! Forwards a service invocation to the device that owns it, as a plain HTTP
//! request to `http://{ip}:{port}/{service}`. The device's reply is relayed
//! untouched.

use crate::device::DeviceAddr;
use crate::error::DispatchError;
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How call parameters reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardMode {
    /// `GET` with the parameters as query pairs
    #[default]
    Query,
    /// `POST` with the parameters as a flat JSON object of strings
    Json,
}

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Whole-request deadline
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Retry once when the TCP connection could not be established
    pub retry_on_connect_failure: bool,
    /// Pause before that retry
    pub retry_delay: Duration,
    pub mode: ForwardMode,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(3),
            retry_on_connect_failure: true,
            retry_delay: Duration::from_millis(250),
            mode: ForwardMode::Query,
        }
    }
}

/// Ordered call parameters. Repeated keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallParams(Vec<(String, String)>);

impl CallParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// JSON body for `ForwardMode::Json`. A repeated key keeps its last value.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl From<Vec<(String, String)>> for CallParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Raw reply from a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReply {
    /// HTTP status as sent by the device, not interpreted
    pub status: u16,
    pub body: Vec<u8>,
}

/// HTTP forwarder shared by all requests.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| DispatchError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Build the device URL for a call.
    ///
    /// Fails with `InvalidUrl` when the result would lack a host (unspecified
    /// IP) or a path (empty service name). No I/O happens here.
    pub fn target_url(
        &self,
        addr: &DeviceAddr,
        service: &str,
        params: &CallParams,
    ) -> Result<Url, DispatchError> {
        if service.is_empty() {
            return Err(DispatchError::InvalidUrl(format!(
                "http://{}/ has no service path",
                addr
            )));
        }
        if addr.ip.is_unspecified() {
            return Err(DispatchError::InvalidUrl(format!(
                "{} is not a routable device host",
                addr.ip
            )));
        }

        let mut url = Url::parse(&format!("http://{}/", addr))
            .map_err(|e| DispatchError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| DispatchError::InvalidUrl(format!("http://{}/ cannot carry a path", addr)))?
            .clear()
            .push(service);

        if self.config.mode == ForwardMode::Query && !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        if url.host().is_none() || url.path() == "/" {
            return Err(DispatchError::InvalidUrl(url.to_string()));
        }
        Ok(url)
    }

    /// Forward a call and return the device's raw reply.
    pub async fn call(
        &self,
        addr: &DeviceAddr,
        service: &str,
        params: &CallParams,
    ) -> Result<DeviceReply, DispatchError> {
        let url = self.target_url(addr, service, params)?;
        tracing::debug!("Forwarding {} to {}", service, url);

        match self.send(url.clone(), params).await {
            Err(e) if e.is_connect() && self.config.retry_on_connect_failure => {
                tracing::warn!(
                    "Device at {} unreachable, retrying in {:?}: {}",
                    addr,
                    self.config.retry_delay,
                    e
                );
                tokio::time::sleep(self.config.retry_delay).await;
                Ok(self.send(url, params).await?)
            }
            other => Ok(other?),
        }
    }

    async fn send(&self, url: Url, params: &CallParams) -> Result<DeviceReply, reqwest::Error> {
        let request = match self.config.mode {
            ForwardMode::Query => self.client.request(Method::GET, url),
            ForwardMode::Json => self.client.request(Method::POST, url).json(&params.to_json()),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(DeviceReply { status, body })
    }
}
