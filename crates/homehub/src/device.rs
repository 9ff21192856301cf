// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device aggregate
//!
//! A device is created once from its uploaded schema and afterwards only its
//! address changes (on reconnect).

use crate::dispatch::{CallParams, DeviceReply, Dispatcher};
use crate::error::{DispatchError, HubResult};
use crate::schema::{Message, Schema, Service};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Port assumed when an address carries no port.
pub const DEFAULT_PORT: u16 = 80;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid device address '{0}'")]
pub struct InvalidAddress(pub String);

/// Network location of a device.
///
/// Serialized as `ip:port` (`[ip]:port` for IPv6) for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddr {
    pub ip: IpAddr,
    pub port: u16,
}

impl DeviceAddr {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Address on the default port.
    pub fn from_ip(ip: IpAddr) -> Self {
        Self::new(ip, DEFAULT_PORT)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl From<SocketAddr> for DeviceAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.socket_addr().fmt(f)
    }
}

impl FromStr for DeviceAddr {
    type Err = InvalidAddress;

    /// Accepts `ip`, `ip:port`, `[ipv6]:port` and bare IPv6.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(sock) = s.parse::<SocketAddr>() {
            return Ok(sock.into());
        }
        let bare = s.trim_start_matches('[').trim_end_matches(']');
        bare.parse::<IpAddr>()
            .map(Self::from_ip)
            .map_err(|_| InvalidAddress(s.to_string()))
    }
}

/// A registered device and its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Assigned at registration, never changes.
    pub id: Uuid,
    pub name: String,
    pub addr: DeviceAddr,
    pub services: Vec<Service>,
    pub messages: Vec<Message>,
}

impl Device {
    /// Create a device from its raw schema payload, assigning a fresh id.
    pub fn new(name: impl Into<String>, addr: DeviceAddr, raw_schema: &[u8]) -> HubResult<Self> {
        let (services, messages) = Schema::parse(raw_schema)?.into_parts();
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            addr,
            services,
            messages,
        })
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name == name)
    }

    /// Forward a service call to this device.
    pub async fn call(
        &self,
        dispatcher: &Dispatcher,
        service: &str,
        params: &CallParams,
    ) -> Result<DeviceReply, DispatchError> {
        dispatcher.call(&self.addr, service, params).await
    }
}
