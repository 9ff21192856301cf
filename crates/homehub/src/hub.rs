// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hub facade
//!
//! Registration, reconnection and call forwarding on top of a
//! `DeviceRepository` and a `Dispatcher`. Store methods are blocking; async
//! callers run them on a blocking pool.

use crate::codec::decode_payload;
use crate::device::{Device, DeviceAddr};
use crate::dispatch::{CallParams, DeviceReply, Dispatcher};
use crate::error::HubResult;
use crate::store::DeviceRepository;
use std::sync::Arc;
use uuid::Uuid;

/// Shared hub state. Cloning is cheap.
pub struct Hub<R> {
    store: Arc<R>,
    dispatcher: Dispatcher,
}

impl<R> Clone for Hub<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<R: DeviceRepository> Hub<R> {
    pub fn new(store: R, dispatcher: Dispatcher) -> Self {
        Self {
            store: Arc::new(store),
            dispatcher,
        }
    }

    /// Register a new device from its packed schema. Returns the assigned id.
    ///
    /// An unknown `algo` decodes to an empty payload and fails as a parse
    /// error.
    pub fn register(
        &self,
        name: &str,
        addr: DeviceAddr,
        algo: &str,
        payload: &[u8],
    ) -> HubResult<Uuid> {
        let raw = decode_payload(algo, payload);
        let device = Device::new(name, addr, &raw)?;
        self.store.save(&device)?;

        tracing::info!(
            "Registered device {} '{}' at {} ({} services, {} messages)",
            device.id,
            device.name,
            device.addr,
            device.services.len(),
            device.messages.len()
        );
        Ok(device.id)
    }

    /// Record a new address for a known device. The stored schema is kept.
    ///
    /// The lookup and the save are separate store transactions: a delete
    /// landing between them is undone by the save, which re-creates the
    /// device with its old schema.
    pub fn reconnect(&self, id: Uuid, addr: DeviceAddr) -> HubResult<()> {
        let mut device = self.store.get(id)?;
        let previous = device.addr;
        device.addr = addr;
        self.store.save(&device)?;

        tracing::info!("Device {} reconnected: {} -> {}", id, previous, addr);
        Ok(())
    }

    pub fn device(&self, id: Uuid) -> HubResult<Device> {
        self.store.get(id)
    }

    pub fn devices(&self) -> HubResult<Vec<Device>> {
        self.store.get_all()
    }

    pub fn remove(&self, id: Uuid) -> HubResult<()> {
        self.store.delete(id)
    }

    /// Forward a call to `device`.
    ///
    /// The service name is not checked against the device's schema and
    /// direction flags are not enforced; the device answers for itself.
    pub async fn call_service(
        &self,
        device: &Device,
        service: &str,
        params: &CallParams,
    ) -> HubResult<DeviceReply> {
        let reply = device.call(&self.dispatcher, service, params).await?;
        tracing::debug!(
            "Device {} answered {} with status {} ({} bytes)",
            device.id,
            service,
            reply.status,
            reply.body.len()
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchConfig;
    use crate::error::{DispatchError, HubError};
    use crate::sqlite::SqliteStore;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    fn temp_hub() -> (TempDir, Hub<SqliteStore>) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("hub.db")).unwrap();
        let dispatcher = Dispatcher::new(DispatchConfig::default()).unwrap();
        (dir, Hub::new(store, dispatcher))
    }

    fn addr(last: u8) -> DeviceAddr {
        DeviceAddr::from_ip(IpAddr::V4(Ipv4Addr::new(192, 168, 1, last)))
    }

    #[test]
    fn test_register_persists_device() {
        let (_dir, hub) = temp_hub();
        let id = hub
            .register("Lamp", addr(20), "none", b"service Toggle():bool;")
            .unwrap();

        let device = hub.device(id).unwrap();
        assert_eq!(device.name, "Lamp");
        assert_eq!(device.addr, addr(20));
        assert!(device.service("Toggle").is_some());
        assert_eq!(hub.devices().unwrap().len(), 1);
    }

    #[test]
    fn test_register_unknown_codec_is_parse_error() {
        let (_dir, hub) = temp_hub();
        let err = hub
            .register("Lamp", addr(20), "lz4", b"service Toggle():bool;")
            .unwrap_err();
        assert!(matches!(err, HubError::Parse(_)));
        assert!(hub.devices().unwrap().is_empty());
    }

    #[test]
    fn test_register_bad_schema_stores_nothing() {
        let (_dir, hub) = temp_hub();
        let err = hub
            .register("Lamp", addr(20), "none", b"service Toggle(int34);")
            .unwrap_err();
        assert!(matches!(err, HubError::Parse(_)));
        assert!(hub.devices().unwrap().is_empty());
    }

    #[test]
    fn test_reconnect_changes_only_address() {
        let (_dir, hub) = temp_hub();
        let id = hub
            .register(
                "Lamp",
                addr(20),
                "none",
                b"message Color { uint32 r; } service Paint(Color):bool;",
            )
            .unwrap();
        let before = hub.device(id).unwrap();

        hub.reconnect(id, addr(99)).unwrap();

        let after = hub.device(id).unwrap();
        assert_eq!(after.addr, addr(99));
        assert_eq!(after.name, before.name);
        assert_eq!(after.services, before.services);
        assert_eq!(after.messages, before.messages);
    }

    #[test]
    fn test_reconnect_unknown_device_is_not_found() {
        let (_dir, hub) = temp_hub();
        let id = Uuid::new_v4();
        assert!(matches!(
            hub.reconnect(id, addr(1)),
            Err(HubError::NotFound(missing)) if missing == id
        ));
        assert!(hub.devices().unwrap().is_empty());
    }

    #[test]
    fn test_reconnect_after_remove_does_not_resurrect() {
        let (_dir, hub) = temp_hub();
        let id = hub
            .register("Lamp", addr(20), "none", b"service Toggle():bool;")
            .unwrap();
        hub.remove(id).unwrap();

        assert!(matches!(hub.reconnect(id, addr(99)), Err(HubError::NotFound(_))));
        assert!(hub.devices().unwrap().is_empty());
    }

    #[test]
    fn test_remove_device() {
        let (_dir, hub) = temp_hub();
        let id = hub
            .register("Lamp", addr(20), "none", b"service Toggle():bool;")
            .unwrap();

        hub.remove(id).unwrap();
        assert!(matches!(hub.device(id), Err(HubError::NotFound(_))));
        assert!(matches!(hub.remove(id), Err(HubError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_call_service_forwards_to_device() {
        use axum::extract::RawQuery;
        use axum::routing::get;

        let app = axum::Router::new().route(
            "/Toggle",
            get(|RawQuery(query): RawQuery| async move {
                format!("toggled {}", query.unwrap_or_default())
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let device_addr = DeviceAddr::from(listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let (_dir, hub) = temp_hub();
        let id = hub
            .register("Lamp", device_addr, "none", b"service Toggle():bool;")
            .unwrap();
        let device = hub.device(id).unwrap();

        let params: CallParams = vec![("state", "on")].into_iter().collect();
        let reply = hub.call_service(&device, "Toggle", &params).await.unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, b"toggled state=on");
    }

    #[tokio::test]
    async fn test_call_service_invalid_target() {
        let (_dir, hub) = temp_hub();
        let unspecified = DeviceAddr::from_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let id = hub
            .register("Ghost", unspecified, "none", b"service Toggle():bool;")
            .unwrap();
        let device = hub.device(id).unwrap();

        let err = hub
            .call_service(&device, "Toggle", &CallParams::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HubError::Dispatch(DispatchError::InvalidUrl(_))
        ));
    }
}
