// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HomeHub core
//!
//! Devices register with the hub by uploading a small interface schema
//! (`message` and `service` declarations). The hub stores it and forwards
//! service calls from API clients to the device over HTTP.
//!
//! # Features
//!
//! - **Schema Parser** -- Line/column diagnostics, forward references
//! - **SQLite Store** -- Normalized tables, transactional full-aggregate saves
//! - **Dispatcher** -- Bounded timeouts, one retry on connection failure
//!
//! # Architecture
//!
//! ```text
//! Hub
//! +-- DeviceRepository  (SqliteStore)
//! +-- Dispatcher        (reqwest, GET+query or POST+JSON)
//! Device
//! +-- services / messages  (parsed from the uploaded schema)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use homehub::{DispatchConfig, Dispatcher, Hub, SqliteStore};
//!
//! let store = SqliteStore::open("homehub.db")?;
//! let hub = Hub::new(store, Dispatcher::new(DispatchConfig::default())?);
//! let id = hub.register("Lamp", "192.168.1.20".parse()?, "none", b"service Toggle():bool;")?;
//! ```

pub mod codec;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod schema;
pub mod sqlite;
pub mod store;
pub mod view;

pub use codec::{decode_payload, PayloadCodec};
pub use device::{Device, DeviceAddr, InvalidAddress, DEFAULT_PORT};
pub use dispatch::{CallParams, DeviceReply, DispatchConfig, Dispatcher, ForwardMode};
pub use error::{
    DispatchError, HubError, HubResult, ParseError, ParseErrorKind, PersistenceError,
};
pub use hub::Hub;
pub use schema::{Field, Message, MessageDefinition, Scalar, Schema, Service, Type};
pub use sqlite::{SqliteStore, StoreConfig};
pub use store::DeviceRepository;
pub use view::{DeviceSummary, FieldView, MessageView, ServiceView, TypeView};
