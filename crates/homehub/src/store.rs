// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device repository abstraction
//!
//! The only storage contract the HTTP layer depends on.

use crate::device::Device;
use crate::error::HubResult;
use uuid::Uuid;

/// Device repository trait
///
/// Backend-agnostic interface for persisting device aggregates.
///
/// # Implementations
///
/// - `SqliteStore` -- normalized relational tables in a SQLite file
pub trait DeviceRepository: Send + Sync {
    /// Backend-specific settings passed to `init`
    type Config;

    /// Open the backend and make sure its schema exists.
    fn init(config: &Self::Config) -> HubResult<Self>
    where
        Self: Sized;

    /// Insert or update a device and everything it owns, atomically.
    ///
    /// Saving an unchanged device again is a no-op.
    fn save(&self, device: &Device) -> HubResult<()>;

    /// Load one device. Fails with `HubError::NotFound` if absent.
    fn get(&self, id: Uuid) -> HubResult<Device>;

    /// Load every device, in registration order.
    fn get_all(&self) -> HubResult<Vec<Device>>;

    /// Remove a device and all dependent rows. Fails with
    /// `HubError::NotFound` if absent.
    fn delete(&self, id: Uuid) -> HubResult<()>;
}
