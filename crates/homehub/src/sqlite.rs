// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite device repository
//!
//! Maps the device aggregate onto six normalized tables and back.

use crate::device::{Device, DeviceAddr};
use crate::error::{HubError, HubResult, PersistenceError};
use crate::schema::{Field, Message, MessageDefinition, Scalar, Service, Type};
use crate::store::DeviceRepository;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS devices (
    id TEXT NOT NULL PRIMARY KEY,
    name TEXT NOT NULL,
    addr TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id TEXT NOT NULL
        REFERENCES devices (id) ON UPDATE CASCADE ON DELETE CASCADE,
    name TEXT NOT NULL,
    position INTEGER NOT NULL,
    UNIQUE (device_id, name)
);

CREATE TABLE IF NOT EXISTS message_fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id INTEGER NOT NULL
        REFERENCES messages (id) ON UPDATE CASCADE ON DELETE CASCADE,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    is_optional INTEGER NOT NULL,
    is_required INTEGER NOT NULL,
    is_scalar INTEGER NOT NULL,
    type_value TEXT NOT NULL,
    UNIQUE (message_id, position)
);

CREATE TABLE IF NOT EXISTS service_response (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    is_scalar INTEGER NOT NULL,
    type_value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS services (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id TEXT NOT NULL
        REFERENCES devices (id) ON UPDATE CASCADE ON DELETE CASCADE,
    name TEXT NOT NULL,
    position INTEGER NOT NULL,
    response_id INTEGER
        REFERENCES service_response (id) ON DELETE SET NULL,
    inbound INTEGER NOT NULL DEFAULT 0,
    outbound INTEGER NOT NULL DEFAULT 0,
    UNIQUE (device_id, name)
);

CREATE TABLE IF NOT EXISTS service_request (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    service_id INTEGER NOT NULL
        REFERENCES services (id) ON UPDATE CASCADE ON DELETE CASCADE,
    position INTEGER NOT NULL,
    is_scalar INTEGER NOT NULL,
    type_value TEXT NOT NULL,
    UNIQUE (service_id, position)
);

CREATE INDEX IF NOT EXISTS idx_services_response ON services (response_id);
";

/// Encode a type as its `(is_scalar, type_value)` column pair.
pub fn type_to_row(ty: &Type) -> (bool, &str) {
    (ty.is_scalar(), ty.value())
}

/// Decode a `(is_scalar, type_value)` column pair.
///
/// Unknown scalar names are an error, never a default.
pub fn row_to_type(is_scalar: bool, value: String) -> Result<Type, PersistenceError> {
    if is_scalar {
        value
            .parse::<Scalar>()
            .map(Type::Scalar)
            .map_err(|e| PersistenceError::UnknownScalar(e.0))
    } else {
        Ok(Type::Reference(value))
    }
}

/// Settings for `SqliteStore`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file, created if missing
    pub path: PathBuf,
    /// How long a writer waits for a competing transaction
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// SQLite device store
///
/// Opens a fresh connection per operation, so concurrent requests never
/// share a connection. SQLite holds one writer lock per database file:
/// saves of different devices overlap with readers but not with each other.
///
/// # Schema
///
/// ```text
/// devices(id PK, name, addr)
/// +-- messages(id, device_id FK, name, position)        UNIQUE(device_id, name)
/// |   +-- message_fields(id, message_id FK, position, name,
/// |                      is_optional, is_required, is_scalar, type_value)
/// +-- services(id, device_id FK, name, position, response_id FK?,
///     |        inbound, outbound)                        UNIQUE(device_id, name)
///     +-- service_request(id, service_id FK, position, is_scalar, type_value)
/// service_response(id, is_scalar, type_value)  <- services.response_id
/// ```
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Open (and create if needed) a file-based store with default settings.
    pub fn open(path: impl AsRef<Path>) -> HubResult<Self> {
        Self::init(&StoreConfig::new(path.as_ref()))
    }

    fn connect(&self) -> HubResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    fn init_schema(&self) -> HubResult<()> {
        let conn = self.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("SQLite journal mode: {}", mode);
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------------

    fn upsert_device(conn: &Connection, device: &Device) -> HubResult<()> {
        // Never INSERT OR REPLACE here: a replace deletes the row and cascades.
        conn.execute(
            "INSERT INTO devices (id, name, addr) VALUES (?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name, addr = excluded.addr",
            params![device.id.to_string(), device.name, device.addr.to_string()],
        )?;
        Ok(())
    }

    fn sync_messages(conn: &Connection, device_id: &str, messages: &[Message]) -> HubResult<()> {
        let mut kept = Vec::with_capacity(messages.len());

        for (position, message) in messages.iter().enumerate() {
            let message_id: i64 = conn.query_row(
                "INSERT INTO messages (device_id, name, position) VALUES (?1, ?2, ?3)
                 ON CONFLICT (device_id, name) DO UPDATE SET position = excluded.position
                 RETURNING id",
                params![device_id, message.name, position as i64],
                |row| row.get(0),
            )?;
            Self::sync_fields(conn, message_id, &message.definitions)?;
            kept.push(message_id);
        }

        for stale in Self::child_ids(conn, "messages", device_id)? {
            if !kept.contains(&stale) {
                conn.execute("DELETE FROM messages WHERE id = ?1", [stale])?;
            }
        }
        Ok(())
    }

    fn sync_fields(
        conn: &Connection,
        message_id: i64,
        definitions: &[MessageDefinition],
    ) -> HubResult<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO message_fields
                 (message_id, position, name, is_optional, is_required, is_scalar, type_value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (message_id, position) DO UPDATE SET
                 name = excluded.name,
                 is_optional = excluded.is_optional,
                 is_required = excluded.is_required,
                 is_scalar = excluded.is_scalar,
                 type_value = excluded.type_value",
        )?;

        for (position, definition) in definitions.iter().enumerate() {
            match definition {
                MessageDefinition::Field(field) => {
                    let (is_scalar, value) = type_to_row(&field.ty);
                    stmt.execute(params![
                        message_id,
                        position as i64,
                        field.name,
                        field.optional,
                        field.required,
                        is_scalar,
                        value,
                    ])?;
                }
            }
        }

        conn.execute(
            "DELETE FROM message_fields WHERE message_id = ?1 AND position >= ?2",
            params![message_id, definitions.len() as i64],
        )?;
        Ok(())
    }

    fn sync_services(conn: &Connection, device_id: &str, services: &[Service]) -> HubResult<()> {
        let mut kept = Vec::with_capacity(services.len());

        for (position, service) in services.iter().enumerate() {
            let old_response: Option<i64> = conn
                .query_row(
                    "SELECT response_id FROM services WHERE device_id = ?1 AND name = ?2",
                    params![device_id, service.name],
                    |row| row.get::<_, Option<i64>>(0),
                )
                .optional()?
                .flatten();

            let response_id = Self::sync_response(conn, old_response, service.response.as_ref())?;

            let service_id: i64 = conn.query_row(
                "INSERT INTO services (device_id, name, position, response_id, inbound, outbound)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (device_id, name) DO UPDATE SET
                     position = excluded.position,
                     response_id = excluded.response_id,
                     inbound = excluded.inbound,
                     outbound = excluded.outbound
                 RETURNING id",
                params![
                    device_id,
                    service.name,
                    position as i64,
                    response_id,
                    service.inbound,
                    service.outbound,
                ],
                |row| row.get(0),
            )?;

            Self::sync_requests(conn, service_id, &service.request)?;
            kept.push(service_id);
        }

        for stale in Self::child_ids(conn, "services", device_id)? {
            if !kept.contains(&stale) {
                conn.execute(
                    "DELETE FROM service_response
                     WHERE id = (SELECT response_id FROM services WHERE id = ?1)",
                    [stale],
                )?;
                conn.execute("DELETE FROM services WHERE id = ?1", [stale])?;
            }
        }
        Ok(())
    }

    /// Reuse the service's response row when there is one.
    fn sync_response(
        conn: &Connection,
        existing: Option<i64>,
        response: Option<&Type>,
    ) -> HubResult<Option<i64>> {
        match (existing, response) {
            (Some(id), Some(ty)) => {
                let (is_scalar, value) = type_to_row(ty);
                conn.execute(
                    "UPDATE service_response SET is_scalar = ?2, type_value = ?3 WHERE id = ?1",
                    params![id, is_scalar, value],
                )?;
                Ok(Some(id))
            }
            (None, Some(ty)) => {
                let (is_scalar, value) = type_to_row(ty);
                let id = conn.query_row(
                    "INSERT INTO service_response (is_scalar, type_value) VALUES (?1, ?2)
                     RETURNING id",
                    params![is_scalar, value],
                    |row| row.get(0),
                )?;
                Ok(Some(id))
            }
            (Some(id), None) => {
                // ON DELETE SET NULL clears services.response_id
                conn.execute("DELETE FROM service_response WHERE id = ?1", [id])?;
                Ok(None)
            }
            (None, None) => Ok(None),
        }
    }

    fn sync_requests(conn: &Connection, service_id: i64, request: &[Type]) -> HubResult<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO service_request (service_id, position, is_scalar, type_value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (service_id, position) DO UPDATE SET
                 is_scalar = excluded.is_scalar,
                 type_value = excluded.type_value",
        )?;

        for (position, ty) in request.iter().enumerate() {
            let (is_scalar, value) = type_to_row(ty);
            stmt.execute(params![service_id, position as i64, is_scalar, value])?;
        }

        conn.execute(
            "DELETE FROM service_request WHERE service_id = ?1 AND position >= ?2",
            params![service_id, request.len() as i64],
        )?;
        Ok(())
    }

    fn child_ids(conn: &Connection, table: &str, device_id: &str) -> HubResult<Vec<i64>> {
        let mut stmt = conn.prepare(&format!("SELECT id FROM {} WHERE device_id = ?1", table))?;
        let ids = stmt
            .query_map([device_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    // ------------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------------

    fn assemble_device(conn: &Connection, id: String, name: String, addr: String) -> HubResult<Device> {
        let uuid = Uuid::parse_str(&id).map_err(|_| PersistenceError::MalformedId(id.clone()))?;
        let addr = addr
            .parse::<DeviceAddr>()
            .map_err(|_| PersistenceError::MalformedAddress(addr))?;

        Ok(Device {
            id: uuid,
            name,
            addr,
            messages: Self::load_messages(conn, &id)?,
            services: Self::load_services(conn, &id)?,
        })
    }

    fn load_messages(conn: &Connection, device_id: &str) -> HubResult<Vec<Message>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, name FROM messages WHERE device_id = ?1 ORDER BY position, id",
        )?;
        let rows = stmt
            .query_map([device_id], |row| Ok((row.get::<_, i64>(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(i64, String)>, _>>()?;

        rows.into_iter()
            .map(|(message_id, name)| {
                Ok(Message {
                    name,
                    definitions: Self::load_definitions(conn, message_id)?,
                })
            })
            .collect()
    }

    fn load_definitions(conn: &Connection, message_id: i64) -> HubResult<Vec<MessageDefinition>> {
        let mut stmt = conn.prepare_cached(
            "SELECT name, is_optional, is_required, is_scalar, type_value
             FROM message_fields WHERE message_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map([message_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Further definition kinds get their own table and are merged here.
        rows.into_iter()
            .map(|(name, optional, required, is_scalar, value)| {
                Ok(MessageDefinition::Field(Field {
                    name,
                    ty: row_to_type(is_scalar, value)?,
                    required,
                    optional,
                }))
            })
            .collect()
    }

    fn load_services(conn: &Connection, device_id: &str) -> HubResult<Vec<Service>> {
        let mut stmt = conn.prepare_cached(
            "SELECT s.id, s.name, s.inbound, s.outbound, r.is_scalar, r.type_value
             FROM services s
             LEFT JOIN service_response r ON r.id = s.response_id
             WHERE s.device_id = ?1
             ORDER BY s.position, s.id",
        )?;
        let rows = stmt
            .query_map([device_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, Option<bool>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(service_id, name, inbound, outbound, is_scalar, value)| {
                let response = match (is_scalar, value) {
                    (Some(is_scalar), Some(value)) => Some(row_to_type(is_scalar, value)?),
                    _ => None,
                };
                Ok(Service {
                    name,
                    request: Self::load_requests(conn, service_id)?,
                    response,
                    inbound,
                    outbound,
                })
            })
            .collect()
    }

    fn load_requests(conn: &Connection, service_id: i64) -> HubResult<Vec<Type>> {
        let mut stmt = conn.prepare_cached(
            "SELECT is_scalar, type_value FROM service_request
             WHERE service_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map([service_id], |row| {
                Ok((row.get::<_, bool>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(is_scalar, value)| Ok(row_to_type(is_scalar, value)?))
            .collect()
    }
}

impl DeviceRepository for SqliteStore {
    type Config = StoreConfig;

    fn init(config: &StoreConfig) -> HubResult<Self> {
        let store = Self {
            path: config.path.clone(),
            busy_timeout: config.busy_timeout,
        };
        store.init_schema()?;
        tracing::info!("Device store ready at {}", store.path.display());
        Ok(store)
    }

    fn save(&self, device: &Device) -> HubResult<()> {
        let mut conn = self.connect()?;
        // Deferred: the first statement is the device upsert, so the write
        // lock is taken before anything is read.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let device_id = device.id.to_string();
        Self::upsert_device(&tx, device)?;
        Self::sync_messages(&tx, &device_id, &device.messages)?;
        Self::sync_services(&tx, &device_id, &device.services)?;

        tx.commit()?;
        tracing::debug!(
            "Saved device {} ({} services, {} messages)",
            device.id,
            device.services.len(),
            device.messages.len()
        );
        Ok(())
    }

    fn get(&self, id: Uuid) -> HubResult<Device> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let row = tx
            .query_row(
                "SELECT id, name, addr FROM devices WHERE id = ?1",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((id_text, name, addr)) = row else {
            return Err(HubError::NotFound(id));
        };
        Self::assemble_device(&tx, id_text, name, addr)
    }

    fn get_all(&self) -> HubResult<Vec<Device>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let rows = {
            let mut stmt = tx.prepare("SELECT id, name, addr FROM devices ORDER BY rowid")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<Vec<(String, String, String)>, _>>()?;
            rows
        };

        rows.into_iter()
            .map(|(id, name, addr)| Self::assemble_device(&tx, id, name, addr))
            .collect()
    }

    fn delete(&self, id: Uuid) -> HubResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let id_text = id.to_string();

        // Responses are referenced by services, so the cascade cannot reach them.
        tx.execute(
            "DELETE FROM service_response
             WHERE id IN (SELECT response_id FROM services WHERE device_id = ?1)",
            [&id_text],
        )?;
        let removed = tx.execute("DELETE FROM devices WHERE id = ?1", [&id_text])?;
        if removed == 0 {
            return Err(HubError::NotFound(id));
        }

        tx.commit()?;
        tracing::info!("Deleted device {}", id);
        Ok(())
    }
}
