// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON views of devices and their schemas.
//!
//! Booleans in discriminators are the strings `"true"` / `"false"`; existing
//! device clients match on them literally.

use crate::device::Device;
use crate::schema::{Field, Message, MessageDefinition, Service, Type};
use serde::Serialize;
use uuid::Uuid;

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeView {
    pub is_scalar: &'static str,
    pub value: String,
}

impl From<&Type> for TypeView {
    fn from(ty: &Type) -> Self {
        Self {
            is_scalar: flag(ty.is_scalar()),
            value: ty.value().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub name: String,
    pub is_optional: &'static str,
    pub value: TypeView,
}

impl From<&Field> for FieldView {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            is_optional: flag(field.is_optional()),
            value: TypeView::from(&field.ty),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub name: String,
    pub definitions: Vec<FieldView>,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        let definitions = message
            .definitions
            .iter()
            .map(|definition| match definition {
                MessageDefinition::Field(field) => FieldView::from(field),
            })
            .collect();
        Self {
            name: message.name.clone(),
            definitions,
        }
    }
}

/// Direction flags are internal and not part of this view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceView {
    pub name: String,
    pub response: Option<TypeView>,
    pub request: Vec<TypeView>,
}

impl From<&Service> for ServiceView {
    fn from(service: &Service) -> Self {
        Self {
            name: service.name.clone(),
            response: service.response.as_ref().map(TypeView::from),
            request: service.request.iter().map(TypeView::from).collect(),
        }
    }
}

/// Device listing entry, linking to its schema resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub id: Uuid,
    pub address: String,
    pub name: String,
    pub services: String,
    pub messages: String,
}

impl DeviceSummary {
    /// `url_path` is the public prefix the device routes are mounted under.
    pub fn new(device: &Device, url_path: &str) -> Self {
        let base = url_path.trim_end_matches('/');
        Self {
            id: device.id,
            address: device.addr.to_string(),
            name: device.name.clone(),
            services: format!("{}/{}/services", base, device.id),
            messages: format!("{}/{}/messages", base, device.id),
        }
    }
}

pub fn services_view(device: &Device) -> Vec<ServiceView> {
    device.services.iter().map(ServiceView::from).collect()
}

pub fn messages_view(device: &Device) -> Vec<MessageView> {
    device.messages.iter().map(MessageView::from).collect()
}
