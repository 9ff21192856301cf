// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device schema model
//!
//! A schema is the ordered list of `message` and `service` declarations a
//! device uploads when it registers.

pub mod parser;
pub mod types;

pub use types::{Field, Message, MessageDefinition, Scalar, Service, Type, UnknownScalar};

use crate::error::ParseError;

/// A single top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Message(Message),
    Service(Service),
}

/// Parsed device schema, declarations in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    pub declarations: Vec<Declaration>,
}

impl Schema {
    /// Parse a raw definition payload.
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        parser::parse(input)
    }

    /// Split into services and messages, each keeping declaration order.
    pub fn into_parts(self) -> (Vec<Service>, Vec<Message>) {
        let mut services = Vec::new();
        let mut messages = Vec::new();
        for declaration in self.declarations {
            match declaration {
                Declaration::Service(s) => services.push(s),
                Declaration::Message(m) => messages.push(m),
            }
        }
        (services, messages)
    }
}
