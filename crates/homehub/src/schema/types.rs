// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema building blocks: scalar set, value types, fields, messages, services.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scalar value types a field, request or response can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl Scalar {
    /// Every scalar, in canonical order.
    pub const ALL: [Scalar; 15] = [
        Scalar::Double,
        Scalar::Float,
        Scalar::Int32,
        Scalar::Int64,
        Scalar::Uint32,
        Scalar::Uint64,
        Scalar::Sint32,
        Scalar::Sint64,
        Scalar::Fixed32,
        Scalar::Fixed64,
        Scalar::Sfixed32,
        Scalar::Sfixed64,
        Scalar::Bool,
        Scalar::String,
        Scalar::Bytes,
    ];

    /// Canonical keyword, as written in schemas and stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scalar::Double => "double",
            Scalar::Float => "float",
            Scalar::Int32 => "int32",
            Scalar::Int64 => "int64",
            Scalar::Uint32 => "uint32",
            Scalar::Uint64 => "uint64",
            Scalar::Sint32 => "sint32",
            Scalar::Sint64 => "sint64",
            Scalar::Fixed32 => "fixed32",
            Scalar::Fixed64 => "fixed64",
            Scalar::Sfixed32 => "sfixed32",
            Scalar::Sfixed64 => "sfixed64",
            Scalar::Bool => "bool",
            Scalar::String => "string",
            Scalar::Bytes => "bytes",
        }
    }

    /// Look up a keyword. Case-sensitive.
    pub fn from_keyword(word: &str) -> Option<Scalar> {
        Scalar::ALL.iter().copied().find(|s| s.as_str() == word)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by `Scalar::from_str` for names outside the scalar set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scalar '{0}'")]
pub struct UnknownScalar(pub String);

impl FromStr for Scalar {
    type Err = UnknownScalar;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scalar::from_keyword(s).ok_or_else(|| UnknownScalar(s.to_string()))
    }
}

/// Value type: a scalar or a reference to a message by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Scalar(Scalar),
    Reference(String),
}

impl Type {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }

    /// Scalar keyword or referenced message name.
    pub fn value(&self) -> &str {
        match self {
            Type::Scalar(s) => s.as_str(),
            Type::Reference(name) => name,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// A named, typed member of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub required: bool,
    pub optional: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            optional: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Optionality shown to API clients. `required` wins when both flags are set.
    // NOTE: both flags are stored as-is; only this view folds them.
    pub fn is_optional(&self) -> bool {
        self.optional && !self.required
    }
}

/// One entry in a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageDefinition {
    Field(Field),
}

impl MessageDefinition {
    pub fn name(&self) -> &str {
        match self {
            MessageDefinition::Field(f) => &f.name,
        }
    }
}

impl From<Field> for MessageDefinition {
    fn from(field: Field) -> Self {
        MessageDefinition::Field(field)
    }
}

/// A named message shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub name: String,
    pub definitions: Vec<MessageDefinition>,
}

impl Message {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definitions: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.definitions.push(MessageDefinition::Field(field));
        self
    }

    /// Iterate over the field definitions in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.definitions.iter().map(|d| match d {
            MessageDefinition::Field(f) => f,
        })
    }
}

/// An RPC a device exposes (inbound) or calls on the hub (outbound).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub request: Vec<Type>,
    /// `None` means the service returns nothing.
    pub response: Option<Type>,
    /// The hub may call the device.
    pub inbound: bool,
    /// The device may call the hub.
    pub outbound: bool,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            request: Vec::new(),
            response: None,
            inbound: false,
            outbound: false,
        }
    }

    pub fn with_request(mut self, ty: Type) -> Self {
        self.request.push(ty);
        self
    }

    pub fn with_response(mut self, ty: Type) -> Self {
        self.response = Some(ty);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_keywords_round_trip() {
        for scalar in Scalar::ALL {
            assert_eq!(scalar.as_str().parse::<Scalar>(), Ok(scalar));
        }
    }

    #[test]
    fn test_scalar_lookup_is_case_sensitive() {
        assert!(Scalar::from_keyword("Int32").is_none());
        assert_eq!("int34".parse::<Scalar>(), Err(UnknownScalar("int34".into())));
        assert_eq!(UnknownScalar("int34".into()).to_string(), "unknown scalar 'int34'");
    }

    #[test]
    fn test_is_optional_required_wins() {
        let ty = Type::Scalar(Scalar::Bool);
        assert!(!Field::new("a", ty.clone()).is_optional());
        assert!(Field::new("b", ty.clone()).optional().is_optional());
        assert!(!Field::new("c", ty.clone()).required().is_optional());
        assert!(!Field::new("d", ty).optional().required().is_optional());
    }

    #[test]
    fn test_type_value() {
        assert_eq!(Type::Scalar(Scalar::Sfixed64).value(), "sfixed64");
        assert_eq!(Type::Reference("Color".into()).value(), "Color");
        assert!(!Type::Reference("Color".into()).is_scalar());
    }
}
