// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the hub core.
//!
//! Every component returns its own error enum; `HubError` is the union the
//! HTTP edge maps to status codes.

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Result alias used across the crate.
pub type HubResult<T> = Result<T, HubError>;

/// Top-level hub error.
#[derive(Debug, Error)]
pub enum HubError {
    /// Malformed request content (bad id, bad address, wrong hub code).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The uploaded schema could not be parsed.
    #[error("Schema parse error: {0}")]
    Parse(#[from] ParseError),

    /// No device with this identifier exists.
    #[error("Device not found: {0}")]
    NotFound(Uuid),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl From<rusqlite::Error> for HubError {
    fn from(err: rusqlite::Error) -> Self {
        HubError::Persistence(PersistenceError::from(err))
    }
}

// ============================================================================
// Parse errors
// ============================================================================

/// Schema parse failure with the position it was detected at (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize, column: usize) -> Self {
        Self { line, column, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A character that cannot start any token
    UnexpectedChar(char),
    /// A token that is not valid at this position
    UnexpectedToken { expected: String, found: String },
    /// Input ended inside a declaration
    UnexpectedEof { expected: String },
    /// A reserved word or scalar keyword used as a declaration name
    ReservedName(String),
    DuplicateMessage(String),
    DuplicateService(String),
    DuplicateField { message: String, field: String },
    /// A type name that is neither a scalar keyword nor a declared message
    UnknownType(String),
    /// The payload contains no declarations at all
    EmptySchema,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "unexpected character '{}'", c),
            Self::UnexpectedToken { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            Self::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input, expected {}", expected)
            }
            Self::ReservedName(name) => write!(f, "'{}' is reserved and cannot be a name", name),
            Self::DuplicateMessage(name) => write!(f, "message '{}' is declared twice", name),
            Self::DuplicateService(name) => write!(f, "service '{}' is declared twice", name),
            Self::DuplicateField { message, field } => {
                write!(f, "field '{}' is declared twice in message '{}'", field, message)
            }
            Self::UnknownType(name) => write!(
                f,
                "unknown type '{}' (not a scalar and no such message)",
                name
            ),
            Self::EmptySchema => write!(f, "schema contains no declarations"),
        }
    }
}

// ============================================================================
// Persistence errors
// ============================================================================

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Foreign-key or uniqueness violation reported by SQLite.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A stored scalar type name that is not part of the scalar set.
    #[error("Unknown scalar type name in store: '{0}'")]
    UnknownScalar(String),

    #[error("Malformed stored address: '{0}'")]
    MalformedAddress(String),

    #[error("Malformed stored device id: '{0}'")]
    MalformedId(String),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, ref msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                PersistenceError::Constraint(
                    msg.clone().unwrap_or_else(|| format!("extended code {}", e.extended_code)),
                )
            }
            other => PersistenceError::Sqlite(other),
        }
    }
}

// ============================================================================
// Dispatch errors
// ============================================================================

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The target URL is missing a scheme, host or path. No I/O was attempted.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection to device failed: {0}")]
    Connect(String),

    #[error("Device call timed out")]
    Timeout,

    #[error("Device call failed: {0}")]
    Transport(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DispatchError::Timeout
        } else if err.is_connect() {
            DispatchError::Connect(err.to_string())
        } else {
            DispatchError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_includes_position() {
        let err = ParseError::new(ParseErrorKind::DuplicateMessage("Color".into()), 3, 9);
        assert_eq!(
            err.to_string(),
            "line 3, column 9: message 'Color' is declared twice"
        );
    }

    #[test]
    fn test_parse_error_converts_into_hub_error() {
        let err: HubError = ParseError::new(ParseErrorKind::EmptySchema, 1, 1).into();
        assert!(matches!(err, HubError::Parse(_)));
    }

    #[test]
    fn test_non_constraint_sqlite_error_stays_sqlite() {
        let err = PersistenceError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, PersistenceError::Sqlite(_)));
    }
}
