// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema payload codecs.
//!
//! Devices name the algorithm used to pack their schema text. Only `none` is
//! implemented; an unrecognized name decodes to an empty payload, which the
//! schema parser then rejects.

/// Known payload codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadCodec {
    /// Payload is the schema text as-is.
    None,
}

impl PayloadCodec {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(PayloadCodec::None),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PayloadCodec::None => "none",
        }
    }

    pub fn decode(&self, payload: &[u8]) -> Vec<u8> {
        match self {
            PayloadCodec::None => payload.to_vec(),
        }
    }
}

/// Decode `payload` with the codec called `algo`.
pub fn decode_payload(algo: &str, payload: &[u8]) -> Vec<u8> {
    match PayloadCodec::from_name(algo) {
        Some(codec) => codec.decode(payload),
        None => {
            tracing::debug!("Unsupported schema codec '{}', using empty payload", algo);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_codec_is_identity() {
        assert_eq!(decode_payload("none", b"service S();"), b"service S();");
        assert_eq!(PayloadCodec::None.name(), "none");
    }

    #[test]
    fn test_unknown_codec_yields_empty_payload() {
        assert!(decode_payload("gzip", b"service S();").is_empty());
        assert!(decode_payload("NONE", b"service S();").is_empty());
    }
}
