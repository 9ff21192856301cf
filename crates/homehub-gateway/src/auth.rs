// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hub-code check for device registration.

/// Decides whether a presented hub code admits a device.
pub trait HubCodeValidator: Send + Sync {
    fn accepts(&self, presented: &str) -> bool;
}

/// A single shared hub code from configuration.
#[derive(Clone)]
pub struct StaticHubCode {
    code: String,
}

impl StaticHubCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl std::fmt::Debug for StaticHubCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticHubCode").finish_non_exhaustive()
    }
}

impl HubCodeValidator for StaticHubCode {
    fn accepts(&self, presented: &str) -> bool {
        let (a, b) = (self.code.as_bytes(), presented.as_bytes());
        if a.is_empty() || a.len() != b.len() {
            return false;
        }
        // constant time over the code length
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_exact_code() {
        let check = StaticHubCode::new("s3cret");
        assert!(check.accepts("s3cret"));
    }

    #[test]
    fn test_rejects_other_codes() {
        let check = StaticHubCode::new("s3cret");
        assert!(!check.accepts("s3cre"));
        assert!(!check.accepts("s3cret!"));
        assert!(!check.accepts("S3CRET"));
        assert!(!check.accepts(""));
    }

    #[test]
    fn test_empty_code_admits_nobody() {
        assert!(!StaticHubCode::new("").accepts(""));
    }

    #[test]
    fn test_debug_hides_code() {
        let shown = format!("{:?}", StaticHubCode::new("s3cret"));
        assert!(!shown.contains("s3cret"));
    }
}
