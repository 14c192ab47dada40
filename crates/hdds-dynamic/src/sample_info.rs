// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-sample metadata delivered alongside dynamic data.

use std::fmt;

/// Instance handle derived from the key hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InstanceHandle(pub [u8; 16]);

impl InstanceHandle {
    /// Create a new instance handle from a key hash.
    pub const fn new(key_hash: [u8; 16]) -> Self {
        Self(key_hash)
    }

    /// Create a nil (all zeros) instance handle for keyless topics.
    pub const fn nil() -> Self {
        Self([0u8; 16])
    }

    /// Handle whose trailing 8 bytes hold `value` big-endian.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[8..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Check if this is a nil handle.
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 16]
    }

    /// Get the raw key hash bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Whether the reader has seen this instance before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    /// First sample of an instance (or first after it was disposed).
    #[default]
    New,
    NotNew,
}

/// Metadata for one received sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    pub instance_handle: InstanceHandle,
    pub view_state: ViewState,
    /// False for lifecycle-only samples (dispose/unregister) carrying no data.
    pub valid_data: bool,
}

impl SampleInfo {
    /// Metadata for a valid sample.
    pub fn new(instance_handle: InstanceHandle, view_state: ViewState) -> Self {
        Self {
            instance_handle,
            view_state,
            valid_data: true,
        }
    }

    /// Metadata for a lifecycle-only sample.
    pub fn invalid(instance_handle: InstanceHandle) -> Self {
        Self {
            instance_handle,
            view_state: ViewState::NotNew,
            valid_data: false,
        }
    }

    pub fn is_new_instance(&self) -> bool {
        self.view_state == ViewState::New
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        assert_eq!(
            InstanceHandle::nil().to_string(),
            "00000000000000000000000000000000"
        );
        assert_eq!(
            InstanceHandle::from_u64(0x2a).to_string(),
            "0000000000000000000000000000002a"
        );
        assert!(InstanceHandle::nil().is_nil());
        assert!(!InstanceHandle::from_u64(1).is_nil());
    }

    #[test]
    fn test_sample_info_states() {
        let info = SampleInfo::new(InstanceHandle::from_u64(3), ViewState::New);
        assert!(info.valid_data);
        assert!(info.is_new_instance());

        let lifecycle = SampleInfo::invalid(InstanceHandle::from_u64(3));
        assert!(!lifecycle.valid_data);
        assert!(!lifecycle.is_new_instance());
    }
}
