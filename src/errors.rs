//! Error taxonomy for the runtime components.
//!
//! Each component reports its own enum so the screen controller can decide
//! which safe state to fall back to. Startup code (`main.rs`, `config.rs`)
//! uses `anyhow` instead; nothing here is ever fatal.

use std::fmt;

// ---

/// Failure of a reading fetch against the remote sensor service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Unreachable host, timeout, or non-2xx status.
    Network(String),
    /// Body did not decode, or carried no usable reading.
    Data(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        match self {
            FetchError::Network(msg) => write!(f, "network error: {msg}"),
            FetchError::Data(msg) => write!(f, "data error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Failure of the local key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record has been written under the configured key.
    NotInitialized,
    /// A record exists but is truncated or unparseable; `clear()` before reuse.
    Corrupted(String),
    /// The underlying key-value backend failed.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        match self {
            StoreError::NotInitialized => write!(f, "store not initialized"),
            StoreError::Corrupted(msg) => write!(f, "stored record corrupted: {msg}"),
            StoreError::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Outcome of a scanner activation that produced no apartment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    PermissionDenied,
    /// The camera stopped delivering frames before a valid code was seen.
    Cancelled,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        match self {
            ScanError::PermissionDenied => write!(f, "permission denied"),
            ScanError::Cancelled => write!(f, "scan cancelled"),
        }
    }
}

impl std::error::Error for ScanError {}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_display_messages() {
        // ---
        assert_eq!(
            FetchError::Network("timed out".into()).to_string(),
            "network error: timed out"
        );
        assert_eq!(
            StoreError::NotInitialized.to_string(),
            "store not initialized"
        );
        assert_eq!(ScanError::PermissionDenied.to_string(), "permission denied");
    }
}
