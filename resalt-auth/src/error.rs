//! Top-level error types for resalt-auth
//!
//! Permission evaluation itself never fails. These errors come from the
//! surrounding steps: parsing raw permission data, reaching the store and
//! loading configuration.

use thiserror::Error;

use crate::permission::{PermissionDataError, StoreError};

/// Top-level error type for resalt-auth operations
///
/// - [`Error::InvalidPermissionData`] - Stored `perms` JSON is malformed
/// - [`Error::Store`] - The permission store could not be read or written
/// - [`Error::Config`] - The configuration file is unusable
#[derive(Debug, Error)]
pub enum Error {
    /// Raw permission data could not be parsed into grant rules
    #[error("invalid permission data: {0}")]
    InvalidPermissionData(#[from] PermissionDataError),

    /// Permission store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error (unreadable file, bad JSON, unknown group)
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if this is a permission data error
    pub fn is_invalid_permission_data(&self) -> bool {
        matches!(self, Self::InvalidPermissionData(_))
    }

    /// Returns true if this is a store error
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type for resalt-auth operations
pub type Result<T> = std::result::Result<T, Error>;
