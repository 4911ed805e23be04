//! Error handling module for FlowStack
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the installer should use these types for consistency.

#![allow(dead_code)] // Error variants and helpers are available for future use

use thiserror::Error;

/// Main error type for the FlowStack installer
#[derive(Error, Debug)]
pub enum InstallError {
    /// IO errors (file operations, permissions, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Preflight errors (privilege level, missing binaries)
    #[error("Preflight error: {0}")]
    Preflight(String),

    /// Configuration errors (settings, rendering, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (ports, addresses)
    #[error("Validation error: {0}")]
    Validation(String),

    /// System errors (external commands, processes)
    #[error("System error: {0}")]
    System(String),

    /// Stack launch errors (services not reaching a running state)
    #[error("Launch error: {0}")]
    Launch(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallError>;

// Convenient error constructors
impl InstallError {
    /// Create a preflight error
    pub fn preflight(msg: impl Into<String>) -> Self {
        Self::Preflight(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a system error
    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    /// Create a launch error
    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}

/// Helper function to create general errors (for backward compatibility)
pub fn general_error(msg: impl Into<String>) -> InstallError {
    InstallError::General(msg.into())
}
