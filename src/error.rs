//! Error types for netform.
//!
//! Every failure the declaration layer can detect before a template is handed
//! to the provisioning engine is represented here: malformed address blocks,
//! duplicate construct ids, dangling references and parameter validation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for netform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for netform.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Addressing Errors
    // ========================================================================
    /// A CIDR string could not be parsed or is not a network address.
    #[error("Invalid CIDR block '{cidr}': {message}")]
    InvalidCidr {
        /// The offending input
        cidr: String,
        /// Error message
        message: String,
    },

    /// The parent block has no room left for another subnet of the requested size.
    #[error("CIDR block '{block}' cannot fit another /{mask} subnet")]
    CidrExhausted {
        /// Parent block
        block: String,
        /// Requested prefix length
        mask: u8,
    },

    // ========================================================================
    // Declaration Errors
    // ========================================================================
    /// A construct id was declared twice in the same stack.
    #[error("Construct '{id}' is already declared in stack '{stack}'")]
    DuplicateConstruct {
        /// Stack id
        stack: String,
        /// Construct id
        id: String,
    },

    /// A handle points at a resource that does not exist in this stack.
    #[error("Unknown {kind} reference #{index} in stack '{stack}'")]
    UnknownReference {
        /// Stack id
        stack: String,
        /// Resource kind
        kind: &'static str,
        /// Table index carried by the handle
        index: usize,
    },

    /// Resource parameters failed validation.
    #[error("Validation failed for '{resource}': {message}")]
    Validation {
        /// Construct path of the resource
        resource: String,
        /// Error message
        message: String,
    },

    /// Resource references form a cycle.
    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// Stack not found in the app.
    #[error("Stack '{0}' not found")]
    StackNotFound(String),

    // ========================================================================
    // Output Errors
    // ========================================================================
    /// Template serialization failed.
    #[error("Failed to serialize template for stack '{stack}': {message}")]
    Serialization {
        /// Stack id
        stack: String,
        /// Error message
        message: String,
    },

    /// Filesystem error while writing the cloud assembly.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// Path being written
        path: PathBuf,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a validation error for the given construct path.
    pub fn validation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Build an invalid CIDR error.
    pub fn invalid_cidr(cidr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCidr {
            cidr: cidr.into(),
            message: message.into(),
        }
    }

    /// Whether the error was raised by declaration validation rather than output.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. }
                | Error::InvalidCidr { .. }
                | Error::CidrExhausted { .. }
                | Error::UnknownReference { .. }
                | Error::DependencyCycle(_)
        )
    }
}
