//! Error types for the Dataset controller
//!
//! Errors are structured with fields to aid debugging in production.
//! Benign outcomes (a resource that vanished, a missing plugin descriptor) are
//! modelled as [`Error::NotFound`] so callers can match on them explicitly.

use thiserror::Error;

/// Main error type for Dataset controller operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A resource that was looked up does not exist
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Resource kind (Dataset, DataPlugin, or the rendered child kind)
        kind: String,
        /// Resource name
        name: String,
    },

    /// The Dataset is missing data needed to derive child resources
    #[error("validation error for {dataset}: {message}")]
    Validation {
        /// Name of the Dataset
        dataset: String,
        /// Description of what's invalid
        message: String,
    },

    /// The rendered child is already controlled by another owner
    #[error("{kind} '{name}' is already controlled by {owner}")]
    AlreadyOwned {
        /// Kind of the rendered child
        kind: String,
        /// Name of the rendered child
        name: String,
        /// Name of the existing controller
        owner: String,
    },

    /// The plugin parameter blob is not a JSON object
    #[error("invalid plugin parameters for {dataset}: {message}")]
    ParameterDecode {
        /// Name of the Dataset
        dataset: String,
        /// Decoder message
        message: String,
    },

    /// The plugin manifest template could not be read
    #[error("failed to read plugin template {path}: {message}")]
    TemplateRead {
        /// Template path
        path: String,
        /// Underlying I/O message
        message: String,
    },

    /// A placeholder could not be resolved or the template is malformed
    #[error("template resolution error: {message}")]
    TemplateResolution {
        /// Renderer message
        message: String,
    },

    /// The rendered manifest is not a decodable document
    #[error("manifest decode error: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },

    /// Cluster state store failure other than not-found
    #[error("store error during {operation}: {message}")]
    Store {
        /// Operation that failed (e.g., "get Dataset", "update Deployment")
        operation: String,
        /// Description of what failed
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// A call was aborted by the shutdown signal
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was aborted
        operation: String,
    },
}

impl Error {
    /// Create a not-found error for the given kind and name
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a validation error for a Dataset
    pub fn validation(dataset: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            dataset: dataset.into(),
            message: msg.into(),
        }
    }

    /// Create a parameter decode error for a Dataset
    pub fn parameter_decode(dataset: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ParameterDecode {
            dataset: dataset.into(),
            message: msg.into(),
        }
    }

    /// Create a template read error
    pub fn template_read(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::TemplateRead {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a template resolution error
    pub fn template_resolution(msg: impl Into<String>) -> Self {
        Self::TemplateResolution {
            message: msg.into(),
        }
    }

    /// Create a manifest decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a store error for the named operation
    pub fn store(operation: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::Store {
            operation: operation.into(),
            message: msg.to_string(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a cancellation error for the named operation
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Map a kube API error, turning HTTP 404 into [`Error::NotFound`]
    pub fn from_kube(
        operation: impl Into<String>,
        kind: &str,
        name: &str,
        err: kube::Error,
    ) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Self::not_found(kind, name),
            other => Self::store(operation, other),
        }
    }

    /// Returns true if this error means the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
