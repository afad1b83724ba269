//! Dataset controller - reconciles `Dataset` resources into plugin-rendered children
//!
//! The controller watches `Dataset` custom resources and, when a Dataset asks for
//! a plugin to be loaded, renders the plugin's manifest template with the
//! Dataset's parameters and converges the resulting child resource onto the
//! cluster. Children carry a controller owner reference to their Dataset, so the
//! API server garbage-collects them when the Dataset goes away.
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (Dataset, DataPlugin)
//! - [`controller`] - Reconciliation logic, desired-state builder, apply engine
//! - [`template`] - Manifest template lookup and placeholder rendering
//! - [`manifest`] - Decoding rendered manifests into generic documents
//! - [`kube_utils`] - API resource resolution for arbitrary kinds
//! - [`config`] - Process configuration from flags and environment
//! - [`error`] - Error types for the controller

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod manifest;
pub mod template;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Field manager recorded on status patches
pub const FIELD_MANAGER: &str = "dataset-controller";

/// Namespace where DataPlugin descriptors live unless overridden
pub const DEFAULT_SYSTEM_NAMESPACE: &str = "datatunerx-dev";

/// Parameter key carrying the completion notification URL into templates
pub const NOTIFY_URL_PARAM: &str = "completeNotifyUrl";

/// Directory (below the plugin root) holding plugin templates
pub const PLUGIN_DIR: &str = "plugins";

/// File name of a plugin's manifest template
pub const PLUGIN_TEMPLATE_FILE: &str = "plugin.yaml";

/// Requeue interval after a failed reconcile
pub const REQUEUE_ERROR_SECS: u64 = 60;

/// Server-side timeout for watch requests
pub const WATCH_TIMEOUT_SECS: u32 = 25;
