//! DataPlugin Custom Resource Definition
//!
//! A DataPlugin names the manifest template used to materialize a Dataset.
//! The controller only reads it; the template lives at
//! `plugins/<datasetClass>/<provider>/plugin.yaml`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a DataPlugin
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "extension.datatunerx.io",
    version = "v1beta1",
    kind = "DataPlugin",
    plural = "dataplugins",
    namespaced,
    printcolumn = r#"{"name":"Class","type":"string","jsonPath":".spec.datasetClass"}"#,
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DataPluginSpec {
    /// Dataset classification (e.g., "text", "image")
    pub dataset_class: String,

    /// Plugin provider identifier
    pub provider: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default parameters documented by the plugin author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
}
