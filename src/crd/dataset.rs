//! Dataset Custom Resource Definition
//!
//! A Dataset describes training data (subsets with train/test/validate splits)
//! and, optionally, a DataPlugin that should be loaded to materialize it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a Dataset
///
/// Example:
/// ```yaml
/// apiVersion: extension.datatunerx.io/v1beta1
/// kind: Dataset
/// metadata:
///   name: ds-2
///   namespace: team-a
/// spec:
///   datasetMetadata:
///     datasetInfo:
///       subsets:
///         - name: default
///           splits:
///             train:
///               file: train.csv
///             test:
///               file: test.csv
///     plugin:
///       loadPlugin: true
///       name: p1
///       parameters: '{"x": 1}'
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "extension.datatunerx.io",
    version = "v1beta1",
    kind = "Dataset",
    plural = "datasets",
    namespaced,
    status = "DatasetStatus",
    printcolumn = r#"{"name":"Plugin","type":"string","jsonPath":".spec.datasetMetadata.plugin.name"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSpec {
    /// Data description and plugin reference
    #[serde(default)]
    pub dataset_metadata: DatasetMetadata,
}

/// Data description and plugin reference of a Dataset
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    /// Description of the data itself
    #[serde(default)]
    pub dataset_info: DatasetInfo,

    /// Plugin that materializes the dataset
    #[serde(default)]
    pub plugin: Plugin,
}

/// Description of the data held by a Dataset
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    /// Subsets of the dataset
    #[serde(default)]
    pub subsets: Vec<Subset>,
}

/// A named slice of the dataset with its file splits
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subset {
    /// Subset name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// File splits for this subset
    #[serde(default)]
    pub splits: Splits,
}

impl Subset {
    /// A subset is usable when both its train and test files are set
    pub fn has_train_and_test(&self) -> bool {
        self.splits.train.as_ref().is_some_and(SplitFile::is_set)
            && self.splits.test.as_ref().is_some_and(SplitFile::is_set)
    }
}

/// Train/test/validate file references
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Splits {
    /// Training split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train: Option<SplitFile>,

    /// Test split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<SplitFile>,

    /// Validation split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<SplitFile>,
}

/// Reference to a single split file
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SplitFile {
    /// File path or URL
    #[serde(default)]
    pub file: String,
}

impl SplitFile {
    /// Create a split reference to the given file
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }

    fn is_set(&self) -> bool {
        !self.file.is_empty()
    }
}

/// Plugin reference of a Dataset
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    /// Whether the plugin should be loaded
    #[serde(default)]
    pub load_plugin: bool,

    /// Name of the DataPlugin resource
    #[serde(default)]
    pub name: String,

    /// JSON-encoded plugin parameters
    #[serde(default)]
    pub parameters: String,
}

/// Dataset status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatus {
    /// Readiness of the dataset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<DatasetState>,
}

impl DatasetStatus {
    /// Create a status with the given state
    pub fn with_state(state: DatasetState) -> Self {
        Self { state: Some(state) }
    }
}

/// Dataset readiness
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetState {
    /// At least one subset has train and test files
    Ready,
    /// No subset has both train and test files
    Unready,
}

impl Dataset {
    /// Plugin reference from the spec
    pub fn plugin(&self) -> &Plugin {
        &self.spec.dataset_metadata.plugin
    }

    /// Subsets from the spec
    pub fn subsets(&self) -> &[Subset] {
        &self.spec.dataset_metadata.dataset_info.subsets
    }

    /// Current readiness state, if any
    pub fn state(&self) -> Option<DatasetState> {
        self.status.as_ref().and_then(|s| s.state)
    }
}
