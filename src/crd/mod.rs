//! Custom Resource Definitions watched and read by the Dataset controller

mod data_plugin;
mod dataset;

pub use data_plugin::{DataPlugin, DataPluginSpec};
pub use dataset::{
    Dataset, DatasetInfo, DatasetMetadata, DatasetSpec, DatasetState, DatasetStatus, Plugin,
    SplitFile, Splits, Subset,
};
