//! Locating and reading plugin manifest templates

use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{Error, PLUGIN_DIR, PLUGIN_TEMPLATE_FILE};

/// Relative path of the template for a plugin class and provider
///
/// `plugins/<dataset_class>/<provider>/plugin.yaml`
pub fn plugin_template_path(dataset_class: &str, provider: &str) -> PathBuf {
    [PLUGIN_DIR, dataset_class, provider, PLUGIN_TEMPLATE_FILE]
        .iter()
        .collect()
}

/// Source of manifest template text
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Read the template at the given relative path
    async fn read(&self, path: &Path) -> Result<String, Error>;
}

/// Reads templates from a directory on the local filesystem
#[derive(Clone, Debug)]
pub struct FileTemplateSource {
    root: PathBuf,
}

impl FileTemplateSource {
    /// Read templates below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TemplateSource for FileTemplateSource {
    async fn read(&self, path: &Path) -> Result<String, Error> {
        let full = self.root.join(path);
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| Error::template_read(full.display().to_string(), e.to_string()))
    }
}
