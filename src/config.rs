//! Process configuration
//!
//! Every setting can be given as a flag or through the environment, so the
//! controller runs unchanged from a Deployment manifest or a developer shell.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::DEFAULT_SYSTEM_NAMESPACE;

/// Dataset controller - materializes Datasets through their DataPlugins
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "dataset-controller", version, about, long_about = None)]
pub struct Config {
    /// Print the Dataset and DataPlugin CRDs as YAML and exit
    #[arg(long)]
    pub crd: bool,

    /// URL plugins call back when a dataset has been processed
    ///
    /// Injected into every template as `completeNotifyUrl`.
    #[arg(long, env = "COMPLETE_NOTIFY_URL")]
    pub complete_notify_url: Option<String>,

    /// Namespace holding DataPlugin resources
    #[arg(long, env = "DATATUNERX_SYSTEM_NAMESPACE", default_value = DEFAULT_SYSTEM_NAMESPACE)]
    pub system_namespace: String,

    /// Directory containing the `plugins/` template tree
    #[arg(long, env = "PLUGIN_ROOT", default_value = ".")]
    pub plugin_root: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "debug")]
    pub log_level: String,
}

impl Config {
    /// Notify URL as injected into templates; unset becomes the empty string
    pub fn notify_url(&self) -> &str {
        self.complete_notify_url.as_deref().unwrap_or_default()
    }

    /// Build the log filter: `RUST_LOG` wins, then `LOG_LEVEL`, then `info`
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
