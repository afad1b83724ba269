//! Dataset controller - materializes Datasets through their DataPlugins

use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::{reflector, watcher, Controller, WatchStreamExt};
use kube::{Api, Client, CustomResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*};

use dataset_controller::config::Config;
use dataset_controller::controller::{error_policy, plugin_fingerprint, reconcile, Context};
use dataset_controller::crd::{DataPlugin, Dataset};
use dataset_controller::WATCH_TIMEOUT_SECS;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(config.env_filter())
        .init();

    if config.crd {
        let dataset = serde_yaml::to_string(&Dataset::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize Dataset CRD: {}", e))?;
        let plugin = serde_yaml::to_string(&DataPlugin::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize DataPlugin CRD: {}", e))?;
        println!("{dataset}---\n{plugin}");
        return Ok(());
    }

    run_controller(config).await
}

/// Watch Datasets and reconcile plugin changes until a shutdown signal arrives
async fn run_controller(config: Config) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(
        Context::for_cluster(client.clone(), &config)
            .cancellation(shutdown.clone())
            .build(),
    );

    info!(
        system_namespace = %config.system_namespace,
        plugin_root = %config.plugin_root.display(),
        notify_url_set = config.complete_notify_url.is_some(),
        "starting Dataset controller"
    );

    let datasets: Api<Dataset> = Api::all(client);
    let (reader, writer) = reflector::store();
    let events = watcher(
        datasets,
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    )
    .default_backoff()
    .reflect(writer)
    .applied_objects()
    .predicate_filter(plugin_fingerprint);

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested, cancelling in-flight reconciles");
        shutdown.cancel();
    });

    Controller::for_stream(events, reader)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            match result {
                Ok((dataset, action)) => {
                    tracing::debug!(dataset = %dataset.name, ?action, "reconciliation completed")
                }
                Err(e) => tracing::error!(error = ?e, "reconciliation error"),
            }
            std::future::ready(())
        })
        .await;

    info!("Dataset controller stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}
