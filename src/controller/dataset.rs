//! Dataset reconciliation
//!
//! Each cycle re-reads the Dataset, marks it UNREADY when no subset has both a
//! train and a test file, and otherwise converges the plugin-rendered child onto
//! the cluster. Cycles are idempotent: running one twice leaves the cluster in
//! the same state as running it once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
#[cfg(test)]
use mockall::automock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::desired::{build_desired_state, DesiredState};
use super::store::{apply_document, DocumentRef, DocumentStore, KubeDocumentStore};
use crate::config::Config;
use crate::crd::{DataPlugin, Dataset, DatasetState, DatasetStatus};
use crate::template::{FileTemplateSource, TemplateEngine, TemplateSource};
use crate::{Error, DEFAULT_SYSTEM_NAMESPACE, FIELD_MANAGER, REQUEUE_ERROR_SECS};

/// Trait abstracting the typed Kubernetes reads and writes of the controller
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production. Missing objects are reported as
/// [`Error::NotFound`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Read a Dataset
    async fn get_dataset(&self, namespace: &str, name: &str) -> Result<Dataset, Error>;

    /// Read a DataPlugin
    async fn get_data_plugin(&self, namespace: &str, name: &str) -> Result<DataPlugin, Error>;

    /// Merge-patch the status subresource of a Dataset
    async fn patch_dataset_status(
        &self,
        namespace: &str,
        name: &str,
        status: &DatasetStatus,
    ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn get_dataset(&self, namespace: &str, name: &str) -> Result<Dataset, Error> {
        let api: Api<Dataset> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| Error::from_kube("get Dataset", "Dataset", name, e))
    }

    async fn get_data_plugin(&self, namespace: &str, name: &str) -> Result<DataPlugin, Error> {
        let api: Api<DataPlugin> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| Error::from_kube("get DataPlugin", "DataPlugin", name, e))
    }

    async fn patch_dataset_status(
        &self,
        namespace: &str,
        name: &str,
        status: &DatasetStatus,
    ) -> Result<(), Error> {
        let api: Api<Dataset> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });

        api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube("patch Dataset status", "Dataset", name, e))?;
        Ok(())
    }
}

/// Controller context shared by all reconciles
pub struct Context {
    /// Typed Kubernetes client (trait object for testability)
    pub kube: Arc<dyn KubeClient>,
    /// Store the rendered children are applied to
    pub store: Arc<dyn DocumentStore>,
    /// Source of plugin manifest templates
    pub templates: Arc<dyn TemplateSource>,
    /// Placeholder renderer
    pub engine: TemplateEngine,
    /// Namespace holding DataPlugin resources
    pub system_namespace: String,
    /// Value injected as `completeNotifyUrl` (empty when unset)
    pub complete_notify_url: String,
    /// Cancelled on shutdown; in-flight API calls are abandoned
    pub cancel: CancellationToken,
}

impl Context {
    /// Create a builder from explicit collaborators
    pub fn builder(
        kube: Arc<dyn KubeClient>,
        store: Arc<dyn DocumentStore>,
        templates: Arc<dyn TemplateSource>,
    ) -> ContextBuilder {
        ContextBuilder::new(kube, store, templates)
    }

    /// Create a builder wired to a live cluster and configured from `config`
    pub fn for_cluster(client: Client, config: &Config) -> ContextBuilder {
        Self::builder(
            Arc::new(KubeClientImpl::new(client.clone())),
            Arc::new(KubeDocumentStore::new(client)),
            Arc::new(FileTemplateSource::new(&config.plugin_root)),
        )
        .system_namespace(&config.system_namespace)
        .complete_notify_url(config.notify_url())
    }

    /// Run an API call unless shutdown has been requested.
    ///
    /// Cancellation wins a race with a ready result, so nothing new is written
    /// once the token fires.
    pub async fn cancellable<T, F>(&self, operation: &str, call: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::cancelled(operation)),
            result = call => result,
        }
    }

    /// Create a context for testing with mock collaborators
    ///
    /// Uses the default system namespace and `http://n/` as notify URL.
    #[cfg(test)]
    pub fn for_testing(
        kube: Arc<dyn KubeClient>,
        store: Arc<dyn DocumentStore>,
        templates: Arc<dyn TemplateSource>,
    ) -> Self {
        Self::builder(kube, store, templates)
            .complete_notify_url("http://n/")
            .build()
    }
}

/// Builder for constructing [`Context`] instances
///
/// ```ignore
/// let ctx = Context::for_cluster(client, &config)
///     .cancellation(shutdown.clone())
///     .build();
/// ```
pub struct ContextBuilder {
    kube: Arc<dyn KubeClient>,
    store: Arc<dyn DocumentStore>,
    templates: Arc<dyn TemplateSource>,
    system_namespace: String,
    complete_notify_url: String,
    cancel: CancellationToken,
}

impl ContextBuilder {
    fn new(
        kube: Arc<dyn KubeClient>,
        store: Arc<dyn DocumentStore>,
        templates: Arc<dyn TemplateSource>,
    ) -> Self {
        Self {
            kube,
            store,
            templates,
            system_namespace: DEFAULT_SYSTEM_NAMESPACE.to_string(),
            complete_notify_url: String::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the namespace DataPlugins are read from
    pub fn system_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.system_namespace = namespace.into();
        self
    }

    /// Set the URL injected as `completeNotifyUrl`
    pub fn complete_notify_url(mut self, url: impl Into<String>) -> Self {
        self.complete_notify_url = url.into();
        self
    }

    /// Use the given shutdown token
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        Context {
            kube: self.kube,
            store: self.store,
            templates: self.templates,
            engine: TemplateEngine::new(),
            system_namespace: self.system_namespace,
            complete_notify_url: self.complete_notify_url,
            cancel: self.cancel,
        }
    }
}

/// Reconcile a Dataset
///
/// The event only names the Dataset; its content is re-read so the cycle acts
/// on the latest spec. A Dataset deleted in the meantime ends the cycle.
///
/// Fatal errors (bad parameters, unreadable template, store failures) are
/// returned to the runtime, which hands them to [`error_policy`].
#[instrument(skip(dataset, ctx), fields(dataset = %dataset.name_any(), namespace = ?dataset.namespace()))]
pub async fn reconcile(dataset: Arc<Dataset>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = dataset.name_any();
    let namespace = dataset
        .namespace()
        .ok_or_else(|| Error::validation(&name, "Dataset has no namespace"))?;
    debug!("reconciling dataset");

    let dataset = match ctx
        .cancellable("get Dataset", ctx.kube.get_dataset(&namespace, &name))
        .await
    {
        Ok(dataset) => dataset,
        Err(e) if e.is_not_found() => {
            debug!("dataset no longer exists");
            return Ok(Action::await_change());
        }
        Err(e) => return Err(e),
    };

    match build_desired_state(&dataset, &ctx).await? {
        DesiredState::Unready => mark_unready(&dataset, &namespace, &ctx).await?,
        DesiredState::PluginDisabled => debug!("plugin loading not requested"),
        DesiredState::PluginMissing { name: plugin } => {
            debug!(%plugin, "nothing to apply without a DataPlugin")
        }
        DesiredState::Apply(doc) => {
            let id = DocumentRef::of(&doc)?;
            let outcome = ctx
                .cancellable(
                    &format!("apply {}", id.kind),
                    apply_document(ctx.store.as_ref(), *doc),
                )
                .await?;
            info!(kind = %id.kind, name = %id.name, ?outcome, "plugin resource applied");
        }
    }

    Ok(Action::await_change())
}

/// Record UNREADY on the Dataset unless it already says so
async fn mark_unready(dataset: &Dataset, namespace: &str, ctx: &Context) -> Result<(), Error> {
    if dataset.state() == Some(DatasetState::Unready) {
        debug!("dataset already UNREADY, skipping status update");
        return Ok(());
    }

    info!("no subset has both train and test files, marking UNREADY");
    let status = DatasetStatus::with_state(DatasetState::Unready);
    ctx.cancellable(
        "patch Dataset status",
        ctx.kube
            .patch_dataset_status(namespace, &dataset.name_any(), &status),
    )
    .await
}

/// Error policy for the Dataset controller
///
/// Logs the failure with the Dataset's identity and retries after
/// [`REQUEUE_ERROR_SECS`].
pub fn error_policy(dataset: Arc<Dataset>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        %error,
        dataset = %dataset.name_any(),
        namespace = ?dataset.namespace(),
        "reconciliation failed"
    );
    Action::requeue(Duration::from_secs(REQUEUE_ERROR_SECS))
}
