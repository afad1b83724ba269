//! Create-or-update of rendered documents
//!
//! Rendered children are schema-agnostic `DynamicObject`s. The apply engine only
//! needs their identity, so any kind the API server knows can be converged.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, PostParams};
use kube::{Client, ResourceExt};
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::kube_utils::resolve_api_resource;
use crate::manifest::type_of;
use crate::Error;

/// Identity of a document in the cluster state store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRef {
    /// apiVersion, e.g. `batch/v1`
    pub api_version: String,
    /// Kind, e.g. `Job`
    pub kind: String,
    /// Namespace of the document
    pub namespace: String,
    /// Name of the document
    pub name: String,
}

impl DocumentRef {
    /// Identity of a decoded, namespaced document
    pub fn of(doc: &DynamicObject) -> Result<Self, Error> {
        let (api_version, kind) = type_of(doc)?;
        let namespace = doc
            .namespace()
            .ok_or_else(|| Error::decode(format!("{kind} has no namespace")))?;
        Ok(Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            namespace,
            name: doc.name_any(),
        })
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Cluster state store for generic documents
///
/// `get` returns [`Error::NotFound`] for a missing document. `update` requires
/// the document to carry the stored `metadata.resourceVersion`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the stored document with the given identity
    async fn get(&self, id: &DocumentRef) -> Result<DynamicObject, Error>;

    /// Create a new document
    async fn create(&self, doc: &DynamicObject) -> Result<DynamicObject, Error>;

    /// Replace an existing document
    async fn update(&self, doc: &DynamicObject) -> Result<DynamicObject, Error>;
}

/// [`DocumentStore`] backed by the Kubernetes API
///
/// Discovered `ApiResource`s are remembered per apiVersion and kind, so an
/// apply resolves a kind at most once.
pub struct KubeDocumentStore {
    client: Client,
    resources: Mutex<HashMap<(String, String), ApiResource>>,
}

impl KubeDocumentStore {
    /// Create a store wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resources: Mutex::new(HashMap::new()),
        }
    }

    async fn api(&self, id: &DocumentRef) -> Result<Api<DynamicObject>, Error> {
        let key = (id.api_version.clone(), id.kind.clone());
        let cached = self
            .resources
            .lock()
            .map_err(|_| Error::store(format!("discover {}", id.kind), "resource cache poisoned"))?
            .get(&key)
            .cloned();

        let ar = match cached {
            Some(ar) => ar,
            None => {
                let ar = resolve_api_resource(&self.client, &id.api_version, &id.kind).await?;
                if let Ok(mut resources) = self.resources.lock() {
                    resources.insert(key, ar.clone());
                }
                ar
            }
        };
        Ok(Api::namespaced_with(self.client.clone(), &id.namespace, &ar))
    }
}

#[async_trait]
impl DocumentStore for KubeDocumentStore {
    async fn get(&self, id: &DocumentRef) -> Result<DynamicObject, Error> {
        self.api(id)
            .await?
            .get(&id.name)
            .await
            .map_err(|e| Error::from_kube(format!("get {}", id.kind), &id.kind, &id.name, e))
    }

    async fn create(&self, doc: &DynamicObject) -> Result<DynamicObject, Error> {
        let id = DocumentRef::of(doc)?;
        self.api(&id)
            .await?
            .create(&PostParams::default(), doc)
            .await
            .map_err(|e| Error::from_kube(format!("create {}", id.kind), &id.kind, &id.name, e))
    }

    async fn update(&self, doc: &DynamicObject) -> Result<DynamicObject, Error> {
        let id = DocumentRef::of(doc)?;
        self.api(&id)
            .await?
            .replace(&id.name, &PostParams::default(), doc)
            .await
            .map_err(|e| Error::from_kube(format!("update {}", id.kind), &id.kind, &id.name, e))
    }
}

/// What [`apply_document`] did to converge the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The document did not exist and was created
    Created,
    /// The document existed and was replaced
    Updated,
}

/// Converge the store onto `doc`: create it if absent, otherwise replace it
/// carrying the stored version token.
///
/// A stale token surfaces as the store's conflict error; nothing is retried.
pub async fn apply_document(
    store: &dyn DocumentStore,
    mut doc: DynamicObject,
) -> Result<ApplyOutcome, Error> {
    let id = DocumentRef::of(&doc)?;

    match store.get(&id).await {
        Ok(existing) => {
            doc.metadata.resource_version = existing.metadata.resource_version;
            debug!(document = %id, resource_version = ?doc.metadata.resource_version, "updating document");
            store.update(&doc).await?;
            Ok(ApplyOutcome::Updated)
        }
        Err(e) if e.is_not_found() => {
            debug!(document = %id, "creating document");
            store.create(&doc).await?;
            Ok(ApplyOutcome::Created)
        }
        Err(e) => Err(e),
    }
}
