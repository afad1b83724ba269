//! Controller for Dataset resources
//!
//! Follows the Kubernetes controller pattern with an observe-diff-act loop:
//! [`reconcile`] derives the desired child from the Dataset and its DataPlugin,
//! and [`apply_document`] converges the cluster onto it.

mod dataset;
mod desired;
mod filter;
mod store;

pub use dataset::{error_policy, reconcile, Context, ContextBuilder, KubeClient, KubeClientImpl};
pub use desired::{
    build_desired_state, decode_parameters, has_ready_subset, merge_parameters, stamp_ownership,
    DesiredState,
};
pub use filter::{plugin_changed, plugin_fingerprint};
pub use store::{apply_document, ApplyOutcome, DocumentRef, DocumentStore, KubeDocumentStore};

#[cfg(test)]
pub use dataset::MockKubeClient;
#[cfg(test)]
pub use store::MockDocumentStore;
