//! Kubernetes API resource helpers
//!
//! Rendered plugin manifests can be of any kind, so the controller works with
//! `DynamicObject`s and resolves their `ApiResource` at apply time.

use kube::api::ApiResource;
use kube::core::GroupVersionKind;
use kube::error::DiscoveryError;
use kube::Client;
use tracing::debug;

use crate::Error;

/// Kinds whose plural is not derivable from the simple rules below
const KIND_PLURALS: &[(&str, &str)] = &[
    ("endpoints", "endpoints"),
    ("ingress", "ingresses"),
    ("networkpolicy", "networkpolicies"),
    ("podsecuritypolicy", "podsecuritypolicies"),
    ("priorityclass", "priorityclasses"),
    ("runtimeclass", "runtimeclasses"),
    ("storageclass", "storageclasses"),
    ("ingressclass", "ingressclasses"),
    ("dataplugin", "dataplugins"),
    ("dataset", "datasets"),
];

/// Split an apiVersion into `(group, version)`; the core group is `""`
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Pluralize a Kubernetes resource kind
///
/// Uses a lookup table for irregular kinds, falling back to simple English
/// pluralization rules.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    if let Some((_, plural)) = KIND_PLURALS.iter().find(|(singular, _)| *singular == lower) {
        return (*plural).to_string();
    }

    if lower.ends_with('s') || lower.ends_with('x') || lower.ends_with("ch") || lower.ends_with("sh")
    {
        format!("{lower}es")
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{lower}s")
    }
}

/// Build an ApiResource from a known apiVersion and kind without discovery
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Resolve the ApiResource for an apiVersion and kind.
///
/// Asks the API server first so irregular plurals of installed CRDs are
/// honoured. Falls back to [`build_api_resource`] only when the server does not
/// know the group or kind; any other discovery failure is returned.
pub async fn resolve_api_resource(
    client: &Client,
    api_version: &str,
    kind: &str,
) -> Result<ApiResource, Error> {
    let (group, version) = parse_api_version(api_version);
    let gvk = GroupVersionKind::gvk(&group, &version, kind);

    match kube::discovery::pinned_kind(client, &gvk).await {
        Ok((ar, _caps)) => Ok(ar),
        Err(e) if unknown_to_server(&e) => {
            debug!(api_version, kind, error = %e, "kind not served, using derived plural");
            Ok(build_api_resource(api_version, kind))
        }
        Err(e) => Err(Error::store(format!("discover {kind}"), e)),
    }
}

/// True if discovery failed because the group, version or kind is not served
fn unknown_to_server(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(ae) => ae.code == 404,
        kube::Error::Discovery(
            DiscoveryError::MissingKind(_) | DiscoveryError::MissingApiGroup(_),
        ) => true,
        _ => false,
    }
}
