//! Stories about a Dataset moving through the controller
//!
//! Each story reconciles through the public entry point and checks what the
//! cluster looks like afterwards.

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;

use dataset_controller::controller::{apply_document, reconcile, ApplyOutcome, DocumentStore};
use dataset_controller::crd::{DatasetState, Plugin};
use dataset_controller::manifest::decode_manifest;
use dataset_controller::Error;

use super::cluster::*;

const JOB_TEMPLATE: &str = r#"apiVersion: batch/v1
kind: Job
metadata:
  name: loader
  labels:
    x: "{{x}}"
spec:
  template:
    spec:
      restartPolicy: Never
      containers:
        - name: loader
          image: acme/loader:1.0
          env:
            - name: NOTIFY_URL
              value: "{{completeNotifyUrl}}"
"#;

fn ds2(parameters: &str) -> dataset_controller::crd::Dataset {
    dataset("ds-2", vec![subset("a", "b")], load("p1", parameters))
}

fn acme_cluster() -> InMemoryCluster {
    let cluster = InMemoryCluster::new();
    cluster.put_plugin(SYSTEM_NAMESPACE, data_plugin("p1", "text", "acme"));
    cluster
}

// =============================================================================
// Readiness
// =============================================================================

/// Story: `ds-1` has a train file but an empty test file. It is marked UNREADY,
/// nothing is rendered, and a second pass writes nothing more.
#[tokio::test]
async fn incomplete_dataset_is_marked_unready_once() {
    let cluster = acme_cluster();
    let root = plugin_root_with("text", "acme", JOB_TEMPLATE);
    let ds1 = dataset("ds-1", vec![subset("train.csv", "")], load("p1", ""));
    cluster.put_dataset(ds1.clone());
    let ctx = context(&cluster, root.path());

    let action = reconcile(Arc::new(ds1.clone()), ctx.clone())
        .await
        .expect("first pass");
    assert_eq!(action, Action::await_change());
    assert_eq!(
        cluster.dataset("ds-1").and_then(|d| d.state()),
        Some(DatasetState::Unready)
    );
    assert_eq!(cluster.writes(), ["patch Dataset status team-a/ds-1"]);
    assert!(cluster.documents().is_empty());

    cluster.clear_calls();
    reconcile(Arc::new(ds1), ctx).await.expect("second pass");
    assert!(cluster.writes().is_empty(), "{:?}", cluster.writes());
}

// =============================================================================
// Plugin application
// =============================================================================

/// Story: `ds-2` loads plugin `p1`. The Job is created in `team-a`, rendered
/// with `x=1` and the notify URL, and owned by `ds-2`.
#[tokio::test]
async fn ready_dataset_creates_plugin_resource() {
    let cluster = acme_cluster();
    let root = plugin_root_with("text", "acme", JOB_TEMPLATE);
    cluster.put_dataset(ds2(r#"{"x":1}"#));
    let ctx = context(&cluster, root.path());

    reconcile(Arc::new(ds2(r#"{"x":1}"#)), ctx)
        .await
        .expect("reconcile");

    assert_eq!(
        cluster.calls(),
        [
            "get Dataset team-a/ds-2",
            "get DataPlugin datatunerx-dev/p1",
            "get Job team-a/loader",
            "create Job team-a/loader",
        ]
    );

    let docs = cluster.documents();
    assert_eq!(docs.len(), 1);
    let job = &docs[0];
    assert_eq!(job.namespace().as_deref(), Some(NAMESPACE));
    assert_eq!(job.labels().get("x").map(String::as_str), Some("1"));
    assert_eq!(
        job.data["spec"]["template"]["spec"]["containers"][0]["env"][0]["value"],
        NOTIFY_URL
    );
    let owner = &job.owner_references()[0];
    assert_eq!(owner.name, "ds-2");
    assert_eq!(owner.uid, "uid-ds-2");
    assert_eq!(owner.controller, Some(true));
    assert!(status_untouched(&cluster, "ds-2"));
}

fn status_untouched(cluster: &InMemoryCluster, name: &str) -> bool {
    cluster.dataset(name).and_then(|d| d.status).is_none()
}

/// Story: the user changes the plugin parameters. The next pass reads the
/// stored Job and replaces it with the new rendering; nothing is duplicated.
#[tokio::test]
async fn parameter_change_updates_existing_resource() {
    let cluster = acme_cluster();
    let root = plugin_root_with("text", "acme", JOB_TEMPLATE);
    cluster.put_dataset(ds2(r#"{"x":1}"#));
    let ctx = context(&cluster, root.path());
    reconcile(Arc::new(ds2(r#"{"x":1}"#)), ctx.clone())
        .await
        .expect("create");

    cluster.put_dataset(ds2(r#"{"x":2}"#));
    cluster.clear_calls();
    reconcile(Arc::new(ds2(r#"{"x":2}"#)), ctx)
        .await
        .expect("update");

    assert_eq!(
        cluster.writes(),
        ["update Job team-a/loader"],
        "existing resource is replaced, never re-created"
    );
    let docs = cluster.documents();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].labels().get("x").map(String::as_str), Some("2"));
    assert_eq!(docs[0].resource_version().as_deref(), Some("v2"));
}

/// Story: reconciling the same Dataset twice leaves the cluster as one pass
/// would, apart from the version token.
#[tokio::test]
async fn repeated_reconcile_converges() {
    let cluster = acme_cluster();
    let root = plugin_root_with("text", "acme", JOB_TEMPLATE);
    cluster.put_dataset(ds2(r#"{"x":1}"#));
    let ctx = context(&cluster, root.path());

    reconcile(Arc::new(ds2(r#"{"x":1}"#)), ctx.clone())
        .await
        .expect("first");
    let first = cluster.documents()[0].data.clone();
    reconcile(Arc::new(ds2(r#"{"x":1}"#)), ctx)
        .await
        .expect("second");

    let docs = cluster.documents();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].data, first);
}

/// Story: rendered values come back out of the decoded document unchanged.
#[tokio::test]
async fn rendered_values_round_trip() {
    let cluster = acme_cluster();
    let root = plugin_root_with(
        "text",
        "acme",
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\ndata:\n  s: \"{{ s }}\"\n  n: \"{{ n }}\"\n  b: \"{{ b }}\"\n  url: \"{{ completeNotifyUrl }}\"\n",
    );
    let params = r#"{"s":"hello world","n":42,"b":false}"#;
    cluster.put_dataset(ds2(params));
    let ctx = context(&cluster, root.path());

    reconcile(Arc::new(ds2(params)), ctx).await.expect("reconcile");

    let docs = cluster.documents();
    let data = &docs[0].data["data"];
    assert_eq!(data["s"], "hello world");
    assert_eq!(data["n"], "42");
    assert_eq!(data["b"], "false");
    assert_eq!(data["url"], NOTIFY_URL);
}

/// Story: unquoted placeholders decode back to the JSON values the Dataset
/// supplied, including a `null` inside a list.
#[tokio::test]
async fn unquoted_values_round_trip() {
    let cluster = acme_cluster();
    let root = plugin_root_with(
        "text",
        "acme",
        "apiVersion: acme.io/v1\nkind: Loader\nmetadata:\n  name: l\nspec:\n  flag: {{ flag }}\n  l: {{ l }}\n  ratio: {{ ratio }}\n",
    );
    let params = r#"{"flag":true,"l":[1,null],"ratio":0.5}"#;
    cluster.put_dataset(ds2(params));
    let ctx = context(&cluster, root.path());

    reconcile(Arc::new(ds2(params)), ctx).await.expect("reconcile");

    let docs = cluster.documents();
    let spec = &docs[0].data["spec"];
    assert_eq!(spec["flag"], serde_json::json!(true));
    assert_eq!(spec["l"], serde_json::json!([1, null]));
    assert_eq!(spec["ratio"], serde_json::json!(0.5));
}

// =============================================================================
// Skipped work
// =============================================================================

/// Story: a Dataset that names a DataPlugin nobody installed succeeds without
/// touching the cluster.
#[tokio::test]
async fn missing_plugin_changes_nothing() {
    let cluster = InMemoryCluster::new();
    let root = plugin_root_with("text", "acme", JOB_TEMPLATE);
    cluster.put_dataset(ds2(""));
    let ctx = context(&cluster, root.path());

    let action = reconcile(Arc::new(ds2("")), ctx).await.expect("reconcile");

    assert_eq!(action, Action::await_change());
    assert!(cluster.writes().is_empty());
    assert!(cluster.documents().is_empty());
}

/// Story: DataPlugins outside the system namespace are not consulted.
#[tokio::test]
async fn plugin_in_other_namespace_is_ignored() {
    let cluster = InMemoryCluster::new();
    cluster.put_plugin(NAMESPACE, data_plugin("p1", "text", "acme"));
    let root = plugin_root_with("text", "acme", JOB_TEMPLATE);
    cluster.put_dataset(ds2(""));
    let ctx = context(&cluster, root.path());

    reconcile(Arc::new(ds2("")), ctx).await.expect("reconcile");
    assert!(cluster.documents().is_empty());
}

/// Story: without `loadPlugin` the Dataset is only validated.
#[tokio::test]
async fn plugin_not_requested_changes_nothing() {
    let cluster = acme_cluster();
    let root = tempfile::tempdir().expect("tempdir");
    let ds = dataset("ds-3", vec![subset("a", "b")], Plugin::default());
    cluster.put_dataset(ds.clone());
    let ctx = context(&cluster, root.path());

    reconcile(Arc::new(ds), ctx).await.expect("reconcile");
    assert_eq!(cluster.calls(), ["get Dataset team-a/ds-3"]);
}

/// Story: a Dataset deleted before its event is handled ends the cycle quietly.
#[tokio::test]
async fn deleted_dataset_is_ignored() {
    let cluster = acme_cluster();
    let root = plugin_root_with("text", "acme", JOB_TEMPLATE);
    cluster.put_dataset(ds2(""));
    cluster.remove_dataset("ds-2");
    let ctx = context(&cluster, root.path());

    let action = reconcile(Arc::new(ds2("")), ctx).await.expect("reconcile");
    assert_eq!(action, Action::await_change());
    assert_eq!(cluster.calls(), ["get Dataset team-a/ds-2"]);
}

// =============================================================================
// Failures
// =============================================================================

/// Story: the DataPlugin points at a provider with no template on disk. The
/// cycle fails with the template path and writes nothing.
#[tokio::test]
async fn missing_template_fails_the_cycle() {
    let cluster = InMemoryCluster::new();
    cluster.put_plugin(SYSTEM_NAMESPACE, data_plugin("p1", "image", "nobody"));
    let root = plugin_root_with("text", "acme", JOB_TEMPLATE);
    cluster.put_dataset(ds2(""));
    let ctx = context(&cluster, root.path());

    let err = reconcile(Arc::new(ds2("")), ctx)
        .await
        .expect_err("no template");
    assert!(err.to_string().contains("plugins/image/nobody/plugin.yaml"), "{err}");
    assert!(cluster.writes().is_empty());
}

/// Story: the template references a placeholder the Dataset never supplied.
#[tokio::test]
async fn unresolved_placeholder_fails_the_cycle() {
    let cluster = acme_cluster();
    let root = plugin_root_with(
        "text",
        "acme",
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: \"{{ bucket }}\"\n",
    );
    cluster.put_dataset(ds2(""));
    let ctx = context(&cluster, root.path());

    let err = reconcile(Arc::new(ds2("")), ctx)
        .await
        .expect_err("undefined placeholder");
    assert!(matches!(err, Error::TemplateResolution { .. }), "got {err:?}");
    assert!(cluster.writes().is_empty());
}

/// Story: someone else replaced the Job between our read and our write. The
/// stale version token is reported, not retried.
#[tokio::test]
async fn stale_version_token_is_a_conflict() {
    let cluster = InMemoryCluster::new();
    let doc = {
        let mut doc = decode_manifest("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: c\n")
            .expect("manifest");
        doc.metadata.namespace = Some(NAMESPACE.to_string());
        doc
    };

    let outcome = apply_document(&cluster, doc.clone()).await.expect("create");
    assert_eq!(outcome, ApplyOutcome::Created);
    let outcome = apply_document(&cluster, doc.clone()).await.expect("update");
    assert_eq!(outcome, ApplyOutcome::Updated);

    let mut stale = doc;
    stale.metadata.resource_version = Some("v1".to_string());
    let err = cluster.update(&stale).await.expect_err("stale token");
    assert!(matches!(err, Error::Store { .. }), "got {err:?}");
}
