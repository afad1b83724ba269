//! Desired-state builder
//!
//! Derives the child document a Dataset asks for: subset readiness decides
//! whether anything is built at all, the DataPlugin picks the template, and the
//! Dataset's parameters fill it in.

use kube::api::DynamicObject;
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

use super::Context;
use crate::crd::{Dataset, Subset};
use crate::manifest::{decode_manifest, type_of};
use crate::template::{plugin_template_path, Parameters};
use crate::{Error, NOTIFY_URL_PARAM};

/// What the cluster should look like for a Dataset
#[derive(Clone, Debug)]
pub enum DesiredState {
    /// No subset has both train and test files
    Unready,
    /// The Dataset does not ask for a plugin
    PluginDisabled,
    /// The named DataPlugin does not exist
    PluginMissing {
        /// Name of the missing DataPlugin
        name: String,
    },
    /// The rendered child, namespaced and owned by the Dataset
    Apply(Box<DynamicObject>),
}

/// A Dataset is ready iff at least one subset has non-empty train and test files
pub fn has_ready_subset(subsets: &[Subset]) -> bool {
    subsets.iter().any(Subset::has_train_and_test)
}

/// Decode the JSON-encoded parameter blob of a Dataset's plugin.
///
/// Empty text and `null` decode to no parameters. Anything other than a JSON
/// object is rejected.
pub fn decode_parameters(dataset: &str, blob: &str) -> Result<Parameters, Error> {
    if blob.trim().is_empty() {
        return Ok(Parameters::new());
    }

    let value: serde_json::Value =
        serde_json::from_str(blob).map_err(|e| Error::parameter_decode(dataset, e.to_string()))?;

    match value {
        serde_json::Value::Null => Ok(Parameters::new()),
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::parameter_decode(
            dataset,
            format!("expected a JSON object, got {}", json_type(&other)),
        )),
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Add the injected notify URL, replacing any user-supplied value
pub fn merge_parameters(mut params: Parameters, notify_url: &str) -> Parameters {
    params.insert(
        NOTIFY_URL_PARAM.to_string(),
        serde_json::Value::String(notify_url.to_string()),
    );
    params
}

/// Place `doc` in the Dataset's namespace and make the Dataset its controller.
///
/// Fails if the Dataset lacks the identity an owner reference needs, or if the
/// document is already controlled by a different owner.
pub fn stamp_ownership(doc: &mut DynamicObject, dataset: &Dataset) -> Result<(), Error> {
    let dataset_name = dataset.name_any();
    let namespace = dataset
        .namespace()
        .ok_or_else(|| Error::validation(&dataset_name, "Dataset has no namespace"))?;
    let mut owner = dataset
        .controller_owner_ref(&())
        .ok_or_else(|| Error::validation(&dataset_name, "Dataset has no uid"))?;
    owner.block_owner_deletion = Some(true);

    let foreign_controller = doc
        .owner_references()
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner.uid)
        .map(|r| format!("{} {}", r.kind, r.name));
    if let Some(existing) = foreign_controller {
        return Err(Error::AlreadyOwned {
            kind: type_of(doc).map(|(_, k)| k.to_string()).unwrap_or_default(),
            name: doc.name_any(),
            owner: existing,
        });
    }

    let refs = doc.metadata.owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| r.uid != owner.uid);
    refs.push(owner);
    doc.metadata.namespace = Some(namespace);
    Ok(())
}

/// Work out the desired state for a freshly read Dataset
pub async fn build_desired_state(dataset: &Dataset, ctx: &Context) -> Result<DesiredState, Error> {
    let name = dataset.name_any();

    if !has_ready_subset(dataset.subsets()) {
        return Ok(DesiredState::Unready);
    }

    let plugin = dataset.plugin();
    if !plugin.load_plugin {
        return Ok(DesiredState::PluginDisabled);
    }
    if plugin.name.is_empty() {
        return Err(Error::validation(&name, "loadPlugin is set but plugin name is empty"));
    }

    let descriptor = match ctx
        .cancellable(
            "get DataPlugin",
            ctx.kube.get_data_plugin(&ctx.system_namespace, &plugin.name),
        )
        .await
    {
        Ok(descriptor) => descriptor,
        Err(e) if e.is_not_found() => {
            info!(plugin = %plugin.name, namespace = %ctx.system_namespace, "DataPlugin not found, skipping");
            return Ok(DesiredState::PluginMissing {
                name: plugin.name.clone(),
            });
        }
        Err(e) => return Err(e),
    };

    let path = plugin_template_path(&descriptor.spec.dataset_class, &descriptor.spec.provider);
    debug!(path = %path.display(), "reading plugin template");
    let template = ctx
        .cancellable("read plugin template", ctx.templates.read(&path))
        .await?;

    let params = merge_parameters(
        decode_parameters(&name, &plugin.parameters)?,
        &ctx.complete_notify_url,
    );
    let rendered = ctx.engine.render(&template, &params)?;

    let mut doc = decode_manifest(&rendered)?;
    stamp_ownership(&mut doc, dataset)?;
    Ok(DesiredState::Apply(Box::new(doc)))
}
