//! Plugin manifest templates
//!
//! A DataPlugin's template lives at `plugins/<datasetClass>/<provider>/plugin.yaml`
//! below the plugin root. Its `{{ placeholder }}`s are filled from the Dataset's
//! plugin parameters plus the injected `completeNotifyUrl`:
//!
//! ```yaml
//! apiVersion: batch/v1
//! kind: Job
//! metadata:
//!   name: {{ name }}-loader
//! spec:
//!   template:
//!     spec:
//!       containers:
//!         - name: loader
//!           image: {{ image }}
//!           env:
//!             - name: NOTIFY_URL
//!               value: "{{ completeNotifyUrl }}"
//! ```

mod engine;
mod source;

pub use engine::{Parameters, TemplateEngine};
pub use source::{plugin_template_path, FileTemplateSource, TemplateSource};

#[cfg(test)]
pub use source::MockTemplateSource;
