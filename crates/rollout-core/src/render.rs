//! Template rendering for one application's resource manifests.

use std::collections::BTreeMap;
use std::io::ErrorKind;

use minijinja::{Environment, UndefinedBehavior};
use serde_json::Value;
use tracing::debug;

use crate::config::Configuration;
use crate::error::{Result, RolloutError};
use crate::paths;
use crate::resource::ResourceKind;
use crate::vars::VarMap;

/// Renders `<app>-<kind>.tpl.yaml` templates with the configured variables.
///
/// Variable precedence, lowest to highest: secret vars, extra vars, then the
/// implicit bindings `app_version` and `namespace`. The implicit bindings
/// always win so a stray variable-file entry cannot redirect a rollout.
pub struct TemplateRenderer<'a> {
    config: &'a Configuration,
    env: Environment<'static>,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        let mut env = Environment::new();
        // An undefined variable reference aborts the rollout instead of
        // rendering an empty string into a manifest.
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { config, env }
    }

    /// Render the template for `kind`, or `None` when this application
    /// ships no resource of that kind.
    pub fn render(&self, kind: &ResourceKind) -> Result<Option<String>> {
        let path = paths::template_file(&self.config.templates_path, &self.config.app, kind);
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(template = %path.display(), "template not found, skipping kind");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let text = self
            .env
            .render_str(&source, self.context())
            .map_err(|source| RolloutError::Template {
                kind: kind.to_string(),
                source,
            })?;
        Ok(Some(text))
    }

    /// Render every configured kind in stable order, keeping only kinds
    /// that produced non-empty output.
    pub fn render_all(&self) -> Result<BTreeMap<ResourceKind, String>> {
        let mut rendered = BTreeMap::new();
        for kind in &self.config.resources {
            if let Some(text) = self.render(kind)? {
                if text.trim().is_empty() {
                    debug!(%kind, "template rendered empty output, skipping kind");
                    continue;
                }
                rendered.insert(kind.clone(), text);
            }
        }
        Ok(rendered)
    }

    fn context(&self) -> minijinja::Value {
        let mut merged: VarMap = self.config.secret_vars.clone();
        merged.extend(self.config.extra_vars.clone());
        merged.insert(
            "app_version".to_string(),
            Value::String(self.config.version.clone()),
        );
        merged.insert(
            "namespace".to_string(),
            Value::String(self.config.namespace.clone()),
        );
        minijinja::Value::from_serialize(&merged)
    }
}
