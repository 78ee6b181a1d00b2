//! The rollout pipeline: render, persist, apply.

use tracing::{debug, info};

use crate::config::Configuration;
use crate::error::Result;
use crate::kubectl::KubeCtl;
use crate::render::TemplateRenderer;
use crate::store::{RolloutRecord, RolloutStore};

/// One rollout of one application version into one namespace.
///
/// Owns the resolved [`Configuration`] and hands out read-only references to
/// each stage. The stages run strictly in order — Render, Persist, Apply —
/// and the first failure aborts the remainder; there is no partial-rollout
/// recovery.
pub struct Rollout {
    config: Configuration,
}

impl Rollout {
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn deploy(&self) -> Result<RolloutRecord> {
        // Preflight first: a wrong context or an incompatible tool must
        // abort before any rollout work begins.
        let kubectl = KubeCtl::connect(&self.config)?;

        info!(
            app = %self.config.app,
            version = %self.config.version,
            namespace = %self.config.namespace,
            "preparing rollout"
        );
        let rendered = TemplateRenderer::new(&self.config).render_all()?;

        let record = RolloutStore::new(&self.config).write(&rendered)?;

        if self.config.mode.applies_to_cluster() {
            info!("rolling out {} resource(s)", record.files.len());
        } else {
            info!("dry run: skipping apply to the cluster");
        }
        for (kind, file) in &record.files {
            debug!(%kind, file = %file.display(), "applying resource");
            kubectl.apply(file)?;
        }
        Ok(record)
    }
}
