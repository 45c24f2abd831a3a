//! One catalog per app, plus resolution of flows into navigable steps.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::app::bookmarks::AppLookup;
use crate::app::catalog::FlowCatalog;
use crate::app::tree::FlowSource;
use crate::app::workspace::Workspace;
use crate::domain::errors::{FlowError, Result};
use crate::domain::model::{BookmarkStep, Flow, FlowKind, SubflowRef};

/// A step together with the app and flow it was resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStep {
    pub app: String,
    pub flow: String,
    #[serde(flatten)]
    pub step: BookmarkStep,
}

/// Hands out the single catalog of each app in a workspace.
#[derive(Debug)]
pub struct AppRegistry {
    workspace: Arc<Workspace>,
    catalogs: DashMap<String, Arc<FlowCatalog>>,
}

impl AppRegistry {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace: Arc::new(workspace),
            catalogs: DashMap::new(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Catalog of `app`, created on first use.
    pub fn catalog(&self, app: &str) -> Result<Arc<FlowCatalog>> {
        if let Some(existing) = self.catalogs.get(app) {
            return Ok(existing.value().clone());
        }

        let entry = self.workspace.app(app).ok_or_else(|| FlowError::UnknownApp {
            app: app.to_owned(),
        })?;
        let lookup: Arc<dyn AppLookup + Send + Sync> = self.workspace.clone();
        let catalog = Arc::new(FlowCatalog::new(&entry.name, entry.sources(), lookup));
        Ok(self
            .catalogs
            .entry(app.to_owned())
            .or_insert(catalog)
            .value()
            .clone())
    }

    /// (Re)load `app` and return its tree data.
    pub fn load_app(&self, app: &str) -> Result<FlowSource> {
        let catalog = self.catalog(app)?;
        let snapshot = catalog.load()?;
        Ok(FlowSource::new(catalog.app_name(), snapshot))
    }

    /// Dispose every catalog and forget them.
    pub fn reset(&self) {
        for catalog in self.catalogs.iter() {
            catalog.value().dispose();
        }
        self.catalogs.clear();
        tracing::info!("bookmark catalogs reset");
    }

    /// Steps a basic or joined flow of `app` navigates through.
    ///
    /// Joined flows concatenate the steps of each subflow, looked up in the subflow's own app.
    /// Subflows naming unknown apps or flows, or apps whose bookmarks fail to load, resolve to the
    /// not-found step. A load failure of `app` itself is returned.
    pub fn resolve_flow(&self, app: &str, name: &str, kind: FlowKind) -> Result<Vec<ResolvedStep>> {
        match kind {
            FlowKind::Basic => {
                let flow = self.catalog(app)?.get_flow(name)?;
                Ok(label_steps(app, name, flow))
            }
            FlowKind::Joined => {
                let subflows = self.catalog(app)?.get_joined_flow(name)?;
                let mut steps = Vec::new();
                for subflow in subflows {
                    let flow = if subflow.is_not_found() {
                        Flow::not_found()
                    } else {
                        self.subflow(&subflow)?
                    };
                    steps.extend(label_steps(&subflow.app, &subflow.flow, flow));
                }
                Ok(steps)
            }
        }
    }

    /// Flow a subflow points at. Apps that are unknown or cannot load their bookmarks yield the
    /// not-found flow.
    fn subflow(&self, subflow: &SubflowRef) -> Result<Flow> {
        let flow = self
            .catalog(&subflow.app)
            .and_then(|catalog| catalog.get_flow(&subflow.flow));
        match flow {
            Ok(flow) => Ok(flow),
            Err(FlowError::UnknownApp { app }) => {
                tracing::warn!(%app, flow = %subflow.flow, "subflow references unknown app");
                Ok(Flow::not_found())
            }
            Err(err @ FlowError::LoadBookmarks { .. }) => {
                tracing::warn!(app = %subflow.app, flow = %subflow.flow, error = %err, "subflow app failed to load");
                Ok(Flow::not_found())
            }
            Err(err) => Err(err),
        }
    }
}

fn label_steps(app: &str, flow_name: &str, flow: Flow) -> Vec<ResolvedStep> {
    flow.into_steps()
        .into_iter()
        .map(|step| ResolvedStep {
            app: app.to_owned(),
            flow: flow_name.to_owned(),
            step,
        })
        .collect()
}
