//! Per-app catalog of parsed basic and joined flows.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::app::bookmarks::{AppLookup, parse_bookmarks};
use crate::app::joined::JoinedStore;
use crate::app::tree::FlowSource;
use crate::domain::errors::{FlowError, Result};
use crate::domain::model::{Flow, FlowMap, JoinedFlowMap, SubflowRef};

/// Storage files backing one app's catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSources {
    pub bookmarks_file: PathBuf,
    pub joined_file: PathBuf,
}

/// Immutable result of one successful load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub flows: FlowMap,
    pub joined: JoinedFlowMap,
}

#[derive(Debug, Default)]
struct Installed {
    ticket: u64,
    snapshot: Option<Arc<CatalogSnapshot>>,
}

/// Owns the parsed flows of a single app.
///
/// Reloads replace the whole snapshot at once. Every load takes a ticket before touching
/// storage and only installs its result if no later ticket was installed meanwhile.
pub struct FlowCatalog {
    app_name: String,
    sources: CatalogSources,
    lookup: Arc<dyn AppLookup + Send + Sync>,
    tickets: AtomicU64,
    state: RwLock<Installed>,
}

impl std::fmt::Debug for FlowCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowCatalog")
            .field("app_name", &self.app_name)
            .field("sources", &self.sources)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl FlowCatalog {
    pub fn new(
        app_name: impl Into<String>,
        sources: CatalogSources,
        lookup: Arc<dyn AppLookup + Send + Sync>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            sources,
            lookup,
            tickets: AtomicU64::new(0),
            state: RwLock::new(Installed::default()),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn sources(&self) -> &CatalogSources {
        &self.sources
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().snapshot.is_some()
    }

    /// Re-read both storage files and install the result.
    ///
    /// On failure the previously installed snapshot stays in place.
    pub fn load(&self) -> Result<Arc<CatalogSnapshot>> {
        let ticket = self.next_ticket();
        let snapshot = self
            .read_snapshot()
            .map_err(|err| FlowError::load(&self.app_name, err))?;
        Ok(self.commit(ticket, snapshot))
    }

    /// Currently installed snapshot, loading one first when the catalog is empty.
    pub fn snapshot(&self) -> Result<Arc<CatalogSnapshot>> {
        if let Some(snapshot) = self.state.read().snapshot.clone() {
            return Ok(snapshot);
        }
        self.load()
    }

    /// Steps of `name`, or the single-step not-found placeholder.
    pub fn get_flow(&self, name: &str) -> Result<Flow> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .flows
            .get(name)
            .cloned()
            .unwrap_or_else(Flow::not_found))
    }

    /// Subflows of joined flow `name`, or a single placeholder naming this app.
    pub fn get_joined_flow(&self, name: &str) -> Result<Vec<SubflowRef>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .joined
            .get(name)
            .cloned()
            .unwrap_or_else(|| vec![SubflowRef::not_found(self.app_name.as_str())]))
    }

    /// Tree data for the presentation layer.
    pub fn tree_source(&self) -> Result<FlowSource> {
        Ok(FlowSource::new(self.app_name.clone(), self.snapshot()?))
    }

    /// Drop the cached snapshot; loads still in flight are discarded.
    pub fn dispose(&self) {
        let mut state = self.state.write();
        state.ticket = self.next_ticket();
        state.snapshot = None;
        tracing::debug!(app = %self.app_name, "catalog disposed");
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(&self, ticket: u64, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut state = self.state.write();
        if ticket > state.ticket {
            state.ticket = ticket;
            state.snapshot = Some(snapshot.clone());
            return snapshot;
        }

        tracing::debug!(app = %self.app_name, ticket, installed = state.ticket, "discarding superseded load");
        state.snapshot.clone().unwrap_or(snapshot)
    }

    fn read_snapshot(&self) -> Result<CatalogSnapshot> {
        let path = &self.sources.bookmarks_file;
        let raw = fs::read_to_string(path).map_err(|source| FlowError::Io {
            path: path.clone(),
            source,
        })?;
        let flows = parse_bookmarks(&raw, path, self.lookup.as_ref())?;
        let joined = JoinedStore::new(&self.sources.joined_file).read();

        tracing::info!(
            app = %self.app_name,
            flows = flows.len(),
            joined = joined.len(),
            "bookmarks loaded"
        );
        Ok(CatalogSnapshot { flows, joined })
    }
}
