//! Top-level entry point: `Bundle::create`/`open`/`extend`, the
//! materialization methods backed by an [`ExecutionEngine`], and the
//! thin wiring between the commit log, resolver, builder, views, and
//! source/refresh subsystems.

use std::sync::Arc;

use crate::batch::Batch;
use crate::builder::{Builder, BundleStatus};
use crate::commit::log::CommitLog;
use crate::commit::Commit;
use crate::engine::ExecutionEngine;
use crate::errors::{BundlebaseError, Result};
use crate::fingerprint::{BundleId, Fingerprint};
use crate::identity;
use crate::object_store::ObjectStore;
use crate::operation::Operation;
use crate::resolver::{self, BundleState};
use crate::schema::Schema;
use crate::source;
use crate::views;

pub struct Bundle {
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn ExecutionEngine>,
    root: String,
    state: BundleState,
    builder: Builder,
}

impl Bundle {
    pub async fn create(
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn ExecutionEngine>,
        root: impl Into<String>,
        name: Option<String>,
    ) -> Result<Self> {
        let root = root.into();
        let log = CommitLog::new(store.clone(), &root);
        let message = name.clone().unwrap_or_else(|| "create".to_string());
        log.append_init(Commit::init_with_id(BundleId::new_random(), message))
            .await?;
        let mut bundle = Self::open(store, engine, root).await?;
        if let Some(name) = name {
            bundle.builder.set_name(name);
            bundle.commit("Set bundle name").await?;
        }
        Ok(bundle)
    }

    pub async fn extend(
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn ExecutionEngine>,
        parent_root: &str,
        child_root: impl Into<String>,
    ) -> Result<Self> {
        let child_root = child_root.into();
        let log = CommitLog::new(store.clone(), &child_root);
        log.append_init(Commit::init_from(parent_root, "extend"))
            .await?;
        Self::open(store, engine, child_root).await
    }

    pub async fn open(
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn ExecutionEngine>,
        root: impl Into<String>,
    ) -> Result<Self> {
        let root = root.into();
        let commits = identity::resolve_chain(store.clone(), &root).await?;
        let state = resolver::resolve(&commits)?;
        let builder = Builder::open(store.clone(), &root).await?;
        Ok(Bundle {
            store,
            engine,
            root,
            state,
            builder,
        })
    }

    pub fn builder(&mut self) -> &mut Builder {
        &mut self.builder
    }

    pub fn status(&self) -> BundleStatus {
        self.builder.status()
    }

    pub async fn commit(&mut self, message: impl Into<String>) -> Result<Fingerprint> {
        let fingerprint = self.builder.commit(message).await?;
        let commits = identity::resolve_chain(self.store.clone(), &self.root).await?;
        self.state = resolver::resolve(&commits)?;
        Ok(fingerprint)
    }

    /// The bundle's current version: the fingerprint of its head commit.
    pub async fn version(&self) -> Result<Fingerprint> {
        let log = CommitLog::new(self.store.clone(), &self.root);
        let head = log
            .head()
            .await?
            .ok_or_else(|| BundlebaseError::NotFound(self.root.clone()))?;
        Ok(head.fingerprint())
    }

    pub async fn schema(&self) -> Result<Schema> {
        self.engine.schema(&self.state.plan).await
    }

    pub async fn explain(&self) -> Result<String> {
        self.engine.explain(&self.state.plan).await
    }

    pub async fn to_batch(&self) -> Result<Batch> {
        let batch = self.engine.execute(&self.state.plan).await?;
        if batch.is_empty() {
            return Err(BundlebaseError::ExecutionError("no data".into()));
        }
        Ok(batch)
    }

    pub fn name(&self) -> Option<&str> {
        self.state.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.state.description.as_deref()
    }

    /// Resolves a config key against the currently-committed overlay,
    /// preferring the longest `url_prefix` match for `url`.
    pub fn config(&self, key: &str, url: &str) -> Option<&serde_json::Value> {
        self.state.config.get(key, url)
    }

    /// Creates a view that's a bare pass-through of this bundle's current
    /// history, with no transform of its own.
    pub async fn create_view(&mut self, name: impl Into<String>) -> Result<()> {
        self.create_view_with_ops(name, Vec::new()).await
    }

    /// Creates a view whose child bundle carries `forked`'s staged
    /// operations (typically from `self.builder().select_sql(...)`) as
    /// its own commit, recording a view definition without leaking the
    /// select into this bundle's own commit.
    pub async fn create_view_from(
        &mut self,
        name: impl Into<String>,
        forked: Builder,
    ) -> Result<()> {
        self.create_view_with_ops(name, forked.staged_operations())
            .await
    }

    async fn create_view_with_ops(
        &mut self,
        name: impl Into<String>,
        ops: Vec<Operation>,
    ) -> Result<()> {
        let name = name.into();
        if self.state.views.contains_key(&name) {
            return Err(BundlebaseError::ViewAlreadyExists(name));
        }
        let bundle_id =
            views::create_view_bundle(self.store.clone(), &self.root, &name, ops).await?;
        self.builder.create_view(name, bundle_id);
        self.commit("Create view").await?;
        Ok(())
    }

    pub fn view_url(&self, name: &str) -> Result<&str> {
        views::resolve_view_url(&self.state, name)
    }

    /// Validates the column against the engine's current schema before
    /// staging `CreateIndex`, surfacing `UnsupportedIndexType` for
    /// `Utf8View` columns up front rather than at commit time.
    pub async fn create_index(&mut self, column: impl Into<String>) -> Result<()> {
        let column = column.into();
        let schema = self.schema().await?;
        crate::index_manager::validate_type(&schema, &column)?;
        self.builder.create_index(column);
        Ok(())
    }

    pub async fn open_view(
        &self,
        engine: Arc<dyn ExecutionEngine>,
        name: &str,
    ) -> Result<Bundle> {
        let url = self.view_url(name)?.to_string();
        Bundle::open(self.store.clone(), engine, url).await
    }

    /// Lists every source's unattached matches without staging anything.
    pub async fn check_refresh(&self) -> Result<Vec<(String, String)>> {
        let mut pending = Vec::new();
        for (id, def) in &self.state.sources {
            let urls = source::check_refresh(self.store.clone(), def, &self.state.attached_urls)
                .await?;
            pending.extend(urls.into_iter().map(|url| (id.clone(), url)));
        }
        Ok(pending)
    }

    /// Stages an `Attach` for every unattached match across all declared
    /// sources and commits them as one change. Returns the number of new
    /// attachments.
    pub async fn refresh(&mut self) -> Result<usize> {
        let pending = self.check_refresh().await?;
        if pending.is_empty() {
            tracing::debug!(root = %self.root, "refresh found nothing new to attach");
            return Ok(0);
        }
        tracing::info!(root = %self.root, count = pending.len(), "refresh attaching new sources");
        let function_by_source: std::collections::HashMap<String, String> = self
            .state
            .sources
            .iter()
            .map(|(id, def)| (id.clone(), def.function.clone()))
            .collect();
        for (id, url) in &pending {
            let decoder = function_by_source.get(id).cloned();
            self.builder.attach(url.clone(), decoder);
        }
        self.commit("Refresh sources").await?;
        Ok(pending.len())
    }

    pub async fn define_source(
        &mut self,
        id: impl Into<String>,
        url_prefix: impl Into<String>,
        patterns: Vec<String>,
        function: impl Into<String>,
    ) -> Result<usize> {
        self.builder
            .define_source(id, url_prefix, patterns, function);
        self.commit("Define source").await?;
        self.refresh().await
    }
}
