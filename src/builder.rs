//! Staged mutation layer. Each call to a `Builder` method appends one
//! [`Change`] to an in-memory staging list; nothing touches the commit
//! log until [`Builder::commit`] is called, which writes every staged
//! change as a single new commit and clears the stage.

use std::sync::Arc;

use crate::commit::log::CommitLog;
use crate::commit::Commit;
use crate::errors::{BundlebaseError, Result};
use crate::fingerprint::Fingerprint;
use crate::object_store::ObjectStore;
use crate::operation::Operation;
use crate::resolver::{self, BundleState};

/// One staged operation, content-addressed by the fingerprint of its
/// canonical encoding so identical staged changes always compare equal.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    pub operation: Operation,
    /// Bytes not yet written to the pack store, cleared by `Builder::commit`
    /// once it has patched the operation's content-addressed url/body_url
    /// field.
    pending_bytes: Option<Vec<u8>>,
}

impl Change {
    pub fn new(operation: Operation) -> Self {
        Change {
            operation,
            pending_bytes: None,
        }
    }

    pub fn with_pending_bytes(operation: Operation, bytes: Vec<u8>) -> Self {
        Change {
            operation,
            pending_bytes: Some(bytes),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let json = serde_json::to_vec(&self.operation).expect("Operation always serializes");
        Fingerprint::of(&json)
    }

    pub fn description(&self) -> String {
        self.operation.describe()
    }
}

#[derive(Clone, Debug)]
pub struct ChangeStatus {
    pub id: String,
    pub description: String,
    pub operation_count: usize,
}

#[derive(Clone, Debug)]
pub struct BundleStatus {
    pub changes: Vec<ChangeStatus>,
    pub total_operations: usize,
}

impl BundleStatus {
    pub fn is_empty(&self) -> bool {
        self.total_operations == 0
    }
}

#[derive(Clone)]
pub struct Builder {
    store: Arc<dyn ObjectStore>,
    root: String,
    base_sequence: u64,
    base_state: BundleState,
    staged: Vec<Change>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("root", &self.root)
            .field("base_sequence", &self.base_sequence)
            .field("base_state", &self.base_state)
            .field("staged", &self.staged)
            .finish()
    }
}

impl Builder {
    pub async fn open(store: Arc<dyn ObjectStore>, root: impl Into<String>) -> Result<Self> {
        let root = root.into();
        let commits = crate::identity::resolve_chain(store.clone(), &root).await?;
        let base_state = resolver::resolve(&commits)?;
        // `commits` is the FROM-resolved chain (parent history included);
        // `append`'s expected_sequence is validated against this bundle's
        // own local log only, so it must count local commits, not the
        // resolved chain.
        let local_sequence = CommitLog::new(store.clone(), &root).read_all().await?.len() as u64;
        Ok(Builder {
            store,
            root,
            base_sequence: local_sequence,
            base_state,
            staged: Vec::new(),
        })
    }

    pub fn attach(&mut self, url: impl Into<String>, decoder: Option<String>) {
        self.staged.push(Change::new(Operation::Attach {
            url: url.into(),
            decoder,
        }));
    }

    /// Attaches a local file's bytes directly rather than a pre-existing
    /// external url. The bytes are written to the pack store as part of
    /// `commit`, which patches this change's `url` to the resulting
    /// content-addressed path before the commit is built.
    pub fn attach_bytes(&mut self, bytes: Vec<u8>, decoder: Option<String>) {
        self.staged.push(Change::with_pending_bytes(
            Operation::Attach {
                url: String::new(),
                decoder,
            },
            bytes,
        ));
    }

    pub fn attach_function(&mut self, name: impl Into<String>) {
        self.staged
            .push(Change::new(Operation::AttachFunction { name: name.into() }));
    }

    /// Stages a function definition whose body is written to the pack
    /// store at commit time; `body_url` is filled in then.
    pub fn define_function(
        &mut self,
        name: impl Into<String>,
        body: Vec<u8>,
        output: impl Into<String>,
        version: u32,
    ) {
        self.staged.push(Change::with_pending_bytes(
            Operation::DefineFunction {
                name: name.into(),
                output: output.into(),
                version,
                body_url: String::new(),
            },
            body,
        ));
    }

    pub fn define_source(
        &mut self,
        id: impl Into<String>,
        url_prefix: impl Into<String>,
        patterns: Vec<String>,
        function: impl Into<String>,
    ) {
        self.staged.push(Change::new(Operation::DefineSource {
            id: id.into(),
            url_prefix: url_prefix.into(),
            patterns,
            function: function.into(),
        }));
    }

    pub fn remove_column(&mut self, column: impl Into<String>) {
        self.staged
            .push(Change::new(Operation::RemoveColumn { column: column.into() }));
    }

    pub fn rename_column(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.staged.push(Change::new(Operation::RenameColumn {
            from: from.into(),
            to: to.into(),
        }));
    }

    pub fn filter(&mut self, expression: impl Into<String>, params: Vec<crate::scalar::Scalar>) {
        self.staged.push(Change::new(Operation::Filter {
            expression: expression.into(),
            params,
        }));
    }

    pub fn select(&mut self, columns: Vec<String>) {
        self.staged
            .push(Change::new(Operation::Select { columns }));
    }

    /// The SQL form of select: unlike [`Builder::select`], this leaves
    /// `self` untouched and returns a forked `Builder` whose staged
    /// changes add a `Select`. `create_view` takes the fork's staged
    /// operations to record a view definition without leaking the select
    /// into the parent's own commit.
    pub fn select_sql(&self, sql: &str) -> Result<Builder> {
        let columns = parse_select_columns(sql)?;
        let mut forked = self.clone();
        forked
            .staged
            .push(Change::new(Operation::Select { columns }));
        Ok(forked)
    }

    /// The operations staged so far, in application order. Used by
    /// `create_view` to materialize a forked builder's changes as the
    /// view bundle's own commit.
    pub fn staged_operations(&self) -> Vec<Operation> {
        self.staged.iter().map(|c| c.operation.clone()).collect()
    }

    pub fn join(&mut self, name: impl Into<String>, url: impl Into<String>, predicate: impl Into<String>) {
        self.staged.push(Change::new(Operation::Join {
            name: name.into(),
            url: url.into(),
            predicate: predicate.into(),
        }));
    }

    pub fn attach_to_join(&mut self, join_name: impl Into<String>, url: impl Into<String>) {
        self.staged.push(Change::new(Operation::AttachToJoin {
            join_name: join_name.into(),
            url: url.into(),
        }));
    }

    /// Stages a `CreateIndex`. Column-type validation happens once the
    /// engine resolves the bundle's schema (see
    /// [`crate::index_manager::validate_type`]); the builder itself only
    /// guards against redundantly re-creating an index already present in
    /// the committed log.
    pub fn create_index(&mut self, column: impl Into<String>) {
        let column = column.into();
        self.staged
            .push(Change::new(Operation::CreateIndex { column }));
    }

    pub fn drop_index(&mut self, column: impl Into<String>) -> Result<()> {
        let column = column.into();
        crate::index_manager::validate_drop(&column, &self.base_state.indexes)?;
        self.staged
            .push(Change::new(Operation::DropIndex { column }));
        Ok(())
    }

    pub fn rebuild_index(&mut self, column: impl Into<String>) -> Result<()> {
        let column = column.into();
        crate::index_manager::validate_rebuild(&column, &self.base_state.indexes)?;
        self.staged
            .push(Change::new(Operation::RebuildIndex { column }));
        Ok(())
    }

    pub fn create_view(&mut self, name: impl Into<String>, bundle_id: impl Into<String>) {
        self.staged.push(Change::new(Operation::CreateView {
            name: name.into(),
            bundle_id: bundle_id.into(),
        }));
    }

    pub fn rename_view(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.staged.push(Change::new(Operation::RenameView {
            from: from.into(),
            to: to.into(),
        }));
    }

    pub fn drop_view(&mut self, name: impl Into<String>) {
        self.staged.push(Change::new(Operation::DropView { name: name.into() }));
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.staged
            .push(Change::new(Operation::SetName { name: name.into() }));
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.staged.push(Change::new(Operation::SetDescription {
            description: description.into(),
        }));
    }

    pub fn set_config(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
        url_prefix: Option<String>,
    ) {
        self.staged.push(Change::new(Operation::SetConfig {
            key: key.into(),
            value,
            url_prefix,
        }));
    }

    pub fn status(&self) -> BundleStatus {
        let changes = self
            .staged
            .iter()
            .map(|c| ChangeStatus {
                id: c.fingerprint().as_hex(),
                description: c.description(),
                operation_count: 1,
            })
            .collect();
        BundleStatus {
            changes,
            total_operations: self.staged.len(),
        }
    }

    /// Writes any bytes staged via `attach_bytes`/`define_function` to the
    /// pack store and patches the owning operation's url/body_url field to
    /// the resulting content-addressed path. Called once per `commit`,
    /// before the change list is frozen into a `Commit`.
    async fn flush_pending_bytes(&mut self) -> Result<()> {
        let pack_store = crate::pack_store::PackStore::new(self.store.clone(), &self.root);
        for change in &mut self.staged {
            let Some(bytes) = change.pending_bytes.take() else {
                continue;
            };
            let fingerprint = pack_store.put(&bytes).await?;
            let path = crate::pack_store::PackStore::path_for(&self.root, &fingerprint);
            match &mut change.operation {
                Operation::Attach { url, .. } => *url = path,
                Operation::DefineFunction { body_url, .. } => *body_url = path,
                _ => {}
            }
        }
        Ok(())
    }

    /// Writes every staged change as one new commit and clears the stage.
    /// A concurrent writer that already advanced the log surfaces as
    /// `ConcurrentWriteConflict` and leaves the stage untouched so the
    /// caller can re-open and retry.
    pub async fn commit(&mut self, message: impl Into<String>) -> Result<Fingerprint> {
        if self.staged.is_empty() {
            return Err(BundlebaseError::PlanError(
                "nothing staged to commit".into(),
            ));
        }
        self.flush_pending_bytes().await?;
        let log = CommitLog::new(self.store.clone(), &self.root);
        let operations: Vec<Operation> = self.staged.iter().map(|c| c.operation.clone()).collect();
        let change_json: Vec<u8> = operations
            .iter()
            .flat_map(|op| serde_json::to_vec(op).expect("Operation always serializes"))
            .collect();
        let change_fp = Fingerprint::of(&change_json);

        let parent = log
            .head()
            .await?
            .map(|c| c.fingerprint())
            .ok_or_else(|| BundlebaseError::NotFound(format!("no commits at '{}'", self.root)))?;

        let commit = Commit::child(parent, change_fp, message.into(), operations);
        let fingerprint = log.append(self.base_sequence, commit).await?;
        self.base_sequence += 1;
        for op in &self.staged {
            crate::resolver::apply_one(&mut self.base_state, &op.operation)?;
        }
        self.staged.clear();
        Ok(fingerprint)
    }
}

/// Pulls the projection list out of a `SELECT <cols> FROM ...` statement
/// against the virtual table `data`/`bundle`. `*` maps to an empty column
/// list, meaning "no projection" to the logical plan. Anything past `FROM`
/// (a `LIMIT`, a `WHERE`, a join) is left to the external execution engine
/// named in the resolver's design; this core only needs the column list to
/// decide what a forked select narrows.
fn parse_select_columns(sql: &str) -> Result<Vec<String>> {
    let trimmed = sql.trim();
    let without_select = trimmed
        .strip_prefix("SELECT ")
        .or_else(|| trimmed.strip_prefix("select "))
        .ok_or_else(|| {
            BundlebaseError::PlanError(format!("expected a SELECT statement, got '{sql}'"))
        })?;
    let column_list = without_select
        .split_once(" FROM ")
        .or_else(|| without_select.split_once(" from "))
        .map(|(cols, _)| cols)
        .ok_or_else(|| {
            BundlebaseError::PlanError(format!("expected a FROM clause in '{sql}'"))
        })?;
    let column_list = column_list.trim();
    if column_list == "*" {
        return Ok(Vec::new());
    }
    Ok(column_list
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::BundleId;
    use crate::object_store::memory::MemoryObjectStore;

    async fn opened_builder() -> Builder {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let log = CommitLog::new(store.clone(), "mem://b");
        log.append_init(Commit::init_with_id(BundleId::new_random(), "create"))
            .await
            .unwrap();
        Builder::open(store, "mem://b").await.unwrap()
    }

    #[tokio::test]
    async fn status_reflects_staged_changes_before_commit() {
        let mut builder = opened_builder().await;
        builder.set_name("Test Bundle");
        builder.attach("mem://a.csv", None);
        let status = builder.status();
        assert_eq!(status.total_operations, 2);
        assert!(status.changes[0].description.contains("Set name to Test Bundle"));
        assert!(status.changes[1].description.contains("Attach"));
    }

    #[tokio::test]
    async fn commit_clears_the_stage() {
        let mut builder = opened_builder().await;
        builder.set_name("Test Bundle");
        builder.commit("rename").await.unwrap();
        assert!(builder.status().is_empty());
    }

    #[tokio::test]
    async fn commit_with_nothing_staged_is_an_error() {
        let mut builder = opened_builder().await;
        let err = builder.commit("noop").await.unwrap_err();
        assert!(matches!(err, BundlebaseError::PlanError(_)));
    }

    #[tokio::test]
    async fn drop_index_without_create_is_index_not_found() {
        let mut builder = opened_builder().await;
        let err = builder.drop_index("nonexistent").unwrap_err();
        assert!(matches!(err, BundlebaseError::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn select_sql_forks_leaving_the_original_unstaged() {
        let mut builder = opened_builder().await;
        builder.attach("mem://a.csv", None);
        let forked = builder.select_sql("SELECT id, name FROM data").unwrap();
        assert_eq!(builder.status().total_operations, 1);
        assert_eq!(forked.status().total_operations, 2);
        assert!(matches!(
            forked.staged_operations().last(),
            Some(Operation::Select { columns }) if columns == &vec!["id".to_string(), "name".to_string()]
        ));
    }

    #[tokio::test]
    async fn select_sql_star_projects_to_an_empty_column_list() {
        let builder = opened_builder().await;
        let forked = builder.select_sql("SELECT * FROM data").unwrap();
        assert!(matches!(
            forked.staged_operations().last(),
            Some(Operation::Select { columns }) if columns.is_empty()
        ));
    }

    #[tokio::test]
    async fn select_sql_without_from_is_a_plan_error() {
        let builder = opened_builder().await;
        let err = builder.select_sql("SELECT id").unwrap_err();
        assert!(matches!(err, BundlebaseError::PlanError(_)));
    }

    #[tokio::test]
    async fn attach_bytes_writes_to_the_pack_store_on_commit() {
        let mut builder = opened_builder().await;
        builder.attach_bytes(b"id,name\n1,alice\n".to_vec(), Some("csv".into()));
        builder.commit("attach local file").await.unwrap();
        match builder.base_state.plan.clone() {
            crate::plan::LogicalPlan::Scan { url, .. } => {
                assert!(url.contains("_bundlebase/packs/"));
            }
            other => panic!("expected a scan, got {other:?}"),
        }
    }
}
