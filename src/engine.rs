//! Execution engine boundary.
//!
//! Resolving a bundle produces a [`crate::plan::LogicalPlan`]; actually
//! running it against stored bytes is handed off to an `ExecutionEngine`
//! implementation. The core ships exactly one, [`InMemoryEngine`], built
//! on [`Batch`] so the crate's own test suite doesn't depend on an
//! external engine. Production deployments are expected to supply a
//! DataFusion- or Polars-backed engine instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::batch::Batch;
use crate::decoders::FormatDecoder;
use crate::errors::{BundlebaseError, Result};
use crate::plan::LogicalPlan;
use crate::schema::Schema;

/// Evaluated against a `Batch`'s cells during `Filter` execution. The
/// resolver only ever produces these from `Operation::Filter`'s stored
/// expression string plus bound parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Eq(String, crate::scalar::Scalar),
    Gt(String, crate::scalar::Scalar),
    Lt(String, crate::scalar::Scalar),
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn evaluate(&self, batch: &Batch, row: &[crate::scalar::Scalar]) -> Result<bool> {
        match self {
            Predicate::Eq(col, v) => {
                let idx = batch.column_index(col)?;
                Ok(&row[idx] == v)
            }
            Predicate::Gt(col, v) => {
                let idx = batch.column_index(col)?;
                Ok(match (row[idx].as_f64(), v.as_f64()) {
                    (Some(a), Some(b)) => a > b,
                    _ => false,
                })
            }
            Predicate::Lt(col, v) => {
                let idx = batch.column_index(col)?;
                Ok(match (row[idx].as_f64(), v.as_f64()) {
                    (Some(a), Some(b)) => a < b,
                    _ => false,
                })
            }
            Predicate::And(l, r) => Ok(l.evaluate(batch, row)? && r.evaluate(batch, row)?),
        }
    }
}

/// Executes a resolved [`LogicalPlan`] against whatever storage backs the
/// scan leaves. Every method suspends: real implementations perform I/O.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn schema(&self, plan: &LogicalPlan) -> Result<Schema>;
    async fn execute(&self, plan: &LogicalPlan) -> Result<Batch>;
    async fn explain(&self, plan: &LogicalPlan) -> Result<String>;
}

/// Reference engine: materializes every scan leaf as raw bytes decoded
/// through a [`FormatDecoder`], then folds the plan's operators over the
/// resulting `Batch` entirely in memory. No pushdown, no lazy evaluation —
/// correctness over performance, since its only job is to make the
/// resolver's own behavior observable without an external dependency.
pub struct InMemoryEngine {
    decoders: HashMap<String, Arc<dyn FormatDecoder>>,
    sources: DashMap<String, Vec<u8>>,
    store: Option<Arc<dyn crate::object_store::ObjectStore>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        InMemoryEngine {
            decoders: HashMap::new(),
            sources: DashMap::new(),
            store: None,
        }
    }

    /// An engine backed by an `ObjectStore`: scan leaves fall back to
    /// `store.get(url)` whenever the URL wasn't seeded via `put_source`.
    pub fn with_store(store: Arc<dyn crate::object_store::ObjectStore>) -> Self {
        InMemoryEngine {
            decoders: HashMap::new(),
            sources: DashMap::new(),
            store: Some(store),
        }
    }

    pub fn register_decoder(&mut self, name: impl Into<String>, decoder: Arc<dyn FormatDecoder>) {
        self.decoders.insert(name.into(), decoder);
    }

    /// Seeds raw bytes for a scan URL directly, bypassing the backing
    /// `ObjectStore` if one is configured.
    pub fn put_source(&self, url: impl Into<String>, bytes: Vec<u8>) {
        self.sources.insert(url.into(), bytes);
    }

    /// Resolves the decoder keyed by `hint` (a staged `Attach`'s explicit
    /// `format_hint`, e.g. a source's declared decoder function name)
    /// when that key is registered, falling back to the url's extension
    /// otherwise — the hint may name a function the caller never
    /// registered a decoder under, and the extension is still the only
    /// way a pack-store path (no extension at all) ever finds one.
    fn decoder_for(&self, url: &str, hint: Option<&str>) -> Result<Arc<dyn FormatDecoder>> {
        let extension = url.rsplit('.').next().unwrap_or("");
        let key = match hint {
            Some(h) if self.decoders.contains_key(h) => h,
            _ => extension,
        };
        self.decoders.get(key).cloned().ok_or_else(|| {
            let available: Vec<&str> = self.decoders.keys().map(|s| s.as_str()).collect();
            BundlebaseError::DecodeError(crate::errors::with_alternatives(
                format!("no decoder registered for '{key}' (url: {url})"),
                &available,
            ))
        })
    }

    async fn scan(&self, url: &str, hint: Option<&str>) -> Result<Batch> {
        let bytes = if let Some(bytes) = self.sources.get(url).map(|v| v.clone()) {
            bytes
        } else if let Some(store) = &self.store {
            store.get(url).await?
        } else {
            return Err(BundlebaseError::NotFound(format!(
                "no bytes registered for scan url '{url}'"
            )));
        };
        let decoder = self.decoder_for(url, hint)?;
        decoder.decode(&bytes)
    }

    fn eval<'a>(&'a self, plan: &'a LogicalPlan) -> futures::future::BoxFuture<'a, Result<Batch>> {
        Box::pin(async move {
            match plan {
                LogicalPlan::Scan { url, decoder_hint, .. } => {
                    self.scan(url, decoder_hint.as_deref()).await
                }
                LogicalPlan::Union(inputs) => {
                    let mut iter = inputs.iter();
                    let first = match iter.next() {
                        Some(p) => self.eval(p).await?,
                        None => return Ok(Batch::default()),
                    };
                    let mut acc = first;
                    for p in iter {
                        acc = acc.concat(&self.eval(p).await?)?;
                    }
                    Ok(acc)
                }
                LogicalPlan::Filter { input, predicate } => {
                    let batch = self.eval(input).await?;
                    let mut err = None;
                    let filtered = batch.filter(|row| match predicate.evaluate(&batch, row) {
                        Ok(keep) => keep,
                        Err(e) => {
                            err = Some(e);
                            false
                        }
                    });
                    if let Some(e) = err {
                        return Err(e);
                    }
                    Ok(filtered)
                }
                LogicalPlan::Select { input, columns } => self.eval(input).await?.select(columns),
                LogicalPlan::RemoveColumn { input, column } => {
                    self.eval(input).await?.without_column(column)
                }
                LogicalPlan::RenameColumn { input, from, to } => {
                    self.eval(input).await?.renamed_column(from, to)
                }
                LogicalPlan::Join {
                    left,
                    right,
                    predicate,
                } => {
                    let l = self.eval(left).await?;
                    let r = self.eval(right).await?;
                    join_batches(&l, &r, predicate)
                }
                LogicalPlan::Empty(schema) => Ok(Batch::empty(schema.clone())),
            }
        })
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn join_batches(left: &Batch, right: &Batch, predicate: &str) -> Result<Batch> {
    let (left_col, right_col) = predicate.split_once('=').ok_or_else(|| {
        BundlebaseError::PlanError(format!("join predicate '{predicate}' is not 'a=b'"))
    })?;
    let left_idx = left.column_index(left_col.trim())?;
    let right_idx = right.column_index(right_col.trim())?;

    let mut fields = left.schema.fields.clone();
    fields.extend(right.schema.fields.iter().cloned());
    let schema = Schema { fields };

    let mut rows = Vec::new();
    for l_row in &left.rows {
        for r_row in &right.rows {
            if l_row[left_idx] == r_row[right_idx] {
                let mut row = l_row.clone();
                row.extend(r_row.iter().cloned());
                rows.push(row);
            }
        }
    }
    Batch::new(schema, rows)
}

#[async_trait]
impl ExecutionEngine for InMemoryEngine {
    async fn schema(&self, plan: &LogicalPlan) -> Result<Schema> {
        Ok(self.eval(plan).await?.schema)
    }

    async fn execute(&self, plan: &LogicalPlan) -> Result<Batch> {
        self.eval(plan).await
    }

    async fn explain(&self, plan: &LogicalPlan) -> Result<String> {
        Ok(format!("*** logical plan ***\n{plan:#?}"))
    }
}
