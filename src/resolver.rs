//! Pure fold from a chain-resolved commit sequence to a [`BundleState`]:
//! the logical plan plus every side-channel fact (name, description,
//! config, indexes, views, sources, functions) the log carries that
//! `LogicalPlan` itself has no room for.

use std::collections::HashMap;

use crate::commit::Commit;
use crate::config::BundleConfig;
use crate::errors::Result;
use crate::operation::Operation;
use crate::plan::{self, LogicalPlan};

#[derive(Clone, Debug, Default)]
pub struct SourceDef {
    pub url_prefix: String,
    pub patterns: Vec<String>,
    pub function: String,
}

#[derive(Clone, Debug, Default)]
pub struct FunctionDef {
    pub output: String,
    pub version: u32,
}

#[derive(Clone, Debug)]
pub struct BundleState {
    pub plan: LogicalPlan,
    pub name: Option<String>,
    pub description: Option<String>,
    pub indexes: Vec<String>,
    pub views: HashMap<String, String>,
    pub sources: HashMap<String, SourceDef>,
    pub functions: HashMap<String, FunctionDef>,
    pub config: BundleConfig,
    pub attached_urls: Vec<String>,
}

impl Default for BundleState {
    fn default() -> Self {
        BundleState {
            plan: LogicalPlan::empty(),
            name: None,
            description: None,
            indexes: Vec::new(),
            views: HashMap::new(),
            sources: HashMap::new(),
            functions: HashMap::new(),
            config: BundleConfig::new(),
            attached_urls: Vec::new(),
        }
    }
}

pub fn resolve(commits: &[Commit]) -> Result<BundleState> {
    let mut state = BundleState::default();
    for commit in commits {
        for op in &commit.operations {
            apply_one(&mut state, op)?;
        }
    }
    Ok(state)
}

/// Folds a single operation into an already-resolved state, used both by
/// `resolve` and by a builder advancing its in-memory view after a commit
/// succeeds, without re-reading the whole log.
pub fn apply_one(state: &mut BundleState, op: &Operation) -> Result<()> {
    let plan = std::mem::replace(&mut state.plan, LogicalPlan::empty());
    state.plan = plan::apply(plan, op)?;
    apply_metadata(state, op);
    Ok(())
}

fn apply_metadata(state: &mut BundleState, op: &Operation) {
    match op {
        Operation::Attach { url, .. } => state.attached_urls.push(url.clone()),
        Operation::AttachToJoin { url, .. } => state.attached_urls.push(url.clone()),
        Operation::DefineFunction {
            name,
            output,
            version,
            ..
        } => {
            state.functions.insert(
                name.clone(),
                FunctionDef {
                    output: output.clone(),
                    version: *version,
                },
            );
        }
        Operation::DefineSource {
            id,
            url_prefix,
            patterns,
            function,
        } => {
            state.sources.insert(
                id.clone(),
                SourceDef {
                    url_prefix: url_prefix.clone(),
                    patterns: patterns.clone(),
                    function: function.clone(),
                },
            );
        }
        Operation::CreateIndex { column } => {
            if !state.indexes.contains(column) {
                state.indexes.push(column.clone());
            }
        }
        Operation::DropIndex { column } => state.indexes.retain(|c| c != column),
        Operation::RebuildIndex { .. } => {}
        Operation::CreateView { name, bundle_id } => {
            state.views.insert(name.clone(), bundle_id.clone());
        }
        Operation::RenameView { from, to } => {
            if let Some(id) = state.views.remove(from) {
                state.views.insert(to.clone(), id);
            }
        }
        Operation::DropView { name } => {
            state.views.remove(name);
        }
        Operation::SetName { name } => state.name = Some(name.clone()),
        Operation::SetDescription { description } => {
            state.description = Some(description.clone())
        }
        Operation::SetConfig {
            key,
            value,
            url_prefix,
        } => {
            state.config.set(key.clone(), value.clone(), url_prefix.clone());
        }
        _ => {}
    }
}
