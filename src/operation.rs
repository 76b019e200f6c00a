//! The closed set of operations a [`crate::builder::Builder`] stages into
//! a change and that the resolver folds, via [`crate::plan::apply`], into
//! a logical plan. Every variant round-trips through the canonical commit
//! codec, so field order here matters for the on-disk byte layout.

use crate::scalar::Scalar;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Attach {
        url: String,
        decoder: Option<String>,
    },
    AttachFunction {
        name: String,
    },
    DefineFunction {
        name: String,
        output: String,
        version: u32,
        /// Pack-store path of the function body, written by
        /// [`crate::builder::Builder::commit`] before the commit carrying
        /// this operation is appended.
        body_url: String,
    },
    DefineSource {
        id: String,
        url_prefix: String,
        patterns: Vec<String>,
        function: String,
    },
    RemoveColumn {
        column: String,
    },
    RenameColumn {
        from: String,
        to: String,
    },
    Filter {
        expression: String,
        params: Vec<Scalar>,
    },
    Select {
        columns: Vec<String>,
    },
    Join {
        name: String,
        url: String,
        predicate: String,
    },
    AttachToJoin {
        join_name: String,
        url: String,
    },
    CreateIndex {
        column: String,
    },
    DropIndex {
        column: String,
    },
    RebuildIndex {
        column: String,
    },
    CreateView {
        name: String,
        bundle_id: String,
    },
    RenameView {
        from: String,
        to: String,
    },
    DropView {
        name: String,
    },
    SetName {
        name: String,
    },
    SetDescription {
        description: String,
    },
    SetConfig {
        key: String,
        value: serde_json::Value,
        url_prefix: Option<String>,
    },
}

impl Operation {
    /// Tag used by the canonical codec and by `status()`'s human-readable
    /// descriptions; stable across versions since it's persisted.
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::Attach { .. } => "attach",
            Operation::AttachFunction { .. } => "attach_function",
            Operation::DefineFunction { .. } => "define_function",
            Operation::DefineSource { .. } => "define_source",
            Operation::RemoveColumn { .. } => "remove_column",
            Operation::RenameColumn { .. } => "rename_column",
            Operation::Filter { .. } => "filter",
            Operation::Select { .. } => "select",
            Operation::Join { .. } => "join",
            Operation::AttachToJoin { .. } => "attach_to_join",
            Operation::CreateIndex { .. } => "create_index",
            Operation::DropIndex { .. } => "drop_index",
            Operation::RebuildIndex { .. } => "rebuild_index",
            Operation::CreateView { .. } => "create_view",
            Operation::RenameView { .. } => "rename_view",
            Operation::DropView { .. } => "drop_view",
            Operation::SetName { .. } => "set_name",
            Operation::SetDescription { .. } => "set_description",
            Operation::SetConfig { .. } => "set_config",
        }
    }

    /// Human-readable one-liner for `status()`, matching the shape
    /// "Set name to X" / "Attach mem://a.csv" that callers match against.
    pub fn describe(&self) -> String {
        match self {
            Operation::Attach { url, .. } => format!("Attach {url}"),
            Operation::AttachFunction { name } => format!("Attach function {name}"),
            Operation::DefineFunction { name, .. } => format!("Define function {name}"),
            Operation::DefineSource { url_prefix, .. } => format!("Define source {url_prefix}"),
            Operation::RemoveColumn { column } => format!("Remove column {column}"),
            Operation::RenameColumn { from, to } => format!("Rename column {from} to {to}"),
            Operation::Filter { expression, .. } => format!("Filter {expression}"),
            Operation::Select { columns } => format!("Select {}", columns.join(", ")),
            Operation::Join { name, url, .. } => format!("Join {name} with {url}"),
            Operation::AttachToJoin { join_name, url } => {
                format!("Attach {url} to join {join_name}")
            }
            Operation::CreateIndex { column } => format!("Create index on {column}"),
            Operation::DropIndex { column } => format!("Drop index on {column}"),
            Operation::RebuildIndex { column } => format!("Rebuild index on {column}"),
            Operation::CreateView { name, .. } => format!("Create view {name}"),
            Operation::RenameView { from, to } => format!("Rename view {from} to {to}"),
            Operation::DropView { name } => format!("Drop view {name}"),
            Operation::SetName { name } => format!("Set name to {name}"),
            Operation::SetDescription { description } => {
                format!("Set description to {description}")
            }
            Operation::SetConfig { key, .. } => format!("Set config {key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_matches_the_attach_prefix_callers_look_for() {
        let op = Operation::Attach {
            url: "mem://a.csv".into(),
            decoder: None,
        };
        assert!(op.describe().contains("Attach"));
    }

    #[test]
    fn describe_renders_set_name_sentence() {
        let op = Operation::SetName {
            name: "Test Bundle".into(),
        };
        assert_eq!(op.describe(), "Set name to Test Bundle");
    }

    #[test]
    fn tag_is_stable_per_variant() {
        assert_eq!(
            Operation::SetDescription {
                description: "x".into()
            }
            .tag(),
            "set_description"
        );
    }
}
