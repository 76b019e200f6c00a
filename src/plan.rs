//! Logical query plan and the pure fold that builds it from the operation
//! log. `apply` never touches storage — it only has to know how prior
//! operations reshape the plan tree so the resolver can hand the result to
//! an [`crate::engine::ExecutionEngine`].

use crate::engine::Predicate;
use crate::errors::{BundlebaseError, Result};
use crate::operation::Operation;
use crate::schema::Schema;

#[derive(Clone, Debug, PartialEq)]
pub enum LogicalPlan {
    Empty(Schema),
    Scan {
        url: String,
        schema: Schema,
        /// Explicit `format_hint` from the staging `Attach`, consulted
        /// ahead of the url's extension so pack-store paths (which carry
        /// no extension) still resolve to a decoder.
        decoder_hint: Option<String>,
    },
    Union(Vec<LogicalPlan>),
    Filter {
        input: Box<LogicalPlan>,
        predicate: Predicate,
    },
    Select {
        input: Box<LogicalPlan>,
        columns: Vec<String>,
    },
    RemoveColumn {
        input: Box<LogicalPlan>,
        column: String,
    },
    RenameColumn {
        input: Box<LogicalPlan>,
        from: String,
        to: String,
    },
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        predicate: String,
    },
}

impl LogicalPlan {
    pub fn empty() -> Self {
        LogicalPlan::Empty(Schema::empty())
    }
}

/// Folds a single operation into the running plan. Pure: given the same
/// plan and operation it always produces the same result, independent of
/// any prior or future call.
pub fn apply(plan: LogicalPlan, op: &Operation) -> Result<LogicalPlan> {
    match op {
        Operation::Attach { url, decoder } => {
            let scan = LogicalPlan::Scan {
                url: url.clone(),
                schema: Schema::empty(),
                decoder_hint: decoder.clone(),
            };
            Ok(match plan {
                LogicalPlan::Empty(_) => scan,
                LogicalPlan::Union(mut inputs) => {
                    inputs.push(scan);
                    LogicalPlan::Union(inputs)
                }
                other => LogicalPlan::Union(vec![other, scan]),
            })
        }
        Operation::AttachFunction { name, .. } => {
            let scan = LogicalPlan::Scan {
                url: format!("function://{name}"),
                schema: Schema::empty(),
                decoder_hint: Some("function".to_string()),
            };
            Ok(match plan {
                LogicalPlan::Empty(_) => scan,
                LogicalPlan::Union(mut inputs) => {
                    inputs.push(scan);
                    LogicalPlan::Union(inputs)
                }
                other => LogicalPlan::Union(vec![other, scan]),
            })
        }
        Operation::DefineFunction { .. } | Operation::DefineSource { .. } => Ok(plan),
        Operation::RemoveColumn { column } => Ok(LogicalPlan::RemoveColumn {
            input: Box::new(plan),
            column: column.clone(),
        }),
        Operation::RenameColumn { from, to } => Ok(LogicalPlan::RenameColumn {
            input: Box::new(plan),
            from: from.clone(),
            to: to.clone(),
        }),
        Operation::Filter { expression, params } => Ok(LogicalPlan::Filter {
            input: Box::new(plan),
            predicate: parse_predicate(expression, params)?,
        }),
        // An empty column list means "SELECT * FROM ..." — no projection.
        Operation::Select { columns } if columns.is_empty() => Ok(plan),
        Operation::Select { columns } => Ok(LogicalPlan::Select {
            input: Box::new(plan),
            columns: columns.clone(),
        }),
        Operation::Join { url, predicate, .. } => Ok(LogicalPlan::Join {
            left: Box::new(plan),
            right: Box::new(LogicalPlan::Scan {
                url: url.clone(),
                schema: Schema::empty(),
                decoder_hint: None,
            }),
            predicate: predicate.clone(),
        }),
        Operation::AttachToJoin { join_name: _, url } => Ok(LogicalPlan::Union(vec![
            plan,
            LogicalPlan::Scan {
                url: url.clone(),
                schema: Schema::empty(),
                decoder_hint: None,
            },
        ])),
        // Index, view, and metadata operations are side-channel log entries:
        // they don't reshape what a scan of the bundle's rows returns.
        Operation::CreateIndex { .. }
        | Operation::DropIndex { .. }
        | Operation::RebuildIndex { .. }
        | Operation::CreateView { .. }
        | Operation::RenameView { .. }
        | Operation::DropView { .. }
        | Operation::SetName { .. }
        | Operation::SetDescription { .. }
        | Operation::SetConfig { .. } => Ok(plan),
    }
}

fn parse_predicate(expression: &str, params: &[crate::scalar::Scalar]) -> Result<Predicate> {
    let mut parts = expression.splitn(2, ' ');
    let column = parts.next().unwrap_or("").trim();
    let op = parts.next().unwrap_or("").trim();
    if column.is_empty() || op.is_empty() {
        return Err(BundlebaseError::PlanError(format!(
            "unparseable filter expression: '{expression}'"
        )));
    }
    let comparator = op.chars().next().unwrap_or('=');
    let value = if comparator == '?' {
        params
            .first()
            .cloned()
            .ok_or_else(|| BundlebaseError::PlanError("filter expects a bound parameter".into()))?
    } else {
        let raw = op
            .trim_start_matches(|c| c == '=' || c == '>' || c == '<')
            .trim();
        bind_literal_or_param(raw, params)?
    };
    match comparator {
        '=' => Ok(Predicate::Eq(column.to_string(), value)),
        '>' => Ok(Predicate::Gt(column.to_string(), value)),
        '<' => Ok(Predicate::Lt(column.to_string(), value)),
        '?' => Ok(Predicate::Eq(column.to_string(), value)),
        other => Err(BundlebaseError::PlanError(format!(
            "unsupported filter comparator '{other}'"
        ))),
    }
}

/// Resolves a `$1`, `$2`, … positional placeholder against `params`
/// (1-indexed, left to right); anything else is parsed as a literal.
fn bind_literal_or_param(raw: &str, params: &[crate::scalar::Scalar]) -> Result<crate::scalar::Scalar> {
    if let Some(index) = raw.strip_prefix('$').and_then(|n| n.parse::<usize>().ok()) {
        if index == 0 {
            return Err(BundlebaseError::PlanError(format!(
                "invalid parameter placeholder '{raw}'"
            )));
        }
        return params.get(index - 1).cloned().ok_or_else(|| {
            BundlebaseError::PlanError(format!("filter expects a bound parameter at {raw}"))
        });
    }
    Ok(parse_literal(raw))
}

fn parse_literal(raw: &str) -> crate::scalar::Scalar {
    if let Ok(i) = raw.parse::<i64>() {
        return crate::scalar::Scalar::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return crate::scalar::Scalar::Float(f);
    }
    crate::scalar::Scalar::Utf8(raw.trim_matches('\'').to_string())
}
