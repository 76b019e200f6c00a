//! Index bookkeeping layered over the resolved [`crate::resolver::BundleState`].
//!
//! Creating/dropping/rebuilding an index is just another logged operation
//! (see [`crate::operation::Operation`]); this module only validates the
//! requests against the current schema before they're staged, so a
//! builder never has to round-trip to the engine to find out a column
//! doesn't exist or is the wrong type.

use crate::errors::{BundlebaseError, Result};
use crate::schema::{DataType, Schema};

/// Checked once the engine knows the bundle's schema (the builder itself
/// only staged the operation and has no schema to check against yet).
pub fn validate_type(schema: &Schema, column: &str) -> Result<()> {
    let field = schema.field(column)?;
    if field.data_type == DataType::Utf8View {
        return Err(BundlebaseError::UnsupportedIndexType(format!(
            "column '{column}' has type Utf8View, which cannot be indexed"
        )));
    }
    Ok(())
}

pub fn validate_drop(column: &str, existing: &[String]) -> Result<()> {
    if !existing.iter().any(|c| c == column) {
        return Err(BundlebaseError::IndexNotFound(column.to_string()));
    }
    Ok(())
}

pub fn validate_rebuild(column: &str, existing: &[String]) -> Result<()> {
    validate_drop(column, existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn schema() -> Schema {
        Schema {
            fields: vec![
                Field::new("id", DataType::Int64, false),
                Field::new("blob", DataType::Utf8View, true),
            ],
        }
    }

    #[test]
    fn create_rejects_utf8_view_columns() {
        let err = validate_type(&schema(), "blob").unwrap_err();
        assert!(matches!(err, BundlebaseError::UnsupportedIndexType(_)));
    }

    #[test]
    fn create_succeeds_for_indexable_column() {
        assert!(validate_type(&schema(), "id").is_ok());
    }

    #[test]
    fn drop_on_absent_index_names_the_column() {
        let err = validate_drop("nonexistent", &["id".to_string()]).unwrap_err();
        assert!(matches!(err, BundlebaseError::IndexNotFound(ref c) if c == "nonexistent"));
    }
}
