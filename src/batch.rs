//! Row-oriented in-memory batch type used by the bundled execution engine
//! and format decoders. An external `ExecutionEngine` is free to use its
//! own columnar representation; this type only has to be good enough to
//! make the crate's own test suite self-sufficient.

use crate::errors::{BundlebaseError, Result};
use crate::scalar::Scalar;
use crate::schema::Schema;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    pub schema: Schema,
    pub rows: Vec<Vec<Scalar>>,
}

impl Batch {
    pub fn new(schema: Schema, rows: Vec<Vec<Scalar>>) -> Result<Self> {
        for row in &rows {
            if row.len() != schema.len() {
                return Err(BundlebaseError::ExecutionError(format!(
                    "row has {} cells but schema has {} fields",
                    row.len(),
                    schema.len()
                )));
            }
        }
        Ok(Batch { schema, rows })
    }

    pub fn empty(schema: Schema) -> Self {
        Batch {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.schema
            .fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| BundlebaseError::ColumnNotFound(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<Vec<&Scalar>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn select(&self, names: &[String]) -> Result<Batch> {
        let schema = self.schema.projected(names)?;
        let indices: Vec<usize> = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<_>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Batch { schema, rows })
    }

    pub fn without_column(&self, name: &str) -> Result<Batch> {
        let idx = self.column_index(name)?;
        let schema = self.schema.without(name)?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .collect();
        Ok(Batch { schema, rows })
    }

    pub fn renamed_column(&self, from: &str, to: &str) -> Result<Batch> {
        let schema = self.schema.renamed(from, to)?;
        Ok(Batch {
            schema,
            rows: self.rows.clone(),
        })
    }

    /// Concatenates two batches with identical schemas, merging the field
    /// nullability the way `Schema::merge` does.
    pub fn concat(&self, other: &Batch) -> Result<Batch> {
        let schema = self.schema.merge(&other.schema)?;
        let mut rows = self.rows.clone();
        rows.extend(other.rows.iter().cloned());
        Ok(Batch { schema, rows })
    }

    pub fn filter<F>(&self, mut predicate: F) -> Batch
    where
        F: FnMut(&[Scalar]) -> bool,
    {
        Batch {
            schema: self.schema.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| predicate(row))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataType, Field};

    fn sample() -> Batch {
        let schema = Schema {
            fields: vec![
                Field::new("id", DataType::Int64, false),
                Field::new("name", DataType::Utf8, true),
            ],
        };
        Batch::new(
            schema,
            vec![
                vec![Scalar::Int(1), Scalar::Utf8("a".into())],
                vec![Scalar::Int(2), Scalar::Utf8("b".into())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_mismatched_row_width() {
        let schema = Schema {
            fields: vec![Field::new("id", DataType::Int64, false)],
        };
        let err = Batch::new(schema, vec![vec![Scalar::Int(1), Scalar::Int(2)]]).unwrap_err();
        assert!(matches!(err, BundlebaseError::ExecutionError(_)));
    }

    #[test]
    fn select_projects_columns_in_order() {
        let batch = sample();
        let projected = batch.select(&["name".to_string(), "id".to_string()]).unwrap();
        assert_eq!(projected.schema.fields[0].name, "name");
        assert_eq!(projected.rows[0][1], Scalar::Int(1));
    }

    #[test]
    fn without_column_drops_the_named_field_and_cell() {
        let batch = sample();
        let dropped = batch.without_column("name").unwrap();
        assert_eq!(dropped.schema.fields.len(), 1);
        assert_eq!(dropped.rows[0].len(), 1);
    }

    #[test]
    fn filter_keeps_only_matching_rows() {
        let batch = sample();
        let idx = batch.column_index("id").unwrap();
        let filtered = batch.filter(|row| row[idx] == Scalar::Int(2));
        assert_eq!(filtered.num_rows(), 1);
    }

    #[test]
    fn concat_merges_schemas_and_appends_rows() {
        let a = sample();
        let b = sample();
        let combined = a.concat(&b).unwrap();
        assert_eq!(combined.num_rows(), 4);
    }
}
