//! Minimal columnar schema shared across the resolver, engine trait
//! boundary, and index manager. Deliberately smaller than Arrow's own
//! `Schema` — the core only needs field names, a coarse type tag, and
//! nullability to detect §4.4's schema-merge conflicts and to answer
//! `schema()`/`num_rows()` without depending on a specific Arrow version.

use std::fmt;

use crate::errors::{BundlebaseError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    Int64,
    Float64,
    Utf8,
    Utf8View,
    Bool,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Int64 => "Int64",
            DataType::Float64 => "Float64",
            DataType::Utf8 => "Utf8",
            DataType::Utf8View => "Utf8View",
            DataType::Bool => "Bool",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Field {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn empty() -> Self {
        Schema { fields: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, name: &str) -> Result<&Field> {
        self.fields.iter().find(|f| f.name == name).ok_or_else(|| {
            let available: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
            BundlebaseError::ColumnNotFound(crate::errors::with_alternatives(
                format!("no such column '{name}'"),
                &available,
            ))
        })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn without(&self, name: &str) -> Result<Schema> {
        self.field(name)?;
        Ok(Schema {
            fields: self
                .fields
                .iter()
                .filter(|f| f.name != name)
                .cloned()
                .collect(),
        })
    }

    pub fn renamed(&self, from: &str, to: &str) -> Result<Schema> {
        self.field(from)?;
        Ok(Schema {
            fields: self
                .fields
                .iter()
                .map(|f| {
                    if f.name == from {
                        Field::new(to, f.data_type, f.nullable)
                    } else {
                        f.clone()
                    }
                })
                .collect(),
        })
    }

    pub fn projected(&self, names: &[String]) -> Result<Schema> {
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            fields.push(self.field(name)?.clone());
        }
        Ok(Schema { fields })
    }

    /// Merges another schema into this one per §4.4's tie-break rule:
    /// fields must share name and type; nullability conflicts resolve to
    /// nullable.
    pub fn merge(&self, other: &Schema) -> Result<Schema> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if self.fields.len() != other.fields.len() {
            return Err(BundlebaseError::SchemaConflict(format!(
                "field count mismatch: {} vs {}",
                self.fields.len(),
                other.fields.len()
            )));
        }
        let mut merged = Vec::with_capacity(self.fields.len());
        for left in &self.fields {
            let right = other
                .fields
                .iter()
                .find(|f| f.name == left.name)
                .ok_or_else(|| {
                    BundlebaseError::SchemaConflict(format!(
                        "field '{}' missing from one of the merged schemas",
                        left.name
                    ))
                })?;
            if left.data_type != right.data_type {
                return Err(BundlebaseError::SchemaConflict(format!(
                    "field '{}' has conflicting types {} and {}",
                    left.name, left.data_type, right.data_type
                )));
            }
            merged.push(Field::new(
                left.name.clone(),
                left.data_type,
                left.nullable || right.nullable,
            ));
        }
        Ok(Schema { fields: merged })
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{}: {}", field.name, field.data_type))
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}
