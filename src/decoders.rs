//! Format decoders turn raw bytes fetched from a scan URL into a [`Batch`].
//! The core ships CSV and line-delimited JSON decoders, chosen by file
//! extension — enough to exercise attach/source/refresh end to end without
//! a Parquet or Arrow IPC dependency.

use crate::batch::Batch;
use crate::errors::{BundlebaseError, Result};
use crate::schema::{DataType, Field, Schema};
use crate::scalar::Scalar;

pub trait FormatDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Batch>;
}

fn sniff_scalar(raw: &str) -> Scalar {
    if raw.is_empty() {
        return Scalar::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Scalar::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Scalar::Float(f);
    }
    if raw == "true" || raw == "false" {
        return Scalar::Bool(raw == "true");
    }
    Scalar::Utf8(raw.to_string())
}

fn widen(current: DataType, observed: &Scalar) -> DataType {
    match (current, observed) {
        (DataType::Int64, Scalar::Float(_)) => DataType::Float64,
        (DataType::Int64, Scalar::Utf8(_)) => DataType::Utf8,
        (DataType::Float64, Scalar::Utf8(_)) => DataType::Utf8,
        (dt, _) => dt,
    }
}

/// Decodes a comma-separated file with a header row. Column types are
/// inferred from the cells: a column stays `Int64` until a non-integer
/// value widens it to `Float64` or `Utf8`.
pub struct CsvDecoder;

impl FormatDecoder for CsvDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Batch> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| BundlebaseError::DecodeError(format!("invalid utf-8: {e}")))?;
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| BundlebaseError::DecodeError("csv source has no header row".into()))?;
        let names: Vec<&str> = header.split(',').collect();

        let mut rows: Vec<Vec<Scalar>> = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split(',').collect();
            if cells.len() != names.len() {
                return Err(BundlebaseError::DecodeError(format!(
                    "row has {} cells but header declares {}",
                    cells.len(),
                    names.len()
                )));
            }
            rows.push(cells.iter().map(|c| sniff_scalar(c)).collect());
        }

        let mut types = vec![DataType::Int64; names.len()];
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                types[i] = widen(types[i], cell);
            }
        }

        let fields = names
            .iter()
            .zip(types)
            .map(|(name, ty)| Field::new(*name, ty, true))
            .collect();
        Batch::new(Schema { fields }, rows)
    }
}

/// Decodes newline-delimited JSON objects, one row per line. Keys from the
/// first line establish column order; later lines may omit keys, which
/// decode as `Null`.
pub struct JsonLinesDecoder;

impl FormatDecoder for JsonLinesDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Batch> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| BundlebaseError::DecodeError(format!("invalid utf-8: {e}")))?;
        let mut names: Vec<String> = Vec::new();
        let mut objects: Vec<serde_json::Map<String, serde_json::Value>> = Vec::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let value: serde_json::Value = serde_json::from_str(line)
                .map_err(|e| BundlebaseError::DecodeError(format!("invalid json line: {e}")))?;
            let obj = value.as_object().ok_or_else(|| {
                BundlebaseError::DecodeError("json line is not an object".into())
            })?;
            for key in obj.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
            objects.push(obj.clone());
        }

        let mut types = vec![DataType::Int64; names.len()];
        let mut rows = Vec::with_capacity(objects.len());
        for obj in &objects {
            let mut row = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                let scalar = match obj.get(name) {
                    Some(serde_json::Value::Null) | None => Scalar::Null,
                    Some(serde_json::Value::Bool(b)) => Scalar::Bool(*b),
                    Some(serde_json::Value::Number(n)) => n
                        .as_i64()
                        .map(Scalar::Int)
                        .unwrap_or_else(|| Scalar::Float(n.as_f64().unwrap_or(0.0))),
                    Some(serde_json::Value::String(s)) => Scalar::Utf8(s.clone()),
                    Some(other) => Scalar::Utf8(other.to_string()),
                };
                if !scalar.is_null() {
                    types[i] = widen(types[i], &scalar);
                }
                row.push(scalar);
            }
            rows.push(row);
        }

        let fields = names
            .iter()
            .zip(types)
            .map(|(name, ty)| Field::new(name.clone(), ty, true))
            .collect();
        Batch::new(Schema { fields }, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_infers_int_and_utf8_columns() {
        let batch = CsvDecoder.decode(b"id,name\n1,alice\n2,bob\n").unwrap();
        assert_eq!(batch.schema.fields[0].data_type, DataType::Int64);
        assert_eq!(batch.schema.fields[1].data_type, DataType::Utf8);
        assert_eq!(batch.num_rows(), 2);
    }

    #[test]
    fn csv_widens_column_on_mixed_types() {
        let batch = CsvDecoder.decode(b"n\n1\n2.5\n").unwrap();
        assert_eq!(batch.schema.fields[0].data_type, DataType::Float64);
    }

    #[test]
    fn csv_rejects_empty_source() {
        let err = CsvDecoder.decode(b"").unwrap_err();
        assert!(matches!(err, BundlebaseError::DecodeError(_)));
    }

    #[test]
    fn json_lines_unions_keys_across_rows() {
        let batch = JsonLinesDecoder
            .decode(b"{\"id\":1,\"name\":\"a\"}\n{\"id\":2}\n")
            .unwrap();
        assert_eq!(batch.schema.fields.len(), 2);
        let name_idx = batch.column_index("name").unwrap();
        assert_eq!(batch.rows[1][name_idx], Scalar::Null);
    }
}
