// Shape validator — converts parsed JSON into rows and checks them against the columns.

use serde_json::Value;

use skugen_types::{ColumnSet, Error, Row, RowBatch};

/// Convert the parsed array into rows.
///
/// Every element must be a JSON object. Expected columns come first, in
/// column-set order, followed by any extra keys the model added. Scalars are
/// rendered as text and `null` becomes an empty string; nested values are
/// kept as compact JSON.
pub fn into_row_batch(values: Vec<Value>, columns: &ColumnSet) -> Result<RowBatch, Error> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(mut object) => {
                let mut row = Row::new();
                for column in columns {
                    if let Some(value) = object.remove(column) {
                        row.insert(column.as_str(), cell_text(value));
                    }
                }
                for (key, value) in object {
                    row.insert(key, cell_text(value));
                }
                Ok(row)
            }
            other => Err(Error::shape(format!(
                "row {} is not an object: {}",
                index + 1,
                json_type(&other)
            ))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(RowBatch::new)
}

/// Check that every row has every column and no blank values.
///
/// Stops at the first offending row. Extra columns are allowed.
pub fn validate_batch(batch: &RowBatch, columns: &ColumnSet) -> Result<(), Error> {
    for (index, row) in batch.iter().enumerate() {
        let missing: Vec<&str> = columns
            .iter()
            .map(String::as_str)
            .filter(|column| !row.contains(column))
            .collect();
        if !missing.is_empty() {
            return Err(Error::shape(format!(
                "row {} is missing columns: {}",
                index + 1,
                missing.join(", ")
            )));
        }

        let empty: Vec<&str> = row
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(column, _)| column.as_str())
            .collect();
        if !empty.is_empty() {
            return Err(Error::shape(format!(
                "row {} has empty values for: {}",
                index + 1,
                empty.join(", ")
            )));
        }
    }
    Ok(())
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
