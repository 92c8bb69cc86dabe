use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter::validate_identifier;
use super::types::FilterOp;

/// Compiles a JSON condition document into a parameterised predicate.
///
/// - `{ "col": value }` is equality, `null` becomes `IS NULL`
/// - `{ "col": { "$op": value } }` uses an operator from [`FilterOp`]
/// - `{ "$or": [ {...}, {...} ] }` and `{ "$and": [...] }` nest
///
/// Sibling keys are joined with `AND`. Placeholders are numbered in the
/// order they are emitted, nested groups included.
#[derive(Default)]
pub struct FilterWhere {
    params: Vec<Value>,
}

impl FilterWhere {
    pub fn generate(conditions: &Value) -> Result<(String, Vec<Value>), FilterError> {
        let mut builder = Self::default();
        let parts = match conditions {
            Value::Null => vec![],
            Value::Object(obj) => builder.object(obj)?,
            _ => return Err(FilterError::InvalidWhere("conditions must be an object".into())),
        };
        let predicate = if parts.is_empty() { "1=1".to_string() } else { parts.join(" AND ") };
        Ok((predicate, builder.params))
    }

    pub fn validate(conditions: &Value) -> Result<(), FilterError> {
        match conditions {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhere("conditions must be an object".into())),
        }
    }

    fn object(&mut self, obj: &Map<String, Value>) -> Result<Vec<String>, FilterError> {
        let mut parts = vec![];
        for (key, value) in obj {
            let part = match key.as_str() {
                "$and" => self.group(key, value, " AND ")?,
                "$or" => self.group(key, value, " OR ")?,
                _ if key.starts_with('$') => return Err(FilterError::UnsupportedOperator(key.clone())),
                _ => Some(self.column(key, value)?),
            };
            parts.extend(part);
        }
        Ok(parts)
    }

    fn group(&mut self, key: &str, value: &Value, joiner: &str) -> Result<Option<String>, FilterError> {
        let branches = value
            .as_array()
            .ok_or_else(|| FilterError::InvalidWhere(format!("{} expects an array", key)))?;
        let mut parts = vec![];
        for branch in branches {
            let obj = branch
                .as_object()
                .ok_or_else(|| FilterError::InvalidWhere(format!("{} entries must be objects", key)))?;
            let inner = self.object(obj)?;
            if !inner.is_empty() {
                parts.push(format!("({})", inner.join(" AND ")));
            }
        }
        Ok((!parts.is_empty()).then(|| format!("({})", parts.join(joiner))))
    }

    fn column(&mut self, column: &str, value: &Value) -> Result<String, FilterError> {
        validate_identifier(column)?;
        let quoted = format!("\"{}\"", column);

        let operators: Vec<(FilterOp, &Value)> = match value {
            Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => obj
                .iter()
                .map(|(key, operand)| Ok((FilterOp::from_key(key)?, operand)))
                .collect::<Result<_, FilterError>>()?,
            _ => vec![(FilterOp::Eq, value)],
        };

        let mut parts = Vec::with_capacity(operators.len());
        for (op, operand) in operators {
            parts.push(self.comparison(&quoted, op, operand)?);
        }
        Ok(parts.join(" AND "))
    }

    fn comparison(&mut self, quoted: &str, op: FilterOp, operand: &Value) -> Result<String, FilterError> {
        Ok(match (op, operand) {
            (FilterOp::Eq, Value::Null) => format!("{} IS NULL", quoted),
            (FilterOp::Ne, Value::Null) => format!("{} IS NOT NULL", quoted),
            (FilterOp::In, Value::Array(values)) if values.is_empty() => "1=0".to_string(),
            (FilterOp::In, Value::Array(values)) => {
                let placeholders: Vec<String> = values.iter().map(|v| self.bind(v.clone())).collect();
                format!("{} IN ({})", quoted, placeholders.join(", "))
            }
            (FilterOp::In, _) => return Err(FilterError::InvalidWhere("$in expects an array".into())),
            (op, operand) => format!("{} {} {}", quoted, op.sql(), self.bind(operand.clone())),
        })
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}
