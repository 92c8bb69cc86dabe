use serde_json::Value;

use super::error::FilterError;
use super::filter::validate_identifier;
use super::types::{OrderTerm, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Accepts `"name asc, id asc"` or `["name asc", "id asc"]`.
    pub fn parse(order: &Value) -> Result<Vec<OrderTerm>, FilterError> {
        let terms: Vec<OrderTerm> = match order {
            Value::String(s) => Self::parse_list(s),
            Value::Array(items) => items.iter().filter_map(Value::as_str).flat_map(Self::parse_list).collect(),
            Value::Null => vec![],
            other => return Err(FilterError::InvalidWhere(format!("order must be a string, got {}", other))),
        };
        for term in &terms {
            validate_identifier(&term.column)?;
        }
        Ok(terms)
    }

    fn parse_list(list: &str) -> Vec<OrderTerm> {
        list.split(',')
            .filter_map(|part| {
                let mut words = part.split_whitespace();
                let column = words.next()?;
                Some(OrderTerm {
                    column: column.to_string(),
                    direction: SortDirection::parse_lenient(words.next().unwrap_or("asc")),
                })
            })
            .collect()
    }

    /// Nulls go last in both directions.
    pub fn generate(terms: &[OrderTerm], text_columns: &[String]) -> String {
        if terms.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = terms
            .iter()
            .map(|term| {
                let expr = if text_columns.contains(&term.column) {
                    format!("lower(\"{}\")", term.column)
                } else {
                    format!("\"{}\"", term.column)
                };
                format!("{} {} NULLS LAST", expr, term.direction.to_sql())
            })
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_list_and_array_forms() {
        let terms = FilterOrder::parse(&json!("name asc, cost DESC")).unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1].direction, SortDirection::Desc);

        let terms = FilterOrder::parse(&json!(["created_at desc", "id"])).unwrap();
        assert_eq!(terms[0].column, "created_at");
        assert_eq!(terms[1].direction, SortDirection::Asc);
    }

    #[test]
    fn folds_case_for_text_columns() {
        let terms = FilterOrder::parse(&json!("name desc, cost")).unwrap();
        let sql = FilterOrder::generate(&terms, &["name".to_string()]);
        assert_eq!(sql, "ORDER BY lower(\"name\") DESC NULLS LAST, \"cost\" ASC NULLS LAST");
    }

    #[test]
    fn rejects_injected_column() {
        assert!(FilterOrder::parse(&json!("name;drop asc")).is_err());
    }
}
