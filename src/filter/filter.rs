use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, OrderTerm, SqlStatement};

/// Builds `SELECT` and `COUNT` statements for one table from a
/// [`FilterData`] document. Identifiers are validated, values are always
/// bound as parameters.
#[derive(Debug)]
pub struct Filter {
    table: String,
    conditions: Option<Value>,
    order: Vec<OrderTerm>,
    text_columns: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    max_limit: Option<i64>,
}

impl Filter {
    pub fn new(table: impl Into<String>) -> Result<Self, FilterError> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self {
            table,
            conditions: None,
            order: vec![],
            text_columns: vec![],
            limit: None,
            offset: None,
            max_limit: None,
        })
    }

    /// Upper bound applied to any requested limit.
    pub fn max_limit(&mut self, max_limit: Option<i64>) -> &mut Self {
        self.max_limit = max_limit;
        self
    }

    /// Columns ordered through `lower(..)` so case does not split runs.
    pub fn text_columns(&mut self, columns: &[&str]) -> &mut Self {
        self.text_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(conditions) = data.where_clause {
            FilterWhere::validate(&conditions)?;
            self.conditions = Some(conditions);
        }
        if let Some(order) = data.order {
            self.order = FilterOrder::parse(&order)?;
        }
        if let Some(limit) = data.limit {
            self.page(limit, data.offset)?;
        }
        Ok(self)
    }

    fn page(&mut self, limit: i64, offset: Option<i64>) -> Result<(), FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidPaging(format!("limit {} is negative", limit)));
        }
        if let Some(offset) = offset.filter(|o| *o < 0) {
            return Err(FilterError::InvalidPaging(format!("offset {} is negative", offset)));
        }
        self.limit = Some(match self.max_limit {
            Some(max) if limit > max => {
                tracing::debug!("Limit {} capped to {}", limit, max);
                max
            }
            _ => limit,
        });
        self.offset = offset;
        Ok(())
    }

    pub fn to_select_sql(&self) -> Result<SqlStatement, FilterError> {
        let (predicate, params) = self.predicate()?;
        let mut sql = format!("SELECT * FROM \"{}\" WHERE {}", self.table, predicate);

        let order = FilterOrder::generate(&self.order, &self.text_columns);
        if !order.is_empty() {
            sql.push(' ');
            sql.push_str(&order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }
        Ok(SqlStatement { sql, params })
    }

    /// Same predicate as [`Self::to_select_sql`], ignoring order and paging.
    pub fn to_count_sql(&self) -> Result<SqlStatement, FilterError> {
        let (predicate, params) = self.predicate()?;
        let sql = format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table, predicate);
        Ok(SqlStatement { sql, params })
    }

    fn predicate(&self) -> Result<(String, Vec<Value>), FilterError> {
        FilterWhere::generate(self.conditions.as_ref().unwrap_or(&Value::Null))
    }
}

/// Identifiers must match `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<(), FilterError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FilterError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_paged_select_and_matching_count() {
        let mut filter = Filter::new("products").unwrap();
        filter.max_limit(Some(100)).text_columns(&["name"]);
        filter
            .assign(FilterData {
                where_clause: Some(json!({ "status": "available" })),
                order: Some(json!("name asc, id asc")),
                limit: Some(500),
                offset: Some(0),
            })
            .unwrap();

        let select = filter.to_select_sql().unwrap();
        assert_eq!(
            select.sql,
            "SELECT * FROM \"products\" WHERE \"status\" = $1 \
             ORDER BY lower(\"name\") ASC NULLS LAST, \"id\" ASC NULLS LAST LIMIT 100 OFFSET 0"
        );
        assert_eq!(select.params, vec![json!("available")]);

        let count = filter.to_count_sql().unwrap();
        assert_eq!(count.sql, "SELECT COUNT(*) AS count FROM \"products\" WHERE \"status\" = $1");
    }

    #[test]
    fn rejects_bad_identifiers_and_paging() {
        assert!(Filter::new("products; drop").is_err());
        assert!(Filter::new("").is_err());
        assert!(Filter::new("1products").is_err());

        let mut filter = Filter::new("products").unwrap();
        let err = filter.assign(FilterData { limit: Some(-1), ..Default::default() }).unwrap_err();
        assert!(matches!(err, FilterError::InvalidPaging(_)));
    }
}
