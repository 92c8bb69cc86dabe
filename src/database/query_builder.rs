use serde_json::Value;
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use std::marker::PhantomData;

use crate::database::store::StoreError;
use crate::filter::{Filter, FilterData, SqlStatement};

/// Binds JSON parameters produced by the filter compiler onto a sqlx query.
/// `$in` arrays are already expanded to one placeholder per element.
macro_rules! bind_json {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for value in $params {
            query = match value {
                Value::Null => query.bind(Option::<String>::None),
                Value::Bool(b) => query.bind(*b),
                Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => query.bind(i),
                    (None, Some(f)) => query.bind(f),
                    (None, None) => query.bind(n.to_string()),
                },
                Value::String(s) => query.bind(s.as_str()),
                Value::Array(_) | Value::Object(_) => query.bind(value.clone()),
            };
        }
        query
    }};
}

/// One filtered, paged read against a table whose rows decode into `T`.
pub struct QueryBuilder<T> {
    filter: Filter,
    _row: PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table: &str) -> Result<Self, StoreError> {
        Ok(Self { filter: Filter::new(table)?, _row: PhantomData })
    }

    pub fn text_columns(mut self, columns: &[&str]) -> Self {
        self.filter.text_columns(columns);
        self
    }

    pub fn max_limit(mut self, max_limit: Option<i64>) -> Self {
        self.filter.max_limit(max_limit);
        self
    }

    pub fn filter(mut self, data: FilterData) -> Result<Self, StoreError> {
        self.filter.assign(data)?;
        Ok(self)
    }

    /// Total matching rows (ignoring paging) and the requested page.
    pub async fn fetch_page(self, pool: &PgPool) -> Result<(i64, Vec<T>), StoreError> {
        let SqlStatement { sql, params } = self.filter.to_count_sql()?;
        let total: i64 = bind_json!(sqlx::query(&sql), params.iter()).fetch_one(pool).await?.try_get("count")?;

        let SqlStatement { sql, params } = self.filter.to_select_sql()?;
        tracing::debug!(%sql, params = params.len(), total, "Filtered select");
        let rows = bind_json!(sqlx::query_as::<_, T>(&sql), params.iter()).fetch_all(pool).await?;
        Ok((total, rows))
    }
}
