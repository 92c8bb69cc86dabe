use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FilterError;

/// Comparison operators accepted under a column key, e.g. `{ "brand": { "$ilike": "dell" } }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    ILike,
    In,
}

impl FilterOp {
    pub fn from_key(key: &str) -> Result<Self, FilterError> {
        Ok(match key {
            "$eq" => FilterOp::Eq,
            "$ne" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    /// Binary SQL operator. `In` is rendered separately.
    pub fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::ILike => "ILIKE",
            FilterOp::In => "IN",
        }
    }
}

/// Where/order/paging document handed to [`super::Filter::assign`].
#[derive(Debug, Clone, Default)]
pub struct FilterData {
    pub where_clause: Option<Value>,
    /// `"col dir, col dir"` or an array of such strings.
    pub order: Option<Value>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than `desc` (any case) is ascending.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn to_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub column: String,
    pub direction: SortDirection,
}

/// SQL text plus positional parameters (`$1..$n`).
#[derive(Debug, Clone)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}
