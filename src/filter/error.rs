use thiserror::Error;

/// Rejections raised while compiling a filter document into SQL. Every
/// variant is the caller's fault and surfaces as a 400.
#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Malformed condition: {0}")]
    InvalidWhere(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid paging: {0}")]
    InvalidPaging(String),
}
