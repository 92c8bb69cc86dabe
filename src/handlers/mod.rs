// handlers/mod.rs - Handlers grouped by access tier
//
// Public (no auth) → Protected (any signed-in role) → Elevated (Administrator)
// The JWT middleware runs for protected and elevated routes; handlers then
// check the role their operation needs.
pub mod elevated;
pub mod protected;
pub mod public;

use uuid::Uuid;

use crate::error::ApiError;

/// Path ids are parsed by hand so a malformed id gets the JSON error envelope.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid product id '{}'", raw)))
}
