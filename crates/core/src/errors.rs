use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::claim::ClaimId;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("claim not found: {0}")]
    ClaimNotFound(ClaimId),
    #[error("invalid settlement range: min {min}, recommended {recommended}, max {max}")]
    InvalidSettlementRange { min: Decimal, recommended: Decimal, max: Decimal },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}
