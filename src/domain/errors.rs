use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("No ledger entry or contact matches {0}")]
    CorrelationMiss(String),
    #[error("Persistence failure: {0}")]
    Persistence(#[from] anyhow::Error),
}
