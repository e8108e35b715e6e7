use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("counter limits are inverted: min {min} exceeds max {max}")]
    InvertedLimits { min: i64, max: i64 },
}
