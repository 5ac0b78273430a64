use thiserror::Error;

/// Canonical error type exposed by the transposition primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RailError {
    /// Rail count below one. Always caller-fixable.
    #[error("invalid rail key {0}: at least one rail is required")]
    InvalidKey(i64),
}
