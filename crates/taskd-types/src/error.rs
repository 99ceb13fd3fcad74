use thiserror::Error;

/// Errors produced when a record or request payload fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field `{field}` must not be empty")]
    EmptyField { field: &'static str },

    #[error("record id must not be empty")]
    EmptyId,
}

impl ValidationError {
    pub fn empty(field: &'static str) -> Self {
        Self::EmptyField { field }
    }
}
