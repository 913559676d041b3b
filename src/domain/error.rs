use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
}

impl DomainError {
    pub fn empty_field(field: &'static str) -> Self {
        Self::EmptyField { field }
    }
}

/// Trim `value` and reject it when nothing remains.
pub fn require_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::empty_field(field));
    }
    Ok(trimmed.to_string())
}
