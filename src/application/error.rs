use thiserror::Error;

use crate::{
    application::{media::MediaError, repos::RepoError},
    config::LoadError,
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Reply used whenever the store fails; details only go to the log.
pub const SYSTEM_ERROR_NOTE: &str = "A system error occurred, please try again later.";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{kind} `{keyword}` already exists")]
    Conflict { kind: &'static str, keyword: String },
    #[error("{kind} `{keyword}` does not exist")]
    NotFound { kind: &'static str, keyword: String },
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("store failure: {0}")]
    Store(#[source] RepoError),
}

impl ContentError {
    pub fn conflict(kind: &'static str, keyword: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            keyword: keyword.into(),
        }
    }

    pub fn not_found(kind: &'static str, keyword: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            keyword: keyword.into(),
        }
    }

    /// Text safe to show to whoever issued the command.
    pub fn public_message(&self) -> String {
        match self {
            ContentError::Validation(message) => message.clone(),
            ContentError::Conflict { kind, keyword } => {
                format!("The {kind} `{keyword}` already exists.")
            }
            ContentError::NotFound { kind, keyword } => {
                format!("The {kind} `{keyword}` does not exist.")
            }
            ContentError::Pattern(err) => format!("The search pattern is invalid: {err}"),
            ContentError::Media(err) => format!("Saving the embedded images failed: {err}"),
            ContentError::Store(_) => SYSTEM_ERROR_NOTE.to_string(),
        }
    }
}

impl From<DomainError> for ContentError {
    fn from(error: DomainError) -> Self {
        Self::Validation(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_hide_details() {
        let error = ContentError::Store(RepoError::from_persistence("connection reset"));
        assert_eq!(error.public_message(), SYSTEM_ERROR_NOTE);
        assert!(error.to_string().contains("connection reset"));
    }

    #[test]
    fn empty_field_becomes_validation() {
        let error = ContentError::from(DomainError::empty_field("keyword"));
        assert!(matches!(error, ContentError::Validation(_)));
        assert_eq!(error.public_message(), "keyword must not be empty");
    }

    #[test]
    fn conflict_names_kind_and_keyword() {
        let error = ContentError::conflict("topic", "menu");
        assert_eq!(error.public_message(), "The topic `menu` already exists.");
    }
}
