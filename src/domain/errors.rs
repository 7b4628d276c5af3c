//! # Domain Error Types
//!
//! Failures reported by the domain collaborators. Handlers turn every variant
//! into an error envelope; none of them cause a broker-level redelivery.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected by a domain rule
    #[error("{message}")]
    Validation { message: String },

    /// Uniqueness rule violated (duplicate e-mail or document number)
    #[error("{message}")]
    Conflict { message: String },

    #[error("{entity} no encontrado")]
    NotFound { entity: String },

    /// Backing store failure
    #[error("Error de almacenamiento: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Stable category name for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Conflict { .. } => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::Storage { .. } => "storage",
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
