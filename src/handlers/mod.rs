//! # Request Handlers
//!
//! One handler per supported (entity, action). Every handler has the same
//! contract:
//!
//! - request decode defects return `Err(HandlerError)`; the delivery is nacked
//! - domain outcomes, including failures, return `Ok(ResponseEnvelope)`; the
//!   delivery is acked

pub mod crud;
pub mod resources;
pub mod usuario;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::domain::DomainError;
use crate::messaging::{Action, DecodeError, Entity, ResponseEnvelope};

pub use resources::{Cuidadores, Medicos, Pacientes};

/// Failures that make a delivery eligible for redelivery
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Response serialization failed: {message}")]
    Serialization { message: String },

    #[error("Handler timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },
}

impl HandlerError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Stable category name for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Serialization { .. } => "serialization",
            Self::Timeout { .. } => "timeout",
        }
    }
}

pub type HandlerResult = Result<ResponseEnvelope, HandlerError>;

/// Serialize a domain record into envelope data
pub(crate) fn to_data<T: Serialize>(record: &T) -> Result<Value, HandlerError> {
    serde_json::to_value(record).map_err(|e| HandlerError::serialization(e.to_string()))
}

/// Convert a domain failure into the envelope returned to the caller
pub(crate) fn domain_failure(entity: Entity, action: Action, error: DomainError) -> ResponseEnvelope {
    warn!(
        entity = %entity,
        action = %action,
        error_kind = error.kind(),
        error = %error,
        "Domain operation failed"
    );

    match error {
        DomainError::NotFound { .. } => ResponseEnvelope::not_found(error.to_string()),
        other => ResponseEnvelope::error(other.to_string()),
    }
}
