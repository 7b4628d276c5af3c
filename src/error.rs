//! Top-level consumer errors.
//!
//! Only failures that end or prevent consumption surface here. Everything that
//! happens to a single delivery is settled with ack/nack inside the loop.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Gave up reconnecting after {attempts} attempts: {last_error}")]
    ReconnectExhausted {
        attempts: u32,
        last_error: MessagingError,
    },

    #[error("Consumer task failed: {message}")]
    TaskFailed { message: String },
}

impl ConsumerError {
    pub fn reconnect_exhausted(attempts: u32, last_error: MessagingError) -> Self {
        Self::ReconnectExhausted {
            attempts,
            last_error,
        }
    }

    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsumerError>;
