//! # Request and Response Envelopes
//!
//! Requests are loosely-shaped JSON objects; each handler pulls out only the
//! fields it needs (`Data`, `Id`, `NroDocumento`, `IdRol`). Responses always
//! have the same shape:
//!
//! ```json
//! {"success": true, "data": {...}, "message": "...", "count": 3, "timestamp": "..."}
//! ```
//!
//! [`ResponseEnvelope`] can only be built through its constructors, which set
//! `timestamp` and guarantee a failed envelope never carries `data`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::errors::MessagingError;

/// Defects in the request body; these cause the delivery to be redelivered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Message body is not valid UTF-8: {message}")]
    InvalidUtf8 { message: String },

    #[error("Malformed JSON: {message}")]
    MalformedJson { message: String },

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Required field '{field}' is missing")]
    MissingField { field: String },

    #[error("Field '{field}' is invalid: {message}")]
    InvalidField { field: String, message: String },

    #[error("Field '{field}' is not a valid GUID: {value}")]
    InvalidGuid { field: String, value: String },
}

impl DecodeError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Parsed request body
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    fields: Map<String, Value>,
}

impl RequestEnvelope {
    pub const DATA: &'static str = "Data";
    pub const ID: &'static str = "Id";
    pub const NRO_DOCUMENTO: &'static str = "NroDocumento";
    pub const ID_ROL: &'static str = "IdRol";

    /// Decode a UTF-8 JSON object
    pub fn parse(body: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(body).map_err(|e| DecodeError::InvalidUtf8 {
            message: e.to_string(),
        })?;

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(_) => Err(DecodeError::NotAnObject),
            Err(e) => Err(DecodeError::MalformedJson {
                message: e.to_string(),
            }),
        }
    }

    fn required(&self, field: &str) -> Result<&Value, DecodeError> {
        self.fields
            .get(field)
            .ok_or_else(|| DecodeError::missing_field(field))
    }

    /// Decode the `Data` object into a typed payload
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let data = self.required(Self::DATA)?;
        T::deserialize(data).map_err(|e| DecodeError::invalid_field(Self::DATA, e.to_string()))
    }

    /// The `Id` field as a GUID
    pub fn id(&self) -> Result<Uuid, DecodeError> {
        let raw = self.string(Self::ID)?;
        Uuid::parse_str(raw).map_err(|_| DecodeError::InvalidGuid {
            field: Self::ID.to_string(),
            value: raw.to_string(),
        })
    }

    /// A required string field
    pub fn string(&self, field: &str) -> Result<&str, DecodeError> {
        self.required(field)?
            .as_str()
            .ok_or_else(|| DecodeError::invalid_field(field, "expected a string"))
    }

    /// A field that must be present but may be `null`
    pub fn nullable_string(&self, field: &str) -> Result<Option<&str>, DecodeError> {
        match self.required(field)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            _ => Err(DecodeError::invalid_field(field, "expected a string")),
        }
    }

    /// A required integer field that fits in `i32`
    pub fn integer(&self, field: &str) -> Result<i32, DecodeError> {
        self.required(field)?
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| DecodeError::invalid_field(field, "expected a 32-bit integer"))
    }
}

/// Response sent to the reply destination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    timestamp: DateTime<Utc>,
}

impl ResponseEnvelope {
    fn new(success: bool) -> Self {
        Self {
            success,
            data: None,
            message: None,
            error: None,
            count: None,
            timestamp: Utc::now(),
        }
    }

    /// `{success: true, data}`
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::new(true)
        }
    }

    /// `{success: true, data, message}`
    pub fn ok_with_message(data: Value, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// `{success: true, message}` with no payload
    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(true)
        }
    }

    /// Lookup result; a miss is `data: null`, not an error
    pub fn lookup(data: Option<Value>) -> Self {
        Self::ok(data.unwrap_or(Value::Null))
    }

    /// `{success: true, data: [...], count}`
    pub fn collection(items: Vec<Value>) -> Self {
        Self {
            count: Some(items.len()),
            ..Self::ok(Value::Array(items))
        }
    }

    /// `{success: false, error}`
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(false)
        }
    }

    /// `{success: false, message, error}` for an entity that does not exist
    pub fn not_found(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: Some(message.clone()),
            message: Some(message),
            ..Self::new(false)
        }
    }

    /// `{success: false, message}`
    pub fn failure_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(false)
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn count(&self) -> Option<usize> {
        self.count
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// UTF-8 JSON body
    pub fn to_bytes(&self) -> Result<Vec<u8>, MessagingError> {
        serde_json::to_vec(self).map_err(|e| MessagingError::serialization(e.to_string()))
    }
}
