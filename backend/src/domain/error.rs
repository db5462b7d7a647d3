//! Domain-level error type.
//!
//! Transport agnostic: inbound adapters map the stable [`ErrorCode`] to
//! HTTP statuses, the scheduler just logs it. Duplicate registrations and
//! duplicate actions are deliberately *not* errors — they are successful
//! outcomes carrying an "already recorded" flag (see the registration and
//! completion services).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The requested resource does not exist.
    NotFound,
    /// The event is already at capacity; the registration was rejected.
    CapacityExceeded,
    /// The write conflicts with existing state (e.g. a closed event).
    Conflict,
    /// A backing store or collaborator is temporarily unavailable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the engine.
    InternalError,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` is non-empty once trimmed of whitespace; the constructors
///   enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Error {
    /// Create a new error.
    ///
    /// # Panics
    ///
    /// Panics when `message` is blank; callers construct errors from
    /// literals, so a blank message is a programming error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        assert!(
            !message.trim().is_empty(),
            "domain error messages must not be blank"
        );
        Self {
            code,
            message,
            details: None,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Supplementary structured details for adapters.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::CapacityExceeded`].
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CapacityExceeded, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn codes_serialise_snake_case() {
        let json = serde_json::to_value(ErrorCode::CapacityExceeded).expect("serialise");
        assert_eq!(json, json!("capacity_exceeded"));
    }

    #[test]
    fn details_are_preserved() {
        let err = Error::capacity_exceeded("event is full")
            .with_details(json!({ "capacity": 5, "registered": 5 }));
        assert_eq!(err.code(), ErrorCode::CapacityExceeded);
        assert_eq!(
            err.details()
                .and_then(|d| d.get("capacity"))
                .and_then(Value::as_i64),
            Some(5)
        );
    }

    #[test]
    #[should_panic(expected = "must not be blank")]
    fn blank_messages_are_rejected() {
        let _ = Error::internal("   ");
    }
}
