// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for PARB.
//!
//! This module defines an error type system that:
//!
//! - Provides clear, descriptive error messages
//! - Distinguishes between retryable and non-retryable errors
//! - Maps every error onto the HTTP code space used by uplink responses
//! - Supports structured logging via stable `error_type` tags
//!
//! # Error Hierarchy
//!
//! ```text
//! ParbError (root)
//! ├── RequestError  - Malformed or unsupported uplink requests (400)
//! ├── AuthError     - Authorization hook denials (401/403)
//! ├── BusError      - Parameter-bus operations (404/408/412/422/...)
//! ├── TxnError      - Transaction engine validation and rollback
//! ├── UplinkError   - Uplink transport failures (never surfaced upstream)
//! └── ConfigError   - Configuration parsing and validation
//! ```
//!
//! # Examples
//!
//! ```
//! use parb_core::error::{BusError, ParbError};
//!
//! let error = BusError::not_found("Device.Missing");
//! assert_eq!(error.status_code(), 404);
//!
//! let parb_error: ParbError = error.into();
//! assert_eq!(parb_error.status_code(), 404);
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::codec::CodecError;

// =============================================================================
// ParbError - Root Error Type
// =============================================================================

/// The root error type for PARB.
///
/// All errors in PARB can be converted to this type, providing a unified
/// handling interface across the entire bridge.
#[derive(Debug, Error)]
pub enum ParbError {
    /// Malformed uplink request.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Authorization denial.
    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    /// Parameter-bus error.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Transaction engine error.
    #[error("Transaction error: {0}")]
    Txn(#[from] TxnError),

    /// Uplink transport error.
    #[error("Uplink error: {0}")]
    Uplink(#[from] UplinkError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ParbError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ParbError::Request(e) => e.status_code(),
            ParbError::Auth(e) => e.status_code(),
            ParbError::Bus(e) => e.status_code(),
            ParbError::Txn(e) => e.status_code(),
            ParbError::Uplink(_) => 503,
            ParbError::Config(_) => 400,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ParbError::Bus(e) => e.is_retryable(),
            ParbError::Uplink(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the error type as a stable tag for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ParbError::Request(_) => "request",
            ParbError::Auth(_) => "auth",
            ParbError::Bus(_) => "bus",
            ParbError::Txn(_) => "txn",
            ParbError::Uplink(_) => "uplink",
            ParbError::Config(_) => "config",
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            ParbError::Request(_) => "잘못된 요청입니다".to_string(),
            ParbError::Auth(_) => "접근 권한이 없습니다".to_string(),
            ParbError::Bus(e) => format!("파라미터 버스 오류: {}", e.user_message()),
            ParbError::Txn(_) => "설정 트랜잭션이 실패했습니다".to_string(),
            ParbError::Uplink(_) => "업링크 통신 오류가 발생했습니다".to_string(),
            ParbError::Config(_) => "설정이 유효하지 않습니다".to_string(),
        }
    }
}

// =============================================================================
// RequestError
// =============================================================================

/// Errors raised while decoding and normalizing uplink requests.
///
/// Every variant maps to HTTP 400; the split exists for diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The payload is not valid JSON or not a JSON object.
    #[error("invalid json payload")]
    MalformedJson,

    /// A required field is missing.
    #[error("missing required field: {field}")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// A field is present but has the wrong JSON type.
    #[error("field '{field}' has wrong type")]
    WrongFieldType {
        /// The offending field name.
        field: String,
    },

    /// The operation discriminator names no known operation.
    #[error("unsupported op: {op}")]
    UnsupportedOp {
        /// The unknown op string.
        op: String,
    },

    /// The WebPA command names no known command.
    #[error("unsupported command: {command}")]
    UnsupportedCommand {
        /// The unknown command string.
        command: String,
    },

    /// A value literal failed codec validation.
    #[error("invalid value: {0}")]
    InvalidValue(#[from] CodecError),
}

impl RequestError {
    /// Creates a missing-field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    /// Creates a wrong-type error.
    pub fn wrong_type(field: impl Into<String>) -> Self {
        Self::WrongFieldType { field: field.into() }
    }

    /// Creates an unsupported-op error.
    pub fn unsupported_op(op: impl Into<String>) -> Self {
        Self::UnsupportedOp { op: op.into() }
    }

    /// Returns the HTTP status code (always 400).
    pub fn status_code(&self) -> u16 {
        400
    }
}

/// A Result type with RequestError.
pub type RequestResult<T> = Result<T, RequestError>;

// =============================================================================
// AuthError
// =============================================================================

/// Authorization hook denials.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The matched rule requires authentication and the context has none.
    #[error("authentication required for '{resource}'")]
    Unauthenticated {
        /// The resource being accessed.
        resource: String,
    },

    /// The context is authenticated but lacks role or permission.
    #[error("access to '{resource}' denied")]
    Forbidden {
        /// The resource being accessed.
        resource: String,
    },
}

impl AuthError {
    /// Creates an unauthenticated error.
    pub fn unauthenticated(resource: impl Into<String>) -> Self {
        Self::Unauthenticated { resource: resource.into() }
    }

    /// Creates a forbidden error.
    pub fn forbidden(resource: impl Into<String>) -> Self {
        Self::Forbidden { resource: resource.into() }
    }

    /// Returns the HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Unauthenticated { .. } => 401,
            AuthError::Forbidden { .. } => 403,
        }
    }
}

// =============================================================================
// BusError
// =============================================================================

/// Parameter-bus operation errors.
///
/// Backend-native error codes are mapped onto this taxonomy by the adapter;
/// the variants mirror the HTTP statuses surfaced in uplink responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Parameter or element does not exist.
    #[error("element not found: {name}")]
    NotFound {
        /// The missing parameter name.
        name: String,
    },

    /// The bus rejected the access.
    #[error("access denied: {name}")]
    AccessDenied {
        /// The parameter name.
        name: String,
    },

    /// The bus did not answer in time.
    #[error("bus operation timed out after {duration:?}")]
    Timeout {
        /// The timeout that elapsed.
        duration: Duration,
    },

    /// Element already exists.
    #[error("element already exists: {name}")]
    AlreadyExists {
        /// The conflicting parameter name.
        name: String,
    },

    /// TEST_AND_SET expected-value mismatch.
    #[error("precondition failed for '{name}': current value does not match")]
    PreconditionFailed {
        /// The parameter name.
        name: String,
    },

    /// The bus rejected the value during coercion.
    #[error("value rejected for '{name}': {message}")]
    InvalidValue {
        /// The parameter name.
        name: String,
        /// The bus's rejection message.
        message: String,
    },

    /// The element is locked by another writer.
    #[error("element locked: {name}")]
    Locked {
        /// The parameter name.
        name: String,
    },

    /// The bus is shedding load.
    #[error("too many outstanding bus requests")]
    Busy,

    /// The operation is not supported by this backend.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation name.
        operation: String,
    },

    /// The bus handle is not open or the bus ran out of resources.
    #[error("bus unavailable: {message}")]
    Unavailable {
        /// Detail message.
        message: String,
    },

    /// A wildcard expansion was requested on a non-wildcard name.
    #[error("'{name}' is not a group wildcard")]
    NotWildcard {
        /// The offending name.
        name: String,
    },

    /// Unclassified bus failure.
    #[error("bus internal error: {message}")]
    Internal {
        /// Detail message.
        message: String,
    },
}

impl BusError {
    /// Creates a not-found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an access-denied error.
    pub fn access_denied(name: impl Into<String>) -> Self {
        Self::AccessDenied { name: name.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Creates an already-exists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    /// Creates a precondition-failed error.
    pub fn precondition_failed(name: impl Into<String>) -> Self {
        Self::PreconditionFailed { name: name.into() }
    }

    /// Creates an invalid-value error.
    pub fn invalid_value(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Creates a not-supported error.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported { operation: operation.into() }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            BusError::NotFound { .. } => 404,
            BusError::AccessDenied { .. } => 403,
            BusError::Timeout { .. } => 408,
            BusError::AlreadyExists { .. } => 409,
            BusError::PreconditionFailed { .. } => 412,
            BusError::InvalidValue { .. } => 422,
            BusError::Locked { .. } => 423,
            BusError::Busy => 429,
            BusError::NotSupported { .. } => 501,
            BusError::Unavailable { .. } => 503,
            BusError::NotWildcard { .. } => 400,
            BusError::Internal { .. } => 500,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BusError::Timeout { .. } | BusError::Busy | BusError::Unavailable { .. }
        )
    }

    /// Returns the error type for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            BusError::NotFound { .. } => "not_found",
            BusError::AccessDenied { .. } => "access_denied",
            BusError::Timeout { .. } => "timeout",
            BusError::AlreadyExists { .. } => "already_exists",
            BusError::PreconditionFailed { .. } => "precondition_failed",
            BusError::InvalidValue { .. } => "invalid_value",
            BusError::Locked { .. } => "locked",
            BusError::Busy => "busy",
            BusError::NotSupported { .. } => "not_supported",
            BusError::Unavailable { .. } => "unavailable",
            BusError::NotWildcard { .. } => "not_wildcard",
            BusError::Internal { .. } => "internal",
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            BusError::NotFound { name } => format!("파라미터를 찾을 수 없습니다: {}", name),
            BusError::AccessDenied { name } => format!("접근이 거부되었습니다: {}", name),
            BusError::Timeout { .. } => "버스 응답 시간 초과".to_string(),
            BusError::AlreadyExists { name } => format!("이미 존재하는 파라미터입니다: {}", name),
            BusError::PreconditionFailed { .. } => "사전 조건이 일치하지 않습니다".to_string(),
            BusError::InvalidValue { name, .. } => format!("잘못된 값입니다: {}", name),
            BusError::Locked { name } => format!("파라미터가 잠겨 있습니다: {}", name),
            BusError::Busy => "요청이 너무 많습니다".to_string(),
            BusError::NotSupported { .. } => "지원하지 않는 동작입니다".to_string(),
            BusError::Unavailable { .. } => "버스에 연결되어 있지 않습니다".to_string(),
            BusError::NotWildcard { name } => format!("와일드카드가 아닙니다: {}", name),
            BusError::Internal { .. } => "버스 내부 오류가 발생했습니다".to_string(),
        }
    }
}

/// A Result type with BusError.
pub type BusResult<T> = Result<T, BusError>;

// =============================================================================
// TxnError
// =============================================================================

/// Transaction engine errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxnError {
    /// The transaction exceeds the configured size bound.
    #[error("transaction has {size} parameters, limit is {max}")]
    TooLarge {
        /// Number of parameters in the transaction.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A parameter entry has an empty name.
    #[error("parameter at index {index} has an empty name")]
    EmptyName {
        /// Index of the offending parameter.
        index: usize,
    },

    /// A mutating entry is missing its value.
    #[error("missing value for parameter '{name}'")]
    MissingValue {
        /// The parameter name.
        name: String,
    },

    /// Restoring the snapshot failed after an atomic abort.
    #[error("rollback failed for transaction {transaction_id}: {message}")]
    RollbackFailed {
        /// The transaction id.
        transaction_id: String,
        /// Detail message.
        message: String,
    },
}

impl TxnError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            TxnError::RollbackFailed { .. } => 500,
            _ => 400,
        }
    }
}

// =============================================================================
// UplinkError
// =============================================================================

/// Uplink transport errors.
///
/// These are logged and the offending frame dropped; they never bubble out
/// as request errors.
#[derive(Debug, Error)]
pub enum UplinkError {
    /// The transport is closed.
    #[error("uplink transport closed")]
    Closed,

    /// Sending a frame failed.
    #[error("failed to send frame: {message}")]
    SendFailed {
        /// Detail message.
        message: String,
    },

    /// A frame could not be decoded.
    #[error("failed to decode frame: {message}")]
    Decode {
        /// Detail message.
        message: String,
    },

    /// Underlying I/O failure.
    #[error("uplink i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl UplinkError {
    /// Creates a send-failed error.
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed { message: message.into() }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UplinkError::SendFailed { .. } | UplinkError::Io(_))
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Validation of a field failed.
    #[error("validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Detail message.
        message: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The service was initialized twice.
    #[error("service already initialized")]
    AlreadyInitialized,
}

impl ConfigError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// A Result type with ParbError.
pub type ParbResult<T> = Result<T, ParbError>;

// =============================================================================
// Tests
// =============================================================================
