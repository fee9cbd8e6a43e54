// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for PARB.
//!
//! This module defines the wire-type and native-type tables shared by every
//! component, parameter-name wildcard helpers, and the attribute metadata
//! model.

use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Wire Types
// =============================================================================

/// The closed set of wire-type codes carried in JSON payloads.
///
/// Every typed value observed on the uplink is a pair of a string rendering
/// and one of these codes. The numeric values are part of the wire contract
/// and must not change.
///
/// # Examples
///
/// ```
/// use parb_core::types::WireType;
///
/// assert_eq!(WireType::Bool.code(), 3);
/// assert_eq!(WireType::from_code(11), Some(WireType::Group));
/// assert_eq!(WireType::from_code(42), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WireType {
    /// UTF-8 string (code 0).
    #[default]
    String,
    /// Signed 32-bit integer (code 1).
    Int,
    /// Unsigned 32-bit integer (code 2).
    Uint,
    /// Boolean, rendered lowercase (code 3).
    Bool,
    /// Float or double (code 4).
    Float,
    /// RFC 3339 date-time (code 5).
    DateTime,
    /// Base64-encoded bytes (code 6).
    Bytes,
    /// Signed 64-bit integer (code 7).
    Long,
    /// Unsigned 64-bit integer (code 8).
    Ulong,
    /// Single byte (code 9).
    Byte,
    /// No value / unknown (code 10).
    None,
    /// Group or table container (code 11).
    Group,
}

impl WireType {
    /// Returns the numeric wire code.
    #[inline]
    pub fn code(&self) -> u8 {
        match self {
            WireType::String => 0,
            WireType::Int => 1,
            WireType::Uint => 2,
            WireType::Bool => 3,
            WireType::Float => 4,
            WireType::DateTime => 5,
            WireType::Bytes => 6,
            WireType::Long => 7,
            WireType::Ulong => 8,
            WireType::Byte => 9,
            WireType::None => 10,
            WireType::Group => 11,
        }
    }

    /// Parses a numeric wire code. Returns `None` for codes outside 0..=11.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => WireType::String,
            1 => WireType::Int,
            2 => WireType::Uint,
            3 => WireType::Bool,
            4 => WireType::Float,
            5 => WireType::DateTime,
            6 => WireType::Bytes,
            7 => WireType::Long,
            8 => WireType::Ulong,
            9 => WireType::Byte,
            10 => WireType::None,
            11 => WireType::Group,
            _ => return None,
        })
    }

    /// Returns the type name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            WireType::String => "string",
            WireType::Int => "int",
            WireType::Uint => "uint",
            WireType::Bool => "bool",
            WireType::Float => "float",
            WireType::DateTime => "datetime",
            WireType::Bytes => "bytes",
            WireType::Long => "long",
            WireType::Ulong => "ulong",
            WireType::Byte => "byte",
            WireType::None => "none",
            WireType::Group => "group",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for WireType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for WireType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        WireType::from_code(code)
            .ok_or_else(|| D::Error::custom(format!("invalid wire type code: {}", code)))
    }
}

// =============================================================================
// Native Types
// =============================================================================

/// The parameter bus's native value types.
///
/// The bus reports one of these for every parameter it serves; the codec maps
/// them onto the wire-type table. The mapping is total: any native type the
/// table does not name explicitly projects to `WireType::String`, except
/// `None` which projects to `WireType::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeType {
    /// Boolean.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit floating point.
    Single,
    /// 64-bit floating point.
    Double,
    /// Date-time.
    DateTime,
    /// UTF-8 string.
    String,
    /// Raw bytes.
    Bytes,
    /// Single character, treated as a string on the wire.
    Char,
    /// Property reference, serialized as a string.
    Property,
    /// Structured object, serialized as a string.
    Object,
    /// No value.
    None,
}

impl NativeType {
    /// Maps this native type onto its wire-type code.
    ///
    /// This is the total mapping table of the value codec.
    pub fn wire_type(&self) -> WireType {
        match self {
            NativeType::Bool => WireType::Bool,
            NativeType::Int8 | NativeType::Int16 | NativeType::Int32 => WireType::Int,
            NativeType::UInt8 | NativeType::UInt16 | NativeType::UInt32 => WireType::Uint,
            NativeType::Int64 => WireType::Long,
            NativeType::UInt64 => WireType::Ulong,
            NativeType::Single | NativeType::Double => WireType::Float,
            NativeType::DateTime => WireType::DateTime,
            NativeType::Bytes => WireType::Bytes,
            NativeType::String | NativeType::Char | NativeType::Property | NativeType::Object => {
                WireType::String
            }
            NativeType::None => WireType::None,
        }
    }
}

// =============================================================================
// Parameter Name Helpers
// =============================================================================

/// Returns `true` if `name` is a group wildcard (trailing `.`).
///
/// A group wildcard asks the parameter bus to enumerate immediate and
/// transitive descendants of the prefix.
#[inline]
pub fn is_group_wildcard(name: &str) -> bool {
    !name.is_empty() && name.ends_with('.')
}

/// Returns `true` if `name` contains a table wildcard (interior `*`).
///
/// Table wildcards stand for a table-index position; expansion is delegated
/// to the parameter bus as a partial-path query.
#[inline]
pub fn has_table_wildcard(name: &str) -> bool {
    name.contains('*')
}

// =============================================================================
// Attributes
// =============================================================================

/// Whether value-change notifications are enabled for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyMode {
    /// Notifications off (wire value 0).
    #[default]
    Off,
    /// Notifications on (wire value 1).
    On,
}

impl NotifyMode {
    /// Returns the numeric wire rendering (0 or 1).
    #[inline]
    pub fn code(&self) -> u8 {
        match self {
            NotifyMode::Off => 0,
            NotifyMode::On => 1,
        }
    }

    /// Parses the numeric wire rendering. Any nonzero value means `On`.
    #[inline]
    pub fn from_code(code: u8) -> Self {
        if code == 0 {
            NotifyMode::Off
        } else {
            NotifyMode::On
        }
    }
}

impl Serialize for NotifyMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for NotifyMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(NotifyMode::from_code(u8::deserialize(deserializer)?))
    }
}

/// Access mode of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AccessMode {
    /// Read-only.
    #[serde(rename = "readOnly")]
    ReadOnly,
    /// Read-write.
    #[default]
    #[serde(rename = "readWrite")]
    ReadWrite,
    /// Write-only.
    #[serde(rename = "writeOnly")]
    WriteOnly,
}

impl AccessMode {
    /// Returns the camelCase wire rendering.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "readOnly",
            AccessMode::ReadWrite => "readWrite",
            AccessMode::WriteOnly => "writeOnly",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameter attribute metadata: notification mode plus access mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Notification setting.
    pub notify: NotifyMode,
    /// Access mode; absent when the backend cannot report it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessMode>,
}

impl Attribute {
    /// Creates attribute metadata.
    pub fn new(notify: NotifyMode, access: Option<AccessMode>) -> Self {
        Self { notify, access }
    }
}

impl Default for Attribute {
    fn default() -> Self {
        Self {
            notify: NotifyMode::Off,
            access: Some(AccessMode::ReadWrite),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
