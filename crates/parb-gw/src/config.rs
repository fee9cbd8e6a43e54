// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Gateway configuration schema.
//!
//! The whole configuration is one serde structure with defaults matching a
//! stock deployment, so an empty `{}` file is a valid config. Validation is
//! a separate pass run by the runtime before anything is wired.
//!
//! # Schema Structure
//!
//! ```text
//! GatewayConfig
//! ├── component, mode, log_level
//! ├── session: SessionConfig        (uplink registration)
//! ├── cache: CacheConfig
//! ├── txn: TxnConfig
//! ├── notify: NotifyConfig
//! ├── acl: Option<AclSet>           (None = stock rules)
//! └── subscriptions: Vec<String>    (events subscribed at startup)
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use parb_cache::CacheConfig;
use parb_core::error::ConfigError;
use parb_notify::NotifyConfig;
use parb_proto::AclSet;
use parb_txn::TxnConfig;
use parb_uplink::SessionConfig;

// =============================================================================
// Mode
// =============================================================================

/// Gateway operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Production: the platform uplink and parameter bus.
    Real,
    /// Line-delimited JSON on stdin/stdout plus the in-memory bus.
    #[default]
    Mock,
}

// =============================================================================
// GatewayConfig
// =============================================================================

/// The root configuration for the gateway process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GatewayConfig {
    /// Parameter-bus component name this process registers under.
    pub component: String,

    /// Operating mode.
    pub mode: Mode,

    /// Numeric log level: 0=error 1=warn 2=info 3=debug.
    pub log_level: u8,

    /// Uplink session settings.
    pub session: SessionConfig,

    /// Parameter cache settings.
    pub cache: CacheConfig,

    /// Transaction engine settings.
    pub txn: TxnConfig,

    /// Event pipeline settings.
    pub notify: NotifyConfig,

    /// ACL rules; `None` applies the stock rule set.
    pub acl: Option<AclSet>,

    /// Bus events subscribed at startup.
    pub subscriptions: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            component: "parodus2rbus.client".to_string(),
            mode: Mode::default(),
            log_level: 2,
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
            txn: TxnConfig::default(),
            notify: NotifyConfig::default(),
            acl: None,
            subscriptions: default_subscriptions(),
        }
    }
}

fn default_subscriptions() -> Vec<String> {
    [
        "Device.WiFi.Radio.*.Enable",
        "Device.Ethernet.Interface.*.Enable",
        "Device.Hosts.Host.*",
        "Device.DeviceInfo.X_COMCAST-COM_*",
        "Device.Time.*",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl GatewayConfig {
    /// Loads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: GatewayConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.component.is_empty() {
            return Err(ConfigError::validation("component", "must not be empty"));
        }
        if self.session.service_name.is_empty() {
            return Err(ConfigError::validation(
                "session.service_name",
                "must not be empty",
            ));
        }
        if self.log_level > 3 {
            return Err(ConfigError::validation("log_level", "must be 0..=3"));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::validation("cache.max_entries", "must be > 0"));
        }
        if self.txn.max_transaction_size == 0 {
            return Err(ConfigError::validation(
                "txn.max_transaction_size",
                "must be > 0",
            ));
        }
        if self.session.recv_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "session.recv_timeout_ms",
                "must be > 0",
            ));
        }
        Ok(())
    }

    /// The effective ACL: configured rules, or the stock set.
    pub fn effective_acl(&self) -> AclSet {
        self.acl.clone().unwrap_or_else(AclSet::default_rules)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        config.validate().unwrap();
        assert_eq!(config.component, "parodus2rbus.client");
        assert_eq!(config.session.service_name, "config");
        assert_eq!(config.mode, Mode::Mock);
        assert_eq!(config.log_level, 2);
        assert_eq!(config.subscriptions.len(), 5);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.component, "parodus2rbus.client");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = GatewayConfig::default();
        config.log_level = 9;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.component = String::new();
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = serde_json::from_str::<GatewayConfig>(r#"{"componnet": "typo"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"component": "acme.bridge", "mode": "mock", "log_level": 3}}"#
        )
        .unwrap();

        let config = GatewayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.component, "acme.bridge");
        assert_eq!(config.log_level, 3);
    }

    #[test]
    fn test_effective_acl_defaults_to_stock_rules() {
        let config = GatewayConfig::default();
        assert!(!config.effective_acl().is_empty());
    }
}
