// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! The gateway keeps the legacy numeric log scale (0=error .. 3=debug) in
//! its configuration and maps it onto `tracing` levels here. An explicit
//! `RUST_LOG` in the environment wins over the configured level.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the logging subsystem from the numeric config level.
///
/// Safe to call once per process; later calls are ignored by the
/// subscriber registry.
pub fn init(log_level: u8) {
    let level = numeric_level(log_level);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stderr());
    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(is_terminal),
        )
        .try_init();

    // Re-initialization happens in tests; not an error worth surfacing.
    let _ = result;
}

/// Maps the 0..=3 config scale onto a tracing level.
///
/// Out-of-range values clamp to debug.
pub fn numeric_level(log_level: u8) -> Level {
    match log_level {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        _ => Level::DEBUG,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_level_mapping() {
        assert_eq!(numeric_level(0), Level::ERROR);
        assert_eq!(numeric_level(1), Level::WARN);
        assert_eq!(numeric_level(2), Level::INFO);
        assert_eq!(numeric_level(3), Level::DEBUG);
        assert_eq!(numeric_level(200), Level::DEBUG);
    }

    #[test]
    fn test_init_is_idempotent() {
        init(2);
        init(3);
    }
}
