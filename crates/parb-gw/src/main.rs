// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! PARB gateway entry point.
//!
//! Usage: `parb-gw [config.json]`. With no argument the stock mock-mode
//! configuration applies and the gateway speaks line-delimited JSON on
//! stdin/stdout.

use std::process::ExitCode;

use tracing::error;

use parb_gw::{logging, GatewayConfig, Service};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => match GatewayConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load config '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => GatewayConfig::default(),
    };

    logging::init(config.log_level);

    let service = match Service::init(config).await {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "service initialization failed");
            return ExitCode::FAILURE;
        }
    };

    match service.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "service terminated with error");
            ExitCode::FAILURE
        }
    }
}
