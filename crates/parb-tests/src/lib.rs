// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared fixtures and harnesses for the PARB integration suite.
//!
//! The tests themselves live under `tests/`; this crate only exports the
//! common plumbing: a fully wired gateway harness over the in-memory
//! backend and a recording notification sink.

pub mod common;

pub use common::harness::{GatewayHarness, RecordingSink};
