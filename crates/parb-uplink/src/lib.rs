// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # parb-uplink
//!
//! The uplink boundary of PARB.
//!
//! The uplink is a framed-message transport with source/destination routing
//! and transaction identifiers. The framing library itself is an external
//! collaborator; this crate models the frames, defines the transport seam,
//! and runs the single receive loop that feeds inbound request payloads to
//! the protocol translator and frames the replies.
//!
//! Mock mode swaps the transport for line-delimited JSON on stdin/stdout
//! with identical semantics.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod frame;
mod session;
mod transport;

pub use frame::{Frame, FrameKind};
pub use session::{SessionConfig, UplinkSession, UplinkSink};
pub use transport::{ChannelTransport, StdioTransport, UplinkTransport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
