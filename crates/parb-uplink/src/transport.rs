// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The transport seam.
//!
//! The production uplink library delivers and accepts framed messages; it
//! stays outside this codebase. [`UplinkTransport`] is the boundary:
//! [`StdioTransport`] implements mock mode over line-delimited JSON and
//! [`ChannelTransport`] backs the test harnesses.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};
use tokio::sync::{mpsc, Mutex};

use parb_core::error::UplinkError;

use crate::frame::Frame;

// =============================================================================
// UplinkTransport
// =============================================================================

/// Framed-message transport boundary.
#[async_trait]
pub trait UplinkTransport: Send + Sync {
    /// Receives the next frame.
    ///
    /// Returns `Ok(None)` when `timeout` elapses with nothing to read, so
    /// the session loop can observe the shutdown flag with bounded latency.
    ///
    /// # Errors
    ///
    /// [`UplinkError::Closed`] once the transport will never produce
    /// another frame.
    async fn recv(&self, timeout: Duration) -> Result<Option<Frame>, UplinkError>;

    /// Sends one frame.
    async fn send(&self, frame: Frame) -> Result<(), UplinkError>;
}

// =============================================================================
// StdioTransport
// =============================================================================

/// Mock-mode transport: line-delimited JSON frames on stdin/stdout.
///
/// Bare request lines (no `kind` field) are accepted and answered with bare
/// response lines; full frame objects round-trip with their metadata.
pub struct StdioTransport {
    lines: Mutex<Lines<BufReader<Stdin>>>,
    stdout: Mutex<Stdout>,
}

impl StdioTransport {
    /// Creates a transport over this process's stdio.
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UplinkTransport for StdioTransport {
    async fn recv(&self, timeout: Duration) -> Result<Option<Frame>, UplinkError> {
        let mut lines = self.lines.lock().await;
        let next = tokio::time::timeout(timeout, lines.next_line()).await;
        match next {
            Err(_) => Ok(None),
            Ok(Ok(None)) => Err(UplinkError::Closed),
            Ok(Err(e)) => Err(UplinkError::Io(e)),
            Ok(Ok(Some(line))) => {
                let line = line.trim();
                if line.is_empty() {
                    return Ok(None);
                }
                Frame::from_wire_json(line).map(Some)
            }
        }
    }

    async fn send(&self, frame: Frame) -> Result<(), UplinkError> {
        // Bare requests get bare replies; framed requests get framed ones.
        let line = if frame.is_bare() {
            String::from_utf8(frame.payload.clone())
                .map_err(|e| UplinkError::send_failed(e.to_string()))?
        } else {
            frame.to_wire_json()?
        };

        let mut stdout = self.stdout.lock().await;
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(UplinkError::Io)?;
        stdout.write_all(b"\n").await.map_err(UplinkError::Io)?;
        stdout.flush().await.map_err(UplinkError::Io)?;
        Ok(())
    }
}

// =============================================================================
// ChannelTransport
// =============================================================================

/// In-process transport over mpsc channels, for tests and harnesses.
pub struct ChannelTransport {
    inbound: Mutex<mpsc::Receiver<Frame>>,
    outbound: mpsc::Sender<Frame>,
}

impl ChannelTransport {
    /// Creates a transport plus the peer-side handles.
    ///
    /// Returns `(transport, to_transport, from_transport)`: frames sent on
    /// `to_transport` become received frames, sent frames show up on
    /// `from_transport`.
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        let (in_tx, in_rx) = mpsc::channel(capacity);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        (
            Self {
                inbound: Mutex::new(in_rx),
                outbound: out_tx,
            },
            in_tx,
            out_rx,
        )
    }
}

#[async_trait]
impl UplinkTransport for ChannelTransport {
    async fn recv(&self, timeout: Duration) -> Result<Option<Frame>, UplinkError> {
        let mut inbound = self.inbound.lock().await;
        match tokio::time::timeout(timeout, inbound.recv()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(UplinkError::Closed),
            Ok(Some(frame)) => Ok(Some(frame)),
        }
    }

    async fn send(&self, frame: Frame) -> Result<(), UplinkError> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| UplinkError::send_failed("peer dropped"))
    }
}

// =============================================================================
// Tests
// =============================================================================
