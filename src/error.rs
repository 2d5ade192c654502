//! # Error Types
//!
//! Error handling for the RCP1 protocol.
//!
//! This module defines all error variants that can occur during protocol
//! operations, from low-level I/O failures to lifecycle contract violations.
//!
//! ## Error Categories
//! - **I/O Errors**: Socket and file system failures
//! - **Configuration Errors**: Unreadable config files, script execution failures
//! - **Transport Errors**: Bind, send, and receive failures
//! - **Framing Errors**: Truncated or oversized frames
//! - **Lifecycle Errors**: Operations invoked in the wrong protocol state
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! Failures carry a human-readable message embedding the underlying cause;
//! callers distinguish them by variant, not by a deep source chain. No
//! operation retries internally and no operation returns a partial result
//! on failure.

use std::io;
use thiserror::Error;

use crate::protocol::LifecycleState;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Lock poisoning on the configuration snapshot
    pub const ERR_CONFIG_LOCK: &str = "Failed to acquire lock on configuration";
    /// Lock poisoning on the lifecycle state
    pub const ERR_STATE_LOCK: &str = "Failed to acquire lock on lifecycle state";
    /// Lock poisoning on the listener slot
    pub const ERR_LISTENER_LOCK: &str = "Failed to acquire lock on listener";
}

/// Primary error type for all RCP1 protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind RCP1 listener: {0}")]
    Bind(String),

    #[error("Failed to send RCP1 data: {0}")]
    Send(String),

    #[error("Failed to receive RCP1 data: {0}")]
    Receive(String),

    #[error("Stream ended before frame was complete: expected {expected} bytes, got {got}")]
    IncompleteFrame { expected: usize, got: usize },

    #[error("Frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("Cannot {operation} while protocol is in the {state} state")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("Receive cancelled by shutdown")]
    Cancelled,

    #[error("Error during RCP1 shutdown: {0}")]
    Shutdown(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
