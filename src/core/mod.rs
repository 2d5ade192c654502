//! # Core Protocol Components
//!
//! Low-level frame handling and the wire codec.
//!
//! This module provides the foundation for the protocol: message framing
//! and encoding/decoding over byte streams.
//!
//! ## Components
//! - **Frame**: An opaque payload with its length-prefixed wire form
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Length(4, big-endian)] [Payload(N)]
//! ```
//!
//! There is no magic, version, or checksum field; one frame travels per
//! connection. A 16MB decode cap prevents a hostile length prefix from
//! forcing an unbounded allocation.

pub mod codec;
pub mod frame;
