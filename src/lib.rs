//! # RCP1 Protocol
//!
//! Point-to-point framed messaging core for the Zamarine RCP1 protocol.
//!
//! This crate implements a minimal single-peer messaging module: it binds a
//! listening endpoint, accepts one inbound framed binary message per call,
//! and pushes framed binary messages to a named destination on demand.
//! Configuration is built by layering a static `key=value` file with
//! script-driven override passes executed by an embedded (and swappable)
//! Lua engine.
//!
//! ## Wire Format
//! ```text
//! [Length(4, big-endian)] [Payload(N)]
//! ```
//! One frame per connection; no version field, no checksum, no multiplexing.
//!
//! ## Lifecycle
//! ```text
//! NEW --configure()--> CONFIGURED --initialize()--> RUNNING --shutdown()--> STOPPED
//! ```
//!
//! ## Example
//! ```no_run
//! use rcp1_protocol::Rcp1Protocol;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> rcp1_protocol::Result<()> {
//!     let rcp1 = Arc::new(Rcp1Protocol::new());
//!     rcp1.configure(None)?;
//!     rcp1.initialize().await?;
//!
//!     rcp1.send(b"hello", "127.0.0.1").await?;
//!     let reply = rcp1.receive().await?;
//!     println!("got {} bytes", reply.len());
//!
//!     rcp1.shutdown()
//! }
//! ```
//!
//! ## Recognized Configuration Keys
//! - `rcp1.port` — listener and destination port (default 8080)
//! - `rcp1.lua_config` — first script pass path (default `lua/rcp1_config.lua`)
//!
//! The fixed script resource `lua/rcp1_init.lua` is always loaded during
//! `initialize()`.

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;

// Flat re-exports for the common path.
pub use crate::config::script::{LuaConfigSource, ScriptConfigSource};
pub use crate::config::ConfigStore;
pub use crate::core::codec::FrameCodec;
pub use crate::core::frame::Frame;
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::{LifecycleState, Rcp1Protocol};
pub use crate::transport::{send_frame, FrameListener};
