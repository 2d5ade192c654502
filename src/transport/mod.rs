//! # Transport
//!
//! TCP transport for RCP1 frames.
//!
//! Both roles are deliberately connection-per-message: the listener accepts
//! one inbound connection, reads one frame, and closes; the sender opens one
//! outbound connection, writes one frame, and closes. There is no session
//! reuse, multiplexing, or retry.

pub mod listener;
pub mod sender;

pub use listener::FrameListener;
pub use sender::send_frame;
