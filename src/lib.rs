//! `rdt-over-tcp` — alternating-bit stop-and-wait reliable delivery (RDT 3.0)
//! exercised over a channel that loses and corrupts packets.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  data packets  ┌──────────┐
//!  │  Sender  │───────────────▶│ Receiver │
//!  └────┬─────┘                └─────┬────┘
//!       │           ACKs             │
//!       │◀───────────────────────────┘
//!       │
//!  ┌────▼──────────────────────────────┐
//!  │             Session               │
//!  │ (owns FSM + timer + lossy channel)│
//!  └────┬──────────────────────────────┘
//!       │ raw frames
//!  ┌────▼──────┐
//!  │ Transport │  (thin async wrapper around tokio TcpStream)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]    — wire format (serialise / deserialise)
//! - [`checksum`]  — ones'-complement block checksum, end-around carry
//! - [`bits`]      — bit-string helpers (left-pad, corrupt, diff)
//! - [`state`]     — finite-state-machine types
//! - [`sender`]    — stop-and-wait outbound state machine
//! - [`receiver`]  — stop-and-wait inbound state machine
//! - [`timeout`]   — single-shot, restartable retransmit countdown
//! - [`channel`]   — lossy/corrupting wrapper for outbound sends
//! - [`session`]   — per-endpoint event loop and application handles
//! - [`transport`] — async TCP transport abstraction
//! - [`config`]    — endpoint configuration surface

pub mod bits;
pub mod channel;
pub mod checksum;
pub mod config;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod state;
pub mod timeout;
pub mod transport;
