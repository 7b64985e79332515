//! Outbound state machine for alternating-bit stop-and-wait delivery.
//!
//! [`Sender`] owns the sequence bit, the retransmit countdown, and the single
//! in-flight packet.  It does **not** touch the transport;
//! [`crate::session`] calls these methods and owns the actual send/receive
//! loop.
//!
//! # Stop-and-wait contract
//! - At most **one** packet is in flight at any moment.
//! - A new message may only start while in `AwaitCall`; otherwise the call is
//!   a [`ProtocolViolation`].
//! - On a valid, matching ACK: cancel the countdown, toggle the bit.
//! - On a corrupt or mismatched ACK: do nothing — the running countdown keeps
//!   counting toward retransmission.
//! - On timeout: hand back the stored packet, bit-identical, and re-arm.

use std::time::{Duration, Instant};

use crate::checksum;
use crate::packet::Packet;
use crate::state::SenderState;
use crate::timeout::Timeout;

/// What [`Sender::on_ack`] did with an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Valid ACK for the in-flight packet: countdown cancelled, bit toggled.
    Advanced,
    /// Arrived while no packet was outstanding — a stale duplicate, dropped
    /// silently.
    Stale,
    /// Structurally valid but its number is not the awaited bit; ignored,
    /// countdown untouched.
    Mismatched,
    /// Checksum verification failed; ignored, countdown untouched.
    Corrupt,
    /// Too short to carry a header; discarded.
    Malformed,
}

/// Calling [`Sender::send_message`] while a message is still outstanding.
///
/// This is a programmer error on the caller's side, not a recoverable
/// protocol event — stop-and-wait admits one unacknowledged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolViolation {
    /// The state the sender was in when the call arrived.
    pub state: SenderState,
}

impl std::fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "send_message while a message is outstanding (state {})",
            self.state
        )
    }
}

impl std::error::Error for ProtocolViolation {}

/// Stop-and-wait send-side state for one connection.
#[derive(Debug)]
pub struct Sender {
    state: SenderState,
    /// Checksum block width in bytes.
    block_size: usize,
    /// Countdown duration for each (re)transmission.
    timeout: Duration,
    /// The retransmit countdown; armed on every transmission.
    timer: Timeout,
    /// The in-flight packet, retained verbatim for retransmission.
    ///
    /// Overwritten only when a *new* message starts, never on retransmit.
    last_sent: Option<Packet>,
}

impl Sender {
    /// Create a sender in `AwaitCall0`.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is outside `1..=4` (see [`crate::checksum`]).
    pub fn new(block_size: usize, timeout: Duration) -> Self {
        assert!(
            checksum::block_size_valid(block_size),
            "checksum block size must be 1..=4 bytes, got {block_size}"
        );
        Self {
            state: SenderState::AwaitCall0,
            block_size,
            timeout,
            timer: Timeout::new(),
            last_sent: None,
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// `true` when a new message may be accepted from the application.
    pub fn can_send(&self) -> bool {
        self.state.awaiting_call()
    }

    /// `true` while a message is in flight awaiting its ACK.
    pub fn has_outstanding(&self) -> bool {
        self.state.awaiting_ack()
    }

    /// The retransmit countdown, for inspection.
    pub fn timer(&self) -> &Timeout {
        &self.timer
    }

    /// Deadline of the armed countdown, for the event loop's sleep branch.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Observe the passage of time on the countdown (see [`Timeout::poll`]).
    pub fn poll_timer(&mut self, now: Instant) -> bool {
        self.timer.poll(now)
    }

    /// Stop the countdown without retransmitting, for orderly teardown.
    pub fn cancel_timer(&mut self) {
        self.timer.cancel();
    }

    /// Begin transmission of a new message.
    ///
    /// Computes the payload checksum, builds the data packet numbered with
    /// the current bit, stores it for retransmission, arms the countdown, and
    /// moves to `AwaitAck`.  The returned packet is ready for the channel.
    pub fn send_message(&mut self, payload: &[u8]) -> Result<Packet, ProtocolViolation> {
        let bit = match self.state {
            SenderState::AwaitCall0 => 0,
            SenderState::AwaitCall1 => 1,
            SenderState::AwaitAck0 | SenderState::AwaitAck1 => {
                return Err(ProtocolViolation { state: self.state });
            }
        };

        let checksum = checksum::generate(payload, self.block_size);
        let pkt = Packet::data(bit, checksum, payload.to_vec());
        self.last_sent = Some(pkt.clone());
        self.timer.start(self.timeout);
        self.state = match bit {
            0 => SenderState::AwaitAck0,
            _ => SenderState::AwaitAck1,
        };
        Ok(pkt)
    }

    /// Process an inbound frame as an acknowledgement.
    ///
    /// While in `AwaitCall` any arrival is a stale duplicate ACK and is
    /// silently dropped — retransmitted ACKs are normal under loss.  While in
    /// `AwaitAck(bit)`: a corrupt frame or an ACK for the other bit is
    /// ignored *without touching the countdown*, so the original deadline
    /// still drives the retransmission.  Only a verified ACK for `bit`
    /// cancels the countdown and advances the state.
    pub fn on_ack(&mut self, raw: &[u8]) -> AckOutcome {
        let bit = match self.state {
            SenderState::AwaitCall0 | SenderState::AwaitCall1 => return AckOutcome::Stale,
            SenderState::AwaitAck0 => 0,
            SenderState::AwaitAck1 => 1,
        };

        let pkt = match Packet::decode(raw) {
            Ok(pkt) => pkt,
            Err(_) => return AckOutcome::Malformed,
        };

        if !checksum::verify_packet(&pkt.payload, pkt.checksum, self.block_size) {
            return AckOutcome::Corrupt;
        }
        if pkt.number != bit {
            return AckOutcome::Mismatched;
        }

        self.timer.cancel();
        self.state = match self.state {
            SenderState::AwaitAck0 => SenderState::AwaitCall1,
            _ => SenderState::AwaitCall0,
        };
        AckOutcome::Advanced
    }

    /// React to countdown expiry: re-arm and hand back the stored packet for
    /// retransmission, bit-identical to the original transmission.
    ///
    /// Returns `None` when no message is outstanding (a spurious wakeup).
    pub fn on_timeout(&mut self) -> Option<Packet> {
        if !self.state.awaiting_ack() {
            return None;
        }
        let pkt = self.last_sent.clone()?;
        self.timer.start(self.timeout);
        Some(pkt)
    }
}
