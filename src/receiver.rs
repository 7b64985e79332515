//! Inbound state machine for alternating-bit stop-and-wait delivery.
//!
//! [`Receiver`] validates each arriving data packet, suppresses duplicates,
//! and decides the acknowledgement — it does **not** send ACKs itself;
//! [`crate::session`] transmits the [`Reply`] it returns.
//!
//! # Acknowledgement table
//!
//! For a packet that decodes, with `expected` the awaited bit:
//!
//! | Condition                  | ACK number        | Deliver | Toggle |
//! |----------------------------|-------------------|---------|--------|
//! | checksum invalid           | `!expected`       | no      | no     |
//! | sequence ≠ `expected`      | received sequence | no      | no     |
//! | valid and sequence matches | `expected`        | once    | yes    |
//!
//! Exactly one ACK per packet that decodes — the receiver is never silent.
//! A frame too short to carry a header is the one exception: it is discarded
//! without an ACK, since the header cannot be trusted to say which message it
//! answers.
//!
//! The first two rows are load-bearing: acknowledging the complement of the
//! expected bit is the negative-acknowledgement convention ("resend"), and
//! re-acknowledging a duplicate with the number it actually carried is what
//! un-sticks a sender whose ACK was lost.  Changing either breaks the
//! protocol's liveness argument.

use crate::checksum;
use crate::packet::{Packet, PacketError};
use crate::state::ReceiverState;

/// The receiver's reaction to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The acknowledgement to transmit back, always present.
    pub ack: Packet,
    /// The payload to hand to the application — `Some` exactly once per
    /// distinct accepted message.
    pub delivered: Option<Vec<u8>>,
}

/// Stop-and-wait receive-side state for one connection.
#[derive(Debug)]
pub struct Receiver {
    state: ReceiverState,
    /// Checksum block width in bytes.
    block_size: usize,
}

impl Receiver {
    /// Create a receiver in `AwaitData0`.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is outside `1..=4` (see [`crate::checksum`]).
    pub fn new(block_size: usize) -> Self {
        assert!(
            checksum::block_size_valid(block_size),
            "checksum block size must be 1..=4 bytes, got {block_size}"
        );
        Self {
            state: ReceiverState::AwaitData0,
            block_size,
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Process one inbound frame per the acknowledgement table above.
    ///
    /// `Err` means the frame was malformed and must be discarded with no ACK.
    pub fn on_packet(&mut self, raw: &[u8]) -> Result<Reply, PacketError> {
        let pkt = Packet::decode(raw)?;
        let expected = self.state.bit();

        if !checksum::verify_packet(&pkt.payload, pkt.checksum, self.block_size) {
            // Negative acknowledgement: the complement asks for a resend.
            return Ok(Reply {
                ack: self.build_ack(expected ^ 1),
                delivered: None,
            });
        }

        if pkt.number != expected {
            // Duplicate of the previously accepted message (its ACK was
            // lost); re-acknowledge what actually arrived, deliver nothing.
            return Ok(Reply {
                ack: self.build_ack(pkt.number),
                delivered: None,
            });
        }

        let ack = self.build_ack(expected);
        self.state = self.state.toggled();
        Ok(Reply {
            ack,
            delivered: Some(pkt.payload),
        })
    }

    /// An acknowledgement numbered `number` with an empty, checksummed payload.
    fn build_ack(&self, number: u16) -> Packet {
        Packet::ack(number, checksum::generate(&[], self.block_size), vec![])
    }
}
