//! Wire-format definitions for protocol packets.
//!
//! Every unit exchanged between peers is a [`Packet`].  This module is
//! responsible for:
//! - Defining the on-wire binary layout (header fields, payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Packet`], returning an
//!   error for truncated input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |            Number             |           Checksum            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+          (cont.)              +
//! |       Checksum (cont.)        |          Payload ...          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 6 bytes: number(2) + checksum(4).
//! `number` carries the sequence bit on data packets and the ACK number on
//! acknowledgements.  There is no payload length field — the transport is
//! expected to deliver one packet's bytes per logical receive.
//!
//! Decoding does **not** verify the checksum: a receiver must answer a
//! corrupt packet with a negative acknowledgement, so corruption handling
//! belongs to the state machines, not the codec.

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 6;

// Byte offsets of each field within the serialised header.
const OFF_NUMBER: usize = 0;
const OFF_CHECKSUM: usize = 2;

/// A complete protocol packet: header fields + payload bytes.
///
/// Fields are in host byte order; [`Packet::encode`] converts to big-endian
/// on the wire and [`Packet::decode`] converts back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sequence bit (data packets) or ACK number (acknowledgements).
    pub number: u16,
    /// Ones'-complement block checksum over the payload (see [`crate::checksum`]).
    pub checksum: u32,
    /// Application payload; empty on acknowledgements.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a data packet carrying `seq_bit` (0 or 1).
    pub fn data(seq_bit: u16, checksum: u32, payload: Vec<u8>) -> Self {
        debug_assert!(seq_bit <= 1, "sequence numbers are a single bit");
        Self {
            number: seq_bit,
            checksum,
            payload,
        }
    }

    /// Build an acknowledgement packet.
    ///
    /// `ack_number` is a full u16 rather than a bit: a receiver re-ACKs the
    /// number it actually saw, which after header corruption may be any value.
    pub fn ack(ack_number: u16, checksum: u32, payload: Vec<u8>) -> Self {
        Self {
            number: ack_number,
            checksum,
            payload,
        }
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN + self.payload.len()];
        buf[OFF_NUMBER..OFF_NUMBER + 2].copy_from_slice(&self.number.to_be_bytes());
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].copy_from_slice(&self.checksum.to_be_bytes());
        buf[HEADER_LEN..].copy_from_slice(&self.payload);
        buf
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// The first [`HEADER_LEN`] bytes are the header; everything after is the
    /// payload.  Returns [`PacketError::BufferTooShort`] when `buf` cannot
    /// contain a full header — such a packet is discarded without an ACK,
    /// since the header itself cannot be trusted to say which message it
    /// answers.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::BufferTooShort);
        }

        let number = u16::from_be_bytes(buf[OFF_NUMBER..OFF_NUMBER + 2].try_into().unwrap());
        let checksum =
            u32::from_be_bytes(buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].try_into().unwrap());

        Ok(Packet {
            number,
            checksum,
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }
}

/// Errors that can arise when parsing a raw packet.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    BufferTooShort,
}

impl std::fmt::Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::BufferTooShort => write!(f, "buffer too short to contain a header"),
        }
    }
}

impl std::error::Error for PacketError {}
