//! Finite-state-machine (FSM) state types for both endpoints.
//!
//! The sender alternates between waiting for a call from the application and
//! waiting for the matching ACK, once per sequence bit — four states total.
//! The receiver only ever waits for the next data packet — two states.
//! Transitions are *not* implemented here; they live in [`crate::sender`] and
//! [`crate::receiver`], which match exhaustively on these types.

/// All possible states of the sender FSM.
///
/// ```text
///                    send(msg)                    send(msg)
///   AwaitCall0 ───────────────▶ AwaitAck0    ┌──────────────▶ AwaitAck1
///        ▲                          │        │                    │
///        │                          │   AwaitCall1                │
///        │         ACK 0            ▼        ▲        ACK 1       │
///        └──────────────────────────┘        └────────────────────┘
///                         (timeout: retransmit, stay put)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Ready to transmit the message numbered 0.
    AwaitCall0,
    /// Message 0 in flight; waiting for its ACK.
    AwaitAck0,
    /// Ready to transmit the message numbered 1.
    AwaitCall1,
    /// Message 1 in flight; waiting for its ACK.
    AwaitAck1,
}

impl SenderState {
    /// The sequence bit this state is working on.
    pub fn bit(self) -> u16 {
        match self {
            Self::AwaitCall0 | Self::AwaitAck0 => 0,
            Self::AwaitCall1 | Self::AwaitAck1 => 1,
        }
    }

    /// `true` when a new message may be accepted from the application.
    pub fn awaiting_call(self) -> bool {
        matches!(self, Self::AwaitCall0 | Self::AwaitCall1)
    }

    /// `true` while a message is in flight.
    pub fn awaiting_ack(self) -> bool {
        matches!(self, Self::AwaitAck0 | Self::AwaitAck1)
    }
}

impl Default for SenderState {
    fn default() -> Self {
        Self::AwaitCall0
    }
}

impl std::fmt::Display for SenderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// All possible states of the receiver FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Expecting the data packet numbered 0.
    AwaitData0,
    /// Expecting the data packet numbered 1.
    AwaitData1,
}

impl ReceiverState {
    /// The sequence bit this state expects next.
    pub fn bit(self) -> u16 {
        match self {
            Self::AwaitData0 => 0,
            Self::AwaitData1 => 1,
        }
    }

    /// The state expecting the opposite bit.
    pub fn toggled(self) -> Self {
        match self {
            Self::AwaitData0 => Self::AwaitData1,
            Self::AwaitData1 => Self::AwaitData0,
        }
    }
}

impl Default for ReceiverState {
    fn default() -> Self {
        Self::AwaitData0
    }
}

impl std::fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
