//! Per-endpoint session: event loop + application handles.
//!
//! # Architecture
//!
//! ```text
//!  Application                         Application
//!      │ send_tx (mpsc)                    ▲ delivered_rx (mpsc)
//!      ▼                                   │
//!  ┌───────────────────┐   data frames ┌───┴───────────────┐
//!  │   sender_loop     │──────────────▶│   receiver_loop   │
//!  │  Sender + Timeout │               │     Receiver      │
//!  │  LossyChannel     │◀──────────────│   LossyChannel    │
//!  │  Transport        │     ACKs      │   Transport       │
//!  └───────────────────┘               └───────────────────┘
//! ```
//!
//! Each endpoint is one explicitly-constructed session object; `run()` moves
//! it into a single spawned task that multiplexes every input with
//! `tokio::select!`:
//! - the application's next message (sender side, only while the FSM can
//!   accept one — stop-and-wait backpressure falls out of the channel),
//! - inbound frames from the transport (a read timeout is steady state),
//! - the retransmit countdown (sender side, armed on the FSM's deadline),
//! - the shutdown flag.
//!
//! Because one task owns the FSM, the timer, the channel, and the transport,
//! every state transition runs to completion before the next input is
//! examined — an ACK transition and a timeout retransmission can never
//! interleave.  No locks are needed at window size 1.
//!
//! Retransmission is unbounded, as the protocol demands: a sender facing a
//! silent peer keeps retrying until the peer answers, the connection drops,
//! or the session is shut down.
//!
//! # Shutdown
//!
//! Dropping the sender handle's message channel (via [`SenderHandle::close`])
//! lets the loop drain the in-flight message before exiting.  The explicit
//! [`SenderHandle::shutdown`] / [`ReceiverHandle::shutdown`] flag tears down
//! immediately and in order: the receive loop stops, the countdown is
//! cancelled, the transport is dropped — nothing fires into a torn-down
//! channel.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use std::time::{Duration, Instant};

use crate::channel::{LossyChannel, Outcome};
use crate::config::{ConfigError, ProtocolConfig};
use crate::packet::Packet;
use crate::receiver::Receiver;
use crate::sender::{AckOutcome, Sender};
use crate::state::SenderState;
use crate::transport::{Transport, TransportError};

/// Capacity of the handle channels.
const CHANNEL_CAPACITY: usize = 64;

/// Sending on a handle whose event loop has already terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClosed;

impl std::fmt::Display for SessionClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session event loop has terminated")
    }
}

impl std::error::Error for SessionClosed {}

// ---------------------------------------------------------------------------
// Sender session
// ---------------------------------------------------------------------------

/// The send side of one connection, ready to run.
pub struct SenderSession {
    sender: Sender,
    channel: LossyChannel,
    transport: Transport,
}

impl SenderSession {
    /// Assemble a sender endpoint from a connected transport.
    pub fn new(
        transport: Transport,
        config: &ProtocolConfig,
        channel: crate::channel::ChannelConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sender: Sender::new(config.block_size, config.timeout),
            channel: LossyChannel::new(channel),
            transport,
        })
    }

    /// Spawn the event loop and return the application handle.
    pub fn run(self) -> SenderHandle {
        let (send_tx, send_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(self.sender.state());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(sender_loop(
            self.sender,
            self.channel,
            self.transport,
            send_rx,
            state_tx,
            shutdown_rx,
        ));

        SenderHandle {
            send_tx,
            state_rx,
            shutdown_tx,
            handle,
        }
    }
}

/// Handle returned by [`SenderSession::run`].
pub struct SenderHandle {
    send_tx: mpsc::Sender<Vec<u8>>,
    state_rx: watch::Receiver<SenderState>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SenderHandle {
    /// Queue one message for reliable delivery.
    ///
    /// Backpressure: the loop takes a message only while the FSM is in
    /// `AwaitCall`, so at most one message is worked on at a time and the
    /// rest wait in the channel.
    pub async fn send(&self, payload: Vec<u8>) -> Result<(), SessionClosed> {
        self.send_tx.send(payload).await.map_err(|_| SessionClosed)
    }

    /// The FSM state most recently published by the event loop.
    pub fn state(&self) -> SenderState {
        *self.state_rx.borrow()
    }

    /// Graceful close: stop accepting messages, let the in-flight message
    /// drain, then wait for the loop to exit.
    pub async fn close(self) {
        let SenderHandle {
            send_tx,
            state_rx,
            shutdown_tx,
            handle,
        } = self;
        drop(send_tx);
        drop(state_rx);
        let _ = handle.await;
        drop(shutdown_tx);
    }

    /// Immediate orderly teardown, dropping any in-flight message.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

async fn sender_loop(
    mut sender: Sender,
    mut channel: LossyChannel,
    mut transport: Transport,
    mut app_rx: mpsc::Receiver<Vec<u8>>,
    state_tx: watch::Sender<SenderState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // A disarmed countdown parks far in the future; the `armed` guard keeps
    // the branch from firing.
    let far_future = Duration::from_secs(365 * 24 * 3600);
    let timer = sleep(far_future);
    tokio::pin!(timer);

    let mut closing = false;
    let mut watch_alive = true;

    loop {
        // Track the FSM's deadline; re-arming with an unchanged deadline is
        // harmless.
        let armed = match sender.deadline() {
            Some(deadline) => {
                timer
                    .as_mut()
                    .reset(tokio::time::Instant::from_std(deadline));
                true
            }
            None => {
                timer.as_mut().reset(tokio::time::Instant::now() + far_future);
                false
            }
        };

        tokio::select! {
            // ── Branch 1: next message from the application ──────────────
            // Only eligible while the FSM can accept a call.
            maybe_msg = app_rx.recv(), if !closing && sender.can_send() => {
                match maybe_msg {
                    None => {
                        // Application hung up; drain the in-flight message
                        // (if any), then exit.
                        closing = true;
                        if !sender.has_outstanding() {
                            break;
                        }
                    }
                    Some(payload) => match sender.send_message(&payload) {
                        Ok(pkt) => {
                            let _ = state_tx.send(sender.state());
                            log::debug!("→ DATA seq={} len={}", pkt.number, pkt.payload.len());
                            if send_through(&mut channel, &mut transport, &pkt).await.is_err() {
                                break;
                            }
                        }
                        Err(violation) => {
                            // Guarded by can_send; reaching this is a bug.
                            log::error!("{violation}");
                        }
                    },
                }
            }

            // ── Branch 2: inbound frame (an ACK, hopefully) ──────────────
            result = transport.recv() => {
                match result {
                    Ok(frame) => match sender.on_ack(&frame) {
                        AckOutcome::Advanced => {
                            let _ = state_tx.send(sender.state());
                            log::debug!("← ACK accepted; state {}", sender.state());
                            if closing && !sender.has_outstanding() {
                                break;
                            }
                        }
                        outcome => {
                            // Corrupt, mismatched, stale, malformed: ignored;
                            // a running countdown keeps counting.
                            log::debug!("← ACK ignored ({outcome:?})");
                        }
                    },
                    Err(TransportError::RecvTimeout) => {}
                    Err(e) => {
                        log::warn!("transport failed: {e}");
                        break;
                    }
                }
            }

            // ── Branch 3: retransmit countdown ───────────────────────────
            _ = &mut timer, if armed => {
                if sender.poll_timer(Instant::now()) {
                    if let Some(pkt) = sender.on_timeout() {
                        log::debug!("timeout: retransmitting seq={}", pkt.number);
                        if send_through(&mut channel, &mut transport, &pkt).await.is_err() {
                            break;
                        }
                    }
                }
            }

            // ── Branch 4: explicit shutdown ──────────────────────────────
            changed = shutdown_rx.changed(), if watch_alive => {
                match changed {
                    Ok(()) => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    Err(_) => watch_alive = false,
                }
            }
        }
    }

    // Teardown order: the receive loop is stopped (we are past it), then the
    // countdown, then the transport.
    sender.cancel_timer();
    drop(transport);
    log::debug!(
        "sender loop done; channel stats: {:?}",
        channel.stats()
    );
}

// ---------------------------------------------------------------------------
// Receiver session
// ---------------------------------------------------------------------------

/// The receive side of one connection, ready to run.
pub struct ReceiverSession {
    receiver: Receiver,
    channel: LossyChannel,
    transport: Transport,
}

impl ReceiverSession {
    /// Assemble a receiver endpoint from a connected transport.
    pub fn new(
        transport: Transport,
        config: &ProtocolConfig,
        channel: crate::channel::ChannelConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            receiver: Receiver::new(config.block_size),
            channel: LossyChannel::new(channel),
            transport,
        })
    }

    /// Spawn the event loop and return the application handle.
    pub fn run(self) -> ReceiverHandle {
        let (delivered_tx, delivered_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(receiver_loop(
            self.receiver,
            self.channel,
            self.transport,
            delivered_tx,
            shutdown_rx,
        ));

        ReceiverHandle {
            delivered_rx,
            shutdown_tx,
            handle,
        }
    }
}

/// Handle returned by [`ReceiverSession::run`].
pub struct ReceiverHandle {
    delivered_rx: mpsc::Receiver<Result<Vec<u8>, TransportError>>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReceiverHandle {
    /// The next payload delivered exactly once, a fatal transport error, or
    /// `None` once the loop has exited.
    pub async fn recv(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.delivered_rx.recv().await
    }

    /// Orderly teardown: stop the receive loop, release the transport.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

async fn receiver_loop(
    mut receiver: Receiver,
    mut channel: LossyChannel,
    mut transport: Transport,
    delivered_tx: mpsc::Sender<Result<Vec<u8>, TransportError>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut watch_alive = true;

    loop {
        tokio::select! {
            // ── Branch 1: inbound frame ──────────────────────────────────
            result = transport.recv() => {
                match result {
                    Ok(frame) => match receiver.on_packet(&frame) {
                        Ok(reply) => {
                            // Exactly one ACK per packet that decodes.
                            log::debug!("→ ACK num={}", reply.ack.number);
                            if send_through(&mut channel, &mut transport, &reply.ack)
                                .await
                                .is_err()
                            {
                                break;
                            }
                            if let Some(payload) = reply.delivered {
                                log::debug!("delivered {} bytes; state {}", payload.len(), receiver.state());
                                if delivered_tx.send(Ok(payload)).await.is_err() {
                                    // Application hung up.
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            // Malformed: discard with no ACK.
                            log::warn!("discarding malformed frame: {e}");
                        }
                    },
                    Err(TransportError::RecvTimeout) => {}
                    Err(e) => {
                        log::warn!("transport failed: {e}");
                        let _ = delivered_tx.send(Err(e)).await;
                        break;
                    }
                }
            }

            // ── Branch 2: explicit shutdown ──────────────────────────────
            changed = shutdown_rx.changed(), if watch_alive => {
                match changed {
                    Ok(()) => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    Err(_) => watch_alive = false,
                }
            }
        }
    }

    drop(transport);
    log::debug!(
        "receiver loop done; channel stats: {:?}",
        channel.stats()
    );
}

// ---------------------------------------------------------------------------
// Shared helper
// ---------------------------------------------------------------------------

/// Encode `pkt`, pass it through the fault model, and transmit survivors.
///
/// A frame the channel drops is *success* from the caller's perspective — the
/// retransmit machinery owns recovery.  Only a transport failure is an error.
async fn send_through(
    channel: &mut LossyChannel,
    transport: &mut Transport,
    pkt: &Packet,
) -> Result<(), TransportError> {
    match channel.apply(pkt.encode()) {
        Outcome::Lost => Ok(()),
        Outcome::Delivered(frame) | Outcome::Corrupted(frame) => {
            transport.send(&frame).await.map_err(|e| {
                log::warn!("transport send failed: {e}");
                e
            })
        }
    }
}
