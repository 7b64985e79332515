//! Fault-injecting wrapper for outbound sends.
//!
//! Real channels drop and corrupt packets.  To exercise the retransmission
//! and checksum machinery without depending on actual network conditions,
//! every outbound frame passes through a [`LossyChannel`] before it reaches
//! the transport:
//!
//! | Fault      | Description                                              |
//! |------------|----------------------------------------------------------|
//! | Loss       | Drop the frame silently with probability `loss_rate`.    |
//! | Corruption | Flip one random payload bit with probability `corrupt_rate`. |
//!
//! Corruption touches only the payload region of the encoded frame — header
//! damage would surface as a sequence mismatch instead of a checksum failure,
//! which is a different protocol path.  A frame with no payload bytes (a pure
//! ACK) is delivered unmodified rather than corrupted.
//!
//! All randomness comes from a `ChaCha8Rng` seeded from configuration, so a
//! given seed replays the identical fault sequence run after run.  The
//! default configuration is a transparent pass-through.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::bits;
use crate::packet::HEADER_LEN;

/// Configuration for the fault model.
///
/// Probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// Probability that any given frame is silently dropped.
    pub loss_rate: f64,
    /// Probability that a delivered frame has one payload bit flipped.
    pub corrupt_rate: f64,
    /// RNG seed; the same seed replays the same faults.
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        // No faults: the channel is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            seed: 0,
        }
    }
}

/// What the channel did with one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Frame passes through untouched.
    Delivered(Vec<u8>),
    /// Frame was dropped; the sender's timer will notice.
    Lost,
    /// Frame delivered with exactly one payload bit flipped.
    Corrupted(Vec<u8>),
}

/// Counters describing channel behaviour so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelStats {
    /// Frames submitted for sending.
    pub sent: u64,
    /// Frames dropped by the loss draw.
    pub lost: u64,
    /// Frames delivered with a flipped bit.
    pub corrupted: u64,
}

/// A fault-injecting wrapper applied to outbound frames.
#[derive(Debug)]
pub struct LossyChannel {
    config: ChannelConfig,
    rng: ChaCha8Rng,
    stats: ChannelStats,
}

impl LossyChannel {
    /// Create a channel with the given fault model.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            stats: ChannelStats::default(),
        }
    }

    /// Pass one encoded frame through the fault model.
    ///
    /// The loss draw comes first; a surviving frame is then independently
    /// subject to the corruption draw.
    pub fn apply(&mut self, frame: Vec<u8>) -> Outcome {
        self.stats.sent += 1;

        if self.config.loss_rate > 0.0 && self.rng.gen::<f64>() < self.config.loss_rate {
            self.stats.lost += 1;
            log::debug!("channel: frame lost ({} bytes)", frame.len());
            return Outcome::Lost;
        }

        if self.config.corrupt_rate > 0.0
            && frame.len() > HEADER_LEN
            && self.rng.gen::<f64>() < self.config.corrupt_rate
        {
            self.stats.corrupted += 1;
            let flipped = bits::corrupt(&frame[HEADER_LEN..], &mut self.rng);
            if let Some(positions) = bits::diff(&frame[HEADER_LEN..], &flipped) {
                log::debug!(
                    "channel: frame corrupted at payload bit {positions:?} ({} bytes)",
                    frame.len()
                );
            }
            let mut out = frame;
            out.truncate(HEADER_LEN);
            out.extend_from_slice(&flipped);
            return Outcome::Corrupted(out);
        }

        Outcome::Delivered(frame)
    }

    /// Counters accumulated since construction.
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }
}
