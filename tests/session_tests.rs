//! Integration tests for the stop-and-wait session layer.
//!
//! Each test spins up two in-process endpoints talking over the loopback
//! interface.  Some tests use a full session on both sides; the deterministic
//! ones drive a raw [`Transport`] by hand on one side so that packet loss and
//! duplication happen exactly where the test says they do.

use std::time::Duration;

use rdt_over_tcp::channel::ChannelConfig;
use rdt_over_tcp::checksum;
use rdt_over_tcp::config::ProtocolConfig;
use rdt_over_tcp::packet::Packet;
use rdt_over_tcp::session::{ReceiverHandle, ReceiverSession, SenderHandle, SenderSession};
use rdt_over_tcp::state::SenderState;
use rdt_over_tcp::transport::{Listener, Transport, TransportError};

/// Short timings so retransmission-heavy tests stay fast.
fn test_config() -> ProtocolConfig {
    ProtocolConfig {
        block_size: 1,
        timeout: Duration::from_millis(100),
        recv_timeout: Duration::from_millis(50),
    }
}

/// Overall guard so a wedged protocol fails the test instead of hanging it.
const GUARD: Duration = Duration::from_secs(20);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Connect a sender session (accept side, as in the original roles) and a
/// receiver session over loopback, each with its own fault model.
async fn endpoints(
    config: ProtocolConfig,
    sender_faults: ChannelConfig,
    receiver_faults: ChannelConfig,
) -> (SenderHandle, ReceiverHandle) {
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("bind");
    let addr = listener.local_addr;

    let accept = tokio::spawn(listener.accept(config.recv_timeout));
    let receiver_transport = Transport::connect(addr, config.recv_timeout)
        .await
        .expect("connect");
    let (sender_transport, _peer) = accept.await.expect("accept task").expect("accept");

    let sender = SenderSession::new(sender_transport, &config, sender_faults)
        .expect("sender config")
        .run();
    let receiver = ReceiverSession::new(receiver_transport, &config, receiver_faults)
        .expect("receiver config")
        .run();
    (sender, receiver)
}

/// Connect a sender session to a hand-driven raw transport.
async fn sender_with_raw_peer(config: ProtocolConfig) -> (SenderHandle, Transport) {
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("bind");
    let addr = listener.local_addr;

    let accept = tokio::spawn(listener.accept(config.recv_timeout));
    let peer = Transport::connect(addr, config.recv_timeout)
        .await
        .expect("connect");
    let (sender_transport, _peer) = accept.await.expect("accept task").expect("accept");

    let sender = SenderSession::new(sender_transport, &config, ChannelConfig::default())
        .expect("sender config")
        .run();
    (sender, peer)
}

/// Connect a receiver session to a hand-driven raw transport.
async fn receiver_with_raw_peer(config: ProtocolConfig) -> (ReceiverHandle, Transport) {
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("bind");
    let addr = listener.local_addr;

    let accept = tokio::spawn(listener.accept(config.recv_timeout));
    let receiver_transport = Transport::connect(addr, config.recv_timeout)
        .await
        .expect("connect");
    let (peer, _addr) = accept.await.expect("accept task").expect("accept");

    let receiver = ReceiverSession::new(receiver_transport, &config, ChannelConfig::default())
        .expect("receiver config")
        .run();
    (receiver, peer)
}

/// Read the next frame, riding out the bounded-read timeouts.
async fn next_frame(transport: &mut Transport) -> Vec<u8> {
    tokio::time::timeout(GUARD, async {
        loop {
            match transport.recv().await {
                Ok(frame) => return frame,
                Err(TransportError::RecvTimeout) => continue,
                Err(e) => panic!("transport failed: {e}"),
            }
        }
    })
    .await
    .expect("no frame within guard")
}

/// A well-formed empty-payload ACK frame for `number`.
fn ack_frame(number: u16) -> Vec<u8> {
    Packet::ack(number, checksum::generate(b"", 1), vec![]).encode()
}

/// Collect `count` delivered payloads from a receiver handle.
async fn collect(receiver: &mut ReceiverHandle, count: usize) -> Vec<Vec<u8>> {
    let mut got = Vec::with_capacity(count);
    for _ in 0..count {
        let payload = tokio::time::timeout(GUARD, receiver.recv())
            .await
            .expect("delivery timed out")
            .expect("receiver loop ended")
            .expect("transport failed");
        got.push(payload);
    }
    got
}

// ---------------------------------------------------------------------------
// Test 1: clean channel — ordered, exactly-once delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_channel_delivers_in_order() {
    const MSG_COUNT: usize = 8;

    let (sender, mut receiver) = endpoints(
        test_config(),
        ChannelConfig::default(),
        ChannelConfig::default(),
    )
    .await;

    for i in 0..MSG_COUNT {
        sender
            .send(format!("msg-{i:02}").into_bytes())
            .await
            .expect("send");
    }

    let got = collect(&mut receiver, MSG_COUNT).await;
    for (i, payload) in got.iter().enumerate() {
        assert_eq!(payload, format!("msg-{i:02}").as_bytes(), "message {i}");
    }

    sender.close().await;
    receiver.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test 2: the sequence bit alternates with each acknowledged message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sender_bit_alternates_across_round_trips() {
    let (sender, mut receiver) = endpoints(
        test_config(),
        ChannelConfig::default(),
        ChannelConfig::default(),
    )
    .await;

    // Three clean round trips: the working bit ends at 3 mod 2 = 1.
    for i in 0..3 {
        sender.send(vec![i]).await.expect("send");
    }
    collect(&mut receiver, 3).await;

    // Give the final ACK a moment to land back at the sender.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sender.state(), SenderState::AwaitCall1);

    sender.close().await;
    receiver.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test 3: dropped first transmission — bit-identical retransmit, then success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ignored_first_transmission_is_retransmitted_identically() {
    let (sender, mut peer) = sender_with_raw_peer(test_config()).await;

    sender.send(b"once only".to_vec()).await.expect("send");

    // Act as a channel that dropped the first copy: read it and stay silent.
    let first = next_frame(&mut peer).await;

    // The retransmit countdown fires and the same bytes come again.
    let second = next_frame(&mut peer).await;
    assert_eq!(first, second, "retransmission must be bit-identical");

    let pkt = Packet::decode(&second).expect("decode");
    assert_eq!(pkt.number, 0);
    assert_eq!(pkt.payload, b"once only");

    // Acknowledge; the sender advances to the other bit.
    peer.send(&ack_frame(0)).await.expect("ack");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sender.state(), SenderState::AwaitCall1);

    sender.close().await;
}

// ---------------------------------------------------------------------------
// Test 4: mismatched ACK is ignored and the retransmit still happens
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mismatched_ack_does_not_advance_the_sender() {
    let (sender, mut peer) = sender_with_raw_peer(test_config()).await;

    sender.send(b"hold".to_vec()).await.expect("send");
    let first = next_frame(&mut peer).await;

    // Structurally valid ACK for the wrong bit: must be ignored.
    peer.send(&ack_frame(1)).await.expect("wrong ack");

    // The original countdown keeps running, so the packet comes again.
    let retransmit = next_frame(&mut peer).await;
    assert_eq!(first, retransmit);
    assert_eq!(sender.state(), SenderState::AwaitAck0);

    peer.send(&ack_frame(0)).await.expect("right ack");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sender.state(), SenderState::AwaitCall1);

    sender.close().await;
}

// ---------------------------------------------------------------------------
// Test 5: duplicate data is re-ACKed but not re-delivered
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_packet_is_reacked_without_redelivery() {
    let (mut receiver, mut peer) = receiver_with_raw_peer(test_config()).await;

    let payload = b"only once";
    let frame = Packet::data(0, checksum::generate(payload, 1), payload.to_vec()).encode();

    // First copy: delivered and ACKed.
    peer.send(&frame).await.expect("send");
    let ack = Packet::decode(&next_frame(&mut peer).await).expect("decode ack");
    assert_eq!(ack.number, 0);
    let delivered = tokio::time::timeout(GUARD, receiver.recv())
        .await
        .expect("delivery timed out")
        .unwrap()
        .unwrap();
    assert_eq!(delivered, payload);

    // Same frame again, as if our ACK had been lost.
    peer.send(&frame).await.expect("resend");
    let re_ack = Packet::decode(&next_frame(&mut peer).await).expect("decode re-ack");
    assert_eq!(re_ack.number, 0, "duplicate is re-ACKed with its own number");

    // ...but nothing reaches the application a second time.
    let second = tokio::time::timeout(Duration::from_millis(400), receiver.recv()).await;
    assert!(second.is_err(), "duplicate must not be re-delivered");

    receiver.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test 6: corrupt data is NACKed with the complement of the expected bit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn corrupt_packet_is_nacked_and_clean_retry_succeeds() {
    let (mut receiver, mut peer) = receiver_with_raw_peer(test_config()).await;

    let payload = b"fragile";
    let mut bad = Packet::data(0, checksum::generate(payload, 1), payload.to_vec()).encode();
    let last = bad.len() - 1;
    bad[last] ^= 0x01;

    peer.send(&bad).await.expect("send corrupt");
    let nack = Packet::decode(&next_frame(&mut peer).await).expect("decode nack");
    assert_eq!(nack.number, 1, "NACK carries the complement of expected");

    // No delivery for the corrupt copy.
    let nothing = tokio::time::timeout(Duration::from_millis(300), receiver.recv()).await;
    assert!(nothing.is_err());

    // Clean retransmission goes through.
    let good = Packet::data(0, checksum::generate(payload, 1), payload.to_vec()).encode();
    peer.send(&good).await.expect("send clean");
    let ack = Packet::decode(&next_frame(&mut peer).await).expect("decode ack");
    assert_eq!(ack.number, 0);
    let delivered = tokio::time::timeout(GUARD, receiver.recv())
        .await
        .expect("delivery timed out")
        .unwrap()
        .unwrap();
    assert_eq!(delivered, payload);

    receiver.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test 7: seeded lossy channel — liveness under loss, exactly-once delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lossy_channel_still_delivers_everything_once() {
    const MSG_COUNT: usize = 6;

    // Both directions drop a quarter of their frames; the seed fixes the
    // fault pattern so the run is reproducible.
    let faults = ChannelConfig {
        loss_rate: 0.25,
        corrupt_rate: 0.0,
        seed: 11,
    };
    let (sender, mut receiver) = endpoints(test_config(), faults, faults).await;

    for i in 0..MSG_COUNT {
        sender.send(format!("lossy-{i}").into_bytes()).await.expect("send");
    }

    let got = collect(&mut receiver, MSG_COUNT).await;
    for (i, payload) in got.iter().enumerate() {
        assert_eq!(payload, format!("lossy-{i}").as_bytes(), "message {i}");
    }

    // Exactly once: nothing further arrives.
    let extra = tokio::time::timeout(Duration::from_millis(500), receiver.recv()).await;
    assert!(extra.is_err(), "no duplicate deliveries");

    sender.close().await;
    receiver.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test 8: seeded corrupting channel — checksum catches flips, NACKs recover
// ---------------------------------------------------------------------------

#[tokio::test]
async fn corrupting_channel_still_delivers_everything_once() {
    const MSG_COUNT: usize = 6;

    let data_faults = ChannelConfig {
        loss_rate: 0.0,
        corrupt_rate: 0.3,
        seed: 23,
    };
    let (sender, mut receiver) =
        endpoints(test_config(), data_faults, ChannelConfig::default()).await;

    for i in 0..MSG_COUNT {
        sender
            .send(format!("flip-{i}").into_bytes())
            .await
            .expect("send");
    }

    let got = collect(&mut receiver, MSG_COUNT).await;
    for (i, payload) in got.iter().enumerate() {
        assert_eq!(payload, format!("flip-{i}").as_bytes(), "message {i}");
    }

    sender.close().await;
    receiver.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test 9: shutdown tears the receiver down while the sender is mid-message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn receiver_shutdown_is_orderly() {
    let (sender, receiver) = endpoints(
        test_config(),
        ChannelConfig::default(),
        ChannelConfig::default(),
    )
    .await;

    sender.send(b"in flight".to_vec()).await.expect("send");
    receiver.shutdown().await;

    // The receiver's transport is gone; the sender notices the closed
    // connection and its loop exits too.  shutdown() must not hang.
    tokio::time::timeout(GUARD, sender.shutdown())
        .await
        .expect("sender shutdown timed out");
}
