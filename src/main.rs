//! Entry point for `rdt-over-tcp`.
//!
//! Parses CLI arguments and dispatches into either **sender** or **receiver**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, signal handling, argument parsing) and the
//! interactive stdin loop.

use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use rdt_over_tcp::channel::ChannelConfig;
use rdt_over_tcp::config::ProtocolConfig;
use rdt_over_tcp::session::{ReceiverSession, SenderSession};
use rdt_over_tcp::transport::{Listener, Transport};

/// Stop-and-wait reliable delivery over a simulated lossy channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Checksum block size in bytes (1-4).
    #[arg(long, default_value_t = 1)]
    block_size: usize,

    /// Retransmit timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Probability that an outbound frame is dropped.
    #[arg(long, default_value_t = 0.0)]
    loss: f64,

    /// Probability that an outbound frame has one payload bit flipped.
    #[arg(long, default_value_t = 0.0)]
    corrupt: f64,

    /// Seed for the channel fault model.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Subcommand)]
enum Mode {
    /// Serve one receiver and send it lines read from stdin.
    Sender {
        /// Local address to bind (e.g. 127.0.0.1:8000).
        #[arg(short, long, default_value = "127.0.0.1:8000")]
        bind: String,
    },
    /// Connect to a sender and print delivered messages.
    Receiver {
        /// Remote sender address (e.g. 127.0.0.1:8000).
        #[arg(short, long, default_value = "127.0.0.1:8000")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let config = ProtocolConfig {
        block_size: cli.block_size,
        timeout: Duration::from_millis(cli.timeout_ms),
        ..ProtocolConfig::default()
    };
    config.validate()?;
    let channel = ChannelConfig {
        loss_rate: cli.loss,
        corrupt_rate: cli.corrupt,
        seed: cli.seed,
    };

    match cli.mode {
        Mode::Sender { bind } => run_sender(bind.parse()?, config, channel).await,
        Mode::Receiver { server } => run_receiver(server.parse()?, config, channel).await,
    }
}

/// Bind, serve a single receiver, then feed it stdin lines.
async fn run_sender(
    bind: SocketAddr,
    config: ProtocolConfig,
    channel: ChannelConfig,
) -> Result<(), Box<dyn Error>> {
    let listener = Listener::bind(bind).await?;
    log::info!("listening on {}", listener.local_addr);

    let (transport, peer) = listener.accept(config.recv_timeout).await?;
    log::info!("receiver connected from {peer}");

    let handle = SenderSession::new(transport, &config, channel)?.run();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupted = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                break;
            }
            line = lines.next_line() => match line? {
                None => break,
                Some(text) if text == "!quit" => break,
                Some(text) if text == "!state" => {
                    log::info!("sender state: {}", handle.state());
                }
                Some(text) if text.is_empty() => {}
                Some(text) => {
                    if handle.send(text.into_bytes()).await.is_err() {
                        log::warn!("session ended; message not queued");
                        break;
                    }
                }
            }
        }
    }

    if interrupted {
        log::info!("interrupted; shutting down");
        handle.shutdown().await;
    } else {
        handle.close().await;
    }
    Ok(())
}

/// Connect to a sender and print everything it delivers.
async fn run_receiver(
    server: SocketAddr,
    config: ProtocolConfig,
    channel: ChannelConfig,
) -> Result<(), Box<dyn Error>> {
    let transport = Transport::connect(server, config.recv_timeout).await?;
    log::info!("connected to sender at {server}");

    let mut handle = ReceiverSession::new(transport, &config, channel)?.run();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            delivered = handle.recv() => match delivered {
                None => break,
                Some(Ok(payload)) => {
                    println!("[delivered] {}", String::from_utf8_lossy(&payload));
                }
                Some(Err(e)) => {
                    log::error!("session failed: {e}");
                    break;
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
