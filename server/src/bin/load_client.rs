//! Synthetic session driver: opens bot sessions against a running server
//! and emits randomized move/chat/heartbeat traffic over the real wire
//! contract. Useful for eyeballing fan-out behavior under load.

use bincode::{deserialize, serialize};
use clap::Parser;
use rand::Rng;
use shared::Packet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::sleep;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address to connect to
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Number of bot sessions to open
    #[clap(short, long, default_value = "8")]
    bots: usize,

    /// How many move events each bot sends before disconnecting
    #[clap(short = 'n', long, default_value = "30")]
    moves: u32,
}

const CHAT_LINES: &[&str] = &["hello!", "ping?", "bot online", "still descending"];

async fn run_bot(
    server_addr: SocketAddr,
    bot_index: usize,
    moves: u32,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let mut buf = [0u8; 65536];

    socket
        .send_to(&serialize(&Packet::Connect { client_version: 1 })?, server_addr)
        .await?;

    let (len, _) = socket.recv_from(&mut buf).await?;
    let client_id = match deserialize::<Packet>(&buf[0..len])? {
        Packet::Connected { client_id } => client_id,
        Packet::Disconnected { reason } => {
            println!("Bot {} rejected: {}", bot_index, reason);
            return Ok(());
        }
        other => {
            println!("Bot {} got unexpected packet: {:?}", bot_index, other);
            return Ok(());
        }
    };

    let nick = format!("Bot_{}", rand::thread_rng().gen_range(0..10000));
    println!("Bot {} connected as session {} ({})", bot_index, client_id, nick);

    socket
        .send_to(&serialize(&Packet::Init { nick })?, server_addr)
        .await?;

    let mut y = 1.7f32;
    for step in 0..moves {
        let (x, z, dy, pause_ms, chatty) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(-50.0..50.0f32),
                rng.gen_range(-100.0..0.0f32),
                rng.gen_range(0.0..12.0f32),
                rng.gen_range(50..300u64),
                rng.gen_bool(0.05),
            )
        };
        // Bots only ever descend, like real players
        y -= dy;

        socket
            .send_to(&serialize(&Packet::Move { x, y, z })?, server_addr)
            .await?;

        if chatty {
            let line = CHAT_LINES[step as usize % CHAT_LINES.len()];
            socket
                .send_to(
                    &serialize(&Packet::Chat {
                        text: line.to_string(),
                    })?,
                    server_addr,
                )
                .await?;
        }

        if step % 10 == 0 {
            socket
                .send_to(&serialize(&Packet::AudioHeartbeat)?, server_addr)
                .await?;
        }

        sleep(Duration::from_millis(pause_ms)).await;
    }

    socket
        .send_to(&serialize(&Packet::Disconnect)?, server_addr)
        .await?;
    println!("Bot {} finished after {} moves", bot_index, moves);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let server_addr = args.server.parse::<SocketAddr>()?;

    println!(
        "Driving {} bots against {} ({} moves each)",
        args.bots, server_addr, args.moves
    );

    let mut handles = Vec::new();
    for bot_index in 0..args.bots {
        handles.push(tokio::spawn(async move {
            if let Err(e) = run_bot(server_addr, bot_index, args.moves).await {
                println!("Bot {} failed: {}", bot_index, e);
            }
        }));
        // Stagger connections a little
        sleep(Duration::from_millis(25)).await;
    }

    for handle in handles {
        let _ = handle.await;
    }

    println!("Load run complete");
    Ok(())
}
