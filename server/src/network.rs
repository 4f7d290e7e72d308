//! Server network layer handling UDP communications and the event loop
//!
//! All session events funnel through one `ServerMessage` channel into a
//! single `tokio::select!` loop, so per-player state mutation is serialized
//! without locking. Timers (cooldown expiry, the audio sweep) deliver onto
//! the same channel and can never interleave with a concurrent disconnect.
//! Outbound delivery runs on a separate task and never blocks the loop.

use crate::commands;
use crate::game::GameState;
use crate::router::{self, Directive};
use crate::session::SessionManager;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, WorldConfig, RESPAWN_COOLDOWN_MS};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Interval of the audio liveness sweep.
const AUDIO_SWEEP_INTERVAL: Duration = Duration::from_secs(10);
/// Interval of the session timeout check.
const TIMEOUT_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Messages delivered to the main serializing loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    SessionTimeout {
        session_id: u32,
    },
    /// A respawn cooldown timer fired; ignored if the player is gone.
    CooldownExpired {
        session_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages from the main loop to the outbound sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Main server coordinating transport, sessions and world rules
pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: Arc<RwLock<SessionManager>>,
    game: GameState,
    admin_password: String,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_sessions: usize,
        admin_password: String,
        config: WorldConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            sessions: Arc::new(RwLock::new(SessionManager::new(max_sessions))),
            game: GameState::new(config),
            admin_password,
            server_tx,
            server_rx,
            out_tx,
            out_rx,
        })
    }

    /// Spawns the task that continuously listens for incoming datagrams
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            // Audio frames can approach the datagram limit
            let mut buffer = vec![0u8; 65536];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outbound queue. Delivery is
    /// fire-and-forget; a lost datagram is never retried.
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let sessions = Arc::clone(&self.sessions);
        let mut out_rx = std::mem::replace(&mut self.out_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    OutboundMessage::BroadcastPacket { packet, exclude } => {
                        let session_addrs = {
                            let sessions_guard = sessions.read().await;
                            sessions_guard.session_addrs()
                        };

                        for (session_id, addr) in session_addrs {
                            if Some(session_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to session {}: {}", session_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that sweeps silent sessions
    async fn spawn_timeout_checker(&self) {
        let sessions = Arc::clone(&self.sessions);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TIMEOUT_CHECK_INTERVAL);

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut sessions_guard = sessions.write().await;
                    sessions_guard.check_timeouts()
                };

                for session_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::SessionTimeout { session_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Turns routing directives into outbound queue entries and timers.
    async fn apply_directives(&self, directives: Vec<Directive>) {
        for directive in directives {
            match directive {
                Directive::Send { to, packet } => {
                    let addr = {
                        let sessions = self.sessions.read().await;
                        sessions.addr_of(to)
                    };

                    // Recipient may have disconnected since the directive
                    // was produced; dropping it is fine
                    if let Some(addr) = addr {
                        if let Err(e) = self.out_tx.send(OutboundMessage::SendPacket { packet, addr })
                        {
                            error!("Failed to queue packet for session {}: {}", to, e);
                        }
                    }
                }
                Directive::Broadcast { packet, exclude } => {
                    if let Err(e) = self
                        .out_tx
                        .send(OutboundMessage::BroadcastPacket { packet, exclude })
                    {
                        error!("Failed to queue broadcast packet: {}", e);
                    }
                }
                Directive::ScheduleCooldown { session_id } => {
                    let server_tx = self.server_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(RESPAWN_COOLDOWN_MS)).await;
                        let _ = server_tx.send(ServerMessage::CooldownExpired { session_id });
                    });
                }
            }
        }
    }

    /// Removes a session's player and produces the departure fan-out.
    /// Sessions that never completed init produce no announcement.
    fn depart(&mut self, session_id: u32) -> Vec<Directive> {
        match self.game.remove_player(&session_id) {
            Some(nick) => vec![
                Directive::Broadcast {
                    packet: Packet::PlayerLeft { id: session_id },
                    exclude: None,
                },
                commands::system_broadcast(format!("{} left the game", nick)),
            ],
            None => Vec::new(),
        }
    }

    /// Processes one inbound packet on the serializing timeline
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect { client_version } = packet {
            info!(
                "Session connecting from {} (version: {})",
                addr, client_version
            );

            // A rebind from the same address replaces the old session
            let existing = {
                let sessions = self.sessions.read().await;
                sessions.find_by_addr(addr)
            };

            if let Some(existing_id) = existing {
                info!("Removing existing session {} from {}", existing_id, addr);
                {
                    let mut sessions = self.sessions.write().await;
                    sessions.remove_session(&existing_id);
                }
                let directives = self.depart(existing_id);
                self.apply_directives(directives).await;
            }

            let session_id = {
                let mut sessions = self.sessions.write().await;
                sessions.add_session(addr)
            };

            let response = match session_id {
                Some(session_id) => Packet::Connected { client_id: session_id },
                None => Packet::Disconnected {
                    reason: "Server full".to_string(),
                },
            };
            if let Err(e) = self
                .out_tx
                .send(OutboundMessage::SendPacket { packet: response, addr })
            {
                error!("Failed to queue connect response: {}", e);
            }
            return;
        }

        let session_id = {
            let mut sessions = self.sessions.write().await;
            let session_id = sessions.find_by_addr(addr);
            if let Some(session_id) = session_id {
                sessions.touch(session_id);
            }
            session_id
        };

        let Some(session_id) = session_id else {
            debug!("Dropping packet from unknown address {}", addr);
            return;
        };

        let directives = match packet {
            Packet::Init { nick } => {
                let player = self.game.init_player(session_id, &nick, now_ms());

                vec![
                    Directive::Send {
                        to: session_id,
                        packet: Packet::WorldConfig {
                            config: *self.game.config(),
                        },
                    },
                    Directive::Send {
                        to: session_id,
                        packet: Packet::Teleport {
                            pos: self.game.spawn_position(),
                        },
                    },
                    Directive::Send {
                        to: session_id,
                        packet: Packet::PlayerStats {
                            stats: player.stats,
                        },
                    },
                    Directive::Broadcast {
                        packet: Packet::CurrentPlayers {
                            players: self.game.roster(),
                        },
                        exclude: None,
                    },
                    commands::system_broadcast(format!("{} joined the game", player.nick)),
                ]
            }

            Packet::Move { x, y, z } => match self.game.apply_move(session_id, x, y, z) {
                Some(distance) => vec![
                    Directive::Send {
                        to: session_id,
                        packet: Packet::UpdateDistance { distance },
                    },
                    router::route_move(session_id, x, y, z),
                ],
                // Move raced a disconnect; silently ignored
                None => Vec::new(),
            },

            Packet::Audio { buffer } => {
                self.game.mark_audio(session_id, now_ms());
                router::route_audio(&self.game.players, session_id, buffer)
            }

            Packet::AudioHeartbeat => {
                self.game.mark_audio(session_id, now_ms());
                Vec::new()
            }

            Packet::CollectItem { kind } => match self.game.collect_item(session_id, &kind) {
                Some((stats, msg)) => vec![
                    Directive::Send {
                        to: session_id,
                        packet: Packet::PlayerStats { stats },
                    },
                    commands::reply(session_id, msg),
                ],
                // Unknown item kinds are ignored
                None => Vec::new(),
            },

            Packet::RequestRespawn => commands::respawn(session_id, &mut self.game, now_ms()),

            Packet::Chat { text } => {
                let mut sessions = self.sessions.write().await;
                commands::handle_chat(
                    session_id,
                    &text,
                    &mut sessions,
                    &mut self.game,
                    &self.admin_password,
                    now_ms(),
                )
            }

            Packet::Disconnect => {
                {
                    let mut sessions = self.sessions.write().await;
                    sessions.remove_session(&session_id);
                }
                self.depart(session_id)
            }

            _ => {
                warn!("Unexpected packet type from session at {}", addr);
                Vec::new()
            }
        };

        self.apply_directives(directives).await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut sweep_interval = interval(AUDIO_SWEEP_INTERVAL);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::SessionTimeout { session_id }) => {
                            info!("Session {} timed out", session_id);
                            let directives = self.depart(session_id);
                            self.apply_directives(directives).await;
                        },
                        Some(ServerMessage::CooldownExpired { session_id }) => {
                            // Never resurrects a removed player
                            if self.game.end_cooldown(session_id) {
                                self.apply_directives(vec![Directive::Send {
                                    to: session_id,
                                    packet: Packet::RespawnCooldownEnd,
                                }]).await;
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = sweep_interval.tick() => {
                    let reset = self.game.sweep_audio(now_ms());
                    if reset > 0 {
                        debug!("Audio sweep reset {} stale markers", reset);
                    }
                },
            }
        }

        Ok(())
    }
}
