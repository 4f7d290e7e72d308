//! Chat parsing, command dispatch and the respawn request path
//!
//! Handlers mutate the registry/session state and describe every outbound
//! effect as routing directives, which keeps the whole command surface
//! testable without a socket.

use crate::game::{GameState, RespawnOutcome};
use crate::router::Directive;
use crate::session::SessionManager;
use log::info;
use shared::{MessageKind, Packet, Vec3, MAX_CHAT_LEN};

pub const SERVER_NICK: &str = "SERVER";
pub const SYSTEM_NICK: &str = "SYSTEM";

const HELP_TEXT: &str =
    "Commands: /login [password], /tp [nick], /fly, /nofly, /kill [nick], /respawn, /pos, /stats, /distance";

/// A server reply visible only to one session.
pub fn reply(to: u32, msg: String) -> Directive {
    Directive::Send {
        to,
        packet: Packet::Message {
            nick: SERVER_NICK.to_string(),
            msg,
            kind: MessageKind::System,
        },
    }
}

/// A system notice visible to everyone.
pub fn system_broadcast(msg: String) -> Directive {
    Directive::Broadcast {
        packet: Packet::Message {
            nick: SYSTEM_NICK.to_string(),
            msg,
            kind: MessageKind::System,
        },
        exclude: None,
    }
}

/// Shared state machine entry for the chat `/respawn` command and the
/// dedicated respawn request event.
pub fn respawn(sender: u32, game: &mut GameState, now_ms: u64) -> Vec<Directive> {
    match game.try_respawn(sender, now_ms) {
        // Stale reference: session disconnected mid-flight
        None => Vec::new(),
        Some(RespawnOutcome::Cooling { wait_secs }) => {
            vec![reply(
                sender,
                format!("Respawn on cooldown, wait {} sec.", wait_secs),
            )]
        }
        Some(RespawnOutcome::Respawned) => {
            let spawn = game.spawn_position();
            let nick = game
                .players
                .get(&sender)
                .map(|p| p.nick.clone())
                .unwrap_or_default();

            vec![
                Directive::Send {
                    to: sender,
                    packet: Packet::Teleport { pos: spawn },
                },
                Directive::Send {
                    to: sender,
                    packet: Packet::UpdateDistance { distance: 0 },
                },
                reply(sender, "You were teleported to the spawn point".to_string()),
                system_broadcast(format!("{} used respawn", nick)),
                Directive::ScheduleCooldown { session_id: sender },
            ]
        }
    }
}

/// Processes one chat message from `sender`: either a `/` command or a
/// public chat line relayed to every session.
pub fn handle_chat(
    sender: u32,
    text: &str,
    sessions: &mut SessionManager,
    game: &mut GameState,
    admin_password: &str,
    now_ms: u64,
) -> Vec<Directive> {
    let Some(player) = game.players.get(&sender) else {
        // Race with disconnect; nothing to do
        return Vec::new();
    };
    let sender_nick = player.nick.clone();
    let sender_pos = player.pos;
    let sender_distance = player.distance_traveled.floor() as u32;
    let sender_stats = player.stats;

    let text: String = text.chars().take(MAX_CHAT_LEN).collect();

    let Some(command) = text.strip_prefix('/') else {
        return vec![Directive::Broadcast {
            packet: Packet::Message {
                nick: sender_nick,
                msg: text,
                kind: MessageKind::Chat,
            },
            exclude: None,
        }];
    };

    let args: Vec<&str> = command.split(' ').collect();
    let verb = args[0].to_lowercase();

    match verb.as_str() {
        "help" => vec![reply(sender, HELP_TEXT.to_string())],

        "login" => {
            if args.get(1) == Some(&admin_password) {
                sessions.set_admin(sender, true);
                info!("Session {} ({}) gained admin rights", sender, sender_nick);
                vec![reply(sender, "You now have admin rights".to_string())]
            } else {
                vec![reply(sender, "Wrong password".to_string())]
            }
        }

        "pos" => {
            vec![reply(
                sender,
                format!(
                    "Your position: X={:.2}, Y={:.2}, Z={:.2}",
                    sender_pos.x, sender_pos.y, sender_pos.z
                ),
            )]
        }

        "distance" => {
            vec![reply(
                sender,
                format!("Distance from spawn: {} meters", sender_distance),
            )]
        }

        "stats" => {
            vec![reply(
                sender,
                format!(
                    "Stats: stamina {}% ({} boosts), fuel {}% ({} boosts)",
                    sender_stats.max_stamina,
                    sender_stats.stamina_boosts,
                    sender_stats.max_fuel,
                    sender_stats.fuel_boosts
                ),
            )]
        }

        "respawn" => respawn(sender, game, now_ms),

        "tp" | "kill" | "fly" | "nofly" if !sessions.is_admin(sender) => {
            vec![reply(
                sender,
                "You do not have permission. Use /login [password]".to_string(),
            )]
        }

        "tp" => {
            let Some(target) = args.get(1).and_then(|nick| game.find_by_nick(nick)) else {
                // Unknown target nick: silent no-op
                return Vec::new();
            };
            let above = Vec3::new(target.pos.x, target.pos.y + 2.0, target.pos.z);
            let target_nick = target.nick.clone();

            vec![
                Directive::Send {
                    to: sender,
                    packet: Packet::Teleport { pos: above },
                },
                reply(sender, format!("Teleporting to {}", target_nick)),
            ]
        }

        "kill" => {
            let Some((target_id, target_nick)) =
                args.get(1).and_then(|nick| game.kill_player(nick))
            else {
                return Vec::new();
            };
            let spawn = game.spawn_position();

            vec![
                Directive::Send {
                    to: target_id,
                    packet: Packet::Teleport { pos: spawn },
                },
                Directive::Send {
                    to: target_id,
                    packet: Packet::UpdateDistance { distance: 0 },
                },
                system_broadcast(format!(
                    "{} was sent back to spawn by an admin",
                    target_nick
                )),
            ]
        }

        "fly" => vec![Directive::Send {
            to: sender,
            packet: Packet::SetFly { enabled: true },
        }],

        "nofly" => vec![Directive::Send {
            to: sender,
            packet: Packet::SetFly { enabled: false },
        }],

        // Unknown command: ignored without reply
        _ => Vec::new(),
    }
}
