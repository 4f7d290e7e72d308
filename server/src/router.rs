//! Outbound routing: movement fan-out and proximity-filtered audio
//!
//! Components express their effects as [`Directive`] values; the network
//! layer turns them into datagrams (or scheduled timers) without ever
//! blocking the sender's event processing.

use shared::{Packet, Player, AUDIO_RANGE_SQ};
use std::collections::HashMap;

/// One outbound effect produced while handling a session event.
#[derive(Debug)]
pub enum Directive {
    /// Deliver a packet to a single session.
    Send { to: u32, packet: Packet },
    /// Deliver a packet to every session, optionally excluding one.
    Broadcast { packet: Packet, exclude: Option<u32> },
    /// Arm the respawn cooldown expiry timer for a player.
    ScheduleCooldown { session_id: u32 },
}

/// Sessions within voice range of `sender`, excluding the sender itself.
///
/// O(players) per audio frame; acceptable because the session count is
/// server-bounded.
pub fn audio_recipients(players: &HashMap<u32, Player>, sender: u32) -> Vec<u32> {
    let Some(origin) = players.get(&sender) else {
        return Vec::new();
    };

    players
        .iter()
        .filter(|(id, target)| **id != sender && origin.pos.dist_sq(&target.pos) < AUDIO_RANGE_SQ)
        .map(|(id, _)| *id)
        .collect()
}

/// Builds the per-recipient audio directives for one frame from `sender`.
/// Listeners out of range receive nothing.
pub fn route_audio(players: &HashMap<u32, Player>, sender: u32, buffer: Vec<u8>) -> Vec<Directive> {
    let Some(origin) = players.get(&sender) else {
        return Vec::new();
    };
    let pos = origin.pos;

    audio_recipients(players, sender)
        .into_iter()
        .map(|to| Directive::Send {
            to,
            packet: Packet::AudioFrame {
                id: sender,
                buffer: buffer.clone(),
                pos,
            },
        })
        .collect()
}

/// Movement update for everyone except the mover.
pub fn route_move(sender: u32, x: f32, y: f32, z: f32) -> Directive {
    Directive::Broadcast {
        packet: Packet::PlayerMoved { id: sender, x, y, z },
        exclude: Some(sender),
    }
}
