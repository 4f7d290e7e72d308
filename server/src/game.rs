//! Authoritative player registry and session rules
//!
//! Owns every `Player` record exclusively; other components only receive
//! transient references while one event is being processed. All mutation
//! happens on the server's single event-processing timeline, so no locking
//! is needed inside this module.

use log::info;
use shared::{
    Player, PlayerStats, Vec3, WorldConfig, AUDIO_STALE_MS, MAX_NICK_LEN, RESPAWN_COOLDOWN_MS,
    STAT_CAP, STAT_STEP,
};
use std::collections::HashMap;

/// Result of a respawn request against the per-player cooldown machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnOutcome {
    /// Transitioned Idle -> Cooling: the player was reset and teleported.
    Respawned,
    /// Still cooling; remaining wait in whole seconds, rounded up.
    Cooling { wait_secs: u64 },
}

/// Escapes angle brackets, truncates to the nick length limit and falls
/// back to "Anon" for empty input. Escaping runs first, so an entity can
/// be cut mid-sequence exactly like the original behavior.
pub fn sanitize_nick(raw: &str) -> String {
    let escaped = raw.replace('<', "&lt;").replace('>', "&gt;");
    let truncated: String = escaped.chars().take(MAX_NICK_LEN).collect();
    if truncated.is_empty() {
        "Anon".to_string()
    } else {
        truncated
    }
}

pub struct GameState {
    pub players: HashMap<u32, Player>,
    config: WorldConfig,
}

impl GameState {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            players: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn spawn_position(&self) -> Vec3 {
        self.config.spawn_position
    }

    /// Registers a player for a session that completed init. Returns a
    /// snapshot for the initial sync.
    pub fn init_player(&mut self, session_id: u32, raw_nick: &str, now_ms: u64) -> Player {
        let nick = sanitize_nick(raw_nick);
        let player = Player::new(session_id, nick, self.config.spawn_position, now_ms);

        info!("Player {} ({}) entered the world", player.id, player.nick);
        self.players.insert(session_id, player.clone());
        player
    }

    /// Applies a client-reported move. Returns the floored distance for the
    /// sender's `UpdateDistance`, or `None` when no player is registered
    /// for the session (a race with disconnect, silently ignored).
    pub fn apply_move(&mut self, session_id: u32, x: f32, y: f32, z: f32) -> Option<u32> {
        self.players
            .get_mut(&session_id)
            .map(|player| player.record_move(x, y, z))
    }

    /// Removes the player and returns its last-known nick for the departure
    /// announcement. `None` means the session never completed init or was
    /// already removed; no announcement in that case.
    pub fn remove_player(&mut self, session_id: &u32) -> Option<String> {
        self.players.remove(session_id).map(|player| {
            info!("Player {} ({}) left the world", player.id, player.nick);
            player.nick
        })
    }

    /// Records audio activity for the liveness marker.
    pub fn mark_audio(&mut self, session_id: u32, now_ms: u64) {
        if let Some(player) = self.players.get_mut(&session_id) {
            player.last_audio_time = now_ms;
        }
    }

    /// Resets audio activity markers older than 30s. Presence GC only,
    /// never a disconnect trigger. Returns how many were reset.
    pub fn sweep_audio(&mut self, now_ms: u64) -> usize {
        let mut reset = 0;
        for player in self.players.values_mut() {
            if now_ms.saturating_sub(player.last_audio_time) > AUDIO_STALE_MS {
                player.last_audio_time = now_ms;
                reset += 1;
            }
        }
        reset
    }

    /// Applies a collected item. Returns the updated stats and a system
    /// message, or `None` for unknown kinds and unregistered sessions.
    pub fn collect_item(&mut self, session_id: u32, kind: &str) -> Option<(PlayerStats, String)> {
        let player = self.players.get_mut(&session_id)?;

        let msg = match kind {
            "stamina" => {
                player.stats.max_stamina = (player.stats.max_stamina + STAT_STEP).min(STAT_CAP);
                player.stats.stamina_boosts += 1;
                format!("Max stamina increased to {}%", player.stats.max_stamina)
            }
            "fuel" => {
                player.stats.max_fuel = (player.stats.max_fuel + STAT_STEP).min(STAT_CAP);
                player.stats.fuel_boosts += 1;
                format!("Max fuel increased to {}%", player.stats.max_fuel)
            }
            _ => return None,
        };

        Some((player.stats, msg))
    }

    /// Runs the respawn cooldown machine for a player.
    ///
    /// The transition is allowed when the player never respawned
    /// (`last_respawn_time == 0`) or at least the cooldown elapsed. A
    /// future-dated `last_respawn_time` (clock skew) saturates to zero
    /// elapsed and reads as cooling; that case is undefined by design.
    ///
    /// On success the distance counter resets, the player teleports to
    /// spawn and the caller must schedule the cooldown-end notification.
    pub fn try_respawn(&mut self, session_id: u32, now_ms: u64) -> Option<RespawnOutcome> {
        let spawn = self.config.spawn_position;
        let player = self.players.get_mut(&session_id)?;

        let elapsed = now_ms.saturating_sub(player.last_respawn_time);
        if player.last_respawn_time != 0 && elapsed < RESPAWN_COOLDOWN_MS {
            let remaining = RESPAWN_COOLDOWN_MS - elapsed;
            let wait_secs = remaining.div_ceil(1000);
            return Some(RespawnOutcome::Cooling { wait_secs });
        }

        player.last_respawn_time = now_ms;
        player.on_cooldown = true;
        player.distance_traveled = 0.0;
        player.pos = spawn;

        info!("Player {} ({}) respawned", player.id, player.nick);
        Some(RespawnOutcome::Respawned)
    }

    /// Fires when a scheduled cooldown expiry lands on the event timeline.
    /// Returns true only when the player still exists; a timer must never
    /// resurrect a removed player.
    pub fn end_cooldown(&mut self, session_id: u32) -> bool {
        match self.players.get_mut(&session_id) {
            Some(player) => {
                player.on_cooldown = false;
                true
            }
            None => false,
        }
    }

    /// Administrative reset of the first player matching `nick`: distance
    /// zeroed and teleported to spawn, bypassing the cooldown machine.
    /// Returns the target's id and nick.
    pub fn kill_player(&mut self, nick: &str) -> Option<(u32, String)> {
        let spawn = self.config.spawn_position;
        let target = self.players.values_mut().find(|p| p.nick == nick)?;

        target.distance_traveled = 0.0;
        target.pos = spawn;

        info!("Player {} ({}) was reset by an admin", target.id, target.nick);
        Some((target.id, target.nick.clone()))
    }

    /// First player matching `nick`, for admin targeting.
    pub fn find_by_nick(&self, nick: &str) -> Option<&Player> {
        self.players.values().find(|p| p.nick == nick)
    }

    /// Full roster snapshot for `CurrentPlayers`.
    pub fn roster(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
