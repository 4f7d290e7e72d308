use serde::{Deserialize, Serialize};

/// Minimum time between two successful respawns for the same player.
pub const RESPAWN_COOLDOWN_MS: u64 = 3000;
/// Squared radius of voice audio routing (60 world units).
pub const AUDIO_RANGE_SQ: f32 = 3600.0;
/// Audio activity markers older than this are reset by the liveness sweep.
pub const AUDIO_STALE_MS: u64 = 30_000;
pub const MAX_NICK_LEN: usize = 14;
pub const MAX_CHAT_LEN: usize = 200;
/// Collectible boosts raise the matching max stat by this step.
pub const STAT_STEP: u32 = 25;
pub const STAT_CAP: u32 = 200;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance, the form used for audio range checks.
    pub fn dist_sq(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Immutable world generation parameters, sent once per session at init.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub platform_spacing: f32,
    pub platform_width: f32,
    pub platform_depth: f32,
    pub spawn_position: Vec3,
    pub spawn_platform_position: Vec3,
    pub generation_distance: f32,
    pub max_platforms: u32,
    pub world_depth_limit: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            platform_spacing: 12.0,
            platform_width: 18.0,
            platform_depth: 18.0,
            spawn_position: Vec3::new(0.0, 1.7, 0.0),
            spawn_platform_position: Vec3::new(0.0, 0.0, 0.0),
            generation_distance: 150.0,
            max_platforms: 1000,
            world_depth_limit: -5000.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PlayerStats {
    pub max_stamina: u32,
    pub max_fuel: u32,
    pub stamina: u32,
    pub fuel: u32,
    pub stamina_boosts: u32,
    pub fuel_boosts: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            max_stamina: 100,
            max_fuel: 100,
            stamina: 100,
            fuel: 100,
            stamina_boosts: 0,
            fuel_boosts: 0,
        }
    }
}

/// Authoritative per-session player record. Owned exclusively by the
/// server registry; clients receive snapshots in roster packets.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Player {
    pub id: u32,
    pub nick: String,
    pub pos: Vec3,
    pub start_position: Vec3,
    pub distance_traveled: f32,
    pub stats: PlayerStats,
    pub last_audio_time: u64,
    /// Milliseconds since the epoch; 0 means "never respawned".
    pub last_respawn_time: u64,
    pub on_cooldown: bool,
}

impl Player {
    pub fn new(id: u32, nick: String, spawn: Vec3, now_ms: u64) -> Self {
        Self {
            id,
            nick,
            pos: spawn,
            start_position: spawn,
            distance_traveled: 0.0,
            stats: PlayerStats::default(),
            last_audio_time: now_ms,
            last_respawn_time: 0,
            on_cooldown: false,
        }
    }

    /// Updates the position and the monotone distance-from-start counter.
    /// Returns the floored distance for the `UpdateDistance` reply.
    pub fn record_move(&mut self, x: f32, y: f32, z: f32) -> u32 {
        self.pos = Vec3::new(x, y, z);
        let distance = (self.start_position.y - y).abs();
        self.distance_traveled = self.distance_traveled.max(distance);
        self.distance_traveled.floor() as u32
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum MessageKind {
    System,
    Chat,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // Client -> server
    Connect { client_version: u32 },
    Init { nick: String },
    Move { x: f32, y: f32, z: f32 },
    Audio { buffer: Vec<u8> },
    AudioHeartbeat,
    /// Item kind travels as a string so unknown kinds can be ignored
    /// without failing packet decoding.
    CollectItem { kind: String },
    RequestRespawn,
    Chat { text: String },
    Disconnect,

    // Server -> client
    Connected { client_id: u32 },
    WorldConfig { config: WorldConfig },
    Teleport { pos: Vec3 },
    PlayerStats { stats: PlayerStats },
    CurrentPlayers { players: Vec<Player> },
    PlayerMoved { id: u32, x: f32, y: f32, z: f32 },
    PlayerLeft { id: u32 },
    AudioFrame { id: u32, buffer: Vec<u8>, pos: Vec3 },
    UpdateDistance { distance: u32 },
    RespawnCooldownEnd,
    SetFly { enabled: bool },
    Message { nick: String, msg: String, kind: MessageKind },
    Disconnected { reason: String },
}
