//! Deterministic procedural platform layout
//!
//! Every platform attribute is a pure function of its integer index, so
//! every connected client can reconstruct the same infinite world from the
//! small config blob alone. The server never stores platforms.

use shared::{Vec3, WorldConfig};

/// Kinds of platform the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformType {
    Spawn,
    Normal,
    Moving,
    Jump,
    Rotating,
    Narrow,
    Item,
}

/// Stateless platform generator. Safe to call from any number of sessions
/// concurrently; identical index always yields identical output.
#[derive(Debug, Clone, Copy)]
pub struct WorldGenerator {
    config: WorldConfig,
}

impl WorldGenerator {
    pub fn new(config: WorldConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Position of platform `index`. Index 0 is the spawn platform at its
    /// fixed configured position; all others descend along -y/-z with a
    /// hash-derived lateral offset.
    pub fn position_of(&self, index: u32) -> Vec3 {
        if index == 0 {
            return self.config.spawn_platform_position;
        }

        let y = -(index as f32) * self.config.platform_spacing;
        let z = -(index as f32) * 25.0;

        let seed = u64::from(index) * 9301 + 49297;
        let rand = (seed % 233_280) as f64 / 233_280.0;
        let x = ((rand - 0.5) * 100.0) as f32;

        Vec3::new(x, y, z)
    }

    /// Type of platform `index`. The first ten platforms are a guaranteed
    /// safe stretch; beyond that a second hash buckets into the fixed
    /// distribution {normal .50, moving .15, jump .10, rotating .10,
    /// narrow .07, item .08}.
    pub fn type_of(&self, index: u32) -> PlatformType {
        if index == 0 {
            return PlatformType::Spawn;
        }
        if index < 10 {
            return PlatformType::Normal;
        }

        let seed = u64::from(index) * 12345 + 67890;
        let rand = (seed % 1000) as f64 / 1000.0;

        if rand < 0.50 {
            PlatformType::Normal
        } else if rand < 0.65 {
            PlatformType::Moving
        } else if rand < 0.75 {
            PlatformType::Jump
        } else if rand < 0.85 {
            PlatformType::Rotating
        } else if rand < 0.92 {
            PlatformType::Narrow
        } else {
            PlatformType::Item
        }
    }
}
