use crate::game_state::GameStateStore;
use crate::leaderboard::LeaderboardStore;
use shared::{MAX_LEADERBOARD_SCORES, MAX_NETWORK_OBJECTS, MAX_PLAYERS};
use std::sync::Arc;
use thiserror::Error;

/// Largest capacity accepted for any table
pub const MAX_TABLE_CAPACITY: usize = 1 << 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{table} capacity {requested} exceeds the limit of {limit}")]
    CapacityTooLarge {
        table: &'static str,
        requested: usize,
        limit: usize,
    },
}

/// Table capacities, fixed for the lifetime of the stores built from them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub max_objects: usize,
    pub max_players: usize,
    pub max_scores: usize,
}

impl StoreConfig {
    /// Checks every capacity against [`MAX_TABLE_CAPACITY`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (table, requested) in [
            ("object table", self.max_objects),
            ("player table", self.max_players),
            ("leaderboard", self.max_scores),
        ] {
            if requested > MAX_TABLE_CAPACITY {
                return Err(ConfigError::CapacityTooLarge {
                    table,
                    requested,
                    limit: MAX_TABLE_CAPACITY,
                });
            }
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_objects: MAX_NETWORK_OBJECTS,
            max_players: MAX_PLAYERS,
            max_scores: MAX_LEADERBOARD_SCORES,
        }
    }
}

/// Owned handles to both stores, created once at server start
///
/// Clone it, or clone the individual `Arc`s, to hand the stores to every
/// thread or task that needs them. The two stores lock independently.
#[derive(Debug, Clone)]
pub struct Stores {
    pub game_state: Arc<GameStateStore>,
    pub leaderboard: Arc<LeaderboardStore>,
}

impl Stores {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            game_state: Arc::new(GameStateStore::with_capacity(
                config.max_objects,
                config.max_players,
            )),
            leaderboard: Arc::new(LeaderboardStore::with_capacity(config.max_scores)),
        }
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}
