//! # Game State Store
//!
//! This library holds the authoritative in-memory state of a networked game
//! server: every replicated object and player the server knows about, plus a
//! persisted leaderboard of the best scores ever recorded. Transport and
//! game-loop code push updates into these stores and pull copies back out.
//! Nothing here does networking or scheduling on its own.
//!
//! ## Module Organization
//!
//! ### Game State Module (`game_state`)
//! Bounded tables of networked objects (identifier -> transform) and players
//! (identifier -> score and lives):
//! - Upsert-or-append semantics keyed by a caller-assigned identifier
//! - Fixed capacity per table; inserts past capacity fail instead of growing
//! - Removal with order-preserving compaction
//!
//! ### Leaderboard Module (`leaderboard`)
//! Ranked high-score table:
//! - Insert while there is room, otherwise replace the lowest entry if beaten
//! - Always sorted by descending score, ties kept in admission order
//! - Whole-table binary persistence with validation on load
//! - Top-N formatted snapshots for display
//!
//! ### Config Module (`config`)
//! Table capacities and the `Stores` bundle that owns both stores.
//!
//! ### Checkpoint Module (`checkpoint`)
//! Async task that saves the leaderboard periodically and on shutdown.
//!
//! ## Concurrency
//!
//! Each store is guarded by its own mutex, held for the full duration of
//! every operation. The two stores never wait on each other, and no
//! operation calls another locked operation, so callers cannot deadlock.
//! Share the stores between threads by cloning the `Arc` handles in
//! [`Stores`].
//!
//! ## Usage Example
//!
//! ```rust
//! use shared::Vec2;
//! use store::{StoreConfig, Stores};
//!
//! let stores = Stores::new(&StoreConfig::default());
//!
//! stores.game_state.upsert_object(1, Vec2::new(10.0, 5.0), Vec2::ZERO, Vec2::new(1.0, 1.0));
//! stores.game_state.upsert_player(1, 1500, 3);
//! assert_eq!(stores.game_state.read_player(1), Some((1500, 3)));
//!
//! stores.leaderboard.add_score(1, "alice", 1500, "2024-05-01 18:30:00");
//! assert_eq!(
//!     stores.leaderboard.top_players(3),
//!     vec!["1) alice: 1500 [2024-05-01 18:30:00]"]
//! );
//! ```

pub mod checkpoint;
pub mod config;
pub mod game_state;
pub mod leaderboard;

pub use checkpoint::CheckpointError;
pub use config::{ConfigError, StoreConfig, Stores};
pub use game_state::GameStateStore;
pub use leaderboard::{LeaderboardError, LeaderboardStore};
