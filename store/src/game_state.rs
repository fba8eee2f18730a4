//! Authoritative table of replicated objects and player records
//!
//! This module holds the server's current view of every networked object
//! (identifier -> transform) and every player (identifier -> score/lives).
//! Transport and game-loop code push updates in every tick and read values
//! back out when building state snapshots for clients.
//!
//! Both tables sit behind one coarse mutex. An object update and a player
//! update never run at the same time, and every call holds the lock for its
//! whole duration. Callers only ever receive copies, never references into
//! the tables.

use log::{debug, warn};
use shared::{NetworkObject, PlayerData, Transform, Vec2, MAX_NETWORK_OBJECTS, MAX_PLAYERS};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Bounded, insertion-ordered tables guarded by [`GameStateStore`]
///
/// Identifiers are pairwise distinct within each table and neither table
/// ever holds more entries than its capacity.
#[derive(Debug)]
pub struct NetworkGameState {
    objects: Vec<NetworkObject>,
    players: Vec<PlayerData>,
    max_objects: usize,
    max_players: usize,
}

impl NetworkGameState {
    pub fn new(max_objects: usize, max_players: usize) -> Self {
        Self {
            objects: Vec::new(),
            players: Vec::new(),
            max_objects,
            max_players,
        }
    }

    /// Overwrites the transform of an existing object, or appends a new one
    ///
    /// Returns false when the identifier is unknown and the object table is
    /// already at capacity. The table is left unchanged in that case.
    pub fn upsert_object(&mut self, identifier: u32, transform: Transform) -> bool {
        if let Some(object) = self
            .objects
            .iter_mut()
            .find(|object| object.identifier == identifier)
        {
            object.transform = transform;
            return true;
        }

        if self.objects.len() < self.max_objects {
            self.objects.push(NetworkObject {
                identifier,
                transform,
            });
            return true;
        }

        false
    }

    pub fn read_object(&self, identifier: u32) -> Option<Transform> {
        self.objects
            .iter()
            .find(|object| object.identifier == identifier)
            .map(|object| object.transform)
    }

    /// Removes an object and shifts later entries down to keep insertion order
    pub fn remove_object(&mut self, identifier: u32) -> bool {
        match self
            .objects
            .iter()
            .position(|object| object.identifier == identifier)
        {
            Some(index) => {
                self.objects.remove(index);
                true
            }
            None => false,
        }
    }

    /// Same upsert-or-append policy as objects, against the player table
    pub fn upsert_player(&mut self, identifier: u32, score: u32, lives: u32) -> bool {
        if let Some(player) = self
            .players
            .iter_mut()
            .find(|player| player.identifier == identifier)
        {
            player.score = score;
            player.lives = lives;
            return true;
        }

        if self.players.len() < self.max_players {
            self.players.push(PlayerData {
                identifier,
                score,
                lives,
            });
            return true;
        }

        false
    }

    pub fn read_player(&self, identifier: u32) -> Option<(u32, u32)> {
        self.players
            .iter()
            .find(|player| player.identifier == identifier)
            .map(|player| (player.score, player.lives))
    }

    pub fn remove_player(&mut self, identifier: u32) -> bool {
        match self
            .players
            .iter()
            .position(|player| player.identifier == identifier)
        {
            Some(index) => {
                self.players.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn objects(&self) -> &[NetworkObject] {
        &self.objects
    }

    pub fn players(&self) -> &[PlayerData] {
        &self.players
    }

    pub fn max_objects(&self) -> usize {
        self.max_objects
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }
}

/// Thread-safe handle over one [`NetworkGameState`]
///
/// Shared between caller threads through an `Arc`. Capacity misses and
/// lookup misses are reported through the return value and logged; none of
/// them is fatal.
#[derive(Debug)]
pub struct GameStateStore {
    state: Mutex<NetworkGameState>,
}

impl GameStateStore {
    /// Creates a store sized by [`MAX_NETWORK_OBJECTS`] and [`MAX_PLAYERS`]
    pub fn new() -> Self {
        Self::with_capacity(MAX_NETWORK_OBJECTS, MAX_PLAYERS)
    }

    pub fn with_capacity(max_objects: usize, max_players: usize) -> Self {
        Self {
            state: Mutex::new(NetworkGameState::new(max_objects, max_players)),
        }
    }

    // Every mutation finishes before the guard drops, so a poisoned lock
    // still guards a consistent table.
    fn lock(&self) -> MutexGuard<'_, NetworkGameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Updates an object's transform in place, or inserts it if there is room
    ///
    /// Returns false when the object table is full and the identifier is not
    /// already present. Callers are expected to drop the update and carry on;
    /// this usually means too many objects were spawned or the same object was
    /// registered under several identifiers.
    pub fn upsert_object(
        &self,
        identifier: u32,
        position: Vec2,
        velocity: Vec2,
        scale: Vec2,
    ) -> bool {
        let mut state = self.lock();
        let stored = state.upsert_object(identifier, Transform::new(position, velocity, scale));

        if !stored {
            warn!(
                "Object table full ({} entries), dropping object {}",
                state.max_objects(),
                identifier
            );
        }
        stored
    }

    /// Returns a copy of the object's transform
    ///
    /// A miss means the client and server disagree about which objects exist,
    /// typically because the object was destroyed on one side only.
    pub fn read_object(&self, identifier: u32) -> Option<Transform> {
        let transform = self.lock().read_object(identifier);
        if transform.is_none() {
            debug!("Object {} is not synchronised with the server", identifier);
        }
        transform
    }

    pub fn remove_object(&self, identifier: u32) -> bool {
        self.lock().remove_object(identifier)
    }

    /// Updates a player's score and lives, or inserts the player if there is room
    pub fn upsert_player(&self, identifier: u32, score: u32, lives: u32) -> bool {
        let mut state = self.lock();
        let stored = state.upsert_player(identifier, score, lives);

        if !stored {
            warn!(
                "Player table full ({} entries), dropping player {}",
                state.max_players(),
                identifier
            );
        }
        stored
    }

    /// Returns `(score, lives)` for the player
    pub fn read_player(&self, identifier: u32) -> Option<(u32, u32)> {
        let player = self.lock().read_player(identifier);
        if player.is_none() {
            debug!("Player {} is not synchronised with the server", identifier);
        }
        player
    }

    pub fn remove_player(&self, identifier: u32) -> bool {
        self.lock().remove_player(identifier)
    }

    pub fn object_count(&self) -> usize {
        self.lock().objects().len()
    }

    pub fn player_count(&self) -> usize {
        self.lock().players().len()
    }

    /// Copy of every object in insertion order, for building state broadcasts
    pub fn objects(&self) -> Vec<NetworkObject> {
        self.lock().objects().to_vec()
    }

    /// Copy of every player record in insertion order
    pub fn players(&self) -> Vec<PlayerData> {
        self.lock().players().to_vec()
    }
}

impl Default for GameStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn vec2(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn test_store_creation() {
        let store = GameStateStore::new();
        assert_eq!(store.object_count(), 0);
        assert_eq!(store.player_count(), 0);
    }

    #[test]
    fn test_upsert_and_read_object() {
        let store = GameStateStore::new();

        assert!(store.upsert_object(7, vec2(10.0, 20.0), vec2(1.0, -1.0), vec2(2.0, 2.0)));

        let transform = store.read_object(7).unwrap();
        assert_approx_eq!(transform.position.x, 10.0);
        assert_approx_eq!(transform.position.y, 20.0);
        assert_approx_eq!(transform.velocity.y, -1.0);
        assert_approx_eq!(transform.scale.x, 2.0);
    }

    #[test]
    fn test_upsert_same_object_overwrites() {
        let store = GameStateStore::new();

        store.upsert_object(1, vec2(0.0, 0.0), vec2(0.0, 0.0), vec2(1.0, 1.0));
        store.upsert_object(1, vec2(5.0, 6.0), vec2(7.0, 8.0), vec2(3.0, 3.0));

        assert_eq!(store.object_count(), 1);
        let transform = store.read_object(1).unwrap();
        assert_eq!(
            transform,
            Transform::new(vec2(5.0, 6.0), vec2(7.0, 8.0), vec2(3.0, 3.0))
        );
    }

    #[test]
    fn test_read_missing_object() {
        let store = GameStateStore::new();
        store.upsert_object(1, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO);

        assert!(store.read_object(2).is_none());
    }

    #[test]
    fn test_object_table_full() {
        let store = GameStateStore::with_capacity(2, 1);

        assert!(store.upsert_object(1, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO));
        assert!(store.upsert_object(2, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO));
        assert!(!store.upsert_object(3, vec2(9.0, 9.0), Vec2::ZERO, Vec2::ZERO));

        assert_eq!(store.object_count(), 2);
        assert!(store.read_object(3).is_none());
    }

    #[test]
    fn test_full_object_table_still_updates_existing() {
        let store = GameStateStore::with_capacity(1, 1);

        store.upsert_object(1, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO);
        assert!(store.upsert_object(1, vec2(4.0, 4.0), Vec2::ZERO, Vec2::ZERO));

        assert_eq!(store.read_object(1).unwrap().position, vec2(4.0, 4.0));
    }

    #[test]
    fn test_objects_keep_insertion_order() {
        let store = GameStateStore::new();
        for id in [30, 10, 20] {
            store.upsert_object(id, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO);
        }

        let ids: Vec<u32> = store.objects().iter().map(|o| o.identifier).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn test_remove_object_compacts() {
        let store = GameStateStore::with_capacity(3, 1);
        for id in [1, 2, 3] {
            store.upsert_object(id, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO);
        }

        assert!(store.remove_object(2));
        assert!(!store.remove_object(2));

        let ids: Vec<u32> = store.objects().iter().map(|o| o.identifier).collect();
        assert_eq!(ids, vec![1, 3]);

        // Freed slot can be reused
        assert!(store.upsert_object(4, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO));
        assert_eq!(store.object_count(), 3);
    }

    #[test]
    fn test_upsert_and_read_player() {
        let store = GameStateStore::new();

        assert!(store.upsert_player(1, 100, 3));
        assert_eq!(store.read_player(1), Some((100, 3)));

        assert!(store.upsert_player(1, 250, 2));
        assert_eq!(store.read_player(1), Some((250, 2)));
        assert_eq!(store.player_count(), 1);
    }

    #[test]
    fn test_read_missing_player() {
        let store = GameStateStore::new();
        assert_eq!(store.read_player(42), None);
    }

    #[test]
    fn test_player_table_full() {
        let store = GameStateStore::with_capacity(8, 2);

        assert!(store.upsert_player(1, 0, 3));
        assert!(store.upsert_player(2, 0, 3));
        assert!(!store.upsert_player(3, 0, 3));

        assert_eq!(store.player_count(), 2);
        assert_eq!(store.read_player(3), None);
    }

    #[test]
    fn test_player_and_object_tables_are_separate() {
        let store = GameStateStore::with_capacity(1, 1);

        assert!(store.upsert_object(5, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO));
        assert!(store.upsert_player(5, 10, 1));

        assert!(store.read_object(5).is_some());
        assert_eq!(store.read_player(5), Some((10, 1)));
    }

    #[test]
    fn test_remove_player() {
        let store = GameStateStore::new();
        store.upsert_player(1, 10, 3);
        store.upsert_player(2, 20, 3);

        assert!(store.remove_player(1));
        assert_eq!(store.read_player(1), None);
        assert_eq!(store.players(), vec![PlayerData { identifier: 2, score: 20, lives: 3 }]);
    }

    #[test]
    fn test_huge_capacity_does_not_allocate() {
        let store = GameStateStore::with_capacity(usize::MAX, usize::MAX);

        assert!(store.upsert_object(1, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO));
        assert!(store.upsert_player(1, 10, 3));
        assert_eq!(store.object_count(), 1);
        assert_eq!(store.player_count(), 1);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        use std::sync::Arc;

        let store = Arc::new(GameStateStore::new());
        store.upsert_player(1, 10, 3);

        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(store.read_player(1), Some((10, 3)));
        assert!(store.upsert_player(2, 5, 1));
    }
}
