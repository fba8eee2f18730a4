//! Persisted high-score table
//!
//! The leaderboard keeps the best scores ever seen, sorted by descending
//! score. New scores are admitted while there is room; once the table is
//! full a new score only gets in by beating the current lowest entry, which
//! it then replaces.
//!
//! ## File format
//!
//! The whole table is written as one fixed-size bincode blob: the entry
//! count as a `u32`, followed by exactly `capacity` [`NetworkScore`] records.
//! Unused slots are written as zeroed records. Reader and writer must agree
//! on the capacity and on the text buffer sizes in `shared`, since nothing
//! in the file records them.

use log::{debug, info};
use shared::{NetworkScore, MAX_LEADERBOARD_SCORES};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("failed to access leaderboard file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed leaderboard file {path:?}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("failed to encode leaderboard: {0}")]
    Encode(#[from] bincode::Error),
}

impl LeaderboardError {
    /// True when the file simply does not exist yet
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LeaderboardError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound
        )
    }
}

/// Ranked list of scores, highest first
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkLeaderboard {
    scores: Vec<NetworkScore>,
    capacity: usize,
}

impl NetworkLeaderboard {
    // The table grows on demand; `capacity` only bounds it
    pub fn new(capacity: usize) -> Self {
        Self {
            scores: Vec::new(),
            capacity,
        }
    }

    /// Admits a score if there is room or if it beats the lowest entry
    pub fn add(&mut self, entry: NetworkScore) -> bool {
        if self.scores.len() < self.capacity {
            self.scores.push(entry);
            self.sort();
            return true;
        }

        match self.scores.last_mut() {
            Some(lowest) if entry.score > lowest.score => {
                *lowest = entry;
                self.sort();
                true
            }
            _ => false,
        }
    }

    // Stable, so equal scores keep their admission order
    fn sort(&mut self) {
        self.scores.sort_by(|a, b| b.score.cmp(&a.score));
    }

    pub fn entries(&self) -> &[NetworkScore] {
        &self.scores
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }

    /// Formats the first `n` entries as `"<rank>) <name>: <score> [<timestamp>]"`
    pub fn top(&self, n: usize) -> Vec<String> {
        self.scores
            .iter()
            .take(n)
            .enumerate()
            .map(|(index, entry)| {
                format!(
                    "{}) {}: {} [{}]",
                    index + 1,
                    entry.name,
                    entry.score,
                    entry.timestamp
                )
            })
            .collect()
    }

    /// Size in bytes of the encoded table for a given capacity
    ///
    /// Fails with `SizeLimit` when the size does not fit in memory.
    pub fn encoded_len(capacity: usize) -> Result<usize, bincode::Error> {
        let header = bincode::serialized_size(&0u32)?;
        let record = bincode::serialized_size(&NetworkScore::default())?;

        u64::try_from(capacity)
            .ok()
            .and_then(|slots| record.checked_mul(slots))
            .and_then(|body| body.checked_add(header))
            .and_then(|total| usize::try_from(total).ok())
            .ok_or_else(|| Box::new(bincode::ErrorKind::SizeLimit))
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        let mut buffer = Vec::with_capacity(Self::encoded_len(self.capacity)?);

        bincode::serialize_into(&mut buffer, &(self.scores.len() as u32))?;
        for slot in 0..self.capacity {
            let record = self.scores.get(slot).copied().unwrap_or_default();
            bincode::serialize_into(&mut buffer, &record)?;
        }

        Ok(buffer)
    }

    /// Decodes a table previously written by [`encode`](Self::encode)
    ///
    /// Rejects buffers of the wrong length, counts larger than the capacity
    /// and entries that are not in descending score order.
    pub fn decode(bytes: &[u8], capacity: usize) -> Result<Self, String> {
        let expected = Self::encoded_len(capacity).map_err(|e| e.to_string())?;
        if bytes.len() != expected {
            return Err(format!(
                "expected {} bytes for {} slots, found {}",
                expected,
                capacity,
                bytes.len()
            ));
        }

        let mut reader = bytes;
        let count: u32 = bincode::deserialize_from(&mut reader).map_err(|e| e.to_string())?;
        let count = count as usize;
        if count > capacity {
            return Err(format!("entry count {} exceeds capacity {}", count, capacity));
        }

        let mut scores = Vec::with_capacity(count);
        for _ in 0..count {
            let entry: NetworkScore =
                bincode::deserialize_from(&mut reader).map_err(|e| e.to_string())?;
            scores.push(entry);
        }

        if scores.windows(2).any(|pair| pair[0].score < pair[1].score) {
            return Err("entries are not sorted by descending score".to_string());
        }

        Ok(Self { scores, capacity })
    }
}

/// Thread-safe handle over one [`NetworkLeaderboard`]
///
/// Every operation holds the lock for its whole duration, including the
/// sort in [`add_score`](Self::add_score) and the file I/O in
/// [`save`](Self::save) and [`load`](Self::load). A slow disk therefore
/// stalls other leaderboard callers, but never the game state store.
#[derive(Debug)]
pub struct LeaderboardStore {
    board: Mutex<NetworkLeaderboard>,
}

impl LeaderboardStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LEADERBOARD_SCORES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            board: Mutex::new(NetworkLeaderboard::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NetworkLeaderboard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offers a score to the leaderboard
    ///
    /// Name and timestamp are truncated to their fixed buffer sizes. Returns
    /// false if the table is full and the score does not beat the lowest entry.
    pub fn add_score(&self, identifier: u32, name: &str, score: u32, timestamp: &str) -> bool {
        let admitted = self
            .lock()
            .add(NetworkScore::new(identifier, name, score, timestamp));

        if !admitted {
            debug!(
                "Score {} from player {} did not qualify for the leaderboard",
                score, identifier
            );
        }
        admitted
    }

    /// Writes the whole table to `path`, replacing any existing file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LeaderboardError> {
        let path = path.as_ref();
        let board = self.lock();

        let bytes = board.encode()?;
        fs::write(path, bytes).map_err(|source| LeaderboardError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            "Saved {} leaderboard entries to {}",
            board.entries().len(),
            path.display()
        );
        Ok(())
    }

    /// Replaces the in-memory table with the contents of `path`
    ///
    /// On any error the current table is left untouched.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(), LeaderboardError> {
        let path = path.as_ref();
        let mut board = self.lock();

        let expected = NetworkLeaderboard::encoded_len(board.capacity()).map_err(|e| {
            LeaderboardError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        // One byte past the expected size is enough to reject an oversized file
        let mut bytes = Vec::new();
        File::open(path)
            .and_then(|file| file.take((expected as u64).saturating_add(1)).read_to_end(&mut bytes))
            .map_err(|source| LeaderboardError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let loaded = NetworkLeaderboard::decode(&bytes, board.capacity()).map_err(|reason| {
            LeaderboardError::Malformed {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        *board = loaded;
        info!(
            "Loaded {} leaderboard entries from {}",
            board.entries().len(),
            path.display()
        );
        Ok(())
    }

    /// Formatted snapshot of the `n` best entries, ranked from 1
    pub fn top_players(&self, n: usize) -> Vec<String> {
        self.lock().top(n)
    }

    /// Copy of all entries in rank order
    pub fn entries(&self) -> Vec<NetworkScore> {
        self.lock().entries().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn reset(&self) {
        self.lock().clear();
    }
}

impl Default for LeaderboardStore {
    fn default() -> Self {
        Self::new()
    }
}
