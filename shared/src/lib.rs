use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

pub const MAX_NETWORK_OBJECTS: usize = 256;
pub const MAX_PLAYERS: usize = 4;
pub const MAX_LEADERBOARD_SCORES: usize = 10;
pub const MAX_NAME_LENGTH: usize = 32;
pub const TIME_FORMAT: usize = 20;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Replicated physical state of a networked object
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub velocity: Vec2,
    pub scale: Vec2,
}

impl Transform {
    pub fn new(position: Vec2, velocity: Vec2, scale: Vec2) -> Self {
        Self {
            position,
            velocity,
            scale,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct NetworkObject {
    pub identifier: u32,
    pub transform: Transform,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PlayerData {
    pub identifier: u32,
    pub score: u32,
    pub lives: u32,
}

/// Zero-padded text buffer of exactly `N` bytes.
///
/// Input longer than `N` bytes is cut at the last character boundary that
/// fits. The stored text ends at the first zero byte, or at the end of the
/// buffer when it is completely filled. Serializes as a fixed-width tuple of
/// `N` bytes so records keep a constant encoded size.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedText<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> FixedText<N> {
    pub fn new(text: &str) -> Self {
        let mut end = text.len().min(N);
        while !text.is_char_boundary(end) {
            end -= 1;
        }

        let mut bytes = [0u8; N];
        bytes[..end].copy_from_slice(&text.as_bytes()[..end]);
        Self { bytes }
    }

    /// Number of meaningful bytes before the zero padding
    pub fn len(&self) -> usize {
        self.bytes.iter().position(|&b| b == 0).unwrap_or(N)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text content. Buffers loaded from disk may hold invalid UTF-8,
    /// which is replaced rather than rejected.
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes[..self.len()])
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> Default for FixedText<N> {
    fn default() -> Self {
        Self { bytes: [0u8; N] }
    }
}

impl<const N: usize> From<&str> for FixedText<N> {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl<const N: usize> fmt::Display for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl<const N: usize> fmt::Debug for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedText<{}>({:?})", N, self.as_str())
    }
}

impl<const N: usize> Serialize for FixedText<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(N)?;
        for byte in &self.bytes {
            tuple.serialize_element(byte)?;
        }
        tuple.end()
    }
}

struct FixedTextVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for FixedTextVisitor<N> {
    type Value = FixedText<N>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a text buffer of {} bytes", N)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = [0u8; N];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Ok(FixedText { bytes })
    }
}

impl<'de, const N: usize> Deserialize<'de> for FixedText<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(N, FixedTextVisitor::<N>)
    }
}

/// One ranked leaderboard record
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkScore {
    pub identifier: u32,
    pub name: FixedText<MAX_NAME_LENGTH>,
    pub score: u32,
    pub timestamp: FixedText<TIME_FORMAT>,
}

impl NetworkScore {
    pub fn new(identifier: u32, name: &str, score: u32, timestamp: &str) -> Self {
        Self {
            identifier,
            name: FixedText::new(name),
            score,
            timestamp: FixedText::new(timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_fixed_text_fits() {
        let text: FixedText<8> = FixedText::new("alice");
        assert_eq!(text.as_str(), "alice");
        assert_eq!(text.len(), 5);
        assert_eq!(&text.as_bytes()[5..], &[0, 0, 0]);
    }

    #[test]
    fn test_fixed_text_exact_length() {
        let text: FixedText<5> = FixedText::new("alice");
        assert_eq!(text.as_str(), "alice");
        assert_eq!(text.len(), 5);
    }

    #[test]
    fn test_fixed_text_truncates() {
        let text: FixedText<4> = FixedText::new("alexander");
        assert_eq!(text.as_str(), "alex");
    }

    #[test]
    fn test_fixed_text_truncates_on_char_boundary() {
        // 'é' is two bytes and would straddle the limit
        let text: FixedText<4> = FixedText::new("abcé");
        assert_eq!(text.as_str(), "abc");
        assert_eq!(text.len(), 3);
    }

    #[test]
    fn test_fixed_text_empty() {
        let text: FixedText<4> = FixedText::default();
        assert!(text.is_empty());
        assert_eq!(text.to_string(), "");
    }

    #[test]
    fn test_fixed_text_invalid_utf8_is_lossy() {
        let text: FixedText<4> = bincode::deserialize(&[0xff, b'a', 0, 0]).unwrap();
        assert_eq!(text.as_str(), "\u{fffd}a");
    }

    #[test]
    fn test_network_score_encoded_size_is_fixed() {
        let short = NetworkScore::new(1, "a", 10, "");
        let long = NetworkScore::new(2, &"x".repeat(100), 20, &"9".repeat(100));

        let expected = (4 + MAX_NAME_LENGTH + 4 + TIME_FORMAT) as u64;
        assert_eq!(bincode::serialized_size(&short).unwrap(), expected);
        assert_eq!(bincode::serialized_size(&long).unwrap(), expected);
    }

    #[test]
    fn test_network_score_serialization() {
        let score = NetworkScore::new(7, &"n".repeat(40), 1234, "2024-01-01 12:00:00 extra");

        let serialized = bincode::serialize(&score).unwrap();
        let deserialized: NetworkScore = bincode::deserialize(&serialized).unwrap();

        assert_eq!(deserialized, score);
        assert_eq!(deserialized.name.len(), MAX_NAME_LENGTH);
        assert_eq!(deserialized.timestamp.as_str(), "2024-01-01 12:00:00 ");
    }

    #[test]
    fn test_transform_serialization() {
        let transform = Transform::new(
            Vec2::new(100.5, -20.25),
            Vec2::new(3.0, 4.0),
            Vec2::new(1.0, 1.0),
        );

        let serialized = bincode::serialize(&transform).unwrap();
        let deserialized: Transform = bincode::deserialize(&serialized).unwrap();

        assert_approx_eq!(deserialized.position.x, 100.5);
        assert_approx_eq!(deserialized.position.y, -20.25);
        assert_approx_eq!(deserialized.velocity.y, 4.0);
        assert_eq!(deserialized.scale, Vec2::new(1.0, 1.0));
    }
}
