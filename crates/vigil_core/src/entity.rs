//! Entity identity
//!
//! AOI entities are addressed by a dense integer id. No entity ever holds a
//! reference to another; all relations are expressed through ids stored in
//! the grid and the watch table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity handle used by the AOI engine.
///
/// Usually shared with the scene-level identity of the same object, but the
/// engine never assumes so.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Reserved value that never names a registered entity.
    pub const INVALID: EntityId = EntityId(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tag used by visibility policies to tell entity categories apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Player,
    Npc,
    Item,
    /// Game-defined category outside the built-in set.
    Custom(u16),
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Player => f.write_str("player"),
            EntityKind::Npc => f.write_str("npc"),
            EntityKind::Item => f.write_str("item"),
            EntityKind::Custom(tag) => write!(f, "custom:{tag}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_reserved() {
        assert!(!EntityId::INVALID.is_valid());
        assert!(EntityId::new(7).is_valid());
        assert_eq!(EntityId::from(7), EntityId::new(7));
    }

    #[test]
    fn kind_display() {
        assert_eq!(EntityKind::Npc.to_string(), "npc");
        assert_eq!(EntityKind::Custom(3).to_string(), "custom:3");
    }
}
