//! User and focus model.
//!
//! # Invariants
//! - A user's `Now` bucket holds at most one item.
//! - An item sits in at most one bucket per user.

use super::item::{Item, ItemId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Stable identifier of a user.
pub type UserId = u64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Per-user focus classification of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusBucket {
    /// The single item the user is working on right now.
    Now,
    Later,
    Watch,
}

impl FocusBucket {
    /// Every bucket, in display order.
    pub const ALL: [FocusBucket; 3] = [FocusBucket::Now, FocusBucket::Later, FocusBucket::Watch];

    /// Single-digit code used inside store keys.
    pub fn code(self) -> u8 {
        match self {
            Self::Now => 1,
            Self::Later => 2,
            Self::Watch => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Now),
            2 => Some(Self::Later),
            3 => Some(Self::Watch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Later => "later",
            Self::Watch => "watch",
        }
    }
}

impl Display for FocusBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved focus buckets of one user, each in position order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusData {
    pub now: Option<Item>,
    pub later: Vec<Item>,
    pub watch: Vec<Item>,
}

impl FocusData {
    /// Returns the bucket holding `item`, if any.
    pub fn bucket_of(&self, item: ItemId) -> Option<FocusBucket> {
        if self.now.as_ref().is_some_and(|now| now.id == item) {
            return Some(FocusBucket::Now);
        }
        if self.later.iter().any(|entry| entry.id == item) {
            return Some(FocusBucket::Later);
        }
        if self.watch.iter().any(|entry| entry.id == item) {
            return Some(FocusBucket::Watch);
        }
        None
    }

    /// Item ids of one bucket in position order.
    pub fn ids(&self, bucket: FocusBucket) -> Vec<ItemId> {
        match bucket {
            FocusBucket::Now => self.now.iter().map(|item| item.id).collect(),
            FocusBucket::Later => self.later.iter().map(|item| item.id).collect(),
            FocusBucket::Watch => self.watch.iter().map(|item| item.id).collect(),
        }
    }
}
