//! Item domain model.
//!
//! # Invariants
//! - `id` is positive and never reused while the item exists.
//! - Items are only deleted explicitly; membership removal never deletes one.

use super::user::FocusBucket;
use serde::{Deserialize, Serialize};

/// Stable identifier of an item.
pub type ItemId = u64;

/// Lifecycle state shared by items and lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    #[default]
    Open,
    Complete,
    Archived,
}

/// Unit of tracked work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub state: ItemState,
    pub title: String,
    pub body: String,
}

impl Item {
    /// Creates an open item with the given id and text.
    pub fn new(id: ItemId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            state: ItemState::Open,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Returns a copy with `state` replaced.
    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }
}

/// Item annotated with one user's focus bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserItem {
    pub item: Item,
    /// `None` when the user has not focused this item.
    pub focus: Option<FocusBucket>,
}
