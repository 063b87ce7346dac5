//! List domain model.
//!
//! A list owns the order of its items, not their lifecycle. The order is kept
//! by the ordered position index, so the record itself carries only text.

use super::item::ItemState;
use serde::{Deserialize, Serialize};

/// Stable identifier of a list.
pub type ListId = u64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub state: ItemState,
    pub title: String,
    pub body: String,
}

impl List {
    pub fn new(id: ListId, title: impl Into<String>) -> Self {
        Self {
            id,
            state: ItemState::Open,
            title: title.into(),
            body: String::new(),
        }
    }
}
