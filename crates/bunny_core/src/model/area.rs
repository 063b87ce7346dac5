//! Area domain model.
//!
//! An area orders a mix of items and lists. Members are `Thing` references,
//! a tagged variant dispatched by `match`, never by runtime type checks.

use super::item::{Item, ItemId};
use super::list::{List, ListId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Stable identifier of an area.
pub type AreaId = u64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub title: String,
    pub body: String,
}

impl Area {
    pub fn new(id: AreaId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            body: String::new(),
        }
    }
}

/// Reference to something an area can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Thing {
    Item(ItemId),
    List(ListId),
}

impl Display for Thing {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item(id) => write!(f, "item:{id}"),
            Self::List(id) => write!(f, "list:{id}"),
        }
    }
}

/// Area member resolved against its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaEntry {
    Item(Item),
    List(List),
}

impl AreaEntry {
    pub fn thing(&self) -> Thing {
        match self {
            Self::Item(item) => Thing::Item(item.id),
            Self::List(list) => Thing::List(list.id),
        }
    }
}
