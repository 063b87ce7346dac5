//! Store key layout.
//!
//! Keys are `/`-separated ASCII segments. Every integer is written as
//! fixed-width, zero-padded decimal (ids: 20 digits, positions: 10 digits),
//! so for a fixed prefix the lexicographic key order equals numeric order.
//!
//! | key                               | value                        |
//! |-----------------------------------|------------------------------|
//! | `i/<item>`                        | item record                  |
//! | `l/<list>`                        | list record                  |
//! | `u/<user>`                        | user record                  |
//! | `a/<area>`                        | area record                  |
//! | `li/<list>/<pos>`                 | item id at that slot         |
//! | `uf/<user>/<bucket>/<pos>`        | item id at that slot         |
//! | `ar/<area>/<pos>`                 | thing at that slot           |
//! | `xli/<item>/<list>`               | slot of the item in the list |
//! | `xuf/<item>/<user>/<bucket>`      | slot of the item in a bucket |
//! | `xar/<thing>/<area>`              | slot of the thing in an area |
//!
//! Bucket digits are `1` (now), `2` (later), `3` (watch). A thing segment is
//! `i<id>` or `l<id>`. The `x*` membership entries answer "which collections
//! hold this member" without scanning positions.

use crate::db::KeyRange;
use crate::model::area::{AreaId, Thing};
use crate::model::list::ListId;
use crate::model::user::{FocusBucket, UserId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// 1-based slot inside an ordered collection.
pub type Position = u32;

const ID_WIDTH: usize = 20;
const POSITION_WIDTH: usize = 10;

static RECORD_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ilua])/(\d{20})$").expect("valid record key regex"));
static POSITION_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(li|uf|ar)/(\d{20})(?:/(\d))?/(\d{10})$").expect("valid position key regex")
});
static MEMBERSHIP_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^x(li|uf|ar)/([^/]+)/(\d{20})(?:/(\d))?$").expect("valid membership key regex")
});

/// Key parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    Malformed { key: String, reason: &'static str },
}

impl KeyError {
    fn malformed(key: &str, reason: &'static str) -> Self {
        Self::Malformed {
            key: key.to_string(),
            reason,
        }
    }
}

impl Display for KeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { key, reason } => write!(f, "malformed key `{key}`: {reason}"),
        }
    }
}

impl Error for KeyError {}

/// Record table selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Item,
    List,
    User,
    Area,
}

impl EntityKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Item => "i",
            Self::List => "l",
            Self::User => "u",
            Self::Area => "a",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "i" => Some(Self::Item),
            "l" => Some(Self::List),
            "u" => Some(Self::User),
            "a" => Some(Self::Area),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::List => "list",
            Self::User => "user",
            Self::Area => "area",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Family of ordered collections sharing one key layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    ListItems,
    UserFocus,
    AreaMembers,
}

impl CollectionKind {
    fn tag(self) -> &'static str {
        match self {
            Self::ListItems => "li",
            Self::UserFocus => "uf",
            Self::AreaMembers => "ar",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "li" => Some(Self::ListItems),
            "uf" => Some(Self::UserFocus),
            "ar" => Some(Self::AreaMembers),
            _ => None,
        }
    }
}

/// One ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    List(ListId),
    Focus { user: UserId, bucket: FocusBucket },
    Area(AreaId),
}

impl CollectionKey {
    pub fn kind(self) -> CollectionKind {
        match self {
            Self::List(_) => CollectionKind::ListItems,
            Self::Focus { .. } => CollectionKind::UserFocus,
            Self::Area(_) => CollectionKind::AreaMembers,
        }
    }

    /// Id of the record owning this collection (list, user or area).
    pub fn owner(self) -> u64 {
        match self {
            Self::List(id) | Self::Area(id) => id,
            Self::Focus { user, .. } => user,
        }
    }

    fn segment(self) -> String {
        match self {
            Self::List(id) | Self::Area(id) => pad_id(id),
            Self::Focus { user, bucket } => format!("{}/{}", pad_id(user), bucket.code()),
        }
    }

    fn from_parts(
        kind: CollectionKind,
        owner: u64,
        bucket: Option<&str>,
        key: &str,
    ) -> Result<Self, KeyError> {
        match (kind, bucket) {
            (CollectionKind::ListItems, None) => Ok(Self::List(owner)),
            (CollectionKind::AreaMembers, None) => Ok(Self::Area(owner)),
            (CollectionKind::UserFocus, Some(code)) => {
                let bucket = code
                    .parse::<u8>()
                    .ok()
                    .and_then(FocusBucket::from_code)
                    .ok_or_else(|| KeyError::malformed(key, "unknown focus bucket"))?;
                Ok(Self::Focus {
                    user: owner,
                    bucket,
                })
            }
            (CollectionKind::UserFocus, None) => {
                Err(KeyError::malformed(key, "focus key without bucket"))
            }
            (_, Some(_)) => Err(KeyError::malformed(key, "unexpected bucket segment")),
        }
    }
}

impl Display for CollectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(id) => write!(f, "list:{id}"),
            Self::Focus { user, bucket } => write!(f, "focus:{user}:{bucket}"),
            Self::Area(id) => write!(f, "area:{id}"),
        }
    }
}

/// Member types that can occupy a slot and be named inside a membership key.
pub trait MemberKey: Sized {
    fn encode_segment(&self) -> String;
    fn decode_segment(segment: &str) -> Option<Self>;
}

impl MemberKey for u64 {
    fn encode_segment(&self) -> String {
        pad_id(*self)
    }

    fn decode_segment(segment: &str) -> Option<Self> {
        parse_fixed(segment, ID_WIDTH)
    }
}

impl MemberKey for Thing {
    fn encode_segment(&self) -> String {
        match self {
            Self::Item(id) => format!("i{}", pad_id(*id)),
            Self::List(id) => format!("l{}", pad_id(*id)),
        }
    }

    fn decode_segment(segment: &str) -> Option<Self> {
        if let Some(id) = segment.strip_prefix('i') {
            return parse_fixed(id, ID_WIDTH).map(Self::Item);
        }
        if let Some(id) = segment.strip_prefix('l') {
            return parse_fixed(id, ID_WIDTH).map(Self::List);
        }
        None
    }
}

/// Key of one entity record.
pub fn record_key(kind: EntityKind, id: u64) -> String {
    format!("{}/{}", kind.prefix(), pad_id(id))
}

/// Range holding every record of `kind`, in id order.
pub fn record_range(kind: EntityKind) -> KeyRange {
    KeyRange::prefix(format!("{}/", kind.prefix()))
}

/// Range holding records of `kind` with ids in `from..=to`.
pub fn record_id_range(kind: EntityKind, from: u64, to: u64) -> KeyRange {
    match to.checked_add(1) {
        Some(end) => KeyRange::between(record_key(kind, from), record_key(kind, end)),
        None => KeyRange {
            start: record_key(kind, from),
            end: record_range(kind).end,
        },
    }
}

pub fn parse_record_key(key: &str) -> Result<(EntityKind, u64), KeyError> {
    let captures = RECORD_KEY_RE
        .captures(key)
        .ok_or_else(|| KeyError::malformed(key, "not a record key"))?;
    let kind = EntityKind::from_prefix(&captures[1])
        .ok_or_else(|| KeyError::malformed(key, "unknown record kind"))?;
    let id = parse_fixed(&captures[2], ID_WIDTH)
        .ok_or_else(|| KeyError::malformed(key, "id out of range"))?;
    Ok((kind, id))
}

/// Key of the position entry for `position` inside `collection`.
pub fn position_key(collection: CollectionKey, position: Position) -> String {
    format!(
        "{}/{}/{}",
        collection.kind().tag(),
        collection.segment(),
        pad_position(position)
    )
}

/// Range holding every position entry of `collection`, in position order.
pub fn position_range(collection: CollectionKey) -> KeyRange {
    KeyRange::prefix(format!(
        "{}/{}/",
        collection.kind().tag(),
        collection.segment()
    ))
}

/// Range holding the position entries `from..=to` of `collection`.
pub fn position_span(collection: CollectionKey, from: Position, to: Position) -> KeyRange {
    match to.checked_add(1) {
        Some(end) => KeyRange::between(
            position_key(collection, from),
            position_key(collection, end),
        ),
        None => KeyRange {
            start: position_key(collection, from),
            end: position_range(collection).end,
        },
    }
}

pub fn parse_position_key(key: &str) -> Result<(CollectionKey, Position), KeyError> {
    let captures = POSITION_KEY_RE
        .captures(key)
        .ok_or_else(|| KeyError::malformed(key, "not a position key"))?;
    let kind = CollectionKind::from_tag(&captures[1])
        .ok_or_else(|| KeyError::malformed(key, "unknown collection kind"))?;
    let owner = parse_fixed(&captures[2], ID_WIDTH)
        .ok_or_else(|| KeyError::malformed(key, "owner id out of range"))?;
    let collection =
        CollectionKey::from_parts(kind, owner, captures.get(3).map(|m| m.as_str()), key)?;
    let position = parse_fixed::<Position>(&captures[4], POSITION_WIDTH)
        .ok_or_else(|| KeyError::malformed(key, "position out of range"))?;
    Ok((collection, position))
}

/// Key of the membership entry recording where `member` sits in `collection`.
pub fn membership_key<M: MemberKey>(collection: CollectionKey, member: &M) -> String {
    format!(
        "x{}/{}/{}",
        collection.kind().tag(),
        member.encode_segment(),
        collection.segment()
    )
}

/// Range holding every membership entry of `member` across collections of `kind`.
pub fn membership_range<M: MemberKey>(kind: CollectionKind, member: &M) -> KeyRange {
    KeyRange::prefix(format!("x{}/{}/", kind.tag(), member.encode_segment()))
}

/// Range holding the focus membership entries of `item` for one user.
pub fn focus_membership_range(user: UserId, item: u64) -> KeyRange {
    KeyRange::prefix(format!(
        "x{}/{}/{}/",
        CollectionKind::UserFocus.tag(),
        item.encode_segment(),
        pad_id(user)
    ))
}

pub fn parse_membership_key<M: MemberKey>(key: &str) -> Result<(M, CollectionKey), KeyError> {
    let captures = MEMBERSHIP_KEY_RE
        .captures(key)
        .ok_or_else(|| KeyError::malformed(key, "not a membership key"))?;
    let kind = CollectionKind::from_tag(&captures[1])
        .ok_or_else(|| KeyError::malformed(key, "unknown collection kind"))?;
    let member = M::decode_segment(&captures[2])
        .ok_or_else(|| KeyError::malformed(key, "unreadable member segment"))?;
    let owner = parse_fixed(&captures[3], ID_WIDTH)
        .ok_or_else(|| KeyError::malformed(key, "owner id out of range"))?;
    let collection =
        CollectionKey::from_parts(kind, owner, captures.get(4).map(|m| m.as_str()), key)?;
    Ok((member, collection))
}

fn pad_id(id: u64) -> String {
    format!("{id:0width$}", width = ID_WIDTH)
}

fn pad_position(position: Position) -> String {
    format!("{position:0width$}", width = POSITION_WIDTH)
}

fn parse_fixed<T: std::str::FromStr>(digits: &str, width: usize) -> Option<T> {
    if digits.len() != width || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1024))]

        #[test]
        fn position_key_order_matches_numeric_order(
            lhs in (any::<u64>(), any::<Position>()),
            rhs in (any::<u64>(), any::<Position>()),
        ) {
            let lhs_key = position_key(CollectionKey::List(lhs.0), lhs.1);
            let rhs_key = position_key(CollectionKey::List(rhs.0), rhs.1);

            prop_assert_eq!(lhs.cmp(&rhs), lhs_key.cmp(&rhs_key));
        }

        #[test]
        fn position_keys_parse_back(owner in any::<u64>(), position in any::<Position>()) {
            for collection in [
                CollectionKey::List(owner),
                CollectionKey::Area(owner),
                CollectionKey::Focus { user: owner, bucket: FocusBucket::Later },
            ] {
                let key = position_key(collection, position);
                prop_assert_eq!(parse_position_key(&key).unwrap(), (collection, position));
                prop_assert!(position_range(collection).contains(&key));
            }
        }
    }

    #[test]
    fn position_key_parses_back() {
        let focus = CollectionKey::Focus {
            user: 3,
            bucket: FocusBucket::Watch,
        };
        let key = position_key(focus, 42);
        assert_eq!(key, "uf/00000000000000000003/3/0000000042");
        assert_eq!(parse_position_key(&key).unwrap(), (focus, 42));

        let area = CollectionKey::Area(u64::MAX);
        let key = position_key(area, Position::MAX);
        assert_eq!(parse_position_key(&key).unwrap(), (area, Position::MAX));
    }

    #[test]
    fn position_range_does_not_leak_into_other_collections() {
        let range = position_range(CollectionKey::List(1));
        assert!(range.contains(&position_key(CollectionKey::List(1), 1)));
        assert!(!range.contains(&position_key(CollectionKey::List(10), 1)));
        assert!(!range.contains(&position_key(CollectionKey::Area(1), 1)));
    }

    #[test]
    fn position_span_is_inclusive() {
        let list = CollectionKey::List(1);
        let span = position_span(list, 2, 4);
        assert!(!span.contains(&position_key(list, 1)));
        assert!(span.contains(&position_key(list, 2)));
        assert!(span.contains(&position_key(list, 4)));
        assert!(!span.contains(&position_key(list, 5)));
    }

    #[test]
    fn malformed_position_keys_are_rejected() {
        for key in [
            "li/1/1",
            "li/00000000000000000001/0000000001/extra",
            "uf/00000000000000000001/0000000001",
            "uf/00000000000000000001/9/0000000001",
            "li/00000000000000000001/1/0000000001",
            "zz/00000000000000000001/0000000001",
            "li/99999999999999999999/0000000001",
            "li/00000000000000000001/9999999999",
        ] {
            assert!(
                matches!(parse_position_key(key), Err(KeyError::Malformed { .. })),
                "{key} should be malformed"
            );
        }
    }

    #[test]
    fn record_keys_round_trip_and_sort() {
        let key = record_key(EntityKind::Item, 12);
        assert_eq!(parse_record_key(&key).unwrap(), (EntityKind::Item, 12));
        assert!(record_key(EntityKind::Item, 9) < record_key(EntityKind::Item, 10));
        assert!(record_range(EntityKind::List).contains(&record_key(EntityKind::List, 1)));
        assert!(!record_range(EntityKind::List).contains(&position_key(CollectionKey::List(1), 1)));
        assert!(parse_record_key("i/12").is_err());
    }

    #[test]
    fn record_id_range_bounds_ids() {
        let range = record_id_range(EntityKind::Item, 3, 5);
        assert!(!range.contains(&record_key(EntityKind::Item, 2)));
        assert!(range.contains(&record_key(EntityKind::Item, 5)));
        assert!(!range.contains(&record_key(EntityKind::Item, 6)));
    }

    #[test]
    fn membership_keys_round_trip() {
        let focus = CollectionKey::Focus {
            user: 1,
            bucket: FocusBucket::Now,
        };
        let key = membership_key(focus, &5u64);
        assert_eq!(parse_membership_key::<u64>(&key).unwrap(), (5, focus));
        assert!(focus_membership_range(1, 5).contains(&key));
        assert!(!focus_membership_range(2, 5).contains(&key));

        let area = CollectionKey::Area(2);
        let key = membership_key(area, &Thing::List(4));
        assert_eq!(
            parse_membership_key::<Thing>(&key).unwrap(),
            (Thing::List(4), area)
        );
        assert!(membership_range(CollectionKind::AreaMembers, &Thing::List(4)).contains(&key));
        assert!(!membership_range(CollectionKind::AreaMembers, &Thing::Item(4)).contains(&key));
    }
}
