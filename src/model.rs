use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open interval `[start, end)` on the venue's local clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Span {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// chrono represents `23:59:60` as a second with a nanosecond overflow.
/// Such times sort after the last regular instant of the day.
pub fn is_leap_second(t: NaiveTime) -> bool {
    t.nanosecond() >= 1_000_000_000
}

/// One reservation projected onto the timeline: `[start, end)` occupied by
/// `party_size` guests. Not validated on construction; the sweep rejects
/// malformed intervals before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub party_size: u32,
}

impl ReservationInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, party_size: u32) -> Self {
        Self { start, end, party_size }
    }

    /// Interval for a booking made at `date` + `time` that lasts `duration`.
    pub fn from_booking(date: NaiveDate, time: NaiveTime, duration: TimeDelta, party_size: u32) -> Self {
        let start = date.and_time(time);
        Self::new(start, start + duration, party_size)
    }

    pub fn covers(&self, span: &Span) -> bool {
        self.start < span.end && self.end > span.start
    }
}

/// A time range on one calendar date during which no new reservation may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockedWindow {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl BlockedWindow {
    pub fn span(&self) -> Span {
        Span::new(self.date.and_time(self.start_time), self.date.and_time(self.end_time))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowSource {
    /// Produced by the availability sweep; replaced wholesale on every refresh.
    Derived,
    /// Entered by staff; never touched by a refresh.
    Manual,
}

impl WindowSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowSource::Derived => "derived",
            WindowSource::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWindow {
    pub id: Ulid,
    pub window: BlockedWindow,
    pub source: WindowSource,
}

// ── Reservations ─────────────────────────────────────────────────

/// A reservation as persisted. `name`, `surname` and `phone` hold base64
/// ciphertext produced by the venue's `Encryptor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: u32,
    pub game: bool,
    pub eat_and_play: bool,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub message: Option<String>,
}

impl Reservation {
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn interval(&self, duration: TimeDelta) -> ReservationInterval {
        ReservationInterval::from_booking(self.date, self.time, duration, self.party_size)
    }
}

/// Plaintext reservation fields as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationInput {
    #[serde(default)]
    pub id: Option<Ulid>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: u32,
    #[serde(default)]
    pub game: bool,
    #[serde(default)]
    pub eat_and_play: bool,
    pub name: String,
    pub surname: String,
    pub phone: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Partial update; `None` leaves the field unchanged. `message: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPatch {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub party_size: Option<u32>,
    pub game: Option<bool>,
    pub eat_and_play: Option<bool>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
    pub message: Option<Option<String>>,
}

impl ReservationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, mut base: ReservationInput) -> ReservationInput {
        if let Some(v) = self.date {
            base.date = v;
        }
        if let Some(v) = self.time {
            base.time = v;
        }
        if let Some(v) = self.party_size {
            base.party_size = v;
        }
        if let Some(v) = self.game {
            base.game = v;
        }
        if let Some(v) = self.eat_and_play {
            base.eat_and_play = v;
        }
        if let Some(v) = self.name {
            base.name = v;
        }
        if let Some(v) = self.surname {
            base.surname = v;
        }
        if let Some(v) = self.phone {
            base.phone = v;
        }
        if let Some(v) = self.message {
            base.message = v;
        }
        base
    }
}

/// Decrypted reservation returned by queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationInfo {
    pub id: Ulid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: u32,
    pub game: bool,
    pub eat_and_play: bool,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub message: Option<String>,
}

impl ReservationInfo {
    pub fn into_input(self) -> ReservationInput {
        ReservationInput {
            id: Some(self.id),
            date: self.date,
            time: self.time,
            party_size: self.party_size,
            game: self.game,
            eat_and_play: self.eat_and_play,
            name: self.name,
            surname: self.surname,
            phone: self.phone,
            message: self.message,
        }
    }
}

// ── Catalog ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub id: Ulid,
    pub title: String,
    pub description: Option<String>,
    pub picture_file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Ulid,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub picture_file_name: Option<String>,
    pub category_id: Ulid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInput {
    pub id: Option<Ulid>,
    pub title: String,
    pub description: Option<String>,
    pub picture_file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInput {
    pub id: Option<Ulid>,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub picture_file_name: Option<String>,
    pub category_id: Ulid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub subtitle: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub picture_file_name: Option<Option<String>>,
    pub category_id: Option<Ulid>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, mut item: CatalogItem) -> CatalogItem {
        if let Some(v) = self.title {
            item.title = v;
        }
        if let Some(v) = self.subtitle {
            item.subtitle = v;
        }
        if let Some(v) = self.description {
            item.description = v;
        }
        if let Some(v) = self.price {
            item.price = v;
        }
        if let Some(v) = self.picture_file_name {
            item.picture_file_name = v;
        }
        if let Some(v) = self.category_id {
            item.category_id = v;
        }
        item
    }
}

// ── Paging ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: crate::limits::DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub page_index: usize,
    pub page_size: usize,
    /// Total matching rows before paging.
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Slice an already ordered, already filtered result set.
    pub fn from_sorted(all: Vec<T>, req: PageRequest) -> Self {
        let count = all.len();
        let page_size = req.limit.max(1);
        let data = all.into_iter().skip(req.offset).take(req.limit).collect();
        Self {
            page_index: req.offset / page_size,
            page_size,
            count,
            data,
        }
    }
}

// ── WAL events ───────────────────────────────────────────────────

/// WAL record format. Flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCreated {
        reservation: Reservation,
    },
    ReservationUpdated {
        reservation: Reservation,
    },
    ReservationDeleted {
        id: Ulid,
    },
    WindowAdded {
        id: Ulid,
        window: BlockedWindow,
    },
    WindowRemoved {
        id: Ulid,
    },
    /// Replaces every derived window in one step.
    DerivedWindowsReplaced {
        windows: Vec<(Ulid, BlockedWindow)>,
    },
    CategoryCreated {
        category: CatalogCategory,
    },
    CategoryDeleted {
        id: Ulid,
    },
    ItemCreated {
        item: CatalogItem,
    },
    ItemUpdated {
        item: CatalogItem,
    },
    ItemDeleted {
        id: Ulid,
    },
}

pub const RESERVATIONS_CHANNEL: &str = "reservations";
pub const BLOCKED_WINDOWS_CHANNEL: &str = "blocked_windows";
pub const CATALOG_CHANNEL: &str = "catalog";

impl Event {
    /// LISTEN channel this event is broadcast on.
    pub fn channel(&self) -> &'static str {
        match self {
            Event::ReservationCreated { .. }
            | Event::ReservationUpdated { .. }
            | Event::ReservationDeleted { .. } => RESERVATIONS_CHANNEL,
            Event::WindowAdded { .. }
            | Event::WindowRemoved { .. }
            | Event::DerivedWindowsReplaced { .. } => BLOCKED_WINDOWS_CHANNEL,
            Event::CategoryCreated { .. }
            | Event::CategoryDeleted { .. }
            | Event::ItemCreated { .. }
            | Event::ItemUpdated { .. }
            | Event::ItemDeleted { .. } => CATALOG_CHANNEL,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::ReservationCreated { .. } => "reservation_created",
            Event::ReservationUpdated { .. } => "reservation_updated",
            Event::ReservationDeleted { .. } => "reservation_deleted",
            Event::WindowAdded { .. } => "window_added",
            Event::WindowRemoved { .. } => "window_removed",
            Event::DerivedWindowsReplaced { .. } => "derived_windows_replaced",
            Event::CategoryCreated { .. } => "category_created",
            Event::CategoryDeleted { .. } => "category_deleted",
            Event::ItemCreated { .. } => "item_created",
            Event::ItemUpdated { .. } => "item_updated",
            Event::ItemDeleted { .. } => "item_deleted",
        }
    }

    /// Small JSON payload for NOTIFY. Never carries reservation contents.
    pub fn notification_payload(&self) -> String {
        let payload = match self {
            Event::ReservationCreated { reservation } | Event::ReservationUpdated { reservation } => {
                serde_json::json!({
                    "event": self.kind(),
                    "id": reservation.id.to_string(),
                    "date": reservation.date.to_string(),
                })
            }
            Event::DerivedWindowsReplaced { windows } => {
                serde_json::json!({ "event": self.kind(), "count": windows.len() })
            }
            Event::WindowAdded { id, .. } => {
                serde_json::json!({ "event": self.kind(), "id": id.to_string() })
            }
            Event::CategoryCreated { category } => {
                serde_json::json!({ "event": self.kind(), "id": category.id.to_string() })
            }
            Event::ItemCreated { item } | Event::ItemUpdated { item } => {
                serde_json::json!({ "event": self.kind(), "id": item.id.to_string() })
            }
            Event::ReservationDeleted { id }
            | Event::WindowRemoved { id }
            | Event::CategoryDeleted { id }
            | Event::ItemDeleted { id } => {
                serde_json::json!({ "event": self.kind(), "id": id.to_string() })
            }
        };
        payload.to_string()
    }
}
