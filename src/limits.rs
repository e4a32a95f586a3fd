//! Hard limits enforced at the engine and venue boundaries.

pub const MAX_VENUES: usize = 1_000;
pub const MAX_VENUE_NAME_LEN: usize = 64;

pub const MAX_RESERVATIONS_PER_VENUE: usize = 100_000;
pub const MAX_MANUAL_WINDOWS_PER_VENUE: usize = 10_000;
pub const MAX_CATEGORIES_PER_VENUE: usize = 1_000;
pub const MAX_ITEMS_PER_VENUE: usize = 10_000;

pub const MAX_PERSON_NAME_LEN: usize = 200;
pub const MAX_MESSAGE_LEN: usize = 500;
pub const MIN_PARTY_SIZE: u32 = 1;
pub const MAX_PARTY_SIZE: u32 = 6;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
pub const MAX_FILE_NAME_LEN: usize = 255;

pub const MAX_IN_CLAUSE_IDS: usize = 1_000;
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 1_000;

/// Pictures larger than this are refused rather than streamed into a row.
pub const MAX_PICTURE_BYTES: u64 = 8 * 1024 * 1024;

/// Reservation and window dates must fall inside this year range.
pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 9999;

/// A reservation holds its table for at most one day.
pub const MAX_RESERVATION_MINUTES: i64 = 24 * 60;
