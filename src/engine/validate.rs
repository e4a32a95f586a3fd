use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+49\d{10,11}$").expect("phone pattern compiles"));

/// Accumulates field errors so a client sees all of them at once.
#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, msg: impl Into<String>) {
        self.0.push(msg.into());
    }

    fn required_text(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.push(format!("{field} must not be blank"));
        } else if value.chars().count() > max {
            self.push(format!("{field} must be at most {max} characters"));
        }
    }

    fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value
            && v.chars().count() > max {
                self.push(format!("{field} must be at most {max} characters"));
            }
    }

    fn date_in_range(&mut self, field: &str, date: NaiveDate) {
        if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
            self.push(format!("{field} year must be between {MIN_YEAR} and {MAX_YEAR}"));
        }
    }

    fn regular_time(&mut self, field: &str, time: NaiveTime) {
        if is_leap_second(time) {
            self.push(format!("{field} must not be a leap second"));
        }
    }

    fn finish(self) -> Result<(), EngineError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(self.0.join("; ")))
        }
    }
}

pub(crate) fn validate_reservation(input: &ReservationInput) -> Result<(), EngineError> {
    let mut p = Problems::default();
    p.required_text("name", &input.name, MAX_PERSON_NAME_LEN);
    p.required_text("surname", &input.surname, MAX_PERSON_NAME_LEN);
    if !PHONE.is_match(&input.phone) {
        p.push("phone must be +49 followed by 10 or 11 digits");
    }
    if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&input.party_size) {
        p.push(format!(
            "party_size must be between {MIN_PARTY_SIZE} and {MAX_PARTY_SIZE}"
        ));
    }
    p.optional_text("message", input.message.as_deref(), MAX_MESSAGE_LEN);
    p.date_in_range("date", input.date);
    p.regular_time("time", input.time);
    p.finish()
}

pub(crate) fn validate_window(window: &BlockedWindow) -> Result<(), EngineError> {
    let mut p = Problems::default();
    if window.start_time >= window.end_time {
        p.push("start_time must be before end_time");
    }
    p.regular_time("start_time", window.start_time);
    p.regular_time("end_time", window.end_time);
    p.date_in_range("date", window.date);
    p.finish()
}

pub(crate) fn validate_category(input: &CategoryInput) -> Result<(), EngineError> {
    let mut p = Problems::default();
    p.required_text("title", &input.title, MAX_TITLE_LEN);
    p.optional_text("description", input.description.as_deref(), MAX_DESCRIPTION_LEN);
    p.optional_text(
        "picture_file_name",
        input.picture_file_name.as_deref(),
        MAX_FILE_NAME_LEN,
    );
    p.finish()
}

pub(crate) fn validate_item(item: &CatalogItem) -> Result<(), EngineError> {
    let mut p = Problems::default();
    p.required_text("title", &item.title, MAX_TITLE_LEN);
    p.optional_text("subtitle", item.subtitle.as_deref(), MAX_TITLE_LEN);
    p.optional_text("description", item.description.as_deref(), MAX_DESCRIPTION_LEN);
    p.optional_text(
        "picture_file_name",
        item.picture_file_name.as_deref(),
        MAX_FILE_NAME_LEN,
    );
    if item.price < Decimal::ZERO {
        p.push("price must not be negative");
    }
    p.finish()
}

/// First window whose span overlaps `span`, if any.
pub(crate) fn find_blocking<'a>(
    windows: impl IntoIterator<Item = &'a BlockedWindow>,
    span: &Span,
) -> Option<&'a BlockedWindow> {
    windows.into_iter().find(|w| w.span().overlaps(span))
}
