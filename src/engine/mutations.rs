use std::time::Instant;

use tracing::{debug, error, warn};
use ulid::Ulid;

use crate::crypto::{open_text, seal_text};
use crate::limits::*;
use crate::mailer::{RESERVATION_SUBJECT, deliver_with_retry, reservation_email_body};
use crate::model::*;
use crate::observability::{BLOCKED_WINDOWS_DERIVED, NOTIFICATIONS_FAILED_TOTAL, SWEEP_DURATION_SECONDS};

use super::availability::blocked_windows;
use super::validate::{
    find_blocking, validate_category, validate_item, validate_reservation, validate_window,
};
use super::{Engine, EngineError, ReserveBook, WalCommand};

/// Result of one recompute of the derived windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub changed: bool,
    pub derived: usize,
}

impl Engine {
    // ── Reservations ─────────────────────────────────────────

    /// Validate, check against blocked windows, encrypt, commit, then
    /// recompute the derived windows and mail the staff.
    pub async fn create_reservation(&self, input: ReservationInput) -> Result<Ulid, EngineError> {
        let id = self
            .insert_reservation(input.clone(), self.settings.enforce_blocked_windows)
            .await?;
        self.announce(id, input);
        Ok(id)
    }

    /// Insert without blocked-window enforcement or mail. Used for fixtures.
    pub async fn seed_reservation(&self, input: ReservationInput) -> Result<Ulid, EngineError> {
        self.insert_reservation(input, false).await
    }

    async fn insert_reservation(
        &self,
        input: ReservationInput,
        enforce: bool,
    ) -> Result<Ulid, EngineError> {
        validate_reservation(&input)?;
        let id = input.id.unwrap_or_else(Ulid::new);
        let reservation = self.seal(id, &input).await?;
        let interval = reservation.interval(self.settings.reservation_duration);

        let mut book = self.book.write().await;
        if book.reservations.len() >= MAX_RESERVATIONS_PER_VENUE {
            return Err(EngineError::LimitExceeded("too many reservations"));
        }
        if book.reservations.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if enforce {
            let span = Span::new(interval.start, interval.end);
            if let Some(w) = find_blocking(book.windows.values().map(|w| &w.window), &span) {
                return Err(EngineError::Unavailable(*w));
            }
        }

        let event = Event::ReservationCreated { reservation };
        self.persist_and_apply(&mut book, &event).await?;
        self.refresh_after_mutation(&mut book).await;
        Ok(id)
    }

    pub async fn update_reservation(
        &self,
        id: Ulid,
        patch: ReservationPatch,
    ) -> Result<(), EngineError> {
        let mut book = self.book.write().await;
        let current = book
            .reservations
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        if patch.is_empty() {
            return Ok(());
        }

        let merged = patch.apply(self.reveal(&current).await?.into_input());
        validate_reservation(&merged)?;
        let reservation = self.seal(id, &merged).await?;

        let event = Event::ReservationUpdated { reservation };
        self.persist_and_apply(&mut book, &event).await?;
        self.refresh_after_mutation(&mut book).await;
        Ok(())
    }

    pub async fn delete_reservation(&self, id: Ulid) -> Result<(), EngineError> {
        let mut book = self.book.write().await;
        if !book.reservations.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        let event = Event::ReservationDeleted { id };
        self.persist_and_apply(&mut book, &event).await?;
        self.refresh_after_mutation(&mut book).await;
        Ok(())
    }

    async fn seal(&self, id: Ulid, input: &ReservationInput) -> Result<Reservation, EngineError> {
        let enc = self.services.encryptor.as_ref();
        Ok(Reservation {
            id,
            date: input.date,
            time: input.time,
            party_size: input.party_size,
            game: input.game,
            eat_and_play: input.eat_and_play,
            name: seal_text(enc, &input.name).await?,
            surname: seal_text(enc, &input.surname).await?,
            phone: seal_text(enc, &input.phone).await?,
            message: input.message.clone(),
        })
    }

    pub(super) async fn reveal(&self, r: &Reservation) -> Result<ReservationInfo, EngineError> {
        let enc = self.services.encryptor.as_ref();
        Ok(ReservationInfo {
            id: r.id,
            date: r.date,
            time: r.time,
            party_size: r.party_size,
            game: r.game,
            eat_and_play: r.eat_and_play,
            name: open_text(enc, &r.name).await?,
            surname: open_text(enc, &r.surname).await?,
            phone: open_text(enc, &r.phone).await?,
            message: r.message.clone(),
        })
    }

    /// Mail the staff in the background. Failures never reach the caller.
    fn announce(&self, id: Ulid, input: ReservationInput) {
        let Some(to) = self.settings.notify_to.clone() else {
            return;
        };
        let info = ReservationInfo {
            id,
            date: input.date,
            time: input.time,
            party_size: input.party_size,
            game: input.game,
            eat_and_play: input.eat_and_play,
            name: input.name,
            surname: input.surname,
            phone: input.phone,
            message: input.message,
        };
        let body = reservation_email_body(&info);
        let notifier = self.services.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = deliver_with_retry(notifier.as_ref(), &to, RESERVATION_SUBJECT, &body).await {
                metrics::counter!(NOTIFICATIONS_FAILED_TOTAL).increment(1);
                warn!(reservation = %id, error = %e, "reservation notification not delivered");
            }
        });
    }

    // ── Blocked windows ──────────────────────────────────────

    /// Recompute derived windows from the current reservations and replace
    /// the stored set in one WAL event when it changed.
    pub async fn refresh_blocked_windows(&self) -> Result<RefreshOutcome, EngineError> {
        let mut book = self.book.write().await;
        self.refresh_locked(&mut book).await
    }

    /// The reservation is already committed; a failed refresh is retried by
    /// the periodic refresher.
    async fn refresh_after_mutation(&self, book: &mut ReserveBook) {
        if let Err(e) = self.refresh_locked(book).await {
            error!(error = %e, "blocked window refresh failed");
        }
    }

    async fn refresh_locked(&self, book: &mut ReserveBook) -> Result<RefreshOutcome, EngineError> {
        let started = Instant::now();
        let intervals: Vec<ReservationInterval> = book
            .reservations
            .values()
            .map(|r| r.interval(self.settings.reservation_duration))
            .collect();
        let mut fresh = blocked_windows(&intervals, &self.settings.policy)?;
        metrics::histogram!(SWEEP_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        fresh.sort();

        if fresh == book.derived_windows() {
            return Ok(RefreshOutcome {
                changed: false,
                derived: fresh.len(),
            });
        }

        let derived = fresh.len();
        let event = Event::DerivedWindowsReplaced {
            windows: fresh.into_iter().map(|w| (Ulid::new(), w)).collect(),
        };
        self.persist_and_apply(book, &event).await?;
        metrics::gauge!(BLOCKED_WINDOWS_DERIVED).set(derived as f64);
        debug!(reservations = intervals.len(), derived, "derived blocked windows replaced");
        Ok(RefreshOutcome {
            changed: true,
            derived,
        })
    }

    pub async fn add_blocked_window(
        &self,
        id: Option<Ulid>,
        window: BlockedWindow,
    ) -> Result<Ulid, EngineError> {
        validate_window(&window)?;
        let id = id.unwrap_or_else(Ulid::new);
        let mut book = self.book.write().await;
        if book.manual_window_count() >= MAX_MANUAL_WINDOWS_PER_VENUE {
            return Err(EngineError::LimitExceeded("too many blocked windows"));
        }
        if book.windows.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        let event = Event::WindowAdded { id, window };
        self.persist_and_apply(&mut book, &event).await?;
        Ok(id)
    }

    /// Remove a manual window. Derived windows only change through a refresh.
    pub async fn remove_blocked_window(&self, id: Ulid) -> Result<(), EngineError> {
        let mut book = self.book.write().await;
        match book.windows.get(&id) {
            None => return Err(EngineError::NotFound(id)),
            Some(w) if w.source == WindowSource::Derived => {
                return Err(EngineError::Validation(
                    "derived windows cannot be removed manually".into(),
                ));
            }
            Some(_) => {}
        }
        let event = Event::WindowRemoved { id };
        self.persist_and_apply(&mut book, &event).await
    }

    // ── Catalog ──────────────────────────────────────────────

    pub async fn create_category(&self, input: CategoryInput) -> Result<Ulid, EngineError> {
        validate_category(&input)?;
        let id = input.id.unwrap_or_else(Ulid::new);
        let _guard = self.catalog_lock.lock().await;
        if self.catalog.category_count() >= MAX_CATEGORIES_PER_VENUE {
            return Err(EngineError::LimitExceeded("too many categories"));
        }
        if self.catalog.contains_category(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        let category = CatalogCategory {
            id,
            title: input.title,
            description: input.description,
            picture_file_name: input.picture_file_name,
        };
        self.persist_catalog(&Event::CategoryCreated { category }).await?;
        Ok(id)
    }

    pub async fn delete_category(&self, id: Ulid) -> Result<(), EngineError> {
        let _guard = self.catalog_lock.lock().await;
        if !self.catalog.contains_category(&id) {
            return Err(EngineError::NotFound(id));
        }
        if self.catalog.has_items(&id) {
            return Err(EngineError::HasItems(id));
        }
        self.persist_catalog(&Event::CategoryDeleted { id }).await
    }

    pub async fn create_item(&self, input: ItemInput) -> Result<Ulid, EngineError> {
        let id = input.id.unwrap_or_else(Ulid::new);
        let item = CatalogItem {
            id,
            title: input.title,
            subtitle: input.subtitle,
            description: input.description,
            price: input.price,
            picture_file_name: input.picture_file_name,
            category_id: input.category_id,
        };
        validate_item(&item)?;

        let _guard = self.catalog_lock.lock().await;
        if self.catalog.item_count() >= MAX_ITEMS_PER_VENUE {
            return Err(EngineError::LimitExceeded("too many items"));
        }
        if self.catalog.get_item(&id).is_some() {
            return Err(EngineError::AlreadyExists(id));
        }
        if !self.catalog.contains_category(&item.category_id) {
            return Err(EngineError::NotFound(item.category_id));
        }
        self.persist_catalog(&Event::ItemCreated { item }).await?;
        Ok(id)
    }

    pub async fn update_item(&self, id: Ulid, patch: ItemPatch) -> Result<(), EngineError> {
        let _guard = self.catalog_lock.lock().await;
        let current = self.catalog.get_item(&id).ok_or(EngineError::NotFound(id))?;
        if patch.is_empty() {
            return Ok(());
        }
        let item = patch.apply(current);
        validate_item(&item)?;
        if !self.catalog.contains_category(&item.category_id) {
            return Err(EngineError::NotFound(item.category_id));
        }
        self.persist_catalog(&Event::ItemUpdated { item }).await
    }

    pub async fn delete_item(&self, id: Ulid) -> Result<(), EngineError> {
        let _guard = self.catalog_lock.lock().await;
        if self.catalog.get_item(&id).is_none() {
            return Err(EngineError::NotFound(id));
        }
        self.persist_catalog(&Event::ItemDeleted { id }).await
    }

    // ── WAL maintenance ──────────────────────────────────────

    /// Rewrite the WAL with only the events needed to recreate current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let book = self.book.read().await;
        let _catalog = self.catalog_lock.lock().await;

        let mut events = self.catalog.snapshot_events();
        events.extend(
            book.reservations
                .values()
                .map(|r| Event::ReservationCreated { reservation: r.clone() }),
        );
        let mut derived = Vec::new();
        for w in book.windows.values() {
            match w.source {
                WindowSource::Manual => events.push(Event::WindowAdded {
                    id: w.id,
                    window: w.window,
                }),
                WindowSource::Derived => derived.push((w.id, w.window)),
            }
        }
        if !derived.is_empty() {
            events.push(Event::DerivedWindowsReplaced { windows: derived });
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = tokio::sync::oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
