mod availability;
mod catalog;
mod error;
mod mutations;
mod queries;
mod validate;

pub use availability::{
    SweepError, SweepPolicy, SweepStrategy, blocked_windows, end_of_day, merge_touching,
    saturated_spans_direct, saturated_spans_running, split_at_midnight,
};
pub use catalog::CatalogStore;
pub use error::EngineError;
pub use mutations::RefreshOutcome;

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::TimeDelta;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::crypto::Encryptor;
use crate::mailer::Notifier;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

/// Reservation rules of one venue.
#[derive(Debug, Clone)]
pub struct ReserveSettings {
    pub policy: SweepPolicy,
    pub reservation_duration: TimeDelta,
    /// Reject new reservations that overlap a blocked window.
    pub enforce_blocked_windows: bool,
    /// Staff address that receives a mail per new reservation.
    pub notify_to: Option<String>,
}

impl Default for ReserveSettings {
    fn default() -> Self {
        Self {
            policy: SweepPolicy::default(),
            reservation_duration: TimeDelta::minutes(90),
            enforce_blocked_windows: true,
            notify_to: None,
        }
    }
}

/// Collaborators shared by all venues.
#[derive(Clone)]
pub struct VenueServices {
    pub encryptor: Arc<dyn Encryptor>,
    pub notifier: Arc<dyn Notifier>,
    pub pics_dir: PathBuf,
}

/// Reservations and blocked windows. Guarded by one lock so a refresh always
/// sees the reservation set it is derived from.
#[derive(Default)]
pub(super) struct ReserveBook {
    pub(super) reservations: BTreeMap<Ulid, Reservation>,
    pub(super) windows: BTreeMap<Ulid, StoredWindow>,
}

impl ReserveBook {
    fn apply(&mut self, event: &Event) {
        match event {
            Event::ReservationCreated { reservation } | Event::ReservationUpdated { reservation } => {
                self.reservations.insert(reservation.id, reservation.clone());
            }
            Event::ReservationDeleted { id } => {
                self.reservations.remove(id);
            }
            Event::WindowAdded { id, window } => {
                self.windows.insert(
                    *id,
                    StoredWindow {
                        id: *id,
                        window: *window,
                        source: WindowSource::Manual,
                    },
                );
            }
            Event::WindowRemoved { id } => {
                self.windows.remove(id);
            }
            Event::DerivedWindowsReplaced { windows } => {
                self.windows.retain(|_, w| w.source == WindowSource::Manual);
                for (id, window) in windows {
                    self.windows.insert(
                        *id,
                        StoredWindow {
                            id: *id,
                            window: *window,
                            source: WindowSource::Derived,
                        },
                    );
                }
            }
            _ => {}
        }
    }

    pub(super) fn derived_windows(&self) -> Vec<BlockedWindow> {
        let mut out: Vec<_> = self
            .windows
            .values()
            .filter(|w| w.source == WindowSource::Derived)
            .map(|w| w.window)
            .collect();
        out.sort();
        out
    }

    pub(super) fn manual_window_count(&self) -> usize {
        self.windows
            .values()
            .filter(|w| w.source == WindowSource::Manual)
            .count()
    }
}

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Owns the WAL. Waits for one append, drains whatever else is queued, then
/// commits the whole batch with a single fsync.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }
                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<PendingAppend>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::error!(error = %e, events = batch.len(), "WAL batch commit failed");
    }
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[PendingAppend]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even after a failed append so the buffer starts clean.
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { event, response } => {
            let mut batch = vec![(event, response)];
            commit_batch(wal, &mut batch);
        }
    }
}

/// One venue: its reservations, blocked windows and catalog.
pub struct Engine {
    pub(super) book: RwLock<ReserveBook>,
    pub(super) catalog: CatalogStore,
    /// Serializes catalog writes so existence checks and commits don't interleave.
    pub(super) catalog_lock: Mutex<()>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    pub(super) settings: ReserveSettings,
    pub(super) services: VenueServices,
}

impl Engine {
    pub fn new(
        wal_path: PathBuf,
        notify: Arc<NotifyHub>,
        settings: ReserveSettings,
        services: VenueServices,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let mut book = ReserveBook::default();
        let catalog = CatalogStore::new();
        for event in &events {
            book.apply(event);
            catalog.apply_event(event);
        }
        tracing::debug!(
            path = %wal_path.display(),
            events = events.len(),
            reservations = book.reservations.len(),
            windows = book.windows.len(),
            "venue state replayed"
        );

        Ok(Self {
            book: RwLock::new(book),
            catalog,
            catalog_lock: Mutex::new(()),
            wal_tx,
            notify,
            settings,
            services,
        })
    }

    pub fn settings(&self) -> &ReserveSettings {
        &self.settings
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// WAL-append, apply to the reservation book, broadcast.
    pub(super) async fn persist_and_apply(
        &self,
        book: &mut ReserveBook,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        book.apply(event);
        self.notify.send(event);
        Ok(())
    }

    /// WAL-append, apply to the catalog, broadcast. Caller holds `catalog_lock`.
    pub(super) async fn persist_catalog(&self, event: &Event) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.catalog.apply_event(event);
        self.notify.send(event);
        Ok(())
    }
}
