use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::engine::{Engine, ReserveSettings, VenueServices};
use crate::limits::*;
use crate::maintenance;
use crate::notify::NotifyHub;
use crate::seed;

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("venue name too long")]
    NameTooLong,
    #[error("empty venue name")]
    EmptyName,
    #[error("too many venues")]
    TooMany,
    #[error("venue storage: {0}")]
    Io(#[from] io::Error),
}

/// Manages per-venue engines. Each venue gets its own Engine + WAL +
/// background refresher and compactor.
/// Venue = database name from the pgwire connection.
pub struct VenueManager {
    engines: DashMap<String, Arc<Engine>>,
    /// Held while a venue is opened so two connections never replay the same WAL.
    opening: Mutex<()>,
    data_dir: PathBuf,
    compact_threshold: u64,
    refresh_interval: Duration,
    settings: ReserveSettings,
    services: VenueServices,
    seed_dir: Option<PathBuf>,
}

impl VenueManager {
    pub fn new(
        data_dir: PathBuf,
        compact_threshold: u64,
        settings: ReserveSettings,
        services: VenueServices,
    ) -> Self {
        Self {
            engines: DashMap::new(),
            opening: Mutex::new(()),
            data_dir,
            compact_threshold,
            refresh_interval: Duration::from_secs(60),
            settings,
            services,
            seed_dir: None,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_seed_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.seed_dir = dir;
        self
    }

    pub fn venue_count(&self) -> usize {
        self.engines.len()
    }

    /// Get or lazily open the engine for the given venue.
    pub async fn get_or_create(&self, venue: &str) -> Result<Arc<Engine>, VenueError> {
        if let Some(engine) = self.engines.get(venue) {
            return Ok(engine.value().clone());
        }
        if venue.len() > MAX_VENUE_NAME_LEN {
            return Err(VenueError::NameTooLong);
        }

        // Sanitize venue name to prevent path traversal
        let safe_name: String = venue
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if safe_name.is_empty() {
            return Err(VenueError::EmptyName);
        }

        let _opening = self.opening.lock().await;
        if let Some(engine) = self.engines.get(venue) {
            return Ok(engine.value().clone());
        }
        if self.engines.len() >= MAX_VENUES {
            return Err(VenueError::TooMany);
        }

        let wal_path = self.data_dir.join(format!("{safe_name}.wal"));
        let engine = Arc::new(Engine::new(
            wal_path,
            Arc::new(NotifyHub::new()),
            self.settings.clone(),
            self.services.clone(),
        )?);

        if let Some(dir) = &self.seed_dir
            && let Err(e) = seed::seed_venue(&engine, dir).await
        {
            tracing::error!(venue, error = %e, "seeding failed");
        }

        tokio::spawn(maintenance::run_refresher(
            Arc::downgrade(&engine),
            self.refresh_interval,
        ));
        tokio::spawn(maintenance::run_compactor(
            Arc::downgrade(&engine),
            self.compact_threshold,
        ));

        self.engines.insert(venue.to_string(), engine.clone());
        metrics::gauge!(crate::observability::VENUES_ACTIVE).set(self.engines.len() as f64);
        tracing::info!(venue, "venue opened");
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use chrono::{NaiveDate, NaiveTime};

    use crate::crypto::{CUSTOMER_DATA_KEY, LocalKeyring};
    use crate::mailer::LogNotifier;
    use crate::model::*;

    fn manager(dir: &std::path::Path) -> VenueManager {
        let services = VenueServices {
            encryptor: Arc::new(LocalKeyring::new().with_ephemeral_key(CUSTOMER_DATA_KEY)),
            notifier: Arc::new(LogNotifier),
            pics_dir: dir.join("pics"),
        };
        VenueManager::new(dir.to_path_buf(), 1000, ReserveSettings::default(), services)
    }

    fn booking(party_size: u32) -> ReservationInput {
        ReservationInput {
            id: None,
            date: NaiveDate::from_ymd_opt(2024, 7, 27).unwrap(),
            time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            party_size,
            game: false,
            eat_and_play: false,
            name: "Lena".into(),
            surname: "Fischer".into(),
            phone: "+4916098765432".into(),
            message: None,
        }
    }

    #[tokio::test]
    async fn venue_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let vm = manager(dir.path());

        let north = vm.get_or_create("north").await.unwrap();
        let south = vm.get_or_create("south").await.unwrap();

        for _ in 0..5 {
            north.create_reservation(booking(6)).await.unwrap();
        }
        south.create_reservation(booking(2)).await.unwrap();

        assert_eq!(north.list_blocked_windows(None).await.len(), 1);
        assert!(south.list_blocked_windows(None).await.is_empty());
        assert_eq!(south.reservation_count().await, 1);
    }

    #[tokio::test]
    async fn venue_lazy_creation() {
        let dir = tempfile::tempdir().unwrap();
        let vm = manager(dir.path());

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(entries.is_empty());

        let _eng = vm.get_or_create("my_db").await.unwrap();
        assert!(dir.path().join("my_db.wal").exists());
        assert_eq!(vm.venue_count(), 1);
    }

    #[tokio::test]
    async fn venue_same_engine_returned() {
        let dir = tempfile::tempdir().unwrap();
        let vm = manager(dir.path());

        let eng1 = vm.get_or_create("foo").await.unwrap();
        let eng2 = vm.get_or_create("foo").await.unwrap();
        assert!(Arc::ptr_eq(&eng1, &eng2));
    }

    #[tokio::test]
    async fn venue_name_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let vm = manager(dir.path());

        let _eng = vm.get_or_create("../evil").await.unwrap();
        assert!(dir.path().join("evil.wal").exists());

        assert!(matches!(
            vm.get_or_create("../..").await,
            Err(VenueError::EmptyName)
        ));
    }

    #[tokio::test]
    async fn venue_name_too_long() {
        let dir = tempfile::tempdir().unwrap();
        let vm = manager(dir.path());

        let long_name = "x".repeat(MAX_VENUE_NAME_LEN + 1);
        assert!(matches!(
            vm.get_or_create(&long_name).await,
            Err(VenueError::NameTooLong)
        ));
    }

    #[tokio::test]
    async fn venue_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let vm = manager(dir.path());
            let eng = vm.get_or_create("cafe").await.unwrap();
            eng.create_reservation(booking(3)).await.unwrap();
        }
        let vm = manager(dir.path());
        let eng = vm.get_or_create("cafe").await.unwrap();
        assert_eq!(eng.reservation_count().await, 1);
    }

    #[tokio::test]
    async fn new_venue_is_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let seed_dir = dir.path().join("seed");
        fs::create_dir_all(&seed_dir).unwrap();
        fs::write(
            seed_dir.join(seed::CATALOG_FILE),
            r#"[{"category": "Drinks", "title": "Cola", "price": "3.50"}]"#,
        )
        .unwrap();

        let vm = manager(dir.path()).with_seed_dir(Some(seed_dir));
        let eng = vm.get_or_create("seeded").await.unwrap();
        assert_eq!(eng.list_categories().len(), 1);
        assert_eq!(eng.list_items(PageRequest::default()).unwrap().count, 1);
    }
}
