//! Fixture loading for fresh venues.
//!
//! A seed directory may hold `reservations.json` (an array of reservation
//! inputs) and `catalog.json` (an array of items naming their category by
//! title). Either file may be missing. Reservations are only loaded into a
//! venue without reservations, the catalog only into a venue without items.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;
use ulid::Ulid;

use crate::engine::{Engine, EngineError};
use crate::model::{CategoryInput, ItemInput, PageRequest, ReservationInput};

pub const RESERVATIONS_FILE: &str = "reservations.json";
pub const CATALOG_FILE: &str = "catalog.json";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("seed rejected: {0}")]
    Engine(#[from] EngineError),
}

/// One line of `catalog.json`. Prices are decimal strings such as `"3.50"`.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSeed {
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub picture_file_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub reservations: usize,
    pub categories: usize,
    pub items: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub async fn seed_venue(engine: &Engine, dir: &Path) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    if engine.reservation_count().await == 0
        && let Some(reservations) = read_json::<Vec<ReservationInput>>(&dir.join(RESERVATIONS_FILE)).await?
    {
        for input in reservations {
            engine.seed_reservation(input).await?;
            report.reservations += 1;
        }
    }

    let no_items = engine.list_items(PageRequest { limit: 1, offset: 0 })?.count == 0;
    if no_items
        && let Some(entries) = read_json::<Vec<CatalogSeed>>(&dir.join(CATALOG_FILE)).await?
    {
        let (categories, items) = seed_catalog(engine, entries).await?;
        report.categories = categories;
        report.items = items;
    }

    if !report.is_empty() {
        info!(
            dir = %dir.display(),
            reservations = report.reservations,
            categories = report.categories,
            items = report.items,
            "venue seeded"
        );
    }
    Ok(report)
}

/// Create categories from the distinct names first, reusing ones that already
/// exist, then the items.
async fn seed_catalog(engine: &Engine, entries: Vec<CatalogSeed>) -> Result<(usize, usize), SeedError> {
    let mut category_ids: BTreeMap<String, Ulid> = engine
        .list_categories()
        .into_iter()
        .map(|c| (c.title, c.id))
        .collect();

    let mut created = 0;
    for entry in &entries {
        if category_ids.contains_key(&entry.category) {
            continue;
        }
        let id = engine
            .create_category(CategoryInput {
                id: None,
                title: entry.category.clone(),
                description: None,
                picture_file_name: None,
            })
            .await?;
        category_ids.insert(entry.category.clone(), id);
        created += 1;
    }

    let count = entries.len();
    for entry in entries {
        let category_id = category_ids[&entry.category];
        engine
            .create_item(ItemInput {
                id: None,
                title: entry.title,
                subtitle: entry.subtitle,
                description: entry.description,
                price: entry.price,
                picture_file_name: entry.picture_file_name,
                category_id,
            })
            .await?;
    }
    Ok((created, count))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SeedError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SeedError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| SeedError::Json {
            path: path.to_path_buf(),
            source,
        })
}
