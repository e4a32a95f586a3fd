use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::pictures::{self, Picture, PictureError};

use super::{Engine, EngineError};

fn reservation_order(a: &Reservation, b: &Reservation) -> std::cmp::Ordering {
    (a.start(), a.id).cmp(&(b.start(), b.id))
}

fn check_page(page: PageRequest) -> Result<(), EngineError> {
    if page.limit > MAX_PAGE_SIZE {
        return Err(EngineError::LimitExceeded("page size too large"));
    }
    Ok(())
}

impl Engine {
    // ── Reservations ─────────────────────────────────────────

    pub async fn get_reservation(&self, id: Ulid) -> Result<ReservationInfo, EngineError> {
        let book = self.book.read().await;
        let r = book.reservations.get(&id).ok_or(EngineError::NotFound(id))?;
        self.reveal(r).await
    }

    /// Reservations with the given ids, ordered by date and time. Unknown ids are skipped.
    pub async fn get_reservations(&self, ids: &[Ulid]) -> Result<Vec<ReservationInfo>, EngineError> {
        if ids.len() > MAX_IN_CLAUSE_IDS {
            return Err(EngineError::LimitExceeded("too many ids"));
        }
        let book = self.book.read().await;
        let mut found: Vec<&Reservation> =
            ids.iter().filter_map(|id| book.reservations.get(id)).collect();
        found.sort_by(|a, b| reservation_order(a, b));
        found.dedup_by_key(|r| r.id);

        let mut out = Vec::with_capacity(found.len());
        for r in found {
            out.push(self.reveal(r).await?);
        }
        Ok(out)
    }

    /// One page of reservations ordered by date and time. Only the page is decrypted.
    pub async fn list_reservations(
        &self,
        page: PageRequest,
    ) -> Result<Page<ReservationInfo>, EngineError> {
        check_page(page)?;
        let book = self.book.read().await;
        let mut all: Vec<&Reservation> = book.reservations.values().collect();
        all.sort_by(|a, b| reservation_order(a, b));
        let sealed = Page::from_sorted(all, page);

        let mut data = Vec::with_capacity(sealed.data.len());
        for r in sealed.data {
            data.push(self.reveal(r).await?);
        }
        Ok(Page {
            page_index: sealed.page_index,
            page_size: sealed.page_size,
            count: sealed.count,
            data,
        })
    }

    pub async fn reservation_count(&self) -> usize {
        self.book.read().await.reservations.len()
    }

    // ── Blocked windows ──────────────────────────────────────

    /// Manual and derived windows, optionally limited to one date.
    pub async fn list_blocked_windows(&self, date: Option<NaiveDate>) -> Vec<StoredWindow> {
        let book = self.book.read().await;
        let mut out: Vec<StoredWindow> = book
            .windows
            .values()
            .filter(|w| date.is_none_or(|d| w.window.date == d))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.window, a.id).cmp(&(b.window, b.id)));
        out
    }

    // ── Catalog ──────────────────────────────────────────────

    pub fn list_categories(&self) -> Vec<CatalogCategory> {
        self.catalog.categories_by_title()
    }

    pub fn list_items(&self, page: PageRequest) -> Result<Page<CatalogItem>, EngineError> {
        check_page(page)?;
        Ok(Page::from_sorted(self.catalog.items_by_title(|_| true), page))
    }

    pub fn get_item(&self, id: Ulid) -> Result<CatalogItem, EngineError> {
        self.catalog.get_item(&id).ok_or(EngineError::NotFound(id))
    }

    pub fn get_items(&self, ids: &[Ulid]) -> Result<Vec<CatalogItem>, EngineError> {
        if ids.len() > MAX_IN_CLAUSE_IDS {
            return Err(EngineError::LimitExceeded("too many ids"));
        }
        Ok(self.catalog.items_by_title(|item| ids.contains(&item.id)))
    }

    /// Items whose title starts with `prefix` (case-sensitive).
    pub fn items_by_title_prefix(
        &self,
        prefix: &str,
        page: PageRequest,
    ) -> Result<Page<CatalogItem>, EngineError> {
        check_page(page)?;
        Ok(Page::from_sorted(
            self.catalog.items_by_title(|item| item.title.starts_with(prefix)),
            page,
        ))
    }

    pub fn items_by_category(
        &self,
        category_id: Ulid,
        page: PageRequest,
    ) -> Result<Page<CatalogItem>, EngineError> {
        check_page(page)?;
        Ok(Page::from_sorted(
            self.catalog
                .items_by_title(|item| item.category_id == category_id),
            page,
        ))
    }

    pub async fn get_item_picture(&self, item_id: Ulid) -> Result<Picture, EngineError> {
        let item = self.get_item(item_id)?;
        let file_name = item
            .picture_file_name
            .ok_or_else(|| PictureError::NotFound(format!("item {item_id} has no picture")))?;
        Ok(pictures::load(&self.services.pics_dir, &file_name).await?)
    }
}
