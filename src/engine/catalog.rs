use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

/// Categories and items of one venue's menu.
pub struct CatalogStore {
    categories: DashMap<Ulid, CatalogCategory>,
    items: DashMap<Ulid, CatalogItem>,
    items_by_category: DashMap<Ulid, Vec<Ulid>>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self {
            categories: DashMap::new(),
            items: DashMap::new(),
            items_by_category: DashMap::new(),
        }
    }

    // ── Categories ───────────────────────────────────────────

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn contains_category(&self, id: &Ulid) -> bool {
        self.categories.contains_key(id)
    }

    pub fn get_category(&self, id: &Ulid) -> Option<CatalogCategory> {
        self.categories.get(id).map(|e| e.value().clone())
    }

    pub fn has_items(&self, category_id: &Ulid) -> bool {
        self.items_by_category
            .get(category_id)
            .is_some_and(|ids| !ids.is_empty())
    }

    /// All categories ordered by title.
    pub fn categories_by_title(&self) -> Vec<CatalogCategory> {
        let mut all: Vec<_> = self.categories.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        all
    }

    // ── Items ────────────────────────────────────────────────

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn get_item(&self, id: &Ulid) -> Option<CatalogItem> {
        self.items.get(id).map(|e| e.value().clone())
    }

    /// Items matching `keep`, ordered by title.
    pub fn items_by_title(&self, keep: impl Fn(&CatalogItem) -> bool) -> Vec<CatalogItem> {
        let mut all: Vec<_> = self
            .items
            .iter()
            .filter(|e| keep(e.value()))
            .map(|e| e.value().clone())
            .collect();
        all.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        all
    }

    fn unindex_item(&self, item: &CatalogItem) {
        if let Some(mut ids) = self.items_by_category.get_mut(&item.category_id) {
            ids.retain(|i| i != &item.id);
        }
    }

    fn index_item(&self, item: &CatalogItem) {
        self.items_by_category
            .entry(item.category_id)
            .or_default()
            .push(item.id);
    }

    // ── Event application ────────────────────────────────────

    pub fn apply_event(&self, event: &Event) {
        match event {
            Event::CategoryCreated { category } => {
                self.categories.insert(category.id, category.clone());
            }
            Event::CategoryDeleted { id } => {
                self.categories.remove(id);
                self.items_by_category.remove(id);
            }
            Event::ItemCreated { item } | Event::ItemUpdated { item } => {
                if let Some(previous) = self.items.insert(item.id, item.clone()) {
                    self.unindex_item(&previous);
                }
                self.index_item(item);
            }
            Event::ItemDeleted { id } => {
                if let Some((_, previous)) = self.items.remove(id) {
                    self.unindex_item(&previous);
                }
            }
            _ => {}
        }
    }

    /// Events that recreate the current catalog, categories first.
    pub fn snapshot_events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .categories_by_title()
            .into_iter()
            .map(|category| Event::CategoryCreated { category })
            .collect();
        events.extend(
            self.items_by_title(|_| true)
                .into_iter()
                .map(|item| Event::ItemCreated { item }),
        );
        events
    }
}
