use crate::storage::relation::{KeyedRelation, Relation};
use crate::types::{Item, ItemExternalRef, ItemId};

/// Read-only item metadata: titles and external links.
#[derive(Clone, Debug, Default)]
pub struct CatalogStore {
    items: KeyedRelation<Item>,
    links: KeyedRelation<ItemExternalRef>,
}

impl CatalogStore {
    /// Builds the catalog from loaded item and link rows.
    pub fn new(items: Vec<Item>, links: Vec<ItemExternalRef>) -> Self {
        Self {
            items: KeyedRelation::from_rows(items),
            links: KeyedRelation::from_rows(links),
        }
    }

    /// Item relation keyed by item id.
    pub fn items(&self) -> &KeyedRelation<Item> {
        &self.items
    }

    /// External link relation keyed by item id.
    pub fn links(&self) -> &KeyedRelation<ItemExternalRef> {
        &self.links
    }

    /// Title of the first catalog row for `item_id`.
    pub fn title(&self, item_id: ItemId) -> Option<&str> {
        self.items.first(item_id).map(|item| item.title.as_str())
    }

    /// Number of item rows.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of link rows.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
