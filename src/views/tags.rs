use crate::backend::CatalogBackend;
use crate::collection::{CollectionViewStore, SortValue};
use crate::models::{
    CreateMetadataKeyRequest, CustomMetadataKey, Tag, UpdateMetadataKeyRequest,
};
use crate::notifications::NotificationAggregator;
use crate::observable::Observable;
use crate::views::run_notified;
use std::sync::Arc;

const TAGS_PER_PAGE: usize = 25;

/// Client-side filter over the tag collection.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub search_query: String,
    pub color: Option<String>,
}

/// Tag and metadata-key management. Tags are few enough to hold client-side,
/// so they live in a collection store; writes go through the backend with an
/// optimistic local update, reconciled by a reload on failure.
#[derive(Clone)]
pub struct TagViewModel {
    backend: Arc<dyn CatalogBackend>,
    notifications: NotificationAggregator,
    store: CollectionViewStore<Tag, TagFilter>,
    metadata_keys: Arc<Observable<Vec<CustomMetadataKey>>>,
    busy: Arc<Observable<bool>>,
}

impl TagViewModel {
    pub fn new(backend: Arc<dyn CatalogBackend>, notifications: NotificationAggregator) -> Self {
        let store = CollectionViewStore::new(TAGS_PER_PAGE, "name")
            .with_sort_key_fn(|tag: &Tag, key| match key {
                "name" => Some(SortValue::Text(tag.name.to_lowercase())),
                "createdAt" => Some(SortValue::Timestamp(tag.created_at)),
                _ => None,
            })
            .with_filter_predicate(|tag: &Tag, filter: &TagFilter| {
                let query = filter.search_query.to_lowercase();
                let matches_query = query.is_empty() || tag.name.to_lowercase().contains(&query);
                let matches_color = filter
                    .color
                    .as_ref()
                    .map_or(true, |color| tag.color.eq_ignore_ascii_case(color));
                matches_query && matches_color
            });
        Self {
            backend,
            notifications,
            store,
            metadata_keys: Arc::new(Observable::new(Vec::new())),
            busy: Arc::new(Observable::new(false)),
        }
    }

    pub fn store(&self) -> &CollectionViewStore<Tag, TagFilter> {
        &self.store
    }

    pub async fn load_tags(&self) -> bool {
        let tags = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to load tags",
            self.backend.list_tags(),
        )
        .await;
        match tags {
            Some(tags) => {
                self.store.set_items(tags);
                true
            }
            None => false,
        }
    }

    pub async fn create_tag(&self, name: &str, color: &str) -> Option<Tag> {
        let created = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to create tag",
            self.backend.create_tag(name, color),
        )
        .await?;
        self.notifications
            .success(&format!("Created tag \"{}\"", created.name));
        self.load_tags().await;
        Some(created)
    }

    /// Optimistic: the tag disappears immediately; a failed backend delete
    /// reconciles by reloading.
    pub async fn delete_tag(&self, id: &str) -> bool {
        let mut remaining = self.store.items();
        remaining.retain(|tag| tag.id != id);
        self.store.set_items(remaining);

        let deleted = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to delete tag",
            self.backend.delete_tag(id),
        )
        .await;
        if deleted.is_none() {
            self.load_tags().await;
            return false;
        }
        true
    }

    /// Optimistic rename/recolor, reconciled by a reload on failure.
    pub async fn update_tag(&self, id: &str, name: &str, color: &str) -> Option<Tag> {
        let mut items = self.store.items();
        for tag in &mut items {
            if tag.id == id {
                tag.name = name.to_string();
                tag.color = color.to_string();
            }
        }
        self.store.set_items(items);

        let updated = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to update tag",
            self.backend.update_tag(id, name, color),
        )
        .await;
        if updated.is_none() {
            self.load_tags().await;
        }
        updated
    }

    /// Drops already-deleted tags locally without a round trip, for cascades
    /// reported by a directory removal.
    pub fn remove_tags_by_ids(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        let mut remaining = self.store.items();
        remaining.retain(|tag| !ids.contains(&tag.id));
        self.store.set_items(remaining);
    }

    pub async fn load_metadata_keys(&self) -> bool {
        let keys = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to load metadata keys",
            self.backend.list_metadata_keys(),
        )
        .await;
        match keys {
            Some(keys) => {
                self.metadata_keys.set(keys);
                true
            }
            None => false,
        }
    }

    pub async fn create_metadata_key(
        &self,
        request: &CreateMetadataKeyRequest,
    ) -> Option<CustomMetadataKey> {
        let created = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to create metadata key",
            self.backend.create_metadata_key(request),
        )
        .await?;
        self.notifications
            .success(&format!("Created metadata key \"{}\"", created.display_name));
        self.load_metadata_keys().await;
        Some(created)
    }

    pub async fn update_metadata_key(
        &self,
        id: &str,
        request: &UpdateMetadataKeyRequest,
    ) -> Option<CustomMetadataKey> {
        let updated = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to update metadata key",
            self.backend.update_metadata_key(id, request),
        )
        .await?;
        self.load_metadata_keys().await;
        Some(updated)
    }

    pub async fn delete_metadata_key(&self, id: &str) -> bool {
        let deleted = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to delete metadata key",
            self.backend.delete_metadata_key(id),
        )
        .await;
        if deleted.is_none() {
            return false;
        }
        self.load_metadata_keys().await;
        true
    }

    pub fn metadata_keys(&self) -> Vec<CustomMetadataKey> {
        self.metadata_keys.get()
    }

    pub fn subscribe_metadata_keys(
        &self,
    ) -> tokio::sync::watch::Receiver<Vec<CustomMetadataKey>> {
        self.metadata_keys.subscribe()
    }
}
