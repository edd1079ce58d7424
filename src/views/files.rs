use crate::backend::{CatalogBackend, RemoteQuery};
use crate::controller::PaginatedQueryController;
use crate::models::{CategoryCounts, DirectoryScope, FileCategory, FileHit};
use crate::notifications::NotificationAggregator;
use crate::observable::Observable;
use crate::views::run_notified;
use std::sync::Arc;

/// Browse view: the paginated file listing for the selected directory scope,
/// plus category totals, selection and deletion. Pagination, filters and
/// sorting live on the embedded controller.
#[derive(Clone)]
pub struct FileViewModel {
    query: Arc<dyn RemoteQuery>,
    catalog: Arc<dyn CatalogBackend>,
    notifications: NotificationAggregator,
    controller: PaginatedQueryController,
    selected_file: Arc<Observable<Option<FileHit>>>,
    category_counts: Arc<Observable<CategoryCounts>>,
    deleting: Arc<Observable<bool>>,
    busy: Arc<Observable<bool>>,
}

impl FileViewModel {
    pub fn new(
        query: Arc<dyn RemoteQuery>,
        catalog: Arc<dyn CatalogBackend>,
        notifications: NotificationAggregator,
    ) -> Self {
        let controller = PaginatedQueryController::new(Arc::clone(&query), notifications.clone());
        Self {
            query,
            catalog,
            notifications,
            controller,
            selected_file: Arc::new(Observable::new(None)),
            category_counts: Arc::new(Observable::new(CategoryCounts::new())),
            deleting: Arc::new(Observable::new(false)),
            busy: Arc::new(Observable::new(false)),
        }
    }

    /// Applies the persisted page size, then performs the first fetch and
    /// loads the category totals. The page-size application doubles as the
    /// initial load.
    pub async fn initialize(&self) -> bool {
        let settings = match self.catalog.settings().await {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(%error, "settings unavailable, using defaults");
                Default::default()
            }
        };
        let loaded = self.controller.set_page_size(settings.files_per_page).await;
        self.refresh_category_counts().await;
        loaded
    }

    pub fn controller(&self) -> &PaginatedQueryController {
        &self.controller
    }

    /// Category totals for the current scope, independent of the page fetch
    /// so switching categories keeps stable sidebar counts.
    pub async fn refresh_category_counts(&self) -> bool {
        let scope = self.controller.criteria().directory_scope;
        let counts = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to load category counts",
            self.query.count_by_category(&scope),
        )
        .await;
        match counts {
            Some(counts) => {
                self.category_counts.set(counts);
                true
            }
            None => false,
        }
    }

    pub async fn set_selected_directory(&self, scope: DirectoryScope) -> bool {
        let refreshed = self.controller.set_directory_scope(scope).await;
        self.refresh_category_counts().await;
        refreshed
    }

    pub async fn select_category(&self, category: FileCategory) -> bool {
        self.controller.select_category(category).await
    }

    pub async fn update_items_per_page(&self, items_per_page: usize) -> bool {
        self.controller.set_page_size(items_per_page).await
    }

    pub async fn refresh(&self) -> bool {
        let refreshed = self.controller.refresh().await;
        self.refresh_category_counts().await;
        refreshed
    }

    pub fn select_file(&self, file: Option<FileHit>) {
        self.selected_file.set(file);
    }

    pub fn selected_file(&self) -> Option<FileHit> {
        self.selected_file.get()
    }

    /// Deletes a file, then refreshes the listing and counts. The deleted
    /// file is deselected if it was the selection.
    pub async fn delete_file(&self, id: &str) -> bool {
        let deleted = run_notified(
            &self.notifications,
            &self.deleting,
            "Failed to delete file",
            self.catalog.delete_file(id),
        )
        .await;
        if deleted.is_none() {
            return false;
        }
        if self
            .selected_file
            .get()
            .is_some_and(|selected| selected.file.id == id)
        {
            self.selected_file.set(None);
        }
        self.notifications.success("File deleted");
        self.refresh().await;
        true
    }

    pub fn category_counts(&self) -> CategoryCounts {
        self.category_counts.get()
    }

    pub fn subscribe_category_counts(&self) -> tokio::sync::watch::Receiver<CategoryCounts> {
        self.category_counts.subscribe()
    }

    pub fn subscribe_selected_file(&self) -> tokio::sync::watch::Receiver<Option<FileHit>> {
        self.selected_file.subscribe()
    }

    pub fn subscribe_deleting(&self) -> tokio::sync::watch::Receiver<bool> {
        self.deleting.subscribe()
    }
}
