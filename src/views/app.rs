use crate::backend::{CatalogBackend, RemoteQuery};
use crate::models::{Directory, DirectoryRemovalResult, DirectoryScope, LoadingSteps};
use crate::notifications::NotificationAggregator;
use crate::observable::Observable;
use crate::views::{DirectoryViewModel, FileViewModel, SearchViewModel, TagViewModel};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveTab {
    Files,
    Search,
    Tags,
    Metadata,
}

/// Root of the client state: one shared notification aggregator, the four
/// view models, and the cross-view orchestration (startup sequencing and
/// directory-scope fan-out) that no single view model owns.
#[derive(Clone)]
pub struct AppContext {
    pub notifications: NotificationAggregator,
    pub directories: DirectoryViewModel,
    pub files: FileViewModel,
    pub search: SearchViewModel,
    pub tags: TagViewModel,
    loading_steps: Arc<Observable<LoadingSteps>>,
    loading_progress: Arc<Observable<u8>>,
    active_tab: Arc<Observable<ActiveTab>>,
}

impl AppContext {
    pub fn new(query: Arc<dyn RemoteQuery>, catalog: Arc<dyn CatalogBackend>) -> Self {
        let notifications = NotificationAggregator::new();
        Self {
            directories: DirectoryViewModel::new(Arc::clone(&catalog), notifications.clone()),
            files: FileViewModel::new(
                Arc::clone(&query),
                Arc::clone(&catalog),
                notifications.clone(),
            ),
            search: SearchViewModel::new(query, notifications.clone()),
            tags: TagViewModel::new(catalog, notifications.clone()),
            notifications,
            loading_steps: Arc::new(Observable::new(LoadingSteps::default())),
            loading_progress: Arc::new(Observable::new(0)),
            active_tab: Arc::new(Observable::new(ActiveTab::Files)),
        }
    }

    /// Staged startup: directories, then tags and metadata keys, then the
    /// file listing. Progress is reported after each stage so a splash screen
    /// can track it. A failed stage notifies and the sequence continues; the
    /// app starts degraded rather than not at all.
    pub async fn initialize(&self) {
        self.loading_progress.set(0);

        self.directories.load().await;
        self.loading_steps.update(|steps| steps.directories = true);
        self.loading_progress.set(33);

        self.tags.load_tags().await;
        self.tags.load_metadata_keys().await;
        self.loading_steps.update(|steps| steps.tags = true);
        self.loading_progress.set(66);

        self.files.initialize().await;
        self.search.initialize().await;
        self.loading_steps.update(|steps| steps.files = true);
        self.loading_progress.set(100);
        tracing::info!("client state initialized");
    }

    /// Reloads everything without replaying the staged progress.
    pub async fn reload_all(&self) {
        self.directories.load().await;
        self.tags.load_tags().await;
        self.tags.load_metadata_keys().await;
        self.files.refresh().await;
        self.search.refresh_results().await;
    }

    /// Fans a scope change out to every scope-dependent view, files before
    /// search, so the visible listing updates first.
    pub async fn select_directory(&self, scope: DirectoryScope) {
        self.directories.select(scope.clone());
        self.files.set_selected_directory(scope.clone()).await;
        self.search.set_selected_directory(scope).await;
    }

    pub async fn add_directory(&self, path: &str, name: &str) -> Option<Directory> {
        let added = self.directories.add_directory(path, name).await?;
        self.files.refresh().await;
        Some(added)
    }

    /// Removal can cascade-delete tags, so the tag view reconciles from the
    /// removal result before the listing refreshes.
    pub async fn remove_directory(&self, id: &str) -> Option<DirectoryRemovalResult> {
        let removed = self.directories.remove_directory(id).await?;
        if self.files.controller().criteria().directory_scope
            == DirectoryScope::Directory(id.to_string())
        {
            self.select_directory(DirectoryScope::All).await;
        }
        self.tags.remove_tags_by_ids(&removed.deleted_tag_ids);
        self.files.refresh().await;
        self.search.refresh_results().await;
        Some(removed)
    }

    pub async fn rescan_directory(&self, id: &str) -> bool {
        if !self.directories.rescan_directory(id).await {
            return false;
        }
        self.files.refresh().await;
        self.search.refresh_results().await;
        true
    }

    pub fn set_active_tab(&self, tab: ActiveTab) {
        self.active_tab.set(tab);
    }

    pub fn active_tab(&self) -> ActiveTab {
        self.active_tab.get()
    }

    pub fn loading_steps(&self) -> LoadingSteps {
        self.loading_steps.get()
    }

    pub fn loading_progress(&self) -> u8 {
        self.loading_progress.get()
    }

    pub fn subscribe_loading_progress(&self) -> tokio::sync::watch::Receiver<u8> {
        self.loading_progress.subscribe()
    }
}
