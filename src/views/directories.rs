use crate::backend::CatalogBackend;
use crate::models::{Directory, DirectoryRemovalResult, DirectoryScope};
use crate::notifications::NotificationAggregator;
use crate::observable::Observable;
use crate::views::run_notified;
use std::sync::Arc;

/// Watched-directory management plus the currently selected scope. Selecting
/// a scope here only records it; the owning context fans the change out to
/// the file and search views.
#[derive(Clone)]
pub struct DirectoryViewModel {
    backend: Arc<dyn CatalogBackend>,
    notifications: NotificationAggregator,
    directories: Arc<Observable<Vec<Directory>>>,
    selected: Arc<Observable<DirectoryScope>>,
    busy: Arc<Observable<bool>>,
}

impl DirectoryViewModel {
    pub fn new(backend: Arc<dyn CatalogBackend>, notifications: NotificationAggregator) -> Self {
        Self {
            backend,
            notifications,
            directories: Arc::new(Observable::new(Vec::new())),
            selected: Arc::new(Observable::new(DirectoryScope::All)),
            busy: Arc::new(Observable::new(false)),
        }
    }

    pub async fn load(&self) -> bool {
        let loaded = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to load directories",
            self.backend.list_directories(),
        )
        .await;
        match loaded {
            Some(directories) => {
                self.directories.set(directories);
                true
            }
            None => false,
        }
    }

    pub async fn add_directory(&self, path: &str, name: &str) -> Option<Directory> {
        let added = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to add directory",
            self.backend.add_directory(path, name),
        )
        .await?;
        self.notifications
            .success(&format!("Added directory \"{}\"", added.name));
        self.load().await;
        Some(added)
    }

    pub async fn remove_directory(&self, id: &str) -> Option<DirectoryRemovalResult> {
        let removed = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to remove directory",
            self.backend.remove_directory(id),
        )
        .await?;
        if self.selected.get() == DirectoryScope::Directory(id.to_string()) {
            self.selected.set(DirectoryScope::All);
        }
        self.notifications.success("Directory removed");
        self.load().await;
        Some(removed)
    }

    pub async fn rescan_directory(&self, id: &str) -> bool {
        let rescanned = run_notified(
            &self.notifications,
            &self.busy,
            "Failed to rescan directory",
            self.backend.rescan_directory(id),
        )
        .await;
        if rescanned.is_some() {
            self.notifications.info("Directory rescan complete");
        }
        rescanned.is_some()
    }

    pub fn select(&self, scope: DirectoryScope) {
        self.selected.set(scope);
    }

    pub fn directories(&self) -> Vec<Directory> {
        self.directories.get()
    }

    pub fn selected(&self) -> DirectoryScope {
        self.selected.get()
    }

    pub fn subscribe_directories(&self) -> tokio::sync::watch::Receiver<Vec<Directory>> {
        self.directories.subscribe()
    }

    pub fn subscribe_selected(&self) -> tokio::sync::watch::Receiver<DirectoryScope> {
        self.selected.subscribe()
    }
}
