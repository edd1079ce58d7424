use async_trait::async_trait;
use chrono::Utc;
use filecabinet::{
    AppContext, AppResult, CatalogBackend, CategoryCounts, ClientSettings,
    CreateMetadataKeyRequest, CustomMetadataKey, Directory, DirectoryRemovalResult,
    DirectoryScope, FileCategory, FileEntry, FilePage, NotificationKind, PageQuery, RemoteQuery,
    ScoredFile, Tag, UpdateMetadataKeyRequest,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct InMemoryBackend {
    directories: Mutex<Vec<Directory>>,
    tags: Mutex<Vec<Tag>>,
    files: Mutex<Vec<FileEntry>>,
    files_per_page: usize,
    fail_settings: AtomicBool,
}

impl InMemoryBackend {
    fn seeded() -> Arc<Self> {
        let now = Utc::now();
        let directories = vec![
            Directory {
                id: "d1".to_string(),
                path: "/watched/photos".to_string(),
                name: "photos".to_string(),
                created_at: now,
                updated_at: now,
            },
            Directory {
                id: "d2".to_string(),
                path: "/watched/docs".to_string(),
                name: "docs".to_string(),
                created_at: now,
                updated_at: now,
            },
        ];
        let tags = vec![
            Tag {
                id: "t1".to_string(),
                name: "travel".to_string(),
                color: "#00aaff".to_string(),
                created_at: now,
            },
            Tag {
                id: "t2".to_string(),
                name: "receipts".to_string(),
                color: "#ffaa00".to_string(),
                created_at: now,
            },
        ];
        let files = (1..=25)
            .map(|n| {
                let directory_id = if n % 2 == 0 { "d2" } else { "d1" };
                FileEntry {
                    id: format!("f{n}"),
                    path: format!("/watched/{directory_id}/file-{n:02}.png"),
                    name: format!("file-{n:02}.png"),
                    directory_id: directory_id.to_string(),
                    size: 100 + n as u64,
                    mime_type: Some("image/png".to_string()),
                    is_directory: false,
                    created_at: Some(now),
                    modified_at: Some(now),
                    last_accessed: None,
                    metadata: None,
                }
            })
            .collect();
        Arc::new(Self {
            directories: Mutex::new(directories),
            tags: Mutex::new(tags),
            files: Mutex::new(files),
            files_per_page: 10,
            fail_settings: AtomicBool::new(false),
        })
    }

    fn matching(&self, scope: &DirectoryScope, category: FileCategory, query: &PageQuery) -> Vec<FileEntry> {
        self.files
            .lock()
            .expect("files lock")
            .iter()
            .filter(|file| match scope {
                DirectoryScope::All => true,
                DirectoryScope::Directory(id) => &file.directory_id == id,
            })
            .filter(|file| match category {
                FileCategory::All => true,
                FileCategory::Image => file
                    .mime_type
                    .as_deref()
                    .is_some_and(|mime| mime.starts_with("image/")),
                _ => false,
            })
            .filter(|file| query.search_text.is_empty() || file.name.contains(&query.search_text))
            .cloned()
            .collect()
    }

    fn page(&self, scope: &DirectoryScope, category: FileCategory, query: &PageQuery) -> FilePage {
        let matching = self.matching(scope, category, query);
        let total_count = matching.len() as u64;
        let files = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|file| ScoredFile { file, score: 1.0 })
            .collect();
        let counts = self.counts(scope);
        FilePage {
            files,
            total_count,
            category_counts: counts.clone(),
            total_category_counts: counts,
        }
    }

    fn counts(&self, scope: &DirectoryScope) -> CategoryCounts {
        let everything = self.matching(
            scope,
            FileCategory::All,
            &PageQuery {
                search_text: String::new(),
                tag_ids: Vec::new(),
                metadata_filters: Vec::new(),
                metadata_logic: filecabinet::MetadataLogic::And,
                sort: Default::default(),
                limit: usize::MAX,
                offset: 0,
            },
        );
        let mut counts = CategoryCounts::new();
        counts.insert(FileCategory::All, everything.len() as u64);
        counts.insert(
            FileCategory::Image,
            everything
                .iter()
                .filter(|file| {
                    file.mime_type
                        .as_deref()
                        .is_some_and(|mime| mime.starts_with("image/"))
                })
                .count() as u64,
        );
        counts
    }
}

#[async_trait]
impl RemoteQuery for InMemoryBackend {
    async fn fetch_all_paginated(&self, query: &PageQuery) -> AppResult<FilePage> {
        Ok(self.page(&DirectoryScope::All, FileCategory::All, query))
    }

    async fn fetch_all_paginated_with_category(
        &self,
        category: FileCategory,
        query: &PageQuery,
    ) -> AppResult<FilePage> {
        Ok(self.page(&DirectoryScope::All, category, query))
    }

    async fn fetch_by_directory_paginated(
        &self,
        directory_id: &str,
        query: &PageQuery,
    ) -> AppResult<FilePage> {
        Ok(self.page(
            &DirectoryScope::Directory(directory_id.to_string()),
            FileCategory::All,
            query,
        ))
    }

    async fn fetch_by_directory_paginated_with_category(
        &self,
        directory_id: &str,
        category: FileCategory,
        query: &PageQuery,
    ) -> AppResult<FilePage> {
        Ok(self.page(
            &DirectoryScope::Directory(directory_id.to_string()),
            category,
            query,
        ))
    }

    async fn fetch_file_tags(&self, file_id: &str) -> AppResult<Vec<Tag>> {
        let known = self
            .files
            .lock()
            .expect("files lock")
            .iter()
            .any(|file| file.id == file_id);
        if !known {
            return Ok(Vec::new());
        }
        Ok(self.tags.lock().expect("tags lock").clone())
    }

    async fn count_by_category(&self, scope: &DirectoryScope) -> AppResult<CategoryCounts> {
        Ok(self.counts(scope))
    }
}

#[async_trait]
impl CatalogBackend for InMemoryBackend {
    async fn list_directories(&self) -> AppResult<Vec<Directory>> {
        Ok(self.directories.lock().expect("dirs lock").clone())
    }

    async fn add_directory(&self, path: &str, name: &str) -> AppResult<Directory> {
        let now = Utc::now();
        let added = Directory {
            id: format!("dir-{name}"),
            path: path.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.directories
            .lock()
            .expect("dirs lock")
            .push(added.clone());
        Ok(added)
    }

    async fn remove_directory(&self, id: &str) -> AppResult<DirectoryRemovalResult> {
        self.directories
            .lock()
            .expect("dirs lock")
            .retain(|dir| dir.id != id);
        self.files
            .lock()
            .expect("files lock")
            .retain(|file| file.directory_id != id);
        // The seed ties t1 to d1: removing d1 cascades that tag away.
        let deleted_tag_ids = if id == "d1" {
            self.tags.lock().expect("tags lock").retain(|tag| tag.id != "t1");
            vec!["t1".to_string()]
        } else {
            Vec::new()
        };
        Ok(DirectoryRemovalResult {
            deleted_tags_count: deleted_tag_ids.len() as u64,
            deleted_tag_ids,
        })
    }

    async fn rescan_directory(&self, _id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn list_tags(&self) -> AppResult<Vec<Tag>> {
        Ok(self.tags.lock().expect("tags lock").clone())
    }

    async fn create_tag(&self, name: &str, color: &str) -> AppResult<Tag> {
        let created = Tag {
            id: format!("tag-{name}"),
            name: name.to_string(),
            color: color.to_string(),
            created_at: Utc::now(),
        };
        self.tags.lock().expect("tags lock").push(created.clone());
        Ok(created)
    }

    async fn update_tag(&self, id: &str, name: &str, color: &str) -> AppResult<Tag> {
        let mut tags = self.tags.lock().expect("tags lock");
        let tag = tags
            .iter_mut()
            .find(|tag| tag.id == id)
            .ok_or_else(|| anyhow::anyhow!("no tag with id {id}"))?;
        tag.name = name.to_string();
        tag.color = color.to_string();
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: &str) -> AppResult<()> {
        self.tags.lock().expect("tags lock").retain(|tag| tag.id != id);
        Ok(())
    }

    async fn list_metadata_keys(&self) -> AppResult<Vec<CustomMetadataKey>> {
        Ok(Vec::new())
    }

    async fn create_metadata_key(
        &self,
        _request: &CreateMetadataKeyRequest,
    ) -> AppResult<CustomMetadataKey> {
        Err(anyhow::anyhow!("metadata keys are read-only in this fixture").into())
    }

    async fn update_metadata_key(
        &self,
        _id: &str,
        _request: &UpdateMetadataKeyRequest,
    ) -> AppResult<CustomMetadataKey> {
        Err(anyhow::anyhow!("metadata keys are read-only in this fixture").into())
    }

    async fn delete_metadata_key(&self, _id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn delete_file(&self, id: &str) -> AppResult<()> {
        self.files.lock().expect("files lock").retain(|file| file.id != id);
        Ok(())
    }

    async fn settings(&self) -> AppResult<ClientSettings> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("settings store unavailable").into());
        }
        Ok(ClientSettings {
            files_per_page: self.files_per_page,
        })
    }
}

fn context(backend: &Arc<InMemoryBackend>) -> AppContext {
    AppContext::new(
        Arc::clone(backend) as Arc<dyn RemoteQuery>,
        Arc::clone(backend) as Arc<dyn CatalogBackend>,
    )
}

#[tokio::test]
async fn initialize_runs_the_staged_startup() {
    let backend = InMemoryBackend::seeded();
    let ctx = context(&backend);

    assert_eq!(ctx.loading_progress(), 0);
    ctx.initialize().await;

    assert_eq!(ctx.loading_progress(), 100);
    let steps = ctx.loading_steps();
    assert!(steps.directories && steps.tags && steps.files);

    assert_eq!(ctx.directories.directories().len(), 2);
    assert_eq!(ctx.tags.store().items().len(), 2);

    let criteria = ctx.files.controller().criteria();
    assert_eq!(criteria.page_size, 10);
    let results = ctx.files.controller().results();
    assert_eq!(results.hits.len(), 10);
    assert_eq!(results.total_count, 25);
    assert_eq!(
        ctx.files.category_counts().get(&FileCategory::All).copied(),
        Some(25)
    );
    // Enrichment attached tags to every visible row.
    assert!(results.hits.iter().all(|hit| hit.tags.len() == 2));

    assert_eq!(ctx.search.controller().results().total_count, 25);
}

#[tokio::test]
async fn selecting_a_directory_scopes_both_query_views() {
    let backend = InMemoryBackend::seeded();
    let ctx = context(&backend);
    ctx.initialize().await;

    ctx.select_directory(DirectoryScope::Directory("d1".to_string()))
        .await;

    let scope = DirectoryScope::Directory("d1".to_string());
    assert_eq!(ctx.files.controller().criteria().directory_scope, scope);
    assert_eq!(ctx.search.controller().criteria().directory_scope, scope);

    let results = ctx.files.controller().results();
    assert_eq!(results.total_count, 13);
    assert!(results.hits.iter().all(|hit| hit.file.directory_id == "d1"));
    assert_eq!(
        ctx.files.category_counts().get(&FileCategory::All).copied(),
        Some(13)
    );
}

#[tokio::test]
async fn removing_the_scoped_directory_cascades_and_falls_back() {
    let backend = InMemoryBackend::seeded();
    let ctx = context(&backend);
    ctx.initialize().await;

    ctx.select_directory(DirectoryScope::Directory("d1".to_string()))
        .await;
    let removed = ctx.remove_directory("d1").await.expect("removed");

    assert_eq!(removed.deleted_tag_ids, vec!["t1".to_string()]);
    assert_eq!(
        ctx.files.controller().criteria().directory_scope,
        DirectoryScope::All
    );
    assert_eq!(ctx.directories.directories().len(), 1);

    let tag_ids: Vec<String> = ctx
        .tags
        .store()
        .items()
        .into_iter()
        .map(|tag| tag.id)
        .collect();
    assert_eq!(tag_ids, vec!["t2".to_string()]);

    assert_eq!(ctx.files.controller().results().total_count, 12);
}

#[tokio::test]
async fn adding_a_directory_refreshes_the_listing() {
    let backend = InMemoryBackend::seeded();
    let ctx = context(&backend);
    ctx.initialize().await;

    let added = ctx.add_directory("/watched/music", "music").await;
    assert!(added.is_some());
    assert_eq!(ctx.directories.directories().len(), 3);
}

#[tokio::test]
async fn settings_failure_falls_back_to_the_default_page_size() {
    let backend = InMemoryBackend::seeded();
    backend.fail_settings.store(true, Ordering::SeqCst);
    let ctx = context(&backend);
    ctx.initialize().await;

    let criteria = ctx.files.controller().criteria();
    assert_eq!(criteria.page_size, 20);
    assert_eq!(ctx.files.controller().results().hits.len(), 20);
}

#[tokio::test]
async fn deleting_a_file_refreshes_the_listing_and_notifies() {
    let backend = InMemoryBackend::seeded();
    let ctx = context(&backend);
    ctx.initialize().await;

    assert!(ctx.files.delete_file("f1").await);
    assert_eq!(ctx.files.controller().results().total_count, 24);
    assert!(ctx
        .notifications
        .visible()
        .iter()
        .any(|notification| notification.kind == NotificationKind::Success));
}

#[tokio::test]
async fn search_starts_populated_and_clear_resets_it() {
    let backend = InMemoryBackend::seeded();
    let ctx = context(&backend);
    ctx.initialize().await;

    // The search view fetches the unfiltered first page at startup.
    assert_eq!(ctx.search.controller().results().total_count, 25);

    ctx.search.perform_search("file-01").await;
    assert_eq!(ctx.search.controller().results().total_count, 1);

    ctx.search.clear();
    assert!(ctx.search.controller().results().hits.is_empty());
    assert_eq!(ctx.search.controller().criteria().search_text, "");

    // A cleared search stays blank; the gate skips the refetch.
    assert!(!ctx.search.refresh_results().await);
    assert!(ctx.search.controller().results().hits.is_empty());
}
