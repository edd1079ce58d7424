use crate::errors::AppResult;
use crate::models::{
    CategoryCounts, ClientSettings, CreateMetadataKeyRequest, CustomMetadataKey, Directory,
    DirectoryRemovalResult, DirectoryScope, FileCategory, FilePage, MetadataFilter, MetadataLogic,
    SortOptions, Tag, UpdateMetadataKeyRequest,
};
use async_trait::async_trait;

/// Page-sized query parameters shared by all four paginated operations.
/// Directory scope and category are not part of this struct; they select
/// which operation is dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub search_text: String,
    pub tag_ids: Vec<String>,
    pub metadata_filters: Vec<MetadataFilter>,
    pub metadata_logic: MetadataLogic,
    pub sort: SortOptions,
    pub limit: usize,
    pub offset: usize,
}

/// The remote, already-paginated data source behind the file and search
/// views. Implementations live outside this crate (backend commands).
#[async_trait]
pub trait RemoteQuery: Send + Sync {
    async fn fetch_all_paginated(&self, query: &PageQuery) -> AppResult<FilePage>;

    async fn fetch_all_paginated_with_category(
        &self,
        category: FileCategory,
        query: &PageQuery,
    ) -> AppResult<FilePage>;

    async fn fetch_by_directory_paginated(
        &self,
        directory_id: &str,
        query: &PageQuery,
    ) -> AppResult<FilePage>;

    async fn fetch_by_directory_paginated_with_category(
        &self,
        directory_id: &str,
        category: FileCategory,
        query: &PageQuery,
    ) -> AppResult<FilePage>;

    /// Per-item tag lookup. Must tolerate ids that no longer exist by
    /// returning an empty list rather than an error.
    async fn fetch_file_tags(&self, file_id: &str) -> AppResult<Vec<Tag>>;

    /// Category totals for the given scope, independent of a page fetch.
    async fn count_by_category(&self, scope: &DirectoryScope) -> AppResult<CategoryCounts>;
}

/// CRUD surface for directories, tags, metadata keys and files, plus client
/// settings. Called by the view-model orchestration layer, which triggers the
/// relevant refreshes on success.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn list_directories(&self) -> AppResult<Vec<Directory>>;
    async fn add_directory(&self, path: &str, name: &str) -> AppResult<Directory>;
    async fn remove_directory(&self, id: &str) -> AppResult<DirectoryRemovalResult>;
    async fn rescan_directory(&self, id: &str) -> AppResult<()>;

    async fn list_tags(&self) -> AppResult<Vec<Tag>>;
    async fn create_tag(&self, name: &str, color: &str) -> AppResult<Tag>;
    async fn update_tag(&self, id: &str, name: &str, color: &str) -> AppResult<Tag>;
    async fn delete_tag(&self, id: &str) -> AppResult<()>;

    async fn list_metadata_keys(&self) -> AppResult<Vec<CustomMetadataKey>>;
    async fn create_metadata_key(
        &self,
        request: &CreateMetadataKeyRequest,
    ) -> AppResult<CustomMetadataKey>;
    async fn update_metadata_key(
        &self,
        id: &str,
        request: &UpdateMetadataKeyRequest,
    ) -> AppResult<CustomMetadataKey>;
    async fn delete_metadata_key(&self, id: &str) -> AppResult<()>;

    async fn delete_file(&self, id: &str) -> AppResult<()>;

    async fn settings(&self) -> AppResult<ClientSettings>;
}
