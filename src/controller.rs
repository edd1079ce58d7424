use crate::backend::{PageQuery, RemoteQuery};
use crate::errors::{AppError, AppResult};
use crate::models::{
    CategoryCounts, DirectoryScope, FileCategory, FileHit, MetadataFilter, MetadataLogic,
    SortOptions,
};
use crate::notifications::NotificationAggregator;
use crate::observable::Observable;
use futures::future::join_all;
use std::sync::{Arc, Mutex};

/// Full set of filter/sort/pagination parameters driving one query dispatch.
/// Every mutation that affects result identity (everything except `page`)
/// resets `page` to 1 before the refetch.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCriteria {
    pub search_text: String,
    pub tag_ids: Vec<String>,
    pub metadata_filters: Vec<MetadataFilter>,
    pub metadata_logic: MetadataLogic,
    pub directory_scope: DirectoryScope,
    pub category: FileCategory,
    pub sort: SortOptions,
    pub page: usize,
    pub page_size: usize,
}

impl Default for QueryCriteria {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            tag_ids: Vec::new(),
            metadata_filters: Vec::new(),
            metadata_logic: MetadataLogic::And,
            directory_scope: DirectoryScope::All,
            category: FileCategory::All,
            sort: SortOptions::default(),
            page: 1,
            page_size: 20,
        }
    }
}

impl QueryCriteria {
    fn validate(&self) -> AppResult<()> {
        if self.page < 1 {
            return Err(AppError::Validation("page must be >= 1".to_string()));
        }
        if self.page_size < 1 {
            return Err(AppError::Validation("page size must be >= 1".to_string()));
        }
        Ok(())
    }

    fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }
}

/// One committed result set. Items and both count maps always come from the
/// same backend response; the UI never observes them mixed across fetches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    pub hits: Vec<FileHit>,
    pub total_count: u64,
    pub category_counts: CategoryCounts,
    pub total_category_counts: CategoryCounts,
}

/// Drives a server-paginated, filterable, sortable view (file listing,
/// search). The backend owns the authoritative page and counts; this
/// controller owns the criteria, picks the right backend operation, enriches
/// each row with its tags, and commits the result atomically.
///
/// There is no request fencing: when criteria change while a fetch is in
/// flight, both fetches resolve independently and the last one to finish
/// wins.
#[derive(Clone)]
pub struct PaginatedQueryController {
    backend: Arc<dyn RemoteQuery>,
    notifications: NotificationAggregator,
    criteria: Arc<Mutex<QueryCriteria>>,
    results: Arc<Observable<ResultPage>>,
    busy: Arc<Observable<bool>>,
}

impl PaginatedQueryController {
    pub fn new(backend: Arc<dyn RemoteQuery>, notifications: NotificationAggregator) -> Self {
        Self {
            backend,
            notifications,
            criteria: Arc::new(Mutex::new(QueryCriteria::default())),
            results: Arc::new(Observable::new(ResultPage::default())),
            busy: Arc::new(Observable::new(false)),
        }
    }

    /// First fetch with the default criteria (empty search, scope "all",
    /// default sort, page 1), so the view starts populated. Awaited once by
    /// the owning view model right after construction.
    pub async fn initial_load(&self) -> bool {
        self.refresh().await
    }

    pub fn criteria(&self) -> QueryCriteria {
        self.lock_criteria().clone()
    }

    pub fn results(&self) -> ResultPage {
        self.results.get()
    }

    pub fn subscribe_results(&self) -> tokio::sync::watch::Receiver<ResultPage> {
        self.results.subscribe()
    }

    pub fn subscribe_busy(&self) -> tokio::sync::watch::Receiver<bool> {
        self.busy.subscribe()
    }

    pub fn total_pages(&self) -> usize {
        let total = self.results.get().total_count as usize;
        let page_size = self.lock_criteria().page_size;
        total.div_ceil(page_size).max(1)
    }

    pub async fn set_search_text(&self, text: &str) -> bool {
        {
            let mut criteria = self.lock_criteria();
            criteria.search_text = text.to_string();
            criteria.page = 1;
        }
        self.refresh().await
    }

    pub async fn set_tag_filter(&self, tag_ids: Vec<String>) -> bool {
        {
            let mut criteria = self.lock_criteria();
            criteria.tag_ids = tag_ids;
            criteria.page = 1;
        }
        self.refresh().await
    }

    pub async fn set_metadata_filters(&self, filters: Vec<MetadataFilter>) -> bool {
        {
            let mut criteria = self.lock_criteria();
            criteria.metadata_filters = filters;
            criteria.page = 1;
        }
        self.refresh().await
    }

    pub async fn set_metadata_logic(&self, logic: MetadataLogic) -> bool {
        {
            let mut criteria = self.lock_criteria();
            criteria.metadata_logic = logic;
            criteria.page = 1;
        }
        self.refresh().await
    }

    pub async fn set_directory_scope(&self, scope: DirectoryScope) -> bool {
        {
            let mut criteria = self.lock_criteria();
            criteria.directory_scope = scope;
            criteria.page = 1;
        }
        self.refresh().await
    }

    pub async fn select_category(&self, category: FileCategory) -> bool {
        {
            let mut criteria = self.lock_criteria();
            criteria.category = category;
            criteria.page = 1;
        }
        self.refresh().await
    }

    pub async fn set_sort_options(&self, sort: SortOptions) -> bool {
        {
            let mut criteria = self.lock_criteria();
            criteria.sort = sort;
            criteria.page = 1;
        }
        self.refresh().await
    }

    /// A requested size below 1 clamps to 1, keeping later offset and
    /// page-count arithmetic well defined.
    pub async fn set_page_size(&self, page_size: usize) -> bool {
        {
            let mut criteria = self.lock_criteria();
            criteria.page_size = page_size.max(1);
            criteria.page = 1;
        }
        self.refresh().await
    }

    /// Changing only the page keeps every other criterion and fetches
    /// directly. A page below 1 is rejected before dispatch.
    pub async fn go_to_page(&self, page: usize) -> AppResult<bool> {
        if page < 1 {
            return Err(AppError::Validation("page must be >= 1".to_string()));
        }
        {
            let mut criteria = self.lock_criteria();
            criteria.page = page;
        }
        Ok(self.refresh().await)
    }

    pub async fn go_to_next_page(&self) -> AppResult<bool> {
        let current = self.lock_criteria().page;
        if current >= self.total_pages() {
            return Ok(false);
        }
        self.go_to_page(current + 1).await
    }

    pub async fn go_to_previous_page(&self) -> AppResult<bool> {
        let current = self.lock_criteria().page;
        if current <= 1 {
            return Ok(false);
        }
        self.go_to_page(current - 1).await
    }

    pub async fn go_to_first_page(&self) -> AppResult<bool> {
        self.go_to_page(1).await
    }

    pub async fn go_to_last_page(&self) -> AppResult<bool> {
        self.go_to_page(self.total_pages()).await
    }

    /// Resets the criteria to their defaults and empties the committed
    /// results without issuing a fetch.
    pub fn clear(&self) {
        {
            let mut criteria = self.lock_criteria();
            *criteria = QueryCriteria {
                page_size: criteria.page_size,
                ..QueryCriteria::default()
            };
        }
        self.results.set(ResultPage::default());
    }

    /// Refetches with the current criteria. Returns false (leaving the
    /// previously committed results untouched) when the primary fetch fails;
    /// the failure surfaces as an error notification.
    pub async fn refresh(&self) -> bool {
        let criteria = self.lock_criteria().clone();
        if let Err(error) = criteria.validate() {
            tracing::warn!(%error, "query rejected before dispatch");
            return false;
        }

        let query = PageQuery {
            search_text: criteria.search_text.clone(),
            tag_ids: criteria.tag_ids.clone(),
            metadata_filters: criteria.metadata_filters.clone(),
            metadata_logic: criteria.metadata_logic,
            sort: criteria.sort,
            limit: criteria.page_size,
            offset: criteria.offset(),
        };

        self.busy.set(true);
        let fetched = match (&criteria.directory_scope, criteria.category) {
            (DirectoryScope::All, FileCategory::All) => {
                self.backend.fetch_all_paginated(&query).await
            }
            (DirectoryScope::All, category) => {
                self.backend
                    .fetch_all_paginated_with_category(category, &query)
                    .await
            }
            (DirectoryScope::Directory(id), FileCategory::All) => {
                self.backend.fetch_by_directory_paginated(id, &query).await
            }
            (DirectoryScope::Directory(id), category) => {
                self.backend
                    .fetch_by_directory_paginated_with_category(id, category, &query)
                    .await
            }
        };

        let page = match fetched {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!(%error, "page fetch failed");
                self.notifications
                    .error(&format!("Failed to load results: {error}"));
                self.busy.set(false);
                return false;
            }
        };

        // Enrichment is per-item and failure-isolated: one failed tag lookup
        // defaults that row to no tags without aborting the batch.
        let hits = join_all(page.files.iter().map(|scored| {
            let backend = Arc::clone(&self.backend);
            async move {
                let tags = match backend.fetch_file_tags(&scored.file.id).await {
                    Ok(tags) => tags,
                    Err(error) => {
                        tracing::warn!(file_id = %scored.file.id, %error, "tag enrichment failed");
                        Vec::new()
                    }
                };
                FileHit {
                    file: scored.file.clone(),
                    tags,
                    score: scored.score,
                }
            }
        }))
        .await;

        self.results.set(ResultPage {
            hits,
            total_count: page.total_count,
            category_counts: page.category_counts,
            total_category_counts: page.total_category_counts,
        });
        self.busy.set(false);
        true
    }

    fn lock_criteria(&self) -> std::sync::MutexGuard<'_, QueryCriteria> {
        self.criteria.lock().expect("criteria lock")
    }
}
