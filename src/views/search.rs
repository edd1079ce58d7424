use crate::backend::RemoteQuery;
use crate::controller::PaginatedQueryController;
use crate::models::{DirectoryScope, FileCategory, MetadataFilter, MetadataLogic, SortOptions};
use crate::notifications::NotificationAggregator;
use std::sync::Arc;

/// Search view: its own controller over the same backend, so search criteria
/// and results never interfere with the browse view.
#[derive(Clone)]
pub struct SearchViewModel {
    controller: PaginatedQueryController,
}

impl SearchViewModel {
    pub fn new(query: Arc<dyn RemoteQuery>, notifications: NotificationAggregator) -> Self {
        Self {
            controller: PaginatedQueryController::new(query, notifications),
        }
    }

    pub fn controller(&self) -> &PaginatedQueryController {
        &self.controller
    }

    /// First fetch with the blank default criteria, so the view starts
    /// populated like the browse view.
    pub async fn initialize(&self) -> bool {
        self.controller.initial_load().await
    }

    pub async fn perform_search(&self, text: &str) -> bool {
        self.controller.set_search_text(text).await
    }

    pub async fn set_tag_filter(&self, tag_ids: Vec<String>) -> bool {
        self.controller.set_tag_filter(tag_ids).await
    }

    pub async fn set_metadata_filters(&self, filters: Vec<MetadataFilter>) -> bool {
        self.controller.set_metadata_filters(filters).await
    }

    pub async fn set_metadata_logic(&self, logic: MetadataLogic) -> bool {
        self.controller.set_metadata_logic(logic).await
    }

    pub async fn select_category(&self, category: FileCategory) -> bool {
        self.controller.select_category(category).await
    }

    pub async fn set_sort_options(&self, sort: SortOptions) -> bool {
        self.controller.set_sort_options(sort).await
    }

    /// The scope change always refetches, even with an empty query, so stale
    /// results from another directory never linger.
    pub async fn set_selected_directory(&self, scope: DirectoryScope) -> bool {
        self.controller.set_directory_scope(scope).await
    }

    /// Back to a blank search: default criteria, no results, no fetch.
    pub fn clear(&self) {
        self.controller.clear();
    }

    pub fn has_results(&self) -> bool {
        !self.controller.results().hits.is_empty()
    }

    /// Refetch only when something is on screen; a blank search stays blank.
    pub async fn refresh_results(&self) -> bool {
        if !self.has_results() {
            return false;
        }
        self.controller.refresh().await
    }
}
