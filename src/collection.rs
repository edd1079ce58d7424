use crate::models::SortOrder;
use crate::observable::Observable;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

/// Comparable key produced by a sort-key extractor. Items whose extractor
/// returns `None` sort after every keyed item, regardless of direction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Integer(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
}

type SortKeyFn<T> = Arc<dyn Fn(&T, &str) -> Option<SortValue> + Send + Sync>;
type FilterFn<T, F> = Arc<dyn Fn(&T, &F) -> bool + Send + Sync>;

struct State<T, F> {
    raw_items: Vec<T>,
    filter: F,
    sort_key: String,
    sort_order: SortOrder,
    current_page: usize,
    items_per_page: usize,
}

/// Consistent filtered/sorted/paged view over an in-memory collection, for
/// datasets small enough to keep client-side. The pipeline is strictly
/// filter -> sort -> paginate; every input is sanitized by clamping, so no
/// operation fails. After any mutation the current page is back in
/// `[1, max(1, ceil(filtered / per_page))]`.
pub struct CollectionViewStore<T, F> {
    state: Arc<Mutex<State<T, F>>>,
    sort_key_fn: Option<SortKeyFn<T>>,
    filter_fn: Option<FilterFn<T, F>>,
    visible: Arc<Observable<Vec<T>>>,
    page_info: Arc<Observable<PageInfo>>,
}

impl<T, F> Clone for CollectionViewStore<T, F> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            sort_key_fn: self.sort_key_fn.clone(),
            filter_fn: self.filter_fn.clone(),
            visible: Arc::clone(&self.visible),
            page_info: Arc::clone(&self.page_info),
        }
    }
}

impl<T, F> CollectionViewStore<T, F>
where
    T: Clone,
    F: Clone + Default,
{
    pub fn new(items_per_page: usize, default_sort_key: &str) -> Self {
        let items_per_page = items_per_page.max(1);
        Self {
            state: Arc::new(Mutex::new(State {
                raw_items: Vec::new(),
                filter: F::default(),
                sort_key: default_sort_key.to_string(),
                sort_order: SortOrder::Asc,
                current_page: 1,
                items_per_page,
            })),
            sort_key_fn: None,
            filter_fn: None,
            visible: Arc::new(Observable::new(Vec::new())),
            page_info: Arc::new(Observable::new(PageInfo {
                current_page: 1,
                total_pages: 1,
                total_items: 0,
                items_per_page,
            })),
        }
    }

    pub fn with_sort_key_fn(
        mut self,
        extractor: impl Fn(&T, &str) -> Option<SortValue> + Send + Sync + 'static,
    ) -> Self {
        self.sort_key_fn = Some(Arc::new(extractor));
        self
    }

    pub fn with_filter_predicate(
        mut self,
        predicate: impl Fn(&T, &F) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter_fn = Some(Arc::new(predicate));
        self
    }

    /// Replaces the raw items wholesale and resets to page 1. Must be called
    /// whenever the backing data changes.
    pub fn set_items(&self, items: Vec<T>) {
        let mut state = self.lock();
        state.raw_items = items;
        state.current_page = 1;
        self.recompute(&mut state);
    }

    pub fn set_items_per_page(&self, items_per_page: usize) {
        let mut state = self.lock();
        state.items_per_page = items_per_page.max(1);
        state.current_page = 1;
        self.recompute(&mut state);
    }

    pub fn go_to_page(&self, page: usize) {
        let mut state = self.lock();
        state.current_page = page.max(1);
        self.recompute(&mut state);
    }

    pub fn go_to_next_page(&self) {
        let mut state = self.lock();
        state.current_page = state.current_page.saturating_add(1);
        self.recompute(&mut state);
    }

    pub fn go_to_previous_page(&self) {
        let mut state = self.lock();
        state.current_page = state.current_page.saturating_sub(1).max(1);
        self.recompute(&mut state);
    }

    pub fn go_to_first_page(&self) {
        self.go_to_page(1);
    }

    pub fn go_to_last_page(&self) {
        let mut state = self.lock();
        state.current_page = usize::MAX;
        self.recompute(&mut state);
    }

    /// Flips direction when `key` is already active, otherwise switches to
    /// `key` ascending.
    pub fn toggle_sort(&self, key: &str) {
        let mut state = self.lock();
        if state.sort_key == key {
            state.sort_order = state.sort_order.flipped();
        } else {
            state.sort_key = key.to_string();
            state.sort_order = SortOrder::Asc;
        }
        self.recompute(&mut state);
    }

    pub fn set_sort(&self, key: &str, order: SortOrder) {
        let mut state = self.lock();
        state.sort_key = key.to_string();
        state.sort_order = order;
        self.recompute(&mut state);
    }

    pub fn set_filter(&self, filter: F) {
        let mut state = self.lock();
        state.filter = filter;
        self.recompute(&mut state);
    }

    pub fn update_filter(&self, mutate: impl FnOnce(&mut F)) {
        let mut state = self.lock();
        mutate(&mut state.filter);
        self.recompute(&mut state);
    }

    pub fn clear_filter(&self) {
        self.set_filter(F::default());
    }

    pub fn items(&self) -> Vec<T> {
        self.lock().raw_items.clone()
    }

    pub fn filter(&self) -> F {
        self.lock().filter.clone()
    }

    pub fn visible_items(&self) -> Vec<T> {
        self.visible.get()
    }

    pub fn page_info(&self) -> PageInfo {
        self.page_info.get()
    }

    pub fn sort(&self) -> (String, SortOrder) {
        let state = self.lock();
        (state.sort_key.clone(), state.sort_order)
    }

    pub fn subscribe_visible(&self) -> tokio::sync::watch::Receiver<Vec<T>> {
        self.visible.subscribe()
    }

    pub fn subscribe_page_info(&self) -> tokio::sync::watch::Receiver<PageInfo> {
        self.page_info.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<T, F>> {
        self.state.lock().expect("collection store lock")
    }

    fn recompute(&self, state: &mut State<T, F>) {
        let mut filtered: Vec<T> = match &self.filter_fn {
            Some(predicate) => state
                .raw_items
                .iter()
                .filter(|item| predicate(item, &state.filter))
                .cloned()
                .collect(),
            None => state.raw_items.clone(),
        };

        if let Some(extractor) = &self.sort_key_fn {
            let descending = state.sort_order == SortOrder::Desc;
            let key = state.sort_key.clone();
            filtered.sort_by(|a, b| {
                match (extractor(a, &key), extractor(b, &key)) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (Some(left), Some(right)) => {
                        let ordering = left.cmp(&right);
                        if descending {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    }
                }
            });
        }

        let total_items = filtered.len();
        let total_pages = (total_items.div_ceil(state.items_per_page)).max(1);
        state.current_page = state.current_page.clamp(1, total_pages);

        let start = (state.current_page - 1) * state.items_per_page;
        let slice: Vec<T> = filtered
            .into_iter()
            .skip(start)
            .take(state.items_per_page)
            .collect();

        self.visible.set(slice);
        self.page_info.set(PageInfo {
            current_page: state.current_page,
            total_pages,
            total_items,
            items_per_page: state.items_per_page,
        });
    }
}
