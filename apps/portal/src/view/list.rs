//! List View Controller: server-driven pagination with client-side search
//! and sort over the fetched page.
//!
//! The derived view is always `items -> search filter -> stable sort`; it is
//! recomputed from the current query on every read, never cached.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{ApiError, ApiResult};

/// A server-side filter parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Flag(bool),
}

impl FilterValue {
    pub fn as_param(&self) -> String {
        match self {
            FilterValue::Text(s) => s.clone(),
            FilterValue::Flag(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Sent to the server as query parameters.
    pub filters: BTreeMap<String, FilterValue>,
    /// Applied locally to the fetched page.
    pub search: String,
    pub sort_key: Option<String>,
    pub sort_direction: SortDirection,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            search: String::new(),
            sort_key: None,
            sort_direction: SortDirection::Asc,
            page: 1,
            page_size: 15,
        }
    }
}

impl ListQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, key: impl Into<String>) -> Self {
        self.sort_key = Some(key.into());
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: FilterValue) -> Self {
        self.filters.insert(key.into(), value);
        self
    }
}

/// One fetched page. Replaced wholesale on each successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
    pub page_size: u32,
}

impl<T> ListResult<T> {
    /// Page counts below 1 (an empty collection) are reported as 1.
    pub fn new(items: Vec<T>, total_pages: u32, page_size: u32) -> Self {
        Self {
            items,
            total_pages: total_pages.max(1),
            page_size: page_size.max(1),
        }
    }

    /// A whole collection delivered as a single page.
    pub fn single_page(items: Vec<T>) -> Self {
        let len = u32::try_from(items.len()).unwrap_or(u32::MAX);
        Self::new(items, 1, len)
    }
}

/// Comparable value of a sortable column.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum SortValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for SortValue {
    fn from(s: &str) -> Self {
        SortValue::Text(s.to_string())
    }
}

impl From<Option<&str>> for SortValue {
    fn from(s: Option<&str>) -> Self {
        SortValue::Text(s.unwrap_or_default().to_string())
    }
}

/// Rows that can be searched and sorted by a list view.
pub trait Listable {
    /// Fields matched by the free-text search.
    fn search_fields(&self) -> Vec<&str>;
    /// Value of column `key`; unknown keys compare equal.
    fn sort_value(&self, key: &str) -> Option<SortValue>;
}

/// Where a list view gets its pages from.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, query: &ListQuery) -> ApiResult<ListResult<T>>;
}

/// Case-insensitive substring match over the designated fields, keeping order.
pub fn filter_items<'a, T: Listable>(items: &'a [T], term: &str) -> Vec<&'a T> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| {
            item.search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Stable sort; equal keys keep their relative order in both directions.
pub fn sort_items<T: Listable>(items: &mut [&T], key: &str, direction: SortDirection) {
    items.sort_by(|a, b| {
        let ord = match (a.sort_value(key), b.sort_value(key)) {
            (Some(va), Some(vb)) => va.partial_cmp(&vb).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        };
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The response replaced the current result.
    Applied,
    /// A later request was issued while this one was in flight; dropped.
    Superseded,
    /// Out-of-range page; nothing was fetched.
    Rejected,
}

struct ViewState<T> {
    query: ListQuery,
    result: Option<ListResult<T>>,
    error: Option<ApiError>,
    /// Query of the last response that was applied.
    applied: Option<ListQuery>,
    in_flight: usize,
}

pub struct ListViewController<T, S> {
    source: S,
    state: Mutex<ViewState<T>>,
    issued: AtomicU64,
}

impl<T, S> ListViewController<T, S>
where
    T: Listable + Clone + Send,
    S: PageSource<T>,
{
    pub fn new(source: S, query: ListQuery) -> Self {
        Self {
            source,
            state: Mutex::new(ViewState {
                query,
                result: None,
                error: None,
                applied: None,
                in_flight: 0,
            }),
            issued: AtomicU64::new(0),
        }
    }

    /// Fetches for `query` and, unless a later request has been issued in
    /// the meantime, replaces the current result with the response.
    ///
    /// Pages outside `[1, total_pages]` of the current result are rejected
    /// without a fetch. Before the first result any page from 1 up is tried,
    /// and the response clamps it.
    pub async fn apply(&self, mut query: ListQuery) -> ApiResult<ApplyOutcome> {
        query.page_size = query.page_size.max(1);

        let seq = {
            let mut state = self.lock();
            let total = state.result.as_ref().map(|r| r.total_pages);
            if query.page == 0 || total.is_some_and(|t| query.page > t) {
                debug!("page {} out of range; ignored", query.page);
                return Ok(ApplyOutcome::Rejected);
            }
            state.query = query.clone();
            state.in_flight += 1;
            self.issued.fetch_add(1, AtomicOrdering::SeqCst) + 1
        };
        debug!("list request #{seq} for page {}", query.page);

        let fetched = self.source.fetch_page(&query).await;

        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if seq != self.issued.load(AtomicOrdering::SeqCst) {
            warn!("Discarding stale list response #{seq}");
            return Ok(ApplyOutcome::Superseded);
        }

        match fetched {
            Ok(result) => {
                if state.query.page > result.total_pages {
                    state.query.page = result.total_pages;
                }
                state.query.page_size = result.page_size;
                state.result = Some(result);
                state.error = None;
                state.applied = Some(state.query.clone());
                Ok(ApplyOutcome::Applied)
            }
            Err(e) => {
                // The rows on screen still belong to the last applied query.
                if let Some(applied) = state.applied.clone() {
                    state.query.page = applied.page;
                    state.query.filters = applied.filters;
                }
                state.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Re-fetches with the current query.
    pub async fn refresh(&self) -> ApiResult<ApplyOutcome> {
        let query = self.query();
        self.apply(query).await
    }

    /// Fetches page `page`, or does nothing if it is outside `[1, total_pages]`.
    pub async fn go_to_page(&self, page: u32) -> ApiResult<ApplyOutcome> {
        let query = ListQuery { page, ..self.query() };
        self.apply(query).await
    }

    pub async fn next_page(&self) -> ApiResult<ApplyOutcome> {
        let page = self.query().page.saturating_add(1);
        self.go_to_page(page).await
    }

    pub async fn previous_page(&self) -> ApiResult<ApplyOutcome> {
        let page = self.query().page.saturating_sub(1);
        self.go_to_page(page).await
    }

    /// Replaces the server-side filters and fetches from page 1.
    pub async fn apply_filters(
        &self,
        filters: BTreeMap<String, FilterValue>,
    ) -> ApiResult<ApplyOutcome> {
        let query = ListQuery {
            filters,
            page: 1,
            ..self.query()
        };
        self.apply(query).await
    }

    /// Changes the local search term. No fetch.
    pub fn set_search(&self, term: impl Into<String>) {
        self.lock().query.search = term.into();
    }

    /// Re-selecting the current key flips direction; a new key starts ascending.
    pub fn toggle_sort(&self, key: &str) {
        let mut state = self.lock();
        if state.query.sort_key.as_deref() == Some(key) {
            state.query.sort_direction = state.query.sort_direction.toggled();
        } else {
            state.query.sort_key = Some(key.to_string());
            state.query.sort_direction = SortDirection::Asc;
        }
    }

    /// Current page after search and sort.
    pub fn visible(&self) -> Vec<T> {
        let state = self.lock();
        let Some(result) = &state.result else {
            return Vec::new();
        };
        let mut rows = filter_items(&result.items, &state.query.search);
        if let Some(key) = &state.query.sort_key {
            sort_items(&mut rows, key, state.query.sort_direction);
        }
        rows.into_iter().cloned().collect()
    }

    /// All rows of the current page, unfiltered.
    pub fn items(&self) -> Vec<T> {
        self.lock()
            .result
            .as_ref()
            .map(|r| r.items.clone())
            .unwrap_or_default()
    }

    pub fn pagination(&self) -> Pagination {
        let state = self.lock();
        let page = state.query.page;
        let total_pages = state.result.as_ref().map_or(1, |r| r.total_pages);
        Pagination {
            page,
            total_pages,
            has_previous: page > 1,
            has_next: page < total_pages,
        }
    }

    pub fn query(&self) -> ListQuery {
        self.lock().query.clone()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.lock().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }

    fn lock(&self) -> MutexGuard<'_, ViewState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        name: String,
        k: i64,
    }

    impl Listable for Row {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.name.as_str()]
        }

        fn sort_value(&self, key: &str) -> Option<SortValue> {
            match key {
                "k" => Some(SortValue::Int(self.k)),
                "name" => Some(self.name.as_str().into()),
                _ => None,
            }
        }
    }

    fn row(id: &str, name: &str, k: i64) -> Row {
        Row {
            id: id.to_string(),
            name: name.to_string(),
            k,
        }
    }

    fn ids(rows: &[&Row]) -> Vec<String> {
        rows.iter().map(|r| r.id.clone()).collect()
    }

    /// Serves `total_pages` pages; page `p` takes `delays[p - 1]` to answer.
    #[derive(Clone)]
    struct FakeSource {
        total_pages: u32,
        delays: Vec<u64>,
        calls: Arc<AtomicUsize>,
        fail_on: Option<u32>,
    }

    impl FakeSource {
        fn pages(total_pages: u32) -> Self {
            Self {
                total_pages,
                delays: vec![0; total_pages as usize],
                calls: Arc::new(AtomicUsize::new(0)),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl PageSource<Row> for FakeSource {
        async fn fetch_page(&self, query: &ListQuery) -> ApiResult<ListResult<Row>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            let delay = self
                .delays
                .get(query.page as usize - 1)
                .copied()
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if self.fail_on == Some(query.page) {
                return Err(ApiError::server("down"));
            }
            let name = format!("page-{}", query.page);
            Ok(ListResult::new(vec![row(&name, &name, 0)], self.total_pages, 15))
        }
    }

    #[test]
    fn test_filter_is_case_insensitive_substring_in_order() {
        let rows = vec![row("1", "Anna", 0), row("2", "Bob", 0), row("3", "Annie", 0)];
        let names: Vec<_> = filter_items(&rows, "ann").iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Anna", "Annie"]);
    }

    #[test]
    fn test_empty_search_keeps_everything() {
        let rows = vec![row("1", "Anna", 0), row("2", "Bob", 0)];
        assert_eq!(filter_items(&rows, "  ").len(), 2);
    }

    #[test]
    fn test_sort_is_stable() {
        let rows = vec![row("a", "x", 1), row("b", "y", 1)];
        let mut refs: Vec<&Row> = rows.iter().collect();
        sort_items(&mut refs, "k", SortDirection::Asc);
        assert_eq!(ids(&refs), vec!["a", "b"]);
        sort_items(&mut refs, "k", SortDirection::Desc);
        assert_eq!(ids(&refs), vec!["a", "b"]);
    }

    #[test]
    fn test_sort_directions() {
        let rows = vec![row("a", "m", 2), row("b", "n", 3), row("c", "o", 1)];
        let mut refs: Vec<&Row> = rows.iter().collect();
        sort_items(&mut refs, "k", SortDirection::Desc);
        assert_eq!(ids(&refs), vec!["b", "a", "c"]);
        sort_items(&mut refs, "k", SortDirection::Asc);
        assert_eq!(ids(&refs), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_list_result_floors_counts() {
        let r: ListResult<Row> = ListResult::new(vec![], 0, 0);
        assert_eq!((r.total_pages, r.page_size), (1, 1));
    }

    #[tokio::test]
    async fn test_toggle_sort_cycles_and_resets() {
        let ctrl = ListViewController::new(FakeSource::pages(1), ListQuery::default());
        ctrl.toggle_sort("name");
        assert_eq!(ctrl.query().sort_direction, SortDirection::Asc);
        ctrl.toggle_sort("name");
        assert_eq!(ctrl.query().sort_direction, SortDirection::Desc);
        ctrl.toggle_sort("k");
        assert_eq!(ctrl.query().sort_key.as_deref(), Some("k"));
        assert_eq!(ctrl.query().sort_direction, SortDirection::Asc);
    }

    #[tokio::test]
    async fn test_toggling_twice_restores_order() {
        struct Fixed;
        #[async_trait]
        impl PageSource<Row> for Fixed {
            async fn fetch_page(&self, _: &ListQuery) -> ApiResult<ListResult<Row>> {
                Ok(ListResult::single_page(vec![
                    row("a", "Carol", 2),
                    row("b", "alice", 1),
                    row("c", "Bob", 2),
                ]))
            }
        }
        let ctrl = ListViewController::new(Fixed, ListQuery::default());
        ctrl.apply(ListQuery::page(1)).await.unwrap();

        ctrl.toggle_sort("k");
        let asc: Vec<_> = ctrl.visible().into_iter().map(|r| r.id).collect();
        assert_eq!(asc, vec!["b", "a", "c"]);
        ctrl.toggle_sort("k");
        ctrl.toggle_sort("k");
        let again: Vec<_> = ctrl.visible().into_iter().map(|r| r.id).collect();
        assert_eq!(asc, again);

        ctrl.set_search("o");
        let searched: Vec<_> = ctrl.visible().into_iter().map(|r| r.id).collect();
        assert_eq!(searched, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_out_of_range_pages_issue_no_fetch() {
        let source = FakeSource::pages(3);
        let calls = source.calls.clone();
        let ctrl = ListViewController::new(source, ListQuery::default());
        ctrl.apply(ListQuery::page(1)).await.unwrap();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

        assert_eq!(ctrl.go_to_page(0).await.unwrap(), ApplyOutcome::Rejected);
        assert_eq!(ctrl.go_to_page(4).await.unwrap(), ApplyOutcome::Rejected);
        assert_eq!(ctrl.previous_page().await.unwrap(), ApplyOutcome::Rejected);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

        assert_eq!(ctrl.go_to_page(3).await.unwrap(), ApplyOutcome::Applied);
        assert_eq!(ctrl.next_page().await.unwrap(), ApplyOutcome::Rejected);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_apply_rejects_page_past_known_total() {
        let source = FakeSource::pages(3);
        let calls = source.calls.clone();
        let ctrl = ListViewController::new(source, ListQuery::default());
        assert_eq!(ctrl.apply(ListQuery::page(1)).await.unwrap(), ApplyOutcome::Applied);

        assert_eq!(ctrl.apply(ListQuery::page(9)).await.unwrap(), ApplyOutcome::Rejected);
        assert_eq!(ctrl.apply(ListQuery::page(0)).await.unwrap(), ApplyOutcome::Rejected);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(ctrl.query().page, 1);
        assert_eq!(ctrl.pagination().total_pages, 3);
    }

    #[tokio::test]
    async fn test_pagination_flags() {
        let ctrl = ListViewController::new(FakeSource::pages(5), ListQuery::default());
        ctrl.apply(ListQuery::page(2)).await.unwrap();
        let p = ctrl.pagination();
        assert_eq!((p.page, p.total_pages), (2, 5));
        assert!(p.has_previous && p.has_next);

        ctrl.go_to_page(5).await.unwrap();
        let p = ctrl.pagination();
        assert!(p.has_previous);
        assert!(!p.has_next);
    }

    #[tokio::test]
    async fn test_page_clamped_when_total_shrinks() {
        let ctrl = ListViewController::new(FakeSource::pages(2), ListQuery::default());
        // Nothing is known yet, so page 7 is requested and the server answers
        // with a smaller page count.
        ctrl.apply(ListQuery::page(7)).await.unwrap();
        assert_eq!(ctrl.query().page, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_request_wins_out_of_order() {
        let mut source = FakeSource::pages(2);
        source.delays = vec![200, 10];
        let ctrl = ListViewController::new(source, ListQuery::default());

        let (first, second) =
            tokio::join!(ctrl.apply(ListQuery::page(1)), ctrl.apply(ListQuery::page(2)));
        assert_eq!(first.unwrap(), ApplyOutcome::Superseded);
        assert_eq!(second.unwrap(), ApplyOutcome::Applied);

        assert_eq!(ctrl.items()[0].name, "page-2");
        assert_eq!(ctrl.query().page, 2);
        assert!(!ctrl.is_loading());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_result() {
        let mut source = FakeSource::pages(3);
        source.fail_on = Some(2);
        let ctrl = ListViewController::new(source, ListQuery::default());
        ctrl.apply(ListQuery::page(1)).await.unwrap();

        let err = ctrl.next_page().await.unwrap_err();
        assert_eq!(err.message, "down");
        assert_eq!(ctrl.error(), Some(err));
        assert_eq!(ctrl.items()[0].name, "page-1");
        assert_eq!(ctrl.query().page, 1);

        ctrl.go_to_page(3).await.unwrap();
        assert!(ctrl.error().is_none());
        assert_eq!(ctrl.items()[0].name, "page-3");
    }
}
