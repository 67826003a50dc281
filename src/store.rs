//! Per-resource list state and mutation orchestration.
//!
//! A [`ResourceStore`] owns the list view of one resource: the current page
//! of items, the total count, the page number, the search term and the
//! active field filters. Every
//! successful create/update/delete is followed by a fresh list fetch, so the
//! state always reflects what the server returned last; nothing is patched
//! locally.
//!
//! Fetches are ticketed. When several fetches overlap (a page change racing a
//! search change, say) only the most recently issued one is applied; older
//! completions are dropped. After [`ResourceStore::close`] completions are
//! dropped as well.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::{ApiError, StoreError};
use crate::schema::{matches_filter, ResourceConfig};
use crate::types::{total_pages, EntityId, ListQuery, Record};

/// Snapshot of a store, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    pub items: Vec<Record>,
    pub count: u64,
    pub page: u64,
    pub total_pages: u64,
    pub search: String,
    /// Active filters as `(field, value)`, in declared filter order.
    pub filters: Vec<(String, String)>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ListState {
    /// Loaded items that satisfy every active filter.
    ///
    /// The filters are also sent with the list request; this keeps the view
    /// consistent when the backend ignores them.
    pub fn visible_items(&self) -> impl Iterator<Item = &Record> + '_ {
        self.items.iter().filter(|item| {
            self.filters
                .iter()
                .all(|(field, value)| matches_filter(item, field, value))
        })
    }
}

#[derive(Debug)]
struct Inner {
    config: ResourceConfig,
    items: Vec<Record>,
    count: u64,
    page: u64,
    search: String,
    filters: BTreeMap<String, String>,
    loading: bool,
    error: Option<String>,
    issued: u64,
    closed: bool,
}

impl Inner {
    fn query(&self) -> ListQuery {
        let search = self.config.searchable.then_some(self.search.as_str());
        ListQuery::page(self.page)
            .search(search)
            .filters(self.active_filters())
    }

    fn check_filter(&self, field: &str) -> Result<(), StoreError> {
        if self.config.filters.iter().any(|f| f == field) {
            Ok(())
        } else {
            Err(StoreError::UnknownFilter {
                resource: self.config.key.clone(),
                field: field.to_string(),
            })
        }
    }

    fn active_filters(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.config.filters.iter().filter_map(|field| {
            self.filters
                .get(field)
                .map(|value| (field.as_str(), value.as_str()))
        })
    }
}

/// List state for one resource.
#[derive(Debug)]
pub struct ResourceStore<B> {
    backend: B,
    inner: Mutex<Inner>,
}

impl<B: Backend> ResourceStore<B> {
    /// Create a store on page 1 with an empty search. Nothing is fetched
    /// until [`ResourceStore::refresh`] is called.
    pub fn new(backend: B, config: ResourceConfig) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner {
                config,
                items: Vec::new(),
                count: 0,
                page: 1,
                search: String::new(),
                filters: BTreeMap::new(),
                loading: false,
                error: None,
                issued: 0,
                closed: false,
            }),
        }
    }

    /// Create a store and run the initial fetch.
    pub fn open(backend: B, config: ResourceConfig) -> Result<Self, StoreError> {
        let store = Self::new(backend, config);
        store.refresh()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> ResourceConfig {
        self.lock().config.clone()
    }

    pub fn snapshot(&self) -> ListState {
        let inner = self.lock();
        ListState {
            items: inner.items.clone(),
            count: inner.count,
            page: inner.page,
            total_pages: total_pages(inner.count),
            search: inner.search.clone(),
            filters: inner
                .active_filters()
                .map(|(f, v)| (f.to_string(), v.to_string()))
                .collect(),
            loading: inner.loading,
            error: inner.error.clone(),
        }
    }

    /// Current item with the given id, if it is on the loaded page.
    pub fn find_item(&self, id: &EntityId) -> Option<Record> {
        self.lock()
            .items
            .iter()
            .find(|item| EntityId::of(item).as_ref() == Some(id))
            .cloned()
    }

    /// Re-run the list fetch for the current page and search.
    ///
    /// On failure the error message is recorded and returned; items and
    /// count keep their last good values.
    pub fn refresh(&self) -> Result<(), StoreError> {
        let (ticket, endpoint, query) = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(StoreError::Closed {
                    resource: inner.config.key.clone(),
                });
            }
            inner.issued += 1;
            inner.loading = true;
            inner.error = None;
            (inner.issued, inner.config.endpoint.clone(), inner.query())
        };

        debug!(endpoint = %endpoint, ticket, page = ?query.page, "list fetch");
        let result = self.backend.list(&endpoint, &query);

        let mut inner = self.lock();
        if inner.closed || ticket != inner.issued {
            debug!(endpoint = %endpoint, ticket, latest = inner.issued, "discarding superseded list response");
            return result.map(|_| ()).map_err(StoreError::from);
        }

        inner.loading = false;
        match result {
            Ok(listing) => {
                inner.items = listing.results;
                inner.count = listing.count;
                Ok(())
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "list fetch failed");
                inner.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Move to `page`, clamped to the known page range, and refetch.
    pub fn set_page(&self, page: u64) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            inner.page = page.clamp(1, total_pages(inner.count));
        }
        self.refresh()
    }

    /// Change the search term; resets to page 1 and refetches.
    pub fn set_search(&self, term: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            inner.search = term.trim().to_string();
            inner.page = 1;
        }
        self.refresh()
    }

    /// Set the filter on `field`; an empty value removes it. Resets to page
    /// 1 and refetches.
    ///
    /// # Errors
    ///
    /// `StoreError::UnknownFilter` when `field` is not a declared filter.
    pub fn set_filter(&self, field: &str, value: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            inner.check_filter(field)?;
            let value = value.trim();
            if value.is_empty() {
                inner.filters.remove(field);
            } else {
                inner.filters.insert(field.to_string(), value.to_string());
            }
            inner.page = 1;
        }
        self.refresh()
    }

    /// Replace every filter at once (one fetch); empty values are skipped.
    ///
    /// Nothing changes when any field is not a declared filter.
    pub fn set_filters<'a>(
        &self,
        filters: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            let mut next = BTreeMap::new();
            for (field, value) in filters {
                inner.check_filter(field)?;
                let value = value.trim();
                if !value.is_empty() {
                    next.insert(field.to_string(), value.to_string());
                }
            }
            inner.filters = next;
            inner.page = 1;
        }
        self.refresh()
    }

    /// Drop every filter; resets to page 1 and refetches.
    pub fn clear_filters(&self) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            inner.filters.clear();
            inner.page = 1;
        }
        self.refresh()
    }

    /// Point the store at another resource; resets paging, search, filters
    /// and items.
    pub fn switch_resource(&self, config: ResourceConfig) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            inner.config = config;
            inner.page = 1;
            inner.search.clear();
            inner.filters.clear();
            inner.items.clear();
            inner.count = 0;
        }
        self.refresh()
    }

    /// `POST` the payload, then refetch.
    pub fn create_item(&self, payload: &Record) -> Result<Record, StoreError> {
        let config = self.allowed("create", |c| c.allow_create)?;
        let created = self.backend.create(&config.endpoint, payload)?;
        info!(resource = %config.key, id = ?created.get("id"), "created");
        self.refresh_after_mutation();
        Ok(created)
    }

    /// `PATCH` the payload, then refetch.
    pub fn update_item(&self, id: &EntityId, payload: &Record) -> Result<Record, StoreError> {
        let config = self.allowed("update", |c| c.allow_edit)?;
        if let Some(item) = self.find_item(id) {
            if config.is_locked(&item) {
                return Err(StoreError::Locked { id: id.to_string() });
            }
        }
        let updated = self.backend.update(&config.endpoint, id, payload)?;
        info!(resource = %config.key, %id, "updated");
        self.refresh_after_mutation();
        Ok(updated)
    }

    /// `DELETE` the item, then refetch.
    pub fn delete_item(&self, id: &EntityId) -> Result<(), StoreError> {
        let config = self.allowed("delete", |c| c.allow_delete)?;
        self.backend.delete(&config.endpoint, id)?;
        info!(resource = %config.key, %id, "deleted");
        self.refresh_after_mutation();
        Ok(())
    }

    /// Run a declared per-record action, then refetch.
    pub fn run_action(&self, id: &EntityId, action: &str) -> Result<Option<Value>, StoreError> {
        let config = self.allowed("action", |_| true)?;
        let declared = config
            .find_action(action)
            .ok_or_else(|| StoreError::UnknownAction {
                resource: config.key.clone(),
                action: action.to_string(),
            })?;
        if let Some(item) = self.find_item(id) {
            if !declared.is_enabled(&item) {
                return Err(StoreError::ActionUnavailable {
                    action: action.to_string(),
                    id: id.to_string(),
                });
            }
        }
        let result = self.backend.action(&config.endpoint, id, action)?;
        info!(resource = %config.key, %id, action, "action completed");
        self.refresh_after_mutation();
        Ok(result)
    }

    /// Stop applying fetch results; later operations fail with `Closed`.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn allowed(
        &self,
        operation: &'static str,
        check: impl Fn(&ResourceConfig) -> bool,
    ) -> Result<ResourceConfig, StoreError> {
        let inner = self.lock();
        if inner.closed {
            return Err(StoreError::Closed {
                resource: inner.config.key.clone(),
            });
        }
        if !check(&inner.config) {
            return Err(StoreError::NotAllowed {
                resource: inner.config.key.clone(),
                operation,
            });
        }
        Ok(inner.config.clone())
    }

    // The mutation already succeeded; a failed refetch is visible through
    // `snapshot().error`.
    fn refresh_after_mutation(&self) {
        match self.refresh() {
            Ok(()) | Err(StoreError::Closed { .. }) => {}
            Err(StoreError::Api(ApiError::Unauthorized { .. })) => {
                warn!("refresh after mutation rejected: session expired");
            }
            Err(e) => debug!(error = %e, "refresh after mutation failed"),
        }
    }
}
