//! Option resolution for selects backed by another resource.
//!
//! [`OptionCache`] is shared by every resolver that should see the same
//! label/value lists. The first request for a reference signature fetches the
//! full listing; concurrent requests for that signature wait for the same
//! fetch and observe the same result. A populated entry stays until
//! [`OptionCache::invalidate`] or [`OptionCache::reset`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::ApiError;
use crate::schema::{FieldKind, OptionSource, ResourceField, ResourceRef};
use crate::types::{ListQuery, OptionValue, Record, SelectOption};

/// Page size requested while walking a listing for options.
pub const OPTIONS_PAGE_SIZE: u64 = 500;

/// Upper bound on pages walked for a single reference.
const MAX_PAGES: u64 = 200;

type Options = Arc<Vec<SelectOption>>;

struct Flight {
    outcome: Mutex<Option<Result<Options, String>>>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<Options, String> {
        let mut outcome = lock(&self.outcome);
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            outcome = self
                .done
                .wait(outcome)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn finish(&self, result: Result<Options, String>) {
        *lock(&self.outcome) = Some(result);
        self.done.notify_all();
    }
}

enum Slot {
    Loading(Arc<Flight>),
    Ready(Options),
}

/// Message given to waiters when the fetching caller unwinds.
const ABORTED: &str = "option fetch aborted";

/// Settles one flight exactly once. Dropped unsettled (the fetch panicked),
/// it releases the slot and fails the waiters with [`ABORTED`].
struct Landing<'c> {
    slots: &'c Mutex<HashMap<String, Slot>>,
    signature: &'c str,
    flight: Arc<Flight>,
    settled: bool,
}

impl Landing<'_> {
    fn settle(mut self, outcome: Result<Options, String>) -> Result<Options, String> {
        self.apply(&outcome);
        self.settled = true;
        outcome
    }

    fn apply(&self, outcome: &Result<Options, String>) {
        {
            let mut slots = lock(self.slots);
            // Invalidated mid-flight: leave the slot alone.
            let still_ours = matches!(
                slots.get(self.signature),
                Some(Slot::Loading(current)) if Arc::ptr_eq(current, &self.flight)
            );
            if still_ours {
                match outcome {
                    Ok(options) => {
                        slots.insert(self.signature.to_string(), Slot::Ready(options.clone()));
                    }
                    Err(_) => {
                        slots.remove(self.signature);
                    }
                }
            }
        }
        self.flight.finish(outcome.clone());
    }
}

impl Drop for Landing<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(signature = self.signature, "option fetch aborted");
            self.apply(&Err(ABORTED.to_string()));
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide option lists keyed by [`ResourceRef::signature`].
#[derive(Clone, Default)]
pub struct OptionCache {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl std::fmt::Debug for OptionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionCache")
            .field("entries", &lock(&self.slots).len())
            .finish()
    }
}

/// Cache lookup without fetching.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Missing,
    Loading,
    Ready(Vec<SelectOption>),
}

impl OptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached options for `signature`, running `fetch` at most once across
    /// concurrent callers. Failed fetches are not cached; a panicking fetch
    /// fails its waiters and leaves the signature uncached.
    pub fn get_or_fetch<F>(&self, signature: &str, fetch: F) -> Result<Options, String>
    where
        F: FnOnce() -> Result<Vec<SelectOption>, ApiError>,
    {
        let flight = {
            let mut slots = lock(&self.slots);
            match slots.get(signature) {
                Some(Slot::Ready(options)) => return Ok(options.clone()),
                Some(Slot::Loading(flight)) => {
                    let flight = flight.clone();
                    drop(slots);
                    debug!(signature, "waiting for in-flight option fetch");
                    return flight.wait();
                }
                None => {
                    let flight = Arc::new(Flight::new());
                    slots.insert(signature.to_string(), Slot::Loading(flight.clone()));
                    flight
                }
            }
        };

        let landing = Landing {
            slots: &self.slots,
            signature,
            flight,
            settled: false,
        };
        let outcome = fetch().map(Arc::new).map_err(|e| e.to_string());
        landing.settle(outcome)
    }

    pub fn peek(&self, signature: &str) -> CacheEntry {
        match lock(&self.slots).get(signature) {
            None => CacheEntry::Missing,
            Some(Slot::Loading(_)) => CacheEntry::Loading,
            Some(Slot::Ready(options)) => CacheEntry::Ready(options.as_ref().clone()),
        }
    }

    /// Drop one entry; the next request fetches again.
    pub fn invalidate(&self, signature: &str) {
        lock(&self.slots).remove(signature);
    }

    /// Drop every entry.
    pub fn reset(&self) {
        lock(&self.slots).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Options as seen by a select widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsState {
    pub options: Vec<SelectOption>,
    pub loading: bool,
    pub error: Option<String>,
}

impl OptionsState {
    fn ready(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            loading: false,
            error: None,
        }
    }

    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    fn failed(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::default()
        }
    }
}

/// Turns resource references into option lists through a shared cache.
#[derive(Debug, Clone)]
pub struct OptionResolver<B> {
    backend: B,
    cache: OptionCache,
}

impl<B: Backend> OptionResolver<B> {
    pub fn new(backend: B, cache: OptionCache) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &OptionCache {
        &self.cache
    }

    /// Options for `reference`, fetching on first use.
    pub fn resolve(&self, reference: &ResourceRef) -> OptionsState {
        let signature = reference.signature();
        match self
            .cache
            .get_or_fetch(&signature, || self.fetch(reference))
        {
            Ok(options) => OptionsState::ready(options.as_ref().clone()),
            Err(message) => {
                warn!(signature = %signature, error = %message, "option fetch failed");
                OptionsState::failed(message)
            }
        }
    }

    /// Current cache state for `reference` without fetching.
    pub fn peek(&self, reference: &ResourceRef) -> OptionsState {
        match self.cache.peek(&reference.signature()) {
            CacheEntry::Missing => OptionsState::default(),
            CacheEntry::Loading => OptionsState::loading(),
            CacheEntry::Ready(options) => OptionsState::ready(options),
        }
    }

    /// Options for any field: static lists as declared, resource-backed
    /// selects through the cache, nothing for other kinds.
    pub fn resolve_field(&self, field: &ResourceField) -> OptionsState {
        match &field.kind {
            FieldKind::Select(spec) => match &spec.source {
                OptionSource::Static(options) => OptionsState::ready(options.clone()),
                OptionSource::Resource(reference) => self.resolve(reference),
            },
            _ => OptionsState::default(),
        }
    }

    fn fetch(&self, reference: &ResourceRef) -> Result<Vec<SelectOption>, ApiError> {
        let mut items: Vec<Record> = Vec::new();
        let mut page = 1;
        loop {
            let query = ListQuery::page(page).page_size(OPTIONS_PAGE_SIZE);
            let listing = self.backend.list(&reference.endpoint, &query)?;
            let received = listing.results.len();
            items.extend(listing.results);

            // A missing `count` deserializes as 0 and says nothing.
            let exhausted = listing.next.is_none()
                || received == 0
                || (listing.count > 0 && items.len() as u64 >= listing.count)
                || page >= MAX_PAGES;
            if exhausted {
                break;
            }
            page += 1;
        }
        debug!(endpoint = %reference.endpoint, items = items.len(), pages = page, "fetched options");
        Ok(map_options(&items, reference))
    }
}

/// Maps listing items to sorted options, dropping empty labels.
pub fn map_options(items: &[Record], reference: &ResourceRef) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = items
        .iter()
        .filter_map(|item| {
            let raw_value = item.get(&reference.value_key).unwrap_or(&Value::Null);
            let value = OptionValue::from_json(raw_value)?;
            let label = [item.get(&reference.label_key), Some(raw_value)]
                .into_iter()
                .flatten()
                .find(|v| !v.is_null())
                .map(label_text)
                .unwrap_or_default();
            if label.is_empty() {
                return None;
            }
            Some(SelectOption { value, label })
        })
        .collect();
    options.sort_by(|a, b| compare_labels(&a.label, &b.label));
    options
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Accent- and case-insensitive ordering, ties broken by the raw text.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    fold(a)
        .cmp(&fold(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn map_options_sorts_and_drops_empty_labels() {
        let items = records(json!([
            {"id": 3, "nome": "Turma B"},
            {"id": 1, "nome": "Turma A"},
            {"id": 2, "nome": ""},
        ]));
        let options = map_options(&items, &ResourceRef::new("/turmas", "nome"));
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Turma A", "Turma B"]);
        assert_eq!(options[0].value, OptionValue::from_json(&json!(1)).unwrap());
    }

    #[test]
    fn map_options_falls_back_to_value() {
        let items = records(json!([{"id": 9}]));
        let options = map_options(&items, &ResourceRef::new("/contratos", "numero"));
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].label, "9");
    }

    #[test]
    fn labels_sort_ignoring_accents() {
        let mut labels = vec!["Otavio", "Álvaro", "Beatriz", "alice"];
        labels.sort_by(|a, b| compare_labels(a, b));
        assert_eq!(labels, vec!["alice", "Álvaro", "Beatriz", "Otavio"]);
    }

    #[test]
    fn cache_serves_second_call_without_fetching() {
        let cache = OptionCache::new();
        let first = cache
            .get_or_fetch("/turmas|nome|id", || Ok(vec![SelectOption::new("1", "A")]))
            .unwrap();
        let second = cache
            .get_or_fetch("/turmas|nome|id", || panic!("must not fetch again"))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn failed_fetch_is_not_cached() {
        let cache = OptionCache::new();
        let result = cache.get_or_fetch("/turmas|nome|id", || Err(ApiError::NotLoggedIn));
        assert!(result.is_err());
        assert_eq!(cache.peek("/turmas|nome|id"), CacheEntry::Missing);
    }

    #[test]
    fn invalidate_forces_refetch() {
        let cache = OptionCache::new();
        cache
            .get_or_fetch("k", || Ok(vec![SelectOption::new("1", "A")]))
            .unwrap();
        cache.invalidate("k");
        let refreshed = cache
            .get_or_fetch("k", || Ok(vec![SelectOption::new("2", "B")]))
            .unwrap();
        assert_eq!(refreshed[0].label, "B");
    }

    #[test]
    fn panicking_fetch_releases_the_slot() {
        let cache = OptionCache::new();
        let worker = cache.clone();
        let joined = std::thread::spawn(move || {
            worker.get_or_fetch("/turmas|nome|id", || panic!("backend exploded"))
        })
        .join();
        assert!(joined.is_err());
        assert_eq!(cache.peek("/turmas|nome|id"), CacheEntry::Missing);

        let options = cache
            .get_or_fetch("/turmas|nome|id", || Ok(vec![SelectOption::new("1", "A")]))
            .unwrap();
        assert_eq!(options[0].label, "A");
    }

    #[test]
    fn waiters_are_released_when_the_fetch_panics() {
        use std::sync::mpsc;
        use std::time::Duration;

        let cache = OptionCache::new();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let fetcher = {
            let cache = cache.clone();
            std::thread::spawn(move || {
                cache.get_or_fetch("k", move || {
                    let _ = started_tx.send(());
                    let _ = release_rx.recv();
                    panic!("backend exploded")
                })
            })
        };
        started_rx.recv().unwrap();
        assert_eq!(cache.peek("k"), CacheEntry::Loading);

        let (done_tx, done_rx) = mpsc::channel();
        let waiter = {
            let cache = cache.clone();
            std::thread::spawn(move || {
                let result = cache.get_or_fetch("k", || Ok(vec![SelectOption::new("2", "B")]));
                let _ = done_tx.send(result);
            })
        };
        std::thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        assert!(fetcher.join().is_err());
        let result = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
        match result {
            Err(message) => assert_eq!(message, ABORTED),
            // The waiter arrived after the slot was released.
            Ok(options) => assert_eq!(options[0].label, "B"),
        }
    }

    #[test]
    fn walk_continues_when_count_is_missing() {
        struct Paged;

        impl Backend for Paged {
            fn list(&self, _: &str, query: &ListQuery) -> Result<crate::types::ListPage, ApiError> {
                let page = query.page.unwrap_or(1);
                let results = vec![json!({"id": page, "nome": format!("Turma {}", page)})
                    .as_object()
                    .unwrap()
                    .clone()];
                Ok(crate::types::ListPage {
                    count: 0,
                    next: (page < 3).then(|| format!("/turmas/?page={}", page + 1)),
                    previous: None,
                    results,
                })
            }

            fn create(&self, _: &str, _: &Record) -> Result<Record, ApiError> {
                unreachable!()
            }

            fn update(
                &self,
                _: &str,
                _: &crate::types::EntityId,
                _: &Record,
            ) -> Result<Record, ApiError> {
                unreachable!()
            }

            fn delete(&self, _: &str, _: &crate::types::EntityId) -> Result<(), ApiError> {
                unreachable!()
            }

            fn action(
                &self,
                _: &str,
                _: &crate::types::EntityId,
                _: &str,
            ) -> Result<Option<Value>, ApiError> {
                unreachable!()
            }
        }

        let resolver = OptionResolver::new(Paged, OptionCache::new());
        let state = resolver.resolve(&ResourceRef::new("/turmas", "nome"));
        assert!(state.error.is_none());
        assert_eq!(state.options.len(), 3);
    }
}
