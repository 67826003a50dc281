//! In-memory backend shared by the store and option tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

use cejamsys_console::{
    normalize_endpoint, ApiError, Backend, EntityId, ListPage, ListQuery, Record, PAGE_SIZE,
};
use serde_json::{json, Value};

struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
}

#[derive(Default)]
struct Collections {
    records: HashMap<String, Vec<Record>>,
    next_id: i64,
    actions: Vec<(String, EntityId, String)>,
}

/// Collections keyed by normalized endpoint, with call counters and
/// injectable failures.
#[derive(Default)]
pub struct FakeBackend {
    data: Mutex<Collections>,
    gates: Mutex<HashMap<String, Gate>>,
    list_calls: AtomicUsize,
    fail_lists: AtomicBool,
    fail_mutations: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("record must be a JSON object")
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records under `endpoint`, assigning ids to those without one.
    pub fn seed(&self, endpoint: &str, items: Vec<Value>) {
        let mut data = self.data.lock().unwrap();
        for item in items {
            let mut item = record(item);
            if !item.contains_key("id") {
                data.next_id += 1;
                item.insert("id".into(), json!(data.next_id));
            }
            data.records
                .entry(normalize_endpoint(endpoint))
                .or_default()
                .push(item);
        }
    }

    pub fn records(&self, endpoint: &str) -> Vec<Record> {
        let data = self.data.lock().unwrap();
        data.records
            .get(&normalize_endpoint(endpoint))
            .cloned()
            .unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<(String, EntityId, String)> {
        self.data.lock().unwrap().actions.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    /// Block the next list request searching for `term` until the returned
    /// sender fires. The receiver gets a message once the request is waiting.
    pub fn hold_search(&self, term: &str) -> (Sender<()>, Receiver<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        self.gates.lock().unwrap().insert(
            term.to_string(),
            Gate {
                entered: entered_tx,
                release: release_rx,
            },
        );
        (release_tx, entered_rx)
    }

    fn mutation_guard(&self) -> Result<(), ApiError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ApiError::Http {
                status: 400,
                message: "Dados invalidos.".into(),
            });
        }
        Ok(())
    }

    fn not_found() -> ApiError {
        ApiError::Http {
            status: 404,
            message: "Nao encontrado.".into(),
        }
    }
}

fn matches_search(item: &Record, term: &str) -> bool {
    let term = term.to_lowercase();
    item.values().any(|value| match value {
        Value::String(s) => s.to_lowercase().contains(&term),
        _ => false,
    })
}

impl Backend for FakeBackend {
    fn list(&self, endpoint: &str, query: &ListQuery) -> Result<ListPage, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(term) = &query.search {
            let gate = self.gates.lock().unwrap().remove(term);
            if let Some(gate) = gate {
                let _ = gate.entered.send(());
                let _ = gate.release.recv();
            }
        }
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(ApiError::Http {
                status: 500,
                message: "Erro interno.".into(),
            });
        }

        let data = self.data.lock().unwrap();
        let all: Vec<Record> = data
            .records
            .get(&normalize_endpoint(endpoint))
            .map(|items| {
                items
                    .iter()
                    .filter(|item| query.search.as_deref().map_or(true, |t| matches_search(item, t)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let size = query.page_size.unwrap_or(PAGE_SIZE) as usize;
        let page = query.page.unwrap_or(1).max(1) as usize;
        let start = (page - 1) * size;
        let results: Vec<Record> = all.iter().skip(start).take(size).cloned().collect();
        let next = (start + results.len() < all.len()).then(|| format!("?page={}", page + 1));
        Ok(ListPage {
            count: all.len() as u64,
            next,
            previous: None,
            results,
        })
    }

    fn create(&self, endpoint: &str, payload: &Record) -> Result<Record, ApiError> {
        self.mutation_guard()?;
        let mut data = self.data.lock().unwrap();
        data.next_id += 1;
        let mut item = payload.clone();
        item.insert("id".into(), json!(data.next_id));
        data.records
            .entry(normalize_endpoint(endpoint))
            .or_default()
            .push(item.clone());
        Ok(item)
    }

    fn update(&self, endpoint: &str, id: &EntityId, payload: &Record) -> Result<Record, ApiError> {
        self.mutation_guard()?;
        let mut data = self.data.lock().unwrap();
        let items = data
            .records
            .get_mut(&normalize_endpoint(endpoint))
            .ok_or_else(Self::not_found)?;
        let item = items
            .iter_mut()
            .find(|item| EntityId::of(item).as_ref() == Some(id))
            .ok_or_else(Self::not_found)?;
        for (key, value) in payload {
            item.insert(key.clone(), value.clone());
        }
        Ok(item.clone())
    }

    fn delete(&self, endpoint: &str, id: &EntityId) -> Result<(), ApiError> {
        self.mutation_guard()?;
        let mut data = self.data.lock().unwrap();
        let items = data
            .records
            .get_mut(&normalize_endpoint(endpoint))
            .ok_or_else(Self::not_found)?;
        let before = items.len();
        items.retain(|item| EntityId::of(item).as_ref() != Some(id));
        if items.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }

    fn action(&self, endpoint: &str, id: &EntityId, action: &str) -> Result<Option<Value>, ApiError> {
        self.mutation_guard()?;
        let mut data = self.data.lock().unwrap();
        data.actions
            .push((normalize_endpoint(endpoint), id.clone(), action.to_string()));
        Ok(Some(json!({ "status": "ok", "action": action })))
    }
}
