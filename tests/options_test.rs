//! Option resolution through the shared cache.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cejamsys_console::{
    CacheEntry, OptionCache, OptionResolver, OptionValue, ResourceField, ResourceRef,
};
use common::FakeBackend;
use serde_json::json;

fn turmas_ref() -> ResourceRef {
    ResourceRef::new("/turmas", "nome")
}

fn seeded() -> Arc<FakeBackend> {
    let backend = Arc::new(FakeBackend::new());
    backend.seed(
        "/turmas",
        vec![
            json!({"id": 2, "nome": "Turma B"}),
            json!({"id": 1, "nome": "Turma A"}),
            json!({"id": 3, "nome": ""}),
        ],
    );
    backend
}

#[test]
fn concurrent_callers_share_one_fetch() {
    let backend = seeded();
    backend.set_list_delay(Duration::from_millis(150));
    let cache = OptionCache::new();

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let resolver = OptionResolver::new(backend.clone(), cache.clone());
                scope.spawn(move || resolver.resolve(&turmas_ref()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(backend.list_calls(), 1);
    for state in &results {
        assert!(state.error.is_none());
        assert_eq!(state.options, results[0].options);
    }
    let labels: Vec<&str> = results[0].options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Turma A", "Turma B"]);
}

#[test]
fn resolved_entry_is_reused_until_invalidated() {
    let backend = seeded();
    let cache = OptionCache::new();
    let resolver = OptionResolver::new(backend.clone(), cache.clone());

    resolver.resolve(&turmas_ref());
    resolver.resolve(&turmas_ref());
    assert_eq!(backend.list_calls(), 1);
    assert!(matches!(
        cache.peek(&turmas_ref().signature()),
        CacheEntry::Ready(_)
    ));

    cache.invalidate(&turmas_ref().signature());
    resolver.resolve(&turmas_ref());
    assert_eq!(backend.list_calls(), 2);
}

#[test]
fn signature_includes_value_key() {
    let backend = seeded();
    let resolver = OptionResolver::new(backend.clone(), OptionCache::new());

    let by_id = resolver.resolve(&turmas_ref());
    let by_name = resolver.resolve(&turmas_ref().value_key("nome"));
    assert_eq!(backend.list_calls(), 2);
    assert_eq!(by_id.options[0].value, OptionValue::from_json(&json!(1)).unwrap());
    assert_eq!(by_name.options[0].value, OptionValue::Text("Turma A".into()));
}

#[test]
fn errors_are_not_cached() {
    let backend = seeded();
    let cache = OptionCache::new();
    let resolver = OptionResolver::new(backend.clone(), cache.clone());

    backend.fail_lists(true);
    let failed = resolver.resolve(&turmas_ref());
    assert_eq!(failed.error.as_deref(), Some("Erro interno."));
    assert!(failed.options.is_empty());
    assert!(matches!(
        cache.peek(&turmas_ref().signature()),
        CacheEntry::Missing
    ));

    backend.fail_lists(false);
    let recovered = resolver.resolve(&turmas_ref());
    assert!(recovered.error.is_none());
    assert_eq!(recovered.options.len(), 2);
}

#[test]
fn large_listings_are_walked_page_by_page() {
    let backend = Arc::new(FakeBackend::new());
    let items = (1..=1200)
        .map(|i| json!({"id": i, "nome_completo": format!("Professor {:04}", i)}))
        .collect();
    backend.seed("/professores", items);

    let resolver = OptionResolver::new(backend.clone(), OptionCache::new());
    let state = resolver.resolve(&ResourceRef::new("/professores", "nome_completo"));
    assert_eq!(state.options.len(), 1200);
    assert_eq!(backend.list_calls(), 3);
}

#[test]
fn static_options_keep_declaration_order() {
    let backend = Arc::new(FakeBackend::new());
    let resolver = OptionResolver::new(backend.clone(), OptionCache::new());
    let field = ResourceField::choice("metodo", "Metodo", &[("PIX", "Pix"), ("BOLETO", "Boleto")]);

    let state = resolver.resolve_field(&field);
    let labels: Vec<&str> = state.options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Pix", "Boleto"]);
    assert_eq!(backend.list_calls(), 0);
}

#[test]
fn reset_clears_every_entry() {
    let backend = seeded();
    let cache = OptionCache::new();
    let resolver = OptionResolver::new(backend, cache.clone());
    resolver.resolve(&turmas_ref());
    assert_eq!(cache.len(), 1);
    cache.reset();
    assert!(cache.is_empty());
}
