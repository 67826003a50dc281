//! CEJAM school administration console
//!
//! Schema-driven client for the school management REST API. Each manageable
//! entity (students, classes, payments, contracts ...) is described once as a
//! [`ResourceConfig`]; the same description drives the list store, the form
//! normalizer, select option resolution and the table view.
//!
//! # Example
//!
//! ```
//! use cejamsys_console::{FormState, ResourceField, ResourceRef};
//! use serde_json::json;
//!
//! let fields = vec![
//!     ResourceField::text("nome_completo", "Nome completo").required(),
//!     ResourceField::currency("valor", "Valor"),
//!     ResourceField::lookup("turmas", "Turmas", ResourceRef::new("/turmas", "nome")).multiple(),
//!     ResourceField::password("password", "Senha"),
//! ];
//!
//! let mut form = FormState::new(&fields, None);
//! form.set("nome_completo", json!("Ana Souza")).unwrap();
//! form.set("valor", json!("")).unwrap();
//! form.set("turmas", json!(["2", "5"])).unwrap();
//!
//! let payload = form.normalize();
//! assert_eq!(payload["valor"], json!(null));
//! assert_eq!(payload["turmas"], json!([2, 5]));
//! // Empty passwords are never sent.
//! assert!(payload.get("password").is_none());
//! ```
//!
//! # Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`ApiClient`] | Blocking HTTP, bearer auth, one refresh-and-replay on `401` |
//! | [`Backend`] | Collection contract used by stores and option resolvers |
//! | [`ResourceStore`] | Page, search, filters and mutations of one resource |
//! | [`OptionResolver`] | Cached label/value lists for selects |
//! | [`FormState`] | Raw form values, field groups and payload normalization |
//! | [`TableView`] | Cell formatting and row actions |

mod backend;
pub mod catalog;
mod client;
mod config;
mod dashboard;
mod error;
mod form;
mod loader;
mod options;
mod schema;
mod store;
mod table;
mod tokens;
mod types;

pub use backend::Backend;
pub use client::{error_message, ApiClient, ApiRequest, RequestBody};
pub use config::{
    data_dir, ClientConfig, DEFAULT_API_PREFIX, DEFAULT_API_URL, ENV_ACCESS_TOKEN,
    ENV_API_PREFIX, ENV_API_URL, ENV_DATA_DIR,
};
pub use dashboard::{Activity, DashboardResponse, StatCard, UserProfile};
pub use error::{ApiError, FieldError, SchemaError, StoreError};
pub use form::{
    normalize_value, parse_number, payload_schema, validate_payload, FieldGroup, FormMode,
    FormState, DEFAULT_GROUP_TITLE, OTHER_GROUP_TITLE, REQUIRED_MESSAGE,
};
pub use loader::{
    catalog_from_value, is_url, load_catalog, load_catalog_auto, load_catalog_str,
    load_catalog_url,
};
pub use options::{
    compare_labels, map_options, CacheEntry, OptionCache, OptionResolver, OptionsState,
    OPTIONS_PAGE_SIZE,
};
pub use schema::{
    matches_filter, normalize_endpoint, Column, ColumnSource, Condition, FieldKind, FieldSection,
    OptionSource, Registry, ResourceAction, ResourceConfig, ResourceField, ResourceRef,
    SelectSpec, ValueType,
};
pub use store::{ListState, ResourceStore};
pub use table::{
    format_bool, format_cell, format_currency, format_date, format_datetime, format_number,
    format_percent, RowAction, TableRow, TableView, ACTIONS_HEADER, EMPTY_CELL, LOADING,
    NO_RECORDS,
};
pub use tokens::{FileTokenStore, MemoryTokenStore, TokenStore, Tokens, STORAGE_KEY};
pub use types::{
    json_type_name, total_pages, EntityId, ListPage, ListQuery, OptionValue, Record,
    SelectOption, PAGE_SIZE,
};
