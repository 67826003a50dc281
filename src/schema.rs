//! Declarative resource schemas.
//!
//! A [`ResourceConfig`] describes one manageable entity type: where it lives on
//! the backend, which fields its form edits and which columns its table shows.
//! Fields are tagged variants ([`FieldKind`]) so that every consumer (form
//! normalization, payload schemas, option resolution) matches exhaustively.
//!
//! # JSON form
//!
//! ```json
//! {
//!   "key": "turmas",
//!   "path": "/turmas",
//!   "title": "Turmas",
//!   "endpoint": "/turmas",
//!   "fields": [
//!     { "name": "nome", "label": "Nome", "type": "text", "required": true },
//!     {
//!       "name": "professor_responsavel",
//!       "label": "Professor responsavel",
//!       "type": "select",
//!       "resource": { "endpoint": "/professores", "labelKey": "nome_completo" },
//!       "valueType": "number"
//!     }
//!   ],
//!   "columns": [{ "key": "nome", "label": "Turma" }],
//!   "sections": [{ "title": "Identificacao", "fields": ["nome"] }],
//!   "filters": ["professor_responsavel"]
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;
use crate::types::{EntityId, Record, SelectOption};

/// How select values are cast before they are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Number,
}

/// Reference to another resource whose listing populates a select.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub endpoint: String,
    pub label_key: String,
    #[serde(default = "default_value_key")]
    pub value_key: String,
}

fn default_value_key() -> String {
    "id".to_string()
}

impl ResourceRef {
    pub fn new(endpoint: impl Into<String>, label_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            label_key: label_key.into(),
            value_key: default_value_key(),
        }
    }

    pub fn value_key(mut self, key: impl Into<String>) -> Self {
        self.value_key = key.into();
        self
    }

    /// Cache identity: `endpoint|labelKey|valueKey`.
    pub fn signature(&self) -> String {
        format!("{}|{}|{}", self.endpoint, self.label_key, self.value_key)
    }
}

/// Where a select gets its options from.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionSource {
    /// Declared inline; declaration order is display order.
    Static(Vec<SelectOption>),
    /// Loaded from another resource's listing.
    Resource(ResourceRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectSpec {
    pub source: OptionSource,
    pub multiple: bool,
    pub value_type: ValueType,
}

/// Widget and normalization behavior of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Email,
    Textarea,
    Password,
    Number,
    Currency,
    Date,
    Boolean,
    Select(SelectSpec),
}

impl FieldKind {
    /// The `type` tag used in JSON catalogs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Textarea => "textarea",
            Self::Password => "password",
            Self::Number => "number",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Select(_) => "select",
        }
    }

    pub fn is_multi_select(&self) -> bool {
        matches!(self, Self::Select(spec) if spec.multiple)
    }
}

/// One editable (or display-only) attribute of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawField", into = "RawField")]
pub struct ResourceField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub read_only: bool,
    pub default_value: Option<Value>,
    pub placeholder: Option<String>,
    pub helper: Option<String>,
}

impl ResourceField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            read_only: false,
            default_value: None,
            placeholder: None,
            helper: None,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn email(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Email)
    }

    pub fn textarea(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Textarea)
    }

    pub fn password(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Password)
    }

    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    pub fn currency(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Currency)
    }

    pub fn date(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Date)
    }

    pub fn boolean(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Boolean)
    }

    /// Select over inline options.
    pub fn choice(
        name: impl Into<String>,
        label: impl Into<String>,
        options: &[(&str, &str)],
    ) -> Self {
        let options = options
            .iter()
            .map(|(value, label)| SelectOption::new(*value, *label))
            .collect();
        Self::new(
            name,
            label,
            FieldKind::Select(SelectSpec {
                source: OptionSource::Static(options),
                multiple: false,
                value_type: ValueType::String,
            }),
        )
    }

    /// Select populated from another resource; values are numeric ids.
    pub fn lookup(name: impl Into<String>, label: impl Into<String>, source: ResourceRef) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Select(SelectSpec {
                source: OptionSource::Resource(source),
                multiple: false,
                value_type: ValueType::Number,
            }),
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn helper(mut self, helper: impl Into<String>) -> Self {
        self.helper = Some(helper.into());
        self
    }

    /// Turns a select into a multi-select. No effect on other kinds.
    pub fn multiple(mut self) -> Self {
        if let FieldKind::Select(spec) = &mut self.kind {
            spec.multiple = true;
        }
        self
    }

    /// The resource reference backing this field, if any.
    pub fn resource_ref(&self) -> Option<&ResourceRef> {
        match &self.kind {
            FieldKind::Select(SelectSpec {
                source: OptionSource::Resource(r),
                ..
            }) => Some(r),
            _ => None,
        }
    }
}

/// Serialized shape of a field, kept close to the console's catalog files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    name: String,
    label: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "is_false")]
    required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<SelectOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "is_false")]
    multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    helper: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TryFrom<RawField> for ResourceField {
    type Error = String;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        let is_select = raw.kind == "select" || raw.kind == "multiselect";
        if !is_select && (raw.options.is_some() || raw.resource.is_some()) {
            return Err(format!(
                "field \"{}\": options/resource are only valid on select fields",
                raw.name
            ));
        }

        let kind = match raw.kind.as_str() {
            "text" => FieldKind::Text,
            "email" => FieldKind::Email,
            "textarea" => FieldKind::Textarea,
            "password" => FieldKind::Password,
            "number" => FieldKind::Number,
            "currency" => FieldKind::Currency,
            "date" => FieldKind::Date,
            "boolean" => FieldKind::Boolean,
            "select" | "multiselect" => {
                let source = match (raw.options, raw.resource) {
                    (Some(_), Some(_)) => {
                        return Err(format!(
                            "field \"{}\": options and resource are mutually exclusive",
                            raw.name
                        ))
                    }
                    (Some(options), None) => OptionSource::Static(options),
                    (None, Some(reference)) => OptionSource::Resource(reference),
                    (None, None) => {
                        return Err(format!(
                            "field \"{}\": select needs options or resource",
                            raw.name
                        ))
                    }
                };
                FieldKind::Select(SelectSpec {
                    source,
                    multiple: raw.multiple || raw.kind == "multiselect",
                    value_type: raw.value_type.unwrap_or_default(),
                })
            }
            other => {
                return Err(format!(
                    "field \"{}\": unknown type \"{}\"",
                    raw.name, other
                ))
            }
        };

        Ok(Self {
            name: raw.name,
            label: raw.label,
            kind,
            required: raw.required,
            read_only: raw.read_only,
            default_value: raw.default_value,
            placeholder: raw.placeholder,
            helper: raw.helper,
        })
    }
}

impl From<ResourceField> for RawField {
    fn from(field: ResourceField) -> Self {
        let kind = field.kind.type_name().to_string();
        let (options, resource, multiple, value_type) = match field.kind {
            FieldKind::Select(spec) => {
                let (options, resource) = match spec.source {
                    OptionSource::Static(options) => (Some(options), None),
                    OptionSource::Resource(reference) => (None, Some(reference)),
                };
                (options, resource, spec.multiple, Some(spec.value_type))
            }
            _ => (None, None, false, None),
        };
        Self {
            name: field.name,
            label: field.label,
            kind,
            required: field.required,
            read_only: field.read_only,
            options,
            resource,
            multiple,
            value_type,
            default_value: field.default_value,
            placeholder: field.placeholder,
            helper: field.helper,
        }
    }
}

/// How a column derives its cell value from a record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnSource {
    /// `item[column.key]`.
    #[default]
    Field,
    /// Length of an array field; 0 when absent.
    Count { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "is_field_source")]
    pub source: ColumnSource,
}

fn is_field_source(source: &ColumnSource) -> bool {
    *source == ColumnSource::Field
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            source: ColumnSource::Field,
        }
    }

    pub fn count(key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            source: ColumnSource::Count { key: key.clone() },
            key,
            label: label.into(),
        }
    }

    /// Raw cell value for `item`.
    pub fn value(&self, item: &Record) -> Value {
        match &self.source {
            ColumnSource::Field => item.get(&self.key).cloned().unwrap_or(Value::Null),
            ColumnSource::Count { key } => {
                let len = item.get(key).and_then(Value::as_array).map_or(0, Vec::len);
                Value::from(len)
            }
        }
    }
}

/// Predicate over a record's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    FieldEquals { field: String, value: Value },
    /// True only when the field is present, non-null and different.
    FieldNotEquals { field: String, value: Value },
}

impl Condition {
    pub fn matches(&self, item: &Record) -> bool {
        match self {
            Self::FieldEquals { field, value } => item.get(field) == Some(value),
            Self::FieldNotEquals { field, value } => match item.get(field) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) if s.is_empty() => false,
                Some(current) => current != value,
            },
        }
    }
}

/// Custom per-record endpoint, posted to `<endpoint><id>/<key>/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAction {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_when: Option<Condition>,
}

impl ResourceAction {
    pub fn is_enabled(&self, item: &Record) -> bool {
        self.enabled_when.as_ref().map_or(true, |c| c.matches(item))
    }
}

/// Whether `item[field]` matches a filter value.
///
/// Values compare by their display text. Arrays match when any element
/// does; missing and null fields never match.
pub fn matches_filter(item: &Record, field: &str, value: &str) -> bool {
    match item.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::Array(values)) => values
            .iter()
            .any(|v| filter_text(v).as_deref() == Some(value)),
        Some(current) => filter_text(current).as_deref() == Some(value),
    }
}

fn filter_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Titled group of form fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSection {
    pub title: String,
    pub fields: Vec<String>,
}

impl FieldSection {
    pub fn new(title: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            title: title.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Full description of a manageable resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    pub key: String,
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub singular: String,
    #[serde(default)]
    pub description: String,
    pub endpoint: String,
    pub fields: Vec<ResourceField>,
    pub columns: Vec<Column>,
    /// Form field grouping; fields not listed here go in a trailing group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<FieldSection>,
    /// Fields offered as exact-match list filters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ResourceAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_when: Option<Condition>,
    #[serde(default = "default_true")]
    pub allow_create: bool,
    #[serde(default = "default_true")]
    pub allow_edit: bool,
    #[serde(default = "default_true")]
    pub allow_delete: bool,
    #[serde(default = "default_true")]
    pub searchable: bool,
}

impl ResourceConfig {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        let key = key.into();
        Self {
            path: format!("/{}", key),
            key,
            title: title.into(),
            singular: String::new(),
            description: String::new(),
            endpoint: endpoint.into(),
            fields: Vec::new(),
            columns: Vec::new(),
            sections: Vec::new(),
            filters: Vec::new(),
            actions: Vec::new(),
            lock_when: None,
            allow_create: true,
            allow_edit: true,
            allow_delete: true,
            searchable: true,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn singular(mut self, singular: impl Into<String>) -> Self {
        self.singular = singular.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn fields(mut self, fields: Vec<ResourceField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn section(mut self, title: impl Into<String>, fields: &[&str]) -> Self {
        self.sections.push(FieldSection::new(title, fields));
        self
    }

    pub fn filters(mut self, fields: &[&str]) -> Self {
        self.filters = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn action(mut self, action: ResourceAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn lock_when(mut self, condition: Condition) -> Self {
        self.lock_when = Some(condition);
        self
    }

    /// Disables create, edit and delete.
    pub fn read_only(mut self) -> Self {
        self.allow_create = false;
        self.allow_edit = false;
        self.allow_delete = false;
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Collection path, always ending in `/`.
    pub fn collection_path(&self) -> String {
        normalize_endpoint(&self.endpoint)
    }

    /// Item path: `<endpoint>/<id>/`.
    pub fn item_path(&self, id: &EntityId) -> String {
        format!("{}{}/", self.collection_path(), id)
    }

    pub fn field(&self, name: &str) -> Option<&ResourceField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_action(&self, key: &str) -> Option<&ResourceAction> {
        self.actions.iter().find(|a| a.key == key)
    }

    /// Whether an edit drawer for `item` should be read-only.
    pub fn is_locked(&self, item: &Record) -> bool {
        self.lock_when.as_ref().is_some_and(|c| c.matches(item))
    }

    /// Whether rows carry an actions cell.
    pub fn shows_actions(&self) -> bool {
        self.allow_edit || self.allow_delete
    }

    /// Structural checks that the type system cannot express.
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.endpoint.trim().trim_matches('/').is_empty() {
            return Err(SchemaError::InvalidResource {
                key: self.key.clone(),
                message: "endpoint is empty".into(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::InvalidField {
                    resource: self.key.clone(),
                    field: field.label.clone(),
                    message: "field name is empty".into(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::InvalidField {
                    resource: self.key.clone(),
                    field: field.name.clone(),
                    message: "declared twice".into(),
                });
            }
            if let Some(reference) = field.resource_ref() {
                if reference.endpoint.is_empty() || reference.label_key.is_empty() {
                    return Err(SchemaError::InvalidField {
                        resource: self.key.clone(),
                        field: field.name.clone(),
                        message: "resource reference needs endpoint and labelKey".into(),
                    });
                }
            }
        }
        let named = self
            .sections
            .iter()
            .flat_map(|section| &section.fields)
            .chain(&self.filters);
        for name in named {
            if self.field(name).is_none() {
                return Err(SchemaError::UnknownField {
                    resource: self.key.clone(),
                    field: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Ensures a leading and a single trailing slash.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        format!("{}/", trimmed)
    } else {
        format!("/{}/", trimmed)
    }
}

/// Set of resources with unique keys.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    configs: Vec<ResourceConfig>,
    by_key: HashMap<String, usize>,
}

impl Registry {
    /// # Errors
    ///
    /// Returns `SchemaError::DuplicateKey` when two resources share a key,
    /// or the first structural error reported by [`ResourceConfig::check`].
    pub fn new(configs: Vec<ResourceConfig>) -> Result<Self, SchemaError> {
        let mut by_key = HashMap::new();
        for (index, config) in configs.iter().enumerate() {
            config.check()?;
            if by_key.insert(config.key.clone(), index).is_some() {
                return Err(SchemaError::DuplicateKey {
                    key: config.key.clone(),
                });
            }
        }
        Ok(Self { configs, by_key })
    }

    pub fn get(&self, key: &str) -> Option<&ResourceConfig> {
        self.by_key.get(key).map(|&i| &self.configs[i])
    }

    /// Looks a resource up by key, failing with `UnknownResource`.
    pub fn require(&self, key: &str) -> Result<&ResourceConfig, SchemaError> {
        self.get(key).ok_or_else(|| SchemaError::UnknownResource {
            key: key.to_string(),
        })
    }

    pub fn by_path(&self, path: &str) -> Option<&ResourceConfig> {
        self.configs.iter().find(|c| c.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
