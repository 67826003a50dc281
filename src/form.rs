//! Form state and payload normalization.
//!
//! A [`FormState`] holds the raw, widget-shaped values of a create or edit
//! form. [`FormState::normalize`] turns them into the payload the backend
//! expects, one rule per [`FieldKind`]:
//!
//! | Kind | Empty input | Otherwise |
//! |------|-------------|-----------|
//! | read-only | excluded | excluded |
//! | password | excluded | sent verbatim |
//! | boolean | `false` | truthiness |
//! | number, currency | `null` | JSON number, `null` if unparseable |
//! | date | `null` | the date string |
//! | select | `null` | cast per `valueType` |
//! | multi-select | `[]` | elements cast per `valueType` |
//! | text, email, textarea | `""` | raw value |
//!
//! Normalization is pure and idempotent. [`validate_payload`] checks a
//! normalized payload against the JSON Schema built by [`payload_schema`].

use serde_json::{json, Map, Number, Value};

use crate::error::{FieldError, SchemaError};
use crate::schema::{
    FieldKind, FieldSection, OptionSource, ResourceConfig, ResourceField, SelectSpec, ValueType,
};
use crate::types::Record;

/// Message used for required fields left empty.
pub const REQUIRED_MESSAGE: &str = "Campo obrigatorio";

/// Title of the single group used when a resource declares no sections.
pub const DEFAULT_GROUP_TITLE: &str = "Dados gerais";

/// Title of the trailing group holding fields no section lists.
pub const OTHER_GROUP_TITLE: &str = "Outros";

/// Fields of one titled form group, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGroup<'a> {
    pub title: &'a str,
    pub fields: Vec<&'a ResourceField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// Raw values of a resource form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    resource: String,
    fields: Vec<ResourceField>,
    sections: Vec<FieldSection>,
    values: Record,
    mode: FormMode,
    locked: bool,
}

impl FormState {
    /// Bootstrap values from `initial` (edit) or from defaults (create).
    ///
    /// Per field: the initial value when present and non-null, else the
    /// declared default, else the kind's empty value. Passwords always start
    /// empty.
    pub fn new(fields: &[ResourceField], initial: Option<&Record>) -> Self {
        let values = fields
            .iter()
            .map(|field| (field.name.clone(), initial_value(field, initial)))
            .collect();
        Self {
            resource: String::new(),
            fields: fields.to_vec(),
            sections: Vec::new(),
            values,
            mode: if initial.is_some() {
                FormMode::Edit
            } else {
                FormMode::Create
            },
            locked: false,
        }
    }

    /// Form for a resource; edit forms of locked records reject changes.
    pub fn for_config(config: &ResourceConfig, item: Option<&Record>) -> Self {
        let mut form = Self::new(&config.fields, item);
        form.resource = config.key.clone();
        form.sections = config.sections.clone();
        form.locked = item.is_some_and(|item| config.is_locked(item));
        form
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn fields(&self) -> &[ResourceField] {
        &self.fields
    }

    /// Fields grouped by the declared sections.
    ///
    /// Each field appears once, in the first section that lists it. Fields
    /// no section lists follow in an "Outros" group; without sections every
    /// field goes in a single "Dados gerais" group.
    pub fn sections(&self) -> Vec<FieldGroup<'_>> {
        if self.sections.is_empty() {
            return vec![FieldGroup {
                title: DEFAULT_GROUP_TITLE,
                fields: self.fields.iter().collect(),
            }];
        }
        let mut used = std::collections::HashSet::new();
        let mut groups: Vec<FieldGroup<'_>> = self
            .sections
            .iter()
            .map(|section| FieldGroup {
                title: section.title.as_str(),
                fields: section
                    .fields
                    .iter()
                    .filter_map(|name| self.fields.iter().find(|f| &f.name == name))
                    .filter(|field| used.insert(field.name.as_str()))
                    .collect(),
            })
            .filter(|group| !group.fields.is_empty())
            .collect();
        let rest: Vec<&ResourceField> = self
            .fields
            .iter()
            .filter(|field| !used.contains(field.name.as_str()))
            .collect();
        if !rest.is_empty() {
            groups.push(FieldGroup {
                title: OTHER_GROUP_TITLE,
                fields: rest,
            });
        }
        groups
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &Record {
        &self.values
    }

    /// Replace the raw value of `name`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnknownField` for undeclared names and
    /// `SchemaError::InvalidField` for read-only fields or locked forms.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), SchemaError> {
        let field = self.editable(name)?;
        let name = field.name.clone();
        self.values.insert(name, value);
        Ok(())
    }

    /// Set a value from command-line text, shaped for the field's widget:
    /// booleans accept `true/false/sim/nao/1/0`, multi-selects take a
    /// comma-separated list.
    pub fn set_text(&mut self, name: &str, text: &str) -> Result<(), SchemaError> {
        let field = self.editable(name)?;
        let value = match &field.kind {
            FieldKind::Boolean => match text.trim().to_lowercase().as_str() {
                "true" | "sim" | "s" | "1" | "yes" => Value::Bool(true),
                "false" | "nao" | "não" | "n" | "0" | "no" | "" => Value::Bool(false),
                other => {
                    return Err(SchemaError::InvalidField {
                        resource: self.resource.clone(),
                        field: field.name.clone(),
                        message: format!("expected a boolean, got \"{}\"", other),
                    })
                }
            },
            FieldKind::Select(SelectSpec { multiple: true, .. }) => Value::Array(
                text.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            _ => Value::String(text.to_string()),
        };
        self.set(name, value)
    }

    fn editable(&self, name: &str) -> Result<&ResourceField, SchemaError> {
        let field = self
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SchemaError::UnknownField {
                resource: self.resource.clone(),
                field: name.to_string(),
            })?;
        let reason = if self.locked {
            Some("record is locked for editing")
        } else if field.read_only {
            Some("field is read-only")
        } else {
            None
        };
        match reason {
            Some(message) => Err(SchemaError::InvalidField {
                resource: self.resource.clone(),
                field: field.name.clone(),
                message: message.into(),
            }),
            None => Ok(field),
        }
    }

    /// Payload for submission.
    pub fn normalize(&self) -> Record {
        let mut payload = Map::new();
        for field in &self.fields {
            let raw = self.values.get(&field.name).unwrap_or(&Value::Null);
            if let Some(value) = normalize_value(field, raw) {
                payload.insert(field.name.clone(), value);
            }
        }
        payload
    }

    /// Required, editable fields whose normalized value is empty.
    /// Passwords count as required only when creating.
    pub fn missing_required(&self) -> Vec<&ResourceField> {
        let payload = self.normalize();
        self.fields
            .iter()
            .filter(|f| f.required && !f.read_only)
            .filter(|f| match f.kind {
                FieldKind::Password => {
                    self.mode == FormMode::Create && !payload.contains_key(&f.name)
                }
                FieldKind::Boolean => false,
                _ => payload.get(&f.name).map_or(true, is_blank),
            })
            .collect()
    }

    /// Normalized payload, or every problem found with it.
    ///
    /// # Errors
    ///
    /// Returns one `FieldError` per missing required field. When none is
    /// missing, returns the JSON Schema violations of the payload instead.
    pub fn submit(&self) -> Result<Record, Vec<FieldError>> {
        let payload = self.normalize();
        let mut errors: Vec<FieldError> = self
            .missing_required()
            .into_iter()
            .map(|f| FieldError {
                path: format!("/{}", f.name),
                message: REQUIRED_MESSAGE.to_string(),
            })
            .collect();
        if errors.is_empty() {
            errors = validate_payload(&self.fields, &payload);
        }
        if errors.is_empty() {
            Ok(payload)
        } else {
            Err(errors)
        }
    }
}

fn initial_value(field: &ResourceField, initial: Option<&Record>) -> Value {
    if field.kind == FieldKind::Password {
        return Value::String(String::new());
    }
    let present = initial
        .and_then(|item| item.get(&field.name))
        .filter(|v| !v.is_null());
    if field.kind.is_multi_select() {
        return match present {
            Some(Value::Array(items)) => Value::Array(items.clone()),
            _ => field
                .default_value
                .clone()
                .filter(Value::is_array)
                .unwrap_or_else(|| Value::Array(Vec::new())),
        };
    }
    if let Some(value) = present {
        return value.clone();
    }
    if let Some(default) = &field.default_value {
        return default.clone();
    }
    match field.kind {
        FieldKind::Boolean => Value::Bool(false),
        _ => Value::String(String::new()),
    }
}

/// Normalized value of one field; `None` means the field is left out.
pub fn normalize_value(field: &ResourceField, raw: &Value) -> Option<Value> {
    if field.read_only {
        return None;
    }
    let value = match &field.kind {
        FieldKind::Password => match raw {
            Value::Null => return None,
            Value::String(s) if s.is_empty() => return None,
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        },
        FieldKind::Boolean => Value::Bool(truthy(raw)),
        FieldKind::Number | FieldKind::Currency => parse_number(raw).unwrap_or(Value::Null),
        FieldKind::Date => match raw {
            Value::String(s) if !s.trim().is_empty() => Value::String(s.trim().to_string()),
            _ => Value::Null,
        },
        FieldKind::Select(spec) if spec.multiple => match raw {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .filter_map(|item| cast_option(item, spec.value_type))
                    .collect(),
            ),
            _ => Value::Array(Vec::new()),
        },
        FieldKind::Select(spec) => cast_option(raw, spec.value_type).unwrap_or(Value::Null),
        FieldKind::Text | FieldKind::Email | FieldKind::Textarea => match raw {
            Value::Null => Value::String(String::new()),
            other => other.clone(),
        },
    };
    Some(value)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parses a number from JSON or text; `,` is accepted as decimal separator.
pub fn parse_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => Some(Value::Number(n.clone())),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            let cleaned = if trimmed.contains(',') {
                trimmed.replace('.', "").replace(',', ".")
            } else {
                trimmed.to_string()
            };
            if let Ok(n) = cleaned.parse::<i64>() {
                return Some(Value::from(n));
            }
            let f = cleaned.parse::<f64>().ok()?;
            Number::from_f64(f).map(Value::Number)
        }
        _ => None,
    }
}

fn cast_option(value: &Value, value_type: ValueType) -> Option<Value> {
    match value_type {
        ValueType::Number => parse_number(value),
        ValueType::String => match value {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// JSON Schema of a normalized payload for `fields`.
///
/// Read-only fields are absent and unknown keys are rejected. Required
/// fields (other than passwords) must be non-empty.
pub fn payload_schema(fields: &[ResourceField]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields.iter().filter(|f| !f.read_only) {
        let must = field.required && field.kind != FieldKind::Password;
        properties.insert(field.name.clone(), field_schema(field, must));
        if must {
            required.push(Value::String(field.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn scalar_type(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Number => "number",
        ValueType::String => "string",
    }
}

fn nullable(kind: &str, must: bool) -> Value {
    if must {
        json!(kind)
    } else {
        json!([kind, "null"])
    }
}

fn field_schema(field: &ResourceField, must: bool) -> Value {
    match &field.kind {
        FieldKind::Text | FieldKind::Textarea => {
            if must {
                json!({ "minLength": 1 })
            } else {
                json!({})
            }
        }
        FieldKind::Email => {
            if must {
                json!({ "format": "email", "minLength": 1 })
            } else {
                json!({ "anyOf": [{ "maxLength": 0 }, { "format": "email" }] })
            }
        }
        FieldKind::Password => json!({ "type": "string", "minLength": 1 }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Number | FieldKind::Currency => json!({ "type": nullable("number", must) }),
        FieldKind::Date => json!({
            "type": nullable("string", must),
            "pattern": r"^\d{4}-\d{2}-\d{2}",
        }),
        FieldKind::Select(spec) => {
            let allowed = match &spec.source {
                OptionSource::Static(options) => Some(
                    options
                        .iter()
                        .filter_map(|o| cast_option(&o.value.to_json(), spec.value_type))
                        .collect::<Vec<_>>(),
                ),
                OptionSource::Resource(_) => None,
            };
            let scalar = scalar_type(spec.value_type);
            if spec.multiple {
                let mut items = json!({ "type": scalar });
                if let Some(allowed) = allowed {
                    items["enum"] = Value::Array(allowed);
                }
                let mut schema = json!({ "type": "array", "items": items });
                if must {
                    schema["minItems"] = json!(1);
                }
                schema
            } else {
                let mut schema = json!({ "type": nullable(scalar, must) });
                if let Some(mut allowed) = allowed {
                    if !must {
                        allowed.push(Value::Null);
                    }
                    schema["enum"] = Value::Array(allowed);
                }
                schema
            }
        }
    }
}

/// Validates a payload against [`payload_schema`].
pub fn validate_payload(fields: &[ResourceField], payload: &Record) -> Vec<FieldError> {
    let schema = payload_schema(fields);
    let validator = match jsonschema::options()
        .should_validate_formats(true)
        .build(&schema)
    {
        Ok(validator) => validator,
        Err(e) => {
            return vec![FieldError {
                path: String::new(),
                message: format!("invalid payload schema: {}", e),
            }]
        }
    };
    let instance = Value::Object(payload.clone());
    validator
        .iter_errors(&instance)
        .map(|e| FieldError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect()
}
