//! Table rendering of a resource listing.
//!
//! Cell text follows the console's pt-BR conventions: `--` for missing
//! values, `Sim`/`Nao` for booleans, `DD/MM/YYYY` for ISO dates and `.` as
//! the thousands separator.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::schema::{Column, ResourceConfig};
use crate::store::ListState;
use crate::types::Record;

pub const EMPTY_CELL: &str = "--";
pub const NO_RECORDS: &str = "Nenhum registro encontrado.";
pub const LOADING: &str = "Carregando registros...";
pub const ACTIONS_HEADER: &str = "Acoes";

/// Formats a raw cell value.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => EMPTY_CELL.to_string(),
        Value::Bool(b) => format_bool(*b).to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => format_number(f),
            None => n.to_string(),
        },
        Value::String(s) if s.is_empty() => EMPTY_CELL.to_string(),
        Value::String(s) => match date_prefix(s) {
            Some(date) => date.format("%d/%m/%Y").to_string(),
            None => s.clone(),
        },
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "Sim"
    } else {
        "Nao"
    }
}

/// `YYYY-MM-DD...` as `DD/MM/YYYY`; other text verbatim, empty as `--`.
pub fn format_date(value: &str) -> String {
    if value.is_empty() {
        return EMPTY_CELL.to_string();
    }
    match date_prefix(value) {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => value.to_string(),
    }
}

/// RFC 3339 timestamp as local `DD/MM/YYYY HH:MM`. Timestamps without an
/// offset are shown as written; unparseable text is returned unchanged.
pub fn format_datetime(value: &str) -> String {
    if value.is_empty() {
        return EMPTY_CELL.to_string();
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        if value.ends_with('Z') {
            return parsed.naive_utc().format("%d/%m/%Y %H:%M").to_string();
        }
        return parsed
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M")
            .to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, pattern) {
            return parsed.format("%d/%m/%Y %H:%M").to_string();
        }
    }
    value.to_string()
}

/// pt-BR number with up to three decimals: `1234.5` becomes `1.234,5`.
pub fn format_number(value: f64) -> String {
    format_decimal(value, 0, 3)
}

/// Amount in reais with two decimals, from a number or numeric string.
pub fn format_currency(value: &Value) -> String {
    match numeric(value) {
        Numeric::Missing => EMPTY_CELL.to_string(),
        Numeric::Invalid(text) => text,
        Numeric::Value(amount) => format!("R$ {}", format_decimal(amount, 2, 2)),
    }
}

/// Percentage points with two decimals: `12.5` becomes `12,50%`.
pub fn format_percent(value: &Value) -> String {
    match numeric(value) {
        Numeric::Missing | Numeric::Invalid(_) => EMPTY_CELL.to_string(),
        Numeric::Value(points) => format!("{}%", format_decimal(points, 2, 2)),
    }
}

enum Numeric {
    Missing,
    Invalid(String),
    Value(f64),
}

fn numeric(value: &Value) -> Numeric {
    match value {
        Value::Null => Numeric::Missing,
        Value::Number(n) => n.as_f64().map_or(Numeric::Missing, Numeric::Value),
        Value::String(s) if s.trim().is_empty() => Numeric::Missing,
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Numeric::Value(f),
            _ => Numeric::Invalid(s.clone()),
        },
        other => Numeric::Invalid(other.to_string()),
    }
}

fn date_prefix(value: &str) -> Option<NaiveDate> {
    let head = value.get(..10)?;
    let bytes = head.as_bytes();
    let shaped = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn format_decimal(value: f64, min_fraction: usize, max_fraction: usize) -> String {
    let rendered = format!("{:.*}", max_fraction, value.abs());
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((&rendered, ""));

    let mut fraction = frac_part.trim_end_matches('0').to_string();
    while fraction.len() < min_fraction {
        fraction.push('0');
    }

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*digit);
    }

    let negative = value < 0.0 && rendered.bytes().any(|b| b.is_ascii_digit() && b != b'0');
    let sign = if negative { "-" } else { "" };
    if fraction.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{},{}", sign, grouped, fraction)
    }
}

/// Per-row operation offered in the actions cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowAction {
    Edit,
    Delete,
    Custom { key: String, label: String },
}

impl RowAction {
    pub fn label(&self) -> &str {
        match self {
            Self::Edit => "Editar",
            Self::Delete => "Excluir",
            Self::Custom { label, .. } => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TableRow {
    Item {
        cells: Vec<String>,
        actions: Vec<RowAction>,
    },
    /// A single cell spanning every column.
    Message(String),
}

/// Rows and headers of one listing, derived from a config and a snapshot.
#[derive(Debug)]
pub struct TableView<'a> {
    config: &'a ResourceConfig,
    state: &'a ListState,
}

impl<'a> TableView<'a> {
    pub fn new(config: &'a ResourceConfig, state: &'a ListState) -> Self {
        Self { config, state }
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> =
            self.config.columns.iter().map(|c| c.label.clone()).collect();
        if self.config.shows_actions() {
            headers.push(ACTIONS_HEADER.to_string());
        }
        headers
    }

    pub fn rows(&self) -> Vec<TableRow> {
        if self.state.loading {
            return vec![TableRow::Message(LOADING.to_string())];
        }
        let rows: Vec<TableRow> = self
            .state
            .visible_items()
            .map(|item| TableRow::Item {
                cells: self.config.columns.iter().map(|c| cell(c, item)).collect(),
                actions: self.actions_for(item),
            })
            .collect();
        if rows.is_empty() {
            return vec![TableRow::Message(NO_RECORDS.to_string())];
        }
        rows
    }

    /// Operations offered for `item`, in display order.
    pub fn actions_for(&self, item: &Record) -> Vec<RowAction> {
        let mut actions = Vec::new();
        if self.config.allow_edit && !self.config.is_locked(item) {
            actions.push(RowAction::Edit);
        }
        for action in &self.config.actions {
            if action.is_enabled(item) {
                actions.push(RowAction::Custom {
                    key: action.key.clone(),
                    label: action.label.clone(),
                });
            }
        }
        if self.config.allow_delete {
            actions.push(RowAction::Delete);
        }
        actions
    }

    /// Item at `index` among the rows shown.
    pub fn select(&self, index: usize) -> Option<&'a Record> {
        self.state.visible_items().nth(index)
    }

    /// `N registro(s)  Pagina p de t`
    pub fn footer(&self) -> String {
        format!(
            "{} registro(s)  Pagina {} de {}",
            self.state.count, self.state.page, self.state.total_pages
        )
    }

    /// Column-aligned text for terminals.
    pub fn render_text(&self) -> String {
        let headers = self.headers();
        let rows = self.rows();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        let item_lines: Vec<Option<Vec<String>>> = rows
            .iter()
            .map(|row| match row {
                TableRow::Item { cells, actions } => {
                    let mut line = cells.clone();
                    if self.config.shows_actions() {
                        let labels: Vec<&str> = actions.iter().map(RowAction::label).collect();
                        line.push(labels.join(" | "));
                    }
                    Some(line)
                }
                TableRow::Message(_) => None,
            })
            .collect();
        for line in item_lines.iter().flatten() {
            for (width, text) in widths.iter_mut().zip(line) {
                *width = (*width).max(text.chars().count());
            }
        }

        let mut out = String::new();
        out.push_str(&join_padded(&headers, &widths));
        out.push('\n');
        let rule: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1) * 2;
        out.push_str(&"-".repeat(rule));
        out.push('\n');
        for (row, line) in rows.iter().zip(&item_lines) {
            match (row, line) {
                (_, Some(line)) => out.push_str(&join_padded(line, &widths)),
                (TableRow::Message(message), None) => out.push_str(message),
                (TableRow::Item { .. }, None) => {}
            }
            out.push('\n');
        }
        out.push_str(&self.footer());
        out.push('\n');
        out
    }
}

fn cell(column: &Column, item: &Record) -> String {
    format_cell(&column.value(item))
}

fn join_padded(texts: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, (text, width)) in texts.iter().zip(widths).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(text);
        let pad = width.saturating_sub(text.chars().count());
        line.push_str(&" ".repeat(pad));
    }
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Condition, ResourceAction};
    use serde_json::json;

    fn state(items: Vec<Value>, count: u64) -> ListState {
        ListState {
            items: items
                .into_iter()
                .map(|v| v.as_object().unwrap().clone())
                .collect(),
            count,
            page: 1,
            total_pages: crate::types::total_pages(count),
            search: String::new(),
            filters: Vec::new(),
            loading: false,
            error: None,
        }
    }

    fn contratos() -> ResourceConfig {
        ResourceConfig::new("contratos", "Contratos", "/contratos")
            .columns(vec![
                Column::new("aluno_nome", "Aluno"),
                Column::new("status", "Status"),
            ])
            .lock_when(Condition::FieldNotEquals {
                field: "status".into(),
                value: json!("RASCUNHO"),
            })
    }

    #[test]
    fn cell_formats() {
        assert_eq!(format_cell(&Value::Null), "--");
        assert_eq!(format_cell(&json!("")), "--");
        assert_eq!(format_cell(&json!(true)), "Sim");
        assert_eq!(format_cell(&json!(false)), "Nao");
        assert_eq!(format_cell(&json!("2024-03-05")), "05/03/2024");
        assert_eq!(format_cell(&json!("2024-03-05T10:00:00Z")), "05/03/2024");
        assert_eq!(format_cell(&json!(1234.5)), "1.234,5");
        assert_eq!(format_cell(&json!(1200)), "1.200");
        assert_eq!(format_cell(&json!("Ana Souza")), "Ana Souza");
        assert_eq!(format_cell(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn invalid_date_prefix_stays_verbatim() {
        assert_eq!(format_cell(&json!("2024-13-45")), "2024-13-45");
        assert_eq!(format_date("amanha"), "amanha");
    }

    #[test]
    fn currency_and_percent() {
        assert_eq!(format_currency(&json!("1520.50")), "R$ 1.520,50");
        assert_eq!(format_currency(&json!(0)), "R$ 0,00");
        assert_eq!(format_currency(&json!(-35.5)), "R$ -35,50");
        assert_eq!(format_currency(&Value::Null), "--");
        assert_eq!(format_percent(&json!(12.5)), "12,50%");
        assert_eq!(format_percent(&json!("x")), "--");
    }

    #[test]
    fn negative_numbers_keep_sign() {
        assert_eq!(format_number(-1234567.0), "-1.234.567");
        assert_eq!(format_number(-0.0001), "0");
    }

    #[test]
    fn naive_datetime_is_shown_as_written() {
        assert_eq!(format_datetime("2024-03-05T14:07:00"), "05/03/2024 14:07");
        assert_eq!(format_datetime(""), "--");
        assert_eq!(format_datetime("ontem"), "ontem");
    }

    #[test]
    fn empty_listing_renders_single_message_row() {
        let config = contratos();
        let state = state(vec![], 0);
        let view = TableView::new(&config, &state);
        assert_eq!(view.rows(), vec![TableRow::Message(NO_RECORDS.to_string())]);
        assert!(view.render_text().contains(NO_RECORDS));
    }

    #[test]
    fn loading_renders_loading_row() {
        let config = contratos();
        let mut state = state(vec![json!({"id": 1})], 1);
        state.loading = true;
        let view = TableView::new(&config, &state);
        assert_eq!(view.rows(), vec![TableRow::Message(LOADING.to_string())]);
    }

    #[test]
    fn actions_column_follows_flags() {
        let config = contratos();
        let state = state(vec![], 0);
        assert_eq!(
            TableView::new(&config, &state).headers(),
            vec!["Aluno", "Status", "Acoes"]
        );

        let config = contratos().read_only();
        assert_eq!(TableView::new(&config, &state).headers(), vec!["Aluno", "Status"]);
    }

    #[test]
    fn locked_rows_drop_edit() {
        let config = contratos().action(ResourceAction {
            key: "emitir".into(),
            label: "Emitir".into(),
            enabled_when: Some(Condition::FieldEquals {
                field: "status".into(),
                value: json!("RASCUNHO"),
            }),
        });
        let state = state(
            vec![
                json!({"id": 1, "aluno_nome": "Ana", "status": "RASCUNHO"}),
                json!({"id": 2, "aluno_nome": "Bia", "status": "EMITIDO"}),
            ],
            2,
        );
        let view = TableView::new(&config, &state);
        let draft = view.actions_for(view.select(0).unwrap());
        let labels: Vec<&str> = draft.iter().map(RowAction::label).collect();
        assert_eq!(labels, vec!["Editar", "Emitir", "Excluir"]);
        let issued = view.actions_for(view.select(1).unwrap());
        assert_eq!(issued, vec![RowAction::Delete]);
        assert!(view.select(2).is_none());
    }

    #[test]
    fn render_text_aligns_columns() {
        let config = contratos();
        let state = state(
            vec![json!({"id": 1, "aluno_nome": "Ana Souza", "status": "RASCUNHO"})],
            1,
        );
        let text = TableView::new(&config, &state).render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Aluno      Status    Acoes");
        assert_eq!(lines[2], "Ana Souza  RASCUNHO  Editar | Excluir");
        assert_eq!(lines[3], "1 registro(s)  Pagina 1 de 1");
    }

    #[test]
    fn active_filters_hide_non_matching_rows() {
        let config = contratos();
        let mut state = state(
            vec![
                json!({"id": 1, "aluno_nome": "Ana", "status": "RASCUNHO"}),
                json!({"id": 2, "aluno_nome": "Bia", "status": "EMITIDO"}),
            ],
            2,
        );
        state.filters = vec![("status".to_string(), "EMITIDO".to_string())];
        let view = TableView::new(&config, &state);
        let rows = view.rows();
        assert_eq!(rows.len(), 1);
        assert!(matches!(&rows[0], TableRow::Item { cells, .. } if cells[0] == "Bia"));
        assert_eq!(view.select(0).and_then(|item| item.get("id")), Some(&json!(2)));
        assert!(view.select(1).is_none());

        state.filters = vec![("status".to_string(), "CANCELADO".to_string())];
        let view = TableView::new(&config, &state);
        assert_eq!(view.rows(), vec![TableRow::Message(NO_RECORDS.to_string())]);
    }
}
