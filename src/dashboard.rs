//! Dashboard and current-user payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::table::{format_cell, format_currency, format_datetime};

/// `GET /auth/me/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserProfile {
    /// Full name when known, username otherwise.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.is_superuser || self.groups.iter().any(|g| g == group)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub timestamp: String,
}

/// `GET /dashboard/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    #[serde(default)]
    pub stats: Map<String, Value>,
    #[serde(default)]
    pub recent_activity: Vec<Activity>,
}

const KNOWN_STATS: &[(&str, &str)] = &[
    ("total_alunos", "Total de alunos"),
    ("turmas_ativas", "Turmas ativas"),
    ("turnos_ativos", "Turnos ativos"),
    ("contratos_emitidos", "Contratos emitidos"),
    ("receita_mes", "Receita do mes"),
];

/// A labelled, formatted dashboard figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatCard {
    pub key: String,
    pub label: String,
    pub value: String,
}

impl DashboardResponse {
    /// Known stats first, in a fixed order, then any others the server sent.
    pub fn stat_cards(&self) -> Vec<StatCard> {
        let mut cards = Vec::new();
        for (key, label) in KNOWN_STATS {
            if let Some(value) = self.stats.get(*key) {
                cards.push(StatCard {
                    key: key.to_string(),
                    label: label.to_string(),
                    value: format_stat(key, value),
                });
            }
        }
        for (key, value) in &self.stats {
            if KNOWN_STATS.iter().any(|(k, _)| k == key) {
                continue;
            }
            cards.push(StatCard {
                key: key.clone(),
                label: key.replace('_', " "),
                value: format_stat(key, value),
            });
        }
        cards
    }

    /// Activity lines as `DD/MM/YYYY HH:MM  message`.
    pub fn activity_lines(&self) -> Vec<String> {
        self.recent_activity
            .iter()
            .map(|a| format!("{}  {}", format_datetime(&a.timestamp), a.message))
            .collect()
    }
}

fn format_stat(key: &str, value: &Value) -> String {
    if key.starts_with("receita") || key.starts_with("valor") {
        return format_currency(value);
    }
    format_cell(value)
}
