//! Data models and structures
//!
//! Defines scenario and field definitions, form values, history entries and
//! the environment-driven configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Separator used when a multi-select value is interpolated into text.
pub const ENUMERATION_SEPARATOR: &str = "、";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldKind {
    #[serde(rename = "text")]
    SingleLineText,
    #[serde(rename = "textarea")]
    MultiLineText,
    #[serde(rename = "select")]
    SingleSelect,
    #[serde(rename = "multiselect")]
    MultiSelect,
}

impl FieldKind {
    pub fn is_select(self) -> bool {
        matches!(self, FieldKind::SingleSelect | FieldKind::MultiSelect)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: String,
    pub fields: Vec<FieldSpec>,
    pub template: String,
}

impl ScenarioSpec {
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// A single form value: free text or the ordered picks of a multi-select.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Multi(Vec<String>),
}

impl FieldValue {
    /// Non-blank text or a non-empty selection.
    ///
    /// Decides both whether a conditional section survives rendering and
    /// whether a required field counts as filled in.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Text(text) => !text.trim().is_empty(),
            FieldValue::Multi(items) => !items.is_empty(),
        }
    }

    /// Text substituted for a `{{name}}` reference.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Multi(items) => items.join(ENUMERATION_SEPARATOR),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::Multi(value)
    }
}

/// Field id to current value. A missing key behaves like an empty value.
pub type FormValues = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub scenario_id: String,
    pub scenario_name: String,
    pub content: String,
    #[serde(default)]
    pub form_data: FormValues,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub favorite: bool,
}

/// What a caller supplies when saving; the history store assigns the rest.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub scenario_id: String,
    pub scenario_name: String,
    pub content: String,
    pub form_data: FormValues,
}

// Configuration
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub history_dir: PathBuf,
    pub export_dir: PathBuf,
    pub history_limit: usize,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let history_limit = match std::env::var("PROMPT_HISTORY_LIMIT") {
            Ok(raw) => parse_history_limit(&raw)?,
            Err(_) => DEFAULT_HISTORY_LIMIT,
        };

        Ok(Self {
            history_dir: std::env::var("PROMPT_HISTORY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".prompt-workshop")),
            export_dir: std::env::var("PROMPT_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            history_limit,
        })
    }
}

fn parse_history_limit(raw: &str) -> crate::Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(crate::Error::Config(format!(
            "PROMPT_HISTORY_LIMIT must be a positive integer, got '{}'",
            raw
        ))),
    }
}
