//! File export and display helpers
//!
//! Writes the history as a JSON download and single prompts as text files,
//! and formats statistics and timestamps the way the history view shows them.

use crate::models::HistoryEntry;
use crate::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize)]
struct ExportedEntry<'a> {
    #[serde(rename = "时间")]
    time: String,
    #[serde(rename = "场景")]
    scenario: &'a str,
    #[serde(rename = "内容")]
    content: &'a str,
    #[serde(rename = "收藏")]
    favorite: &'static str,
}

/// `2024/1/5 14:03:09`, in the given zone.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y/%-m/%-d %H:%M:%S").to_string()
}

pub fn history_export_filename(now: DateTime<Utc>) -> String {
    format!("prompt-history-{}.json", now.timestamp_millis())
}

pub fn prompt_export_filename(scenario_name: &str, now: DateTime<Utc>) -> String {
    let name: String = scenario_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}-prompt-{}.txt", name, now.timestamp_millis())
}

/// Pretty-printed JSON array of the entries, timestamps in local time.
pub fn history_export_json(entries: &[HistoryEntry]) -> Result<String> {
    let records: Vec<ExportedEntry> = entries
        .iter()
        .map(|entry| ExportedEntry {
            time: format_timestamp(&entry.created_at.with_timezone(&Local)),
            scenario: &entry.scenario_name,
            content: &entry.content,
            favorite: if entry.favorite { "是" } else { "否" },
        })
        .collect();

    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn export_history(entries: &[HistoryEntry], dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    let json = history_export_json(entries)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(history_export_filename(now));
    fs::write(&path, json)?;

    info!("Exported {} history entries to {}", entries.len(), path.display());
    Ok(path)
}

pub fn export_prompt(
    scenario_name: &str,
    content: &str,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(prompt_export_filename(scenario_name, now));
    fs::write(&path, content)?;

    info!("Exported prompt to {}", path.display());
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentStats {
    pub lines: usize,
    pub characters: usize,
    pub words: usize,
}

impl ContentStats {
    /// Characters are Unicode scalar values; words are whitespace-separated runs.
    pub fn of(text: &str) -> Self {
        Self {
            lines: text.split('\n').count(),
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
        }
    }
}

/// Short age label: `HH:MM` today, `昨天 HH:MM`, `N天前` within a week,
/// otherwise the date.
pub fn relative_time<Tz: TimeZone>(created_at: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let days = (now.clone() - created_at.clone()).num_days();

    match days {
        i64::MIN..=0 => created_at.format("%H:%M").to_string(),
        1 => format!("昨天 {}", created_at.format("%H:%M")),
        2..=6 => format!("{}天前", days),
        _ => created_at.format("%Y/%-m/%-d").to_string(),
    }
}
