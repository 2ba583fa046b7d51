//! Application orchestration for composing, saving and exporting prompts.

use crate::catalog::Catalog;
use crate::export;
use crate::form::FormState;
use crate::history::HistoryStore;
use crate::models::{
    Config, FieldKind, FieldValue, FormValues, HistoryEntry, NewHistoryEntry, ScenarioSpec,
};
use crate::prompts;
use crate::storage::{FileStorage, StorageBackend};
use crate::{Error, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A rendered prompt together with the inputs that produced it.
#[derive(Debug, Clone)]
pub struct Composition<'a> {
    pub scenario: &'a ScenarioSpec,
    pub values: FormValues,
    pub content: String,
}

/// Coordinates the catalog, form filling, rendering, history and export.
pub struct App {
    catalog: &'static Catalog,
    history: HistoryStore,
    export_dir: PathBuf,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub catalog: &'static Catalog,
    pub storage: Box<dyn StorageBackend>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, export_dir: PathBuf, history_limit: usize) -> Self {
        Self {
            catalog: services.catalog,
            history: HistoryStore::with_capacity(services.storage, history_limit),
            export_dir,
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub fn new() -> Result<Self> {
        let config = Config::from_env()?;
        info!("History directory: {}", config.history_dir.display());

        Ok(Self::with_services(
            AppServices {
                catalog: Catalog::builtin(),
                storage: Box::new(FileStorage::new(config.history_dir)),
            },
            config.export_dir,
            config.history_limit,
        ))
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn scenario(&self, id: &str) -> Result<&'static ScenarioSpec> {
        self.catalog
            .get_by_id(id)
            .ok_or_else(|| Error::ScenarioNotFound(id.to_string()))
    }

    /// Fill a scenario's form from `field=value` assignments and render it.
    ///
    /// Repeated assignments to a multi-select field accumulate in order; for
    /// any other field the last assignment wins.
    pub fn compose(
        &self,
        scenario_id: &str,
        assignments: &[(String, String)],
    ) -> Result<Composition<'static>> {
        let scenario = self.scenario(scenario_id)?;
        let mut form = FormState::new(scenario);

        for (field_id, value) in group_assignments(scenario, assignments) {
            form.set_field(&field_id, value)?;
        }

        let missing: Vec<String> = form
            .missing_required()
            .iter()
            .map(|f| f.label.clone())
            .collect();
        if !missing.is_empty() {
            return Err(Error::IncompleteForm(missing));
        }

        let values = form.into_values();
        let content = prompts::render(&scenario.template, &values);
        debug!("[{}] Rendered {} chars", scenario.id, content.chars().count());

        Ok(Composition {
            scenario,
            values,
            content,
        })
    }

    pub fn save(&mut self, composition: &Composition) -> HistoryEntry {
        self.history.add(NewHistoryEntry {
            scenario_id: composition.scenario.id.clone(),
            scenario_name: composition.scenario.name.clone(),
            content: composition.content.clone(),
            form_data: composition.values.clone(),
        })
    }

    /// The saved snapshot itself, independent of the current catalog.
    pub fn saved_entry(&self, entry_id: &str) -> Result<&HistoryEntry> {
        self.history
            .get(entry_id)
            .ok_or_else(|| Error::HistoryNotFound(entry_id.to_string()))
    }

    /// Re-render a saved entry's values against the current catalog.
    pub fn restore(&self, entry_id: &str) -> Result<Composition<'static>> {
        let entry = self.saved_entry(entry_id)?;
        let scenario = self.scenario(&entry.scenario_id)?;

        let form = FormState::restore(scenario, &entry.form_data);
        if !form.is_complete() {
            warn!(
                "Restored entry {} no longer fills every required field of {}",
                entry_id, scenario.id
            );
        }

        let values = form.into_values();
        let content = prompts::render(&scenario.template, &values);
        Ok(Composition {
            scenario,
            values,
            content,
        })
    }

    pub fn export_history(&self) -> Result<PathBuf> {
        export::export_history(self.history.list(), &self.export_dir, Utc::now())
    }

    pub fn export_prompt(&self, composition: &Composition) -> Result<PathBuf> {
        export::export_prompt(
            &composition.scenario.name,
            &composition.content,
            &self.export_dir,
            Utc::now(),
        )
    }
}

fn group_assignments(
    scenario: &ScenarioSpec,
    assignments: &[(String, String)],
) -> Vec<(String, FieldValue)> {
    let mut grouped: Vec<(String, FieldValue)> = Vec::new();

    for (field_id, value) in assignments {
        let is_multi = scenario
            .field(field_id)
            .is_some_and(|f| f.kind == FieldKind::MultiSelect);
        let position = grouped.iter().position(|(id, _)| id == field_id);

        match (position, is_multi) {
            (Some(index), true) => {
                if let FieldValue::Multi(items) = &mut grouped[index].1 {
                    items.push(value.clone());
                }
            }
            (Some(index), false) => grouped[index].1 = FieldValue::from(value.as_str()),
            (None, true) => {
                grouped.push((field_id.clone(), FieldValue::Multi(vec![value.clone()])))
            }
            (None, false) => grouped.push((field_id.clone(), FieldValue::from(value.as_str()))),
        }
    }

    grouped
}
