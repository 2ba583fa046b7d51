//! Scenario catalog
//!
//! The built-in scenarios live in `data/scenarios.json` and are embedded at
//! build time. The catalog is read-only once loaded.

use crate::models::{Category, ScenarioSpec};
use crate::prompts;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

const BUILTIN_SCENARIOS: &str = include_str!("../data/scenarios.json");

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    categories: Vec<Category>,
    scenarios: Vec<ScenarioSpec>,
}

/// A consistency problem found by [`Catalog::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogIssue {
    DuplicateScenario(String),
    DuplicateField { scenario: String, field: String },
    UnexpectedOptions { scenario: String, field: String },
    MissingOptions { scenario: String, field: String },
    UnknownCategory { scenario: String, category: String },
    DanglingReference { scenario: String, name: String },
    UnclosedSection { scenario: String, name: String },
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogIssue::DuplicateScenario(id) => write!(f, "duplicate scenario id '{}'", id),
            CatalogIssue::DuplicateField { scenario, field } => {
                write!(f, "[{}] duplicate field id '{}'", scenario, field)
            }
            CatalogIssue::UnexpectedOptions { scenario, field } => {
                write!(f, "[{}] field '{}' has options but is not a select", scenario, field)
            }
            CatalogIssue::MissingOptions { scenario, field } => {
                write!(f, "[{}] select field '{}' has no options", scenario, field)
            }
            CatalogIssue::UnknownCategory { scenario, category } => {
                write!(f, "[{}] unknown category '{}'", scenario, category)
            }
            CatalogIssue::DanglingReference { scenario, name } => {
                write!(f, "[{}] template references undeclared field '{}'", scenario, name)
            }
            CatalogIssue::UnclosedSection { scenario, name } => {
                write!(f, "[{}] section tag '{}' would render as literal text", scenario, name)
            }
        }
    }
}

impl Catalog {
    /// The embedded catalog, parsed on first use.
    pub fn builtin() -> &'static Catalog {
        static BUILTIN: OnceLock<Catalog> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            Catalog::from_json(BUILTIN_SCENARIOS).expect("embedded scenario catalog is valid JSON")
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Catalog(format!("Invalid catalog: {}", e)))
    }

    pub fn new(categories: Vec<Category>, scenarios: Vec<ScenarioSpec>) -> Self {
        Self {
            categories,
            scenarios,
        }
    }

    pub fn list_all(&self) -> &[ScenarioSpec] {
        &self.scenarios
    }

    pub fn get_by_id(&self, id: &str) -> Option<&ScenarioSpec> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    /// Case-insensitive substring match over name, description and category,
    /// in declaration order.
    pub fn search(&self, query: &str) -> Vec<&ScenarioSpec> {
        let query = query.to_lowercase();
        self.scenarios
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&query)
                    || s.description.to_lowercase().contains(&query)
                    || s.category.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn by_category(&self, category: &str) -> Vec<&ScenarioSpec> {
        self.scenarios
            .iter()
            .filter(|s| s.category == category)
            .collect()
    }

    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        let mut scenario_ids = HashSet::new();

        for scenario in &self.scenarios {
            if !scenario_ids.insert(scenario.id.as_str()) {
                issues.push(CatalogIssue::DuplicateScenario(scenario.id.clone()));
            }

            if self.category(&scenario.category).is_none() {
                issues.push(CatalogIssue::UnknownCategory {
                    scenario: scenario.id.clone(),
                    category: scenario.category.clone(),
                });
            }

            let mut field_ids = HashSet::new();
            for field in &scenario.fields {
                if !field_ids.insert(field.id.as_str()) {
                    issues.push(CatalogIssue::DuplicateField {
                        scenario: scenario.id.clone(),
                        field: field.id.clone(),
                    });
                }

                match (field.kind.is_select(), &field.options) {
                    (false, Some(_)) => issues.push(CatalogIssue::UnexpectedOptions {
                        scenario: scenario.id.clone(),
                        field: field.id.clone(),
                    }),
                    (true, None) => issues.push(CatalogIssue::MissingOptions {
                        scenario: scenario.id.clone(),
                        field: field.id.clone(),
                    }),
                    (true, Some(options)) if options.is_empty() => {
                        issues.push(CatalogIssue::MissingOptions {
                            scenario: scenario.id.clone(),
                            field: field.id.clone(),
                        })
                    }
                    _ => {}
                }
            }

            for name in prompts::referenced_fields(&scenario.template) {
                if !field_ids.contains(name.as_str()) {
                    issues.push(CatalogIssue::DanglingReference {
                        scenario: scenario.id.clone(),
                        name,
                    });
                }
            }

            for name in prompts::unclosed_sections(&scenario.template) {
                issues.push(CatalogIssue::UnclosedSection {
                    scenario: scenario.id.clone(),
                    name,
                });
            }
        }

        issues
    }
}
