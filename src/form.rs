//! Form state for one scenario
//!
//! Holds the values entered so far and answers whether the required fields
//! are filled in. Values are checked against the scenario's field kinds and
//! options as they are set.

use crate::models::{FieldKind, FieldSpec, FieldValue, FormValues, ScenarioSpec};
use crate::{Error, Result};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FormState<'a> {
    scenario: &'a ScenarioSpec,
    values: FormValues,
}

impl<'a> FormState<'a> {
    pub fn new(scenario: &'a ScenarioSpec) -> Self {
        Self {
            scenario,
            values: FormValues::new(),
        }
    }

    /// Rebuild a form from a saved snapshot.
    ///
    /// Values for fields the scenario no longer declares are dropped; the rest
    /// are kept as saved, even if the options have changed since.
    pub fn restore(scenario: &'a ScenarioSpec, snapshot: &FormValues) -> Self {
        let values = snapshot
            .iter()
            .filter(|(id, _)| scenario.field(id).is_some())
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect();

        Self { scenario, values }
    }

    pub fn scenario(&self) -> &'a ScenarioSpec {
        self.scenario
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn into_values(self) -> FormValues {
        self.values
    }

    pub fn set_field(&mut self, field_id: &str, value: impl Into<FieldValue>) -> Result<()> {
        let field = self
            .scenario
            .field(field_id)
            .ok_or_else(|| Error::UnknownField {
                scenario: self.scenario.id.clone(),
                field: field_id.to_string(),
            })?;
        let value = value.into();

        check_value(field, &value)?;
        debug!("[{}] set {} = {:?}", self.scenario.id, field_id, value);
        self.values.insert(field_id.to_string(), value);
        Ok(())
    }

    pub fn clear_field(&mut self, field_id: &str) {
        self.values.remove(field_id);
    }

    pub fn is_satisfied(&self, field: &FieldSpec) -> bool {
        self.values
            .get(&field.id)
            .is_some_and(FieldValue::is_truthy)
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn missing_required(&self) -> Vec<&'a FieldSpec> {
        self.scenario
            .fields
            .iter()
            .filter(|f| f.required && !self.is_satisfied(f))
            .collect()
    }
}

fn check_value(field: &FieldSpec, value: &FieldValue) -> Result<()> {
    let invalid = |reason: String| Error::InvalidFieldValue {
        field: field.id.clone(),
        reason,
    };

    let picks: Vec<&String> = match (field.kind, value) {
        (FieldKind::MultiSelect, FieldValue::Multi(items)) => items.iter().collect(),
        (FieldKind::MultiSelect, FieldValue::Text(_)) => {
            return Err(invalid("expected a list of options".to_string()))
        }
        (_, FieldValue::Multi(_)) => {
            return Err(invalid("only multi-select fields take a list".to_string()))
        }
        (FieldKind::SingleSelect, FieldValue::Text(text)) if !text.is_empty() => vec![text],
        _ => return Ok(()),
    };

    let options = field.options.as_deref().unwrap_or_default();
    match picks.into_iter().find(|pick| !options.contains(*pick)) {
        Some(pick) => Err(invalid(format!(
            "'{}' is not one of: {}",
            pick,
            options.join(", ")
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn lesson_plan() -> &'static ScenarioSpec {
        Catalog::builtin().get_by_id("lesson-plan-course").unwrap()
    }

    fn fill_required(form: &mut FormState) {
        form.set_field("subject", "仓储管理").unwrap();
        form.set_field("grade", "高职物流专业").unwrap();
        form.set_field("topic", "仓储作业流程").unwrap();
        form.set_field("duration", "2课时(90分钟)").unwrap();
        form.set_field("objectives", "掌握入库流程").unwrap();
    }

    #[test]
    fn test_new_form_is_incomplete() {
        let form = FormState::new(lesson_plan());
        let missing: Vec<_> = form.missing_required().into_iter().map(|f| f.id.as_str()).collect();
        assert_eq!(missing, vec!["subject", "grade", "topic", "duration", "objectives"]);
        assert!(!form.is_complete());
    }

    #[test]
    fn test_required_fields_complete_the_form() {
        let mut form = FormState::new(lesson_plan());
        fill_required(&mut form);
        assert!(form.is_complete());
    }

    #[test]
    fn test_blank_text_does_not_satisfy() {
        let mut form = FormState::new(lesson_plan());
        fill_required(&mut form);
        form.set_field("topic", "   ").unwrap();

        assert!(!form.is_complete());
        assert_eq!(form.missing_required()[0].id, "topic");
    }

    #[test]
    fn test_clear_field() {
        let mut form = FormState::new(lesson_plan());
        fill_required(&mut form);
        form.clear_field("objectives");
        assert!(!form.is_complete());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut form = FormState::new(lesson_plan());
        let err = form.set_field("nope", "x").unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_select_value_must_be_an_option() {
        let mut form = FormState::new(lesson_plan());
        let err = form.set_field("subject", "烹饪").unwrap_err();
        assert!(err.to_string().contains("is not one of"));
    }

    #[test]
    fn test_multiselect_accepts_lists_only() {
        let mut form = FormState::new(lesson_plan());
        form.set_field(
            "teaching-methods",
            vec!["案例教学".to_string(), "翻转课堂".to_string()],
        )
        .unwrap();
        assert!(form.set_field("teaching-methods", "案例教学").is_err());
        assert!(form.set_field("topic", vec!["a".to_string()]).is_err());
    }

    #[test]
    fn test_restore_drops_undeclared_fields() {
        let mut snapshot = FormValues::new();
        snapshot.insert("topic".to_string(), FieldValue::from("库存"));
        snapshot.insert("retired-field".to_string(), FieldValue::from("x"));

        let form = FormState::restore(lesson_plan(), &snapshot);
        assert_eq!(form.values().len(), 1);
        assert!(form.values().contains_key("topic"));
    }
}
