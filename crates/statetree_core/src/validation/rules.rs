//! Built-in field rules.

use super::{Errors, Validator};
use crate::model::{Model, Value};
use regex::Regex;

#[derive(Debug, Clone)]
enum Rule {
    Presence,
    Min(f64),
    Max(f64),
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    Format(Regex),
}

impl Rule {
    fn check(&self, value: &Value) -> Option<String> {
        match self {
            Self::Presence => {
                let blank = match value {
                    Value::Str(text) => text.trim().is_empty(),
                    other => other.is_nil(),
                };
                blank.then(|| "must be specified".to_string())
            }
            Self::Min(min) => check_number(value, |number| number >= *min)
                .map(|ok| (!ok).then(|| format!("must be at least {}", format_number(*min))))
                .unwrap_or_else(|| Some("must be a number".to_string())),
            Self::Max(max) => check_number(value, |number| number <= *max)
                .map(|ok| (!ok).then(|| format!("must be at most {}", format_number(*max))))
                .unwrap_or_else(|| Some("must be a number".to_string())),
            Self::Length { min, max } => {
                if value.is_nil() {
                    return None;
                }
                let Some(text) = value.as_str() else {
                    return Some("must be text".to_string());
                };
                let count = text.chars().count();
                if let Some(min) = min.filter(|min| count < *min) {
                    return Some(format!("must be at least {min} characters"));
                }
                if let Some(max) = max.filter(|max| count > *max) {
                    return Some(format!("must be at most {max} characters"));
                }
                None
            }
            Self::Format(pattern) => {
                if value.is_nil() {
                    return None;
                }
                match value.as_str() {
                    Some(text) if pattern.is_match(text) => None,
                    _ => Some("is in an invalid format".to_string()),
                }
            }
        }
    }
}

/// Returns `Some(true|false)` for numbers and nil (nil always passes),
/// `None` for non-numeric values.
fn check_number(value: &Value, accept: impl Fn(f64) -> bool) -> Option<bool> {
    if value.is_nil() {
        return Some(true);
    }
    value.as_f64().map(accept)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Ordered list of field rules evaluated against a model's stored values.
///
/// Rules read values with [`Model::peek`], so validation never registers
/// observers or materializes children.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(String, Rule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field must be non-nil and, for text, non-blank.
    pub fn presence(self, field: &str) -> Self {
        self.with(field, Rule::Presence)
    }

    pub fn min(self, field: &str, min: f64) -> Self {
        self.with(field, Rule::Min(min))
    }

    pub fn max(self, field: &str, max: f64) -> Self {
        self.with(field, Rule::Max(max))
    }

    /// Character-count bounds for text fields.
    pub fn length(self, field: &str, min: Option<usize>, max: Option<usize>) -> Self {
        self.with(field, Rule::Length { min, max })
    }

    /// Text must match `pattern`.
    ///
    /// # Errors
    /// - Returns the regex compile error for an invalid pattern.
    pub fn format(self, field: &str, pattern: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(pattern)?;
        Ok(self.with(field, Rule::Format(pattern)))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn with(mut self, field: &str, rule: Rule) -> Self {
        self.rules.push((field.to_string(), rule));
        self
    }
}

impl Validator for RuleSet {
    fn validate(&self, model: &Model) -> Errors {
        let mut errors = Errors::new();
        for (field, rule) in &self.rules {
            let value = model.peek(field).unwrap_or_default();
            if let Some(message) = rule.check(&value) {
                errors.add(field.as_str(), message);
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::RuleSet;
    use crate::model::{Attributes, Model, ModelOptions, Value};
    use crate::validation::Validator;

    fn model_with(pairs: &[(&str, Value)]) -> Model {
        let attributes: Attributes = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        Model::new(Some(attributes), ModelOptions::new()).expect("model builds")
    }

    #[test]
    fn presence_rejects_nil_and_blank_text() {
        let rules = RuleSet::new().presence("name").presence("title");
        let model = model_with(&[("title", Value::from("   "))]);

        let errors = rules.validate(&model);
        assert_eq!(errors.messages("name"), ["must be specified".to_string()]);
        assert!(errors.contains("title"));
    }

    #[test]
    fn numeric_bounds() {
        let rules = RuleSet::new().min("age", 18.0).max("score", 10.5);
        let model = model_with(&[("age", Value::Int(5)), ("score", Value::Float(11.0))]);

        let errors = rules.validate(&model);
        assert_eq!(errors.messages("age"), ["must be at least 18".to_string()]);
        assert_eq!(errors.messages("score"), ["must be at most 10.5".to_string()]);

        let not_number = model_with(&[("age", Value::from("old"))]);
        let errors = rules.validate(&not_number);
        assert_eq!(errors.messages("age"), ["must be a number".to_string()]);
    }

    #[test]
    fn nil_passes_bounds_length_and_format() {
        let rules = RuleSet::new()
            .min("age", 1.0)
            .length("name", Some(2), None)
            .format("email", r"^[^@]+@[^@]+$")
            .expect("valid pattern");
        assert_eq!(rules.len(), 3);

        let model = model_with(&[]);
        assert!(rules.validate(&model).is_empty());
    }

    #[test]
    fn length_and_format() {
        let rules = RuleSet::new()
            .length("name", Some(2), Some(4))
            .format("email", r"^[^@]+@[^@]+$")
            .expect("valid pattern");

        let model = model_with(&[
            ("name", Value::from("abcdef")),
            ("email", Value::from("nobody")),
        ]);
        let errors = rules.validate(&model);
        assert_eq!(
            errors.messages("name"),
            ["must be at most 4 characters".to_string()]
        );
        assert_eq!(
            errors.messages("email"),
            ["is in an invalid format".to_string()]
        );
    }

    #[test]
    fn invalid_pattern_is_reported() {
        assert!(RuleSet::new().format("email", "(").is_err());
    }
}
