//! Declarative validation of [`Input`] fields.
//!
//! Optional fields that are absent skip all rules except [`Rule::Required`].

use std::collections::{BTreeMap, BTreeSet};

use super::ApiError;
use super::input::Input;
use crate::domain::time::parse_iso8601;
use crate::domain::{Geometry, GeometryKind};

/// Messages per field, serialized as the 409 response body.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    Url,
    In(Vec<String>),
    /// Minimum string length in characters.
    Min(usize),
    /// Maximum string length in characters.
    Max(usize),
    Integer,
    /// Inclusive numeric range.
    Between(i64, i64),
    Boolean,
    /// WKT geometry, optionally of one kind.
    Geometry(Option<GeometryKind>),
    Date8601,
}

impl Rule {
    #[must_use]
    pub fn passes(&self, input: &Input, field: &str) -> bool {
        self.check(input, field).is_none()
    }

    fn check(&self, input: &Input, field: &str) -> Option<String> {
        let passes = match self {
            Self::Required => input.is_present(field),
            Self::Url => input.string(field).is_some_and(|s| {
                url::Url::parse(&s).is_ok_and(|u| u.has_host())
            }),
            Self::In(allowed) => input
                .string(field)
                .is_some_and(|s| allowed.iter().any(|a| *a == s)),
            Self::Min(min) => input
                .string(field)
                .is_some_and(|s| s.chars().count() >= *min),
            Self::Max(max) => input
                .string(field)
                .is_some_and(|s| s.chars().count() <= *max),
            Self::Integer => input.integer(field).is_some(),
            Self::Between(low, high) => input.number(field).is_some_and(|n| {
                #[allow(clippy::cast_precision_loss)]
                let (low, high) = (*low as f64, *high as f64);
                n >= low && n <= high
            }),
            Self::Boolean => input.boolean(field).is_some(),
            Self::Geometry(kind) => input.string(field).is_some_and(|s| {
                Geometry::parse(&s).is_ok_and(|g| kind.is_none_or(|k| g.kind() == k))
            }),
            Self::Date8601 => input.string(field).and_then(|s| parse_iso8601(&s)).is_some(),
        };

        (!passes).then(|| self.message(field))
    }

    fn message(&self, field: &str) -> String {
        let name = field.replace('_', " ");
        match self {
            Self::Required => format!("The {name} field is required."),
            Self::Url => format!("The {name} format is invalid."),
            Self::In(_) => format!("The selected {name} is invalid."),
            Self::Min(min) => format!("The {name} must be at least {min} characters."),
            Self::Max(max) => format!("The {name} may not be greater than {max} characters."),
            Self::Integer => format!("The {name} must be an integer."),
            Self::Between(low, high) => format!("The {name} must be between {low} and {high}."),
            Self::Boolean => format!("The {name} field must be true or false."),
            Self::Geometry(Some(kind)) => format!("The {name} must be a valid WKT {kind}."),
            Self::Geometry(None) => format!("The {name} must be a valid WKT geometry."),
            Self::Date8601 => format!("The {name} is not a valid ISO 8601 date."),
        }
    }
}

pub struct Validator<'a> {
    input: &'a Input,
    rules: Vec<(&'a str, Vec<Rule>)>,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub const fn new(input: &'a Input) -> Self {
        Self {
            input,
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn rule(mut self, field: &'a str, rules: Vec<Rule>) -> Self {
        self.rules.push((field, rules));
        self
    }

    /// Adds [`Rule::Required`] in front of the rules of `field`.
    #[must_use]
    pub fn require(mut self, field: &'a str) -> Self {
        match self.rules.iter_mut().find(|(f, _)| *f == field) {
            Some((_, rules)) => rules.insert(0, Rule::Required),
            None => self.rules.push((field, vec![Rule::Required])),
        }
        self
    }

    fn field_errors(&self, field: &str, rules: &[Rule]) -> Vec<String> {
        if !self.input.is_present(field) {
            return rules
                .iter()
                .find(|r| **r == Rule::Required)
                .and_then(|r| r.check(self.input, field))
                .into_iter()
                .collect();
        }
        rules
            .iter()
            .filter_map(|r| r.check(self.input, field))
            .collect()
    }

    #[must_use]
    pub fn errors(&self) -> ValidationErrors {
        self.rules
            .iter()
            .filter_map(|(field, rules)| {
                let messages = self.field_errors(field, rules);
                (!messages.is_empty()).then(|| ((*field).to_string(), messages))
            })
            .collect()
    }

    /// Present fields that pass all of their rules.
    #[must_use]
    pub fn valid(&self) -> BTreeSet<&'a str> {
        self.rules
            .iter()
            .filter(|(field, rules)| {
                self.input.is_present(field) && self.field_errors(field, rules).is_empty()
            })
            .map(|(field, _)| *field)
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with all messages if any rule fails.
    pub fn validate(&self) -> Result<(), ApiError> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: serde_json::Value) -> Input {
        Input::from_json(value).unwrap()
    }

    #[test]
    fn absent_optional_fields_pass() {
        let input = input(json!({}));
        let validator =
            Validator::new(&input).rule("rating", vec![Rule::Integer, Rule::Between(1, 5)]);
        assert!(validator.errors().is_empty());
        assert!(validator.valid().is_empty());
    }

    #[test]
    fn required_reports_only_missing() {
        let input = input(json!({"url": ""}));
        let errors = Validator::new(&input)
            .rule("url", vec![Rule::Required, Rule::Url])
            .errors();
        assert_eq!(errors["url"], vec!["The url field is required."]);
    }

    #[test]
    fn collects_every_failing_rule() {
        let input = input(json!({"rating": "x"}));
        let errors = Validator::new(&input)
            .rule("rating", vec![Rule::Integer, Rule::Between(1, 5)])
            .errors();
        assert_eq!(errors["rating"].len(), 2);
    }

    #[test]
    fn string_length_bounds() {
        let input = input(json!({"title": "ab", "text": "abc"}));
        let validator = Validator::new(&input)
            .rule("title", vec![Rule::Min(3), Rule::Max(200)])
            .rule("text", vec![Rule::Min(3)]);
        let errors = validator.errors();
        assert_eq!(errors["title"], vec!["The title must be at least 3 characters."]);
        assert!(!errors.contains_key("text"));
        assert_eq!(validator.valid(), BTreeSet::from(["text"]));
    }

    #[test]
    fn geometry_kind_is_enforced() {
        let input = input(json!({
            "bbox": "POLYGON((0 0,1 0,1 1,0 1,0 0))",
            "point": "POINT(1 2)",
            "broken": "POLYGON((0 0,1 0))"
        }));
        let validator = Validator::new(&input)
            .rule("bbox", vec![Rule::Geometry(Some(GeometryKind::Polygon))])
            .rule("point", vec![Rule::Geometry(Some(GeometryKind::Polygon))])
            .rule("broken", vec![Rule::Geometry(None)]);
        assert_eq!(validator.valid(), BTreeSet::from(["bbox"]));
    }

    #[test]
    fn in_and_boolean_and_dates() {
        let input = input(json!({
            "datatype": "wms",
            "other": "kml",
            "metadata": "yes",
            "start": "2014-01-01",
            "end": "yesterday"
        }));
        let codes = vec!["wms".to_string(), "wfs".to_string()];
        let errors = Validator::new(&input)
            .rule("datatype", vec![Rule::In(codes.clone())])
            .rule("other", vec![Rule::In(codes)])
            .rule("metadata", vec![Rule::Boolean])
            .rule("start", vec![Rule::Date8601])
            .rule("end", vec![Rule::Date8601])
            .errors();
        let failed: Vec<&str> = errors.keys().map(String::as_str).collect();
        assert_eq!(failed, vec!["end", "metadata", "other"]);
    }

    #[test]
    fn require_promotes_existing_rules() {
        let input = input(json!({}));
        let errors = Validator::new(&input)
            .rule("bbox", vec![Rule::Geometry(Some(GeometryKind::Polygon))])
            .require("bbox")
            .errors();
        assert_eq!(errors["bbox"], vec!["The bbox field is required."]);
    }

    #[test]
    fn url_needs_a_host() {
        let input = input(json!({
            "a": "http://example.org/wms",
            "b": "example.org",
            "c": "mailto:x@y.z"
        }));
        let valid = Validator::new(&input)
            .rule("a", vec![Rule::Url])
            .rule("b", vec![Rule::Url])
            .rule("c", vec![Rule::Url])
            .valid();
        assert_eq!(valid, BTreeSet::from(["a"]));
    }
}
