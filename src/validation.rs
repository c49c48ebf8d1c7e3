//! Declarative request validation.
//!
//! A [`Schema`] lists the rules each field of a JSON object must satisfy. It is
//! checked against the raw body before the handler deserializes it, so every
//! failing field is reported at once instead of stopping at the first serde error.

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, FieldError};

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Field must be present and not null.
    Required,
    /// Field may be absent but not explicitly null.
    NotNull,
    /// Strings must contain something other than whitespace.
    NonEmpty,
    PositiveInt,
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339 timestamp
    DateTime,
    OneOf(&'static [&'static str]),
    MaxLen(usize),
    Email,
}

#[derive(Debug, Default)]
pub struct Schema {
    fields: Vec<(&'static str, Vec<Rule>)>,
    deny_unknown: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, rules: &[Rule]) -> Self {
        self.fields.push((name, rules.to_vec()));
        self
    }

    /// Reject keys that no field declares. Used for partial updates, where the
    /// key set becomes the SET clause.
    pub fn deny_unknown(mut self) -> Self {
        self.deny_unknown = true;
        self
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    pub fn errors(&self, payload: &Value) -> Vec<FieldError> {
        let Some(obj) = payload.as_object() else {
            return vec![FieldError::new("body", "must be a JSON object")];
        };

        let mut errors = Vec::new();

        for (name, rules) in &self.fields {
            let value = obj.get(*name).filter(|v| !v.is_null());

            let Some(value) = value else {
                if rules.iter().any(|r| matches!(r, Rule::Required)) {
                    errors.push(FieldError::new(*name, "is required"));
                } else if obj.contains_key(*name) && rules.iter().any(|r| matches!(r, Rule::NotNull))
                {
                    errors.push(FieldError::new(*name, "must not be null"));
                }
                continue;
            };

            for rule in rules {
                if let Some(message) = check(rule, value) {
                    errors.push(FieldError::new(*name, message));
                    break;
                }
            }
        }

        if self.deny_unknown {
            for key in obj.keys() {
                if !self.fields.iter().any(|(name, _)| name == key) {
                    errors.push(FieldError::new(key.as_str(), "is not an allowed field"));
                }
            }
        }

        errors
    }

    pub fn validate(&self, payload: &Value) -> Result<(), AppError> {
        let errors = self.errors(payload);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Validate, then deserialize into the request DTO.
    pub fn parse<T: DeserializeOwned>(&self, payload: Value) -> Result<T, AppError> {
        self.validate(&payload)?;
        serde_json::from_value(payload).map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

fn check(rule: &Rule, value: &Value) -> Option<String> {
    match rule {
        Rule::Required | Rule::NotNull => None,
        Rule::NonEmpty => match value.as_str() {
            Some(s) if s.trim().is_empty() => Some("must not be empty".into()),
            Some(_) => None,
            None => Some("must be a string".into()),
        },
        Rule::PositiveInt => match value.as_u64() {
            Some(n) if n > 0 => None,
            _ => Some("must be a positive integer".into()),
        },
        Rule::Date => match value.as_str() {
            Some(s) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => None,
            _ => Some("must be a date in YYYY-MM-DD format".into()),
        },
        Rule::DateTime => match value.as_str() {
            Some(s) if DateTime::parse_from_rfc3339(s).is_ok() => None,
            _ => Some("must be an RFC 3339 timestamp".into()),
        },
        Rule::OneOf(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => None,
            _ => Some(format!("must be one of: {}", allowed.join(", "))),
        },
        Rule::MaxLen(max) => match value.as_str() {
            Some(s) if s.chars().count() > *max => {
                Some(format!("must be at most {max} characters"))
            }
            _ => None,
        },
        Rule::Email => match value.as_str() {
            Some(s) if looks_like_email(s) => None,
            _ => Some("must be a valid email address".into()),
        },
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn mark_schema() -> Schema {
        Schema::new()
            .field("children_id", &[Rule::Required, Rule::PositiveInt])
            .field("date", &[Rule::Required, Rule::Date])
            .field("status", &[Rule::Required, Rule::OneOf(&["present", "absent", "late"])])
            .field("note", &[Rule::MaxLen(5)])
    }

    #[test]
    fn collects_every_failing_field() {
        let errors = mark_schema().errors(&json!({
            "children_id": 0,
            "date": "10/06/2025",
            "status": "Present",
        }));

        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["children_id", "date", "status"]);
        assert_eq!(errors[2].message, "must be one of: present, absent, late");
    }

    #[test]
    fn null_counts_as_missing() {
        let errors = mark_schema().errors(&json!({
            "children_id": 3,
            "date": null,
            "status": "late",
        }));
        assert_eq!(errors, vec![FieldError::new("date", "is required")]);
    }

    #[test]
    fn optional_fields_are_only_checked_when_present() {
        assert!(
            mark_schema()
                .errors(&json!({"children_id": 3, "date": "2025-06-10", "status": "absent"}))
                .is_empty()
        );

        let errors = mark_schema().errors(&json!({
            "children_id": 3, "date": "2025-06-10", "status": "absent", "note": "too long"
        }));
        assert_eq!(errors[0].field, "note");
    }

    #[test]
    fn deny_unknown_flags_extra_keys() {
        let schema = Schema::new().field("name", &[Rule::NonEmpty]).deny_unknown();
        let errors = schema.errors(&json!({"name": "Tigers", "id": 4}));
        assert_eq!(errors, vec![FieldError::new("id", "is not an allowed field")]);
    }

    #[test]
    fn not_null_allows_absence_but_not_null() {
        let schema = Schema::new().field("name", &[Rule::NotNull, Rule::NonEmpty]);
        assert!(schema.errors(&json!({})).is_empty());
        assert_eq!(
            schema.errors(&json!({"name": null})),
            vec![FieldError::new("name", "must not be null")]
        );
    }

    #[test]
    fn non_object_body_is_rejected() {
        let errors = mark_schema().errors(&json!([1, 2, 3]));
        assert_eq!(errors[0].field, "body");
    }

    #[test]
    fn email_rule() {
        assert!(looks_like_email("coach@club.org"));
        assert!(!looks_like_email("coach@club"));
        assert!(!looks_like_email("@club.org"));
        assert!(!looks_like_email("coach.club.org"));
    }

    #[test]
    fn parse_returns_typed_payload() {
        #[derive(Debug, Deserialize)]
        struct Mark {
            children_id: u64,
            status: String,
        }

        let mark: Mark = mark_schema()
            .parse(json!({"children_id": 7, "date": "2025-06-10", "status": "present"}))
            .unwrap();
        assert_eq!(mark.children_id, 7);
        assert_eq!(mark.status, "present");

        let err = mark_schema().parse::<Mark>(json!({"status": "present"})).unwrap_err();
        assert!(matches!(err, AppError::Validation(errors) if errors.len() == 2));
    }
}
