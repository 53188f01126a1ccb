//! Declarative field validation.
//!
//! An entity's descriptor carries a list of [`Rule`]s. `Entity::validate(tag)`
//! builds a [`Validator`] from the rules that apply to `tag` and runs it over the
//! entity's current field values.
//!
//! ```ignore
//! use lorm::validate::{Check, Rule};
//!
//! fn person_rules() -> Vec<Rule> {
//!     vec![
//!         Rule::new("name", Check::Required),
//!         Rule::new("name", Check::MaxLen(64)),
//!         Rule::new("email", Check::Email).on("register"),
//!     ]
//! }
//! ```
//!
//! Every check except [`Check::Required`] passes on NULL: absence is only an
//! error when a field is required.

use crate::changeset::{ValidationCode, ValidationError, ValidationErrors};
use crate::record::Record;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

/// What a rule checks.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Not NULL and not an empty string.
    Required,
    /// At least this many characters.
    MinLen(usize),
    /// At most this many characters.
    MaxLen(usize),
    Email,
    Url,
    Uuid,
    /// Text matches the pattern.
    Regex(String),
    /// Numeric value within the inclusive bounds.
    Range { min: Option<f64>, max: Option<f64> },
    /// Text is one of the listed values.
    OneOf(Vec<String>),
    /// An integer, or text that parses as one.
    Integer,
}

/// A check bound to a field, optionally restricted to some tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub field: String,
    pub check: Check,
    /// Tags this rule runs under; empty means every tag.
    pub on: Vec<String>,
    /// Overrides the default failure message.
    pub message: Option<String>,
}

impl Rule {
    pub fn new(field: impl Into<String>, check: Check) -> Self {
        Self {
            field: field.into(),
            check,
            on: Vec::new(),
            message: None,
        }
    }

    /// Restrict the rule to `tag`. Repeatable.
    pub fn on(mut self, tag: impl Into<String>) -> Self {
        self.on.push(tag.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether the rule runs for `tag`. `None` and an empty tag run everything.
    pub fn applies_to(&self, tag: Option<&str>) -> bool {
        match tag {
            None | Some("") => true,
            Some(tag) => self.on.is_empty() || self.on.iter().any(|t| t == tag),
        }
    }

    fn check(&self, value: &Value) -> Result<(), ValidationError> {
        let fail = |code: ValidationCode, default: String| {
            Err(ValidationError::new(
                &self.field,
                code,
                self.message.clone().unwrap_or(default),
            ))
        };

        if matches!(self.check, Check::Required) {
            return match value {
                Value::Null => fail(ValidationCode::Required, "is required".to_string()),
                Value::Text(s) if s.trim().is_empty() => {
                    fail(ValidationCode::Required, "is required".to_string())
                }
                _ => Ok(()),
            };
        }
        if value.is_null() {
            return Ok(());
        }

        let text = value_text(value);
        match &self.check {
            Check::Required => Ok(()),
            Check::MinLen(min) => {
                if text.chars().count() < *min {
                    fail(ValidationCode::Len, format!("must be at least {min} characters"))
                        .map_err(|e| e.with_metadata("min", *min as u64))
                } else {
                    Ok(())
                }
            }
            Check::MaxLen(max) => {
                if text.chars().count() > *max {
                    fail(ValidationCode::Len, format!("must be at most {max} characters"))
                        .map_err(|e| e.with_metadata("max", *max as u64))
                } else {
                    Ok(())
                }
            }
            Check::Email if !is_email(&text) => {
                fail(ValidationCode::Email, "is not a valid email".to_string())
            }
            Check::Url if !is_url(&text) => {
                fail(ValidationCode::Url, "is not a valid url".to_string())
            }
            Check::Uuid if !is_uuid(&text) => {
                fail(ValidationCode::Uuid, "is not a valid uuid".to_string())
            }
            Check::Regex(pattern) => match regex_is_match(pattern, &text) {
                Some(true) => Ok(()),
                Some(false) => fail(ValidationCode::Regex, "has an invalid format".to_string()),
                None => fail(
                    ValidationCode::Regex,
                    format!("pattern {pattern:?} is not a valid regex"),
                ),
            },
            Check::Range { min, max } => {
                let number = value.as_f64().or_else(|| text.trim().parse::<f64>().ok());
                let within = number.is_some_and(|n| {
                    min.is_none_or(|min| n >= min) && max.is_none_or(|max| n <= max)
                });
                if within {
                    Ok(())
                } else {
                    let mut err = ValidationError::new(
                        &self.field,
                        ValidationCode::Range,
                        self.message.clone().unwrap_or_else(|| "is out of range".to_string()),
                    );
                    if let Some(min) = min {
                        err = err.with_metadata("min", *min);
                    }
                    if let Some(max) = max {
                        err = err.with_metadata("max", *max);
                    }
                    Err(err)
                }
            }
            Check::OneOf(allowed) if !allowed.iter().any(|a| *a == text) => {
                fail(ValidationCode::OneOf, "is not an allowed value".to_string())
            }
            Check::Integer => match value {
                Value::Integer(_) => Ok(()),
                Value::Text(s) if s.trim().parse::<i64>().is_ok() => Ok(()),
                _ => fail(ValidationCode::Integer, "must be an integer".to_string()),
            },
            Check::Email | Check::Url | Check::Uuid | Check::OneOf(_) => Ok(()),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        other => other.to_string(),
    }
}

/// Runs a rule set over a record and keeps the failures.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: Vec<Rule>,
    errors: ValidationErrors,
}

impl Validator {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            errors: ValidationErrors::default(),
        }
    }

    /// Validator over the rules of `rules` that apply to `tag`.
    pub fn for_tag(rules: &[Rule], tag: Option<&str>) -> Self {
        Self::new(
            rules
                .iter()
                .filter(|r| r.applies_to(tag))
                .cloned()
                .collect(),
        )
    }

    /// Check `record`, replacing any previous errors. Fields missing from the
    /// record are treated as NULL.
    pub fn run(&mut self, record: &Record) -> bool {
        self.errors = ValidationErrors::default();
        for rule in &self.rules {
            let value = record.get(&rule.field).unwrap_or(&Value::Null);
            if let Err(err) = rule.check(value) {
                self.errors.push(err);
            }
        }
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }
}

/// Best-effort email validation.
pub fn is_email(s: &str) -> bool {
    static EMAIL_RE: OnceLock<regex::Regex> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| {
            regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid built-in email regex")
        })
        .is_match(s)
}

/// Match `value` against `pattern`, compiling each pattern once.
///
/// Returns `None` when the pattern does not compile.
pub fn regex_is_match(pattern: &str, value: &str) -> Option<bool> {
    static CACHE: OnceLock<Mutex<HashMap<String, regex::Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let regex = {
        let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        match cache.get(pattern) {
            Some(re) => re.clone(),
            None => {
                let re = regex::Regex::new(pattern).ok()?;
                cache.insert(pattern.to_string(), re.clone());
                re
            }
        }
    };

    Some(regex.is_match(value))
}

pub fn is_url(s: &str) -> bool {
    url::Url::parse(s).is_ok()
}

pub fn is_uuid(s: &str) -> bool {
    uuid::Uuid::parse_str(s).is_ok()
}
