//! Form field validation.
//!
//! DESIGN
//! ======
//! Rules mirror what the admin forms enforce client-side. `false` and `0` are
//! present values; empty text, missing keys, `null` and NaN are absent. An
//! absent optional field passes without further checks. Otherwise rules run
//! in a fixed order and the first failure wins.

#[cfg(test)]
#[path = "validate_test.rs"]
mod validate_test;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
pub const INVALID_EMAIL: &str = "Please enter a valid email address";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Password,
    Number,
    Textarea,
    Select,
    Checkbox,
    Date,
}

/// Optional constraints; unset rules are skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Only applied to [`FieldKind::Number`].
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Unanchored regex search.
    pub pattern: Option<String>,
    /// Replaces the default message of the length, range and pattern rules.
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub rules: FieldRules,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), label: label.into(), kind, required: false, rules: FieldRules::default() }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn min_length(mut self, n: usize) -> Self {
        self.rules.min_length = Some(n);
        self
    }

    #[must_use]
    pub fn max_length(mut self, n: usize) -> Self {
        self.rules.max_length = Some(n);
        self
    }

    #[must_use]
    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.rules.min = min;
        self.rules.max = max;
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.rules.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.rules.message = Some(message.into());
        self
    }
}

/// A form input as the validator sees it.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Missing,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl FieldValue {
    fn is_present(&self) -> bool {
        match self {
            Self::Missing => false,
            Self::Text(s) => !s.is_empty(),
            Self::Number(n) => !n.is_nan(),
            Self::Bool(_) => true,
        }
    }

    fn as_text(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    /// Numeric reading; unparseable text is NaN, which fails no comparison.
    fn as_number(&self) -> f64 {
        match self {
            Self::Missing => f64::NAN,
            Self::Number(n) => *n,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() { 0.0 } else { s.parse().unwrap_or(f64::NAN) }
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for FieldValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}

impl From<&Value> for FieldValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => Self::Missing,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Self::Missing, Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Validate one value. Returns the first failing rule's message.
#[must_use]
pub fn validate(field: &FieldDef, value: &FieldValue) -> Option<String> {
    if !value.is_present() {
        return field.required.then(|| format!("{} is required", field.label));
    }

    let label = &field.label;
    let rules = &field.rules;
    let text = value.as_text();
    let custom = |default: String| Some(rules.message.clone().filter(|m| !m.is_empty()).unwrap_or(default));

    if let Some(min) = rules.min_length.filter(|n| *n > 0) {
        if text.chars().count() < min {
            return custom(format!("{label} must be at least {min} characters"));
        }
    }
    if let Some(max) = rules.max_length.filter(|n| *n > 0) {
        if text.chars().count() > max {
            return custom(format!("{label} must be at most {max} characters"));
        }
    }
    if field.kind == FieldKind::Number {
        let n = value.as_number();
        if let Some(min) = rules.min {
            if n < min {
                return custom(format!("{label} must be at least {min}"));
            }
        }
        if let Some(max) = rules.max {
            if n > max {
                return custom(format!("{label} must be at most {max}"));
            }
        }
    }
    if let Some(pattern) = rules.pattern.as_deref().filter(|p| !p.is_empty()) {
        let matched = match Regex::new(pattern) {
            Ok(re) => re.is_match(&text),
            Err(e) => {
                warn!(field = %field.name, error = %e, "invalid validation pattern");
                false
            }
        };
        if !matched {
            return custom(format!("{label} format is invalid"));
        }
    }
    if field.kind == FieldKind::Email && !text.is_empty() && !is_email(&text) {
        return Some(INVALID_EMAIL.to_owned());
    }
    None
}

/// Validate every field of `schema` against `data`, keyed by field name.
/// Only failing fields appear in the result.
#[must_use]
pub fn validate_form(schema: &[FieldDef], data: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    schema
        .iter()
        .filter_map(|field| {
            let value = data.get(&field.name).map_or(FieldValue::Missing, FieldValue::from);
            validate(field, &value).map(|err| (field.name.clone(), err))
        })
        .collect()
}

fn is_email(text: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(text))
}
