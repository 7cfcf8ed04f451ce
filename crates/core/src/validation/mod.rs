//! Form validation driven by explicit field schemas.
//!
//! Every form the service accepts (recipient, parcel, address, signup) is
//! described by a static table of [`FieldSpec`]s. A form type exposes its
//! values through [`Form`], and [`validate`] walks the table collecting one
//! message per failing field.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("email pattern is valid")
});

/// Minimum password length accepted at signup and on password change.
pub const MIN_PASSWORD_LEN: usize = 6;

/// How a field is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-blank text.
    Text,
    /// Non-blank text shaped like `local@domain.tld`.
    Email,
    /// Text of at least [`MIN_PASSWORD_LEN`] characters.
    Password,
    /// A number strictly greater than zero.
    PositiveNumber,
}

/// One entry in a form schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind }
    }

    /// Check a single value against this field, returning the error message on failure.
    pub fn check(&self, value: FieldValue<'_>) -> Option<String> {
        match (self.kind, value) {
            (FieldKind::PositiveNumber, FieldValue::Number(n)) => {
                if n.is_finite() && n > 0.0 {
                    None
                } else {
                    Some("Must be positive".to_string())
                }
            }
            (FieldKind::PositiveNumber, FieldValue::Text(_)) => {
                Some("Must be a number".to_string())
            }
            (_, FieldValue::Number(_)) => Some("Must be text".to_string()),
            (kind, FieldValue::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Some("Required".to_string());
                }
                match kind {
                    FieldKind::Email if !is_valid_email(text) => {
                        Some("Invalid email address".to_string())
                    }
                    FieldKind::Password if text.chars().count() < MIN_PASSWORD_LEN => Some(
                        format!("Must be at least {} characters", MIN_PASSWORD_LEN),
                    ),
                    _ => None,
                }
            }
        }
    }
}

/// A borrowed field value handed to the validator.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
}

/// A form whose fields can be looked up by schema name.
pub trait Form {
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

pub const ADDRESS_FORM: &[FieldSpec] = &[
    FieldSpec::new("street", "Street", FieldKind::Text),
    FieldSpec::new("city", "City", FieldKind::Text),
    FieldSpec::new("state", "State", FieldKind::Text),
    FieldSpec::new("zip_code", "Zip code", FieldKind::Text),
    FieldSpec::new("country", "Country", FieldKind::Text),
];

/// The part of an address a route lookup needs.
pub const LOCALITY_FORM: &[FieldSpec] = &[
    FieldSpec::new("city", "City", FieldKind::Text),
    FieldSpec::new("country", "Country", FieldKind::Text),
];

pub const RECIPIENT_FORM: &[FieldSpec] = &[
    FieldSpec::new("first_name", "First name", FieldKind::Text),
    FieldSpec::new("last_name", "Last name", FieldKind::Text),
    FieldSpec::new("email", "Email", FieldKind::Email),
    FieldSpec::new("phone_number", "Phone number", FieldKind::Text),
    FieldSpec::new("street", "Street", FieldKind::Text),
    FieldSpec::new("city", "City", FieldKind::Text),
    FieldSpec::new("state", "State", FieldKind::Text),
    FieldSpec::new("zip_code", "Zip code", FieldKind::Text),
    FieldSpec::new("country", "Country", FieldKind::Text),
];

pub const PARCEL_FORM: &[FieldSpec] = &[
    FieldSpec::new("length", "Length", FieldKind::PositiveNumber),
    FieldSpec::new("width", "Width", FieldKind::PositiveNumber),
    FieldSpec::new("height", "Height", FieldKind::PositiveNumber),
    FieldSpec::new("weight", "Weight", FieldKind::PositiveNumber),
];

pub const SIGNUP_FORM: &[FieldSpec] = &[
    FieldSpec::new("first_name", "First name", FieldKind::Text),
    FieldSpec::new("last_name", "Last name", FieldKind::Text),
    FieldSpec::new("email", "Email", FieldKind::Email),
    FieldSpec::new("password", "Password", FieldKind::Password),
];

/// Field name to message, ordered by name for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build errors containing a single field message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Merge `other` into `self` as is.
    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    /// Merge `other` into `self`, prefixing its field names with `prefix.`.
    pub fn merge_prefixed(&mut self, prefix: &str, other: FieldErrors) {
        for (field, message) in other.0 {
            self.0.insert(format!("{}.{}", prefix, field), message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when no field failed.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Validate `form` against `schema`, collecting every failing field.
pub fn validate<F: Form + ?Sized>(form: &F, schema: &[FieldSpec]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for spec in schema {
        let message = match form.field(spec.name) {
            Some(value) => spec.check(value),
            None => Some("Required".to_string()),
        };
        if let Some(message) = message {
            errors.insert(spec.name, message);
        }
    }
    errors
}

/// Validate only the text fields that were supplied, as in a partial update.
///
/// Fields whose value is `None` are skipped; names missing from `schema` are ignored.
pub fn validate_supplied(schema: &[FieldSpec], supplied: &[(&str, Option<&str>)]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (name, value) in supplied {
        let (Some(value), Some(spec)) = (value, schema.iter().find(|s| s.name == *name)) else {
            continue;
        };
        if let Some(message) = spec.check(FieldValue::Text(value)) {
            errors.insert(*name, message);
        }
    }
    errors
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}
