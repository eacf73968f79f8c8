//! Request body validation.
//!
//! Every POST route accepts a JSON object with one required string field.
//! The checked routes report shape problems as 400s with fixed messages; the
//! rest report them as a 422 `detail` list. [`RequestShape`] captures both so
//! the handlers only see a validated string.

use serde_json::{Map, Value, json};

use crate::error::ApiError;

/// How shape violations are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStyle {
    /// 400 with a single fixed message.
    Checked,
    /// 422 with every violation listed.
    Typed,
}

/// A single problem with a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub field: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    InvalidJson,
    NotAnObject,
    Missing,
    WrongType,
}

impl Violation {
    fn new(kind: ViolationKind, field: &'static str) -> Self {
        Self { kind, field }
    }

    /// Message used by [`ValidationStyle::Checked`] routes.
    pub fn checked_message(&self) -> String {
        match self.kind {
            ViolationKind::InvalidJson => "Invalid JSON".to_string(),
            // parseable JSON without the key, objects or not
            ViolationKind::NotAnObject | ViolationKind::Missing => {
                format!("Missing '{}' key", self.field)
            }
            ViolationKind::WrongType => format!("'{}' must be a string", self.field),
        }
    }

    /// Entry of a 422 `detail` list.
    pub fn to_json(&self) -> Value {
        let (loc, msg, kind) = match self.kind {
            ViolationKind::InvalidJson => (json!(["body"]), "JSON decode error", "json_invalid"),
            ViolationKind::NotAnObject => (
                json!(["body"]),
                "Input should be a valid dictionary or object to extract fields from",
                "model_attributes_type",
            ),
            ViolationKind::Missing => (json!(["body", self.field]), "Field required", "missing"),
            ViolationKind::WrongType => {
                (json!(["body", self.field]), "Input should be a valid string", "string_type")
            }
        };
        json!({ "loc": loc, "msg": msg, "type": kind })
    }
}

/// Expected body of a route: `{"<field>": "<string>"}`.
#[derive(Debug, Clone, Copy)]
pub struct RequestShape {
    pub field: &'static str,
    pub style: ValidationStyle,
    /// When set, a blank (whitespace-only) value is rejected with this 400 message.
    pub blank_message: Option<&'static str>,
    /// Strip surrounding whitespace from the extracted value.
    pub trim: bool,
}

impl RequestShape {
    pub const fn checked(field: &'static str) -> Self {
        Self { field, style: ValidationStyle::Checked, blank_message: None, trim: false }
    }

    pub const fn typed(field: &'static str) -> Self {
        Self { field, style: ValidationStyle::Typed, blank_message: None, trim: false }
    }

    pub const fn reject_blank(self, message: &'static str) -> Self {
        Self { blank_message: Some(message), ..self }
    }

    pub const fn trimmed(self) -> Self {
        Self { trim: true, ..self }
    }

    /// Collect every shape violation of `body`. Empty means the body is valid.
    pub fn validate(&self, body: &[u8]) -> Vec<Violation> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => self.validate_object(&map),
            Ok(_) => vec![Violation::new(ViolationKind::NotAnObject, self.field)],
            Err(_) => vec![Violation::new(ViolationKind::InvalidJson, self.field)],
        }
    }

    fn validate_object(&self, map: &Map<String, Value>) -> Vec<Violation> {
        match map.get(self.field) {
            None => vec![Violation::new(ViolationKind::Missing, self.field)],
            Some(Value::String(_)) => Vec::new(),
            Some(_) => vec![Violation::new(ViolationKind::WrongType, self.field)],
        }
    }

    /// Validate `body` and return the field value, or the error response.
    pub fn extract(&self, body: &[u8]) -> Result<String, ApiError> {
        let violations = self.validate(body);
        if let Some(first) = violations.first() {
            return Err(match self.style {
                ValidationStyle::Checked => ApiError::bad_request(first.checked_message()),
                ValidationStyle::Typed => ApiError::Unprocessable(violations),
            });
        }

        let value = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| v.get(self.field).and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();

        match self.blank_message {
            Some(message) if value.trim().is_empty() => Err(ApiError::bad_request(message)),
            _ if self.trim => Ok(value.trim().to_string()),
            _ => Ok(value),
        }
    }
}
