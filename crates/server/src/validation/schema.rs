//! Declarative request schemas interpreted at the API boundary.
//!
//! A schema describes the shape a JSON body must have. Validating a payload
//! either yields the normalized form (trimmed strings, lowercasing, defaults
//! filled in, canonical uuid/datetime text) or an ordered list of field
//! errors. A payload is never partially accepted: callers get the whole
//! normalized body or the whole error list.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;
use uuid::Uuid;

/// One rejected field: a dotted path (array indices inline, e.g. `tags.1`)
/// and a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A declarative constraint on one JSON value.
#[derive(Debug, Clone)]
pub enum Schema {
    String(StringSchema),
    Number(NumberSchema),
    Boolean,
    Uuid,
    DateTime,
    Enum(&'static [&'static str]),
    Array(Box<ArraySchema>),
    Object(Box<ObjectSchema>),
}

impl Schema {
    pub fn string() -> StringSchema {
        StringSchema::default()
    }

    pub fn number() -> NumberSchema {
        NumberSchema::default()
    }

    pub fn integer() -> NumberSchema {
        NumberSchema {
            integer: true,
            ..NumberSchema::default()
        }
    }

    pub fn boolean() -> Schema {
        Schema::Boolean
    }

    pub fn uuid() -> Schema {
        Schema::Uuid
    }

    pub fn datetime() -> Schema {
        Schema::DateTime
    }

    pub fn one_of(values: &'static [&'static str]) -> Schema {
        Schema::Enum(values)
    }

    pub fn array(item: impl Into<Schema>) -> ArraySchema {
        ArraySchema {
            item: item.into(),
            min_items: None,
            max_items: None,
        }
    }

    pub fn object() -> ObjectSchema {
        ObjectSchema::default()
    }

    /// Validate `value` at `path`, appending any errors and returning the
    /// normalized value when this node accepted its input.
    fn validate_at(&self, path: &str, value: &Value, errors: &mut Vec<FieldError>) -> Option<Value> {
        match self {
            Schema::String(s) => s.validate_at(path, value, errors),
            Schema::Number(s) => s.validate_at(path, value, errors),
            Schema::Boolean => match value {
                Value::Bool(b) => Some(Value::Bool(*b)),
                _ => {
                    errors.push(FieldError::new(path, "expected a boolean"));
                    None
                }
            },
            Schema::Uuid => match value.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok()) {
                Some(id) => Some(Value::String(id.to_string())),
                None => {
                    errors.push(FieldError::new(path, "expected a UUID"));
                    None
                }
            },
            Schema::DateTime => match value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            {
                Some(dt) => Some(Value::String(
                    dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, true),
                )),
                None => {
                    errors.push(FieldError::new(path, "expected an RFC 3339 datetime"));
                    None
                }
            },
            Schema::Enum(values) => match value.as_str() {
                Some(s) if values.iter().any(|v| *v == s) => Some(Value::String(s.to_string())),
                _ => {
                    errors.push(FieldError::new(
                        path,
                        format!("must be one of: {}", values.join(", ")),
                    ));
                    None
                }
            },
            Schema::Array(s) => s.validate_at(path, value, errors),
            Schema::Object(s) => s.validate_at(path, value, errors),
        }
    }
}

/// String constraints. Length limits apply after trimming/lowercasing.
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    trim: bool,
    lowercase: bool,
    min_len: Option<usize>,
    max_len: Option<usize>,
    checks: Vec<(fn(&str) -> bool, &'static str)>,
}

impl StringSchema {
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub fn min_len(mut self, len: usize) -> Self {
        self.min_len = Some(len);
        self
    }

    pub fn max_len(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    /// Custom predicate over the normalized string.
    pub fn check(mut self, predicate: fn(&str) -> bool, message: &'static str) -> Self {
        self.checks.push((predicate, message));
        self
    }

    fn validate_at(&self, path: &str, value: &Value, errors: &mut Vec<FieldError>) -> Option<Value> {
        let Some(raw) = value.as_str() else {
            errors.push(FieldError::new(path, "expected a string"));
            return None;
        };

        let mut normalized = if self.trim { raw.trim().to_string() } else { raw.to_string() };
        if self.lowercase {
            normalized = normalized.to_lowercase();
        }

        let before = errors.len();
        let chars = normalized.chars().count();
        if let Some(min) = self.min_len {
            if chars < min {
                errors.push(FieldError::new(
                    path,
                    format!("must be at least {min} characters"),
                ));
            }
        }
        if let Some(max) = self.max_len {
            if chars > max {
                errors.push(FieldError::new(
                    path,
                    format!("must be at most {max} characters"),
                ));
            }
        }
        for (predicate, message) in &self.checks {
            if !predicate(&normalized) {
                errors.push(FieldError::new(path, *message));
            }
        }

        (errors.len() == before).then_some(Value::String(normalized))
    }
}

/// Numeric constraints. `integer` additionally rejects fractional values and
/// normalizes to an integer JSON number.
#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    integer: bool,
    min: Option<f64>,
    max: Option<f64>,
}

impl NumberSchema {
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    fn validate_at(&self, path: &str, value: &Value, errors: &mut Vec<FieldError>) -> Option<Value> {
        let Some(n) = value.as_f64() else {
            errors.push(FieldError::new(
                path,
                if self.integer { "expected an integer" } else { "expected a number" },
            ));
            return None;
        };

        if self.integer && n.fract() != 0.0 {
            errors.push(FieldError::new(path, "expected an integer"));
            return None;
        }

        let before = errors.len();
        if let Some(min) = self.min {
            if n < min {
                errors.push(FieldError::new(path, format!("must be at least {min}")));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                errors.push(FieldError::new(path, format!("must be at most {max}")));
            }
        }
        if errors.len() != before {
            return None;
        }

        if self.integer {
            Some(Value::from(n as i64))
        } else {
            Some(value.clone())
        }
    }
}

/// Array constraints; every element is validated against `item` and errors
/// carry the element index in their path.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    item: Schema,
    min_items: Option<usize>,
    max_items: Option<usize>,
}

impl ArraySchema {
    pub fn min_items(mut self, len: usize) -> Self {
        self.min_items = Some(len);
        self
    }

    pub fn max_items(mut self, len: usize) -> Self {
        self.max_items = Some(len);
        self
    }

    fn validate_at(&self, path: &str, value: &Value, errors: &mut Vec<FieldError>) -> Option<Value> {
        let Some(items) = value.as_array() else {
            errors.push(FieldError::new(path, "expected an array"));
            return None;
        };

        let before = errors.len();
        if let Some(min) = self.min_items {
            if items.len() < min {
                errors.push(FieldError::new(path, format!("must have at least {min} items")));
            }
        }
        if let Some(max) = self.max_items {
            if items.len() > max {
                errors.push(FieldError::new(path, format!("must have at most {max} items")));
            }
        }

        let mut normalized = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let item_path = join_path(path, &i.to_string());
            if let Some(v) = self.item.validate_at(&item_path, item, errors) {
                normalized.push(v);
            }
        }

        (errors.len() == before).then_some(Value::Array(normalized))
    }
}

/// A cross-field constraint checked against the normalized object once all
/// field-level checks have passed.
#[derive(Debug, Clone)]
struct Refinement {
    path: &'static str,
    message: &'static str,
    check: fn(&Map<String, Value>) -> bool,
}

/// Field declaration order is preserved so rejection lists come back in a
/// stable, declaration-ordered sequence.
#[derive(Debug, Clone)]
struct Field {
    name: &'static str,
    schema: Schema,
    required: bool,
    default: Option<Value>,
}

/// Schema for a JSON object body. One static instance per API operation.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<Field>,
    strict: bool,
    refinements: Vec<Refinement>,
}

impl ObjectSchema {
    /// Declare a required field.
    pub fn field(mut self, name: &'static str, schema: impl Into<Schema>) -> Self {
        self.fields.push(Field {
            name,
            schema: schema.into(),
            required: true,
            default: None,
        });
        self
    }

    /// Declare an optional field; omitted means absent from the output.
    pub fn optional(mut self, name: &'static str, schema: impl Into<Schema>) -> Self {
        self.fields.push(Field {
            name,
            schema: schema.into(),
            required: false,
            default: None,
        });
        self
    }

    /// Declare an optional field that defaults when omitted. The default is
    /// itself run through the field schema, so output stays normalized.
    pub fn optional_with_default(
        mut self,
        name: &'static str,
        schema: impl Into<Schema>,
        default: Value,
    ) -> Self {
        self.fields.push(Field {
            name,
            schema: schema.into(),
            required: false,
            default: Some(default),
        });
        self
    }

    /// Reject payloads carrying keys not declared here. Without this,
    /// undeclared keys are silently stripped.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Add a cross-field refinement. Refinements only run once every
    /// field-level check passed, so their errors never duplicate field ones.
    pub fn refine(
        mut self,
        path: &'static str,
        message: &'static str,
        check: fn(&Map<String, Value>) -> bool,
    ) -> Self {
        self.refinements.push(Refinement { path, message, check });
        self
    }

    /// Validate a request body against this schema.
    ///
    /// `null` (or an absent body) is treated as an empty object: it
    /// normalizes cleanly when nothing is required and rejects with one
    /// error per missing required field otherwise.
    pub fn validate(&self, body: &Value) -> Result<Value, Vec<FieldError>> {
        let mut errors = Vec::new();
        let normalized = self.validate_at("", body, &mut errors);

        match normalized {
            Some(Value::Object(map)) if errors.is_empty() => {
                for refinement in &self.refinements {
                    if !(refinement.check)(&map) {
                        errors.push(FieldError::new(refinement.path, refinement.message));
                    }
                }
                if errors.is_empty() {
                    Ok(Value::Object(map))
                } else {
                    Err(errors)
                }
            }
            _ => Err(errors),
        }
    }

    fn validate_at(&self, path: &str, value: &Value, errors: &mut Vec<FieldError>) -> Option<Value> {
        let empty = Map::new();
        let input = match value {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                errors.push(FieldError::new(path, "expected an object"));
                return None;
            }
        };

        let before = errors.len();
        let mut output = Map::new();

        for field in &self.fields {
            let field_path = join_path(path, field.name);
            let provided = input.get(field.name).filter(|v| !v.is_null());

            match (provided, &field.default) {
                (Some(v), _) => {
                    if let Some(normalized) = field.schema.validate_at(&field_path, v, errors) {
                        output.insert(field.name.to_string(), normalized);
                    }
                }
                (None, Some(default)) => {
                    if let Some(normalized) =
                        field.schema.validate_at(&field_path, default, errors)
                    {
                        output.insert(field.name.to_string(), normalized);
                    }
                }
                (None, None) if field.required => {
                    errors.push(FieldError::new(&field_path, "is required"));
                }
                (None, None) => {}
            }
        }

        if self.strict {
            for key in input.keys() {
                if !self.fields.iter().any(|f| f.name == key) {
                    errors.push(FieldError::new(
                        join_path(path, key),
                        "unrecognized field",
                    ));
                }
            }
        }

        (errors.len() == before).then_some(Value::Object(output))
    }
}

impl From<StringSchema> for Schema {
    fn from(s: StringSchema) -> Self {
        Schema::String(s)
    }
}

impl From<NumberSchema> for Schema {
    fn from(s: NumberSchema) -> Self {
        Schema::Number(s)
    }
}

impl From<ArraySchema> for Schema {
    fn from(s: ArraySchema) -> Self {
        Schema::Array(Box::new(s))
    }
}

impl From<ObjectSchema> for Schema {
    fn from(s: ObjectSchema) -> Self {
        Schema::Object(Box::new(s))
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn person_schema() -> ObjectSchema {
        Schema::object()
            .field("name", Schema::string().trim().min_len(3))
            .field("age", Schema::number().min(18.0))
    }

    #[test]
    fn test_accepts_valid_payload() {
        let schema = Schema::object()
            .field("name", Schema::string())
            .field("age", Schema::number());
        let normalized = schema.validate(&json!({"name": "John", "age": 30})).unwrap();
        assert_eq!(normalized, json!({"name": "John", "age": 30}));
    }

    #[test]
    fn test_rejects_with_one_error_per_invalid_field() {
        let errors = person_schema()
            .validate(&json!({"name": "Jo", "age": 15}))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, "name");
        assert_eq!(errors[1].path, "age");
    }

    #[test]
    fn test_missing_required_field_reports_path() {
        let errors = person_schema().validate(&json!({"age": 30})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "name");
        assert_eq!(errors[0].message, "is required");
    }

    #[test]
    fn test_null_body_rejected_when_fields_required() {
        let errors = person_schema().validate(&Value::Null).unwrap_err();
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "age"]);
    }

    #[test]
    fn test_null_body_normalizes_when_nothing_required() {
        let schema = Schema::object()
            .optional_with_default("limit", Schema::integer().min(1.0), json!(50));
        let normalized = schema.validate(&Value::Null).unwrap();
        assert_eq!(normalized, json!({"limit": 50}));
    }

    #[test]
    fn test_non_object_body_rejected_at_root() {
        let errors = person_schema().validate(&json!("nope")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "");
    }

    #[test]
    fn test_omitted_optional_without_default_stays_absent() {
        let schema = Schema::object()
            .field("name", Schema::string())
            .optional("notes", Schema::string());
        let normalized = schema.validate(&json!({"name": "Ada"})).unwrap();
        assert!(normalized.get("notes").is_none());
    }

    #[test]
    fn test_default_is_normalized_through_field_schema() {
        let schema = Schema::object().optional_with_default(
            "severity",
            Schema::one_of(&["low", "moderate", "high"]),
            json!("moderate"),
        );
        let normalized = schema.validate(&json!({})).unwrap();
        assert_eq!(normalized, json!({"severity": "moderate"}));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let schema = Schema::object()
            .field("email", Schema::string().trim().lowercase());
        let once = schema
            .validate(&json!({"email": "  Ada@Example.COM "}))
            .unwrap();
        let twice = schema.validate(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, json!({"email": "ada@example.com"}));
    }

    #[test]
    fn test_nested_object_errors_report_full_path() {
        let schema = Schema::object().field(
            "guardian",
            Schema::object()
                .field("name", Schema::string().min_len(1))
                .optional("email", Schema::string().check(|s| s.contains('@'), "must be a valid email address")),
        );
        let errors = schema
            .validate(&json!({"guardian": {"name": "", "email": "nope"}}))
            .unwrap_err();
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["guardian.name", "guardian.email"]);
    }

    #[test]
    fn test_array_element_errors_report_index() {
        let schema =
            Schema::object().field("tags", Schema::array(Schema::string().min_len(1)));
        let errors = schema
            .validate(&json!({"tags": ["ok", "", "also ok"]}))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "tags.1");
    }

    #[test]
    fn test_strict_mode_rejects_unknown_keys() {
        let schema = Schema::object().field("name", Schema::string()).strict();
        let errors = schema
            .validate(&json!({"name": "Ada", "surprise": true}))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "surprise");
    }

    #[test]
    fn test_strip_mode_drops_unknown_keys() {
        let schema = Schema::object().field("name", Schema::string());
        let normalized = schema
            .validate(&json!({"name": "Ada", "surprise": true}))
            .unwrap();
        assert_eq!(normalized, json!({"name": "Ada"}));
    }

    #[test]
    fn test_enum_rejects_unknown_variant() {
        let schema = Schema::object().field("kind", Schema::one_of(&["positive", "negative"]));
        let errors = schema.validate(&json!({"kind": "sideways"})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "kind");
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let schema = Schema::object().field("grade_level", Schema::integer());
        assert!(schema.validate(&json!({"grade_level": 4.5})).is_err());
        let normalized = schema.validate(&json!({"grade_level": 4.0})).unwrap();
        assert_eq!(normalized, json!({"grade_level": 4}));
    }

    #[test]
    fn test_refinement_failure_reported_at_declared_path() {
        let schema = Schema::object()
            .field("score", Schema::number().min(0.0))
            .optional_with_default("max_score", Schema::number(), json!(100))
            .refine("score", "must not exceed max_score", |obj| {
                match (
                    obj.get("score").and_then(Value::as_f64),
                    obj.get("max_score").and_then(Value::as_f64),
                ) {
                    (Some(score), Some(max)) => score <= max,
                    _ => true,
                }
            });

        let errors = schema
            .validate(&json!({"score": 120, "max_score": 100}))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "score");
        assert_eq!(errors[0].message, "must not exceed max_score");
    }

    #[test]
    fn test_refinement_skipped_when_field_checks_fail() {
        let schema = Schema::object()
            .field("score", Schema::number().min(0.0))
            .field("max_score", Schema::number())
            .refine("score", "must not exceed max_score", |_| false);

        let errors = schema
            .validate(&json!({"score": -1, "max_score": 100}))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "score");
        assert_eq!(errors[0].message, "must be at least 0");
    }

    #[test]
    fn test_uuid_and_datetime_normalize_to_canonical_text() {
        let schema = Schema::object()
            .field("student_id", Schema::uuid())
            .field("occurred_at", Schema::datetime());
        let normalized = schema
            .validate(&json!({
                "student_id": "67E55044-10B1-426F-9247-BB680E5FE0C8",
                "occurred_at": "2026-03-01T09:30:00+01:00",
            }))
            .unwrap();
        assert_eq!(
            normalized["student_id"],
            json!("67e55044-10b1-426f-9247-bb680e5fe0c8")
        );
        assert_eq!(normalized["occurred_at"], json!("2026-03-01T08:30:00Z"));

        let twice = schema.validate(&normalized).unwrap();
        assert_eq!(normalized, twice);
    }

    #[test]
    fn test_explicit_null_treated_as_omitted() {
        let schema = Schema::object()
            .field("name", Schema::string())
            .optional("notes", Schema::string());
        let normalized = schema
            .validate(&json!({"name": "Ada", "notes": null}))
            .unwrap();
        assert!(normalized.get("notes").is_none());
    }
}
