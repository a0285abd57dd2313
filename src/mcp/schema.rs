//! Declarative input schemas for tools
//!
//! A `Schema` is data: the same value renders the JSON Schema advertised in
//! `tools/list` and drives the validator that runs before every handler.

use serde_json::{json, Map, Value};

use crate::error::FieldIssue;

/// A node of an input schema
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub description: Option<String>,
    pub kind: SchemaKind,
}

/// Shape and constraints of a schema node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Boolean,
    Enum {
        values: &'static [&'static str],
    },
    Array {
        items: Box<Schema>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        properties: Vec<Property>,
    },
}

/// A named member of an object schema
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: &'static str,
    pub schema: Schema,
    pub required: bool,
    pub default: Option<Value>,
}

impl Property {
    pub fn required(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            schema,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            schema,
            required: false,
            default: None,
        }
    }

    /// Value filled in when the caller omits this property
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            description: None,
            kind,
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String {
            min_length: None,
            max_length: None,
        })
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn enumeration(values: &'static [&'static str]) -> Self {
        Self::of(SchemaKind::Enum { values })
    }

    pub fn array(items: Schema) -> Self {
        Self::of(SchemaKind::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    pub fn object(properties: Vec<Property>) -> Self {
        Self::of(SchemaKind::Object { properties })
    }

    /// An object with no properties, for tools without arguments
    pub fn empty_object() -> Self {
        Self::object(Vec::new())
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Minimum length (strings, in UTF-16 code units) or item count (arrays)
    pub fn min(mut self, n: usize) -> Self {
        match &mut self.kind {
            SchemaKind::String { min_length, .. } => *min_length = Some(n),
            SchemaKind::Array { min_items, .. } => *min_items = Some(n),
            _ => {}
        }
        self
    }

    /// Maximum length (strings, in UTF-16 code units) or item count (arrays)
    pub fn max(mut self, n: usize) -> Self {
        match &mut self.kind {
            SchemaKind::String { max_length, .. } => *max_length = Some(n),
            SchemaKind::Array { max_items, .. } => *max_items = Some(n),
            _ => {}
        }
        self
    }

    /// Render as JSON Schema
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();

        match &self.kind {
            SchemaKind::String {
                min_length,
                max_length,
            } => {
                out.insert("type".into(), json!("string"));
                if let Some(n) = min_length {
                    out.insert("minLength".into(), json!(n));
                }
                if let Some(n) = max_length {
                    out.insert("maxLength".into(), json!(n));
                }
            }
            SchemaKind::Boolean => {
                out.insert("type".into(), json!("boolean"));
            }
            SchemaKind::Enum { values } => {
                out.insert("type".into(), json!("string"));
                out.insert("enum".into(), json!(values));
            }
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), items.to_json_schema());
                if let Some(n) = min_items {
                    out.insert("minItems".into(), json!(n));
                }
                if let Some(n) = max_items {
                    out.insert("maxItems".into(), json!(n));
                }
            }
            SchemaKind::Object { properties } => {
                out.insert("type".into(), json!("object"));
                let mut props = Map::new();
                for property in properties {
                    let mut rendered = property.schema.to_json_schema();
                    if let (Some(default), Value::Object(map)) = (&property.default, &mut rendered) {
                        map.insert("default".into(), default.clone());
                    }
                    props.insert(property.name.to_string(), rendered);
                }
                out.insert("properties".into(), Value::Object(props));
                let required: Vec<&str> = properties
                    .iter()
                    .filter(|p| p.required)
                    .map(|p| p.name)
                    .collect();
                if !required.is_empty() {
                    out.insert("required".into(), json!(required));
                }
            }
        }

        if let Some(description) = &self.description {
            out.insert("description".into(), json!(description));
        }

        Value::Object(out)
    }

    /// Check `value` against this schema.
    ///
    /// On success returns the normalized value: defaults filled in and keys the
    /// schema doesn't declare dropped. On failure returns every offending field.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        match self.check(value, "", &mut issues) {
            Some(normalized) if issues.is_empty() => Ok(normalized),
            _ => Err(issues),
        }
    }

    fn check(&self, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Option<Value> {
        let mut fail = |message: String| {
            issues.push(FieldIssue {
                path: path.to_string(),
                message,
            });
            None
        };

        match &self.kind {
            SchemaKind::String {
                min_length,
                max_length,
            } => {
                let Some(s) = value.as_str() else {
                    return fail(format!("expected string, received {}", type_name(value)));
                };
                // JSON Schema clients measure in UTF-16 code units
                let len = s.encode_utf16().count();
                if let Some(min) = min_length {
                    if len < *min {
                        return fail(format!("must be at least {} characters", min));
                    }
                }
                if let Some(max) = max_length {
                    if len > *max {
                        return fail(format!("must be at most {} characters", max));
                    }
                }
                Some(value.clone())
            }
            SchemaKind::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                _ => fail(format!("expected boolean, received {}", type_name(value))),
            },
            SchemaKind::Enum { values } => match value.as_str() {
                Some(s) if values.contains(&s) => Some(value.clone()),
                _ => fail(format!("must be one of: {}", values.join(", "))),
            },
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(elements) = value.as_array() else {
                    return fail(format!("expected array, received {}", type_name(value)));
                };
                if let Some(min) = min_items {
                    if elements.len() < *min {
                        return fail(format!("must contain at least {} item(s)", min));
                    }
                }
                if let Some(max) = max_items {
                    if elements.len() > *max {
                        return fail(format!("must contain at most {} item(s)", max));
                    }
                }
                let before = issues.len();
                let normalized: Vec<Value> = elements
                    .iter()
                    .enumerate()
                    .filter_map(|(i, element)| items.check(element, &format!("{}[{}]", path, i), issues))
                    .collect();
                (issues.len() == before).then_some(Value::Array(normalized))
            }
            SchemaKind::Object { properties } => {
                let Some(fields) = value.as_object() else {
                    return fail(format!("expected object, received {}", type_name(value)));
                };
                let before = issues.len();
                let mut normalized = Map::new();
                for property in properties {
                    let child = if path.is_empty() {
                        property.name.to_string()
                    } else {
                        format!("{}.{}", path, property.name)
                    };
                    match fields.get(property.name) {
                        Some(field) => {
                            if let Some(v) = property.schema.check(field, &child, issues) {
                                normalized.insert(property.name.to_string(), v);
                            }
                        }
                        None => {
                            if let Some(default) = &property.default {
                                normalized.insert(property.name.to_string(), default.clone());
                            } else if property.required {
                                issues.push(FieldIssue {
                                    path: child,
                                    message: "is required".to_string(),
                                });
                            }
                        }
                    }
                }
                (issues.len() == before).then_some(Value::Object(normalized))
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
