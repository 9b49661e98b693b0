//! The canonical Schema tree shared by the parser and the unification engine.
//!
//! A Schema is an explicit tagged union (one variant per node kind), not a
//! loosely-typed map. Emission reproduces the OpenAPI field names exactly
//! (`type`, `properties`, `required`, `items`, `enum`, `example`, `minimum`,
//! `maximum`, `minLength`, `maxLength`, `minItems`, `maxItems`,
//! `additionalProperties`, `oneOf`, `allOf`, `$ref`, `nullable`); absent
//! fields are omitted, never emitted as null placeholders.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

const REF_PREFIX: &str = "#/components/schemas/";

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String {
        format: Option<String>,
        enum_values: Option<Vec<String>>,
        example: Option<Value>,
        min_length: Option<u64>,
        max_length: Option<u64>,
        nullable: bool,
    },
    Number {
        example: Option<Value>,
        minimum: Option<f64>,
        maximum: Option<f64>,
        nullable: bool,
    },
    Integer {
        format: Option<String>,
        example: Option<Value>,
        minimum: Option<f64>,
        maximum: Option<f64>,
        nullable: bool,
    },
    Boolean {
        example: Option<Value>,
        nullable: bool,
    },
    Object {
        /// Property order is first-seen order; preserved through emission.
        properties: IndexMap<String, Schema>,
        /// Subset of `properties` keys. Absence means optional, never forbidden.
        required: Vec<String>,
        additional_properties: Option<Box<Schema>>,
        nullable: bool,
    },
    Array {
        items: Option<Box<Schema>>,
        min_items: Option<u64>,
        max_items: Option<u64>,
        unique_items: bool,
        nullable: bool,
    },
    /// Heterogeneous alternatives, no implied discriminant.
    OneOf {
        variants: Vec<Schema>,
        nullable: bool,
    },
    /// Structural merge of all parts.
    AllOf(Vec<Schema>),
    /// An unresolved named type; never expanded by this crate.
    Reference(String),
    /// No further information (unknown/any/void-like inputs).
    Empty,
}

/// Discriminant used for merge dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    OneOf,
    AllOf,
    Reference,
    Empty,
}

impl Schema {
    pub fn string() -> Self {
        Schema::String {
            format: None,
            enum_values: None,
            example: None,
            min_length: None,
            max_length: None,
            nullable: false,
        }
    }

    pub fn number() -> Self {
        Schema::Number { example: None, minimum: None, maximum: None, nullable: false }
    }

    pub fn integer() -> Self {
        Schema::Integer { format: None, example: None, minimum: None, maximum: None, nullable: false }
    }

    pub fn boolean() -> Self {
        Schema::Boolean { example: None, nullable: false }
    }

    /// An object with no known properties.
    pub fn object() -> Self {
        Schema::Object {
            properties: IndexMap::new(),
            required: Vec::new(),
            additional_properties: None,
            nullable: false,
        }
    }

    pub fn array() -> Self {
        Schema::Array { items: None, min_items: None, max_items: None, unique_items: false, nullable: false }
    }

    pub fn array_of(items: Schema) -> Self {
        Schema::Array {
            items: Some(Box::new(items)),
            min_items: None,
            max_items: None,
            unique_items: false,
            nullable: false,
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Schema::Reference(name.into())
    }

    /// A `oneOf` over the given variants; a single variant collapses to itself.
    pub fn one_of(mut variants: Vec<Schema>) -> Self {
        if variants.len() == 1 {
            variants.remove(0)
        } else {
            Schema::OneOf { variants, nullable: false }
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Schema::String { .. } => Kind::String,
            Schema::Number { .. } => Kind::Number,
            Schema::Integer { .. } => Kind::Integer,
            Schema::Boolean { .. } => Kind::Boolean,
            Schema::Object { .. } => Kind::Object,
            Schema::Array { .. } => Kind::Array,
            Schema::OneOf { .. } => Kind::OneOf,
            Schema::AllOf(_) => Kind::AllOf,
            Schema::Reference(_) => Kind::Reference,
            Schema::Empty => Kind::Empty,
        }
    }

    /// Mark this node nullable. Kinds without a nullable flag (`allOf`,
    /// `$ref`, `empty`) are returned unchanged.
    pub fn with_nullable(self) -> Self {
        match self {
            Schema::String { format, enum_values, example, min_length, max_length, .. } => {
                Schema::String { format, enum_values, example, min_length, max_length, nullable: true }
            }
            Schema::Number { example, minimum, maximum, .. } => {
                Schema::Number { example, minimum, maximum, nullable: true }
            }
            Schema::Integer { format, example, minimum, maximum, .. } => {
                Schema::Integer { format, example, minimum, maximum, nullable: true }
            }
            Schema::Boolean { example, .. } => Schema::Boolean { example, nullable: true },
            Schema::Object { properties, required, additional_properties, .. } => {
                Schema::Object { properties, required, additional_properties, nullable: true }
            }
            Schema::Array { items, min_items, max_items, unique_items, .. } => {
                Schema::Array { items, min_items, max_items, unique_items, nullable: true }
            }
            Schema::OneOf { variants, .. } => Schema::OneOf { variants, nullable: true },
            other => other,
        }
    }

    /// The example carried by a primitive leaf, if any.
    pub fn example(&self) -> Option<&Value> {
        match self {
            Schema::String { example, .. }
            | Schema::Number { example, .. }
            | Schema::Integer { example, .. }
            | Schema::Boolean { example, .. } => example.as_ref(),
            _ => None,
        }
    }

    // ------------------------------ Emission ------------------------------ //

    pub fn to_value(&self) -> Value {
        let mut m = Map::new();
        match self {
            Schema::String { format, enum_values, example, min_length, max_length, nullable } => {
                m.insert("type".into(), Value::from("string"));
                if let Some(f) = format {
                    m.insert("format".into(), Value::from(f.clone()));
                }
                if let Some(vals) = enum_values {
                    m.insert(
                        "enum".into(),
                        Value::Array(vals.iter().cloned().map(Value::from).collect()),
                    );
                }
                if let Some(e) = example {
                    m.insert("example".into(), e.clone());
                }
                if let Some(n) = min_length {
                    m.insert("minLength".into(), Value::from(*n));
                }
                if let Some(n) = max_length {
                    m.insert("maxLength".into(), Value::from(*n));
                }
                if *nullable {
                    m.insert("nullable".into(), Value::Bool(true));
                }
            }
            Schema::Number { example, minimum, maximum, nullable } => {
                m.insert("type".into(), Value::from("number"));
                if let Some(e) = example {
                    m.insert("example".into(), e.clone());
                }
                if let Some(n) = minimum {
                    m.insert("minimum".into(), number_value(*n));
                }
                if let Some(n) = maximum {
                    m.insert("maximum".into(), number_value(*n));
                }
                if *nullable {
                    m.insert("nullable".into(), Value::Bool(true));
                }
            }
            Schema::Integer { format, example, minimum, maximum, nullable } => {
                m.insert("type".into(), Value::from("integer"));
                if let Some(f) = format {
                    m.insert("format".into(), Value::from(f.clone()));
                }
                if let Some(e) = example {
                    m.insert("example".into(), e.clone());
                }
                if let Some(n) = minimum {
                    m.insert("minimum".into(), number_value(*n));
                }
                if let Some(n) = maximum {
                    m.insert("maximum".into(), number_value(*n));
                }
                if *nullable {
                    m.insert("nullable".into(), Value::Bool(true));
                }
            }
            Schema::Boolean { example, nullable } => {
                m.insert("type".into(), Value::from("boolean"));
                if let Some(e) = example {
                    m.insert("example".into(), e.clone());
                }
                if *nullable {
                    m.insert("nullable".into(), Value::Bool(true));
                }
            }
            Schema::Object { properties, required, additional_properties, nullable } => {
                m.insert("type".into(), Value::from("object"));
                if !properties.is_empty() {
                    let mut props = Map::new();
                    for (name, schema) in properties {
                        props.insert(name.clone(), schema.to_value());
                    }
                    m.insert("properties".into(), Value::Object(props));
                }
                if !required.is_empty() {
                    m.insert(
                        "required".into(),
                        Value::Array(required.iter().cloned().map(Value::from).collect()),
                    );
                }
                if let Some(extra) = additional_properties {
                    m.insert("additionalProperties".into(), extra.to_value());
                }
                if *nullable {
                    m.insert("nullable".into(), Value::Bool(true));
                }
            }
            Schema::Array { items, min_items, max_items, unique_items, nullable } => {
                m.insert("type".into(), Value::from("array"));
                if let Some(items) = items {
                    m.insert("items".into(), items.to_value());
                }
                if let Some(n) = min_items {
                    m.insert("minItems".into(), Value::from(*n));
                }
                if let Some(n) = max_items {
                    m.insert("maxItems".into(), Value::from(*n));
                }
                if *unique_items {
                    m.insert("uniqueItems".into(), Value::Bool(true));
                }
                if *nullable {
                    m.insert("nullable".into(), Value::Bool(true));
                }
            }
            Schema::OneOf { variants, nullable } => {
                m.insert(
                    "oneOf".into(),
                    Value::Array(variants.iter().map(Schema::to_value).collect()),
                );
                if *nullable {
                    m.insert("nullable".into(), Value::Bool(true));
                }
            }
            Schema::AllOf(parts) => {
                m.insert(
                    "allOf".into(),
                    Value::Array(parts.iter().map(Schema::to_value).collect()),
                );
            }
            Schema::Reference(name) => {
                m.insert("$ref".into(), Value::from(format!("{REF_PREFIX}{name}")));
            }
            Schema::Empty => {}
        }
        Value::Object(m)
    }

    // ------------------------------ Ingestion ----------------------------- //

    /// Lenient conversion from a Schema-shaped JSON value. Dispatches only on
    /// the discriminating `$ref`/`oneOf`/`allOf`/`type` fields; anything
    /// unrecognized degrades to `Empty` rather than failing.
    pub fn from_value(v: &Value) -> Schema {
        let Some(map) = v.as_object() else {
            return Schema::Empty;
        };
        if let Some(target) = map.get("$ref").and_then(Value::as_str) {
            let name = target.rsplit('/').next().unwrap_or(target);
            return Schema::Reference(name.to_string());
        }
        if let Some(arms) = map.get("oneOf").and_then(Value::as_array) {
            return Schema::OneOf {
                variants: arms.iter().map(Schema::from_value).collect(),
                nullable: flag(map, "nullable"),
            };
        }
        if let Some(parts) = map.get("allOf").and_then(Value::as_array) {
            return Schema::AllOf(parts.iter().map(Schema::from_value).collect());
        }
        match map.get("type").and_then(Value::as_str) {
            Some("string") => Schema::String {
                format: text(map, "format"),
                enum_values: map.get("enum").and_then(Value::as_array).map(|vals| {
                    vals.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                }),
                example: map.get("example").cloned(),
                min_length: count(map, "minLength"),
                max_length: count(map, "maxLength"),
                nullable: flag(map, "nullable"),
            },
            Some("number") => Schema::Number {
                example: map.get("example").cloned(),
                minimum: float(map, "minimum"),
                maximum: float(map, "maximum"),
                nullable: flag(map, "nullable"),
            },
            Some("integer") => Schema::Integer {
                format: text(map, "format"),
                example: map.get("example").cloned(),
                minimum: float(map, "minimum"),
                maximum: float(map, "maximum"),
                nullable: flag(map, "nullable"),
            },
            Some("boolean") => Schema::Boolean {
                example: map.get("example").cloned(),
                nullable: flag(map, "nullable"),
            },
            Some("object") => Schema::Object {
                properties: map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(name, prop)| (name.clone(), Schema::from_value(prop)))
                            .collect()
                    })
                    .unwrap_or_default(),
                required: map
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                additional_properties: map
                    .get("additionalProperties")
                    .filter(|v| v.is_object())
                    .map(|v| Box::new(Schema::from_value(v))),
                nullable: flag(map, "nullable"),
            },
            Some("array") => Schema::Array {
                items: map.get("items").map(|v| Box::new(Schema::from_value(v))),
                min_items: count(map, "minItems"),
                max_items: count(map, "maxItems"),
                unique_items: flag(map, "uniqueItems"),
                nullable: flag(map, "nullable"),
            },
            _ => Schema::Empty,
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        Ok(Schema::from_value(&v))
    }
}

/// Prefer emitting integers when the float is exact.
pub fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn flag(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn count(map: &Map<String, Value>, key: &str) -> Option<u64> {
    map.get(key).and_then(Value::as_u64)
}

fn float(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emits_exact_field_names() {
        let mut properties = IndexMap::new();
        properties.insert(
            "id".to_string(),
            Schema::Integer {
                format: Some("int64".into()),
                example: Some(json!(7)),
                minimum: Some(1.0),
                maximum: Some(99.0),
                nullable: false,
            },
        );
        properties.insert("tags".to_string(), Schema::array_of(Schema::string()));
        let schema = Schema::Object {
            properties,
            required: vec!["id".to_string()],
            additional_properties: None,
            nullable: false,
        };
        assert_eq!(
            schema.to_value(),
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer", "format": "int64", "example": 7, "minimum": 1, "maximum": 99},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["id"]
            })
        );
    }

    #[test]
    fn empty_object_omits_properties_and_required() {
        assert_eq!(Schema::object().to_value(), json!({"type": "object"}));
    }

    #[test]
    fn empty_kind_is_bare_map() {
        assert_eq!(Schema::Empty.to_value(), json!({}));
    }

    #[test]
    fn reference_round_trips_with_and_without_prefix() {
        let r = Schema::reference("User");
        assert_eq!(r.to_value(), json!({"$ref": "#/components/schemas/User"}));
        assert_eq!(Schema::from_value(&r.to_value()), r);
        assert_eq!(Schema::from_value(&json!({"$ref": "User"})), r);
    }

    #[test]
    fn from_value_dispatches_on_discriminants() {
        let one_of = json!({"oneOf": [{"type": "string"}, {"type": "number"}], "nullable": true});
        match Schema::from_value(&one_of) {
            Schema::OneOf { variants, nullable } => {
                assert_eq!(variants.len(), 2);
                assert!(nullable);
            }
            other => panic!("expected oneOf, got {other:?}"),
        }
        let all_of = json!({"allOf": [{"type": "object"}]});
        assert_eq!(Schema::from_value(&all_of).kind(), Kind::AllOf);
        assert_eq!(Schema::from_value(&json!({"type": "mystery"})), Schema::Empty);
        assert_eq!(Schema::from_value(&json!("not a schema")), Schema::Empty);
    }

    #[test]
    fn object_round_trip_keeps_property_order() {
        let v = json!({
            "type": "object",
            "properties": {
                "zeta": {"type": "string"},
                "alpha": {"type": "boolean", "example": true},
                "mid": {"type": "array", "items": {"type": "number"}, "minItems": 1}
            },
            "required": ["zeta"]
        });
        let schema = Schema::from_value(&v);
        assert_eq!(schema.to_value(), v);
        if let Schema::Object { properties, .. } = &schema {
            let names: Vec<_> = properties.keys().cloned().collect();
            assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        } else {
            panic!("expected object");
        }
    }

    #[test]
    fn one_of_collapses_singleton() {
        assert_eq!(Schema::one_of(vec![Schema::string()]), Schema::string());
    }

    #[test]
    fn number_value_prefers_exact_integers() {
        assert_eq!(number_value(3.0), json!(3));
        assert_eq!(number_value(3.5), json!(3.5));
    }
}
