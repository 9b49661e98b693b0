//! Schema unification: merge N observed schema samples for the same logical
//! value into one generalized schema.
//!
//! Dispatch compares the node kind across all samples. Same-kind samples are
//! merged structurally (objects recurse per property, arrays through `items`,
//! primitives pool their observed examples); mixed kinds become a `oneOf`
//! with no structural unification attempted. The engine only consumes
//! `Schema` values, never raw strings.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde_json::Value;

use crate::schema::{number_value, Kind, Schema};

/// Distinct string examples within this range collapse to a closed enum.
const ENUM_MIN: usize = 2;
const ENUM_MAX: usize = 10;

/// Merge an ordered list of samples. An empty list degrades to an empty
/// object; a single sample short-circuits to `enrich`.
pub fn merge(samples: &[Schema]) -> Schema {
    match samples {
        [] => return Schema::object(),
        [single] => return enrich(single.clone()),
        _ => {}
    }
    let kind = samples[0].kind();
    if samples.iter().any(|s| s.kind() != kind) {
        return merge_mixed(samples);
    }
    match kind {
        Kind::Object => merge_objects(samples),
        Kind::Array => merge_arrays(samples),
        Kind::String => merge_strings(samples),
        Kind::Number => merge_numbers(samples, false),
        Kind::Integer => merge_numbers(samples, true),
        Kind::Boolean => merge_booleans(samples),
        Kind::Empty => Schema::Empty,
        Kind::Reference if uniform_reference(samples) => samples[0].clone(),
        // oneOf/allOf/diverging references: no structural unification
        _ => merge_mixed(samples),
    }
}

/// Incompatible samples stay separate: a `oneOf` of every sample, each
/// individually enriched.
fn merge_mixed(samples: &[Schema]) -> Schema {
    Schema::OneOf {
        variants: samples.iter().map(|s| enrich(s.clone())).collect(),
        nullable: false,
    }
}

fn uniform_reference(samples: &[Schema]) -> bool {
    let Schema::Reference(first) = &samples[0] else {
        return false;
    };
    samples
        .iter()
        .all(|s| matches!(s, Schema::Reference(name) if name == first))
}

fn merge_objects(samples: &[Schema]) -> Schema {
    let total = samples.len();
    // Per property name, the sample-level schemas that carried it,
    // in first-seen order across samples.
    let mut slots: IndexMap<String, Vec<Schema>> = IndexMap::new();
    let mut extras: Vec<Schema> = Vec::new();
    let mut nullable = false;
    for sample in samples {
        if let Schema::Object { properties, additional_properties, nullable: n, .. } = sample {
            nullable |= *n;
            for (name, prop) in properties {
                slots.entry(name.clone()).or_default().push(prop.clone());
            }
            if let Some(extra) = additional_properties {
                extras.push((**extra).clone());
            }
        }
    }
    let mut properties = IndexMap::new();
    let mut required = Vec::new();
    for (name, observed) in slots {
        // Required only when present in every sample, not merely most.
        if observed.len() == total {
            required.push(name.clone());
        }
        properties.insert(name, merge(&observed));
    }
    Schema::Object {
        properties,
        required,
        additional_properties: if extras.is_empty() {
            None
        } else {
            Some(Box::new(merge(&extras)))
        },
        nullable,
    }
}

fn merge_arrays(samples: &[Schema]) -> Schema {
    let mut observed_items: Vec<Schema> = Vec::new();
    let mut unique = true;
    let mut nullable = false;
    for sample in samples {
        if let Schema::Array { items, unique_items, nullable: n, .. } = sample {
            if let Some(items) = items {
                observed_items.push((**items).clone());
            }
            unique &= *unique_items;
            nullable |= *n;
        }
    }
    Schema::Array {
        items: if observed_items.is_empty() {
            None
        } else {
            Some(Box::new(merge(&observed_items)))
        },
        min_items: None,
        max_items: None,
        unique_items: unique,
        nullable,
    }
}

fn merge_strings(samples: &[Schema]) -> Schema {
    let mut values: Vec<String> = Vec::new(); // distinct, insertion order
    let mut first_example: Option<Value> = None;
    let mut format: Option<String> = None;
    let mut format_conflict = false;
    let mut nullable = false;
    for sample in samples {
        if let Schema::String { format: f, example, nullable: n, .. } = sample {
            nullable |= *n;
            match (&format, f) {
                (None, Some(f)) if !format_conflict => format = Some(f.clone()),
                (Some(seen), Some(f)) if seen != f => {
                    format = None;
                    format_conflict = true;
                }
                _ => {}
            }
            if let Some(example) = example {
                if first_example.is_none() {
                    first_example = Some(example.clone());
                }
                if let Some(text) = example.as_str() {
                    if !values.iter().any(|v| v == text) {
                        values.push(text.to_string());
                    }
                }
            }
        }
    }

    if (ENUM_MIN..=ENUM_MAX).contains(&values.len()) {
        let mut enum_values = values;
        enum_values.sort();
        return Schema::String {
            format,
            enum_values: Some(enum_values),
            // enum takes priority over a bare example
            example: None,
            min_length: None,
            max_length: None,
            nullable,
        };
    }

    if format.is_none() && !values.is_empty() && values.iter().all(|v| is_date_time(v)) {
        format = Some("date-time".to_string());
    }
    Schema::String {
        format,
        enum_values: None,
        example: first_example,
        min_length: None,
        max_length: None,
        nullable,
    }
}

fn is_date_time(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

fn merge_numbers(samples: &[Schema], integer: bool) -> Schema {
    let mut seen: Vec<OrderedFloat<f64>> = Vec::new();
    let mut first_example: Option<Value> = None;
    let mut format: Option<String> = None;
    let mut nullable = false;
    for sample in samples {
        let (f, example, n) = match sample {
            Schema::Integer { format, example, nullable, .. } => {
                (format.clone(), example, *nullable)
            }
            Schema::Number { example, nullable, .. } => (None, example, *nullable),
            _ => continue,
        };
        nullable |= n;
        if format.is_none() {
            format = f;
        }
        if let Some(example) = example {
            if first_example.is_none() {
                first_example = Some(example.clone());
            }
            if let Some(value) = example.as_f64() {
                let value = OrderedFloat(value);
                if !seen.contains(&value) {
                    seen.push(value);
                }
            }
        }
    }
    let minimum = seen.iter().min().map(|m| m.0);
    let maximum = seen.iter().max().map(|m| m.0);
    if integer {
        Schema::Integer { format, example: first_example, minimum, maximum, nullable }
    } else {
        Schema::Number { example: first_example, minimum, maximum, nullable }
    }
}

fn merge_booleans(samples: &[Schema]) -> Schema {
    let mut first_example: Option<Value> = None;
    let mut nullable = false;
    for sample in samples {
        if let Schema::Boolean { example, nullable: n } = sample {
            nullable |= *n;
            if first_example.is_none() {
                first_example = example.clone();
            }
        }
    }
    Schema::Boolean { example: first_example, nullable }
}

// ------------------------------ Enrichment -------------------------------- //

/// Fill a representative example on any leaf lacking both an example and an
/// enum, recursing through containers. Idempotent.
pub fn enrich(schema: Schema) -> Schema {
    match schema {
        Schema::String {
            format,
            enum_values: None,
            example: None,
            min_length,
            max_length,
            nullable,
        } => Schema::String {
            format,
            enum_values: None,
            example: Some(Value::from("example")),
            min_length,
            max_length,
            nullable,
        },
        Schema::Number { example: None, minimum, maximum, nullable } => {
            Schema::Number { example: Some(number_value(42.0)), minimum, maximum, nullable }
        }
        Schema::Integer { format, example: None, minimum, maximum, nullable } => {
            Schema::Integer { format, example: Some(number_value(1.0)), minimum, maximum, nullable }
        }
        Schema::Boolean { example: None, nullable } => {
            Schema::Boolean { example: Some(Value::Bool(true)), nullable }
        }
        Schema::Object { properties, required, additional_properties, nullable } => Schema::Object {
            properties: properties
                .into_iter()
                .map(|(name, prop)| (name, enrich(prop)))
                .collect(),
            required,
            additional_properties: additional_properties.map(|extra| Box::new(enrich(*extra))),
            nullable,
        },
        Schema::Array { items, min_items, max_items, unique_items, nullable } => Schema::Array {
            items: items.map(|items| Box::new(enrich(*items))),
            min_items,
            max_items,
            unique_items,
            nullable,
        },
        Schema::OneOf { variants, nullable } => Schema::OneOf {
            variants: variants.into_iter().map(enrich).collect(),
            nullable,
        },
        Schema::AllOf(parts) => Schema::AllOf(parts.into_iter().map(enrich).collect()),
        other => other,
    }
}

// ------------------------------- Tests ------------------------------------ //
