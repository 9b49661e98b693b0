//! Field occurrence analysis across top-level schema samples.
//!
//! Walks every sample's object properties into dotted paths (`a.b`, and
//! `a[].b` through arrays of objects), counting in how many samples each path
//! appeared and which distinct example values were seen there. Read-only and
//! independent of the unification engine; the engine's structural
//! required/enum inference is canonical for downstream consumers, this report
//! is diagnostic.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::schema::Schema;

/// Distinct-value range for flagging a path as an enum candidate.
const ENUM_CANDIDATE_MIN: usize = 2;
const ENUM_CANDIDATE_MAX: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct OccurrenceReport {
    /// Paths present in every sample.
    pub required_fields: Vec<String>,
    /// Paths present in some, but not all, samples.
    pub optional_fields: Vec<String>,
    /// Paths whose distinct observed values suggest a closed set.
    pub enum_candidates: IndexMap<String, Vec<Value>>,
}

#[derive(Debug, Default)]
struct PathStat {
    samples_seen: usize,
    /// Distinct example values, insertion order.
    values: Vec<Value>,
}

/// Analyze per-field occurrence over an ordered list of top-level samples.
pub fn analyze(samples: &[Schema]) -> OccurrenceReport {
    let mut stats: IndexMap<String, PathStat> = IndexMap::new();
    for sample in samples {
        if let Schema::Object { properties, .. } = sample {
            walk_properties(properties, "", &mut stats);
        }
    }

    let total = samples.len();
    let mut report = OccurrenceReport::default();
    for (path, stat) in stats {
        if stat.samples_seen == total {
            report.required_fields.push(path.clone());
        } else {
            report.optional_fields.push(path.clone());
        }
        if (ENUM_CANDIDATE_MIN..=ENUM_CANDIDATE_MAX).contains(&stat.values.len()) {
            report.enum_candidates.insert(path, stat.values);
        }
    }
    report
}

fn walk_properties(
    properties: &IndexMap<String, Schema>,
    prefix: &str,
    stats: &mut IndexMap<String, PathStat>,
) {
    for (name, schema) in properties {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        let stat = stats.entry(path.clone()).or_default();
        stat.samples_seen += 1;
        if let Some(example) = schema.example() {
            if !stat.values.iter().any(|v| v == example) {
                stat.values.push(example.clone());
            }
        }
        match schema {
            Schema::Object { properties, .. } => walk_properties(properties, &path, stats),
            Schema::Array { items: Some(items), .. } => {
                if let Schema::Object { properties, .. } = items.as_ref() {
                    walk_properties(properties, &format!("{path}[]"), stats);
                }
            }
            _ => {}
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(v: Value) -> Schema {
        Schema::from_value(&v)
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = analyze(&[]);
        assert!(report.required_fields.is_empty());
        assert!(report.optional_fields.is_empty());
        assert!(report.enum_candidates.is_empty());
    }

    #[test]
    fn splits_required_and_optional_by_occurrence_count() {
        let a = sample(json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "example": 1},
                "nick": {"type": "string", "example": "a"}
            }
        }));
        let b = sample(json!({
            "type": "object",
            "properties": {"id": {"type": "integer", "example": 2}}
        }));
        let report = analyze(&[a, b]);
        assert_eq!(report.required_fields, vec!["id"]);
        assert_eq!(report.optional_fields, vec!["nick"]);
    }

    #[test]
    fn builds_dotted_paths_through_nested_objects() {
        let a = sample(json!({
            "type": "object",
            "properties": {
                "meta": {"type": "object", "properties": {
                    "kind": {"type": "string", "example": "post"}
                }}
            }
        }));
        let b = a.clone();
        let report = analyze(&[a, b]);
        assert_eq!(report.required_fields, vec!["meta", "meta.kind"]);
    }

    #[test]
    fn marks_array_of_object_paths() {
        let make = |status: &str| {
            sample(json!({
                "type": "object",
                "properties": {
                    "items": {"type": "array", "items": {
                        "type": "object",
                        "properties": {"status": {"type": "string", "example": status}}
                    }}
                }
            }))
        };
        let report = analyze(&[make("open"), make("closed")]);
        assert_eq!(report.required_fields, vec!["items", "items[].status"]);
        assert_eq!(
            report.enum_candidates.get("items[].status"),
            Some(&vec![json!("open"), json!("closed")])
        );
    }

    #[test]
    fn enum_candidates_need_two_to_ten_distinct_values() {
        let make = |v: Value| {
            sample(json!({
                "type": "object",
                "properties": {"level": {"type": "integer", "example": v}}
            }))
        };
        // one distinct value: no candidate
        let report = analyze(&[make(json!(1)), make(json!(1))]);
        assert!(report.enum_candidates.is_empty());

        // three distinct values: candidate, insertion order kept
        let report = analyze(&[make(json!(2)), make(json!(1)), make(json!(3))]);
        assert_eq!(
            report.enum_candidates.get("level"),
            Some(&vec![json!(2), json!(1), json!(3)])
        );

        // eleven distinct values: out of range
        let samples: Vec<Schema> = (0..11).map(|i| make(json!(i))).collect();
        assert!(analyze(&samples).enum_candidates.is_empty());
    }

    #[test]
    fn non_object_samples_contribute_nothing_but_count() {
        let obj = sample(json!({
            "type": "object",
            "properties": {"id": {"type": "integer", "example": 1}}
        }));
        let report = analyze(&[obj, Schema::string()]);
        // `id` appeared in one of two samples
        assert_eq!(report.optional_fields, vec!["id"]);
        assert!(report.required_fields.is_empty());
    }
}
