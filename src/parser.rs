//! Type-expression parsing: a self-contained mini-language over a fixed
//! grammar subset (primitives, arrays, unions, intersections, object
//! literals, tuples, a closed list of generic wrappers).
//!
//! `parse` never fails. Every degradation is surfaced as a warning string and
//! a reduced confidence score; the schema itself falls back to a named
//! reference, an `empty` node, or an object placeholder.

pub mod split;

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::schema::{Kind, Schema};
use split::split_top_level;

const DEFAULT_MAX_DEPTH: usize = 10;

/// Confidence returned for a cache hit; warnings are not recomputed.
const CACHE_HIT_CONFIDENCE: f64 = 0.9;

const WARNING_PENALTY: f64 = 0.1;
const REFERENCE_PENALTY: f64 = 0.2;
const EMPTY_PENALTY: f64 = 0.3;

/// `name?: type` object-literal member.
static MEMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_$][A-Za-z0-9_$]*)\s*(\?)?\s*:\s*(.+)$").unwrap()
});

/// Exact-match table for primitive names. Caller overrides are consulted
/// before this table and take absolute priority.
static PRIMITIVES: Lazy<HashMap<&'static str, Schema>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("string", Schema::string());
    m.insert("number", Schema::number());
    m.insert("boolean", Schema::boolean());
    m.insert(
        "Date",
        Schema::String {
            format: Some("date-time".to_string()),
            enum_values: None,
            example: None,
            min_length: None,
            max_length: None,
            nullable: false,
        },
    );
    // A bare null/undefined carries no value shape of its own; the
    // placeholder is a nullable string.
    m.insert("null", Schema::string().with_nullable());
    m.insert("undefined", Schema::string().with_nullable());
    m.insert(
        "bigint",
        Schema::Integer {
            format: Some("int64".to_string()),
            example: None,
            minimum: None,
            maximum: None,
            nullable: false,
        },
    );
    m.insert("any", Schema::Empty);
    m.insert("unknown", Schema::Empty);
    m.insert("void", Schema::Empty);
    m.insert("never", Schema::Empty);
    m
});

/// Result of a single parse: a best-effort schema, a derived confidence in
/// `[0.1, 1.0]`, and the simplifications that happened along the way.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedType {
    pub schema: Schema,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

/// A parser instance owning its own cache, overrides, and depth cap.
/// Independent instances do not interfere; sharing one across threads needs
/// an external mutex since `parse` takes `&mut self`.
#[derive(Debug, Clone)]
pub struct TypeParser {
    cache: IndexMap<String, Schema>,
    overrides: HashMap<String, Schema>,
    max_depth: usize,
}

impl Default for TypeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeParser {
    pub fn new() -> Self {
        Self {
            cache: IndexMap::new(),
            overrides: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Map an exact type name to a pre-built schema, ahead of the built-in
    /// primitive table.
    pub fn with_override(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.overrides.insert(name.into(), schema);
        self
    }

    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (String, Schema)>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Parse a type expression into a schema. Never fails; failure modes
    /// degrade to a fallback node plus a warning.
    pub fn parse(&mut self, expr: &str) -> ParsedType {
        let key = expr.trim().to_string();
        if let Some(hit) = self.cache.get(&key) {
            return ParsedType {
                schema: hit.clone(),
                confidence: CACHE_HIT_CONFIDENCE,
                warnings: Vec::new(),
            };
        }
        let mut warnings = Vec::new();
        let schema = self.parse_expr(&key, 0, &mut warnings);
        let confidence = score(&schema, &warnings);
        self.cache.insert(key, schema.clone());
        ParsedType { schema, confidence, warnings }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.cache.len(),
            keys: self.cache.keys().cloned().collect(),
        }
    }

    fn parse_expr(&self, expr: &str, depth: usize, warnings: &mut Vec<String>) -> Schema {
        let expr = expr.trim();
        if depth > self.max_depth {
            warnings.push(format!(
                "maximum nesting depth {} exceeded at `{expr}`; emitting an object placeholder",
                self.max_depth
            ));
            return Schema::object();
        }
        if expr.is_empty() {
            warnings.push("empty type expression".to_string());
            return Schema::Empty;
        }

        // 1) overrides, then the primitive table
        if let Some(schema) = self.overrides.get(expr) {
            return schema.clone();
        }
        if let Some(schema) = PRIMITIVES.get(expr) {
            return schema.clone();
        }

        // 2) array forms: `T[]` and `Array<T>`
        if let Some(inner) = expr.strip_suffix("[]") {
            return Schema::array_of(self.parse_expr(inner, depth + 1, warnings));
        }
        if let Some(("Array", args)) = generic_parts(expr) {
            if let [item] = args.as_slice() {
                return Schema::array_of(self.parse_expr(item, depth + 1, warnings));
            }
        }

        // 3) top-level union
        let members = split_top_level(expr, '|');
        if members.len() > 1 {
            return self.parse_union(&members, depth, warnings);
        }

        // 4) top-level intersection
        let parts = split_top_level(expr, '&');
        if parts.len() > 1 {
            return Schema::AllOf(
                parts
                    .iter()
                    .map(|p| self.parse_expr(p, depth + 1, warnings))
                    .collect(),
            );
        }

        // 5) object literal
        if expr.starts_with('{') && expr.ends_with('}') {
            return self.parse_object_literal(&expr[1..expr.len() - 1], depth, warnings);
        }

        // 6) tuple
        if expr.starts_with('[') && expr.ends_with(']') {
            return self.parse_tuple(&expr[1..expr.len() - 1], depth, warnings);
        }

        // 7) generic application
        if let Some((base, args)) = generic_parts(expr) {
            return self.parse_generic(base, &args, depth, warnings);
        }

        // 8) fallback: opaque named reference
        Schema::reference(expr)
    }

    fn parse_union(&self, members: &[&str], depth: usize, warnings: &mut Vec<String>) -> Schema {
        // All-quoted unions become closed string enums, order preserved.
        let literals: Vec<&str> = members.iter().filter_map(|m| string_literal(m)).collect();
        if literals.len() == members.len() {
            let mut values: Vec<String> = Vec::new();
            for lit in literals {
                if !values.iter().any(|v| v == lit) {
                    values.push(lit.to_string());
                }
            }
            return Schema::String {
                format: None,
                enum_values: Some(values),
                example: None,
                min_length: None,
                max_length: None,
                nullable: false,
            };
        }

        let mut had_null = false;
        let mut rest: Vec<&str> = Vec::new();
        for &member in members {
            if matches!(member, "null" | "undefined") {
                had_null = true;
            } else {
                rest.push(member);
            }
        }

        let schema = match rest.len() {
            // `null | undefined` with nothing else left
            0 => Schema::string().with_nullable(),
            1 => self.parse_expr(rest[0], depth + 1, warnings),
            _ => Schema::one_of(
                rest.iter()
                    .map(|m| self.parse_expr(m, depth + 1, warnings))
                    .collect(),
            ),
        };
        if had_null {
            schema.with_nullable()
        } else {
            schema
        }
    }

    fn parse_object_literal(
        &self,
        body: &str,
        depth: usize,
        warnings: &mut Vec<String>,
    ) -> Schema {
        let mut properties = IndexMap::new();
        let mut required = Vec::new();
        for group in split_top_level(body, ';') {
            for member in split_top_level(group, ',') {
                // Members that do not look like `name?: type` are skipped.
                let Some(caps) = MEMBER_RE.captures(member) else {
                    continue;
                };
                let name = caps[1].to_string();
                let optional = caps.get(2).is_some();
                let schema = self.parse_expr(&caps[3], depth + 1, warnings);
                if !optional && !required.contains(&name) {
                    required.push(name.clone());
                }
                properties.insert(name, schema);
            }
        }
        Schema::Object {
            properties,
            required,
            additional_properties: None,
            nullable: false,
        }
    }

    fn parse_tuple(&self, body: &str, depth: usize, warnings: &mut Vec<String>) -> Schema {
        let elements: Vec<Schema> = split_top_level(body, ',')
            .iter()
            .map(|e| self.parse_expr(e, depth + 1, warnings))
            .collect();
        let arity = elements.len() as u64;
        Schema::Array {
            items: if elements.is_empty() {
                None
            } else {
                Some(Box::new(Schema::one_of(elements)))
            },
            min_items: Some(arity),
            max_items: Some(arity),
            unique_items: false,
            nullable: false,
        }
    }

    fn parse_generic(
        &self,
        base: &str,
        args: &[&str],
        depth: usize,
        warnings: &mut Vec<String>,
    ) -> Schema {
        match (base, args) {
            // Wrapper of a value: unwrap to the payload type.
            ("Promise" | "Awaited", [arg]) => self.parse_expr(arg, depth + 1, warnings),
            // Key-value container: the key type is not representable, keep
            // the value type as additionalProperties.
            ("Record" | "Map", [_, value]) => Schema::Object {
                properties: IndexMap::new(),
                required: Vec::new(),
                additional_properties: Some(Box::new(self.parse_expr(value, depth + 1, warnings))),
                nullable: false,
            },
            ("Set", [item]) => Schema::Array {
                items: Some(Box::new(self.parse_expr(item, depth + 1, warnings))),
                min_items: None,
                max_items: None,
                unique_items: true,
                nullable: false,
            },
            ("Partial" | "Required" | "Readonly", [arg, ..]) => {
                warnings.push(format!("`{base}<>` modifier dropped; simplified to the base type"));
                self.parse_expr(arg, depth + 1, warnings)
            }
            ("Pick" | "Omit", [arg, ..]) => {
                warnings.push(format!("`{base}<>` field selection dropped; simplified to the base type"));
                self.parse_expr(arg, depth + 1, warnings)
            }
            _ => {
                warnings.push(format!("generic arguments of `{base}` discarded; treating it as a named reference"));
                Schema::reference(base)
            }
        }
    }
}

/// Derived confidence: 1.0, minus 0.1 per warning, minus 0.2 for a reference
/// result, minus 0.3 for an empty/unknown result, clamped to [0.1, 1.0].
fn score(schema: &Schema, warnings: &[String]) -> f64 {
    let mut confidence = 1.0 - WARNING_PENALTY * warnings.len() as f64;
    match schema.kind() {
        Kind::Reference => confidence -= REFERENCE_PENALTY,
        Kind::Empty => confidence -= EMPTY_PENALTY,
        _ => {}
    }
    confidence.clamp(0.1, 1.0)
}

/// Split `Base<Arg, ...>` into its base identifier and top-level arguments.
fn generic_parts(expr: &str) -> Option<(&str, Vec<&str>)> {
    let open = expr.find('<')?;
    if !expr.ends_with('>') || open == 0 {
        return None;
    }
    let base = &expr[..open];
    if !base
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    {
        return None;
    }
    let args = split_top_level(&expr[open + 1..expr.len() - 1], ',');
    Some((base, args))
}

/// The inner text of a single- or double-quoted string literal.
fn string_literal(s: &str) -> Option<&str> {
    if s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn caching_is_idempotent() {
        let mut parser = TypeParser::new();
        let first = parser.parse("  Record<string, number>  ");
        let second = parser.parse("Record<string, number>");
        assert_eq!(first.schema, second.schema);
        assert!(close(second.confidence, 0.9));
        assert!(second.warnings.is_empty());
        assert_eq!(parser.cache_stats().size, 1);
        assert_eq!(parser.cache_stats().keys, vec!["Record<string, number>"]);
        parser.clear_cache();
        assert_eq!(parser.cache_stats().size, 0);
    }

    #[test]
    fn primitives_parse_cleanly() {
        let mut parser = TypeParser::new();
        assert_eq!(parser.parse("string").schema, Schema::string());
        assert!(close(parser.parse("number").confidence, 1.0));
        assert_eq!(
            parser.parse("Date").schema.to_value(),
            json!({"type": "string", "format": "date-time"})
        );
        assert_eq!(
            parser.parse("bigint").schema.to_value(),
            json!({"type": "integer", "format": "int64"})
        );
        assert_eq!(
            parser.parse("null").schema.to_value(),
            json!({"type": "string", "nullable": true})
        );
    }

    #[test]
    fn unknown_inputs_degrade_to_empty() {
        let mut parser = TypeParser::new();
        let out = parser.parse("unknown");
        assert_eq!(out.schema, Schema::Empty);
        assert!(close(out.confidence, 0.7));
        assert_eq!(parser.parse("void").schema, Schema::Empty);
    }

    #[test]
    fn overrides_beat_the_primitive_table() {
        let mut parser =
            TypeParser::new().with_override("string", Schema::reference("CustomString"));
        assert_eq!(parser.parse("string").schema, Schema::reference("CustomString"));
    }

    #[test]
    fn nested_array_suffixes() {
        let mut parser = TypeParser::new();
        assert_eq!(
            parser.parse("string[][]").schema.to_value(),
            json!({"type": "array", "items": {"type": "array", "items": {"type": "string"}}})
        );
        assert_eq!(
            parser.parse("Array<number>").schema.to_value(),
            json!({"type": "array", "items": {"type": "number"}})
        );
    }

    #[test]
    fn literal_union_becomes_enum() {
        let mut parser = TypeParser::new();
        let out = parser.parse("'active' | 'inactive' | 'pending'");
        assert_eq!(
            out.schema.to_value(),
            json!({"type": "string", "enum": ["active", "inactive", "pending"]})
        );
        assert!(close(out.confidence, 1.0));
    }

    #[test]
    fn nullable_union_unwraps() {
        let mut parser = TypeParser::new();
        assert_eq!(
            parser.parse("string | null").schema.to_value(),
            json!({"type": "string", "nullable": true})
        );
        assert_eq!(
            parser.parse("number | undefined").schema.to_value(),
            json!({"type": "number", "nullable": true})
        );
    }

    #[test]
    fn wider_union_keeps_one_of_and_nullability() {
        let mut parser = TypeParser::new();
        let out = parser.parse("string | number | null");
        assert_eq!(
            out.schema.to_value(),
            json!({"oneOf": [{"type": "string"}, {"type": "number"}], "nullable": true})
        );
    }

    #[test]
    fn intersection_becomes_all_of() {
        let mut parser = TypeParser::new();
        assert_eq!(
            parser.parse("Base & Extra").schema,
            Schema::AllOf(vec![Schema::reference("Base"), Schema::reference("Extra")])
        );
    }

    #[test]
    fn object_literal_members_and_optional_markers() {
        let mut parser = TypeParser::new();
        let out = parser.parse("{ id: number; name?: string, tags: string[] }");
        assert_eq!(
            out.schema.to_value(),
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "number"},
                    "name": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["id", "tags"]
            })
        );
    }

    #[test]
    fn malformed_object_members_are_skipped() {
        let mut parser = TypeParser::new();
        let out = parser.parse("{ good: string; ???; }");
        assert_eq!(
            out.schema.to_value(),
            json!({
                "type": "object",
                "properties": {"good": {"type": "string"}},
                "required": ["good"]
            })
        );
    }

    #[test]
    fn tuple_fixes_arity() {
        let mut parser = TypeParser::new();
        assert_eq!(
            parser.parse("[string, number]").schema.to_value(),
            json!({
                "type": "array",
                "items": {"oneOf": [{"type": "string"}, {"type": "number"}]},
                "minItems": 2,
                "maxItems": 2
            })
        );
    }

    #[test]
    fn wrapper_generics_unwrap() {
        let mut parser = TypeParser::new();
        assert_eq!(parser.parse("Promise<string>").schema, Schema::string());
        assert_eq!(
            parser.parse("Record<string, number>").schema.to_value(),
            json!({"type": "object", "additionalProperties": {"type": "number"}})
        );
        assert_eq!(
            parser.parse("Set<string>").schema.to_value(),
            json!({"type": "array", "items": {"type": "string"}, "uniqueItems": true})
        );
    }

    #[test]
    fn utility_wrappers_warn_and_simplify() {
        let mut parser = TypeParser::new();
        let out = parser.parse("Partial<User>");
        assert_eq!(out.schema, Schema::reference("User"));
        assert_eq!(out.warnings.len(), 1);
        // one warning plus the reference penalty
        assert!(close(out.confidence, 0.7));

        let out = parser.parse("Pick<User, 'id'>");
        assert_eq!(out.schema, Schema::reference("User"));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn unknown_generics_become_references() {
        let mut parser = TypeParser::new();
        let out = parser.parse("Paginated<User>");
        assert_eq!(out.schema, Schema::reference("Paginated"));
        assert_eq!(out.warnings.len(), 1);
        assert!(close(out.confidence, 0.7));
    }

    #[test]
    fn bare_identifier_is_a_reference() {
        let mut parser = TypeParser::new();
        let out = parser.parse("UserProfile");
        assert_eq!(out.schema, Schema::reference("UserProfile"));
        assert!(out.warnings.is_empty());
        assert!(close(out.confidence, 0.8));
    }

    #[test]
    fn depth_cap_returns_placeholder() {
        let mut parser = TypeParser::new();
        let expr = format!("string{}", "[]".repeat(11));
        let out = parser.parse(&expr);
        assert!(!out.warnings.is_empty());
        assert!(out.confidence < 1.0);
        // innermost node is the object placeholder, not a string
        let mut node = &out.schema;
        while let Schema::Array { items: Some(items), .. } = node {
            node = items;
        }
        assert_eq!(node, &Schema::object());
    }

    #[test]
    fn empty_expression_degrades() {
        let mut parser = TypeParser::new();
        let out = parser.parse("   ");
        assert_eq!(out.schema, Schema::Empty);
        assert_eq!(out.warnings.len(), 1);
        assert!(close(out.confidence, 0.6));
    }
}
