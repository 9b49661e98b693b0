//! CLI: parse type expressions, merge observed schema samples, and analyze
//! field occurrence. Schemas go to stdout (or `--out`); warnings and
//! confidence go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use serde_json::Value;

use crate::input;
use crate::jq;
use crate::occurrence;
use crate::parser::TypeParser;
use crate::schema::Schema;
use crate::unify;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// infer OpenAPI-like schemas from type expressions and observed samples
#[derive(Parser, Debug)]
#[command(name = "typesketch")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// parse a type expression into a schema
    Parse(ParseTarget),
    /// merge observed schema samples into one generalized schema
    Merge(MergeTarget),
    /// report field occurrence counts and enum candidates across samples
    Analyze(AnalyzeTarget),
}

#[derive(Args, Debug)]
struct ParseTarget {
    /// the type expression, e.g. `Record<string, number>` or `{ id: number }`
    expr: String,

    /// maximum recursion depth before emitting an object placeholder
    #[arg(long, default_value_t = 10)]
    max_depth: usize,

    /// JSON file mapping exact type names to replacement schemas,
    /// consulted before the built-in primitive table
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat each input line as its own sample document (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/schema)
    #[arg(long)]
    json_pointer: Option<String>,

    /// jq filter applied to each document before reading it as a schema
    #[arg(long)]
    jq_expr: Option<String>,

    /// one or more literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug)]
struct MergeTarget {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AnalyzeTarget {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Load every sample in path order, applying the optional jq filter and
    /// JSON Pointer selection per document.
    fn load_samples(&self) -> Result<Vec<Schema>> {
        let paths = input::resolve_patterns(&self.input)?;
        let documents = input::load_documents(&paths, self.ndjson)?;

        let mut samples = Vec::with_capacity(documents.len());
        for document in documents {
            let filtered: Vec<Value> = match self.jq_expr.as_deref() {
                None => vec![document],
                Some(expr) => {
                    jq::apply_filter(expr, &document).context("failed to apply the jq filter")?
                }
            };
            for value in filtered {
                let value = match self.json_pointer.as_deref() {
                    None => value,
                    // Pointer selection happens after jq, on each produced value.
                    Some(pointer) => value
                        .pointer(pointer)
                        .cloned()
                        .with_context(|| format!("json pointer `{pointer}` selected nothing"))?,
                };
                samples.push(Schema::from_value(&value));
            }
        }
        Ok(samples)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Parse(target) => run_parse(target),
            Command::Merge(target) => run_merge(target),
            Command::Analyze(target) => run_analyze(target),
        }
    }
}

fn run_parse(target: &ParseTarget) -> Result<()> {
    let mut parser = TypeParser::new().with_max_depth(target.max_depth);
    if let Some(path) = &target.overrides {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read overrides file {}", path.display()))?;
        let overrides: IndexMap<String, Schema> = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse overrides file {}", path.display()))?;
        parser = parser.with_overrides(overrides);
    }

    let parsed = parser.parse(&target.expr);
    for warning in &parsed.warnings {
        eprintln!("{}", format!("warning: {warning}").yellow());
    }
    eprintln!("{}", format!("confidence: {:.2}", parsed.confidence).dimmed());

    let rendered = serde_json::to_string_pretty(&parsed.schema.to_value())?;
    write_output(target.out.as_deref(), &rendered)
}

fn run_merge(target: &MergeTarget) -> Result<()> {
    let samples = target.input_settings.load_samples()?;
    let merged = unify::merge(&samples);
    eprintln!("{}", format!("merged {} samples", samples.len()).dimmed());

    let rendered = serde_json::to_string_pretty(&merged.to_value())?;
    write_output(target.out.as_deref(), &rendered)
}

fn run_analyze(target: &AnalyzeTarget) -> Result<()> {
    let samples = target.input_settings.load_samples()?;
    let report = occurrence::analyze(&samples);

    let rendered = serde_json::to_string_pretty(&report)?;
    write_output(target.out.as_deref(), &rendered)
}

fn write_output(out: Option<&std::path::Path>, rendered: &str) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
