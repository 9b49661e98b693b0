//! Sample-document loading for the CLI: glob resolution, parallel file
//! reads, and JSON parsing with JSON-path context in error messages.
//!
//! The inference core never does I/O; every failure mode here belongs to the
//! glue layer and is a real error, not a degraded schema.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("bad glob pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("glob pattern matched no files: {0}")]
    NoMatches(String),
    #[error("failed to walk glob entry: {0}")]
    Walk(#[from] glob::GlobError),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: invalid JSON at {location}: {message}", path.display())]
    Parse {
        path: PathBuf,
        location: String,
        message: String,
    },
}

/// Expand literal paths and quoted glob patterns into concrete file paths.
/// A pattern that is explicitly a glob but matches nothing is an error.
pub fn resolve_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, InputError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if has_glob_chars(pattern) {
            let entries = glob::glob(pattern).map_err(|source| InputError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
            let mut matched_any = false;
            for entry in entries {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                return Err(InputError::NoMatches(pattern.to_string()));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }
    Ok(out)
}

/// Read and parse every file, in parallel, flattening NDJSON files into one
/// document per line. Document order follows path order.
pub fn load_documents(paths: &[PathBuf], ndjson: bool) -> Result<Vec<Value>, InputError> {
    let per_file: Vec<Vec<Value>> = paths
        .par_iter()
        .map(|path| {
            let text = std::fs::read_to_string(path).map_err(|source| InputError::Read {
                path: path.clone(),
                source,
            })?;
            parse_file_contents(path, &text, ndjson)
        })
        .collect::<Result<_, _>>()?;
    Ok(per_file.into_iter().flatten().collect())
}

fn parse_file_contents(path: &Path, text: &str, ndjson: bool) -> Result<Vec<Value>, InputError> {
    if ndjson {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| parse_document(path, line))
            .collect()
    } else {
        Ok(vec![parse_document(path, text)?])
    }
}

/// Deserialize with JSON-path context in error messages.
fn parse_document(path: &Path, src: &str) -> Result<Value, InputError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, Value>(de).map_err(|err| InputError::Parse {
        path: path.to_path_buf(),
        location: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_patterns(["samples/a.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("samples/a.json")]);
    }

    #[test]
    fn ndjson_splits_per_line() {
        let docs =
            parse_file_contents(Path::new("x.ndjson"), "{\"a\":1}\n\n {\"a\":2}\n", true).unwrap();
        assert_eq!(docs, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn parse_errors_carry_the_file_path() {
        let err = parse_file_contents(Path::new("bad.json"), "{oops", false).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn single_document_files_parse_whole() {
        let docs = parse_file_contents(Path::new("x.json"), "{\"type\": \"string\"}", false).unwrap();
        assert_eq!(docs, vec![json!({"type": "string"})]);
    }
}
