//! Text tables of electrode settings, one value per line by convention.
//! Any whitespace separates values and `#` starts a comment.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoltageFileError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("line {line}: cannot parse {token:?}")]
    Parse { line: usize, token: String },

    #[error("expected {expected} values, found {found}")]
    Count { expected: usize, found: usize },
}

fn parse_values<T: FromStr>(text: &str, expected: usize) -> Result<Vec<T>, VoltageFileError> {
    let mut out = Vec::with_capacity(expected);
    for (n, line) in text.lines().enumerate() {
        let body = line.split('#').next().unwrap_or("");
        for tok in body.split_whitespace() {
            let v = tok.parse().map_err(|_| VoltageFileError::Parse {
                line: n + 1,
                token: tok.to_string(),
            })?;
            out.push(v);
        }
    }
    if out.len() != expected {
        return Err(VoltageFileError::Count {
            expected,
            found: out.len(),
        });
    }
    Ok(out)
}

/// Integer drive levels; range checks happen when the forcing is built.
pub fn parse_voltages(text: &str, expected: usize) -> Result<Vec<i32>, VoltageFileError> {
    parse_values(text, expected)
}

/// Linear control signals, nominally in `[-1, 1]`.
pub fn parse_controls(text: &str, expected: usize) -> Result<Vec<f64>, VoltageFileError> {
    parse_values(text, expected)
}

fn read_text(path: &Path) -> Result<String, VoltageFileError> {
    fs::read_to_string(path).map_err(|source| VoltageFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_voltages(path: &Path, expected: usize) -> Result<Vec<i32>, VoltageFileError> {
    parse_voltages(&read_text(path)?, expected)
}

pub fn read_controls(path: &Path, expected: usize) -> Result<Vec<f64>, VoltageFileError> {
    parse_controls(&read_text(path)?, expected)
}

pub fn format_voltages(voltages: &[i32]) -> String {
    let mut s = String::with_capacity(voltages.len() * 4);
    for v in voltages {
        s.push_str(&v.to_string());
        s.push('\n');
    }
    s
}
