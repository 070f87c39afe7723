//! Glob patterns for branch names and owned paths
//!
//! Patterns are compiled once at rule/owners load time so malformed
//! patterns surface as configuration errors, never during evaluation.

use crate::error::{Error, Result};
use regex::Regex;

/// A branch name glob compiled to an anchored regex
///
/// Supported syntax: `*` matches within one path segment, `**` matches
/// across segments, `?` matches a single character. Everything else is
/// literal.
#[derive(Debug, Clone)]
pub struct BranchPattern {
    raw: String,
    regex: Regex,
}

impl BranchPattern {
    /// Compile a branch glob
    ///
    /// Empty patterns are rejected; compile failures carry the raw
    /// pattern for diagnosis.
    pub fn compile(pattern: &str) -> Result<Self> {
        let regex = compile_glob(pattern, GlobScope::Branch).map_err(|_| {
            Error::Validation(format!("unparseable branch pattern '{pattern}'"))
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// Check whether a branch name matches this pattern
    pub fn matches(&self, branch: &str) -> bool {
        self.regex.is_match(branch)
    }

    /// The glob as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// A file path glob for CODEOWNERS entries
///
/// Unlike branch globs, a single `*` here crosses directory separators:
/// `*.rs` covers Rust files in any directory, matching conventional
/// ownership-file semantics. A pattern ending in `/` covers everything
/// under that directory.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile a path glob
    pub fn compile(pattern: &str) -> Result<Self> {
        let regex = compile_glob(pattern, GlobScope::Path).map_err(|_| {
            Error::Validation(format!("unparseable path pattern '{pattern}'"))
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// Check whether a file path matches this pattern
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The glob as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Pattern length, the specificity measure for owner resolution
    pub fn specificity(&self) -> usize {
        self.raw.len()
    }
}

enum GlobScope {
    /// `*` stops at `/`
    Branch,
    /// `*` crosses `/`
    Path,
}

fn compile_glob(pattern: &str, scope: GlobScope) -> std::result::Result<Regex, InvalidGlob> {
    if pattern.is_empty() {
        return Err(InvalidGlob);
    }

    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');

    // Directory patterns cover everything beneath them.
    let (body, dir_suffix) = match pattern.strip_suffix('/') {
        Some(stripped) if matches!(scope, GlobScope::Path) => (stripped, true),
        _ => (pattern, false),
    };

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    re.push_str(".*");
                } else {
                    match scope {
                        GlobScope::Branch => re.push_str("[^/]*"),
                        GlobScope::Path => re.push_str(".*"),
                    }
                }
            }
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }

    if dir_suffix {
        re.push_str("/.*");
    }
    re.push('$');

    Regex::new(&re).map_err(|_| InvalidGlob)
}

struct InvalidGlob;
