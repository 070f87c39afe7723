//! CODEOWNERS parsing and owner resolution
//!
//! The ownership file maps path globs to responsible identities. Parsing
//! and pattern compilation happen up front; resolution during merge
//! evaluation cannot fail.

use crate::error::{Error, Result};
use crate::gate::pattern::PathPattern;
use crate::types::CodeOwnerEntry;
use std::collections::HashSet;

/// A parsed, compiled ownership file
#[derive(Debug, Clone, Default)]
pub struct CodeOwnersFile {
    entries: Vec<CompiledOwnerEntry>,
}

#[derive(Debug, Clone)]
struct CompiledOwnerEntry {
    entry: CodeOwnerEntry,
    pattern: PathPattern,
}

impl CodeOwnersFile {
    /// An ownership file with no entries (nothing owned)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse CODEOWNERS-style text
    ///
    /// Blank lines and `#` comments are skipped. Each remaining line is
    /// `pattern owner...`; a leading `@` on an owner is stripped. A line
    /// with a pattern and no owners is valid and un-owns matching files.
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (idx, raw_line) in content.lines().enumerate() {
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before.trim(),
                None => raw_line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let pattern = tokens.next().ok_or(Error::CodeOwners {
                line: idx + 1,
                message: "missing path pattern".to_string(),
            })?;
            let owners: HashSet<String> = tokens
                .map(|t| t.trim_start_matches('@').to_string())
                .collect();

            entries.push(CodeOwnerEntry {
                file_pattern: pattern.to_string(),
                owners,
            });
        }

        Self::from_entries(entries)
    }

    /// Build from already-structured entries, compiling each pattern
    ///
    /// Malformed patterns are configuration errors carrying the 1-based
    /// entry position.
    pub fn from_entries(entries: Vec<CodeOwnerEntry>) -> Result<Self> {
        let mut compiled = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.into_iter().enumerate() {
            let pattern =
                PathPattern::compile(&entry.file_pattern).map_err(|_| Error::CodeOwners {
                    line: idx + 1,
                    message: format!("invalid path pattern '{}'", entry.file_pattern),
                })?;
            compiled.push(CompiledOwnerEntry { entry, pattern });
        }
        Ok(Self { entries: compiled })
    }

    /// Resolve the owning entry for a path
    ///
    /// Most-specific wins: the longest matching pattern, with later
    /// declaration breaking ties. Returns `None` for unowned paths.
    pub fn owners_for(&self, path: &str) -> Option<&CodeOwnerEntry> {
        self.entries
            .iter()
            .filter(|c| c.pattern.matches(path))
            .max_by_key(|c| c.pattern.specificity())
            .map(|c| &c.entry)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the file has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the parsed entries in declaration order
    pub fn entries(&self) -> impl Iterator<Item = &CodeOwnerEntry> {
        self.entries.iter().map(|c| &c.entry)
    }
}
