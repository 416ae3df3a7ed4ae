//! The editable listing: one `<verb> <path>` line per enumerated file.
//!
//! Lines are correlated by index only. Line `i` of the edited text always
//! describes what should happen to the file listed on line `i` originally,
//! so the edited text must keep exactly the same number of lines.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

const BUFFER_PREFIX: &str = "mfe-";
const DEFAULT_VERB: &str = "move";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Move,
    Delete,
    Unknown(String),
}

impl Verb {
    pub fn parse(word: &str) -> Self {
        match word {
            "move" | "m" => Verb::Move,
            "delete" | "d" => Verb::Delete,
            other => Verb::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Move => f.write_str("move"),
            Verb::Delete => f.write_str("delete"),
            Verb::Unknown(word) => f.write_str(word),
        }
    }
}

/// A single listing line split at its first space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub verb: Verb,
    pub path: &'a str,
}

impl<'a> CommandLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        let (verb, path) = line.split_once(' ').unwrap_or((line, ""));
        CommandLine {
            verb: Verb::parse(verb),
            path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    lines: Vec<String>,
}

impl Listing {
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let lines = paths
            .iter()
            .map(|path| format!("{DEFAULT_VERB} {}", path.display()))
            .collect();
        Listing { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Temporary file holding the listing while the editor runs.
///
/// The file is deleted when the buffer is dropped.
pub struct ListingBuffer {
    file: NamedTempFile,
}

impl ListingBuffer {
    pub fn create(listing: &Listing) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(BUFFER_PREFIX)
            .suffix(".txt")
            .tempfile()
            .context("creating temporary listing file")?;
        file.write_all(listing.render().as_bytes())
            .with_context(|| format!("writing listing to {}", file.path().display()))?;
        file.as_file()
            .sync_all()
            .with_context(|| format!("syncing listing {}", file.path().display()))?;
        Ok(ListingBuffer { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn read_edited(&self) -> Result<String> {
        fs::read_to_string(self.path())
            .with_context(|| format!("reading edited listing {}", self.path().display()))
    }
}

/// Splits the edited text back into lines and checks it still lines up with `original`.
pub fn calculate_modifications(original: &Listing, edited: &str) -> Result<Vec<String>> {
    let mut lines: Vec<String> = edited
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();
    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    if lines.len() != original.len() {
        bail!(
            "the listing had {} line(s) but the edited file has {}; do not add or remove lines",
            original.len(),
            lines.len()
        );
    }

    Ok(lines)
}
