//! Dotted package identifiers and their directory form.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

/// A dotted package identifier such as `com.example.app`.
///
/// Each segment maps to one directory level, so `com.example.app`
/// corresponds to the relative path `com/example/app`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    name: String,
    segments: Vec<String>,
}

impl Identifier {
    /// Parse and validate a dotted identifier.
    ///
    /// # Errors
    /// Returns an error if the identifier is empty, has an empty segment,
    /// or a segment that is not usable as a single directory name.
    pub fn parse(value: &str) -> Result<Self> {
        let name = value.trim();
        if name.is_empty() {
            anyhow::bail!("Package identifier cannot be empty");
        }

        let segments: Vec<String> = name.split('.').map(str::to_string).collect();
        for segment in &segments {
            Self::validate_segment(segment).with_context(|| format!("Invalid package identifier '{name}'"))?;
        }

        Ok(Self {
            name: name.to_string(),
            segments,
        })
    }

    /// The dotted form, as it appears in source files.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Identifier segments in order, e.g. `["com", "example", "app"]`.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Relative directory path for this identifier, e.g. `com/example/app`.
    #[must_use]
    pub fn path_form(&self) -> PathBuf {
        self.segments.iter().collect()
    }

    /// Absolute location of this identifier's package directory under `base`.
    #[must_use]
    pub fn path_under(&self, base: &Path) -> PathBuf {
        base.join(self.path_form())
    }

    /// True if this identifier's directory is `other`'s directory or one of its descendants.
    #[must_use]
    pub fn is_nested_in(&self, other: &Self) -> bool {
        self.segments.starts_with(&other.segments)
    }

    fn validate_segment(segment: &str) -> Result<()> {
        if segment.is_empty() {
            anyhow::bail!("identifier contains an empty segment");
        }
        if segment == ".." {
            anyhow::bail!("segment '..' would escape the source root");
        }
        if segment.contains(['/', '\\']) || segment.chars().any(char::is_whitespace) {
            anyhow::bail!("segment '{segment}' is not a valid directory name");
        }
        Ok(())
    }
}

impl FromStr for Identifier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
