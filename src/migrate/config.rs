//! Configuration for package migration.

use std::path::{Path, PathBuf};
use std::{fmt, fs};

use anyhow::Context;
use itertools::Itertools;
use serde::Deserialize;

use crate::migrate::{Identifier, PatchRule};
use crate::print_warning;

/// Source roots of a Gradle Android project that may contain the package directory.
pub const DEFAULT_SOURCE_ROOTS: [&str; 4] = [
    "app/src/main/java",
    "app/src/fdroid/java",
    "app/src/test/java",
    "app/src/androidTest/java",
];

/// File extensions that are safe to rewrite as text.
pub const DEFAULT_EXTENSIONS: [&str; 4] = ["java", "xml", "gradle", "kt"];

/// Directory that is walked for content rewriting.
pub const DEFAULT_REWRITE_ROOT: &str = "app/src";

/// Build descriptors outside the rewrite root that also reference the package.
pub const DEFAULT_DESCRIPTORS: [&str; 2] = ["app/build.gradle", "settings.gradle"];

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct MigrateConfig {
    #[serde(default)]
    pub old: Option<String>,
    #[serde(default)]
    pub new: Option<String>,
    #[serde(default)]
    pub source_roots: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub rewrite_root: Option<String>,
    #[serde(default)]
    pub descriptors: Vec<String>,
    #[serde(default)]
    pub app_name: Option<(String, String)>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub comment_out: Vec<String>,
    #[serde(default)]
    pub patch: Vec<PatchRule>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    migrate: MigrateConfig,
}

/// Final config created from CLI arguments and user config file.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub old: Identifier,
    pub new: Identifier,
    /// Directories relative to the project root that may contain the old package directory.
    pub source_roots: Vec<PathBuf>,
    /// Recognized text file extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Directory relative to the project root that is walked for content rewriting.
    pub rewrite_root: PathBuf,
    /// Single files relative to the project root that are rewritten regardless of extension.
    pub descriptors: Vec<PathBuf>,
    /// Targeted patches, applied in order after the content rewrite.
    pub patches: Vec<PatchRule>,
    pub debug: bool,
    pub dryrun: bool,
    pub verbose: bool,
}

impl MigrateConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// An explicitly given config file must exist.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = crate::config::config_path(explicit) else {
            return Ok(Self::default());
        };

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.migrate)
            .with_context(|| "Failed to parse config TOML")
    }
}

impl MigrationConfig {
    /// Create config for the given identifiers using the Gradle Android project layout.
    #[must_use]
    pub fn new(old: Identifier, new: Identifier) -> Self {
        Self {
            old,
            new,
            source_roots: DEFAULT_SOURCE_ROOTS.into_iter().map(PathBuf::from).collect(),
            extensions: DEFAULT_EXTENSIONS.into_iter().map(ToString::to_string).collect(),
            rewrite_root: PathBuf::from(DEFAULT_REWRITE_ROOT),
            descriptors: DEFAULT_DESCRIPTORS.into_iter().map(PathBuf::from).collect(),
            patches: Vec::new(),
            debug: false,
            dryrun: false,
            verbose: false,
        }
    }

    /// Normalize extensions: strip a leading dot and surrounding whitespace, drop empty and duplicates.
    #[must_use]
    pub fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .unique()
            .collect()
    }

    /// Check the config before anything touches the disk.
    ///
    /// # Errors
    /// Returns an error if the migration could not run correctly with this config.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.old == self.new {
            anyhow::bail!("Old and new package identifiers are the same: {}", self.old);
        }
        if self.new.is_nested_in(&self.old) {
            anyhow::bail!(
                "New package '{}' cannot be inside the old package '{}'",
                self.new,
                self.old
            );
        }
        if self.extensions.is_empty() {
            anyhow::bail!("No file extensions given for content rewriting");
        }
        for patch in &self.patches {
            patch.validate()?;
        }
        if self.new.as_str().contains(self.old.as_str()) {
            print_warning!(
                "New package '{}' contains the old one '{}': rewritten files will still contain the old name",
                self.new,
                self.old
            );
        }
        Ok(())
    }
}

impl fmt::Display for MigrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source_roots = if self.source_roots.is_empty() {
            "source roots: []".to_string()
        } else {
            "source roots:\n".to_string()
                + &*self
                    .source_roots
                    .iter()
                    .map(|root| format!("    {}", root.display()))
                    .join("\n")
        };
        let descriptors = if self.descriptors.is_empty() {
            "descriptors: []".to_string()
        } else {
            "descriptors:\n".to_string()
                + &*self
                    .descriptors
                    .iter()
                    .map(|path| format!("    {}", path.display()))
                    .join("\n")
        };
        let patches = if self.patches.is_empty() {
            "patches: []".to_string()
        } else {
            "patches:\n".to_string() + &*self.patches.iter().map(|patch| format!("    {patch}")).join("\n")
        };
        writeln!(f, "Config:")?;
        writeln!(f, "  old:          {}", self.old)?;
        writeln!(f, "  new:          {}", self.new)?;
        writeln!(f, "  debug:        {}", crate::colorize_bool(self.debug))?;
        writeln!(f, "  dryrun:       {}", crate::colorize_bool(self.dryrun))?;
        writeln!(f, "  verbose:      {}", crate::colorize_bool(self.verbose))?;
        writeln!(f, "  rewrite root: {}", self.rewrite_root.display())?;
        writeln!(f, "  extensions:   {}", self.extensions.join(", "))?;
        writeln!(f, "  {source_roots}")?;
        writeln!(f, "  {descriptors}")?;
        write!(f, "  {patches}")
    }
}
