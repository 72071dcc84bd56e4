//! Declarative single-file text patches.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use serde::Deserialize;

use crate::migrate::text::{TextContent, read_text, write_text_atomic};
use crate::print_warning;

/// Localized strings resource holding the application display name.
pub const STRINGS_RESOURCE: &str = "app/src/main/res/values/strings.xml";
/// Gradle settings file holding the root project name.
pub const SETTINGS_DESCRIPTOR: &str = "settings.gradle";
/// Gradle build file for the application module.
pub const BUILD_DESCRIPTOR: &str = "app/build.gradle";

const PROJECT_NAME_KEY: &str = "rootProject.name";
const DEFAULT_COMMENT: &str = "// ";

/// How a patch rule edits its target file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PatchPolicy {
    /// Replace an exact literal verbatim. Nothing happens if the literal is absent.
    ExactReplace { find: String, replace: String },
    /// Rewrite every line containing `key` to `line`, or append `line` if no line has the key.
    RewriteOrAppendLine { key: String, line: String },
    /// Prefix every line containing `marker` with a comment marker.
    CommentOutMatchingLines {
        marker: String,
        #[serde(default = "default_comment")]
        comment: String,
    },
}

/// A targeted edit of one file, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatchRule {
    pub target: PathBuf,
    #[serde(flatten)]
    pub policy: PatchPolicy,
}

/// What applying a patch rule did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The file content changed.
    Applied,
    /// The file was already in the patched state, or the literal to replace was absent.
    Unchanged,
    /// Target file does not exist.
    MissingFile,
    /// Target file is not valid UTF-8 and was left alone.
    NotUtf8,
}

fn default_comment() -> String {
    DEFAULT_COMMENT.to_string()
}

impl PatchRule {
    #[must_use]
    pub fn exact_replace(target: impl Into<PathBuf>, find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            policy: PatchPolicy::ExactReplace {
                find: find.into(),
                replace: replace.into(),
            },
        }
    }

    #[must_use]
    pub fn rewrite_or_append_line(target: impl Into<PathBuf>, key: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            policy: PatchPolicy::RewriteOrAppendLine {
                key: key.into(),
                line: line.into(),
            },
        }
    }

    #[must_use]
    pub fn comment_out_matching_lines(target: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            policy: PatchPolicy::CommentOutMatchingLines {
                marker: marker.into(),
                comment: default_comment(),
            },
        }
    }

    /// Swap the `app_name` entry in the main strings resource.
    #[must_use]
    pub fn display_name(old: &str, new: &str) -> Self {
        Self::exact_replace(
            STRINGS_RESOURCE,
            format!(r#"<string name="app_name">{old}</string>"#),
            format!(r#"<string name="app_name">{new}</string>"#),
        )
    }

    /// Set `rootProject.name` in the Gradle settings file.
    #[must_use]
    pub fn project_name(name: &str) -> Self {
        Self::rewrite_or_append_line(
            SETTINGS_DESCRIPTOR,
            PROJECT_NAME_KEY,
            format!("{PROJECT_NAME_KEY} = '{name}'"),
        )
    }

    /// Comment out a setting in the application build file.
    #[must_use]
    pub fn comment_out_build_setting(marker: &str) -> Self {
        Self::comment_out_matching_lines(BUILD_DESCRIPTOR, marker)
    }

    /// Check that applying the rule twice gives the same result as applying it once.
    ///
    /// # Errors
    /// Returns an error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.target.as_os_str().is_empty() {
            anyhow::bail!("Patch target path is empty");
        }
        match &self.policy {
            PatchPolicy::ExactReplace { find, replace } => {
                if find.is_empty() {
                    anyhow::bail!("Exact replace for {} has an empty search text", self.target.display());
                }
                if replace_can_recreate_find(find, replace) {
                    anyhow::bail!(
                        "Exact replace for {}: replacement can produce the search text '{find}' again",
                        self.target.display()
                    );
                }
            }
            PatchPolicy::RewriteOrAppendLine { key, line } => {
                if key.is_empty() || key.contains('\n') {
                    anyhow::bail!("Line rewrite for {} needs a single-line key", self.target.display());
                }
                if line.contains('\n') {
                    anyhow::bail!("Line rewrite for {}: line must be a single line", self.target.display());
                }
                if !line.contains(key.as_str()) {
                    anyhow::bail!(
                        "Line rewrite for {}: line '{line}' must contain the key '{key}'",
                        self.target.display()
                    );
                }
            }
            PatchPolicy::CommentOutMatchingLines { marker, comment } => {
                if marker.is_empty() || marker.contains('\n') {
                    anyhow::bail!("Comment out for {} needs a single-line marker", self.target.display());
                }
                if comment.trim().is_empty() {
                    anyhow::bail!("Comment out for {} has an empty comment marker", self.target.display());
                }
            }
        }
        Ok(())
    }

    /// Apply the rule to the given text.
    ///
    /// Returns `None` if the text would not change.
    #[must_use]
    pub fn apply_to_str(&self, content: &str) -> Option<String> {
        let patched = match &self.policy {
            PatchPolicy::ExactReplace { find, replace } => {
                if find.is_empty() || !content.contains(find.as_str()) {
                    return None;
                }
                content.replace(find.as_str(), replace)
            }
            PatchPolicy::RewriteOrAppendLine { key, line } => rewrite_or_append_line(content, key, line),
            PatchPolicy::CommentOutMatchingLines { marker, comment } => {
                comment_out_matching_lines(content, marker, comment)
            }
        };
        (patched != content).then_some(patched)
    }

    /// Apply the rule to its target file under `root`.
    ///
    /// A missing or undecodable target is reported and skipped.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or written,
    /// or if patching the result again would change it further.
    pub fn apply(&self, root: &Path, dryrun: bool, verbose: bool) -> Result<PatchOutcome> {
        let path = root.join(&self.target);
        if !path.is_file() {
            println!("Skipping {self}: file not found");
            return Ok(PatchOutcome::MissingFile);
        }

        let content = match read_text(&path)? {
            TextContent::Text(text) => text,
            TextContent::NotUtf8(error) => {
                print_warning!("Skipping {self}: file is not valid UTF-8 ({error})");
                return Ok(PatchOutcome::NotUtf8);
            }
        };

        let Some(patched) = self.apply_to_str(&content) else {
            if verbose {
                println!("No changes needed for {self}");
            }
            return Ok(PatchOutcome::Unchanged);
        };
        if self.apply_to_str(&patched).is_some() {
            anyhow::bail!(
                "Patch {self} would change {} again on the next run, refusing to write",
                path.display()
            );
        }

        if dryrun {
            println!("{} {self}", "Would patch".cyan());
        } else {
            write_text_atomic(&path, &patched)?;
            println!("{} {self}", "Patched".green());
        }
        if dryrun || verbose {
            crate::show_line_diff(&content, &patched);
        }

        Ok(PatchOutcome::Applied)
    }
}

impl fmt::Display for PatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.target.display();
        match &self.policy {
            PatchPolicy::ExactReplace { find, .. } => write!(f, "{target} (replace '{find}')"),
            PatchPolicy::RewriteOrAppendLine { key, .. } => write!(f, "{target} (set '{key}')"),
            PatchPolicy::CommentOutMatchingLines { marker, .. } => write!(f, "{target} (comment out '{marker}')"),
        }
    }
}

/// Split a line into its content and line terminator.
fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn rewrite_or_append_line(content: &str, key: &str, line: &str) -> String {
    if content.contains(key) {
        let mut result = String::with_capacity(content.len());
        for raw_line in content.split_inclusive('\n') {
            let (body, ending) = split_line_ending(raw_line);
            result.push_str(if body.contains(key) { line } else { body });
            result.push_str(ending);
        }
        result
    } else {
        let mut result = content.to_string();
        if !result.is_empty() && !result.ends_with('\n') {
            result.push('\n');
        }
        result.push_str(line);
        result.push('\n');
        result
    }
}

/// True if the replacement, alone or joined with surrounding text, can contain `find`.
///
/// A new match has to overlap the replacement, so the text around it
/// is at most a proper prefix of `find` before and a proper suffix after.
fn replace_can_recreate_find(find: &str, replace: &str) -> bool {
    find.char_indices().map(|(index, _)| &find[..index]).any(|prefix| {
        find.char_indices()
            .map(|(index, ch)| &find[index + ch.len_utf8()..])
            .any(|suffix| format!("{prefix}{replace}{suffix}").contains(find))
    })
}

fn comment_out_matching_lines(content: &str, marker: &str, comment: &str) -> String {
    let comment_start = comment.trim();
    let mut result = String::with_capacity(content.len());
    for raw_line in content.split_inclusive('\n') {
        let (body, ending) = split_line_ending(raw_line);
        if body.contains(marker) && !body.trim_start().starts_with(comment_start) {
            result.push_str(comment);
        }
        result.push_str(body);
        result.push_str(ending);
    }
    result
}
