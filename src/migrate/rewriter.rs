//! Replace the old identifier in recognized text files.

use std::path::{Path, PathBuf};
use std::str::Utf8Error;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::ProgressBar;
#[cfg(not(test))]
use indicatif::ProgressStyle;
use walkdir::WalkDir;

use crate::migrate::text::{TextContent, read_text, write_text_atomic};
use crate::{get_relative_path_or_filename, path_to_file_extension_string, print_warning};

#[cfg(not(test))]
const PROGRESS_BAR_CHARS: &str = "=> ";
#[cfg(not(test))]
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.cyan/blue} {pos}/{len} {percent}%";

/// Plain substring replacement over files with a recognized extension.
///
/// Matching is case-sensitive and has no notion of word boundaries,
/// so the old literal is also replaced when it is a prefix of a longer token.
#[derive(Debug)]
pub struct ContentRewriter<'a> {
    old: &'a str,
    new: &'a str,
    extensions: &'a [String],
    dryrun: bool,
    verbose: bool,
}

/// A file that was left untouched because it could not be processed as text.
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Files visited by the rewriter.
#[derive(Debug, Default)]
pub struct RewriteReport {
    /// Number of recognized text files that were read.
    pub scanned: usize,
    /// Files that contained the old literal and were rewritten.
    pub changed: Vec<PathBuf>,
    /// Files that could not be decoded.
    pub skipped: Vec<SkippedFile>,
}

/// Result of processing one file.
enum FileRewrite {
    Unchanged,
    Changed { before: String, after: String },
    NotUtf8(Utf8Error),
}

impl RewriteReport {
    /// Append the results of another report to this one.
    pub fn merge(&mut self, other: Self) {
        self.scanned += other.scanned;
        self.changed.extend(other.changed);
        self.skipped.extend(other.skipped);
    }
}

impl<'a> ContentRewriter<'a> {
    #[must_use]
    pub const fn new(old: &'a str, new: &'a str, extensions: &'a [String]) -> Self {
        Self {
            old,
            new,
            extensions,
            dryrun: false,
            verbose: false,
        }
    }

    /// Only report what would change.
    #[must_use]
    pub const fn dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = dryrun;
        self
    }

    /// Print a diff of every changed line.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Replace every occurrence of the old literal.
    ///
    /// Returns `None` when there is nothing to replace, so callers can leave the file alone.
    #[must_use]
    pub fn rewrite_content(&self, content: &str) -> Option<String> {
        if self.old.is_empty() || !content.contains(self.old) {
            return None;
        }
        Some(content.replace(self.old, self.new))
    }

    /// Check if the file has one of the recognized extensions.
    #[must_use]
    pub fn is_recognized(&self, path: &Path) -> bool {
        let extension = path_to_file_extension_string(path);
        !extension.is_empty() && self.extensions.iter().any(|allowed| *allowed == extension)
    }

    /// Rewrite all recognized files under `root`.
    ///
    /// A missing root is skipped. Files that are not valid UTF-8 are reported and skipped.
    ///
    /// # Errors
    /// Returns an error if a directory cannot be walked, or a file cannot be read or written.
    pub fn rewrite_tree(&self, root: &Path) -> Result<RewriteReport> {
        let mut report = RewriteReport::default();
        if !root.exists() {
            if self.verbose {
                println!("Skipping missing directory {}", root.display());
            }
            return Ok(report);
        }

        let files = self.collect_files(root)?;
        let progress_bar = Self::create_progress_bar(files.len() as u64);
        for path in files {
            let rewrite = self.process_file(&path)?;
            progress_bar.suspend(|| self.record(&mut report, path, rewrite, root));
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        Ok(report)
    }

    /// Rewrite a single file regardless of its extension.
    ///
    /// A missing file is skipped.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or written.
    pub fn rewrite_file(&self, path: &Path, root: &Path) -> Result<RewriteReport> {
        let mut report = RewriteReport::default();
        if !path.is_file() {
            if self.verbose {
                println!("Skipping missing file {}", get_relative_path_or_filename(path, root));
            }
            return Ok(report);
        }
        let rewrite = self.process_file(path)?;
        self.record(&mut report, path.to_path_buf(), rewrite, root);
        Ok(report)
    }

    /// Collect recognized regular files under root in a stable order.
    fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk directory: {}", root.display()))?;
            if entry.file_type().is_file() && self.is_recognized(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn process_file(&self, path: &Path) -> Result<FileRewrite> {
        let before = match read_text(path)? {
            TextContent::Text(text) => text,
            TextContent::NotUtf8(error) => return Ok(FileRewrite::NotUtf8(error)),
        };
        let Some(after) = self.rewrite_content(&before) else {
            return Ok(FileRewrite::Unchanged);
        };
        if !self.dryrun {
            write_text_atomic(path, &after)?;
        }
        Ok(FileRewrite::Changed { before, after })
    }

    fn record(&self, report: &mut RewriteReport, path: PathBuf, rewrite: FileRewrite, root: &Path) {
        let relative = get_relative_path_or_filename(&path, root);
        match rewrite {
            FileRewrite::Unchanged => {
                report.scanned += 1;
            }
            FileRewrite::Changed { before, after } => {
                report.scanned += 1;
                if self.dryrun {
                    println!("{} {relative}", "Would update".cyan());
                } else {
                    println!("{} {relative}", "Updated".green());
                }
                if self.dryrun || self.verbose {
                    crate::show_line_diff(&before, &after);
                }
                report.changed.push(path);
            }
            FileRewrite::NotUtf8(error) => {
                print_warning!("Skipping file that is not valid UTF-8: {relative} ({error})");
                report.skipped.push(SkippedFile {
                    path,
                    reason: format!("not valid UTF-8: {error}"),
                });
            }
        }
    }

    /// Create a progress bar that is hidden during tests.
    fn create_progress_bar(len: u64) -> ProgressBar {
        #[cfg(test)]
        {
            let _ = len;
            ProgressBar::hidden()
        }
        #[cfg(not(test))]
        {
            let progress_bar = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
                progress_bar.set_style(style.progress_chars(PROGRESS_BAR_CHARS));
            }
            progress_bar
        }
    }
}
