//! Migration pipeline: move package directories, rewrite content, apply patches.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use crate::migrate::{ContentRewriter, MigrationConfig, PatchOutcome, PathMover, RewriteReport};
use crate::{get_relative_path_or_filename, print_bold};

/// Runs the whole migration for one project root.
#[derive(Debug)]
pub struct Migration {
    root: PathBuf,
    config: MigrationConfig,
}

/// Totals collected while the migration runs.
///
/// The summary is filled in step by step,
/// so it also describes a run that stopped on a fatal error.
#[derive(Debug, Default)]
pub struct MigrationSummary {
    /// Source roots that contained the old package directory.
    pub roots_moved: usize,
    /// Direct children of the old package directories that were moved.
    pub entries_moved: usize,
    /// Empty directories removed after moving.
    pub dirs_removed: usize,
    /// Content rewrite results, including standalone descriptors.
    pub rewrite: RewriteReport,
    pub patches_applied: usize,
    pub patches_unchanged: usize,
    pub patches_missing: usize,
    pub patches_skipped: usize,
}

impl Migration {
    #[must_use]
    pub const fn new(root: PathBuf, config: MigrationConfig) -> Self {
        Self { root, config }
    }

    /// Run all migration steps in order, recording progress into `summary`.
    ///
    /// There is no rollback: an error leaves the project partially migrated.
    ///
    /// # Errors
    /// Returns an error if the config is invalid, a package move collides with an existing
    /// entry, or a filesystem operation fails.
    pub fn run(&self, summary: &mut MigrationSummary) -> Result<()> {
        self.config.validate()?;
        if self.config.debug {
            eprintln!("{}", self.config);
            eprintln!("Root: {}", self.root.display());
        }
        self.move_packages(summary)?;
        self.rewrite_content(summary)?;
        self.apply_patches(summary)
    }

    fn move_packages(&self, summary: &mut MigrationSummary) -> Result<()> {
        print_bold!("Moving package {} -> {}", self.config.old, self.config.new);
        let mover = PathMover::new(&self.config.old, &self.config.new)
            .dryrun(self.config.dryrun)
            .verbose(self.config.verbose);

        for source_root in &self.config.source_roots {
            let base = self.root.join(source_root);
            if !base.is_dir() {
                if self.config.verbose {
                    println!("Skipping missing source root {}", source_root.display());
                }
                continue;
            }
            let outcome = mover.move_package(&base)?;
            if outcome.found {
                summary.roots_moved += 1;
            }
            summary.entries_moved += outcome.moved.len();
            summary.dirs_removed += outcome.removed_dirs.len();
        }
        Ok(())
    }

    fn rewrite_content(&self, summary: &mut MigrationSummary) -> Result<()> {
        print_bold!("Rewriting '{}' -> '{}'", self.config.old, self.config.new);
        let rewriter = ContentRewriter::new(
            self.config.old.as_str(),
            self.config.new.as_str(),
            &self.config.extensions,
        )
        .dryrun(self.config.dryrun)
        .verbose(self.config.verbose);

        let tree = self.root.join(&self.config.rewrite_root);
        summary.rewrite.merge(rewriter.rewrite_tree(&tree)?);

        for descriptor in &self.config.descriptors {
            let path = self.root.join(descriptor);
            // Already handled by the tree walk.
            if path.starts_with(&tree) && rewriter.is_recognized(&path) {
                continue;
            }
            summary.rewrite.merge(rewriter.rewrite_file(&path, &self.root)?);
        }
        Ok(())
    }

    fn apply_patches(&self, summary: &mut MigrationSummary) -> Result<()> {
        if self.config.patches.is_empty() {
            return Ok(());
        }
        print_bold!("Applying {} patch(es)", self.config.patches.len());
        for patch in &self.config.patches {
            match patch.apply(&self.root, self.config.dryrun, self.config.verbose)? {
                PatchOutcome::Applied => summary.patches_applied += 1,
                PatchOutcome::Unchanged => summary.patches_unchanged += 1,
                PatchOutcome::MissingFile => summary.patches_missing += 1,
                PatchOutcome::NotUtf8 => summary.patches_skipped += 1,
            }
        }
        Ok(())
    }
}

impl MigrationSummary {
    /// True if any file was left alone because it could not be decoded.
    #[must_use]
    pub fn has_skipped_files(&self) -> bool {
        !self.rewrite.skipped.is_empty() || self.patches_skipped > 0
    }

    /// Number of files that could not be processed.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.rewrite.skipped.len() + self.patches_skipped
    }

    /// Print the skipped files relative to the project root.
    pub fn print_skipped(&self, root: &Path) {
        for skipped in &self.rewrite.skipped {
            eprintln!(
                "  {} {}: {}",
                "✗".red(),
                get_relative_path_or_filename(&skipped.path, root),
                skipped.reason
            );
        }
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "Summary:".bold())?;
        writeln!(f, "  source roots moved: {}", self.roots_moved)?;
        writeln!(f, "  entries moved:      {}", self.entries_moved)?;
        writeln!(f, "  empty dirs removed: {}", self.dirs_removed)?;
        writeln!(f, "  files scanned:      {}", self.rewrite.scanned)?;
        writeln!(
            f,
            "  files changed:      {}",
            self.rewrite.changed.len().to_string().green()
        )?;
        let skipped = self.skipped_count().to_string();
        writeln!(
            f,
            "  files skipped:      {}",
            if self.has_skipped_files() { skipped.red() } else { skipped.normal() }
        )?;
        write!(
            f,
            "  patches:            {} applied, {} unchanged, {} missing",
            self.patches_applied, self.patches_unchanged, self.patches_missing
        )
    }
}

#[cfg(test)]
mod migration_tests {
    use super::*;

    use std::fs;

    use tempfile::tempdir;

    use crate::migrate::{Identifier, PatchRule};

    fn write_file(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config(old: &str, new: &str) -> MigrationConfig {
        MigrationConfig::new(Identifier::parse(old).unwrap(), Identifier::parse(new).unwrap())
    }

    #[test]
    fn invalid_config_fails_before_touching_disk() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("app/src/main/java/a/b/A.java"), "package a.b;");

        let mut summary = MigrationSummary::default();
        let result = Migration::new(dir.path().to_path_buf(), config("a.b", "a.b.c")).run(&mut summary);

        assert!(result.is_err());
        assert!(dir.path().join("app/src/main/java/a/b/A.java").is_file());
        assert_eq!(summary.entries_moved, 0);
    }

    #[test]
    fn descriptor_inside_tree_is_counted_once() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("app/src/build.gradle"), "applicationId 'old.pkg'");

        let mut config = config("old.pkg", "new.pkg");
        config.descriptors = vec![PathBuf::from("app/src/build.gradle")];
        let mut summary = MigrationSummary::default();
        Migration::new(dir.path().to_path_buf(), config).run(&mut summary).unwrap();

        assert_eq!(summary.rewrite.scanned, 1);
        assert_eq!(summary.rewrite.changed.len(), 1);
    }

    #[test]
    fn patch_outcomes_are_counted() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("settings.gradle"), "include ':app'\n");

        let mut config = config("old.pkg", "new.pkg");
        config.patches = vec![
            PatchRule::project_name("X"),
            PatchRule::display_name("T-UI", "X"),
            PatchRule::comment_out_build_setting("outputFileName ="),
        ];
        let mut summary = MigrationSummary::default();
        Migration::new(dir.path().to_path_buf(), config).run(&mut summary).unwrap();

        assert_eq!(summary.patches_applied, 1);
        assert_eq!(summary.patches_missing, 2);
        assert!(!summary.has_skipped_files());
    }

    #[test]
    fn summary_display_lists_counts() {
        let summary = MigrationSummary {
            entries_moved: 3,
            patches_applied: 2,
            ..MigrationSummary::default()
        };
        let text = summary.to_string();
        assert!(text.contains("entries moved:      3"));
        assert!(text.contains("2 applied"));
    }
}
