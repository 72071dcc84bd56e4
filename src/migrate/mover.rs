//! Move a package directory from the old identifier path to the new one.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use itertools::Itertools;

use crate::get_relative_path_or_filename;
use crate::migrate::Identifier;

/// Relocates the package directory inside a source root.
#[derive(Debug)]
pub struct PathMover<'a> {
    old: &'a Identifier,
    new: &'a Identifier,
    dryrun: bool,
    verbose: bool,
}

/// What a single [`PathMover::move_package`] call did.
#[derive(Debug, Default)]
pub struct MoveOutcome {
    /// Old package directory existed under the base directory.
    pub found: bool,
    /// Destination paths of the moved entries.
    pub moved: Vec<PathBuf>,
    /// Directories removed because they were left empty.
    pub removed_dirs: Vec<PathBuf>,
}

impl<'a> PathMover<'a> {
    #[must_use]
    pub const fn new(old: &'a Identifier, new: &'a Identifier) -> Self {
        Self {
            old,
            new,
            dryrun: false,
            verbose: false,
        }
    }

    /// Only report what would be moved.
    #[must_use]
    pub const fn dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = dryrun;
        self
    }

    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Move every entry of `base/<old path>` into `base/<new path>`.
    ///
    /// Missing old package directory is not an error, the source root simply does not use it.
    /// Existing content at the destination is merged with, but a name that already exists
    /// at the destination aborts the move before anything is touched.
    /// Afterwards, empty directories are removed from the old location up to `base`.
    ///
    /// # Errors
    /// Returns an error on a destination collision, if the new package directory would be
    /// inside the old one, or if any filesystem operation fails.
    pub fn move_package(&self, base: &Path) -> Result<MoveOutcome> {
        if self.new.is_nested_in(self.old) {
            anyhow::bail!(
                "Cannot move package '{}' into '{}': the new directory is inside the old one",
                self.old,
                self.new
            );
        }

        let old_full = self.old.path_under(base);
        let new_full = self.new.path_under(base);

        let metadata = match fs::symlink_metadata(&old_full) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                if self.verbose {
                    println!("No package directory in {}", base.display());
                }
                return Ok(MoveOutcome::default());
            }
            Err(error) => {
                return Err(error).with_context(|| format!("Failed to read metadata: {}", old_full.display()));
            }
        };
        if metadata.file_type().is_symlink() {
            anyhow::bail!("Package directory is a symlink, refusing to move: {}", old_full.display());
        }
        if !metadata.is_dir() {
            anyhow::bail!("Package path is not a directory: {}", old_full.display());
        }

        let entries = Self::collect_entries(&old_full)?;
        Self::check_collisions(&entries, &new_full)?;

        let action = if self.dryrun { "Would move" } else { "Moving" };
        println!(
            "{} {} -> {}",
            action.bold(),
            get_relative_path_or_filename(&old_full, base),
            get_relative_path_or_filename(&new_full, base)
        );

        let mut outcome = MoveOutcome {
            found: true,
            ..MoveOutcome::default()
        };

        if !self.dryrun {
            fs::create_dir_all(&new_full)
                .with_context(|| format!("Failed to create directory: {}", new_full.display()))?;
        }

        for (source, name) in entries {
            let target = new_full.join(&name);
            if self.verbose || self.dryrun {
                println!(
                    "  {} {}",
                    "→".green(),
                    get_relative_path_or_filename(&target, base)
                );
            }
            if !self.dryrun {
                fs::rename(&source, &target).with_context(|| {
                    format!("Failed to move {} to {}", source.display(), target.display())
                })?;
            }
            outcome.moved.push(target);
        }

        if !self.dryrun {
            outcome.removed_dirs = self.remove_empty_ancestors(&old_full, base)?;
        }

        Ok(outcome)
    }

    /// Direct children of the old package directory, sorted by name.
    fn collect_entries(dir: &Path) -> Result<Vec<(PathBuf, OsString)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))? {
            let entry = entry.with_context(|| format!("Failed to read directory entry in {}", dir.display()))?;
            entries.push((entry.path(), entry.file_name()));
        }
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(entries)
    }

    /// Fail if any entry name already exists in the target directory.
    fn check_collisions(entries: &[(PathBuf, OsString)], target_dir: &Path) -> Result<()> {
        let collisions: Vec<PathBuf> = entries
            .iter()
            .map(|(_, name)| target_dir.join(name))
            .filter(|target| fs::symlink_metadata(target).is_ok())
            .collect();

        if collisions.is_empty() {
            return Ok(());
        }

        anyhow::bail!(
            "Destination already exists, refusing to overwrite:\n{}",
            collisions.iter().map(|path| format!("  {}", path.display())).join("\n")
        )
    }

    /// Remove `start` and its ancestors while they are empty, stopping before `base`.
    fn remove_empty_ancestors(&self, start: &Path, base: &Path) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        let mut current = start.to_path_buf();
        while current != base && current.starts_with(base) {
            if !crate::is_directory_empty(&current) {
                break;
            }
            fs::remove_dir(&current)
                .with_context(|| format!("Failed to remove empty directory: {}", current.display()))?;
            if self.verbose {
                println!("Removed empty directory {}", get_relative_path_or_filename(&current, base));
            }
            removed.push(current.clone());
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod mover_tests {
    use super::*;

    use tempfile::tempdir;

    fn id(value: &str) -> Identifier {
        Identifier::parse(value).expect("valid identifier")
    }

    fn write_file(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn moves_package_and_prunes_old_directories() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("proj");
        write_file(&base.join("old/pkg/A.java"), "package old.pkg;");
        write_file(&base.join("old/pkg/sub/B.java"), "package old.pkg.sub;");

        let (old, new) = (id("old.pkg"), id("new.pkg"));
        let outcome = PathMover::new(&old, &new).move_package(&base).unwrap();

        assert!(outcome.found);
        assert_eq!(outcome.moved.len(), 2);
        assert!(base.join("new/pkg/A.java").is_file());
        assert!(base.join("new/pkg/sub/B.java").is_file());
        assert!(!base.join("old").exists());
        assert!(base.exists());
        assert_eq!(outcome.removed_dirs, vec![base.join("old/pkg"), base.join("old")]);
    }

    #[test]
    fn missing_package_is_a_noop() {
        let dir = tempdir().unwrap();
        let (old, new) = (id("old.pkg"), id("new.pkg"));
        let outcome = PathMover::new(&old, &new).move_package(dir.path()).unwrap();
        assert!(!outcome.found);
        assert!(outcome.moved.is_empty());
        assert!(!dir.path().join("new").exists());
    }

    #[test]
    fn second_run_is_a_noop() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("old/pkg/A.java"), "");
        let (old, new) = (id("old.pkg"), id("new.pkg"));
        let mover = PathMover::new(&old, &new);

        mover.move_package(dir.path()).unwrap();
        let outcome = mover.move_package(dir.path()).unwrap();

        assert!(!outcome.found);
        assert!(dir.path().join("new/pkg/A.java").is_file());
    }

    #[test]
    fn keeps_non_empty_sibling() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("old/pkg/A.java"), "");
        write_file(&dir.path().join("old/other/C.java"), "");

        let (old, new) = (id("old.pkg"), id("new.pkg"));
        let outcome = PathMover::new(&old, &new).move_package(dir.path()).unwrap();

        assert!(!dir.path().join("old/pkg").exists());
        assert!(dir.path().join("old/other/C.java").is_file());
        assert_eq!(outcome.removed_dirs, vec![dir.path().join("old/pkg")]);
    }

    #[test]
    fn merges_into_existing_destination() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("old/pkg/A.java"), "a");
        write_file(&dir.path().join("new/pkg/Existing.java"), "e");

        let (old, new) = (id("old.pkg"), id("new.pkg"));
        PathMover::new(&old, &new).move_package(dir.path()).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("new/pkg/A.java")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dir.path().join("new/pkg/Existing.java")).unwrap(), "e");
    }

    #[test]
    fn collision_fails_without_moving_anything() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("old/pkg/A.java"), "old a");
        write_file(&dir.path().join("old/pkg/B.java"), "old b");
        write_file(&dir.path().join("new/pkg/B.java"), "new b");

        let (old, new) = (id("old.pkg"), id("new.pkg"));
        let error = PathMover::new(&old, &new).move_package(dir.path()).unwrap_err();

        assert!(error.to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(dir.path().join("old/pkg/A.java")).unwrap(), "old a");
        assert_eq!(fs::read_to_string(dir.path().join("old/pkg/B.java")).unwrap(), "old b");
        assert_eq!(fs::read_to_string(dir.path().join("new/pkg/B.java")).unwrap(), "new b");
        assert!(!dir.path().join("new/pkg/A.java").exists());
    }

    #[test]
    fn different_segment_counts() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("ohi/andre/consolelauncher/Main.java"), "");

        let (old, new) = (id("ohi.andre.consolelauncher"), id("com.hg2gui"));
        PathMover::new(&old, &new).move_package(dir.path()).unwrap();

        assert!(dir.path().join("com/hg2gui/Main.java").is_file());
        assert!(!dir.path().join("ohi").exists());
    }

    #[test]
    fn old_package_nested_in_new_one() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("a/b/c/Inner.java"), "");
        write_file(&dir.path().join("a/b/Outer.java"), "");

        let (old, new) = (id("a.b.c"), id("a.b"));
        PathMover::new(&old, &new).move_package(dir.path()).unwrap();

        assert!(dir.path().join("a/b/Inner.java").is_file());
        assert!(dir.path().join("a/b/Outer.java").is_file());
        assert!(!dir.path().join("a/b/c").exists());
    }

    #[test]
    fn new_package_inside_old_one_is_rejected() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("a/b/A.java"), "");

        let (old, new) = (id("a.b"), id("a.b.c"));
        assert!(PathMover::new(&old, &new).move_package(dir.path()).is_err());
        assert!(dir.path().join("a/b/A.java").is_file());
    }

    #[test]
    fn dryrun_does_not_touch_disk() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("old/pkg/A.java"), "");

        let (old, new) = (id("old.pkg"), id("new.pkg"));
        let outcome = PathMover::new(&old, &new)
            .dryrun(true)
            .move_package(dir.path())
            .unwrap();

        assert_eq!(outcome.moved, vec![dir.path().join("new/pkg/A.java")]);
        assert!(outcome.removed_dirs.is_empty());
        assert!(dir.path().join("old/pkg/A.java").is_file());
        assert!(!dir.path().join("new").exists());
    }

    #[test]
    fn dryrun_still_detects_collisions() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("old/pkg/A.java"), "");
        write_file(&dir.path().join("new/pkg/A.java"), "");

        let (old, new) = (id("old.pkg"), id("new.pkg"));
        assert!(
            PathMover::new(&old, &new)
                .dryrun(true)
                .move_package(dir.path())
                .is_err()
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_package_directory_is_rejected() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("shared/pkg");
        write_file(&real.join("A.java"), "package old.pkg;");
        fs::create_dir(dir.path().join("old")).unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("old/pkg")).unwrap();

        let (old, new) = (id("old.pkg"), id("new.pkg"));
        let error = PathMover::new(&old, &new).move_package(dir.path()).unwrap_err();

        assert!(error.to_string().contains("symlink"));
        assert!(real.join("A.java").is_file());
        assert!(!dir.path().join("new").exists());
    }

    #[test]
    fn package_path_that_is_a_file_is_an_error() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("old/pkg"), "not a directory");

        let (old, new) = (id("old.pkg"), id("new.pkg"));
        assert!(PathMover::new(&old, &new).move_package(dir.path()).is_err());
        assert!(dir.path().join("old/pkg").is_file());
    }
}
