//! Package migration: move a source tree from one dotted package identifier to another.
//!
//! The migration is a linear pipeline:
//! 1. [`PathMover`] relocates the package directory inside every known source root,
//! 2. [`ContentRewriter`] replaces the old identifier in recognized text files,
//! 3. [`PatchRule`]s apply small targeted edits to project metadata files.
//!
//! There is no rollback. A fatal error partway through leaves the tree partially migrated.

mod config;
mod identifier;
mod migration;
mod mover;
mod patch;
mod rewriter;
mod text;

pub use config::{MigrateConfig, MigrationConfig};
pub use identifier::Identifier;
pub use migration::{Migration, MigrationSummary};
pub use mover::{MoveOutcome, PathMover};
pub use patch::{PatchOutcome, PatchPolicy, PatchRule};
pub use rewriter::{ContentRewriter, RewriteReport, SkippedFile};
pub use text::{TextContent, read_text, write_text_atomic};
