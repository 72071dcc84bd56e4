use std::path::PathBuf;

use anyhow::Context;
use itertools::Itertools;

use pkg_migrate::migrate::{Identifier, MigrateConfig, MigrationConfig, PatchRule};

use crate::Args;

/// Create config from given command line args and user config file.
///
/// # Errors
/// Returns an error if the config file cannot be read or parsed,
/// or the package identifiers are missing or invalid.
pub fn from_args(args: Args) -> anyhow::Result<MigrationConfig> {
    let user_config = MigrateConfig::get_user_config(args.config.as_deref())?;
    combine(args, user_config)
}

/// Combine CLI arguments with the user config.
///
/// Values given on the command line win over the config file, which wins over the defaults.
fn combine(args: Args, user_config: MigrateConfig) -> anyhow::Result<MigrationConfig> {
    let old = args
        .old
        .or(user_config.old)
        .context("Old package identifier is required: use --old or set `old` in the config file")?;
    let new = args
        .new
        .or(user_config.new)
        .context("New package identifier is required: use --new or set `new` in the config file")?;

    let mut config = MigrationConfig::new(
        Identifier::parse(&old).context("Invalid old package identifier")?,
        Identifier::parse(&new).context("Invalid new package identifier")?,
    );

    let source_roots = prefer_args(args.source_root, user_config.source_roots);
    if !source_roots.is_empty() {
        config.source_roots = source_roots;
    }

    let extensions = MigrationConfig::normalize_extensions(prefer_args(args.extension, user_config.extensions));
    if !extensions.is_empty() {
        config.extensions = extensions;
    }

    if let Some(rewrite_root) = args.tree.or_else(|| user_config.rewrite_root.map(PathBuf::from)) {
        config.rewrite_root = rewrite_root;
    }

    let descriptors = prefer_args(args.descriptor, user_config.descriptors);
    if !descriptors.is_empty() {
        config.descriptors = descriptors;
    }

    let app_names: Vec<(String, String)> = if args.app_name.is_empty() {
        user_config.app_name.into_iter().collect()
    } else {
        args.app_name
            .chunks(2)
            .filter_map(|chunk| match chunk {
                [old, new] => Some((old.clone(), new.clone())),
                _ => None,
            })
            .collect()
    };
    let comment_out = prefer_args(args.comment_out, user_config.comment_out);

    // Fixed order: strings resource, settings file, build file, then custom rules.
    config.patches = app_names
        .iter()
        .map(|(old, new)| PatchRule::display_name(old, new))
        .chain(
            args.project_name
                .or(user_config.project_name)
                .map(|name| PatchRule::project_name(&name)),
        )
        .chain(comment_out.iter().map(|marker| PatchRule::comment_out_build_setting(marker)))
        .chain(user_config.patch)
        .collect();

    config.debug = args.debug || user_config.debug;
    config.dryrun = args.print || user_config.dryrun;
    config.verbose = args.verbose || user_config.verbose;

    Ok(config)
}

/// Use the command line values if any were given, otherwise the config file values.
fn prefer_args<T, U>(from_args: Vec<T>, from_config: Vec<U>) -> Vec<T>
where
    T: Clone + Eq + std::hash::Hash,
    U: Into<T>,
{
    if from_args.is_empty() {
        from_config.into_iter().map(Into::into).unique().collect()
    } else {
        from_args.into_iter().unique().collect()
    }
}
