mod config;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;

use pkg_migrate::migrate::{Migration, MigrationSummary};
use pkg_migrate::print_error;

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Move a source tree from one package identifier to another"
)]
pub(crate) struct Args {
    /// Optional project root directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Old package identifier, for example "com.example.old"
    #[arg(short, long, value_name = "ID")]
    old: Option<String>,

    /// New package identifier, for example "com.example.new"
    #[arg(short, long, value_name = "ID")]
    new: Option<String>,

    /// Source root that may contain the old package directory
    #[arg(short = 's', long = "source-root", num_args = 1, action = clap::ArgAction::Append, value_name = "DIR")]
    source_root: Vec<PathBuf>,

    /// File extension to rewrite
    #[arg(short = 'x', long = "extension", num_args = 1, action = clap::ArgAction::Append, value_name = "EXTENSION")]
    extension: Vec<String>,

    /// Directory to walk for content rewriting
    #[arg(short = 't', long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    tree: Option<PathBuf>,

    /// Single file to rewrite regardless of extension
    #[arg(short = 'd', long = "descriptor", num_args = 1, action = clap::ArgAction::Append, value_name = "FILE")]
    descriptor: Vec<PathBuf>,

    /// Replace the app display name in the strings resource
    #[arg(short = 'a', long, num_args = 2, action = clap::ArgAction::Append, value_names = ["OLD", "NEW"])]
    app_name: Vec<String>,

    /// Set the root project name in settings.gradle
    #[arg(short = 'N', long, value_name = "NAME")]
    project_name: Option<String>,

    /// Comment out lines containing the marker in app/build.gradle
    #[arg(short = 'c', long, num_args = 1, action = clap::ArgAction::Append, value_name = "MARKER")]
    comment_out: Vec<String>,

    /// Use the given config file instead of the default one
    #[arg(short = 'C', long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Print debug information
    #[arg(short = 'D', long)]
    debug: bool,

    /// Only print changes without modifying files
    #[arg(short, long)]
    print: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        return pkg_migrate::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"));
    }

    let root = pkg_migrate::resolve_input_path(args.path.as_deref())?;
    let config = config::from_args(args)?;
    let dryrun = config.dryrun;

    let mut summary = MigrationSummary::default();
    let result = Migration::new(root.clone(), config).run(&mut summary);

    println!("\n{summary}");
    summary.print_skipped(&root);

    if let Err(error) = result {
        print_error!("Migration did not complete, the project may be partially migrated");
        return Err(error);
    }
    if summary.has_skipped_files() {
        anyhow::bail!("{} file(s) could not be processed", summary.skipped_count());
    }
    if dryrun {
        println!("{}", "Dryrun: no files were modified".yellow());
    }
    Ok(())
}
