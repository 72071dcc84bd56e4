//! Location of the user config file.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// Path to the default user config file: `$HOME/.config/pkg-migrate.toml`
///
/// Returns `None` if the home directory cannot be determined.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});

/// Pick the config file to read.
///
/// An explicitly given path always wins over the default location in the home directory.
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map_or_else(|| CONFIG_PATH.clone(), |path| Some(path.to_path_buf()))
}
