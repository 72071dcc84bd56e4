//! Reading and writing text files.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::Utf8Error;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Content of a file that was read for text processing.
#[derive(Debug)]
pub enum TextContent {
    /// File decoded as UTF-8.
    Text(String),
    /// File is not valid UTF-8 and must not be modified.
    NotUtf8(Utf8Error),
}

/// Read the full file content and decode it as UTF-8.
///
/// Decoding failure is returned as [`TextContent::NotUtf8`] instead of an error,
/// so callers can skip the file and keep going.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_text(path: &Path) -> Result<TextContent> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => TextContent::Text(text),
        Err(error) => TextContent::NotUtf8(error.utf8_error()),
    })
}

/// Replace the file content without ever leaving a partially written file behind.
///
/// The new content goes to a temporary file in the same directory,
/// which is then renamed over the original. The original permissions are kept.
///
/// # Errors
/// Returns an error if the temporary file cannot be created, written, or renamed.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let permissions = fs::metadata(path).map(|metadata| metadata.permissions()).ok();

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    temp_file
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
    temp_file
        .as_file()
        .sync_all()
        .with_context(|| format!("Failed to flush temporary file for {}", path.display()))?;
    if let Some(permissions) = permissions {
        temp_file
            .as_file()
            .set_permissions(permissions)
            .with_context(|| format!("Failed to set permissions for {}", path.display()))?;
    }

    temp_file
        .persist(path)
        .map_err(|error| error.error)
        .with_context(|| format!("Failed to replace file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod text_tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn reads_utf8_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("A.java");
        fs::write(&path, "package old.pkg;\n// ääkköset\n").unwrap();

        match read_text(&path).unwrap() {
            TextContent::Text(text) => assert!(text.contains("ääkköset")),
            TextContent::NotUtf8(error) => panic!("Unexpected decode error: {error}"),
        }
    }

    #[test]
    fn invalid_utf8_is_not_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.xml");
        fs::write(&path, b"<a>caf\xe9</a>").unwrap();

        assert!(matches!(read_text(&path).unwrap(), TextContent::NotUtf8(_)));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(read_text(&dir.path().join("missing.kt")).is_err());
    }

    #[test]
    fn atomic_write_replaces_content_and_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.gradle");
        fs::write(&path, "include ':app'\n").unwrap();

        write_text_atomic(&path, "include ':app'\nrootProject.name = 'X'\n").unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "include ':app'\nrootProject.name = 'X'\n"
        );
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("gradlew.gradle");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        write_text_atomic(&path, "new").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }
}
