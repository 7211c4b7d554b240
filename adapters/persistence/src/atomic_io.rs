use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Stages `text` next to `path` and renames it into place.
///
/// The rename replaces an existing file in one step, so readers see either the
/// previous contents or the new ones. On failure the previous file is untouched.
pub(crate) fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let staged = staging_path(path);
    fs::write(&staged, text.as_bytes())?;

    fs::rename(&staged, path).map_err(|error| {
        let _ = fs::remove_file(&staged);
        error
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("progress");
    path.with_file_name(format!("{name}.tmp"))
}
