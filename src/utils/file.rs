use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Document;
use crate::utils::yaml::serialize;

/// Checks if a file exists at the given path
pub fn file_exists(path: &str) -> bool {
    Path::new(path).exists()
}

/// Write `content` to `path` through a sibling temp file and a rename.
///
/// Readers of `path` see either the previous file or the complete new one.
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    fs::write(&temp_path, content)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

/// Serialize `doc` and write it atomically to `path`.
pub fn write_yaml_atomic<P: AsRef<Path>>(doc: &Document, path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    write_atomic(path, serialize(doc).as_bytes())?;
    debug!("Wrote {}", path.display());
    Ok(path.to_path_buf())
}

/// Read a text file that may be referenced relative to a different directory.
///
/// Tries the path as given, the path without a leading `./`, then the path
/// joined onto `base_dir`. Returns `None` when none of them is readable.
pub fn read_text_with_fallbacks(file_path: &str, base_dir: Option<&Path>) -> Option<String> {
    let file_path = file_path.trim();
    if file_path.is_empty() {
        return None;
    }

    let mut candidates = vec![PathBuf::from(file_path)];
    if let Some(stripped) = file_path.strip_prefix("./") {
        candidates.push(PathBuf::from(stripped));
    }
    if let Some(base) = base_dir {
        candidates.push(base.join(file_path));
    }

    for candidate in candidates {
        match fs::read_to_string(&candidate) {
            Ok(content) => return Some(content),
            Err(e) => debug!("Cannot read {}: {}", candidate.display(), e),
        }
    }
    None
}
