use crate::utils::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: &[&str] = &[".mkv", ".mp4", ".mov", ".m4v", ".webm"];

pub fn find_video_files<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::validation(format!(
            "Path does not exist: {}",
            path.display()
        )));
    }

    let mut video_files = Vec::new();

    if path.is_file() {
        if is_video_file(path) {
            video_files.push(path.to_path_buf());
        } else {
            return Err(Error::validation(format!(
                "File is not a supported video format: {}",
                path.display()
            )));
        }
    } else if path.is_dir() {
        for entry in WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && is_video_file(path) {
                video_files.push(path.to_path_buf());
            }
        }

        video_files.sort();
    }

    Ok(video_files)
}

pub fn is_video_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();

    if let Some(extension) = path.extension() {
        if let Some(ext_str) = extension.to_str() {
            let ext_lower = format!(".{}", ext_str.to_lowercase());
            return VIDEO_EXTENSIONS.contains(&ext_lower.as_str());
        }
    }

    false
}

/// Create the destination directory if needed. An existing directory is
/// reused; only an unusable destination root is an error, since without it
/// there is nowhere to write at all.
pub fn ensure_dest_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        if !path.is_dir() {
            return Err(Error::validation(format!(
                "Destination exists but is not a directory: {}",
                path.display()
            )));
        }
        tracing::info!("Destination directory already exists: {}", path.display());
        return Ok(());
    }

    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Delete zero-byte files left behind by killed encoder invocations, so an
/// interrupted run never masks unfinished work as "already done".
pub fn prune_partial_outputs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut pruned = Vec::new();

    if !dir.is_dir() {
        return Ok(pruned);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && entry.metadata()?.len() == 0 {
            warn!("Removing partial output: {}", path.display());
            std::fs::remove_file(&path)?;
            pruned.push(path);
        }
    }

    Ok(pruned)
}

/// Names of files already present in a destination directory.
pub fn existing_output_names<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    let mut names = Vec::new();

    if !dir.is_dir() {
        return Ok(names);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file("test.mkv"));
        assert!(is_video_file("test.MP4"));
        assert!(is_video_file("test.webm"));
        assert!(!is_video_file("test.txt"));
        assert!(!is_video_file("test"));
    }

    #[test]
    fn test_prune_partial_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("half_written.mp4");
        let full = dir.path().join("done.mp4");
        std::fs::write(&empty, b"").unwrap();
        std::fs::write(&full, b"data").unwrap();

        let pruned = prune_partial_outputs(dir.path()).unwrap();
        assert_eq!(pruned, vec![empty.clone()]);
        assert!(!empty.exists());
        assert!(full.exists());
    }

    #[test]
    fn test_existing_output_names_missing_dir() {
        let names = existing_output_names("/no/such/dir").unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_ensure_dest_dir_reuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        ensure_dest_dir(dir.path()).unwrap();
        assert!(dir.path().is_dir());
    }
}
