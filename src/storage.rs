//! Filesystem helpers for durable writes.

use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a partial one.
///
/// Every call writes to its own uniquely named temp file next to the target
/// and renames it into place, so concurrent writers of the same path never
/// share a temp file. The last rename wins. On failure the temp file is
/// removed and the original error is returned.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let path = path.to_path_buf();
    let contents = contents.to_vec();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &contents))
        .await
        .map_err(std::io::Error::other)?
}

fn write_atomic_blocking(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    // Dropping the returned file on error deletes the temp file.
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Last modification time of a file, if it exists and the platform reports one.
pub async fn modified_time(path: &Path) -> std::io::Result<Option<SystemTime>> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(metadata.modified().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(file_names(dir.path()), vec!["file.json"]);
    }

    #[tokio::test]
    async fn test_write_atomic_cleans_up_on_failure() {
        let dir = tempdir().unwrap();
        // Renaming a file over a non-empty directory fails.
        let target = dir.path().join("occupied");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("inner"), b"x").unwrap();

        let result = write_atomic(&target, b"data").await;
        assert!(result.is_err());
        assert_eq!(file_names(dir.path()), vec!["occupied"]);
    }

    #[tokio::test]
    async fn test_write_atomic_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent").join("file.json");
        assert!(write_atomic(&path, b"data").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_of_one_path_all_succeed() {
        let dir = tempdir().unwrap();
        let path = Arc::new(dir.path().join("report.csv"));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let path = path.clone();
                tokio::spawn(async move {
                    let body = format!("writer-{}\n", i).repeat(2000);
                    write_atomic(&path, body.as_bytes()).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let text = std::fs::read_to_string(path.as_ref()).unwrap();
        let first = text.lines().next().unwrap().to_string();
        assert!(text.lines().all(|line| line == first));
        assert_eq!(file_names(dir.path()), vec!["report.csv"]);
    }
}
