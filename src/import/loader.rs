/// File acquisition
///
/// Reads user-selected files to completion and turns them into displayable
/// data URIs. Folder import walks the tree the same way the catalog
/// importer does, keeping only files the image decoder recognises.

use image::ImageFormat;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::data_uri::DataUri;
use crate::error::ImportError;

/// One file read to completion
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Raw bytes, kept for metadata extraction
    pub bytes: Vec<u8>,
    /// Same bytes as a displayable data URI
    pub source: DataUri,
}

/// Display name for a path (file name only, e.g. "IMG_0001.JPG")
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .to_string()
}

/// Read a file and encode it for display
pub async fn read_source(path: &Path) -> Result<SourceFile, ImportError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mime = image::guess_format(&bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");

    let source = DataUri::encode(mime, &bytes);
    tracing::debug!(path = %path.display(), bytes = bytes.len(), mime, "read source file");
    Ok(SourceFile { bytes, source })
}

/// Collect every image file under `folder`, sorted by path
pub fn collect_image_files(folder: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let mut files = Vec::new();

    // Walk the directory tree recursively
    for entry in WalkDir::new(folder).follow_links(true) {
        let entry = entry.map_err(|source| ImportError::Walk {
            path: folder.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        // Only process files (not directories)
        if !entry.file_type().is_file() {
            continue;
        }

        // Check if this is an image by extension
        if ImageFormat::from_path(path).is_ok() {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    tracing::info!(folder = %folder.display(), found = files.len(), "🔍 scanned folder");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_source_sniffs_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::GrayImage::new(2, 2).save(&path).unwrap();

        let file = read_source(&path).await.unwrap();
        assert_eq!(file.source.mime(), "image/png");
        assert_eq!(file.source.decode().unwrap(), file.bytes);
    }

    #[tokio::test]
    async fn test_read_source_missing_file() {
        let result = read_source(Path::new("/nonexistent/leaf.jpg")).await;
        assert!(matches!(result, Err(ImportError::Io { .. })));
    }

    #[test]
    fn test_collect_image_files_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("nested/a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let files = collect_image_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a.png".to_string()));
        assert!(names.contains(&"b.jpg".to_string()));
    }
}
