use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{MirrorError, Result};
use crate::resolver::{last_segment, sanitize_file_name, AssetKind};

const DEFAULT_PAGE_NAME: &str = "index.html";

/// On-disk layout of one project directory.
#[derive(Debug, Clone)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    /// Creates the base directory and every kind directory up front.
    pub fn new(base_dir: &Path) -> Result<Self> {
        let base_dir = base_dir.to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| MirrorError::io(&base_dir, e))?;

        for kind in AssetKind::ALL {
            let dir = base_dir.join(kind.dir());
            fs::create_dir_all(&dir).map_err(|e| MirrorError::io(&dir, e))?;
        }

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn asset_path(&self, kind: AssetKind, local_name: &str) -> PathBuf {
        self.base_dir.join(kind.dir()).join(local_name)
    }

    pub fn save_text(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content).map_err(|e| MirrorError::io(path, e))
    }

    /// Writes the rewritten markup for `page_url` and returns its path.
    pub fn save_page(&self, page_url: &Url, markup: &str) -> Result<PathBuf> {
        let path = self.base_dir.join(output_file_name(page_url));
        self.save_text(&path, markup)?;
        Ok(path)
    }
}

/// Output file name for a page: its last path segment, `index.html` when
/// that is empty, with `.html` appended when it has no extension.
pub fn output_file_name(page_url: &Url) -> String {
    let segment = last_segment(page_url);
    if segment.is_empty() {
        return DEFAULT_PAGE_NAME.to_string();
    }

    let name = sanitize_file_name(&segment);
    if Path::new(&name).extension().is_some() {
        name
    } else {
        format!("{}.html", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_kind_directories_created_eagerly() {
        let temp_dir = tempdir().unwrap();
        let base = temp_dir.path().join("projects").join("demo");
        let file_manager = FileManager::new(&base).unwrap();

        for dir in ["images", "js", "css", "fonts"] {
            let path = base.join(dir);
            assert!(path.exists() && path.is_dir(), "{} missing", dir);
        }
        assert_eq!(
            file_manager.asset_path(AssetKind::Font, "a.woff2"),
            base.join("fonts").join("a.woff2")
        );
    }

    #[test]
    fn test_output_file_names() {
        let test_cases = vec![
            ("https://example.com", "index.html"),
            ("https://example.com/", "index.html"),
            ("https://example.com/docs/", "index.html"),
            ("https://example.com/about", "about.html"),
            ("https://example.com/about.html", "about.html"),
            ("https://example.com/page.php?id=3", "page.php"),
        ];

        for (input, expected) in test_cases {
            let url = Url::parse(input).unwrap();
            assert_eq!(output_file_name(&url), expected, "Failed for input: {}", input);
        }
    }

    #[test]
    fn test_save_page_writes_under_base_dir() {
        let temp_dir = tempdir().unwrap();
        let file_manager = FileManager::new(temp_dir.path()).unwrap();
        let url = Url::parse("https://example.com/contact").unwrap();

        let saved = file_manager.save_page(&url, "<html></html>").unwrap();
        assert_eq!(saved, temp_dir.path().join("contact.html"));
        assert_eq!(fs::read_to_string(saved).unwrap(), "<html></html>");
    }
}
