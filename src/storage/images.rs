use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use uuid::Uuid;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// Local stand-in for the remote blob store: uploaded images are copied
/// under a generated name and addressed by a `file://` URL.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn upload(&self, source: &Path) -> Result<String> {
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            bail!(
                "unsupported image type '{}' (expected one of {})",
                source.display(),
                IMAGE_EXTENSIONS.join(", ")
            );
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating image directory {}", self.dir.display()))?;
        let name = format!("{}.{extension}", Uuid::new_v4());
        let target = self.dir.join(&name);
        fs::copy(source, &target).with_context(|| {
            format!("copying image {} to {}", source.display(), target.display())
        })?;
        tracing::info!(image = %name, "image uploaded");
        Ok(self.public_url(&name))
    }

    pub fn public_url(&self, name: &str) -> String {
        let path = self.dir.join(name);
        let absolute = path.canonicalize().unwrap_or(path);
        format!("file://{}", absolute.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn upload_copies_and_returns_file_url() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("photo.JPG");
        fs::write(&source, b"jpeg bytes")?;
        let store = ImageStore::new(temp.path().join("images"));
        let url = store.upload(&source)?;
        assert!(url.starts_with("file://"));
        assert!(url.ends_with(".jpg"));
        let copied: Vec<_> = fs::read_dir(store.dir())?.collect();
        assert_eq!(copied.len(), 1);
        Ok(())
    }

    #[test]
    fn rejects_non_images() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("notes.txt");
        fs::write(&source, b"text")?;
        let store = ImageStore::new(temp.path().join("images"));
        assert!(store.upload(&source).is_err());
        Ok(())
    }
}
