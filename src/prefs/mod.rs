//! Named key/value settings areas persisted as small JSON files.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

const AREA_EXTENSION: &str = "json";
const AREA_TMP_EXTENSION: &str = "json.tmp";

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("reading settings area {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings area {path} is not a string map")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("writing settings area {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("encoding settings area {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Preferences {
    path: PathBuf,
}

impl Preferences {
    pub fn open(dir: &Path, area: &str) -> Self {
        Self {
            path: dir.join(format!("{area}.{AREA_EXTENSION}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>, PrefsError> {
        let mut entries = self.read_all()?;
        Ok(entries.remove(key))
    }

    pub fn put_string(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        // An unreadable area is replaced rather than blocking the write.
        let mut entries = self.read_all().unwrap_or_else(|err| {
            tracing::warn!(%err, "discarding unreadable settings area");
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<bool, PrefsError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.write_all(&entries)?;
        Ok(true)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, PrefsError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(PrefsError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&raw).map_err(|source| PrefsError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), PrefsError> {
        let json = serde_json::to_vec_pretty(entries).map_err(|source| PrefsError::Encode {
            path: self.path.clone(),
            source,
        })?;
        let write_err = |source| PrefsError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp_path = self.path.with_extension(AREA_TMP_EXTENSION);
        fs::write(&tmp_path, &json).map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        tracing::debug!(path = %self.path.display(), keys = entries.len(), "settings area written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn missing_area_reads_as_empty() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let prefs = Preferences::open(temp.path(), "search");
        assert_eq!(prefs.get_string("recent_searches")?, None);
        assert!(!prefs.path().exists());
        Ok(())
    }

    #[test]
    fn put_then_get_keeps_other_keys() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let prefs = Preferences::open(temp.path(), "search");
        prefs.put_string("a", "1")?;
        prefs.put_string("b", "2")?;
        prefs.put_string("a", "3")?;
        assert_eq!(prefs.get_string("a")?.as_deref(), Some("3"));
        assert_eq!(prefs.get_string("b")?.as_deref(), Some("2"));
        assert!(prefs.remove("a")?);
        assert!(!prefs.remove("a")?);
        assert_eq!(prefs.get_string("a")?, None);
        Ok(())
    }

    #[test]
    fn malformed_area_is_a_decode_error_until_rewritten() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let prefs = Preferences::open(temp.path(), "search");
        fs::write(prefs.path(), "{not json")?;
        assert_matches!(prefs.get_string("k"), Err(PrefsError::Decode { .. }));
        prefs.put_string("k", "v")?;
        assert_eq!(prefs.get_string("k")?.as_deref(), Some("v"));
        Ok(())
    }
}
