//! Most-recent-first list of past searches, kept in the local settings area.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum::{Display, EnumString};

use crate::prefs::Preferences;

pub const RECENT_SEARCHES_KEY: &str = "recent_searches";
pub const DEFAULT_CAPACITY: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RecentSearchKind {
    User,
    Query,
    Recipe,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearch {
    pub kind: RecentSearchKind,
    pub label: String,
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl RecentSearch {
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            kind: RecentSearchKind::Query,
            label: text.into(),
            secondary: None,
            image: None,
        }
    }

    pub fn user(username: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            kind: RecentSearchKind::User,
            label: username.into(),
            secondary: display_name,
            image: None,
        }
    }

    pub fn recipe(title: impl Into<String>, author: Option<String>, image: Option<String>) -> Self {
        Self {
            kind: RecentSearchKind::Recipe,
            label: title.into(),
            secondary: author,
            image,
        }
    }

    /// Identity used for de-duplication: same kind, label equal ignoring case.
    pub fn same_target(&self, other: &RecentSearch) -> bool {
        self.kind == other.kind && self.label.to_lowercase() == other.label.to_lowercase()
    }
}

pub fn encode(entries: &[RecentSearch]) -> Result<String> {
    serde_json::to_string(entries).context("serialising recent searches")
}

/// Corrupt text decodes to an empty list.
pub fn decode(raw: &str) -> Vec<RecentSearch> {
    match serde_json::from_str::<Vec<RecentSearch>>(raw) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(%err, "ignoring corrupt recent searches");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecentSearchStore {
    prefs: Preferences,
    capacity: usize,
}

impl RecentSearchStore {
    pub fn new(prefs: Preferences, capacity: usize) -> Self {
        Self {
            prefs,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current entries, most recent first. Never fails: unreadable data is
    /// treated as an empty list.
    pub fn list(&self) -> Vec<RecentSearch> {
        let mut entries = match self.prefs.get_string(RECENT_SEARCHES_KEY) {
            Ok(Some(raw)) => decode(&raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(%err, "recent searches unavailable");
                Vec::new()
            }
        };
        // Stored lists may predate a lower capacity.
        entries.truncate(self.capacity);
        entries
    }

    pub fn add(&self, entry: RecentSearch) -> Result<()> {
        let mut entries = self.list();
        entries.retain(|existing| !existing.same_target(&entry));
        entries.insert(0, entry);
        entries.truncate(self.capacity);
        self.persist(&entries)
    }

    /// Returns whether anything was removed; nothing is written otherwise.
    pub fn remove(&self, entry: &RecentSearch) -> Result<bool> {
        let mut entries = self.list();
        let before = entries.len();
        entries.retain(|existing| !existing.same_target(entry));
        if entries.len() == before {
            return Ok(false);
        }
        self.persist(&entries)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        self.persist(&[])
    }

    fn persist(&self, entries: &[RecentSearch]) -> Result<()> {
        let raw = encode(entries)?;
        self.prefs
            .put_string(RECENT_SEARCHES_KEY, &raw)
            .context("persisting recent searches")?;
        tracing::debug!(count = entries.len(), "recent searches saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> RecentSearchStore {
        RecentSearchStore::new(Preferences::open(temp.path(), "search"), DEFAULT_CAPACITY)
    }

    fn labels(entries: &[RecentSearch]) -> Vec<(RecentSearchKind, String)> {
        entries
            .iter()
            .map(|entry| (entry.kind, entry.label.clone()))
            .collect()
    }

    #[test]
    fn repeated_search_moves_to_front_without_growing() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = store(&temp);
        store.add(RecentSearch::query("soup"))?;
        store.add(RecentSearch::query("bread"))?;
        store.add(RecentSearch::query("soup"))?;
        let entries = store.list();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "soup");
        Ok(())
    }

    #[test]
    fn case_insensitive_dedup_keeps_latest_spelling() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = store(&temp);
        store.add(RecentSearch::query("pasta"))?;
        store.add(RecentSearch::user("alice", None))?;
        store.add(RecentSearch::query("PASTA"))?;
        assert_eq!(
            labels(&store.list()),
            vec![
                (RecentSearchKind::Query, "PASTA".to_string()),
                (RecentSearchKind::User, "alice".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn same_label_different_kind_is_distinct() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = store(&temp);
        store.add(RecentSearch::query("alice"))?;
        store.add(RecentSearch::user("Alice", Some("Alice Waters".into())))?;
        assert_eq!(store.list().len(), 2);
        Ok(())
    }

    #[test]
    fn capacity_drops_oldest_entries() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = store(&temp);
        for idx in 0..20 {
            store.add(RecentSearch::query(format!("query {idx}")))?;
        }
        let entries = store.list();
        assert_eq!(entries.len(), 15);
        assert_eq!(entries[0].label, "query 19");
        assert_eq!(entries[14].label, "query 5");
        assert!(!entries.iter().any(|entry| entry.label == "query 4"));
        Ok(())
    }

    #[test]
    fn lowered_capacity_caps_stored_list() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let wide = store(&temp);
        for idx in 0..10 {
            wide.add(RecentSearch::query(format!("query {idx}")))?;
        }
        let narrow = RecentSearchStore::new(Preferences::open(temp.path(), "search"), 3);
        let entries = narrow.list();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].label, "query 9");
        assert_eq!(entries[2].label, "query 7");
        Ok(())
    }

    #[test]
    fn removing_missing_entry_writes_nothing() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = store(&temp);
        let removed = store.remove(&RecentSearch::query("nothing"))?;
        assert!(!removed);
        assert!(!temp.path().join("search.json").exists());

        store.add(RecentSearch::query("kept"))?;
        let path = temp.path().join("search.json");
        let before = fs::read_to_string(&path)?;
        assert!(!store.remove(&RecentSearch::recipe("kept", None, None))?);
        assert_eq!(fs::read_to_string(&path)?, before);
        assert_eq!(store.list().len(), 1);
        Ok(())
    }

    #[test]
    fn remove_matches_ignoring_case() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = store(&temp);
        store.add(RecentSearch::recipe("Lemon Tart", Some("chef".into()), None))?;
        store.add(RecentSearch::query("tart"))?;
        assert!(store.remove(&RecentSearch::recipe("lemon tart", None, None))?);
        assert_eq!(
            labels(&store.list()),
            vec![(RecentSearchKind::Query, "tart".to_string())]
        );
        Ok(())
    }

    #[test]
    fn clear_empties_the_list() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = store(&temp);
        store.add(RecentSearch::query("one"))?;
        store.clear()?;
        assert!(store.list().is_empty());
        Ok(())
    }

    #[test]
    fn list_survives_reopen() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        store(&temp).add(RecentSearch::user("bob", Some("Bob".into())))?;
        let reopened = store(&temp);
        assert_eq!(reopened.list()[0].secondary.as_deref(), Some("Bob"));
        Ok(())
    }

    #[test]
    fn encode_decode_round_trip() -> anyhow::Result<()> {
        let entries = vec![
            RecentSearch::recipe("Shakshuka", Some("nadia".into()), Some("file:///a.png".into())),
            RecentSearch::user("nadia", None),
            RecentSearch::query("eggs"),
        ];
        let raw = encode(&entries)?;
        assert!(raw.contains(r#""kind":"RECIPE""#));
        assert!(!raw.contains("null"));
        assert_eq!(decode(&raw), entries);
        Ok(())
    }

    #[test]
    fn corrupt_data_reads_as_empty() -> anyhow::Result<()> {
        assert!(decode("[{\"kind\":\"SPACESHIP\"").is_empty());

        let temp = TempDir::new()?;
        let store = store(&temp);
        let prefs = Preferences::open(temp.path(), "search");
        prefs.put_string(RECENT_SEARCHES_KEY, "definitely not json")?;
        assert!(store.list().is_empty());

        fs::write(temp.path().join("search.json"), "garbage")?;
        assert!(store.list().is_empty());
        store.add(RecentSearch::query("fresh start"))?;
        assert_eq!(store.list().len(), 1);
        Ok(())
    }

    #[test]
    fn kind_parses_from_cli_text() {
        assert_eq!("query".parse::<RecentSearchKind>().ok(), Some(RecentSearchKind::Query));
        assert_eq!(RecentSearchKind::Recipe.to_string(), "RECIPE");
    }
}
