//! Core data models used throughout the harvest pipeline.
//!
//! These types represent the documents, fingerprints, and fragment sets that
//! flow from discovery through extraction into the cache and the aggregate.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical identity of a discovered document: its path as found under the
/// scan root. Stable across runs as long as the file is not moved.
///
/// The identity compares, orders and serializes by its string key. The
/// original path is kept alongside so names that are not valid UTF-8 can
/// still be opened; the key is their lossy rendering.
#[derive(Debug, Clone)]
pub struct DocumentId {
    key: String,
    path: PathBuf,
}

impl DocumentId {
    pub fn from_path(path: &Path) -> Self {
        Self {
            key: path.to_string_lossy().into_owned(),
            path: path.to_path_buf(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercased extension, used as the [`DocumentKind`].
    pub fn kind(&self) -> DocumentKind {
        let ext = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        DocumentKind(ext)
    }
}

impl PartialEq for DocumentId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DocumentId {}

impl PartialOrd for DocumentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocumentId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Hash for DocumentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(DocumentId::from)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl From<String> for DocumentId {
    fn from(key: String) -> Self {
        let path = PathBuf::from(&key);
        Self { key, path }
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

/// File extension without the dot, lowercase (`"tsx"`, `"html"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKind(String);

impl DocumentKind {
    pub fn new(kind: &str) -> Self {
        Self(kind.trim_start_matches('.').to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lowercase hex SHA-256 digest of a document's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category label → set of fragments. Merge is per-category set union, so
/// merging is commutative and associative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragments(BTreeMap<String, BTreeSet<String>>);

impl Fragments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a category without adding fragments to it.
    pub fn touch(&mut self, category: &str) {
        self.0.entry(category.to_string()).or_default();
    }

    pub fn insert(&mut self, category: &str, fragment: impl Into<String>) -> bool {
        self.0
            .entry(category.to_string())
            .or_default()
            .insert(fragment.into())
    }

    pub fn merge(&mut self, other: &Fragments) {
        for (category, set) in &other.0 {
            self.0
                .entry(category.clone())
                .or_default()
                .extend(set.iter().cloned());
        }
    }

    pub fn get(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.0.get(category)
    }

    /// Categories in sorted order with their fragment sets.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.0.iter().map(|(c, s)| (c.as_str(), s))
    }

    pub fn category_count(&self) -> usize {
        self.0.len()
    }

    /// Sum of set sizes over all categories.
    pub fn fragment_count(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<C, F> FromIterator<(C, F)> for Fragments
where
    C: Into<String>,
    F: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (C, F)>>(iter: I) -> Self {
        let mut fragments = Fragments::new();
        for (category, fragment) in iter {
            let category: String = category.into();
            fragments.insert(&category, fragment);
        }
        fragments
    }
}

/// Persisted record linking a document to its last-known fingerprint and
/// extraction results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub computed_at: DateTime<Utc>,
    pub results: Fragments,
}

/// Per-document fragment total, used for the hotspot report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub fragments: usize,
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_lowercase_extension() {
        let id = DocumentId::from("src/components/Button.TSX");
        assert_eq!(id.kind().as_str(), "tsx");
        assert_eq!(DocumentId::from("Makefile").kind().as_str(), "");
        assert_eq!(DocumentKind::new(".Vue").as_str(), "vue");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = DocumentId::from_path(Path::new("src/App.vue"));
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""src/App.vue""#);
        let back: DocumentId = serde_json::from_str(r#""src/App.vue""#).unwrap();
        assert_eq!(back, id);
        assert_eq!(back.path(), Path::new("src/App.vue"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_keeps_original_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new("src").join(OsStr::from_bytes(b"caf\xe9.txt"));
        let id = DocumentId::from_path(&path);
        assert_eq!(id.path(), path.as_path());
        assert_eq!(id.as_str(), "src/caf\u{fffd}.txt");
        assert_eq!(id.kind().as_str(), "txt");
    }

    #[test]
    fn test_fragments_merge_is_union() {
        let mut a: Fragments = [("actions", "Save"), ("labels", "Name")].into_iter().collect();
        let b: Fragments = [("actions", "Save"), ("actions", "Cancel")].into_iter().collect();
        a.merge(&b);

        let actions: Vec<_> = a.get("actions").unwrap().iter().cloned().collect();
        assert_eq!(actions, vec!["Cancel", "Save"]);
        assert_eq!(a.fragment_count(), 3);
        assert_eq!(a.category_count(), 2);
    }

    #[test]
    fn test_touch_keeps_empty_category() {
        let mut f = Fragments::new();
        f.touch("buttons");
        assert!(f.get("buttons").unwrap().is_empty());
        assert_eq!(f.fragment_count(), 0);
        assert!(!f.is_empty());
    }

    #[test]
    fn test_fragments_serialize_as_plain_map() {
        let f: Fragments = [("actions", "Save")].into_iter().collect();
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(json, r#"{"actions":["Save"]}"#);
    }
}
