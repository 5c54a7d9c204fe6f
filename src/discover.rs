use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::models::DocumentId;

/// What to walk and what to keep.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub root: PathBuf,
    /// Extension allow-list, compared case-insensitively without the dot.
    pub extensions: Vec<String>,
    /// A path is excluded when any of its segments equals one of these.
    pub exclude_dirs: Vec<String>,
    /// Extra exclusions matched against the root-relative path.
    pub exclude_globs: Vec<String>,
    pub follow_symlinks: bool,
}

/// Lazy walk over the candidate documents under a root. Never reads file
/// contents; calling [`discover`] again restarts the walk.
pub struct Discovery {
    walker: walkdir::IntoIter,
    root: PathBuf,
    extensions: Vec<String>,
    exclude_dirs: Vec<String>,
    exclude_set: GlobSet,
}

pub fn discover(options: &DiscoveryOptions) -> Result<Discovery, ScanError> {
    let root = &options.root;
    if !root.exists() {
        return Err(ScanError::RootMissing(root.clone()));
    }
    if !root.is_dir() {
        return Err(ScanError::RootNotDirectory(root.clone()));
    }

    let extensions = options
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    Ok(Discovery {
        walker: WalkDir::new(root)
            .follow_links(options.follow_symlinks)
            .into_iter(),
        root: root.clone(),
        extensions,
        exclude_dirs: options.exclude_dirs.clone(),
        exclude_set: build_globset(&options.exclude_globs)?,
    })
}

impl Discovery {
    fn is_excluded(&self, relative: &Path) -> bool {
        let in_excluded_dir = relative.components().any(|c| match c {
            Component::Normal(segment) => self
                .exclude_dirs
                .iter()
                .any(|dir| segment == std::ffi::OsStr::new(dir)),
            _ => false,
        });
        in_excluded_dir || self.exclude_set.is_match(relative)
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }
}

impl Iterator for Discovery {
    type Item = DocumentId;

    fn next(&mut self) -> Option<DocumentId> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unwalkable entry");
                    continue;
                }
            };

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);

            if entry.file_type().is_dir() {
                // Prune whole subtrees instead of filtering every file in them.
                if entry.depth() > 0 && self.is_excluded(relative) {
                    self.walker.skip_current_dir();
                }
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            if self.is_excluded(relative) || !self.has_allowed_extension(path) {
                continue;
            }

            return Some(DocumentId::from_path(path));
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScanError::Glob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScanError::Glob {
        pattern: patterns.join(","),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn options(root: &Path) -> DiscoveryOptions {
        DiscoveryOptions {
            root: root.to_path_buf(),
            extensions: vec!["tsx".to_string(), ".HTML".to_string()],
            exclude_dirs: vec!["node_modules".to_string(), "dist".to_string()],
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }

    fn names(root: &Path, opts: &DiscoveryOptions) -> BTreeSet<String> {
        discover(opts)
            .unwrap()
            .map(|id| {
                id.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_filters_by_extension_and_segment() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/App.tsx");
        touch(root, "src/index.html");
        touch(root, "src/Page.HTML");
        touch(root, "src/util.rs");
        touch(root, "node_modules/lib/Thing.tsx");
        touch(root, "src/dist/bundle.tsx");
        // Substring of an excluded name is not excluded.
        touch(root, "distribution/Keep.tsx");

        let found = names(root, &options(root));
        let expected: BTreeSet<String> = [
            "distribution/Keep.tsx",
            "src/App.tsx",
            "src/Page.HTML",
            "src/index.html",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_exclude_globs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/App.tsx");
        touch(root, "src/App.test.tsx");

        let mut opts = options(root);
        opts.exclude_globs = vec!["**/*.test.tsx".to_string()];
        let found = names(root, &opts);
        assert_eq!(found.len(), 1);
        assert!(found.contains("src/App.tsx"));
    }

    #[test]
    fn test_restart_yields_same_membership() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        for i in 0..20 {
            touch(root, &format!("d{}/f{}.tsx", i % 4, i));
        }
        let opts = options(root);
        assert_eq!(names(root, &opts), names(root, &opts));
        assert_eq!(names(root, &opts).len(), 20);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let opts = options(&tmp.path().join("missing"));
        assert!(matches!(discover(&opts), Err(ScanError::RootMissing(_))));
    }

    #[test]
    fn test_file_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.tsx");
        let opts = options(&tmp.path().join("a.tsx"));
        assert!(matches!(discover(&opts), Err(ScanError::RootNotDirectory(_))));
    }

    #[test]
    fn test_invalid_glob_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut opts = options(tmp.path());
        opts.exclude_globs = vec!["a[".to_string()];
        assert!(matches!(discover(&opts), Err(ScanError::Glob { .. })));
    }
}
