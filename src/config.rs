use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_CACHE_DIR;
use crate::discover::DiscoveryOptions;
use crate::export::OutputFormat;
use crate::rules::{default_rules, RuleSet};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Replaces the built-in rules when non-empty.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Worker count; defaults to available hardware concurrency.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub force: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            workers: None,
            force: false,
        }
    }
}

fn default_extensions() -> Vec<String> {
    ["js", "jsx", "ts", "tsx", "vue", "html"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_dirs() -> Vec<String> {
    ["node_modules", "dist", "build", ".git"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// `-` writes to stdout.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("extracted_strings.txt")
}

/// One extraction rule as written in `[[rules]]`.
#[derive(Debug, Deserialize, Clone)]
pub struct RuleConfig {
    pub category: String,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_trim")]
    pub trim: bool,
}

fn default_trim() -> bool {
    true
}

impl Config {
    /// Discovery options for a scan of `root`.
    pub fn discovery(&self, root: &Path) -> DiscoveryOptions {
        DiscoveryOptions {
            root: root.to_path_buf(),
            extensions: self.scan.extensions.clone(),
            exclude_dirs: self.scan.exclude_dirs.clone(),
            exclude_globs: self.scan.exclude_globs.clone(),
            follow_symlinks: self.scan.follow_symlinks,
        }
    }

    /// Compiles the configured rules, or the built-in ones when none are set.
    pub fn rule_set(&self) -> Result<RuleSet> {
        if self.rules.is_empty() {
            RuleSet::compile(&default_rules())
        } else {
            RuleSet::compile(&self.rules)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.extensions.iter().all(|e| e.trim().is_empty()) {
            anyhow::bail!("scan.extensions must list at least one extension");
        }

        if self.scan.workers == Some(0) {
            anyhow::bail!("scan.workers must be > 0");
        }

        for rule in &self.rules {
            if rule.category.trim().is_empty() {
                anyhow::bail!("rules.category must not be empty");
            }
            if rule.patterns.is_empty() {
                anyhow::bail!("rule '{}' must define at least one pattern", rule.category);
            }
        }
        self.rule_set()?;

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(content: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("harvest.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let (_tmp, path) = write("");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.scan.extensions.len(), 6);
        assert!(cfg.scan.exclude_dirs.contains(&"node_modules".to_string()));
        assert_eq!(cfg.cache.dir, PathBuf::from(".i18n-cache"));
        assert_eq!(cfg.output.format, OutputFormat::Text);
        assert!(cfg.scan.workers.is_none());
        assert_eq!(cfg.rule_set().unwrap().len(), 8);
    }

    #[test]
    fn test_full_config() {
        let (_tmp, path) = write(
            r#"
[scan]
extensions = ["txt"]
exclude_dirs = ["vendor"]
workers = 3
force = true

[cache]
dir = "/tmp/harvest-cache"

[output]
format = "csv"
path = "-"

[[rules]]
category = "actions"
patterns = ['^(\w+)$']
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.scan.extensions, vec!["txt"]);
        assert_eq!(cfg.scan.workers, Some(3));
        assert!(cfg.scan.force);
        assert_eq!(cfg.output.format, OutputFormat::Csv);
        assert_eq!(cfg.rules.len(), 1);
        assert!(cfg.rules[0].trim);
        assert_eq!(cfg.rule_set().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let (_tmp, path) = write("[scan]\nworkers = 0\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_rejects_empty_extensions() {
        let (_tmp, path) = write("[scan]\nextensions = []\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_bad_rule_pattern() {
        let (_tmp, path) = write(
            r#"
[[rules]]
category = "broken"
patterns = ["(unclosed"]
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_unknown_format() {
        let (_tmp, path) = write("[output]\nformat = \"yaml\"\n");
        assert!(load_config(&path).is_err());
    }
}
