//! Regex rule set: the built-in [`Extractor`].
//!
//! A [`RuleSet`] is compiled once from configuration and shared read-only by
//! every worker. Each rule names a category, one or more patterns whose first
//! capture group is the fragment, the document kinds it applies to, and an
//! optional keyword filter.
//!
//! The defaults target UI text in web front-end sources:
//!
//! | Category        | Kinds                     | Captures |
//! |-----------------|---------------------------|----------|
//! | `jsx_content`   | jsx, tsx, vue, html       | text between tags |
//! | `buttons`       | jsx, tsx, vue, html       | `<button>` text |
//! | `labels`        | jsx, tsx, vue, html       | `<label>` text |
//! | `placeholders`  | jsx, tsx, vue, html       | `placeholder=` values |
//! | `attributes`    | jsx, tsx, vue, html       | `title=`, `alt=`, `aria-label=` values |
//! | `toasts_alerts` | jsx, tsx, vue, html       | `message:`/`title:`/`text:` values with status keywords |
//! | `validation`    | js, jsx, ts, tsx, vue     | quoted strings with validation words |
//! | `ui_literals`   | js, jsx, ts, tsx, vue     | capitalized quoted phrases |

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::RuleConfig;
use crate::error::ExtractError;
use crate::extract::Extractor;
use crate::models::{DocumentKind, Fragments};

const MARKUP_KINDS: &[&str] = &["jsx", "tsx", "vue", "html"];
const SCRIPT_KINDS: &[&str] = &["js", "jsx", "ts", "tsx", "vue"];

const STATUS_KEYWORDS: &[&str] = &[
    "error", "success", "warning", "info", "confirm", "saved", "deleted", "updated", "login",
    "logout",
];

struct Rule {
    category: String,
    patterns: Vec<Regex>,
    /// Empty means every kind.
    kinds: Vec<String>,
    /// Lowercase; empty means no filtering.
    keywords: Vec<String>,
    trim: bool,
}

impl Rule {
    fn applies_to(&self, kind: &DocumentKind) -> bool {
        self.kinds.is_empty() || self.kinds.iter().any(|k| k == kind.as_str())
    }

    fn collect(&self, content: &str, out: &mut Fragments) {
        out.touch(&self.category);
        for pattern in &self.patterns {
            for caps in pattern.captures_iter(content) {
                let Some(m) = caps.get(1) else { continue };
                let text = if self.trim { m.as_str().trim() } else { m.as_str() };
                if text.is_empty() || !self.passes_keywords(text) {
                    continue;
                }
                out.insert(&self.category, text);
            }
        }
    }

    fn passes_keywords(&self, text: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let lower = text.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

/// Immutable, compiled rule configuration.
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn compile(configs: &[RuleConfig]) -> Result<Self> {
        let mut rules = Vec::with_capacity(configs.len());
        for cfg in configs {
            let patterns = cfg
                .patterns
                .iter()
                .map(|p| {
                    Regex::new(p).with_context(|| {
                        format!("invalid pattern for category '{}': {}", cfg.category, p)
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            rules.push(Rule {
                category: cfg.category.clone(),
                patterns,
                kinds: cfg
                    .kinds
                    .iter()
                    .map(|k| DocumentKind::new(k).as_str().to_string())
                    .collect(),
                keywords: cfg.keywords.iter().map(|k| k.to_lowercase()).collect(),
                trim: cfg.trim,
            });
        }
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Extractor for RuleSet {
    fn classify(&self, content: &str, kind: &DocumentKind) -> Result<Fragments, ExtractError> {
        let mut out = Fragments::new();
        for rule in self.rules.iter().filter(|r| r.applies_to(kind)) {
            rule.collect(content, &mut out);
        }
        Ok(out)
    }
}

fn rule(
    category: &str,
    patterns: &[&str],
    kinds: &[&str],
    keywords: &[&str],
    trim: bool,
) -> RuleConfig {
    RuleConfig {
        category: category.to_string(),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        kinds: kinds.iter().map(|k| k.to_string()).collect(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        trim,
    }
}

/// Rule configuration used when the config file defines no `[[rules]]`.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        rule("jsx_content", &[r">([^<{]+)<"], MARKUP_KINDS, &[], true),
        rule(
            "buttons",
            &[r"(?i)<button[^>]*>([^<]+)</button>"],
            MARKUP_KINDS,
            &[],
            true,
        ),
        rule(
            "labels",
            &[r"(?i)<label[^>]*>([^<]+)</label>"],
            MARKUP_KINDS,
            &[],
            true,
        ),
        rule(
            "placeholders",
            &[r#"(?i)placeholder=["']([^"']+)["']"#],
            MARKUP_KINDS,
            &[],
            false,
        ),
        rule(
            "attributes",
            &[
                r#"(?i)title=["']([^"']+)["']"#,
                r#"(?i)alt=["']([^"']+)["']"#,
                r#"(?i)aria-label=["']([^"']+)["']"#,
            ],
            MARKUP_KINDS,
            &[],
            false,
        ),
        rule(
            "toasts_alerts",
            &[
                r#"message\s*[:=]\s*["']([^"']+)["']"#,
                r#"title\s*[:=]\s*["']([^"']+)["']"#,
                r#"text\s*[:=]\s*["']([^"']+)["']"#,
            ],
            MARKUP_KINDS,
            STATUS_KEYWORDS,
            false,
        ),
        rule(
            "validation",
            &[r#"(?i)["']([^"']*(?:required|invalid|error|must|cannot|please)[^"']*)["']"#],
            SCRIPT_KINDS,
            &[],
            false,
        ),
        rule(
            "ui_literals",
            &[r#"["']([A-Z][a-zA-Z\s]{2,})["']"#],
            SCRIPT_KINDS,
            &[],
            false,
        ),
    ]
}
