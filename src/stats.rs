//! Scan summaries and cache health overview.
//!
//! [`write_summary`] prints what a scan did: cache hits vs. misses, failures,
//! per-category counts, and the documents carrying the most fragments.
//! [`run_stats`] inspects the cache file without scanning anything, used by
//! `harvest stats` to check what a previous run left behind.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;

use crate::cache::CacheStore;
use crate::pipeline::ScanReport;
use crate::progress::format_number;

/// Hotspot selection for [`write_summary`].
#[derive(Debug, Clone, Copy)]
pub struct HotspotOptions {
    pub top: usize,
    pub min_fragments: usize,
}

impl Default for HotspotOptions {
    fn default() -> Self {
        Self {
            top: 10,
            min_fragments: 1,
        }
    }
}

pub fn write_summary(
    report: &ScanReport,
    hotspots: HotspotOptions,
    out: &mut dyn Write,
) -> io::Result<()> {
    let stats = &report.stats;

    writeln!(out, "Harvest Scan Summary")?;
    writeln!(out, "====================")?;
    writeln!(out)?;
    writeln!(out, "  Documents:   {}", format_number(stats.discovered))?;
    writeln!(
        out,
        "  Cached:      {} ({}%)",
        format_number(stats.cache_hits),
        percent(stats.cache_hits, stats.discovered)
    )?;
    writeln!(out, "  Changed:     {}", format_number(stats.changed))?;
    writeln!(out, "  Extracted:   {}", format_number(stats.extracted))?;
    writeln!(out, "  Failed:      {}", format_number(stats.failed))?;
    writeln!(out, "  Workers:     {}", stats.workers)?;
    writeln!(out, "  Elapsed:     {:.2}s", report.elapsed.as_secs_f64())?;

    let cache_line = if report.cancelled {
        "unchanged (cancelled)".to_string()
    } else if let Some(err) = &report.persist_error {
        format!("NOT saved: {}", err)
    } else if report.persisted {
        "saved".to_string()
    } else {
        "up to date".to_string()
    };
    writeln!(out, "  Cache:       {}", cache_line)?;

    let aggregate = &report.aggregate;
    writeln!(out)?;
    writeln!(
        out,
        "  Fragments:   {} unique in {} categories",
        format_number(aggregate.total_fragments() as u64),
        aggregate.category_count()
    )?;

    if aggregate.category_count() > 0 {
        writeln!(out)?;
        writeln!(out, "  {:<24} {:>8} {:>12}", "CATEGORY", "UNIQUE", "OCCURRENCES")?;
        writeln!(out, "  {}", "-".repeat(46))?;
        for (category, set) in aggregate.categories() {
            writeln!(
                out,
                "  {:<24} {:>8} {:>12}",
                category,
                set.len(),
                aggregate.occurrences(category)
            )?;
        }
    }

    let top = report.hotspots(hotspots.top, hotspots.min_fragments);
    if !top.is_empty() {
        writeln!(out)?;
        writeln!(out, "  Top documents:")?;
        for doc in top {
            writeln!(
                out,
                "  {:>6}  {}{}",
                doc.fragments,
                doc.id,
                if doc.cached { "" } else { "  (extracted)" }
            )?;
        }
    }

    writeln!(out)?;
    Ok(())
}

/// Print cache statistics for the store in `cache_dir`.
pub fn run_stats(cache_dir: &Path, out: &mut dyn Write) -> Result<()> {
    let store = CacheStore::load(cache_dir)?;
    let size = std::fs::metadata(store.path()).map(|m| m.len()).unwrap_or(0);

    let mut categories: BTreeMap<&str, u64> = BTreeMap::new();
    let mut fragments = 0u64;
    let mut latest = None;
    for (_, entry) in store.entries() {
        for (category, set) in entry.results.iter() {
            *categories.entry(category).or_default() += set.len() as u64;
            fragments += set.len() as u64;
        }
        latest = latest.max(Some(entry.computed_at));
    }

    writeln!(out, "Harvest Cache Stats")?;
    writeln!(out, "===================")?;
    writeln!(out)?;
    writeln!(out, "  Cache:       {}", store.path().display())?;
    writeln!(out, "  Size:        {}", format_bytes(size))?;
    writeln!(out)?;
    writeln!(out, "  Documents:   {}", format_number(store.len() as u64))?;
    writeln!(out, "  Fragments:   {}", format_number(fragments))?;
    writeln!(
        out,
        "  Updated:     {}",
        match latest {
            Some(ts) => format_ts_relative(ts.timestamp()),
            None => "never".to_string(),
        }
    )?;

    if !categories.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {:<24} {:>12}", "CATEGORY", "OCCURRENCES")?;
        writeln!(out, "  {}", "-".repeat(38))?;
        for (category, n) in &categories {
            writeln!(out, "  {:<24} {:>12}", category, n)?;
        }
    }

    writeln!(out)?;
    Ok(())
}

fn percent(part: u64, whole: u64) -> u64 {
    if whole > 0 {
        (part * 100) / whole
    } else {
        0
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;
    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::fingerprint::fingerprint;
    use crate::models::{DocumentSummary, Fragments};
    use crate::pipeline::ScanStats;
    use std::time::Duration;
    use tempfile::TempDir;

    fn report() -> ScanReport {
        let mut aggregate = Aggregate::new();
        let a: Fragments = [("buttons", "Save"), ("labels", "Name")].into_iter().collect();
        let b: Fragments = [("buttons", "Save")].into_iter().collect();
        aggregate.merge(&a);
        aggregate.merge(&b);
        ScanReport {
            aggregate,
            stats: ScanStats {
                discovered: 4,
                cache_hits: 1,
                changed: 2,
                extracted: 2,
                failed: 1,
                workers: 2,
            },
            documents: vec![
                DocumentSummary {
                    id: "src/a.tsx".into(),
                    fragments: 2,
                    cached: true,
                },
                DocumentSummary {
                    id: "src/b.tsx".into(),
                    fragments: 1,
                    cached: false,
                },
            ],
            persisted: true,
            persist_error: None,
            cancelled: false,
            elapsed: Duration::from_millis(120),
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut buf = Vec::new();
        write_summary(&report(), HotspotOptions::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Cached:      1 (25%)"));
        // The failed document was never queued, so it is not "changed".
        assert!(text.contains("Changed:     2"));
        assert!(text.contains("Failed:      1"));
        assert!(text.contains("Cache:       saved"));
        assert!(text.contains("2 unique in 2 categories"));
        // "Save" is unique once but occurs in both documents.
        assert!(text.contains(&format!("  {:<24} {:>8} {:>12}", "buttons", 1, 2)));
        assert!(text.find("src/a.tsx").unwrap() < text.find("src/b.tsx").unwrap());
    }

    #[test]
    fn test_summary_reports_persist_failure() {
        let mut r = report();
        r.persisted = false;
        r.persist_error = Some("disk full".to_string());
        let mut buf = Vec::new();
        write_summary(&r, HotspotOptions::default(), &mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("NOT saved: disk full"));
    }

    #[test]
    fn test_stats_reads_cache() {
        let tmp = TempDir::new().unwrap();
        let mut store = CacheStore::empty(tmp.path());
        let results: Fragments = [("labels", "Name"), ("labels", "Email")].into_iter().collect();
        store.upsert("a.vue".into(), fingerprint(b"a"), results);
        store.save().unwrap();

        let mut buf = Vec::new();
        run_stats(tmp.path(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Documents:   1"));
        assert!(text.contains("Fragments:   2"));
        assert!(text.contains("just now"));
    }

    #[test]
    fn test_stats_rejects_corrupt_cache() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(crate::cache::CACHE_FILE), "{oops").unwrap();
        let mut buf = Vec::new();
        assert!(run_stats(tmp.path(), &mut buf).is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
    }
}
