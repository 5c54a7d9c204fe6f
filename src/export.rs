//! Write the aggregate result as text, JSON, or CSV.
//!
//! All formats iterate categories and fragments in sorted order, so the same
//! tree always produces byte-identical output apart from the generation
//! timestamp.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Serialize)]
struct ExportData<'a> {
    metadata: ExportMetadata,
    strings: BTreeMap<&'a str, Vec<&'a str>>,
}

#[derive(Serialize)]
struct ExportMetadata {
    generated: String,
    total_strings: usize,
    categories: usize,
}

/// Writes `aggregate` in `format`.
///
/// A path of `-` writes to stdout. Otherwise parent directories are created
/// as needed.
pub fn write_output(aggregate: &Aggregate, format: OutputFormat, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    render(aggregate, format, &mut buf)?;

    if path == Path::new("-") {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&buf)?;
        stdout.flush()?;
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, &buf)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    Ok(())
}

pub fn render(aggregate: &Aggregate, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Text => render_text(aggregate, out),
        OutputFormat::Json => render_json(aggregate, out),
        OutputFormat::Csv => render_csv(aggregate, out),
    }
}

fn render_text(aggregate: &Aggregate, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "# Extracted Strings for i18n")?;
    writeln!(out, "# Generated: {}", Utc::now().to_rfc3339())?;
    writeln!(out)?;
    for (category, set) in aggregate.categories() {
        writeln!(out)?;
        writeln!(out, "## {} ({} strings)", category.to_uppercase(), set.len())?;
        writeln!(out)?;
        for fragment in set {
            writeln!(out, "- {}", fragment)?;
        }
    }
    Ok(())
}

fn render_json(aggregate: &Aggregate, out: &mut dyn Write) -> Result<()> {
    let data = ExportData {
        metadata: ExportMetadata {
            generated: Utc::now().to_rfc3339(),
            total_strings: aggregate.total_fragments(),
            categories: aggregate.category_count(),
        },
        strings: aggregate
            .categories()
            .map(|(c, set)| (c, set.iter().map(String::as_str).collect()))
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &data)?;
    writeln!(out)?;
    Ok(())
}

fn render_csv(aggregate: &Aggregate, out: &mut dyn Write) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["Category", "String", "Suggested Key"])?;
    for (category, set) in aggregate.categories() {
        for fragment in set {
            let key = suggested_key(fragment);
            writer.write_record([category, fragment.as_str(), key.as_str()])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Translation key suggestion: lowercase, spaces and dashes become `_`,
/// anything else outside `[a-z0-9_]` is dropped.
pub fn suggested_key(fragment: &str) -> String {
    fragment
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('_'),
            'a'..='z' | '0'..='9' | '_' => Some(c),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fragments;
    use tempfile::TempDir;

    fn sample() -> Aggregate {
        let mut agg = Aggregate::new();
        let f: Fragments = [
            ("buttons", "Save"),
            ("buttons", "Cancel"),
            ("labels", "E-mail address"),
        ]
        .into_iter()
        .collect();
        agg.merge(&f);
        agg
    }

    fn rendered(format: OutputFormat) -> String {
        let mut buf = Vec::new();
        render(&sample(), format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_suggested_key() {
        assert_eq!(suggested_key("Save changes"), "save_changes");
        assert_eq!(suggested_key("E-mail address!"), "e_mail_address");
        assert_eq!(suggested_key("  Don't go  "), "dont_go");
    }

    #[test]
    fn test_text_sections_sorted() {
        let text = rendered(OutputFormat::Text);
        let buttons = text.find("## BUTTONS (2 strings)").unwrap();
        let labels = text.find("## LABELS (1 strings)").unwrap();
        assert!(buttons < labels);
        assert!(text.find("- Cancel").unwrap() < text.find("- Save").unwrap());
    }

    #[test]
    fn test_json_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&rendered(OutputFormat::Json)).unwrap();
        assert_eq!(value["metadata"]["total_strings"], 3);
        assert_eq!(value["metadata"]["categories"], 2);
        assert_eq!(value["strings"]["buttons"], serde_json::json!(["Cancel", "Save"]));
    }

    #[test]
    fn test_csv_rows() {
        let csv = rendered(OutputFormat::Csv);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "Category,String,Suggested Key");
        assert_eq!(lines[1], "buttons,Cancel,cancel");
        assert_eq!(lines[3], "labels,E-mail address,e_mail_address");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/strings.json");
        write_output(&sample(), OutputFormat::Json, &path).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("\"buttons\""));
    }
}
