//! Output collaborator: writes aggregation results as text, CSV/TSV tables or JSON.
//!
//! Files are named `<stem>_<YYYYMMDD>_<HHMMSS>_<table>.<ext>` and written into the
//! given directory.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::prelude::*;
use clap::ValueEnum;
use serde::Serialize;

use crate::DashboardReport;
use crate::error::Result;
use crate::timeline::AuthorTimeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Txt,
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Json => "json",
        }
    }
}

/// Neutralise spreadsheet formula injection: a cell starting with `=`, `+`, `-`
/// or `@` gets a leading `'`. Cells already starting with `'` are left alone.
pub fn csv_safe_cell(cell: String) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@') => format!("'{cell}"),
        _ => cell,
    }
}

type Table = (Vec<&'static str>, Vec<Vec<String>>);

fn output_path(dir: &Path, stem: &str, table: &str, format: ExportFormat) -> PathBuf {
    let local: DateTime<Local> = Local::now();
    dir.join(format!(
        "{stem}_{}_{table}.{}",
        local.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    Ok(())
}

fn write_delimited(path: &Path, delimiter: u8, (headers, rows): &Table) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row.iter().cloned().map(csv_safe_cell))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_bytes(path, serde_json::to_string_pretty(value)?.as_bytes())
}

fn write_tables(
    dir: &Path,
    stem: &str,
    format: ExportFormat,
    tables: Vec<(&str, Table)>,
) -> Result<Vec<PathBuf>> {
    let delimiter = if format == ExportFormat::Tsv { b'\t' } else { b',' };
    let mut written = Vec::with_capacity(tables.len());
    for (name, table) in tables {
        let path = output_path(dir, stem, name, format);
        write_delimited(&path, delimiter, &table)?;
        written.push(path);
    }
    Ok(written)
}

fn dashboard_tables(report: &DashboardReport) -> Vec<(&'static str, Table)> {
    let ranked_f64 = |rows: &[(String, f64)]| -> Vec<Vec<String>> {
        rows.iter().map(|(t, v)| vec![t.clone(), format!("{v:.6}")]).collect()
    };
    let corpus = &report.corpus;
    let a = &report.authors;
    vec![
        (
            "frequency",
            (
                vec!["topic", "articles"],
                corpus
                    .frequency_top
                    .iter()
                    .map(|(t, c)| vec![t.clone(), c.to_string()])
                    .collect(),
            ),
        ),
        ("proportion", (vec!["topic", "average_proportion"], ranked_f64(&corpus.proportion_top))),
        ("combined", (vec!["topic", "combined_score"], ranked_f64(&corpus.combined_top))),
        (
            "dispersion",
            (
                vec!["distinct_topics", "articles"],
                corpus
                    .dispersion
                    .bins
                    .iter()
                    .map(|b| vec![b.distinct_topics.to_string(), b.articles.to_string()])
                    .collect(),
            ),
        ),
        (
            "years",
            (
                vec!["dataset", "year", "articles"],
                report
                    .distributions
                    .iter()
                    .flat_map(|d| {
                        d.counts
                            .iter()
                            .map(move |(y, n)| vec![d.label.clone(), y.to_string(), n.to_string()])
                    })
                    .collect(),
            ),
        ),
        (
            "authors",
            (
                vec!["statistic", "value"],
                vec![
                    vec!["unique_authors".into(), a.unique_authors.to_string()],
                    vec!["mean".into(), format!("{:.4}", a.mean)],
                    vec!["median".into(), format!("{:.4}", a.median)],
                    vec!["min".into(), a.min.to_string()],
                    vec!["max".into(), a.max.to_string()],
                    vec!["percentile_25".into(), format!("{:.4}", a.percentile_25)],
                    vec!["percentile_75".into(), format!("{:.4}", a.percentile_75)],
                    vec![
                        format!("authors_over_{}_topics", a.broad_range_threshold),
                        a.broad_range_authors.to_string(),
                    ],
                ],
            ),
        ),
    ]
}

fn label_suffix(labels: &BTreeMap<String, Vec<String>>, topic: &str) -> String {
    match labels.get(topic) {
        Some(words) if !words.is_empty() => {
            let head: Vec<&str> = words.iter().take(5).map(String::as_str).collect();
            format!(" ({})", head.join(", "))
        }
        _ => String::new(),
    }
}

/// Human-readable dashboard summary, annotated with topic labels when available.
pub fn render_summary(report: &DashboardReport, labels: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::new();
    for d in &report.distributions {
        out.push_str(&format!("=== Articles per year ({}): {} total ===\n", d.label, d.total()));
        for (year, n) in &d.counts {
            out.push_str(&format!("{year}: {n}\n"));
        }
        out.push('\n');
    }

    let corpus = &report.corpus;
    if corpus.is_empty() {
        out.push_str("=== Topics ===\nno topic assignments\n\n");
    } else {
        out.push_str("=== Top topics by frequency ===\n");
        for (t, c) in &corpus.frequency_top {
            out.push_str(&format!("{t}{}: {c}\n", label_suffix(labels, t)));
        }
        out.push_str("\n=== Top topics by average proportion ===\n");
        for (t, p) in &corpus.proportion_top {
            out.push_str(&format!("{t}{}: {p:.4}\n", label_suffix(labels, t)));
        }
        out.push_str("\n=== Top topics by combined score ===\n");
        for (t, s) in &corpus.combined_top {
            out.push_str(&format!("{t}{}: {s:.4}\n", label_suffix(labels, t)));
        }
        out.push_str("\n=== Topical dispersion (distinct topics: articles) ===\n");
        for b in &corpus.dispersion.bins {
            out.push_str(&format!("{}: {}\n", b.distinct_topics, b.articles));
        }
        out.push('\n');
    }

    let a = &report.authors;
    out.push_str("=== Authors ===\n");
    if a.is_empty() {
        out.push_str("no authors with topics\n");
    } else {
        out.push_str(&format!("unique authors: {}\n", a.unique_authors));
        out.push_str(&format!(
            "distinct topics per author: mean {:.2}, median {:.1}, min {}, max {}, q25 {:.1}, q75 {:.1}\n",
            a.mean, a.median, a.min, a.max, a.percentile_25, a.percentile_75
        ));
        out.push_str(&format!(
            "authors with more than {} topics: {}\n",
            a.broad_range_threshold, a.broad_range_authors
        ));
    }
    out
}

/// Human-readable author timeline.
pub fn render_timeline(author: &str, timeline: &AuthorTimeline) -> String {
    let mut out = String::new();
    match timeline {
        AuthorTimeline::NoTopics { mode, article_count } => {
            out.push_str(&format!(
                "=== {author} ({mode}) ===\n{article_count} articles, no topic assignments\n"
            ));
        }
        AuthorTimeline::Matrix(m) => {
            out.push_str(&format!(
                "=== {author} ({}) ===\n{} articles, {} distinct topics\n",
                m.mode, m.article_count, m.distinct_topic_count
            ));
            if let Some((lo, hi)) = m.year_range {
                out.push_str(&format!("years {lo}-{hi}\n"));
            }
            out.push_str(&format!("topics: {}\n", m.topics.join(", ")));
            for p in &m.points {
                out.push_str(&format!("{} {}: {:.4}\n", p.year, p.topic, p.mean_proportion));
            }
        }
    }
    out
}

/// Write the dashboard in `format`. Returns the files created.
pub fn export_dashboard(
    report: &DashboardReport,
    labels: &BTreeMap<String, Vec<String>>,
    dir: &Path,
    stem: &str,
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    match format {
        ExportFormat::Json => {
            let path = output_path(dir, stem, "dashboard", format);
            write_json(&path, report)?;
            Ok(vec![path])
        }
        ExportFormat::Txt => {
            let path = output_path(dir, stem, "summary", format);
            write_bytes(&path, render_summary(report, labels).as_bytes())?;
            Ok(vec![path])
        }
        ExportFormat::Csv | ExportFormat::Tsv => {
            write_tables(dir, stem, format, dashboard_tables(report))
        }
    }
}

/// Write one author's timeline in `format`. Returns the files created.
pub fn export_timeline(
    author: &str,
    timeline: &AuthorTimeline,
    dir: &Path,
    stem: &str,
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    let path = output_path(dir, stem, "timeline", format);
    match format {
        ExportFormat::Json => write_json(&path, timeline)?,
        ExportFormat::Txt => write_bytes(&path, render_timeline(author, timeline).as_bytes())?,
        ExportFormat::Csv | ExportFormat::Tsv => {
            let rows: Vec<Vec<String>> = timeline
                .matrix()
                .map(|m| {
                    m.points
                        .iter()
                        .map(|p| {
                            vec![
                                author.to_string(),
                                p.year.to_string(),
                                p.topic.clone(),
                                format!("{:.6}", p.mean_proportion),
                            ]
                        })
                        .collect()
                })
                .unwrap_or_default();
            let delimiter = if format == ExportFormat::Tsv { b'\t' } else { b',' };
            let table = (vec!["author", "year", "topic", "mean_proportion"], rows);
            write_delimited(&path, delimiter, &table)?;
        }
    }
    Ok(vec![path])
}
