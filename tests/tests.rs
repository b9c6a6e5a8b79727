//! Integration tests for `topic_insights`.
//
// This suite verifies:
// - Library behavior (record parsing, corpus/author/timeline/year aggregation, loading)
// - CLI behavior including export formats, author timelines and error exits
//
// Notes:
// - CLI tests run the binary with a per-process working directory (no global CWD change).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use regex::Regex;
use serde_json::Value as Json;
use tempfile::tempdir;

use topic_insights::{
    ArticleRecord, AuthorTimeline, Dataset, ExportFormat, InsightConfig, InsightError,
    TimelineMode, TopicAssignment, TopicField, YearField, author_topic_sets, author_timeline,
    build_dashboard, compute_author_stats, compute_corpus_insights, compute_year_distribution,
    export_dashboard, load_records, normalize_records, parse_topic_field,
};

// --------------------- helpers ---------------------

/// Create a file with content in a temp dir.
fn write_file(dir: &assert_fs::TempDir, name: &str, content: &str) -> PathBuf {
    let f = dir.child(name);
    f.write_str(content).unwrap();
    f.path().to_path_buf()
}

/// Small journal corpus in the column layout of the source tables.
const JOURNAL_CSV: &str = "url,annee,name,top_2_topics_with_prop
u1,2001,A|B,\"[('t1', 0.6), ('t2', 0.3)]\"
u2,2001,A,\"[('t1', 0.4)]\"
u3,2003,C,\"[(5, 0.7), (12, 0.2)]\"
u4,not_a_year,C,not a list
u5,500,,\"[('t2', 0.9)]\"
";

const NEWS_CSV: &str = "url,date_published
n1,2019-03-01T10:00:00+00:00
n2,2020-01-02 08:00:00
n3,garbage
";

fn scenario_records() -> Vec<ArticleRecord> {
    vec![
        ArticleRecord::new("a1")
            .with_year(2001)
            .with_authors("A|B")
            .with_topics([("t1", 0.6), ("t2", 0.3)]),
        ArticleRecord::new("a2")
            .with_year(2001)
            .with_authors("A")
            .with_topics([("t1", 0.4)]),
    ]
}

/// Run CLI successfully with a specific working directory.
fn run_cli_ok_in(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::Command::cargo_bin("topic_insights").unwrap();
    cmd.current_dir(dir);
    cmd.args(args).assert().success()
}

/// Run CLI expecting failure with a specific working directory.
fn run_cli_fail_in(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::Command::cargo_bin("topic_insights").unwrap();
    cmd.current_dir(dir);
    cmd.args(args).assert().failure()
}

/// Find an export file whose name ends with a given suffix (e.g., "_frequency.csv").
fn find_with_suffix(dir: &Path, suffix: &str) -> PathBuf {
    for entry in fs::read_dir(dir).unwrap().filter_map(|e| e.ok()) {
        let p = entry.path();
        if let Some(name) = p.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(suffix) {
                return p;
            }
        }
    }
    panic!("No file found ending with {}", suffix);
}

// --------------------- library tests ---------------------

#[test]
fn lib_scenario_frequency_and_proportion() {
    let cfg = InsightConfig::default();
    let insights = compute_corpus_insights(&scenario_records(), &cfg);

    let freq: HashMap<_, _> = insights.frequency_top.iter().cloned().collect();
    assert_eq!(freq["t1"], 2);
    assert_eq!(freq["t2"], 1);

    let prop: HashMap<_, _> = insights.proportion_top.iter().cloned().collect();
    assert!((prop["t1"] - 0.5).abs() < 1e-12);
    assert!((prop["t2"] - 0.3).abs() < 1e-12);

    // both articles touch distinct topic counts 2 and 1
    assert_eq!(insights.dispersion.total_articles(), 2);
    assert_eq!(insights.dispersion.bins[0].distinct_topics, 1);
}

#[test]
fn lib_scenario_author_sets() {
    let sets = author_topic_sets(&scenario_records());
    assert_eq!(sets["A"].len(), 2);
    // co-author B receives the full topic set of the shared article
    assert_eq!(sets["B"].len(), 2);

    let stats = compute_author_stats(&scenario_records(), &InsightConfig::default());
    assert_eq!(stats.unique_authors, sets.len());
    assert!(stats.min as f64 <= stats.percentile_25);
    assert!(stats.percentile_25 <= stats.median);
    assert!(stats.median <= stats.percentile_75);
    assert!(stats.percentile_75 <= stats.max as f64);
}

#[test]
fn lib_topic_field_parsing() {
    let parsed = parse_topic_field(&TopicField::Raw("[('t1', 0.5), ('t2', 0.5)]".into()));
    assert_eq!(
        parsed,
        vec![TopicAssignment::new("t1", 0.5), TopicAssignment::new("t2", 0.5)]
    );
    assert!(parse_topic_field(&TopicField::Raw("not a list".into())).is_empty());
    assert_eq!(parse_topic_field(&TopicField::Parsed(parsed.clone())), parsed);
}

#[test]
fn lib_year_distribution_drops_invalid() {
    let td = assert_fs::TempDir::new().unwrap();
    let p = write_file(&td, "years.csv", "id,year\na,2005\nb,not_a_year\nc,500\nd,2005\n");
    let records = normalize_records(&load_records(&p, &InsightConfig::default()).unwrap());
    let dist = compute_year_distribution(&records, YearField::Year, 1000);
    assert_eq!(dist.into_iter().collect::<Vec<_>>(), vec![(2005, 2)]);
}

#[test]
fn lib_unknown_author_is_distinct_from_empty() {
    let records = scenario_records();
    let cfg = InsightConfig::default();
    let err = author_timeline(&records, "Zed", "full", &cfg).unwrap_err();
    assert!(matches!(err, InsightError::UnknownAuthor(_)));

    let err = author_timeline(&records, "A", "sideways", &cfg).unwrap_err();
    assert!(matches!(err, InsightError::InvalidMode(_)));
}

#[test]
fn lib_timeline_from_loaded_csv() {
    let td = assert_fs::TempDir::new().unwrap();
    let p = write_file(&td, "journal.csv", JOURNAL_CSV);
    let cfg = InsightConfig::default();
    let ds = Dataset::load(&p, &cfg).unwrap();
    assert_eq!(ds.label, "journal");
    assert_eq!(ds.year_field, YearField::Year);

    let t = author_timeline(&ds.records, "C", "full", &cfg).unwrap();
    let m = t.matrix().expect("C has topics");
    assert_eq!(m.mode, TimelineMode::Full);
    assert_eq!(m.article_count, 2);
    assert_eq!(m.topics, vec!["5", "12"]);
    assert_eq!(m.year_range, Some((2003, 2003)));
    assert!((m.weight(2003, "5").unwrap() - 0.7).abs() < 1e-12);
}

#[test]
fn lib_dashboard_two_datasets() {
    let td = assert_fs::TempDir::new().unwrap();
    let j = write_file(&td, "journal.csv", JOURNAL_CSV);
    let n = write_file(&td, "news.csv", NEWS_CSV);
    let cfg = InsightConfig::default();
    let journal = Dataset::load(&j, &cfg).unwrap();
    let news = Dataset::load(&n, &cfg).unwrap();
    assert_eq!(news.year_field, YearField::DatePublished);

    let report = build_dashboard(&journal, Some(&news), &cfg);
    assert_eq!(report.distributions[0].counts.len(), 2); // 2001, 2003
    assert_eq!(report.distributions[1].total(), 2);
    // conservation: every assignment is counted once
    let freq_sum: usize = report.corpus.frequency_top.iter().map(|(_, c)| c).sum();
    assert_eq!(freq_sum, report.corpus.total_assignments);
    assert_eq!(report.corpus.total_assignments, 6);
    assert_eq!(report.author_names, vec!["A", "B", "C"]);
}

#[test]
fn lib_export_json_dashboard() {
    let td = tempdir().unwrap();
    let ds = Dataset::new("mini", scenario_records());
    let report = build_dashboard(&ds, None, &InsightConfig::default());
    let files = export_dashboard(
        &report,
        &Default::default(),
        td.path(),
        "mini",
        ExportFormat::Json,
    )
    .unwrap();
    assert_eq!(files.len(), 1);
    let v: Json = serde_json::from_str(&fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(v["authors"]["unique_authors"], 2);
    assert_eq!(v["corpus"]["frequency_top"][0][0], "t1");
}

#[test]
fn lib_topicless_author_marker() {
    let records = vec![ArticleRecord::new("x").with_year(2010).with_authors("Solo")];
    let t = author_timeline(&records, "Solo", "top5", &InsightConfig::default()).unwrap();
    assert!(matches!(t, AuthorTimeline::NoTopics { article_count: 1, .. }));
}

// --------------------- CLI tests ---------------------

#[test]
fn cli_nonexistent_path_fails() {
    let td = tempdir().unwrap();
    let bad = td.path().join("does_not_exist.csv");
    run_cli_fail_in(td.path(), &[bad.to_string_lossy().as_ref()]);
}

#[test]
fn cli_unsupported_extension_fails() {
    let td = assert_fs::TempDir::new().unwrap();
    let p = write_file(&td, "corpus.xml", "<x/>");
    run_cli_fail_in(td.path(), &[p.to_str().unwrap()])
        .stderr(predicate::str::contains("unsupported input format"));
}

#[test]
fn cli_dashboard_csv_exports() {
    let td = assert_fs::TempDir::new().unwrap();
    let j = write_file(&td, "journal.csv", JOURNAL_CSV);
    let n = write_file(&td, "news.csv", NEWS_CSV);

    run_cli_ok_in(
        td.path(),
        &[
            j.to_str().unwrap(),
            "--compare",
            n.to_str().unwrap(),
            "--export-format",
            "csv",
        ],
    )
    .stdout(predicate::str::contains("Top topics by frequency"));

    let re = Regex::new(r"^journal_\d{8}_\d{6}_frequency\.csv$").unwrap();
    let found = fs::read_dir(td.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| re.is_match(e.file_name().to_string_lossy().as_ref()));
    assert!(found, "Expected journal_*_frequency.csv in temp dir");

    let years = fs::read_to_string(find_with_suffix(td.path(), "_years.csv")).unwrap();
    assert!(years.contains("news,2019,1"));
    assert!(years.contains("journal,2001,2"));
}

#[test]
fn cli_dashboard_tsv_and_labels() {
    let td = assert_fs::TempDir::new().unwrap();
    let j = write_file(&td, "journal.csv", JOURNAL_CSV);
    let labels = write_file(&td, "topics.json", r#"{"t1": ["war", "peace"]}"#);

    run_cli_ok_in(
        td.path(),
        &[
            j.to_str().unwrap(),
            "--labels",
            labels.to_str().unwrap(),
            "--export-format",
            "tsv",
        ],
    )
    .stdout(predicate::str::contains("t1 (war, peace)"));

    let has_tsv = fs::read_dir(td.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.path().extension().map(|x| x == "tsv").unwrap_or(false));
    assert!(has_tsv, "Expected at least one .tsv export in temp dir");
}

#[test]
fn cli_author_timeline_json() {
    let td = assert_fs::TempDir::new().unwrap();
    let j = write_file(&td, "journal.csv", JOURNAL_CSV);

    run_cli_ok_in(
        td.path(),
        &[
            j.to_str().unwrap(),
            "--author",
            "A",
            "--mode",
            "top5",
            "--export-format",
            "json",
        ],
    );

    let p = find_with_suffix(td.path(), "_timeline.json");
    let v: Json = serde_json::from_str(&fs::read_to_string(p).unwrap()).unwrap();
    assert_eq!(v["status"], "matrix");
    assert_eq!(v["mode"], "top5");
    assert_eq!(v["article_count"], 2);
}

#[test]
fn cli_unknown_author_and_bad_mode_fail() {
    let td = assert_fs::TempDir::new().unwrap();
    let j = write_file(&td, "journal.csv", JOURNAL_CSV);

    run_cli_fail_in(td.path(), &[j.to_str().unwrap(), "--author", "Nobody"])
        .stderr(predicate::str::contains("author not found"));
    run_cli_fail_in(
        td.path(),
        &[j.to_str().unwrap(), "--author", "A", "--mode", "weekly"],
    )
    .stderr(predicate::str::contains("invalid timeline mode"));
}

#[test]
fn cli_list_authors() {
    let td = assert_fs::TempDir::new().unwrap();
    let j = write_file(&td, "journal.csv", JOURNAL_CSV);
    run_cli_ok_in(td.path(), &[j.to_str().unwrap(), "--list-authors"])
        .stdout("A\nB\nC\n");
}

#[test]
fn cli_row_limit() {
    let td = assert_fs::TempDir::new().unwrap();
    let j = write_file(&td, "journal.csv", JOURNAL_CSV);
    run_cli_fail_in(td.path(), &[j.to_str().unwrap(), "--max-rows", "2"])
        .stderr(predicate::str::contains("exceeding the limit"));
}
