#![forbid(unsafe_code)]
//! # Topic Insights
//!
//! Aggregation engine for article corpora annotated with topic-model output.
//! Each article carries a year, a pipe-delimited author list and a short list of
//! `(topic, proportion)` pairs; this crate turns a set of such records into the
//! numbers behind a topic dashboard:
//!
//! - corpus-wide topic frequency, average proportion and combined score,
//! - topical dispersion per article,
//! - per-author topical range statistics,
//! - per-author year × topic timelines (`full` or `top5`),
//! - year distributions for one or two datasets.
//!
//! Everything is a pure function of the records passed in. Loading
//! ([`loader`]) and output ([`export`]) are separate collaborators.
//!
//! ## Example
//! ```
//! use topic_insights::{
//!     ArticleRecord, InsightConfig, compute_author_stats, compute_corpus_insights,
//! };
//!
//! let records = vec![
//!     ArticleRecord::new("a1")
//!         .with_year(2001)
//!         .with_authors("A|B")
//!         .with_topics([("t1", 0.6), ("t2", 0.3)]),
//!     ArticleRecord::new("a2")
//!         .with_year(2001)
//!         .with_authors("A")
//!         .with_topics([("t1", 0.4)]),
//! ];
//! let cfg = InsightConfig::default();
//! let corpus = compute_corpus_insights(&records, &cfg);
//! assert_eq!(corpus.frequency_top[0], ("t1".to_string(), 2));
//! let authors = compute_author_stats(&records, &cfg);
//! assert_eq!(authors.unique_authors, 2);
//! ```

pub mod authors;
pub mod corpus;
pub mod error;
pub mod export;
pub mod loader;
pub mod record;
pub mod temporal;
pub mod timeline;

use log::info;
use serde::Serialize;

pub use authors::{AuthorStats, author_topic_sets, compute_author_stats, percentile};
pub use corpus::{
    CorpusInsights, DispersionBin, DispersionHistogram, average_proportions, combined_scores,
    compute_corpus_insights, dispersion_series, topic_frequency,
};
pub use error::{InsightError, Result};
pub use export::{ExportFormat, csv_safe_cell, export_dashboard, export_timeline, render_summary};
pub use loader::{Dataset, load_records, load_topic_labels};
pub use record::{
    ArticleRecord, RawRecord, TopicAssignment, TopicField, normalize_records, parse_authors,
    parse_topic_field,
};
pub use temporal::{YearDistribution, YearField, compute_year_distribution};
pub use timeline::{
    AuthorTimeline, TimelineMode, TimelinePoint, YearTopicMatrix, author_timeline,
    compute_author_timeline, records_for_author, unique_author_names,
};

/// Tunable constants of the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightConfig {
    /// Length of the frequency / proportion / combined rankings.
    pub top_n: usize,
    /// Topics kept by a `top5` author timeline.
    pub top_k: usize,
    /// Authors with strictly more distinct topics than this have a "broad topical range".
    pub broad_range_threshold: usize,
    /// Years at or below this value are placeholders and ignored.
    pub min_year: i32,
    /// Reject loaded tables larger than this. `None` disables the check.
    pub max_rows: Option<usize>,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            top_n: 15,
            top_k: 5,
            broad_range_threshold: 15,
            min_year: 1000,
            max_rows: Some(1_000_000),
        }
    }
}

/// Everything the dashboard page shows, minus the author timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub distributions: Vec<YearDistribution>,
    pub corpus: CorpusInsights,
    pub authors: AuthorStats,
    pub author_names: Vec<String>,
}

/// Build the dashboard for `primary`, adding the year distribution of `secondary`
/// when given.
pub fn build_dashboard(
    primary: &Dataset,
    secondary: Option<&Dataset>,
    config: &InsightConfig,
) -> DashboardReport {
    let distributions = std::iter::once(primary)
        .chain(secondary)
        .map(|d| YearDistribution::compute(&d.label, &d.records, d.year_field, config.min_year))
        .collect();

    let records = &primary.records;
    let ((corpus, authors), author_names) = rayon::join(
        || {
            rayon::join(
                || compute_corpus_insights(records, config),
                || compute_author_stats(records, config),
            )
        },
        || unique_author_names(records),
    );
    info!(
        "dashboard for {}: {} topics, {} authors",
        primary.label, corpus.distinct_topics, authors.unique_authors
    );

    DashboardReport {
        distributions,
        corpus,
        authors,
        author_names,
    }
}
