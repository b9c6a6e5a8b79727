//! Per-author topical range: how many distinct topics each author has written on.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::InsightConfig;
use crate::record::ArticleRecord;

/// Map every credited author to the set of topics found on their articles.
///
/// Co-authors each receive the article's full topic set. Authors whose articles
/// carry no topics do not appear.
pub fn author_topic_sets(records: &[ArticleRecord]) -> BTreeMap<String, BTreeSet<String>> {
    let mut sets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for record in records {
        if record.topics.is_empty() {
            continue;
        }
        for author in &record.authors {
            let set = sets.entry(author.clone()).or_default();
            set.extend(record.topics.iter().map(|a| a.topic.clone()));
        }
    }
    sets
}

/// Linear-interpolation percentile (`q` in `[0, 1]`) of an ascending slice.
///
/// Matches the default method of most numeric libraries: the value at rank
/// `q * (n - 1)`, interpolated between its neighbours. Returns 0.0 for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

/// Summary statistics over the sizes of all author topic sets.
///
/// With zero authors every field is zero; check [`AuthorStats::is_empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthorStats {
    pub mean: f64,
    pub median: f64,
    pub min: usize,
    pub max: usize,
    pub percentile_25: f64,
    pub percentile_75: f64,
    /// Authors whose topic set is strictly larger than the configured threshold.
    pub broad_range_authors: usize,
    pub broad_range_threshold: usize,
    pub unique_authors: usize,
}

impl AuthorStats {
    pub fn is_empty(&self) -> bool {
        self.unique_authors == 0
    }

    fn from_sizes(mut sizes: Vec<usize>, threshold: usize) -> Self {
        if sizes.is_empty() {
            return Self {
                broad_range_threshold: threshold,
                ..Self::default()
            };
        }
        sizes.sort_unstable();
        let as_f64: Vec<f64> = sizes.iter().map(|&s| s as f64).collect();
        let n = sizes.len();
        Self {
            mean: as_f64.iter().sum::<f64>() / n as f64,
            median: percentile(&as_f64, 0.5),
            min: sizes[0],
            max: sizes[n - 1],
            percentile_25: percentile(&as_f64, 0.25),
            percentile_75: percentile(&as_f64, 0.75),
            broad_range_authors: sizes.iter().filter(|&&s| s > threshold).count(),
            broad_range_threshold: threshold,
            unique_authors: n,
        }
    }
}

/// Compute [`AuthorStats`] over the whole record set.
pub fn compute_author_stats(records: &[ArticleRecord], config: &InsightConfig) -> AuthorStats {
    let sizes = author_topic_sets(records).values().map(BTreeSet::len).collect();
    AuthorStats::from_sizes(sizes, config.broad_range_threshold)
}
