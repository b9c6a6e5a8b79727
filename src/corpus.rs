//! Corpus-wide topic statistics: frequency, average proportion, combined score
//! and per-article dispersion.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::InsightConfig;
use crate::record::ArticleRecord;

/// Per-topic counters, kept in the order topics were first seen.
#[derive(Debug, Default)]
pub(crate) struct TopicTally {
    order: Vec<String>,
    stats: HashMap<String, (usize, f64)>,
}

impl TopicTally {
    pub(crate) fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ArticleRecord>,
    {
        let mut tally = Self::default();
        for record in records {
            for assignment in &record.topics {
                tally.add(&assignment.topic, assignment.proportion);
            }
        }
        tally
    }

    pub(crate) fn add(&mut self, topic: &str, proportion: f64) {
        match self.stats.get_mut(topic) {
            Some((count, sum)) => {
                *count += 1;
                *sum += proportion;
            }
            None => {
                self.order.push(topic.to_string());
                self.stats.insert(topic.to_string(), (1, proportion));
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn total(&self) -> usize {
        self.stats.values().map(|(count, _)| count).sum()
    }

    pub(crate) fn counts(&self) -> Vec<(String, usize)> {
        self.order
            .iter()
            .map(|t| (t.clone(), self.stats[t].0))
            .collect()
    }

    fn averages(&self) -> Vec<(String, f64)> {
        self.order
            .iter()
            .map(|t| {
                let (count, sum) = self.stats[t];
                (t.clone(), sum / count as f64)
            })
            .collect()
    }
}

/// Sort by descending count. The sort is stable, so equal counts keep first-seen order.
pub(crate) fn rank_counts(mut table: Vec<(String, usize)>, n: usize) -> Vec<(String, usize)> {
    table.sort_by(|a, b| b.1.cmp(&a.1));
    table.truncate(n);
    table
}

fn rank_scores(mut table: Vec<(String, f64)>, n: usize) -> Vec<(String, f64)> {
    table.sort_by(|a, b| b.1.total_cmp(&a.1));
    table.truncate(n);
    table
}

/// Number of articles in which each topic appears, in first-seen order.
pub fn topic_frequency(records: &[ArticleRecord]) -> Vec<(String, usize)> {
    TopicTally::from_records(records).counts()
}

/// Mean proportion of each topic across all of its appearances, in first-seen order.
pub fn average_proportions(records: &[ArticleRecord]) -> Vec<(String, f64)> {
    TopicTally::from_records(records).averages()
}

/// `frequency * average proportion` for every topic that appears at least once.
pub fn combined_scores(records: &[ArticleRecord]) -> Vec<(String, f64)> {
    combine(&TopicTally::from_records(records))
}

fn combine(tally: &TopicTally) -> Vec<(String, f64)> {
    tally
        .counts()
        .into_iter()
        .zip(tally.averages())
        .map(|((topic, freq), (_, avg))| (topic, freq as f64 * avg))
        .collect()
}

/// Number of distinct topics per article id. Duplicate rows for the same id are merged;
/// rows with a blank id cannot be grouped and are left out.
pub fn dispersion_series(records: &[ArticleRecord]) -> BTreeMap<String, usize> {
    let mut groups: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    for record in records {
        if record.article_id.trim().is_empty() {
            continue;
        }
        let topics = groups.entry(record.article_id.as_str()).or_default();
        topics.extend(record.topics.iter().map(|a| a.topic.as_str()));
    }
    groups
        .into_iter()
        .map(|(id, topics)| (id.to_string(), topics.len()))
        .collect()
}

/// One histogram bar: how many articles touch exactly `distinct_topics` topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispersionBin {
    pub distinct_topics: usize,
    pub articles: usize,
}

/// Histogram over dispersion values, one bin per integer in `[min, max]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispersionHistogram {
    pub bins: Vec<DispersionBin>,
}

impl DispersionHistogram {
    pub fn from_series(series: &BTreeMap<String, usize>) -> Self {
        let (Some(&min), Some(&max)) = (series.values().min(), series.values().max()) else {
            return Self::default();
        };
        let mut counts = vec![0usize; max - min + 1];
        for &value in series.values() {
            counts[value - min] += 1;
        }
        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(offset, articles)| DispersionBin {
                distinct_topics: min + offset,
                articles,
            })
            .collect();
        Self { bins }
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn total_articles(&self) -> usize {
        self.bins.iter().map(|b| b.articles).sum()
    }
}

/// Corpus-wide summary, each table truncated to the configured top-N.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusInsights {
    pub frequency_top: Vec<(String, usize)>,
    pub proportion_top: Vec<(String, f64)>,
    pub combined_top: Vec<(String, f64)>,
    pub dispersion: DispersionHistogram,
    /// Total topic assignments seen across all records.
    pub total_assignments: usize,
    pub distinct_topics: usize,
}

impl CorpusInsights {
    /// True when the corpus carried no topic assignments at all.
    pub fn is_empty(&self) -> bool {
        self.total_assignments == 0
    }
}

/// Compute the corpus summary.
///
/// A corpus without any topic assignment (no records, or no topic column) yields
/// [`CorpusInsights::default`], every table empty.
pub fn compute_corpus_insights(
    records: &[ArticleRecord],
    config: &InsightConfig,
) -> CorpusInsights {
    let tally = TopicTally::from_records(records);
    if tally.is_empty() {
        return CorpusInsights::default();
    }

    let series = dispersion_series(records);
    CorpusInsights {
        frequency_top: rank_counts(tally.counts(), config.top_n),
        proportion_top: rank_scores(tally.averages(), config.top_n),
        combined_top: rank_scores(combine(&tally), config.top_n),
        dispersion: DispersionHistogram::from_series(&series),
        total_assignments: tally.total(),
        distinct_topics: tally.order.len(),
    }
}
