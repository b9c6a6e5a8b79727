//! Per-author year × topic timelines, the data behind the interactive author chart.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::Serialize;

use crate::InsightConfig;
use crate::corpus::{TopicTally, rank_counts};
use crate::error::{InsightError, Result};
use crate::record::{ArticleRecord, compare_topic_ids};

/// Which topics a timeline covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineMode {
    /// Every topic the author was ever assigned.
    Full,
    /// Only the author's most frequent topics (`InsightConfig::top_k`).
    Top5,
}

impl FromStr for TimelineMode {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "full" => Ok(Self::Full),
            "top5" => Ok(Self::Top5),
            other => Err(InsightError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for TimelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Top5 => "top5",
        })
    }
}

/// Mean proportion of one topic in one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub year: i32,
    pub topic: String,
    pub mean_proportion: f64,
}

/// Year × topic matrix of mean proportions for a single author.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTopicMatrix {
    pub mode: TimelineMode,
    pub article_count: usize,
    /// Distinct topics across all of the author's articles, whatever the mode.
    pub distinct_topic_count: usize,
    /// Topic axis in natural id order.
    pub topics: Vec<String>,
    /// `(min, max)` year with at least one point, `None` if no article has a usable year.
    pub year_range: Option<(i32, i32)>,
    /// Points ordered by year, then by position on the topic axis.
    pub points: Vec<TimelinePoint>,
}

impl YearTopicMatrix {
    /// Mean proportion at `(year, topic)`, used by renderers to scale marks.
    pub fn weight(&self, year: i32, topic: &str) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.year == year && p.topic == topic)
            .map(|p| p.mean_proportion)
    }

    pub fn topic_set(&self) -> HashSet<&str> {
        self.topics.iter().map(String::as_str).collect()
    }
}

/// Result of a timeline computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthorTimeline {
    Matrix(YearTopicMatrix),
    /// The author has articles, but none of them carries a topic.
    NoTopics {
        mode: TimelineMode,
        article_count: usize,
    },
}

impl AuthorTimeline {
    pub fn matrix(&self) -> Option<&YearTopicMatrix> {
        match self {
            Self::Matrix(m) => Some(m),
            Self::NoTopics { .. } => None,
        }
    }
}

/// Compute the timeline for one author's articles.
///
/// Rows whose year is missing or not above `config.min_year` still count toward
/// the article and topic totals but contribute no points.
pub fn compute_author_timeline(
    records: &[ArticleRecord],
    mode: TimelineMode,
    config: &InsightConfig,
) -> Result<AuthorTimeline> {
    if records.is_empty() {
        return Err(InsightError::EmptyAuthorData);
    }
    let tally = TopicTally::from_records(records);
    if tally.is_empty() {
        return Ok(AuthorTimeline::NoTopics {
            mode,
            article_count: records.len(),
        });
    }

    let counts = tally.counts();
    let distinct_topic_count = counts.len();
    let mut topics: Vec<String> = match mode {
        TimelineMode::Full => counts.into_iter().map(|(t, _)| t).collect(),
        TimelineMode::Top5 => rank_counts(counts, config.top_k)
            .into_iter()
            .map(|(t, _)| t)
            .collect(),
    };
    topics.sort_by(|a, b| compare_topic_ids(a, b));
    let axis: HashMap<&str, usize> = topics
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut cells: HashMap<(i32, usize), (f64, usize)> = HashMap::new();
    for record in records {
        let Some(year) = record.year.filter(|&y| y > config.min_year) else {
            continue;
        };
        for assignment in &record.topics {
            if let Some(&idx) = axis.get(assignment.topic.as_str()) {
                let cell = cells.entry((year, idx)).or_insert((0.0, 0));
                cell.0 += assignment.proportion;
                cell.1 += 1;
            }
        }
    }

    let mut keys: Vec<(i32, usize)> = cells.keys().copied().collect();
    keys.sort_unstable();
    let year_range = keys.first().zip(keys.last()).map(|(lo, hi)| (lo.0, hi.0));
    let points = keys
        .into_iter()
        .map(|key| {
            let (sum, n) = cells[&key];
            TimelinePoint {
                year: key.0,
                topic: topics[key.1].clone(),
                mean_proportion: sum / n as f64,
            }
        })
        .collect();

    Ok(AuthorTimeline::Matrix(YearTopicMatrix {
        mode,
        article_count: records.len(),
        distinct_topic_count,
        topics,
        year_range,
        points,
    }))
}

/// Sorted, deduplicated names of every credited author.
pub fn unique_author_names(records: &[ArticleRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.authors.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Copies of the records crediting `name`. No match is an [`InsightError::UnknownAuthor`].
pub fn records_for_author(records: &[ArticleRecord], name: &str) -> Result<Vec<ArticleRecord>> {
    let subset: Vec<ArticleRecord> = records.iter().filter(|r| r.credits(name)).cloned().collect();
    if subset.is_empty() {
        return Err(InsightError::UnknownAuthor(name.trim().to_string()));
    }
    debug!("{} records for author {name:?}", subset.len());
    Ok(subset)
}

/// Resolve the mode, select the author's records and compute their timeline.
pub fn author_timeline(
    records: &[ArticleRecord],
    author: &str,
    mode: &str,
    config: &InsightConfig,
) -> Result<AuthorTimeline> {
    let mode: TimelineMode = mode.parse()?;
    let subset = records_for_author(records, author)?;
    compute_author_timeline(&subset, mode, config)
}
