//! Year-bucketed article counts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::ArticleRecord;

/// Which column a dataset dates its articles by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YearField {
    /// A numeric year column.
    Year,
    /// The year of a publication timestamp.
    DatePublished,
}

impl YearField {
    fn of(self, record: &ArticleRecord) -> Option<i32> {
        match self {
            Self::Year => record.year,
            Self::DatePublished => record.published_year,
        }
    }
}

/// Count articles per year, ascending. Records without a year, or with a year not
/// above `min_year`, are skipped.
pub fn compute_year_distribution(
    records: &[ArticleRecord],
    field: YearField,
    min_year: i32,
) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for year in records.iter().filter_map(|r| field.of(r)) {
        if year > min_year {
            *counts.entry(year).or_insert(0) += 1;
        }
    }
    counts
}

/// The year distribution of one named dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearDistribution {
    pub label: String,
    pub field: YearField,
    pub counts: BTreeMap<i32, usize>,
}

impl YearDistribution {
    pub fn compute(
        label: &str,
        records: &[ArticleRecord],
        field: YearField,
        min_year: i32,
    ) -> Self {
        Self {
            label: label.to_string(),
            field,
            counts: compute_year_distribution(records, field, min_year),
        }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}
