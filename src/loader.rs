//! Loading collaborator: turns CSV/TSV/JSON exports of the article tables into
//! [`RawRecord`]s, plus the topic-word label file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::InsightConfig;
use crate::error::{InsightError, Result};
use crate::record::{ArticleRecord, RawRecord, TopicAssignment, TopicField};
use crate::temporal::YearField;

const ID_COLUMNS: &[&str] = &["url", "article_id", "id"];
const YEAR_COLUMNS: &[&str] = &["annee", "year"];
const DATE_COLUMNS: &[&str] = &["date_published", "date"];
const AUTHOR_COLUMNS: &[&str] = &["name", "nom_auteur", "authors"];
const TOPIC_COLUMNS: &[&str] = &["top_2_topics_with_prop", "topics"];

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(alias)))
}

fn non_empty(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
}

fn check_limit(rows: usize, config: &InsightConfig) -> Result<()> {
    match config.max_rows {
        Some(limit) if rows > limit => Err(InsightError::InputTooLarge { rows, limit }),
        _ => Ok(()),
    }
}

/// Load raw records from a `.csv`, `.tsv` or `.json` file.
pub fn load_records(path: &Path, config: &InsightConfig) -> Result<Vec<RawRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let records = match ext.as_str() {
        "csv" => read_delimited(File::open(path)?, b',', config)?,
        "tsv" => read_delimited(File::open(path)?, b'\t', config)?,
        "json" => read_json(BufReader::new(File::open(path)?), config)?,
        _ => return Err(InsightError::UnsupportedFormat(path.display().to_string())),
    };
    info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read delimited text with a header row. Columns are matched by name; the article
/// id falls back to the first column.
pub fn read_delimited<R: Read>(
    reader: R,
    delimiter: u8,
    config: &InsightConfig,
) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if headers.is_empty() {
        return Err(InsightError::MissingColumn("header row".into()));
    }

    let id_col = find_column(&headers, ID_COLUMNS).unwrap_or(0);
    let year_col = find_column(&headers, YEAR_COLUMNS);
    let date_col = find_column(&headers, DATE_COLUMNS);
    let author_col = find_column(&headers, AUTHOR_COLUMNS);
    let topic_col = find_column(&headers, TOPIC_COLUMNS);
    if topic_col.is_none() {
        warn!("no topic column among {headers:?}");
    }

    let mut out = Vec::new();
    for row in reader.records() {
        let row = row?;
        check_limit(out.len() + 1, config)?;
        let cell = |col: Option<usize>| non_empty(col.and_then(|c| row.get(c)));
        out.push(RawRecord {
            article_id: row.get(id_col).unwrap_or_default().trim().to_string(),
            year: cell(year_col),
            date_published: cell(date_col),
            authors: cell(author_col),
            topics: match topic_col {
                Some(c) => TopicField::Raw(row.get(c).unwrap_or_default().to_string()),
                None => TopicField::Absent,
            },
        });
    }
    Ok(out)
}

/// Read a JSON array of row objects. The topic value may be literal text or an
/// already structured array of `[topic, proportion]` pairs.
pub fn read_json<R: Read>(reader: R, config: &InsightConfig) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_reader(reader)?;
    let Value::Array(rows) = value else {
        return Err(InsightError::UnsupportedFormat(
            "expected a JSON array of records".into(),
        ));
    };
    check_limit(rows.len(), config)?;

    let mut out = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let Value::Object(obj) = row else {
            warn!("skipping non-object row {index}");
            continue;
        };
        out.push(json_row(&obj, index));
    }
    Ok(out)
}

fn json_field<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        obj.iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(alias))
            .map(|(_, v)| v)
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_row(obj: &Map<String, Value>, index: usize) -> RawRecord {
    let article_id = json_field(obj, ID_COLUMNS)
        .or_else(|| obj.values().next())
        .and_then(scalar_text)
        .unwrap_or_else(|| index.to_string());
    let topics = match json_field(obj, TOPIC_COLUMNS) {
        None => TopicField::Absent,
        Some(Value::String(s)) => TopicField::Raw(s.clone()),
        Some(Value::Null) => TopicField::Parsed(Vec::new()),
        Some(other) => match serde_json::from_value::<Vec<TopicAssignment>>(other.clone()) {
            Ok(list) => TopicField::Parsed(list),
            Err(e) => {
                debug!("row {index}: malformed topic value ({e}), treating as empty");
                TopicField::Parsed(Vec::new())
            }
        },
    };
    RawRecord {
        article_id,
        year: json_field(obj, YEAR_COLUMNS).and_then(scalar_text),
        date_published: json_field(obj, DATE_COLUMNS).and_then(scalar_text),
        authors: json_field(obj, AUTHOR_COLUMNS).and_then(scalar_text),
        topics,
    }
}

/// A loaded, normalised dataset and the column it is dated by.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub label: String,
    pub year_field: YearField,
    pub records: Vec<ArticleRecord>,
}

impl Dataset {
    /// Wrap already normalised records. Dated by `YearField::Year` when any record
    /// carries a numeric year, by publication date otherwise.
    pub fn new(label: impl Into<String>, records: Vec<ArticleRecord>) -> Self {
        let year_field = if records.iter().any(|r| r.year.is_some()) {
            YearField::Year
        } else {
            YearField::DatePublished
        };
        Self {
            label: label.into(),
            year_field,
            records,
        }
    }

    /// Load and normalise a dataset file, labelled by its file stem.
    pub fn load(path: &Path, config: &InsightConfig) -> Result<Self> {
        let raw = load_records(path, config)?;
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".into());
        Ok(Self::new(label, crate::record::normalize_records(&raw)))
    }
}

/// Load the topic → top-words file, either `{"3": ["word", ...]}` or
/// `[{"topic_id": 3, "topic_words": [...]}, ...]`. Ids are stringified.
pub fn load_topic_labels(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    parse_topic_labels(value)
}

pub fn parse_topic_labels(value: Value) -> Result<BTreeMap<String, Vec<String>>> {
    let words = |v: &Value| -> Vec<String> {
        match v {
            Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
            other => scalar_text(other).into_iter().collect(),
        }
    };
    match value {
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), words(v))).collect()),
        Value::Array(entries) => Ok(entries
            .iter()
            .filter_map(|entry| {
                let id = entry.get("topic_id").and_then(scalar_text)?;
                Some((id, entry.get("topic_words").map(words).unwrap_or_default()))
            })
            .collect()),
        _ => Err(InsightError::UnsupportedFormat(
            "topic labels must be a JSON object or array".into(),
        )),
    }
}
