//! Article records and the field parsers that normalise them.
//!
//! A loaded row arrives as a [`RawRecord`] whose topic field may still be the
//! literal text written by the upstream topic model (`"[('t1', 0.5), ('t2', 0.3)]"`).
//! [`RawRecord::normalize`] resolves every field once; aggregators only ever see
//! [`ArticleRecord`]s.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};

/// One (topic, proportion) pair attached to an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AssignmentRepr")]
pub struct TopicAssignment {
    pub topic: String,
    pub proportion: f64,
}

impl TopicAssignment {
    pub fn new(topic: impl Into<String>, proportion: f64) -> Self {
        Self {
            topic: topic.into(),
            proportion,
        }
    }
}

impl fmt::Display for TopicAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topic = self.topic.replace('\\', "\\\\").replace('\'', "\\'");
        write!(f, "('{}', {:?})", topic, self.proportion)
    }
}

/// Topic ids appear both as strings and as bare integers in the wild.
#[derive(Deserialize)]
#[serde(untagged)]
enum TopicKey {
    Text(String),
    Int(i64),
}

impl From<TopicKey> for String {
    fn from(key: TopicKey) -> Self {
        match key {
            TopicKey::Text(s) => s,
            TopicKey::Int(i) => i.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AssignmentRepr {
    Pair(TopicKey, f64),
    Object { topic: TopicKey, proportion: f64 },
}

impl From<AssignmentRepr> for TopicAssignment {
    fn from(repr: AssignmentRepr) -> Self {
        match repr {
            AssignmentRepr::Pair(topic, proportion)
            | AssignmentRepr::Object { topic, proportion } => {
                TopicAssignment::new(topic, proportion)
            }
        }
    }
}

/// The topic column of a loaded row, before normalisation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TopicField {
    /// The source has no topic column at all.
    #[default]
    Absent,
    /// Literal text still to be decoded.
    Raw(String),
    /// Already structured by the loader.
    Parsed(Vec<TopicAssignment>),
}

/// A row as handed over by a loading collaborator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    pub article_id: String,
    pub year: Option<String>,
    pub date_published: Option<String>,
    pub authors: Option<String>,
    pub topics: TopicField,
}

impl RawRecord {
    /// Resolve every field into an [`ArticleRecord`]. The raw row is left untouched.
    pub fn normalize(&self) -> ArticleRecord {
        ArticleRecord {
            article_id: self.article_id.clone(),
            year: self.year.as_deref().and_then(coerce_year),
            published_year: self.date_published.as_deref().and_then(coerce_date_year),
            authors: parse_authors(self.authors.as_deref()),
            topics: parse_topic_field(&self.topics),
        }
    }
}

/// Normalise a slice of raw rows, preserving their order.
pub fn normalize_records(raw: &[RawRecord]) -> Vec<ArticleRecord> {
    raw.iter().map(RawRecord::normalize).collect()
}

/// A fully normalised article, the unit every aggregator consumes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ArticleRecord {
    pub article_id: String,
    /// Numeric publication year, if the year column coerced cleanly.
    pub year: Option<i32>,
    /// Year taken from a publication timestamp, if one was present and parseable.
    pub published_year: Option<i32>,
    pub authors: Vec<String>,
    pub topics: Vec<TopicAssignment>,
}

impl ArticleRecord {
    pub fn new(article_id: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_published_year(mut self, year: i32) -> Self {
        self.published_year = Some(year);
        self
    }

    /// Set authors from a pipe-delimited string, as stored in the source tables.
    pub fn with_authors(mut self, raw: &str) -> Self {
        self.authors = parse_authors(Some(raw));
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.topics = topics
            .into_iter()
            .map(|(t, p)| TopicAssignment::new(t, p))
            .collect();
        self
    }

    /// True if `name` is one of this article's credited authors.
    pub fn credits(&self, name: &str) -> bool {
        let name = name.trim();
        self.authors.iter().any(|a| a == name)
    }
}

/// Resolve a topic field to a list of assignments.
///
/// Structured input is returned unchanged. Literal text is decoded; anything that
/// does not decode yields an empty list.
pub fn parse_topic_field(field: &TopicField) -> Vec<TopicAssignment> {
    match field {
        TopicField::Absent => Vec::new(),
        TopicField::Parsed(list) => list.clone(),
        TopicField::Raw(text) => match parse_topic_literal(text) {
            Some(list) => list,
            None => {
                debug!("unparseable topic field {text:?}, treating as empty");
                Vec::new()
            }
        },
    }
}

/// Decode a topic list from text. Accepts JSON (`[["t1", 0.5]]`) and the
/// Python literal form (`[('t1', 0.5)]`, optionally with `np.float64(..)` wrappers).
pub fn parse_topic_literal(text: &str) -> Option<Vec<TopicAssignment>> {
    let text = text.trim();
    if text.is_empty() {
        return Some(Vec::new());
    }
    if let Ok(list) = serde_json::from_str::<Vec<TopicAssignment>>(text) {
        return Some(list);
    }
    let mut cursor = LiteralCursor::new(text);
    let list = cursor.list()?;
    cursor.skip_ws();
    cursor.at_end().then_some(list)
}

/// Render assignments in the literal form accepted by [`parse_topic_literal`].
pub fn format_topic_literal(topics: &[TopicAssignment]) -> String {
    let items: Vec<String> = topics.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

/// Split a pipe-delimited author string into trimmed, non-empty names.
///
/// `None`, empty strings and a literal `nan` (how spreadsheet exports spell a
/// missing cell) all yield an empty list. Order and duplicates are preserved.
pub fn parse_authors(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().eq_ignore_ascii_case("nan") {
        return Vec::new();
    }
    raw.split('|')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Coerce a year cell to an integer. `"2005"` and `"2005.0"` both give 2005;
/// anything else gives `None`.
pub fn coerce_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() <= i32::MAX as f64 => {
            Some(v as i32)
        }
        _ => {
            debug!("unparseable year {raw:?}");
            None
        }
    }
}

/// Extract the year from a publication timestamp or date.
pub fn coerce_date_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.year());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.year());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d.year());
    }
    debug!("unparseable publication date {raw:?}");
    None
}

/// Order topic ids naturally: numeric ids by value and before textual ones,
/// textual ids lexicographically.
pub fn compare_topic_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

// ---- Internal helpers ----

struct LiteralCursor {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralCursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn list(&mut self) -> Option<Vec<TopicAssignment>> {
        if !self.eat('[') {
            return None;
        }
        let mut out = Vec::new();
        loop {
            if self.eat(']') {
                return Some(out);
            }
            out.push(self.pair()?);
            if !self.eat(',') {
                return self.eat(']').then_some(out);
            }
        }
    }

    fn pair(&mut self) -> Option<TopicAssignment> {
        let close = if self.eat('(') {
            ')'
        } else if self.eat('[') {
            ']'
        } else {
            return None;
        };
        let topic = self.key()?;
        if !self.eat(',') {
            return None;
        }
        let proportion = self.number()?;
        self.eat(',');
        if !self.eat(close) {
            return None;
        }
        Some(TopicAssignment { topic, proportion })
    }

    fn key(&mut self) -> Option<String> {
        self.skip_ws();
        match self.peek()? {
            q @ ('\'' | '"') => self.quoted(q),
            _ => {
                let n = self.number()?;
                (n.fract() == 0.0).then(|| (n as i64).to_string())
            }
        }
    }

    fn quoted(&mut self, quote: char) -> Option<String> {
        self.pos += 1;
        let mut s = String::new();
        loop {
            match self.peek()? {
                '\\' => {
                    self.pos += 1;
                    s.push(self.peek()?);
                }
                c if c == quote => {
                    self.pos += 1;
                    return Some(s);
                }
                c => s.push(c),
            }
            self.pos += 1;
        }
    }

    /// A float literal, possibly wrapped in a constructor call like `np.float64(0.5)`.
    fn number(&mut self) -> Option<f64> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
        {
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        if self.peek() == Some('(') {
            self.pos += 1;
            let inner = self.number()?;
            return self.eat(')').then_some(inner);
        }
        token.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}
