//! Front matter extraction and typed value parsing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_yaml::Value;

/// Line that opens and closes a front matter block.
const MARKER: &str = "---";

/// Keys with a dedicated accessor on [`Frontmatter`].
const KNOWN_KEYS: &[&str] = &[
    "layout",
    "title",
    "description",
    "date",
    "tags",
    "categories",
    "permalink",
    "slug",
    "draft",
    "list",
];

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2})(?:[T ](\d{2}:\d{2})(:\d{2}(?:\.\d+)?)?)?\s*(Z|[+-]\d{2}:?\d{2})?$",
    )
    .expect("date token pattern is valid")
});

/// A single front matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain string scalar
    Text(String),
    /// ISO-8601-like date, normalised to UTC when an offset was given
    Date(NaiveDateTime),
    /// Bracketed or block sequence, each element as text
    List(Vec<String>),
    /// Anything else (numbers, booleans, nested maps), kept as written
    Raw(String),
}

impl FieldValue {
    /// String view of scalar values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Raw(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// List view. A lone scalar counts as a one-element list.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.clone(),
            Self::Text(s) | Self::Raw(s) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Whether the value reads as boolean true.
    pub fn is_true(&self) -> bool {
        self.as_text()
            .is_some_and(|s| s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes"))
    }

    /// Textual form used when exposing the value to templates.
    pub fn to_display(&self) -> String {
        match self {
            Self::Text(s) | Self::Raw(s) => s.clone(),
            Self::Date(d) => format_date(d),
            Self::List(items) => items.join(", "),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::List(items) => items.serialize(serializer),
            other => serializer.serialize_str(&other.to_display()),
        }
    }
}

/// Format a date the way listings and templates show it.
pub fn format_date(date: &NaiveDateTime) -> String {
    if date.time() == chrono::NaiveTime::MIN {
        date.format("%Y-%m-%d").to_string()
    } else {
        date.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Parsed front matter of a content document.
///
/// Unknown keys are preserved so layouts can read them through
/// [`Frontmatter::extra`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    fields: BTreeMap<String, FieldValue>,
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    /// Layout name
    pub fn layout(&self) -> Option<&str> {
        self.text("layout")
    }

    /// Page title
    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    /// Page description for SEO
    pub fn description(&self) -> Option<&str> {
        self.text("description")
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.get("date").and_then(FieldValue::as_date)
    }

    pub fn tags(&self) -> Vec<String> {
        self.get("tags").map(FieldValue::to_list).unwrap_or_default()
    }

    pub fn categories(&self) -> Vec<String> {
        self.get("categories")
            .map(FieldValue::to_list)
            .unwrap_or_default()
    }

    /// Explicit route, used verbatim
    pub fn permalink(&self) -> Option<&str> {
        self.text("permalink")
    }

    /// Custom slug override
    pub fn slug(&self) -> Option<&str> {
        self.text("slug")
    }

    pub fn is_draft(&self) -> bool {
        self.get("draft").is_some_and(FieldValue::is_true)
    }

    /// Collection this page lists, if it is a listing page
    pub fn list(&self) -> Option<&str> {
        self.text("list")
    }

    /// Keys without a dedicated accessor, in key order.
    pub fn extra(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.iter().filter(|(k, _)| !KNOWN_KEYS.contains(k))
    }
}

/// Extract front matter from a content document.
///
/// Returns the parsed front matter and the remaining body after the closing
/// marker. Documents that do not open with a marker line have no front
/// matter and the whole input is the body.
pub fn extract_frontmatter(source: &str) -> Result<(Frontmatter, &str), FrontmatterError> {
    let text = source.strip_prefix('\u{feff}').unwrap_or(source);

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((Frontmatter::new(), source));
    };
    if first.trim_end() != MARKER {
        return Ok((Frontmatter::new(), source));
    }

    let block_start = first.len();
    let mut offset = block_start;
    for line in lines {
        if line.trim_end() == MARKER {
            let yaml = &text[block_start..offset];
            let body = &text[offset + line.len()..];
            return Ok((parse_block(yaml)?, body));
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unclosed)
}

/// Parse the YAML between the markers into typed fields.
fn parse_block(yaml: &str) -> Result<Frontmatter, FrontmatterError> {
    let mut frontmatter = Frontmatter::new();
    if yaml.trim().is_empty() {
        return Ok(frontmatter);
    }

    let value: Value =
        serde_yaml::from_str(yaml).map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        // A block holding only comments
        Value::Null => return Ok(frontmatter),
        _ => return Err(FrontmatterError::NotAMapping),
    };

    for (key, value) in mapping {
        frontmatter.insert(scalar_text(&key), typed_value(value));
    }

    Ok(frontmatter)
}

fn typed_value(value: Value) -> FieldValue {
    match value {
        Value::String(s) => match parse_date(&s) {
            Some(date) => FieldValue::Date(date),
            None => FieldValue::Text(s),
        },
        Value::Sequence(items) => FieldValue::List(items.iter().map(scalar_text).collect()),
        Value::Tagged(tagged) => typed_value(tagged.value),
        other => FieldValue::Raw(scalar_text(&other)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Parse an ISO-8601-like date token.
///
/// Seconds default to zero. Offsets are applied so the result is in UTC.
/// Tokens that look like dates but are not valid calendar dates stay
/// strings.
pub fn parse_date(token: &str) -> Option<NaiveDateTime> {
    let caps = DATE_TOKEN.captures(token.trim())?;

    let hour_minute = caps.get(2).map_or("00:00", |m| m.as_str());
    let seconds = caps.get(3).map_or(":00", |m| m.as_str());
    let local = NaiveDateTime::parse_from_str(
        &format!("{}T{}{}", &caps[1], hour_minute, seconds),
        "%Y-%m-%dT%H:%M:%S%.f",
    )
    .ok()?;

    match caps.get(4) {
        None => Some(local),
        Some(offset) => parse_offset(offset.as_str())?
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.naive_utc()),
    }
}

/// `Z`, `+HH:MM` or `+HHMM`.
fn parse_offset(offset: &str) -> Option<FixedOffset> {
    if offset.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset[1..].chars().filter(|c| *c != ':').collect();
    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..)?.parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Errors that can occur when parsing front matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed front matter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in front matter: {0}")]
    InvalidYaml(String),

    #[error("Front matter must be a mapping of keys to values")]
    NotAMapping,
}
