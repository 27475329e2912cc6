use super::StoreError;
use crate::shell::{Kind, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row as _, sqlite::SqliteRow};
use std::{fmt, str::FromStr};

/// One `kind:name` pair, e.g. `tag:full color` or `artist:someone`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub kind: String,
    pub name: String,
}

impl Tag {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Matches either the bare name or the `kind:name` form
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        self.name.eq_ignore_ascii_case(needle) || self.to_string().eq_ignore_ascii_case(needle)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Tags are stored as a JSON array so delimiters inside names survive
///
/// # Errors
///
/// Returns an error if serialization fails
pub fn encode_tags(tags: &[Tag]) -> Result<String, serde_json::Error> {
    serde_json::to_string(tags)
}

/// Reads both the JSON form and the older `kind:name;kind:name` text form
///
/// # Errors
///
/// Returns an error if a JSON array is malformed
pub fn decode_tags(raw: &str) -> Result<Vec<Tag>, serde_json::Error> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return serde_json::from_str(raw);
    }

    Ok(raw
        .split(';')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(':') {
            Some((kind, name)) => Tag::new(kind, name),
            None => Tag::new("tag", pair),
        })
        .collect())
}

/// A stored catalog item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SauceRecord {
    pub id: i64,
    pub title: String,
    /// Seconds since the Unix epoch
    pub uploaded: i64,
    pub tags: Vec<Tag>,
    pub pages: i64,
    pub favorites: i64,
}

impl SauceRecord {
    #[must_use]
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.uploaded, 0)
    }

    /// Names of the tags of one kind, in stored order
    pub fn tags_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |tag| tag.kind == kind)
            .map(|tag| tag.name.as_str())
    }
}

pub(super) type RawRecord = (i64, String, i64, String, i64, i64);

impl TryFrom<RawRecord> for SauceRecord {
    type Error = StoreError;

    fn try_from(
        (id, title, uploaded, tags, pages, favorites): RawRecord,
    ) -> Result<Self, Self::Error> {
        Ok(Self {
            id,
            title,
            uploaded,
            tags: decode_tags(&tags)?,
            pages,
            favorites,
        })
    }
}

/// Columns of the `sauces` table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Title,
    Uploaded,
    Tags,
    Pages,
    Favorites,
}

impl Column {
    pub const ALL: [Self; 6] = [
        Self::Id,
        Self::Title,
        Self::Uploaded,
        Self::Tags,
        Self::Pages,
        Self::Favorites,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Uploaded => "uploaded",
            Self::Tags => "tags",
            Self::Pages => "pages",
            Self::Favorites => "favorites",
        }
    }

    /// Storage kind of the column
    #[must_use]
    pub const fn kind(self) -> Kind {
        match self {
            Self::Title | Self::Tags => Kind::Text,
            Self::Id | Self::Uploaded | Self::Pages | Self::Favorites => Kind::Integer,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "title" | "name" => Ok(Self::Title),
            "uploaded" => Ok(Self::Uploaded),
            "tags" | "tag" => Ok(Self::Tags),
            "pages" | "page" => Ok(Self::Pages),
            "favorites" | "favourites" => Ok(Self::Favorites),
            _ => Err(StoreError::UnknownColumn(s.to_string())),
        }
    }
}

/// A projection of one stored row
#[derive(Debug, Clone, PartialEq)]
pub struct Row(Vec<(Column, Value)>);

impl Row {
    pub(super) fn from_sqlite(row: &SqliteRow, columns: &[Column]) -> Result<Self, StoreError> {
        let mut cells = Vec::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            let value = match column.kind() {
                Kind::Integer => Value::Integer(row.try_get::<i64, _>(position)?),
                Kind::Float => Value::Float(row.try_get::<f64, _>(position)?),
                Kind::Text => Value::Text(row.try_get::<String, _>(position)?),
            };
            cells.push((*column, value));
        }
        Ok(Self(cells))
    }

    #[must_use]
    pub fn get(&self, column: Column) -> Option<&Value> {
        self.0
            .iter()
            .find(|(candidate, _)| *candidate == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.0.iter().map(|(column, _)| *column)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
