//! Catalog records as they arrive from storage, and the validated items the
//! rest of the crate works with.

use crate::features::FeatureBuilder;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const MIN_YEAR: i32 = 1800;
const MAX_YEAR: i32 = 2100;

/// Genres come either as a list or as the store's comma-separated column.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GenreField {
    List(Vec<String>),
    Joined(String),
}

impl Default for GenreField {
    fn default() -> Self { GenreField::List(Vec::new()) }
}

impl GenreField {
    fn into_labels(self) -> Vec<String> {
        let raw = match self {
            GenreField::List(v) => v,
            GenreField::Joined(s) => s.split(',').map(str::to_string).collect(),
        };
        raw.into_iter().map(|g| g.trim().to_string()).filter(|g| !g.is_empty()).collect()
    }
}

/// Contributors come either as a list or as the store's space-joined column
/// of already-collapsed names ("ChristopherNolan JonathanNolan").
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ContributorField {
    List(Vec<String>),
    Joined(String),
}

fn contributor_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match ContributorField::deserialize(deserializer)? {
        ContributorField::List(v) => v,
        ContributorField::Joined(s) => s.split_whitespace().map(str::to_string).collect(),
    })
}

/// Loosely typed row from the storage layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogRecord {
    #[serde(alias = "tconst")]
    pub id: String,
    #[serde(alias = "primary_title")]
    pub title: String,
    #[serde(default, alias = "original_title")]
    pub alternate_title: Option<String>,
    #[serde(default, alias = "start_year")]
    pub release_year: Option<i64>,
    #[serde(default, alias = "runtime_minutes")]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub genres: GenreField,
    #[serde(default, alias = "average_rating")]
    pub rating: Option<f32>,
    #[serde(default, alias = "num_votes")]
    pub vote_count: Option<i64>,
    #[serde(default, alias = "director_names", deserialize_with = "contributor_list")]
    pub contributors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub alternate_title: Option<String>,
    pub release_year: Option<i32>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub rating: Option<f32>,
    pub vote_count: u64,
    pub contributors: Vec<String>,
    /// Derived by [`FeatureBuilder`]; never edited by hand.
    pub document: String,
}

impl CatalogItem {
    /// Validate and coerce a storage record, deriving its feature document.
    pub fn from_record(record: CatalogRecord, features: &FeatureBuilder) -> Result<Self> {
        let id = record.id.trim().to_string();
        if id.is_empty() {
            return Err(Error::InvalidRecord { id: record.id, reason: "empty id".into() });
        }
        let title = record.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidRecord { id, reason: "empty title".into() });
        }
        let vote_count = match record.vote_count {
            Some(v) if v < 0 => {
                return Err(Error::InvalidRecord { id, reason: format!("negative vote count {v}") })
            }
            Some(v) => v as u64,
            None => 0,
        };
        let release_year = record
            .release_year
            .filter(|y| (MIN_YEAR as i64..=MAX_YEAR as i64).contains(y))
            .map(|y| y as i32);
        let runtime_minutes = record.runtime.filter(|r| *r > 0).and_then(|r| u32::try_from(r).ok());
        let rating = record.rating.filter(|r| r.is_finite());
        let alternate_title = record
            .alternate_title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && *t != title);
        let genres = record.genres.into_labels();
        let contributors: Vec<String> = record
            .contributors
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        let document = features.build(&genres, &contributors, release_year);

        Ok(Self { id, title, alternate_title, release_year, runtime_minutes, genres, rating, vote_count, contributors, document })
    }
}

/// Ordering used whenever two items score the same: more votes first, then
/// the smaller id. This is a total order over a catalog with unique ids.
pub fn tie_break(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    b.vote_count.cmp(&a.vote_count).then_with(|| a.id.cmp(&b.id))
}

/// Ordered set of validated items with unique ids. Row `i` is `items()[i]`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(Error::InvalidRecord { id: item.id.clone(), reason: "duplicate id".into() });
            }
        }
        Ok(Self { items })
    }

    /// Validate a batch of records. Records under `min_votes` are skipped.
    pub fn from_records<I>(records: I, features: &FeatureBuilder, min_votes: u64) -> Result<Self>
    where
        I: IntoIterator<Item = CatalogRecord>,
    {
        let mut items = Vec::new();
        let mut skipped = 0usize;
        for record in records {
            let item = CatalogItem::from_record(record, features)?;
            if item.vote_count < min_votes {
                skipped += 1;
                continue;
            }
            items.push(item);
        }
        if skipped > 0 {
            tracing::debug!(skipped, min_votes, "skipped records under vote floor");
        }
        Self::new(items)
    }

    pub fn items(&self) -> &[CatalogItem] { &self.items }
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn into_items(self) -> Vec<CatalogItem> { self.items }
}

/// Read catalog records from a `.jsonl` file (one record per line) or a
/// `.json` file holding either an array of records or a single record.
/// Decode failures name the file and, for JSONL, the line.
pub fn read_records(path: &Path) -> Result<Vec<CatalogRecord>> {
    let f = File::open(path)?;
    let reader = BufReader::new(f);
    let is_jsonl = path.extension().and_then(|s| s.to_str()) == Some("jsonl");
    let bad = |at: String, e: serde_json::Error| Error::Serialization(format!("{}{at}: {e}", path.display()));
    let mut out = Vec::new();
    if is_jsonl {
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            out.push(serde_json::from_str(&line).map_err(|e| bad(format!(":{}", n + 1), e))?);
        }
        return Ok(out);
    }
    let json: serde_json::Value = serde_json::from_reader(reader).map_err(|e| bad(String::new(), e))?;
    match json {
        serde_json::Value::Array(arr) => {
            for (i, v) in arr.into_iter().enumerate() {
                out.push(serde_json::from_value(v).map_err(|e| bad(format!("[{i}]"), e))?);
            }
        }
        serde_json::Value::Object(_) => {
            out.push(serde_json::from_value(json).map_err(|e| bad(String::new(), e))?);
        }
        other => {
            return Err(Error::Serialization(format!(
                "{}: expected an array of records or a single record, found {}",
                path.display(),
                json_kind(&other)
            )));
        }
    }
    Ok(out)
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str) -> CatalogRecord {
        CatalogRecord { id: id.into(), title: title.into(), ..Default::default() }
    }

    #[test]
    fn coerces_loose_fields_once() {
        let mut r = record("tt1", " Inception ");
        r.alternate_title = Some("Inception".into());
        r.release_year = Some(2010);
        r.runtime = Some(-4);
        r.genres = GenreField::Joined("Sci-Fi, Thriller,".into());
        r.vote_count = Some(42);
        r.contributors = vec!["Christopher Nolan".into()];
        let item = CatalogItem::from_record(r, &FeatureBuilder::default()).unwrap();
        assert_eq!(item.title, "Inception");
        assert_eq!(item.alternate_title, None);
        assert_eq!(item.runtime_minutes, None);
        assert_eq!(item.genres, vec!["Sci-Fi", "Thriller"]);
        assert_eq!(item.document, "sci-fi thriller christophernolan 2010");
    }

    #[test]
    fn out_of_range_year_is_unknown() {
        let mut r = record("tt1", "Old");
        r.release_year = Some(12);
        let item = CatalogItem::from_record(r, &FeatureBuilder::default()).unwrap();
        assert_eq!(item.release_year, None);
    }

    #[test]
    fn rejects_bad_records() {
        let fb = FeatureBuilder::default();
        assert!(matches!(CatalogItem::from_record(record(" ", "x"), &fb), Err(Error::InvalidRecord { .. })));
        assert!(matches!(CatalogItem::from_record(record("a", ""), &fb), Err(Error::InvalidRecord { .. })));
        let mut neg = record("a", "x");
        neg.vote_count = Some(-1);
        assert!(matches!(CatalogItem::from_record(neg, &fb), Err(Error::InvalidRecord { .. })));
    }

    #[test]
    fn rejects_duplicate_ids_and_applies_vote_floor() {
        let fb = FeatureBuilder::default();
        let dup = Catalog::from_records(vec![record("a", "x"), record("a", "y")], &fb, 0);
        assert!(matches!(dup, Err(Error::InvalidRecord { id, .. }) if id == "a"));

        let mut popular = record("b", "Popular");
        popular.vote_count = Some(500);
        let cat = Catalog::from_records(vec![record("a", "Obscure"), popular], &fb, 100).unwrap();
        assert_eq!(cat.len(), 1);
        assert_eq!(cat.items()[0].id, "b");
    }

    #[test]
    fn reads_space_joined_director_names() {
        let json = r#"{"tconst":"tt1","primary_title":"Inception","genres":"Action,Sci-Fi","director_names":"ChristopherNolan JonathanNolan","start_year":2010}"#;
        let r: CatalogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.contributors, vec!["ChristopherNolan", "JonathanNolan"]);
        let item = CatalogItem::from_record(r, &FeatureBuilder::default()).unwrap();
        assert_eq!(item.document, "action sci-fi christophernolan jonathannolan 2010");

        let listed: CatalogRecord = serde_json::from_str(r#"{"id":"tt2","title":"X","contributors":["Jane Doe"]}"#).unwrap();
        assert_eq!(listed.contributors, vec!["Jane Doe"]);
        let missing: CatalogRecord = serde_json::from_str(r#"{"id":"tt3","title":"Y"}"#).unwrap();
        assert!(missing.contributors.is_empty());
    }

    #[test]
    fn read_errors_name_the_file_and_line() {
        let dir = tempfile::tempdir().unwrap();
        let jsonl = dir.path().join("catalog.jsonl");
        std::fs::write(&jsonl, "{\"id\":\"a\",\"title\":\"A\"}\n\n{\"id\":7}\n").unwrap();
        match read_records(&jsonl) {
            Err(Error::Serialization(msg)) => assert!(msg.contains("catalog.jsonl:3"), "{msg}"),
            other => panic!("expected a serialization error, got {other:?}"),
        }

        let scalar = dir.path().join("scalar.json");
        std::fs::write(&scalar, "42").unwrap();
        match read_records(&scalar) {
            Err(Error::Serialization(msg)) => {
                assert!(msg.contains("scalar.json"), "{msg}");
                assert!(msg.contains("a number"), "{msg}");
            }
            other => panic!("expected a serialization error, got {other:?}"),
        }
    }

    #[test]
    fn tie_break_prefers_votes_then_id() {
        let fb = FeatureBuilder::default();
        let mut a = CatalogItem::from_record(record("b", "x"), &fb).unwrap();
        let mut b = CatalogItem::from_record(record("a", "x"), &fb).unwrap();
        a.vote_count = 10;
        b.vote_count = 10;
        assert_eq!(tie_break(&a, &b), Ordering::Greater);
        a.vote_count = 11;
        assert_eq!(tie_break(&a, &b), Ordering::Less);
    }
}
