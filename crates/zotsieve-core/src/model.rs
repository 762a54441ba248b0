use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ingest::{lenient_str, metadata_from_json};

/// Score given to candidates that share a DOI or ISSN with the target.
///
/// Strictly greater than any corroboration score, so identifier matches
/// always rank first.
pub const EXACT_IDENTIFIER_SCORE: u32 = 999;

/// A publication date as it arrived: either a bare year or free text.
///
/// Dates are only ever compared by exact equality, so `Year(2020)` and
/// `Text("2020")` are different values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Year(i64),
    Text(String),
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(year) => write!(f, "{year}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One author/editor entry. Accepts both CSL (`family`/`given`) and
/// Zotero (`lastName`/`firstName`, or single-field `name`) shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    #[serde(default, rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Creator {
    pub fn with_family(family: &str) -> Self {
        Self {
            family: Some(family.to_string()),
            ..Default::default()
        }
    }

    /// Surname used for matching: `family` when non-empty, else `lastName`.
    pub fn surname(&self) -> Option<&str> {
        self.family
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.last_name.as_deref().filter(|s| !s.is_empty()))
    }

    /// Returns `None` for anything that is not a JSON object.
    pub fn from_json(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        Some(Self {
            family: lenient_str(obj.get("family")),
            last_name: lenient_str(obj.get("lastName")),
            given: lenient_str(obj.get("given")),
            first_name: lenient_str(obj.get("firstName")),
            name: lenient_str(obj.get("name")),
        })
    }
}

/// Minimal description of a publication, for both the target item and
/// every search candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct RawMetadata {
    pub title: String,
    #[serde(rename = "DOI", skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(rename = "ISSN", skip_serializing_if = "Option::is_none")]
    pub issn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateValue>,
    #[serde(rename = "itemType", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    pub creators: Vec<Creator>,
}

impl RawMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_doi(mut self, doi: &str) -> Self {
        self.doi = Some(doi.to_string());
        self
    }

    pub fn with_issn(mut self, issn: &str) -> Self {
        self.issn = Some(issn.to_string());
        self
    }

    pub fn with_date(mut self, date: DateValue) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_item_type(mut self, item_type: &str) -> Self {
        self.item_type = Some(item_type.to_string());
        self
    }

    pub fn with_creators(mut self, creators: Vec<Creator>) -> Self {
        self.creators = creators;
        self
    }
}

impl From<Value> for RawMetadata {
    fn from(v: Value) -> Self {
        metadata_from_json(&v)
    }
}

/// A search hit from the target library: its item key plus metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct RawCandidate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub data: RawMetadata,
}

impl RawCandidate {
    pub fn new(key: &str, data: RawMetadata) -> Self {
        Self {
            key: Some(key.to_string()),
            data,
        }
    }

    pub fn from_json(v: &Value) -> Self {
        Self {
            key: lenient_str(v.get("key")),
            data: v.get("data").map(metadata_from_json).unwrap_or_default(),
        }
    }
}

impl From<Value> for RawCandidate {
    fn from(v: Value) -> Self {
        Self::from_json(&v)
    }
}

/// An accepted candidate, ranked by `(score, similarity)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub title: String,
    pub similarity: f64,
    pub score: u32,
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    #[serde(rename = "ISSN")]
    pub issn: Option<String>,
    pub creators: Vec<Creator>,
    pub date: Option<DateValue>,
    #[serde(rename = "itemType")]
    pub item_type: Option<String>,
    #[serde(rename = "key")]
    pub source_key: Option<String>,
}

impl MatchCandidate {
    pub fn from_candidate(candidate: &RawCandidate, similarity: f64, score: u32) -> Self {
        let data = &candidate.data;
        Self {
            title: data.title.clone(),
            similarity,
            score,
            doi: data.doi.clone(),
            issn: data.issn.clone(),
            creators: data.creators.clone(),
            date: data.date.clone(),
            item_type: data.item_type.clone(),
            source_key: candidate.key.clone(),
        }
    }

    pub fn is_identifier_match(&self) -> bool {
        self.score == EXACT_IDENTIFIER_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn surname_prefers_family_then_last_name() {
        let csl = Creator::from_json(&json!({"family": "Smith", "given": "J"})).unwrap();
        assert_eq!(csl.surname(), Some("Smith"));

        let zotero = Creator::from_json(&json!({"family": "", "lastName": "Lee"})).unwrap();
        assert_eq!(zotero.surname(), Some("Lee"));

        let institution = Creator::from_json(&json!({"name": "WHO"})).unwrap();
        assert_eq!(institution.surname(), None);
    }

    #[test]
    fn creator_from_non_object_is_none() {
        assert!(Creator::from_json(&json!("Smith, J.")).is_none());
        assert!(Creator::from_json(&json!(42)).is_none());
    }

    #[test]
    fn candidate_deserializes_from_zotero_item() {
        let candidate: RawCandidate = serde_json::from_value(json!({
            "key": "ABCD1234",
            "version": 7,
            "data": {
                "title": "A Title",
                "DOI": "10.1000/x",
                "itemType": "journalArticle",
                "date": "2021",
                "creators": [{"creatorType": "author", "firstName": "Ann", "lastName": "Lee"}]
            }
        }))
        .unwrap();

        assert_eq!(candidate.key.as_deref(), Some("ABCD1234"));
        assert_eq!(candidate.data.doi.as_deref(), Some("10.1000/x"));
        assert_eq!(candidate.data.date, Some(DateValue::Text("2021".to_string())));
        assert_eq!(candidate.data.creators[0].surname(), Some("Lee"));
    }

    #[test]
    fn match_candidate_serializes_with_library_field_names() {
        let candidate = RawCandidate::new("K1", RawMetadata::new("T").with_doi("10.1/a"));
        let m = MatchCandidate::from_candidate(&candidate, 1.0, EXACT_IDENTIFIER_SCORE);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["DOI"], "10.1/a");
        assert_eq!(v["key"], "K1");
        assert!(m.is_identifier_match());
    }
}
