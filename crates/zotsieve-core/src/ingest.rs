//! Turns loosely-typed source records (Zotero translator output, CSL-JSON)
//! into [`RawMetadata`]. Wrong-typed fields become absent, never errors.

use std::path::Path;

use serde_json::Value;

use crate::error::Result;
use crate::model::{Creator, DateValue, RawMetadata};

/// A record from the bibliographic source, kept verbatim for forwarding.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub raw: Value,
    pub metadata: RawMetadata,
}

impl SourceItem {
    pub fn from_json(raw: Value) -> Self {
        let metadata = metadata_from_json(&raw);
        Self { raw, metadata }
    }
}

pub(crate) fn lenient_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

pub fn metadata_from_json(v: &Value) -> RawMetadata {
    if !v.is_object() {
        return RawMetadata::default();
    }

    let title = v
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let doi = lenient_str(v.get("DOI"));

    // CSL-JSON carries ISSN as an array.
    let issn = match v.get("ISSN") {
        Some(Value::Array(values)) => values.iter().find_map(|x| lenient_str(Some(x))),
        other => lenient_str(other),
    };

    let date = parse_date(v.get("date")).or_else(|| {
        v.pointer("/issued/date-parts/0/0")
            .and_then(Value::as_i64)
            .map(DateValue::Year)
    });

    let item_type = lenient_str(v.get("itemType")).or_else(|| lenient_str(v.get("type")));

    let creators = ["creators", "author"]
        .iter()
        .filter_map(|field| v.get(*field).and_then(Value::as_array))
        .find(|arr| !arr.is_empty())
        .map(|arr| arr.iter().filter_map(Creator::from_json).collect())
        .unwrap_or_default();

    RawMetadata {
        title,
        doi,
        issn,
        date,
        item_type,
        creators,
    }
}

fn parse_date(v: Option<&Value>) -> Option<DateValue> {
    match v? {
        Value::Number(n) => n.as_i64().map(DateValue::Year),
        Value::String(s) if !s.trim().is_empty() => Some(DateValue::Text(s.clone())),
        _ => None,
    }
}

/// Accepts a JSON array of records or a single record object.
pub fn parse_source_items(v: Value) -> Vec<SourceItem> {
    match v {
        Value::Array(items) => items.into_iter().map(SourceItem::from_json).collect(),
        obj @ Value::Object(_) => vec![SourceItem::from_json(obj)],
        _ => Vec::new(),
    }
}

pub fn read_source_items(path: &Path) -> Result<Vec<SourceItem>> {
    let contents = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    Ok(parse_source_items(value))
}
