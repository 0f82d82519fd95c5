//! Decoding of the festival JSON feed into plain records.
//!
//! Parsing is all-or-nothing only at the top level. A producer or product
//! entry that does not match the expected shape is dropped and recorded as a
//! [`SkippedEntry`]; the rest of the feed still parses.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors that prevent the feed from being parsed at all.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The document is not well-formed JSON.
    #[error("Malformed feed: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The document is JSON but lacks the required top-level structure.
    #[error("Feed schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// A product decoded from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProduct {
    pub festival_id: String,
    pub name: String,
    pub abv: f64,
    pub notes: String,
    pub style: String,
    pub status_text: String,
    pub dispense: String,
}

/// A producer decoded from the feed, with its products in feed order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBrewery {
    pub festival_id: String,
    pub name: String,
    pub location: String,
    pub products: Vec<ParsedProduct>,
}

/// Why a feed entry was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    /// A required field is missing or has the wrong type or value.
    SchemaMismatch,
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipKind::SchemaMismatch => write!(f, "schema_mismatch"),
        }
    }
}

/// A feed entry dropped because it did not match the expected schema.
///
/// `kind` classifies the skip; the `Display` output is the human-readable
/// detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub kind: SkipKind,
    /// Position of the producer in the `producers` array.
    pub producer_index: usize,
    /// Position of the product within its producer, if a product was skipped.
    pub product_index: Option<usize>,
    /// Name of the skipped entry when it could be read.
    pub name: Option<String>,
    pub reason: String,
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "producer #{}", self.producer_index)?;
        if let Some(product) = self.product_index {
            write!(f, " product #{}", product)?;
        }
        if let Some(name) = &self.name {
            write!(f, " '{}'", name)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Result of parsing a feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub breweries: Vec<ParsedBrewery>,
    pub skipped: Vec<SkippedEntry>,
}

impl ParsedFeed {
    /// Total number of products across all breweries.
    pub fn beer_count(&self) -> usize {
        self.breweries.iter().map(|b| b.products.len()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

#[derive(Deserialize)]
struct RawProducer {
    #[serde(default)]
    id: Option<Value>,
    name: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    products: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawProduct {
    #[serde(default)]
    id: Option<Value>,
    name: String,
    #[serde(default)]
    abv: Option<Value>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    status_text: Option<String>,
    #[serde(default)]
    dispense: Option<String>,
}

/// Parses a raw feed document.
///
/// Fails only when the text is not JSON or has no `producers` array. A feed
/// with an empty `producers` array parses to an empty [`ParsedFeed`].
pub fn parse(raw: &str) -> Result<ParsedFeed, FeedError> {
    let document: Value = serde_json::from_str(raw)?;

    let producers = match document.get("producers") {
        Some(Value::Array(producers)) => producers,
        Some(other) => {
            return Err(FeedError::SchemaMismatch(format!(
                "`producers` must be an array, found {}",
                json_type(other)
            )))
        }
        None => {
            return Err(FeedError::SchemaMismatch(
                "missing top-level `producers` array".to_string(),
            ))
        }
    };

    let mut feed = ParsedFeed::default();

    for (producer_index, value) in producers.iter().enumerate() {
        let producer: RawProducer = match RawProducer::deserialize(value) {
            Ok(producer) => producer,
            Err(e) => {
                feed.skipped.push(SkippedEntry {
                    kind: SkipKind::SchemaMismatch,
                    producer_index,
                    product_index: None,
                    name: value.get("name").and_then(Value::as_str).map(String::from),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let festival_id = producer
            .id
            .as_ref()
            .and_then(identifier)
            .unwrap_or_else(|| producer.name.clone());

        let mut brewery = ParsedBrewery {
            festival_id,
            name: producer.name,
            location: producer.location.unwrap_or_default(),
            products: Vec::new(),
        };

        for (product_index, value) in producer.products.unwrap_or_default().iter().enumerate() {
            match parse_product(value, &brewery.festival_id) {
                Ok(product) => brewery.products.push(product),
                Err(reason) => feed.skipped.push(SkippedEntry {
                    kind: SkipKind::SchemaMismatch,
                    producer_index,
                    product_index: Some(product_index),
                    name: value.get("name").and_then(Value::as_str).map(String::from),
                    reason,
                }),
            }
        }

        feed.breweries.push(brewery);
    }

    Ok(feed)
}

fn parse_product(value: &Value, brewery_id: &str) -> Result<ParsedProduct, String> {
    let raw = RawProduct::deserialize(value).map_err(|e| e.to_string())?;
    let abv = match &raw.abv {
        Some(abv) => parse_abv(abv)?,
        None => return Err("missing field `abv`".to_string()),
    };

    let festival_id = raw
        .id
        .as_ref()
        .and_then(identifier)
        .unwrap_or_else(|| format!("{}/{}", brewery_id, raw.name));

    Ok(ParsedProduct {
        festival_id,
        name: raw.name,
        abv,
        notes: raw.notes.unwrap_or_default(),
        style: raw.style.unwrap_or_default(),
        status_text: raw.status_text.unwrap_or_default(),
        dispense: raw.dispense.unwrap_or_default(),
    })
}

/// Parses an ABV value. The feed sends a decimal string with `.` as the
/// separator regardless of locale; plain JSON numbers are accepted too.
fn parse_abv(value: &Value) -> Result<f64, String> {
    let abv = match value {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("abv '{}' is not a number", s))?,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("abv {} is out of range", n))?,
        other => return Err(format!("abv must be a string, found {}", json_type(other))),
    };

    if !abv.is_finite() || abv < 0.0 {
        return Err(format!("abv {} is not a valid percentage", abv));
    }
    Ok(abv)
}

/// Reads an identifier that the feed may encode as a string or a number.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
