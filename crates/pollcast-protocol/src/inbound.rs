//! Inbound tally payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tally::TallyUpdate;
use crate::ProtocolVariant;

/// Number of fields in an extended tally string.
pub const TALLY_FIELDS: usize = 3;

/// Tally data for one answer, exactly as it arrived.
///
/// Anything that is neither a non-negative integer nor a string is kept as
/// `Other` so one bad entry does not reject the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TallyData {
    Count(u64),
    Text(String),
    Other(serde_json::Value),
}

impl TallyData {
    /// Parse into the fields it carries.
    ///
    /// - `Count(n)`: total only.
    /// - `Text("t,u,d")`: all three, each a non-negative integer.
    /// - `Text("n")`: total only, accepted under [`ProtocolVariant::Basic`].
    pub fn parse(&self, variant: ProtocolVariant) -> Result<TallyUpdate> {
        match self {
            TallyData::Count(n) => Ok(TallyUpdate::total(*n)),
            TallyData::Text(s) => parse_text(s, variant),
            TallyData::Other(v) => Err(Error::malformed(v.to_string(), "unsupported tally value")),
        }
    }
}

fn parse_text(s: &str, variant: ProtocolVariant) -> Result<TallyUpdate> {
    let fields: Vec<&str> = s.split(',').map(str::trim).collect();

    let number = |field: &str| -> Result<u64> {
        field
            .parse::<u64>()
            .map_err(|_| Error::malformed(s, format!("field {field:?} is not a count")))
    };

    match (fields.as_slice(), variant) {
        ([total, up, down], _) => Ok(TallyUpdate::full(
            number(*total)?,
            number(*up)?,
            number(*down)?,
        )),
        ([total], ProtocolVariant::Basic) => Ok(TallyUpdate::total(number(*total)?)),
        _ => Err(Error::malformed(
            s,
            format!("expected {TALLY_FIELDS} comma-separated fields, got {}", fields.len()),
        )),
    }
}

/// Answer level of a payload: a digest → tally map, or (older servers) a list
/// of such maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerTallies {
    Map(BTreeMap<String, TallyData>),
    List(Vec<BTreeMap<String, TallyData>>),
    Other(serde_json::Value),
}

impl AnswerTallies {
    /// Flattened `(answer digest, tally data)` pairs.
    pub fn entries(&self) -> Vec<(&str, &TallyData)> {
        match self {
            AnswerTallies::Map(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            AnswerTallies::List(maps) => maps
                .iter()
                .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
                .collect(),
            AnswerTallies::Other(_) => Vec::new(),
        }
    }

    /// Whether the answer level had an unusable shape.
    pub fn is_malformed(&self) -> bool {
        matches!(self, AnswerTallies::Other(_))
    }
}

/// A decoded inbound frame: question digest → answer tallies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TallyPayload(pub BTreeMap<String, AnswerTallies>);

impl TallyPayload {
    /// Question entries of the payload.
    pub fn questions(&self) -> impl Iterator<Item = (&str, &AnswerTallies)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of question entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload mentions no question.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decode one inbound text frame.
pub fn decode_inbound(text: &str) -> Result<TallyPayload> {
    Ok(serde_json::from_str(text)?)
}
