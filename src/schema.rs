//!
//! src/schema.rs
//!
//! On-disk shapes of the track document. Three shapes have existed:
//!
//!   v0  {"record_collection": {"records": [{"record": {..}}, ..]}}
//!   v1  {"tracks": [{.., "id": 1}, ..]}
//!   v2  {"tracks": {"1": {..}, ..}}
//!
//! Every shape is readable, only v2 is ever written.
//!

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::CatalogError;
use crate::ids::IdGenerator;
use crate::types::{Track, TrackFields, TrackId};

pub const TRACKS_KEY: &str = "tracks";
pub const LEGACY_COLLECTION_KEY: &str = "record_collection";
pub const LEGACY_RECORDS_KEY: &str = "records";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V0RecordCollection,
    V1TrackList,
    V2TrackMap,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion::V2TrackMap;

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVersion::V0RecordCollection => "v0-record-collection",
            SchemaVersion::V1TrackList        => "v1-track-list",
            SchemaVersion::V2TrackMap         => "v2-track-map",
        }
    }

    pub fn is_current(self) -> bool {
        self == Self::CURRENT
    }
}

/// The document as written to disk
#[derive(Debug, Serialize)]
pub struct TrackDocument<'a> {
    tracks: &'a BTreeMap<TrackId, Track>,
}

pub fn encode(tracks: &BTreeMap<TrackId, Track>) -> TrackDocument<'_> {
    TrackDocument { tracks }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}

/// Works out which shape a parsed document has, looking only at the
/// top-level key and the JSON type of its value
pub fn detect(doc: &Value) -> Result<SchemaVersion, CatalogError> {
    let Some(object) = doc.as_object() else {
        return Err(CatalogError::Schema(
            format!("top level must be an object, found {}", json_kind(doc))
        ));
    };

    if let Some(tracks) = object.get(TRACKS_KEY) {
        return match tracks {
            Value::Object(_) => Ok(SchemaVersion::V2TrackMap),
            Value::Array(_)  => Ok(SchemaVersion::V1TrackList),
            other => Err(CatalogError::Schema(format!(
                "\"{TRACKS_KEY}\" must be an object or an array, found {}",
                json_kind(other)
            ))),
        };
    }

    if let Some(collection) = object.get(LEGACY_COLLECTION_KEY) {
        return match collection.get(LEGACY_RECORDS_KEY) {
            Some(Value::Array(_)) => Ok(SchemaVersion::V0RecordCollection),
            _ => Err(CatalogError::Schema(format!(
                "\"{LEGACY_COLLECTION_KEY}\" has no \"{LEGACY_RECORDS_KEY}\" array"
            ))),
        };
    }

    Err(CatalogError::Schema(format!(
        "expected a \"{TRACKS_KEY}\" or \"{LEGACY_COLLECTION_KEY}\" key"
    )))
}

/// Decodes any known shape into the identifier mapping. Legacy tracks
/// without an identifier draw one from `ids`, tracks without a change
/// time are stamped with `now`.
pub fn decode(
    doc: Value,
    now: i64,
    ids: &mut dyn IdGenerator,
) -> Result<(BTreeMap<TrackId, Track>, SchemaVersion), CatalogError> {
    let version = detect(&doc)?;
    let mut tracks = BTreeMap::new();

    match version {
        SchemaVersion::V2TrackMap => {
            let entries: BTreeMap<String, LooseTrack> =
                serde_json::from_value(doc[TRACKS_KEY].clone())?;
            for (key, loose) in entries {
                let id: TrackId = key.parse().map_err(|_| CatalogError::Schema(
                    format!("track key {key:?} is not an integer identifier")
                ))?;
                if loose.id.is_some_and(|embedded| embedded != id.0) {
                    warn!(key = %id, embedded = ?loose.id, "schema.id.mismatch");
                }
                tracks.insert(id, loose.into_track(id, now));
            }
        }
        SchemaVersion::V1TrackList => {
            let entries: Vec<LooseTrack> =
                serde_json::from_value(doc[TRACKS_KEY].clone())?;
            insert_listed(&mut tracks, entries, now, ids)?;
        }
        SchemaVersion::V0RecordCollection => {
            let entries: Vec<RecordEntry> = serde_json::from_value(
                doc[LEGACY_COLLECTION_KEY][LEGACY_RECORDS_KEY].clone()
            )?;
            let entries = entries.into_iter().map(|e| e.record).collect();
            insert_listed(&mut tracks, entries, now, ids)?;
        }
    }

    debug!(version = version.as_str(), count = tracks.len(), "schema.decode");
    Ok((tracks, version))
}

// Stored identifiers are claimed first so a generated one can never
// land on a track listed further down.
fn insert_listed(
    tracks: &mut BTreeMap<TrackId, Track>,
    entries: Vec<LooseTrack>,
    now: i64,
    ids: &mut dyn IdGenerator,
) -> Result<(), CatalogError> {
    let mut unnumbered = Vec::new();
    for loose in entries {
        let Some(id) = loose.id.map(TrackId) else {
            unnumbered.push(loose);
            continue;
        };
        if tracks.insert(id, loose.into_track(id, now)).is_some() {
            warn!(id = %id, "schema.id.duplicate");
        }
    }
    for loose in unnumbered {
        let id = ids.next_id(now, tracks)?;
        tracks.insert(id, loose.into_track(id, now));
    }
    Ok(())
}

// v0 wraps every track in a single-key object
#[derive(Debug, Deserialize)]
struct RecordEntry {
    record: LooseTrack,
}

/// A track as found in any shape: scalars may be numbers, `style` may be
/// a single string, `id` and `lastChange` may be missing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LooseTrack {
    #[serde(deserialize_with = "loose_string")]
    record: String,
    #[serde(deserialize_with = "loose_string")]
    num: String,
    #[serde(deserialize_with = "loose_string")]
    track: String,
    #[serde(deserialize_with = "loose_string")]
    artist: String,
    #[serde(deserialize_with = "loose_styles")]
    style: Vec<String>,
    #[serde(deserialize_with = "loose_string")]
    bpm: String,
    #[serde(deserialize_with = "loose_string")]
    key: String,
    #[serde(deserialize_with = "loose_string")]
    power: String,
    #[serde(deserialize_with = "loose_string")]
    rpm: String,
    #[serde(deserialize_with = "loose_string")]
    comment: String,
    #[serde(deserialize_with = "loose_int")]
    id: Option<i64>,
    #[serde(rename = "lastChange", deserialize_with = "loose_int")]
    last_change: Option<i64>,
}

impl LooseTrack {
    fn into_track(self, id: TrackId, now: i64) -> Track {
        Track {
            fields: TrackFields {
                record: self.record,
                num: self.num,
                track: self.track,
                artist: self.artist,
                style: self.style,
                bpm: self.bpm,
                key: self.key,
                power: self.power,
                rpm: self.rpm,
                comment: self.comment,
            },
            id,
            last_change: self.last_change.unwrap_or(now),
        }
    }
}

fn scalar_to_string(v: Value) -> Result<String, &'static str> {
    match v {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(json_kind(&other)),
    }
}

fn loose_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_to_string(Value::deserialize(d)?)
        .map_err(|kind| D::Error::custom(format!("expected text, found {kind}")))
}

fn loose_styles<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| scalar_to_string(item)
                .map_err(|kind| D::Error::custom(format!("style entry is {kind}"))))
            .collect(),
        other => {
            let single = scalar_to_string(other)
                .map_err(|kind| D::Error::custom(format!("style is {kind}")))?;
            Ok(if single.is_empty() { Vec::new() } else { vec![single] })
        }
    }
}

fn loose_int<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("{n} is not an integer"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("{s:?} is not an integer"))),
        other => Err(D::Error::custom(format!("expected integer, found {}", json_kind(&other)))),
    }
}
