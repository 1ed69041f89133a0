//!
//! src/types.rs
//!
//! Track record types shared by the store, the form and the controller,
//! plus the orderings the list view can be sorted by
//!

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;

/// Maximum number of style tags the form offers for one track
pub const MAX_STYLES: usize = 3;

// Identifier of a track, unique within a store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize
)]
#[serde(transparent)]
pub struct TrackId(pub i64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(TrackId)
            .map_err(|_| CatalogError::Parse(format!("not a track id: {s:?}")))
    }
}

/// The user editable part of a track. Nothing here is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackFields {
    pub record: String,
    pub num: String,
    pub track: String,
    pub artist: String,
    pub style: Vec<String>,
    pub bpm: String,
    pub key: String,
    pub power: String,
    pub rpm: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(flatten)]
    pub fields: TrackFields,
    pub id: TrackId,
    #[serde(rename = "lastChange")]
    pub last_change: i64,
}

impl Track {
    /// BPM as a number when the free-form text holds one
    pub fn bpm_value(&self) -> Option<f64> {
        let bpm = self.fields.bpm.trim().replace(',', ".");
        bpm.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Created,
    Record,
    Artist,
    Bpm,
    Modified,
}

impl SortKey {
    #[cfg(test)]
    pub const ALL: [SortKey; 5] = [
        SortKey::Created,
        SortKey::Record,
        SortKey::Artist,
        SortKey::Bpm,
        SortKey::Modified,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Created  => "created",
            SortKey::Record   => "record",
            SortKey::Artist   => "artist",
            SortKey::Bpm      => "bpm",
            SortKey::Modified => "modified",
        }
    }

    pub fn parse(s: &str) -> Option<SortKey> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created"  => Some(SortKey::Created),
            "record"   => Some(SortKey::Record),
            "artist"   => Some(SortKey::Artist),
            "bpm"      => Some(SortKey::Bpm),
            "modified" => Some(SortKey::Modified),
            _ => None,
        }
    }

    /// Total order over tracks; ties always fall back to ascending id
    pub fn compare(self, a: &Track, b: &Track) -> Ordering {
        let primary = match self {
            SortKey::Created => Ordering::Equal,
            SortKey::Record => caseless_cmp(&a.fields.record, &b.fields.record)
                .then_with(|| natural_cmp(&a.fields.num, &b.fields.num)),
            SortKey::Artist => caseless_cmp(&a.fields.artist, &b.fields.artist)
                .then_with(|| caseless_cmp(&a.fields.record, &b.fields.record))
                .then_with(|| natural_cmp(&a.fields.num, &b.fields.num)),
            SortKey::Bpm => match (a.bpm_value(), b.bpm_value()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Modified => b.last_change.cmp(&a.last_change),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn caseless_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Compares track numbers like "A2" < "A10" < "B1": digit runs numerically,
/// everything else without case
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut left, mut right) = (a.trim(), b.trim());
    loop {
        match (left.is_empty(), right.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        let (l_chunk, l_rest, l_digits) = split_chunk(left);
        let (r_chunk, r_rest, r_digits) = split_chunk(right);

        let ord = match (l_digits, r_digits) {
            (true, true) => {
                let l = l_chunk.trim_start_matches('0');
                let r = r_chunk.trim_start_matches('0');
                l.len().cmp(&r.len()).then_with(|| l.cmp(r))
            }
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => caseless_cmp(l_chunk, r_chunk),
        };
        if ord != Ordering::Equal {
            return ord;
        }
        left = l_rest;
        right = r_rest;
    }
}

// splits off the leading run of digits or non-digits
fn split_chunk(s: &str) -> (&str, &str, bool) {
    let digits = s.starts_with(|c: char| c.is_ascii_digit());
    let end = s
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit() != digits)
        .map_or(s.len(), |(i, _)| i);
    (&s[..end], &s[end..], digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: i64, record: &str, num: &str, artist: &str, bpm: &str) -> Track {
        Track {
            fields: TrackFields {
                record: record.to_string(),
                num: num.to_string(),
                artist: artist.to_string(),
                bpm: bpm.to_string(),
                ..Default::default()
            },
            id: TrackId(id),
            last_change: id,
        }
    }

    #[test]
    fn natural_order_of_vinyl_sides() {
        let mut nums = vec!["B1", "A10", "a2", "A1", "3", "10", "02"];
        nums.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(nums, vec!["02", "3", "10", "A1", "a2", "A10", "B1"]);
    }

    #[test]
    fn bpm_sort_puts_unparsable_last() {
        let a = track(1, "r", "1", "x", "");
        let b = track(2, "r", "2", "x", "128");
        let c = track(3, "r", "3", "x", "82,5");
        let mut all = vec![&a, &b, &c];
        all.sort_by(|x, y| SortKey::Bpm.compare(x, y));
        let ids: Vec<i64> = all.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn record_sort_ignores_case_and_breaks_ties_by_id() {
        let a = track(5, "abbey road", "2", "", "");
        let b = track(4, "Abbey Road", "2", "", "");
        let c = track(1, "Abbey Road", "10", "", "");
        let mut all = vec![&c, &a, &b];
        all.sort_by(|x, y| SortKey::Record.compare(x, y));
        let ids: Vec<i64> = all.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![4, 5, 1]);
    }

    #[test]
    fn sort_key_names() {
        for key in SortKey::ALL {
            assert_eq!(SortKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(SortKey::parse(" BPM "), Some(SortKey::Bpm));
        assert_eq!(SortKey::parse("title"), None);
    }

    #[test]
    fn track_id_parses_trimmed_integers() {
        assert_eq!(" 1697040000 ".parse::<TrackId>().ok(), Some(TrackId(1697040000)));
        assert!("abc".parse::<TrackId>().is_err());
    }

    #[test]
    fn track_serializes_with_wire_names() -> Result<(), CatalogError> {
        let t = track(7, "Abbey Road", "1", "The Beatles", "82");
        let json = serde_json::to_value(&t)?;
        assert_eq!(json["id"], 7);
        assert_eq!(json["lastChange"], 7);
        assert_eq!(json["record"], "Abbey Road");
        assert!(json["style"].as_array().is_some_and(|s| s.is_empty()));
        let back: Track = serde_json::from_value(json)?;
        assert_eq!(back, t);
        Ok(())
    }
}
