//!
//! src/form.rs
//!
//! The add/edit form as the user fills it in, and the two line
//! list entries shown for every stored track
//!

use crate::types::{MAX_STYLES, Track, TrackFields, TrackId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackForm {
    pub record: String,
    pub num: String,
    pub track: String,
    pub artist: String,
    pub styles: [String; MAX_STYLES],
    pub bpm: String,
    pub key: String,
    pub power: String,
    pub rpm: String,
    pub comment: String,
}

/// One input of the form, in the order the form presents them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Record,
    Num,
    Track,
    Artist,
    Style(usize),
    Bpm,
    Key,
    Power,
    Rpm,
    Comment,
}

impl FormField {
    pub const ALL: [FormField; 12] = [
        FormField::Record,
        FormField::Num,
        FormField::Track,
        FormField::Artist,
        FormField::Style(0),
        FormField::Style(1),
        FormField::Style(2),
        FormField::Bpm,
        FormField::Key,
        FormField::Power,
        FormField::Rpm,
        FormField::Comment,
    ];

    pub fn label(self) -> String {
        match self {
            FormField::Record   => "record".to_string(),
            FormField::Num      => "track number".to_string(),
            FormField::Track    => "track title".to_string(),
            FormField::Artist   => "artist".to_string(),
            FormField::Style(n) => format!("style {}", n + 1),
            FormField::Bpm      => "bpm".to_string(),
            FormField::Key      => "key".to_string(),
            FormField::Power    => "power".to_string(),
            FormField::Rpm      => "rpm".to_string(),
            FormField::Comment  => "comment".to_string(),
        }
    }
}

impl TrackForm {
    /// Pre-fills the form from a stored track. Styles beyond the form's
    /// slots are not shown.
    pub fn from_track(track: &Track) -> Self {
        let f = &track.fields;
        let mut styles: [String; MAX_STYLES] = Default::default();
        for (slot, style) in styles.iter_mut().zip(&f.style) {
            slot.clone_from(style);
        }

        Self {
            record: f.record.clone(),
            num: f.num.clone(),
            track: f.track.clone(),
            artist: f.artist.clone(),
            styles,
            bpm: f.bpm.clone(),
            key: f.key.clone(),
            power: f.power.clone(),
            rpm: f.rpm.clone(),
            comment: f.comment.clone(),
        }
    }

    /// Style slots are trimmed and empty ones dropped, keeping their order.
    /// All other fields are taken verbatim.
    pub fn into_fields(self) -> TrackFields {
        let style = self
            .styles
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        TrackFields {
            record: self.record,
            num: self.num,
            track: self.track,
            artist: self.artist,
            style,
            bpm: self.bpm,
            key: self.key,
            power: self.power,
            rpm: self.rpm,
            comment: self.comment,
        }
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Record   => &self.record,
            FormField::Num      => &self.num,
            FormField::Track    => &self.track,
            FormField::Artist   => &self.artist,
            FormField::Style(n) => &self.styles[n.min(MAX_STYLES - 1)],
            FormField::Bpm      => &self.bpm,
            FormField::Key      => &self.key,
            FormField::Power    => &self.power,
            FormField::Rpm      => &self.rpm,
            FormField::Comment  => &self.comment,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Record   => &mut self.record,
            FormField::Num      => &mut self.num,
            FormField::Track    => &mut self.track,
            FormField::Artist   => &mut self.artist,
            FormField::Style(n) => &mut self.styles[n.min(MAX_STYLES - 1)],
            FormField::Bpm      => &mut self.bpm,
            FormField::Key      => &mut self.key,
            FormField::Power    => &mut self.power,
            FormField::Rpm      => &mut self.rpm,
            FormField::Comment  => &mut self.comment,
        }
    }
}

/// A row of the track list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub id: TrackId,
    pub primary: String,
    pub secondary: String,
}

impl ListEntry {
    pub fn from_track(track: &Track) -> Self {
        let f = &track.fields;
        Self {
            id: track.id,
            primary: format!("{} - {}. {}", f.record, f.num, f.track),
            secondary: format!("{}, {}, BPM={}", f.artist, f.style.join(", "), f.bpm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with_styles(a: &str, b: &str, c: &str) -> TrackForm {
        TrackForm {
            record: "Lazer Guided Melodies".to_string(),
            styles: [a.to_string(), b.to_string(), c.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn empty_style_slots_are_dropped_in_order() {
        let fields = form_with_styles("House", "", "Deep House").into_fields();
        assert_eq!(fields.style, vec!["House".to_string(), "Deep House".to_string()]);
    }

    #[test]
    fn blank_style_slots_count_as_empty() {
        let fields = form_with_styles("  ", " Dub ", "").into_fields();
        assert_eq!(fields.style, vec!["Dub".to_string()]);
        assert!(form_with_styles("", "", "").into_fields().style.is_empty());
    }

    #[test]
    fn duplicate_styles_are_kept() {
        let fields = form_with_styles("Dub", "Dub", "").into_fields();
        assert_eq!(fields.style, vec!["Dub".to_string(), "Dub".to_string()]);
    }

    #[test]
    fn prefill_round_trips_through_the_form() {
        let track = Track {
            fields: TrackFields {
                record: "Abbey Road".to_string(),
                num: "1".to_string(),
                track: "Come Together".to_string(),
                artist: "The Beatles".to_string(),
                style: vec!["Rock".to_string(), "Blues Rock".to_string()],
                bpm: "82".to_string(),
                key: "Dm".to_string(),
                power: String::new(),
                rpm: "33".to_string(),
                comment: " keep  spacing ".to_string(),
            },
            id: TrackId(1),
            last_change: 1,
        };
        let form = TrackForm::from_track(&track);
        assert_eq!(form.styles, ["Rock".to_string(), "Blues Rock".to_string(), String::new()]);
        assert_eq!(form.field(FormField::Style(1)), "Blues Rock");
        assert_eq!(form.into_fields(), track.fields);
    }

    #[test]
    fn field_mut_edits_the_named_slot() {
        let mut form = TrackForm::default();
        for field in FormField::ALL {
            *form.field_mut(field) = field.label();
        }
        assert_eq!(form.num, "track number");
        assert_eq!(form.styles[2], "style 3");
        assert_eq!(form.comment, "comment");
    }

    #[test]
    fn list_entry_lines() {
        let track = Track {
            fields: TrackFields {
                record: "Abbey Road".to_string(),
                num: "1".to_string(),
                track: "Come Together".to_string(),
                artist: "The Beatles".to_string(),
                style: vec!["Rock".to_string(), "Blues".to_string()],
                bpm: "82".to_string(),
                ..Default::default()
            },
            id: TrackId(9),
            last_change: 9,
        };
        let entry = ListEntry::from_track(&track);
        assert_eq!(entry.id, TrackId(9));
        assert_eq!(entry.primary, "Abbey Road - 1. Come Together");
        assert_eq!(entry.secondary, "The Beatles, Rock, Blues, BPM=82");
    }
}
