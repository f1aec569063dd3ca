//! # Event Records
//!
//! The single domain entity of the Event API. An [`EventRecord`] is created
//! by handing [`EventFields`] to an [`EventStore`](crate::EventStore), which
//! assigns the [`EventId`]. The identifier never changes afterwards; every
//! other attribute can be replaced wholesale.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of an event record.
///
/// Serializes as a bare number. Identifiers start at 1 and are never reused
/// within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "schema", derive(utoipa::ToSchema))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Caller-controlled attributes of an event.
///
/// Used both to insert a new record and to replace an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(utoipa::ToSchema))]
pub struct EventFields {
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Wall-clock start time as displayed to attendees, e.g. `"9:00 AM"`.
    pub start_time: String,
    /// Wall-clock end time as displayed to attendees, e.g. `"5:00 PM"`.
    pub end_time: String,
    /// Hosting organization.
    pub host: String,
    pub speaker: String,
    pub registration_url: String,
}

/// A stored event.
///
/// Field order is the serialization order, which is also the column order
/// of tabular output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(utoipa::ToSchema))]
pub struct EventRecord {
    pub id: EventId,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub start_time: String,
    pub end_time: String,
    pub host: String,
    pub speaker: String,
    pub registration_url: String,
}

impl EventRecord {
    /// Number of serialized fields on a record.
    pub const FIELD_COUNT: usize = 9;

    /// Build a record from its identifier and attributes.
    pub fn from_fields(id: EventId, fields: EventFields) -> Self {
        let EventFields {
            title,
            start_date,
            end_date,
            start_time,
            end_time,
            host,
            speaker,
            registration_url,
        } = fields;
        Self {
            id,
            title,
            start_date,
            end_date,
            start_time,
            end_time,
            host,
            speaker,
            registration_url,
        }
    }

    /// The caller-controlled attributes of this record.
    pub fn fields(&self) -> EventFields {
        EventFields {
            title: self.title.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            host: self.host.clone(),
            speaker: self.speaker.clone(),
            registration_url: self.registration_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_fields() -> EventFields {
        EventFields {
            title: "RustConf".to_string(),
            start_date: Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 9, 3, 17, 0, 0).unwrap(),
            start_time: "9:00 AM".to_string(),
            end_time: "5:00 PM".to_string(),
            host: "Rust Foundation".to_string(),
            speaker: "Ferris".to_string(),
            registration_url: "https://rustconf.com/register".to_string(),
        }
    }

    #[test]
    fn from_fields_keeps_every_attribute() {
        let fields = sample_fields();
        let record = EventRecord::from_fields(EventId::new(7), fields.clone());
        assert_eq!(record.id, EventId::new(7));
        assert_eq!(record.fields(), fields);
    }

    #[test]
    fn event_id_serializes_as_number() {
        let json = serde_json::to_string(&EventId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: EventId = serde_json::from_str("42").unwrap();
        assert_eq!(back.get(), 42);
    }

    #[test]
    fn event_id_parses_from_path_segment() {
        assert_eq!("15".parse::<EventId>().unwrap(), EventId::new(15));
        assert!("abc".parse::<EventId>().is_err());
    }

    #[test]
    fn field_count_matches_serialized_object() {
        let record = EventRecord::from_fields(EventId::new(1), sample_fields());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value.as_object().unwrap().len(),
            EventRecord::FIELD_COUNT
        );
    }
}
