use chrono::{DateTime, NaiveDate};
use eyre::{eyre, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a publish date, accepting plain dates and full RFC 3339 timestamps
pub fn date_from_wire_repr(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .map_err(|_| eyre!("invalid publish date '{}'", s))
}

pub fn date_to_wire_repr(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub mod publish_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::date_to_wire_repr(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::date_from_wire_repr(&s).map_err(de::Error::custom)
    }
}
