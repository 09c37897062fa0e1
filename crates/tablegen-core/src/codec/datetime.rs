//! Date and date-time transcoding between storage and application values.
//!
//! Reading turns native temporal values into strings (`YYYY-MM-DD` or
//! RFC 3339 with milliseconds and `Z`). Writing normalizes any truthy value
//! to `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` in UTC.

use super::value::{Record, Value};
use crate::error::CodecError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;

const DATE_FORMAT: &str = "%Y-%m-%d";
const STORAGE_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Validation-schema `format` of a temporal property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemporalFormat {
    /// `format: "date"`.
    #[serde(rename = "date")]
    Date,
    /// `format: "time"`.
    #[serde(rename = "time")]
    Time,
    /// `format: "date-time"`.
    #[serde(rename = "date-time")]
    DateTime,
}

impl TemporalFormat {
    /// The validation-schema name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalFormat::Date => "date",
            TemporalFormat::Time => "time",
            TemporalFormat::DateTime => "date-time",
        }
    }

    /// Parse a validation-schema `format` value.
    pub fn from_schema(format: &str) -> Option<Self> {
        match format {
            "date" => Some(TemporalFormat::Date),
            "time" => Some(TemporalFormat::Time),
            "date-time" => Some(TemporalFormat::DateTime),
            _ => None,
        }
    }
}

/// Storage to application.
///
/// Only native temporal values are converted; strings and everything else
/// pass through.
pub fn read(value: Value, format: TemporalFormat) -> Value {
    let instant = match &value {
        Value::Date(date) => midnight(*date),
        Value::DateTime(dt) => *dt,
        _ => return value,
    };

    match format {
        TemporalFormat::Date => Value::String(instant.format(DATE_FORMAT).to_string()),
        TemporalFormat::DateTime => {
            Value::String(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        TemporalFormat::Time => value,
    }
}

/// Application to storage.
///
/// Falsy values pass through. Truthy values must be interpretable as an
/// instant: a native temporal value, an RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]`
/// string, or epoch milliseconds.
pub fn write(property: &str, value: Value, format: TemporalFormat) -> Result<Value, CodecError> {
    if format == TemporalFormat::Time || !value.is_truthy() {
        return Ok(value);
    }

    let instant = to_instant(&value).ok_or_else(|| CodecError::InvalidTemporal {
        property: property.to_string(),
        value: value.to_json().to_string(),
        format: format.as_str(),
    })?;

    let pattern = match format {
        TemporalFormat::Date => DATE_FORMAT,
        _ => STORAGE_DATE_TIME_FORMAT,
    };
    Ok(Value::String(instant.format(pattern).to_string()))
}

/// Interpret a value as a UTC instant.
pub fn to_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Date(date) => Some(midnight(*date)),
        Value::Integer(ms) => Utc.timestamp_millis_opt(*ms).single(),
        Value::Float(ms) if ms.is_finite() => Utc.timestamp_millis_opt(*ms as i64).single(),
        Value::String(s) => parse_instant(s.trim()),
        _ => None,
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok().map(midnight)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Codec over the temporal properties of one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateTimeCodec {
    properties: Vec<(String, TemporalFormat)>,
}

impl DateTimeCodec {
    /// Create a codec over `(property, format)` pairs.
    pub fn new(properties: impl IntoIterator<Item = (String, TemporalFormat)>) -> Self {
        Self {
            properties: properties.into_iter().collect(),
        }
    }

    /// The temporal properties.
    pub fn properties(&self) -> &[(String, TemporalFormat)] {
        &self.properties
    }

    /// Apply the read path to every temporal property present in the record.
    pub fn parse_record(&self, record: &mut Record) {
        for (property, format) in &self.properties {
            if let Some(value) = record.remove(property) {
                record.insert(property.clone(), read(value, *format));
            }
        }
    }

    /// Apply the write path to every temporal property present in the record.
    pub fn format_record(&self, record: &mut Record) -> Result<(), CodecError> {
        for (property, format) in &self.properties {
            if let Some(value) = record.remove(property) {
                record.insert(property.clone(), write(property, value, *format)?);
            }
        }
        Ok(())
    }
}
