//! Decoded log records

use crate::core::temporal::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Record payload (serialized data, never interpreted by the slicing core)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Serialized record data (format depends on serialization)
    pub data: Vec<u8>,
    /// Serialization format identifier
    pub format: String,
}

impl RecordPayload {
    /// Create payload from serialized data
    pub fn new(data: Vec<u8>, format: String) -> Self {
        Self { data, format }
    }

    /// Create payload from JSON-serializable data
    pub fn from_json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_vec(value)?;
        Ok(Self {
            data,
            format: "json".to_string(),
        })
    }

    /// Deserialize from JSON
    pub fn to_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }

    /// Payload rendered for display: parsed JSON when possible, byte length otherwise
    pub fn to_json_value(&self) -> serde_json::Value {
        if self.format == "json" {
            if let Ok(value) = serde_json::from_slice(&self.data) {
                return value;
            }
        }
        serde_json::json!({ "format": self.format, "bytes": self.data.len() })
    }
}

/// One timestamped entry of a log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Message/record type name, used by [`RecordFilter`]
    pub record_type: String,
    /// Wall-clock time reported by the decoder, if any
    pub timestamp: Option<Timestamp>,
    /// Opaque payload
    pub payload: RecordPayload,
}

impl Record {
    /// Create a new record
    pub fn new(record_type: impl Into<String>, timestamp: Option<Timestamp>, payload: RecordPayload) -> Self {
        Self {
            record_type: record_type.into(),
            timestamp,
            payload,
        }
    }

    /// Record with an empty payload at `secs`, handy for fixtures
    pub fn at(record_type: impl Into<String>, secs: f64) -> Self {
        Self::new(
            record_type,
            Some(Timestamp::from_secs_f64(secs)),
            RecordPayload::default(),
        )
    }

    /// Get record type
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Effective timestamp; records without one sort at the epoch
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp.unwrap_or(Timestamp::ZERO)
    }

    /// Get payload
    pub fn payload(&self) -> &RecordPayload {
        &self.payload
    }
}

/// Record-type filter applied inside a source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    types: Option<BTreeSet<String>>,
}

impl RecordFilter {
    /// Accept every record
    pub fn all() -> Self {
        Self { types: None }
    }

    /// Accept only the named record types
    pub fn types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: Some(types.into_iter().map(Into::into).collect()),
        }
    }

    /// Build from optional CLI/config input; `None` or an empty list accepts all
    pub fn from_option(types: Option<&[String]>) -> Self {
        match types {
            Some(types) if !types.is_empty() => Self::types(types.iter().cloned()),
            _ => Self::all(),
        }
    }

    pub fn accepts(&self, record: &Record) -> bool {
        match &self.types {
            Some(types) => types.contains(record.record_type()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let payload = RecordPayload::from_json(&serde_json::json!({"param_id": "GAIN"})).unwrap();
        let record = Record::new("PARAM_VALUE", Some(Timestamp::from_secs(1000)), payload);

        assert_eq!(record.record_type(), "PARAM_VALUE");
        assert_eq!(record.timestamp(), Timestamp::from_secs(1000));
        let value: serde_json::Value = record.payload().to_json().unwrap();
        assert_eq!(value["param_id"], "GAIN");
    }

    #[test]
    fn test_missing_timestamp_defaults_to_zero() {
        let record = Record::new("HEARTBEAT", None, RecordPayload::default());
        assert_eq!(record.timestamp(), Timestamp::ZERO);
    }

    #[test]
    fn test_record_filter() {
        let heartbeat = Record::at("HEARTBEAT", 1.0);
        let param = Record::at("PARAM_VALUE", 2.0);

        assert!(RecordFilter::all().accepts(&heartbeat));

        let only_params = RecordFilter::types(["PARAM_VALUE"]);
        assert!(only_params.accepts(&param));
        assert!(!only_params.accepts(&heartbeat));

        let empty: Vec<String> = Vec::new();
        assert_eq!(RecordFilter::from_option(Some(&empty)), RecordFilter::all());
    }

    #[test]
    fn test_payload_display_value() {
        let json = RecordPayload::from_json(&serde_json::json!({"v": 1})).unwrap();
        assert_eq!(json.to_json_value()["v"], 1);

        let raw = RecordPayload::new(vec![1, 2, 3], "raw".to_string());
        assert_eq!(raw.to_json_value()["bytes"], 3);
    }
}
