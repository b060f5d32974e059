use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{self, Result};

/// Stored instants are UTC RFC 3339 with a fixed nine-digit fraction, so
/// text ordering matches time ordering and sub-second values survive.
pub(crate) fn to_db_instant(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn from_db_instant(value: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

pub(crate) fn serialize_exdates(exdates: &[DateTime<Utc>]) -> Option<String> {
    if exdates.is_empty() {
        return None;
    }
    let serialized: Vec<String> = exdates.iter().map(|dt| to_db_instant(*dt)).collect();
    serde_json::to_string(&serialized).ok()
}

pub(crate) fn deserialize_exdates(json: Option<String>) -> Result<Vec<DateTime<Utc>>> {
    let Some(json) = json else {
        return Ok(Vec::new());
    };

    let dates: Vec<String> = serde_json::from_str(&json)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let parsed = dates
        .into_iter()
        .filter_map(|value| DateTime::parse_from_rfc3339(&value).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .collect();

    Ok(parsed)
}

pub(crate) fn serialize_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn deserialize_list(json: String) -> Result<Vec<String>> {
    serde_json::from_str(&json).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
